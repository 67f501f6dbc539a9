//! Tests for check, fetch, checksum, completions, man.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use std::path::PathBuf;

#[test]
fn cli_parse_check() {
    match parse(&["ffprov", "check"]) {
        CliCommand::Check => {}
        other => panic!("expected Check, got {:?}", other),
    }
}

#[test]
fn cli_parse_fetch() {
    match parse(&["ffprov", "fetch", "--ffmpeg-url", "http://host/ffmpeg.zip"]) {
        CliCommand::Fetch(args) => {
            assert_eq!(args.ffmpeg_url.as_deref(), Some("http://host/ffmpeg.zip"));
            assert!(args.offline_cache.is_none());
        }
        other => panic!("expected Fetch, got {:?}", other),
    }
}

#[test]
fn cli_parse_fetch_has_no_install_flags() {
    assert!(Cli::try_parse_from(["ffprov", "fetch", "--force"]).is_err());
}

#[test]
fn cli_parse_checksum() {
    match parse(&["ffprov", "checksum", "/tmp/ffmpeg.zip"]) {
        CliCommand::Checksum { path } => assert_eq!(path, PathBuf::from("/tmp/ffmpeg.zip")),
        other => panic!("expected Checksum, got {:?}", other),
    }
}

#[test]
fn cli_parse_checksum_requires_path() {
    assert!(Cli::try_parse_from(["ffprov", "checksum"]).is_err());
}

#[test]
fn cli_parse_completions() {
    match parse(&["ffprov", "completions", "bash"]) {
        CliCommand::Completions { shell } => assert_eq!(shell, Shell::Bash),
        other => panic!("expected Completions, got {:?}", other),
    }
    assert!(Cli::try_parse_from(["ffprov", "completions", "cmd"]).is_err());
}

#[test]
fn cli_parse_man() {
    assert!(matches!(parse(&["ffprov", "man"]), CliCommand::Man));
}

#[test]
fn cli_requires_subcommand() {
    assert!(Cli::try_parse_from(["ffprov"]).is_err());
}

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn help_lists_exit_codes() {
    let help = Cli::command().render_long_help().to_string();
    assert!(help.contains("Exit status:"));
    assert!(help.contains("31  checksum mismatch"));
}
