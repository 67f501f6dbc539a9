//! Extract a verified archive into its final install directory.
//!
//! Extraction happens in a scratch directory next to the target so the final
//! step is a same-filesystem rename. The target is only touched once the
//! archive has been fully unpacked and its layout checked.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// Target did not exist and now holds the archive's root folder.
    Installed,
    /// Target existed and `force` was off; nothing was extracted.
    KeptExisting,
    /// Target existed and was replaced.
    Replaced,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedInstall {
    pub dir: PathBuf,
    pub outcome: StageOutcome,
}

#[derive(Debug, Error)]
pub enum StageError {
    #[error("open archive {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("corrupt or unsupported archive {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("archive {} must contain exactly one top-level folder, found {found} entries", path.display())]
    Layout { path: PathBuf, found: usize },

    #[error("{action} {}: {source}", path.display())]
    Filesystem {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StageError {
    /// Archive content problem, as opposed to a local filesystem failure.
    pub fn is_archive_error(&self) -> bool {
        matches!(self, StageError::Corrupt { .. } | StageError::Layout { .. })
    }
}

fn fs_err<'a>(action: &'static str, path: &'a Path) -> impl FnOnce(io::Error) -> StageError + 'a {
    move |source| StageError::Filesystem { action, path: path.to_path_buf(), source }
}

/// Install `archive` at `target`. Idempotent unless `force` is set.
pub fn stage(archive: &Path, target: &Path, force: bool) -> Result<StagedInstall, StageError> {
    let exists = target.symlink_metadata().is_ok();
    if exists && !force {
        tracing::info!("{} already exists; skipping extraction (use --force to replace)", target.display());
        return Ok(StagedInstall { dir: target.to_path_buf(), outcome: StageOutcome::KeptExisting });
    }

    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(fs_err("create", &parent))?;
    let scratch = tempfile::Builder::new()
        .prefix(".ffprov-extract-")
        .tempdir_in(&parent)
        .map_err(fs_err("create staging directory in", &parent))?;

    tracing::info!("extracting {} into {}", archive.display(), scratch.path().display());
    let file = File::open(archive).map_err(|source| StageError::Open {
        path: archive.to_path_buf(),
        source,
    })?;
    let corrupt = |source| StageError::Corrupt { path: archive.to_path_buf(), source };
    let mut zip = zip::ZipArchive::new(file).map_err(corrupt)?;
    zip.extract(scratch.path()).map_err(corrupt)?;

    let root = single_root(archive, scratch.path())?;

    let outcome = if exists {
        tracing::info!("removing existing {}", target.display());
        remove_any(target).map_err(fs_err("remove", target))?;
        StageOutcome::Replaced
    } else {
        StageOutcome::Installed
    };
    fs::rename(&root, target).map_err(fs_err("move extracted folder to", target))?;
    tracing::info!("installed {}", target.display());

    Ok(StagedInstall { dir: target.to_path_buf(), outcome })
}

/// The only entry of `scratch`, which must be a directory.
fn single_root(archive: &Path, scratch: &Path) -> Result<PathBuf, StageError> {
    let entries: Vec<PathBuf> = fs::read_dir(scratch)
        .map_err(fs_err("list", scratch))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<_, _>>()
        .map_err(fs_err("list", scratch))?;
    match entries.as_slice() {
        [only] if only.is_dir() => Ok(only.clone()),
        _ => {
            tracing::debug!(
                "{} has {} top-level entries; expected a single folder",
                archive.display(),
                entries.len()
            );
            Err(StageError::Layout { path: archive.to_path_buf(), found: entries.len() })
        }
    }
}

fn remove_any(path: &Path) -> io::Result<()> {
    if path.is_dir() && !path.symlink_metadata()?.file_type().is_symlink() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}
