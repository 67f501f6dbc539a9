//! Minimal INI editor that changes only the lines it has to.
//!
//! Comments, key order, unrelated sections and line endings survive untouched.
//! Keys match case-insensitively with `=` or `:` as delimiter; section names
//! match exactly.

use std::fs;
use std::io;
use std::path::Path;

/// Set `entries` inside `[section]`.
///
/// Every occurrence of an existing key is rewritten as `key = value` and its
/// continuation lines are dropped. Keys not present are inserted after the
/// last non-blank line of the first `[section]`. A missing section is appended.
pub fn patch_ini(original: &str, section: &str, entries: &[(&str, &str)]) -> String {
    let nl = if original.contains("\r\n") { "\r\n" } else { "\n" };
    let mut out: Vec<String> = Vec::new();
    let mut found = vec![false; entries.len()];
    let mut in_target = false;
    let mut skipping_continuation = false;
    // Index in `out` right after the last non-blank line of the first target section.
    let mut insert_at: Option<usize> = None;
    let mut first_target_open = false;

    for raw in original.split_inclusive('\n') {
        let content = raw.trim_end_matches(['\r', '\n']);
        let trimmed = content.trim_start_matches('\u{feff}').trim();

        if skipping_continuation {
            if !trimmed.is_empty() && content.starts_with([' ', '\t']) {
                continue;
            }
            skipping_continuation = false;
        }

        if let Some(name) = section_name(trimmed) {
            in_target = name == section;
            if in_target && insert_at.is_none() {
                first_target_open = true;
                out.push(raw.to_string());
                insert_at = Some(out.len());
                continue;
            }
            first_target_open = false;
            out.push(raw.to_string());
            continue;
        }

        if in_target && !is_comment(trimmed) && !content.starts_with([' ', '\t']) {
            if let Some(key) = key_of(trimmed) {
                if let Some(i) = entries.iter().position(|(k, _)| k.eq_ignore_ascii_case(key)) {
                    found[i] = true;
                    let ending = &raw[content.len()..];
                    out.push(format!("{} = {}{}", entries[i].0, entries[i].1, ending));
                    skipping_continuation = true;
                    if first_target_open {
                        insert_at = Some(out.len());
                    }
                    continue;
                }
            }
        }

        out.push(raw.to_string());
        if first_target_open && !trimmed.is_empty() {
            insert_at = Some(out.len());
        }
    }

    let missing: Vec<String> = entries
        .iter()
        .zip(&found)
        .filter(|(_, seen)| !**seen)
        .map(|((k, v), _)| format!("{} = {}{}", k, v, nl))
        .collect();

    match insert_at {
        Some(at) => {
            if !missing.is_empty() {
                if at > 0 && !out[at - 1].ends_with('\n') {
                    out[at - 1].push_str(nl);
                }
                out.splice(at..at, missing);
            }
        }
        None => {
            if let Some(last) = out.last_mut() {
                if !last.ends_with('\n') {
                    last.push_str(nl);
                }
                out.push(nl.to_string());
            }
            out.push(format!("[{}]{}", section, nl));
            out.extend(missing);
        }
    }
    out.concat()
}

/// Patch `path` in place. Returns `Ok(false)` without creating anything when the file is absent.
pub fn patch_ini_file(path: &Path, section: &str, entries: &[(&str, &str)]) -> io::Result<bool> {
    let original = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    let text = String::from_utf8(original)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let patched = patch_ini(&text, section, entries);
    if patched != text {
        fs::write(path, patched)?;
    }
    Ok(true)
}

fn section_name(trimmed: &str) -> Option<&str> {
    let inner = trimmed.strip_prefix('[')?;
    let end = inner.find(']')?;
    Some(inner[..end].trim())
}

fn is_comment(trimmed: &str) -> bool {
    trimmed.starts_with(';') || trimmed.starts_with('#')
}

fn key_of(trimmed: &str) -> Option<&str> {
    let at = trimmed.find(['=', ':'])?;
    let key = trimmed[..at].trim();
    (!key.is_empty()).then_some(key)
}
