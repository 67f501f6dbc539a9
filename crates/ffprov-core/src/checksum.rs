//! SHA-256 digests of downloaded archives and checksum sidecar parsing.
//!
//! Digests are computed after the transfer completes, never over a partial file.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

const BUF_SIZE: usize = 64 * 1024;

/// Length of a hex-encoded SHA-256 digest.
pub const HEX_DIGEST_LEN: usize = 64;

/// Compute SHA-256 of a file and return the digest as lowercase hex.
/// Reads in chunks to keep memory use bounded; archives run to hundreds of MiB.
pub fn sha256_path(path: &Path) -> io::Result<String> {
    let mut f = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = f.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Expected digest from sidecar text: the first whitespace-delimited token,
/// which must be 64 hex characters. The rest of the line (usually the file name) is ignored.
pub fn parse_sidecar(text: &str) -> Option<String> {
    let token = text.split_whitespace().next()?;
    let token = token.trim_start_matches('\u{feff}');
    if token.len() == HEX_DIGEST_LEN && token.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(token.to_ascii_lowercase())
    } else {
        None
    }
}

/// Integrity state of an archive on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDescriptor {
    pub bytes_on_disk: u64,
    pub expected: String,
    pub computed: String,
}

impl ArtifactDescriptor {
    /// Hash `path` and pair the result with the expected digest.
    pub fn compute(path: &Path, expected: &str) -> io::Result<Self> {
        let bytes_on_disk = std::fs::metadata(path)?.len();
        let computed = sha256_path(path)?;
        Ok(Self {
            bytes_on_disk,
            expected: expected.to_ascii_lowercase(),
            computed,
        })
    }

    pub fn is_valid(&self) -> bool {
        self.computed == self.expected
    }
}
