//! Archive acquisition: offline cache or resumable download, then checksum verification.

mod download;
mod response;

pub use download::{download_with_resume, TransferError, TransferMode, TransferReport};

use crate::checksum::{self, ArtifactDescriptor};
use crate::url_model;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Where the archive comes from. With `cache_dir` set the network is never touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSource {
    pub url: String,
    pub cache_dir: Option<PathBuf>,
}

/// A verified archive on local disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedArtifact {
    pub path: PathBuf,
    pub descriptor: ArtifactDescriptor,
    pub from_cache: bool,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error("offline cache is missing {}", missing.display())]
    CacheMissing { missing: PathBuf },

    #[error("checksum file {} does not start with a SHA-256 digest", path.display())]
    MalformedSidecar { path: PathBuf },

    #[error("SHA-256 mismatch for {}: expected {expected}, got {computed}", path.display())]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        computed: String,
    },

    #[error("read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Produce a verified archive. Nothing downstream may touch the archive unless this returns `Ok`.
pub fn fetch_artifact(source: &ArtifactSource, work_dir: &Path) -> Result<FetchedArtifact, FetchError> {
    let archive_name = url_model::archive_file_name(&source.url);
    let sidecar_name = url_model::sidecar_file_name(&archive_name);

    let (archive, sidecar, from_cache) = match &source.cache_dir {
        Some(cache) => {
            tracing::info!("using offline cache {}", cache.display());
            let archive = cache.join(&archive_name);
            let sidecar = cache.join(&sidecar_name);
            for required in [&archive, &sidecar] {
                if !required.is_file() {
                    tracing::debug!("offline cache is missing {}", required.display());
                    return Err(FetchError::CacheMissing { missing: required.clone() });
                }
            }
            (archive, sidecar, true)
        }
        None => {
            fs::create_dir_all(work_dir).map_err(|source| FetchError::Io {
                path: work_dir.to_path_buf(),
                source,
            })?;
            let sidecar = work_dir.join(&sidecar_name);
            let archive = work_dir.join(&archive_name);
            download_with_resume(&url_model::sidecar_url(&source.url), &sidecar)?;
            download_with_resume(&source.url, &archive)?;
            (archive, sidecar, false)
        }
    };

    let descriptor = verify_archive(&archive, &sidecar)?;
    Ok(FetchedArtifact { path: archive, descriptor, from_cache })
}

/// Compare the archive's SHA-256 against the first token of its sidecar.
pub fn verify_archive(archive: &Path, sidecar: &Path) -> Result<ArtifactDescriptor, FetchError> {
    let text = fs::read_to_string(sidecar).map_err(|source| FetchError::Io {
        path: sidecar.to_path_buf(),
        source,
    })?;
    let expected = checksum::parse_sidecar(&text).ok_or_else(|| FetchError::MalformedSidecar {
        path: sidecar.to_path_buf(),
    })?;

    let descriptor = ArtifactDescriptor::compute(archive, &expected).map_err(|source| {
        FetchError::Io {
            path: archive.to_path_buf(),
            source,
        }
    })?;
    if !descriptor.is_valid() {
        tracing::debug!(
            "SHA-256 mismatch for {}: expected {}, got {}",
            archive.display(),
            descriptor.expected,
            descriptor.computed
        );
        return Err(FetchError::ChecksumMismatch {
            path: archive.to_path_buf(),
            expected: descriptor.expected,
            computed: descriptor.computed,
        });
    }
    tracing::info!("SHA-256 verified for {} ({} bytes)", archive.display(), descriptor.bytes_on_disk);
    Ok(descriptor)
}
