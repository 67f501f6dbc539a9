//! Resumable single-stream GET.
//!
//! Whatever already sits at the destination is treated as a prefix of the
//! remote file and only the rest is requested. The file is never truncated
//! before the server has confirmed it is sending the whole body again, so an
//! interrupted run leaves every received byte in place for the next one.

use super::response::{ContentRange, ResponseHead};
use std::cell::RefCell;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str;
use thiserror::Error;

const CHUNK_SIZE: usize = 64 * 1024;

/// How the bytes now on disk came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    Fresh,
    Resumed { offset: u64 },
    /// The server ignored the range request; the partial file was rewritten from byte 0.
    Restarted { discarded: u64 },
    /// The server answered 416 for a file that already has the full length.
    AlreadyComplete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    pub mode: TransferMode,
    /// Body bytes written by this call.
    pub received: u64,
    pub size_on_disk: u64,
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("request to {url} failed: {source}")]
    Curl {
        url: String,
        #[source]
        source: curl::Error,
    },

    #[error("GET {url} returned HTTP {code}")]
    Http { url: String, code: u32 },

    #[error("transfer of {url} cut short at {received} of {expected} bytes; run again to resume")]
    Truncated { url: String, expected: u64, received: u64 },

    #[error("server resumed {url} at byte {got} instead of {requested}")]
    RangeMismatch { url: String, requested: u64, got: u64 },

    #[error("write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Open destination plus the bookkeeping needed to report on it.
struct Sink {
    file: BufWriter<File>,
    mode: TransferMode,
    /// Bytes on disk before the first body write.
    base: u64,
    written: u64,
}

impl Sink {
    fn finish(mut self, dest: &Path) -> Result<Sink, TransferError> {
        self.file
            .flush()
            .and_then(|()| self.file.get_ref().sync_all())
            .map_err(|source| TransferError::Io { path: dest.to_path_buf(), source })?;
        Ok(self)
    }

    fn size_on_disk(&self) -> u64 {
        self.base + self.written
    }
}

/// Download `url` into `dest`, continuing from `dest`'s current length.
///
/// Outcomes by reply:
/// - 206 starting at the local length: append.
/// - 206 starting anywhere else: [`TransferError::RangeMismatch`], nothing written.
/// - 2xx full body: rewrite `dest` from byte 0 (logged when a partial file existed).
/// - 416 with `bytes */N` equal to the local length: already complete.
/// - body shorter than announced: [`TransferError::Truncated`], received bytes kept.
/// - any other status: [`TransferError::Http`]; error bodies are never written to `dest`.
pub fn download_with_resume(url: &str, dest: &Path) -> Result<TransferReport, TransferError> {
    let io_err = |source| TransferError::Io { path: dest.to_path_buf(), source };
    let curl_err = |source| TransferError::Curl { url: url.to_string(), source };

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let existing = match fs::metadata(dest) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => 0,
        Err(e) => return Err(io_err(e)),
    };
    if existing > 0 {
        tracing::info!("resuming {} at byte {}", dest.display(), existing);
    } else {
        tracing::info!("downloading {} -> {}", url, dest.display());
    }

    let head = RefCell::new(ResponseHead::default());
    let sink: RefCell<Option<Sink>> = RefCell::new(None);
    let failure: RefCell<Option<TransferError>> = RefCell::new(None);

    let mut easy = curl::easy::Easy::new();
    easy.url(url).map_err(curl_err)?;
    easy.follow_location(true).map_err(curl_err)?;
    easy.max_redirections(10).map_err(curl_err)?;
    easy.buffer_size(CHUNK_SIZE).map_err(curl_err)?;
    if existing > 0 {
        easy.range(&format!("{}-", existing)).map_err(curl_err)?;
    }

    let performed = {
        let mut transfer = easy.transfer();
        transfer
            .header_function(|data| {
                if let Ok(line) = str::from_utf8(data) {
                    head.borrow_mut().feed(line);
                }
                true
            })
            .map_err(curl_err)?;
        transfer
            .write_function(|data| {
                let mut slot = sink.borrow_mut();
                if slot.is_none() {
                    match open_sink(url, dest, existing, &head.borrow()) {
                        Ok(opened) => *slot = opened,
                        Err(e) => {
                            *failure.borrow_mut() = Some(e);
                            return Ok(0); // abort transfer
                        }
                    }
                }
                match slot.as_mut() {
                    Some(s) => match s.file.write_all(data) {
                        Ok(()) => {
                            s.written += data.len() as u64;
                            Ok(data.len())
                        }
                        Err(e) => {
                            *failure.borrow_mut() = Some(io_err(e));
                            Ok(0)
                        }
                    },
                    // Body of a reply we do not store (redirect hop or error page).
                    None => Ok(data.len()),
                }
            })
            .map_err(curl_err)?;
        transfer.perform()
    };

    let head = head.into_inner();
    let sink = sink.into_inner().map(|s| s.finish(dest)).transpose()?;

    if let Some(e) = failure.into_inner() {
        return Err(e);
    }

    if let Err(source) = performed {
        if source.is_partial_file() {
            if let Some(sink) = &sink {
                if let Some(expected) = head.expected_total(sink.base) {
                    return Err(truncated(url, expected, sink.size_on_disk()));
                }
            }
        }
        return Err(curl_err(source));
    }

    let code = easy.response_code().map_err(curl_err)?;
    if code == 416 {
        if let Some(ContentRange::Unsatisfied { total }) = head.content_range {
            if existing > 0 && total == existing {
                tracing::info!("{} is already complete ({} bytes)", dest.display(), existing);
                return Ok(TransferReport {
                    mode: TransferMode::AlreadyComplete,
                    received: 0,
                    size_on_disk: existing,
                });
            }
        }
        return Err(TransferError::Http { url: url.to_string(), code });
    }
    if !(200..300).contains(&code) {
        return Err(TransferError::Http { url: url.to_string(), code });
    }

    // A 2xx reply with an empty body never reached the write callback.
    let sink = match sink {
        Some(s) => s,
        None => open_sink(url, dest, existing, &head)?
            .ok_or_else(|| TransferError::Http { url: url.to_string(), code })?
            .finish(dest)?,
    };

    if let Some(expected) = head.expected_total(sink.base) {
        if sink.size_on_disk() < expected {
            return Err(truncated(url, expected, sink.size_on_disk()));
        }
    }

    tracing::info!(
        "saved {} ({} bytes, {} this run)",
        dest.display(),
        sink.size_on_disk(),
        sink.written
    );
    Ok(TransferReport {
        mode: sink.mode,
        received: sink.written,
        size_on_disk: sink.size_on_disk(),
    })
}

fn truncated(url: &str, expected: u64, received: u64) -> TransferError {
    tracing::warn!("transfer of {} stopped at {} of {} bytes", url, received, expected);
    TransferError::Truncated { url: url.to_string(), expected, received }
}

/// Decide where the first body byte goes, based on the final response head.
/// `Ok(None)` means the body is not ours to store.
fn open_sink(
    url: &str,
    dest: &Path,
    existing: u64,
    head: &ResponseHead,
) -> Result<Option<Sink>, TransferError> {
    let io_err = |source| TransferError::Io { path: dest.to_path_buf(), source };
    match head.status {
        Some(206) => {
            let start = match head.content_range {
                Some(ContentRange::Bytes { start, .. }) => start,
                _ => {
                    return Err(TransferError::RangeMismatch {
                        url: url.to_string(),
                        requested: existing,
                        got: 0,
                    })
                }
            };
            if start != existing {
                return Err(TransferError::RangeMismatch {
                    url: url.to_string(),
                    requested: existing,
                    got: start,
                });
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(dest)
                .map_err(io_err)?;
            let mode = if existing > 0 {
                TransferMode::Resumed { offset: existing }
            } else {
                TransferMode::Fresh
            };
            Ok(Some(Sink {
                file: BufWriter::with_capacity(CHUNK_SIZE, file),
                mode,
                base: existing,
                written: 0,
            }))
        }
        Some(code) if (200..300).contains(&code) => {
            let mode = if existing > 0 {
                tracing::warn!(
                    "server ignored the range request for {}; discarding {} bytes and starting over",
                    url,
                    existing
                );
                TransferMode::Restarted { discarded: existing }
            } else {
                TransferMode::Fresh
            };
            let file = File::create(dest).map_err(io_err)?;
            Ok(Some(Sink {
                file: BufWriter::with_capacity(CHUNK_SIZE, file),
                mode,
                base: 0,
                written: 0,
            }))
        }
        _ => Ok(None),
    }
}
