//! Zip fixtures shaped like the upstream release archives.

use sha2::{Digest, Sha256};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;

/// Zip bytes holding `files` as `(path, contents)` pairs.
pub fn zip_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in files {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(body).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// A release-shaped archive: one root folder with `bin/ffmpeg` and `bin/ffprobe`.
pub fn release_zip(root: &str) -> Vec<u8> {
    let ffmpeg = format!("{}/bin/{}", root, exe("ffmpeg"));
    let ffprobe = format!("{}/bin/{}", root, exe("ffprobe"));
    let license = format!("{}/LICENSE", root);
    zip_bytes(&[
        (ffmpeg.as_str(), b"ffmpeg build"),
        (ffprobe.as_str(), b"ffprobe build"),
        (license.as_str(), b"GPL"),
    ])
}

pub fn exe(name: &str) -> String {
    format!("{}{}", name, std::env::consts::EXE_SUFFIX)
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Sidecar text in the `<digest>  <file>` form published upstream.
pub fn sidecar_for(bytes: &[u8], file: &str) -> String {
    format!("{}  {}\n", sha256_hex(bytes), file)
}
