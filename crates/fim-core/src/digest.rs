//! Streaming SHA-256 content digests.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Bytes read per iteration while hashing (1 MiB).
pub const DIGEST_CHUNK_SIZE: usize = 1024 * 1024;

/// Hash a file's full content, returning the 64-char lowercase hex digest.
///
/// The file is read in [`DIGEST_CHUNK_SIZE`] chunks so memory use does not
/// depend on file size. Open and read errors are returned untouched; the
/// caller decides whether they are fatal.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let file = File::open(path)?;
    sha256_reader(file, DIGEST_CHUNK_SIZE)
}

/// Hash everything readable from `reader` using a buffer of `chunk_size` bytes.
pub fn sha256_reader<R: Read>(mut reader: R, chunk_size: usize) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; chunk_size.max(1)];
    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
