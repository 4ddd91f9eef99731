//! SHA-256 checksum calculation for file verification.
//!
//! Used both when diffing the local tree against the manifest and when
//! verifying a freshly transferred file.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

/// Buffer size for reading files during checksum calculation (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Calculate the SHA-256 checksum of a file.
///
/// Returns the lowercase hexadecimal digest. The file is read in bounded
/// chunks, never loaded whole.
pub fn calculate_file_checksum(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Calculate the SHA-256 checksum of an in-memory buffer.
pub fn calculate_checksum(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Compare two hex digests, ignoring case and surrounding whitespace.
pub fn checksums_match(actual: &str, expected: &str) -> bool {
    actual.trim().eq_ignore_ascii_case(expected.trim())
}
