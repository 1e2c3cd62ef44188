//! SHA-256 digests and `sha256sum`-style listings for exported files.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::path::Path;

/// Hex SHA-256 of an in-memory buffer.
pub fn sha256_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Hex SHA-256 of a file, streamed.
pub fn sha256_file(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// One `<digest>  <file name>` line, the format `sha256sum -c` accepts.
pub fn listing_line(digest: &str, file_name: &str) -> String {
    format!("{}  {}\n", digest, file_name)
}

/// Digest listed for `file_name`, if any.
pub fn listed_digest<'a>(listing: &'a str, file_name: &str) -> Option<&'a str> {
    listing
        .lines()
        .filter_map(|line| line.split_once("  "))
        .find(|(_, name)| *name == file_name)
        .map(|(digest, _)| digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[test]
    fn test_sha256_bytes() {
        assert_eq!(sha256_bytes(b"hello world"), HELLO);
    }

    #[test]
    fn test_sha256_file_matches_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.csv");
        std::fs::write(&path, b"hello world").unwrap();
        assert_eq!(sha256_file(&path).unwrap(), HELLO);
    }

    #[test]
    fn test_listing_lookup() {
        let listing = format!(
            "{}{}",
            listing_line(HELLO, "evidence.csv"),
            listing_line("00ff", "evidence.json")
        );
        assert_eq!(listed_digest(&listing, "evidence.json"), Some("00ff"));
        assert_eq!(listed_digest(&listing, "evidence.csv"), Some(HELLO));
        assert_eq!(listed_digest(&listing, "other.csv"), None);
    }
}
