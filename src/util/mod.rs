//! Small helpers shared by the file-backed components.

use rand::RngCore;
use std::path::{Path, PathBuf};

/// `<base><suffix>`: one database is three files sharing a base path.
pub fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut s = base.as_os_str().to_os_string();
    s.push(suffix);
    PathBuf::from(s)
}

/// Cryptographically random bytes (first-page markers).
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_is_appended_not_replaced() {
        let p = with_suffix(Path::new("/tmp/db.v1/main"), ".log");
        assert_eq!(p, PathBuf::from("/tmp/db.v1/main.log"));
        let q = with_suffix(Path::new("data.x"), ".db");
        assert_eq!(q, PathBuf::from("data.x.db"));
    }

    #[test]
    fn random_bytes_have_requested_len() {
        assert_eq!(random_bytes(8).len(), 8);
        assert!(random_bytes(0).is_empty());
    }
}
