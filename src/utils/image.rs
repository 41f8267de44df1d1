//! Utility functions for reading uploads from disk.

use crate::core::TriageError;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Reads an upload file, refusing anything larger than `limit` bytes.
///
/// The size is checked from metadata before the file is read, and the read
/// itself is capped so a file growing underneath us cannot exceed the limit.
///
/// # Errors
///
/// Returns [`TriageError::OversizeInput`] for files over the limit and
/// [`TriageError::Io`] if the file cannot be opened or read.
pub fn read_upload(path: impl AsRef<Path>, limit: usize) -> Result<Vec<u8>, TriageError> {
    let file = File::open(path.as_ref())?;
    let size = file.metadata()?.len();
    if size > limit as u64 {
        return Err(TriageError::oversize_input(
            usize::try_from(size).unwrap_or(usize::MAX),
            limit,
        ));
    }

    let mut bytes = Vec::with_capacity(size as usize);
    file.take(limit as u64 + 1).read_to_end(&mut bytes)?;
    if bytes.len() > limit {
        return Err(TriageError::oversize_input(bytes.len(), limit));
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(name: &str, len: usize) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("chest-triage-{}-{name}", std::process::id()));
        let mut file = File::create(&path).unwrap();
        file.write_all(&vec![7u8; len]).unwrap();
        path
    }

    #[test]
    fn test_read_upload_within_limit() {
        let path = temp_file("small.bin", 10);
        assert_eq!(read_upload(&path, 10).unwrap().len(), 10);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_read_upload_over_limit() {
        let path = temp_file("large.bin", 11);
        let err = read_upload(&path, 10).unwrap_err();
        assert!(matches!(err, TriageError::OversizeInput { size: 11, limit: 10 }));
        std::fs::remove_file(path).unwrap();
    }
}
