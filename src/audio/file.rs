//! Audio file persistence helpers

use std::path::Path;

use crate::Result;

/// Write audio bytes to `path`, replacing any existing file
///
/// # Errors
///
/// Returns error if the file cannot be written
pub fn save_audio_to_file(data: &[u8], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, data)?;
    tracing::debug!(path = %path.display(), bytes = data.len(), "audio saved");
    Ok(())
}

/// Read audio bytes from `path`
///
/// # Errors
///
/// Returns error if the file cannot be read
pub fn load_audio_from_file(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    tracing::debug!(path = %path.display(), bytes = data.len(), "audio loaded");
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_audio.wav");

        save_audio_to_file(b"TEST_AUDIO_DATA", &path).unwrap();
        assert!(path.exists());

        assert_eq!(load_audio_from_file(&path).unwrap(), b"TEST_AUDIO_DATA");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_audio_from_file(dir.path().join("missing.wav")).unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
    }
}
