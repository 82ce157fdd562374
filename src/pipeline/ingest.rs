//! Persisting uploads into ComfyUI's input directory.
use std::path::Path;

use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncRead, AsyncWriteExt, BufWriter};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// `<uuid><ext>` where `ext` is the original extension including its dot.
pub fn unique_filename(original_filename: &str) -> String {
    let extension = Path::new(original_filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();
    format!("{}{}", Uuid::new_v4(), extension)
}

/// Copy `source` into a freshly named file under `input_dir` and return that
/// name. The name, not the path, is what the workflow references.
pub async fn store_upload<R>(input_dir: &Path, original_filename: &str, mut source: R) -> AppResult<String>
where
    R: AsyncRead + Unpin,
{
    let is_dir = fs::metadata(input_dir).await.map(|m| m.is_dir()).unwrap_or(false);
    if !is_dir {
        return Err(AppError::Configuration(format!(
            "ComfyUI input directory does not exist: {}",
            input_dir.display()
        )));
    }

    let filename = unique_filename(original_filename);
    let path = input_dir.join(&filename);
    let file = OpenOptions::new().write(true).create_new(true).open(&path).await?;
    let mut writer = BufWriter::new(file);
    let written = tokio::io::copy(&mut source, &mut writer).await?;
    writer.flush().await?;
    writer.into_inner().sync_all().await?;

    tracing::info!(path = %path.display(), bytes = written, original = original_filename, "stored upload");
    Ok(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_filename_keeps_extension() {
        let name = unique_filename("cat.jpg");
        assert!(name.ends_with(".jpg"));
        assert_eq!(name.len(), 36 + 4);
        assert!(!unique_filename("README").contains('.'));
    }

    #[tokio::test]
    async fn repeated_uploads_never_collide() -> AppResult<()> {
        let dir = tempfile::tempdir()?;
        let first = store_upload(dir.path(), "cat.jpg", &b"first"[..]).await?;
        let second = store_upload(dir.path(), "cat.jpg", &b"second"[..]).await?;
        assert_ne!(first, second);
        assert_eq!(std::fs::read(dir.path().join(&first))?, b"first");
        assert_eq!(std::fs::read(dir.path().join(&second))?, b"second");
        Ok(())
    }

    #[tokio::test]
    async fn large_payload_is_written_completely() -> AppResult<()> {
        let dir = tempfile::tempdir()?;
        let payload: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let name = store_upload(dir.path(), "big.png", payload.as_slice()).await?;
        assert_eq!(std::fs::read(dir.path().join(name))?, payload);
        Ok(())
    }

    #[tokio::test]
    async fn missing_input_dir_is_a_configuration_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = store_upload(&dir.path().join("input"), "cat.jpg", &b"x"[..])
            .await
            .expect_err("missing dir");
        assert!(matches!(err, AppError::Configuration(_)));
    }
}
