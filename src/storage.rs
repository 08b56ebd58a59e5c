use std::path::PathBuf;

/// Flat directory of files addressed by name.
///
/// The directory is created on first write, not on construction.
#[derive(Clone, Debug)]
pub struct BackendLocal {
    pub base_dir: PathBuf,
}

impl BackendLocal {
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        BackendLocal {
            base_dir: storage_dir.into(),
        }
    }

    pub fn path(&self, ident: &str) -> PathBuf {
        self.base_dir.join(ident)
    }

    pub async fn exists(&self, ident: &str) -> bool {
        tokio::fs::try_exists(self.path(ident))
            .await
            .unwrap_or(false)
    }

    /// Write through a uniquely named temp file and rename it into place,
    /// so readers never observe a partial file and racing writers of the same
    /// name simply replace each other.
    pub async fn write(&self, ident: &str, data: &[u8]) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.base_dir).await?;

        let path = self.path(ident);
        let temp_path = self.temp_path(ident);

        if let Err(err) = tokio::fs::write(&temp_path, data).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(err);
        }

        if let Err(err) = tokio::fs::rename(&temp_path, &path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(err);
        }

        Ok(())
    }

    fn temp_path(&self, ident: &str) -> PathBuf {
        let name = format!(".{}-{ident}.tmp", rusty_ulid::generate_ulid_string());
        self.base_dir.join(name)
    }
}
