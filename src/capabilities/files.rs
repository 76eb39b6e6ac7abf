// ABOUTME: Local filesystem provider for file_copy steps
// ABOUTME: Reads and writes whole files through tokio's async fs

use async_trait::async_trait;
use std::path::Path;
use tokio::fs;
use tracing::debug;

use super::FileStore;
use crate::engine::error::Result;

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileStore;

#[async_trait]
impl FileStore for LocalFileStore {
    async fn read_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        let bytes = fs::read(path).await?;
        debug!("Read {} bytes from {}", bytes.len(), path.display());
        Ok(bytes)
    }

    async fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        fs::write(path, bytes).await?;
        debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }
}
