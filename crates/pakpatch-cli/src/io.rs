//! Loading inputs and writing patched archives

use crate::device::DeviceName;
use crate::error::{CliError, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Archive and payload bytes shared by every run
#[derive(Debug, Clone)]
pub struct Inputs {
    /// File name of the archive, reused for outputs
    pub pak_name: OsString,
    /// Encoded archive
    pub container: Arc<[u8]>,
    /// Plaintext payload
    pub payload: Arc<[u8]>,
}

impl Inputs {
    /// Read both inputs from disk
    pub async fn load(pak: &Path, payload: &Path) -> Result<Self> {
        let container = read(pak).await?;
        let payload_bytes = read(payload).await?;

        Ok(Self {
            pak_name: pak
                .file_name()
                .map_or_else(|| OsString::from("patched.pak"), OsString::from),
            container,
            payload: payload_bytes,
        })
    }
}

/// Read a whole file into shared memory
pub async fn read(path: &Path) -> Result<Arc<[u8]>> {
    let data = tokio::fs::read(path)
        .await
        .map_err(|e| CliError::read(path, e))?;
    debug!(path = %path.display(), len = data.len(), "read input");
    Ok(data.into())
}

/// `<out_dir>/<DEVICE>/<pak_name>`
pub fn output_path(out_dir: &Path, device: &DeviceName, pak_name: &OsString) -> PathBuf {
    out_dir.join(device.as_str()).join(pak_name)
}

/// Write `data` to `path`, creating parent directories
pub async fn write_output(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| CliError::write(parent, e))?;
    }
    tokio::fs::write(path, data)
        .await
        .map_err(|e| CliError::write(path, e))?;
    debug!(path = %path.display(), len = data.len(), "wrote output");
    Ok(())
}
