use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::foundation::error::{CaptionError, CaptionResult};

/// Font file bytes, loaded once per run and shared read-only by shaping and rasterization.
#[derive(Clone, Debug)]
pub struct LoadedFont {
    path: PathBuf,
    bytes: Arc<Vec<u8>>,
}

impl LoadedFont {
    pub fn load(path: &Path) -> CaptionResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            CaptionError::config(format!("failed to read font '{}': {e}", path.display()))
        })?;
        if bytes.is_empty() {
            return Err(CaptionError::config(format!(
                "font '{}' is empty",
                path.display()
            )));
        }
        tracing::debug!(font = %path.display(), bytes = bytes.len(), "font loaded");
        Ok(Self {
            path: path.to_path_buf(),
            bytes: Arc::new(bytes),
        })
    }

    /// Wrap bytes that did not come from disk.
    pub fn from_bytes(label: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        Self {
            path: label.into(),
            bytes: Arc::new(bytes),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Font handle for `vello_cpu` glyph rasterization.
    pub(crate) fn font_data(&self) -> vello_cpu::peniko::FontData {
        vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(self.bytes.as_ref().clone()),
            0,
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/font.rs"]
mod tests;
