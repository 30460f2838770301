mod reader;
mod writer;

use std::fs;
use std::path::Path;

use bridgegad_core::document::DrawingDocument;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use reader::{DxfSummary, EntityRecord, LayerRecord, inspect};
pub use writer::{DxfEncoder, encode};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("encoding error: {0}")]
    Encoding(String),
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write file {path:?}: {source}")]
    WriteError {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid document structure: {0}")]
    InvalidDocument(String),
}

/// DXF 文件版本（`$ACADVER`）。R2007 起文件按 UTF-8 编码。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DxfVersion {
    R2000,
    R2004,
    R2007,
    #[default]
    R2010,
    R2013,
}

impl DxfVersion {
    #[inline]
    pub fn acadver(self) -> &'static str {
        match self {
            DxfVersion::R2000 => "AC1015",
            DxfVersion::R2004 => "AC1018",
            DxfVersion::R2007 => "AC1021",
            DxfVersion::R2010 => "AC1024",
            DxfVersion::R2013 => "AC1027",
        }
    }

    pub fn from_acadver(raw: &str) -> Option<Self> {
        match raw.trim() {
            "AC1015" => Some(DxfVersion::R2000),
            "AC1018" => Some(DxfVersion::R2004),
            "AC1021" => Some(DxfVersion::R2007),
            "AC1024" => Some(DxfVersion::R2010),
            "AC1027" => Some(DxfVersion::R2013),
            _ => None,
        }
    }

    #[inline]
    pub fn is_unicode(self) -> bool {
        self >= DxfVersion::R2007
    }
}

pub trait DocumentSaver {
    fn save(&self, document: &DrawingDocument, path: &Path) -> Result<(), IoError>;
}

/// DXF 读写入口：编码整份图纸，或对已写出的文件做结构检查。
#[derive(Debug, Clone, Copy, Default)]
pub struct DxfFacade {
    encoder: DxfEncoder,
}

impl DxfFacade {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_version(version: DxfVersion) -> Self {
        Self {
            encoder: DxfEncoder::new(version),
        }
    }

    #[inline]
    pub fn version(&self) -> DxfVersion {
        self.encoder.version()
    }

    pub fn encode(&self, document: &DrawingDocument) -> Result<Vec<u8>, IoError> {
        self.encoder.encode(document)
    }

    pub fn inspect_file(&self, path: &Path) -> Result<DxfSummary, IoError> {
        let data = fs::read_to_string(path).map_err(|source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        inspect(&data)
    }
}

impl DocumentSaver for DxfFacade {
    fn save(&self, document: &DrawingDocument, path: &Path) -> Result<(), IoError> {
        let bytes = self.encoder.encode(document)?;
        fs::write(path, bytes).map_err(|source| IoError::WriteError {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acadver_round_trips() {
        for version in [
            DxfVersion::R2000,
            DxfVersion::R2004,
            DxfVersion::R2007,
            DxfVersion::R2010,
            DxfVersion::R2013,
        ] {
            assert_eq!(DxfVersion::from_acadver(version.acadver()), Some(version));
        }
        assert_eq!(DxfVersion::default().acadver(), "AC1024");
        assert!(DxfVersion::from_acadver("AC1009").is_none());
        assert!(!DxfVersion::R2004.is_unicode());
        assert!(DxfVersion::R2007.is_unicode());
    }
}
