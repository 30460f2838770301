//! 导出流水线：参数 → 图纸文档 → 临时 DXF 文件 → 内存字节。
//! 临时文件由 `NamedTempFile` 持有，无论成功与否都会在返回前删除。

use std::fs;
use std::path::Path;

use bridgegad_config::ExportConfig;
use bridgegad_core::document::DrawingDocument;
use bridgegad_engine::BridgeExportRequest;
use bridgegad_io::{DocumentSaver, DxfFacade};
use chrono::{DateTime, Local};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::errors::ExportError;

/// 下载文件名中的时间戳格式。
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// 一次导出的结果：建议的下载文件名与完整文件内容。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ExportService {
    config: ExportConfig,
    facade: DxfFacade,
}

impl ExportService {
    pub fn new(config: ExportConfig) -> Self {
        let facade = DxfFacade::with_version(config.dxf_version);
        Self { config, facade }
    }

    #[inline]
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn render(&self, request: &BridgeExportRequest) -> Result<DrawingDocument, ExportError> {
        Ok(request.build_with_units(self.config.units)?)
    }

    pub fn export(&self, request: &BridgeExportRequest) -> Result<ExportedFile, ExportError> {
        self.export_at(request, Local::now())
    }

    /// 以给定时间生成文件名，便于测试固定输出。
    pub fn export_at(
        &self,
        request: &BridgeExportRequest,
        at: DateTime<Local>,
    ) -> Result<ExportedFile, ExportError> {
        let document = self.render(request)?;
        let bytes = self.write_through_temp_file(&document)?;
        let file_name = self
            .config
            .file_name(&at.format(TIMESTAMP_FORMAT).to_string());
        info!(
            file_name = %file_name,
            entities = document.len(),
            cross_sections = request.cross_sections.len(),
            size = bytes.len(),
            "导出 DXF 完成"
        );
        Ok(ExportedFile { file_name, bytes })
    }

    fn write_through_temp_file(&self, document: &DrawingDocument) -> Result<Vec<u8>, ExportError> {
        let temp = self.create_temp_file()?;
        debug!(path = %temp.path().display(), "写入临时文件");

        self.facade.save(document, temp.path())?;
        let bytes = fs::read(temp.path()).map_err(|source| ExportError::TempFile {
            path: Some(temp.path().to_path_buf()),
            source,
        })?;

        let path = temp.path().to_path_buf();
        if let Err(err) = temp.close() {
            warn!(path = %path.display(), error = %err, "删除临时文件失败");
        }
        Ok(bytes)
    }

    fn create_temp_file(&self) -> Result<NamedTempFile, ExportError> {
        let prefix = format!("{}_", self.config.file_prefix);
        let suffix = format!(".{}", self.config.file_extension);
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix).suffix(&suffix);
        let created = match self.config.temp_dir.as_deref() {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        };
        created.map_err(|source| ExportError::TempFile {
            path: self.config.temp_dir.as_deref().map(Path::to_path_buf),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamp_format_matches_download_name() {
        let at = Local.with_ymd_and_hms(2024, 1, 31, 9, 5, 7).unwrap();
        let config = ExportConfig::default();
        assert_eq!(
            config.file_name(&at.format(TIMESTAMP_FORMAT).to_string()),
            "bridge_export_20240131_090507.dxf"
        );
    }
}
