use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use bridgegad_config::AppConfig;
use bridgegad_engine::BridgeExportRequest;
use bridgegad_io::{DxfSummary, IoError, inspect};
use bridgegad_service::{ExportError, ExportService, ServeError};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("读取请求文件 {path:?} 失败: {source}")]
    ReadRequest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析请求文件 {path:?} 失败: {source}")]
    ParseRequest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("写出文件 {path:?} 失败: {source}")]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Inspect(#[from] IoError),
    #[error("校验失败: {0}")]
    Verify(String),
    #[error("创建异步运行时失败: {0}")]
    Runtime(#[source] std::io::Error),
    #[error(transparent)]
    Serve(#[from] ServeError),
}

/// `export` 子命令的结果摘要。
#[derive(Debug)]
pub struct ExportReport {
    pub path: PathBuf,
    pub size: usize,
    pub summary: Option<DxfSummary>,
}

impl fmt::Display for ExportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "已写出 {} ({} 字节)", self.path.display(), self.size)?;
        if let Some(summary) = &self.summary {
            write!(
                f,
                "\n校验通过: 版本 {}, {} 个图层, {} 个实体",
                summary.acadver.as_deref().unwrap_or("?"),
                summary.layers.len(),
                summary.entities.len()
            )?;
        }
        Ok(())
    }
}

pub fn serve(config: &AppConfig) -> Result<(), AppError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(AppError::Runtime)?;
    runtime.block_on(bridgegad_service::serve(
        &config.server,
        config.export.clone(),
    ))?;
    Ok(())
}

pub fn export(
    config: &AppConfig,
    input: &Path,
    output: Option<&Path>,
    verify: bool,
) -> Result<ExportReport, AppError> {
    let request = read_request(input)?;
    let service = ExportService::new(config.export.clone());
    let file = service.export(&request)?;

    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&file.file_name));
    fs::write(&path, &file.bytes).map_err(|source| AppError::WriteOutput {
        path: path.clone(),
        source,
    })?;
    info!(path = %path.display(), size = file.bytes.len(), "DXF 已写出");

    let summary = if verify {
        let text = String::from_utf8_lossy(&file.bytes);
        let summary = inspect(&text)?;
        check_summary(&summary, &request)?;
        debug!(entities = summary.entities.len(), "校验通过");
        Some(summary)
    } else {
        None
    };

    Ok(ExportReport {
        path,
        size: file.bytes.len(),
        summary,
    })
}

fn read_request(path: &Path) -> Result<BridgeExportRequest, AppError> {
    let content = fs::read_to_string(path).map_err(|source| AppError::ReadRequest {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| AppError::ParseRequest {
        path: path.to_path_buf(),
        source,
    })
}

/// 标题、比例、基线各一个实体，另加相邻断面之间的地面线。
fn check_summary(summary: &DxfSummary, request: &BridgeExportRequest) -> Result<(), AppError> {
    let undeclared = summary.undeclared_layers();
    if !undeclared.is_empty() {
        return Err(AppError::Verify(format!(
            "实体引用了未声明的图层: {}",
            undeclared.join(", ")
        )));
    }
    let expected = 3 + request.cross_sections.len().saturating_sub(1);
    if summary.entities.len() != expected {
        return Err(AppError::Verify(format!(
            "实体数量为 {}，预期 {expected}",
            summary.entities.len()
        )));
    }
    Ok(())
}
