use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use bridgegad_core::document::DrawingUnits;
use bridgegad_io::DxfVersion;
use serde::Deserialize;
use thiserror::Error;

/// 指定配置文件路径的环境变量。
pub const CONFIG_ENV_VAR: &str = "BRIDGEGAD_CONFIG";

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

impl AppConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.export.validate().map_err(|message| ConfigError::Invalid {
            path: path.to_path_buf(),
            message,
        })?;
        Ok(config)
    }

    /// 自动发现配置文件：优先读取环境变量 `BRIDGEGAD_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os(CONFIG_ENV_VAR) {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "获取当前工作目录失败".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// HTTP 导出服务的监听地址。
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "ServerConfig::default_host")]
    pub host: String,
    #[serde(default = "ServerConfig::default_port")]
    pub port: u16,
}

impl ServerConfig {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        8000
    }

    /// `host:port` 形式的监听地址。
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub dxf_version: DxfVersion,
    #[serde(default)]
    pub units: DrawingUnits,
    #[serde(default = "ExportConfig::default_file_prefix")]
    pub file_prefix: String,
    #[serde(default = "ExportConfig::default_file_extension")]
    pub file_extension: String,
    /// 临时文件目录，缺省时使用系统临时目录。
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

impl ExportConfig {
    fn default_file_prefix() -> String {
        "bridge_export".to_string()
    }

    fn default_file_extension() -> String {
        "dxf".to_string()
    }

    /// 下载文件名：`<prefix>_<stamp>.<extension>`。
    pub fn file_name(&self, stamp: &str) -> String {
        format!("{}_{}.{}", self.file_prefix, stamp, self.file_extension)
    }

    fn validate(&self) -> Result<(), String> {
        if self.file_prefix.is_empty() {
            return Err("export.file_prefix 不能为空".to_string());
        }
        if self.file_extension.is_empty() || self.file_extension.starts_with('.') {
            return Err(format!(
                "export.file_extension 无效: {:?}",
                self.file_extension
            ));
        }
        let unsafe_char = |c: char| matches!(c, '/' | '\\' | '"') || c.is_control();
        if self.file_prefix.contains(unsafe_char) || self.file_extension.contains(unsafe_char) {
            return Err("导出文件名不能包含路径分隔符、引号或控制字符".to_string());
        }
        Ok(())
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dxf_version: DxfVersion::default(),
            units: DrawingUnits::default(),
            file_prefix: Self::default_file_prefix(),
            file_extension: Self::default_file_extension(),
            temp_dir: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("配置文件 {path:?} 无效: {message}")]
    Invalid { path: PathBuf, message: String },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}
