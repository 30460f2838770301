use std::path::PathBuf;

use bridgegad_config::{AppConfig, ConfigError};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

mod commands;

/// 桥梁参数化出图与 DXF 导出工具
///
/// 示例：
///   bridgegad serve --port 8000
///   bridgegad export --input request.json --output bridge.dxf --verify
#[derive(Parser, Debug)]
#[command(name = "bridgegad", version, about = "Bridge drawing export to DXF")]
struct Cli {
    /// 显式指定配置文件，跳过自动发现
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 启动 HTTP 导出服务
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// 从 JSON 请求文件直接导出 DXF
    Export {
        #[arg(long, short)]
        input: PathBuf,
        /// 缺省时按配置的文件名规则写入当前目录
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// 写出后重新解析文件并检查结构
        #[arg(long)]
        verify: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    let mut config = load_configuration(cli.config);
    init_logging(&config);
    info!("启动 bridgegad");

    let result = match cli.command {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            commands::serve(&config)
        }
        Command::Export {
            input,
            output,
            verify,
        } => commands::export(&config, &input, output.as_deref(), verify).map(|report| {
            println!("{report}");
        }),
    };

    if let Err(err) = result {
        error!(error = %err, "执行失败");
        std::process::exit(1);
    }
}

fn load_configuration(override_path: Option<PathBuf>) -> AppConfig {
    match override_path {
        Some(path) => AppConfig::from_file(&path).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "加载指定配置失败，使用默认配置");
            AppConfig::default()
        }),
        None => match AppConfig::discover() {
            Ok(cfg) => cfg,
            Err(err) => {
                match &err {
                    ConfigError::Io { path, .. }
                    | ConfigError::Parse { path, .. }
                    | ConfigError::Invalid { path, .. } => {
                        warn!(path = %path.display(), error = %err, "加载默认配置失败，使用内建默认值");
                    }
                    ConfigError::Context { .. } => {
                        warn!(error = %err, "加载默认配置失败，使用内建默认值");
                    }
                }
                AppConfig::default()
            }
        },
    }
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(config.logging.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
