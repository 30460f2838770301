pub mod errors;
pub mod export;
pub mod routes;

use bridgegad_config::{ExportConfig, ServerConfig};
use tokio::net::TcpListener;
use tracing::info;

pub use errors::{ExportError, ServeError};
pub use export::{ExportService, ExportedFile};
pub use routes::router;

/// 绑定配置地址并运行导出服务，收到 Ctrl-C 后优雅退出。
pub async fn serve(server: &ServerConfig, export: ExportConfig) -> Result<(), ServeError> {
    let address = server.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| ServeError::Bind {
            address: address.clone(),
            source,
        })?;
    info!(
        address = %address,
        version = export.dxf_version.acadver(),
        "导出服务已启动"
    );

    axum::serve(listener, router(ExportService::new(export)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServeError::Server)?;
    info!("导出服务已停止");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // 无法监听信号时保持运行
        std::future::pending::<()>().await;
    }
}
