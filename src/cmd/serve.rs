//! Admin API server command: `web2app-admin serve`.

use std::path::Path;

use anyhow::Result;
use web2app_admin::config::AdminConfig;
use web2app_admin::dashboard::server::{ServerConfig, start_server};

pub async fn cmd_serve(config_path: &Path, port: Option<u16>, dev: bool, open: bool) -> Result<()> {
    let config = AdminConfig::resolve(config_path)?;
    let mut server = ServerConfig::from_config(&config);
    if let Some(port) = port {
        server.port = port;
    }
    server.dev_mode = dev;

    // Spawn browser open before starting the server (which blocks)
    if open {
        let url = format!("http://localhost:{}/api/admin/login", server.port);
        tokio::spawn(async move {
            tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;
            if let Err(e) = open::that(&url) {
                tracing::warn!(error = %e, "failed to open browser");
            }
        });
    }

    start_server(config, server).await
}
