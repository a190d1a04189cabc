//! HTTP server over a unix domain socket
//!
//! Scope discovers plugins by scanning the plugins root for sockets,
//! so the socket lives in its own directory which is wiped and
//! recreated on startup and removed again on shutdown.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::fs;
use tokio::net::UnixListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::errors::PluginError;
use crate::server::handlers::report_handler;
use crate::server::state::ServerState;

/// Server options
#[derive(Debug, Clone)]
pub struct Options {
    /// Path of the unix socket to listen on
    pub socket_path: PathBuf,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from("/var/run/scope/plugins/bosh/bosh.sock"),
        }
    }
}

/// Start the report server on a unix socket
pub async fn serve(
    options: &Options,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), PluginError>>, PluginError> {
    let app = Router::new()
        .route("/report", get(report_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let socket_dir = socket_dir(&options.socket_path)?;
    prepare_socket_dir(&socket_dir).await?;

    let listener = UnixListener::bind(&options.socket_path).map_err(|e| {
        PluginError::ServerError(format!(
            "error listening on {:?}: {}",
            options.socket_path, e
        ))
    })?;

    info!("Listening on unix://{}", options.socket_path.display());

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| PluginError::ServerError(e.to_string()))
    });

    Ok(handle)
}

/// The directory holding the plugin socket
pub fn socket_dir(socket_path: &Path) -> Result<PathBuf, PluginError> {
    socket_path
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| {
            PluginError::ConfigError(format!("socket path {:?} has no parent", socket_path))
        })
}

/// Remove the socket directory, e.g. after shutdown
pub async fn remove_socket_dir(socket_dir: &Path) {
    let _ = fs::remove_dir_all(socket_dir).await;
}

async fn prepare_socket_dir(socket_dir: &Path) -> Result<(), PluginError> {
    // A socket left behind by a previous run would fail the bind.
    remove_socket_dir(socket_dir).await;
    fs::create_dir_all(socket_dir).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(socket_dir, std::fs::Permissions::from_mode(0o700)).await?;
    }

    Ok(())
}
