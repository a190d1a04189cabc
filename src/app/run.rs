//! Main application run loop

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::app::options::{AppOptions, LifecycleOptions};
use crate::app::state::AppState;
use crate::errors::PluginError;
use crate::server::serve::{remove_socket_dir, serve, socket_dir};
use crate::server::state::ServerState;
use crate::workers::refresher;

/// Run the boshscope plugin
pub async fn run(
    options: AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), PluginError> {
    info!("Initializing boshscope plugin...");

    // Create shutdown channel
    let (shutdown_tx, _shutdown_rx): (broadcast::Sender<()>, _) = broadcast::channel(1);
    let mut shutdown_manager = ShutdownManager::new(options.lifecycle.clone());

    // Initialize state and workers
    if let Err(e) = init(&options, shutdown_tx.clone(), &mut shutdown_manager).await {
        error!("Failed to start plugin: {}", e);
        shutdown_manager.shutdown(&shutdown_tx).await?;
        return Err(e);
    }

    tokio::select! {
        _ = shutdown_signal => {
            info!("Shutdown signal received, shutting down...");
        }
    }

    // Shutdown
    shutdown_manager.shutdown(&shutdown_tx).await
}

// =============================== INITIALIZATION ================================== //

async fn init(
    options: &AppOptions,
    shutdown_tx: broadcast::Sender<()>,
    shutdown_manager: &mut ShutdownManager,
) -> Result<(), PluginError> {
    let app_state = Arc::new(AppState::init(options).await?);

    init_refresher_worker(
        options.refresher.clone(),
        app_state.clone(),
        shutdown_manager,
        shutdown_tx.subscribe(),
    )?;

    init_socket_server(
        options,
        app_state,
        shutdown_manager,
        shutdown_tx.subscribe(),
    )
    .await?;

    Ok(())
}

fn init_refresher_worker(
    options: refresher::Options,
    app_state: Arc<AppState>,
    shutdown_manager: &mut ShutdownManager,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), PluginError> {
    info!("Initializing refresh worker...");

    let refresher_handle = tokio::spawn(async move {
        refresher::run(
            &options,
            &app_state.hostname,
            app_state.job_spec_file.as_ref(),
            app_state.monit_client.as_ref(),
            app_state.store.as_ref(),
            tokio::time::sleep,
            Box::pin(async move {
                let _ = shutdown_rx.recv().await;
            }),
        )
        .await;
    });

    shutdown_manager.with_refresher_worker_handle(refresher_handle)?;
    Ok(())
}

async fn init_socket_server(
    options: &AppOptions,
    app_state: Arc<AppState>,
    shutdown_manager: &mut ShutdownManager,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), PluginError> {
    info!("Initializing local report server...");

    let server_state = ServerState::new(app_state.store.clone());

    let server_handle = serve(&options.server, Arc::new(server_state), async move {
        let _ = shutdown_rx.recv().await;
    })
    .await?;

    shutdown_manager.with_socket_server_handle(server_handle, socket_dir(&options.server.socket_path)?)?;
    Ok(())
}

// ================================= SHUTDOWN ===================================== //

struct ShutdownManager {
    lifecycle_options: LifecycleOptions,
    refresher_worker_handle: Option<JoinHandle<()>>,
    socket_server_handle: Option<JoinHandle<Result<(), PluginError>>>,
    socket_dir: Option<PathBuf>,
}

impl ShutdownManager {
    pub fn new(lifecycle_options: LifecycleOptions) -> Self {
        Self {
            lifecycle_options,
            refresher_worker_handle: None,
            socket_server_handle: None,
            socket_dir: None,
        }
    }

    pub fn with_refresher_worker_handle(
        &mut self,
        handle: JoinHandle<()>,
    ) -> Result<(), PluginError> {
        if self.refresher_worker_handle.is_some() {
            return Err(PluginError::ShutdownError(
                "refresher_handle already set".to_string(),
            ));
        }
        self.refresher_worker_handle = Some(handle);
        Ok(())
    }

    pub fn with_socket_server_handle(
        &mut self,
        handle: JoinHandle<Result<(), PluginError>>,
        socket_dir: PathBuf,
    ) -> Result<(), PluginError> {
        if self.socket_server_handle.is_some() {
            return Err(PluginError::ShutdownError(
                "server_handle already set".to_string(),
            ));
        }
        self.socket_server_handle = Some(handle);
        self.socket_dir = Some(socket_dir);
        Ok(())
    }

    pub async fn shutdown(
        &mut self,
        shutdown_tx: &broadcast::Sender<()>,
    ) -> Result<(), PluginError> {
        let _ = shutdown_tx.send(());

        match tokio::time::timeout(
            self.lifecycle_options.max_shutdown_delay,
            self.shutdown_impl(),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                error!(
                    "Shutdown timed out after {:?}, forcing shutdown...",
                    self.lifecycle_options.max_shutdown_delay
                );
                std::process::exit(1);
            }
        }
    }

    async fn shutdown_impl(&mut self) -> Result<(), PluginError> {
        info!("Shutting down boshscope plugin...");

        // 1. Refresh worker
        if let Some(handle) = self.refresher_worker_handle.take() {
            handle
                .await
                .map_err(|e| PluginError::ShutdownError(e.to_string()))?;
        }

        // 2. Socket server, then its socket directory
        if let Some(handle) = self.socket_server_handle.take() {
            handle
                .await
                .map_err(|e| PluginError::ShutdownError(e.to_string()))??;
        }
        if let Some(socket_dir) = self.socket_dir.take() {
            remove_socket_dir(&socket_dir).await;
        }

        info!("Shutdown complete");
        Ok(())
    }
}
