//! Application configuration options

use std::path::PathBuf;
use std::time::Duration;

use crate::monit::client;
use crate::server::serve;
use crate::workers::refresher;

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Hostname as reported to Scope
    pub hostname: String,

    /// Path to the BOSH job spec file
    pub job_spec_path: PathBuf,

    /// Server configuration
    pub server: serve::Options,

    /// Refresh worker options
    pub refresher: refresher::Options,

    /// Monit client options
    pub monit: client::Options,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            lifecycle: LifecycleOptions::default(),
            hostname: String::new(),
            job_spec_path: PathBuf::from("/var/vcap/bosh/spec.json"),
            server: serve::Options::default(),
            refresher: refresher::Options::default(),
            monit: client::Options::default(),
        }
    }
}

/// Lifecycle options for the plugin process
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}
