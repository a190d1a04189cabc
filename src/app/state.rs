//! Application state management

use std::sync::Arc;

use tracing::info;

use crate::app::options::AppOptions;
use crate::errors::PluginError;
use crate::filesys::file::File;
use crate::monit::client::MonitClient;
use crate::report::store::ReportStore;

/// Main application state
pub struct AppState {
    /// Job spec file reference
    pub job_spec_file: Arc<File>,

    /// Monit client, the process status source
    pub monit_client: Arc<MonitClient>,

    /// Latest report holder
    pub store: Arc<ReportStore>,

    /// Hostname as reported to Scope
    pub hostname: String,
}

impl AppState {
    /// Initialize application state. Failures here (unreadable or
    /// malformed monit credentials) are fatal to startup.
    pub async fn init(options: &AppOptions) -> Result<Self, PluginError> {
        info!("Initializing application state...");

        let job_spec_file = Arc::new(File::new(&options.job_spec_path));
        let monit_client = Arc::new(MonitClient::new(&options.monit).await?);
        let store = Arc::new(ReportStore::new());

        Ok(Self {
            job_spec_file,
            monit_client,
            store,
            hostname: options.hostname.clone(),
        })
    }
}
