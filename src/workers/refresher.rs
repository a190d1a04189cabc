//! Refresh worker for periodic report rebuilds
//!
//! On every tick the worker rebuilds the whole report from scratch:
//! job spec first, then the monit process table, then a single publish
//! to the store. A failure from either source records the error and
//! abandons the tick, so readers only ever see reports from fully
//! completed ticks.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::filesys::file::File;
use crate::jobspec::load_job_spec;
use crate::monit::client::ProcessSource;
use crate::report::model::Report;
use crate::report::store::ReportStore;

/// Refresh worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Interval between refresh ticks
    pub interval: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
        }
    }
}

/// Run the refresh worker
pub async fn run<P, S, F>(
    options: &Options,
    hostname: &str,
    job_spec_file: &File,
    process_source: &P,
    store: &ReportStore,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) where
    P: ProcessSource,
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!("Refresh worker starting...");

    loop {
        // Check for shutdown
        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Refresh worker shutting down...");
                return;
            }
            _ = sleep_fn(options.interval) => {
                // Continue with refresh
            }
        }

        debug!("Refreshing report...");
        refresh_once(hostname, job_spec_file, process_source, store).await;
    }
}

/// Execute one refresh tick. Publishes a fully merged report or, on
/// the first source failure, records the error and leaves the
/// previously published report in place.
pub async fn refresh_once<P>(
    hostname: &str,
    job_spec_file: &File,
    process_source: &P,
    store: &ReportStore,
) where
    P: ProcessSource,
{
    let mut report = Report::new(hostname);

    let job_spec = match load_job_spec(job_spec_file).await {
        Ok(spec) => spec,
        Err(e) => {
            error!(
                "error loading job spec from {:?}: {}",
                job_spec_file.path(),
                e
            );
            store.set_error(&e);
            return;
        }
    };
    report.apply_job_spec(&job_spec);

    let processes = match process_source.processes().await {
        Ok(processes) => processes,
        Err(e) => {
            error!("error getting processes from monit: {}", e);
            store.set_error(&e);
            return;
        }
    };
    report.apply_processes(&processes);

    store.set_report(report);
}
