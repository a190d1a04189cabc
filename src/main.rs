//! Boshscope - Entry Point
//!
//! A Weave Scope probe plugin for BOSH-managed VMs. Periodically
//! merges the BOSH job spec and the monit process table into a Scope
//! topology report and serves it over a unix socket.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use boshscope::app::options::AppOptions;
use boshscope::app::run::run;
use boshscope::logs::{init_logging, LogLevel, LogOptions};
use boshscope::utils::version_info;

use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    if cli_args.contains_key("version") {
        println!("{}", serde_json::to_string_pretty(&version_info()).unwrap());
        return;
    }

    // Initialize logging
    let log_level = match cli_args.get("log-level") {
        Some(value) => match value.parse::<LogLevel>() {
            Ok(level) => level,
            Err(e) => {
                println!("Invalid --log-level: {e}");
                return;
            }
        },
        None => LogLevel::default(),
    };
    let log_options = LogOptions {
        log_level,
        json_format: cli_args.contains_key("log-json"),
    };
    if let Err(e) = init_logging(log_options) {
        println!("Failed to initialize logging: {e}");
    }

    // Resolve the hostname reported to Scope
    let hostname = match cli_args.get("hostname") {
        Some(hostname) => hostname.clone(),
        None => match sysinfo::System::host_name() {
            Some(hostname) => hostname,
            None => {
                error!("Unable to determine hostname, pass --hostname=<name>");
                return;
            }
        },
    };

    // Assemble options from flags, keeping defaults where unset
    let mut options = AppOptions {
        hostname: hostname.clone(),
        ..Default::default()
    };

    if let Some(plugins_root) = cli_args.get("plugins-root") {
        options.server.socket_path = PathBuf::from(plugins_root)
            .join("bosh")
            .join("bosh.sock");
    }
    if let Some(job_spec) = cli_args.get("job-spec") {
        options.job_spec_path = PathBuf::from(job_spec);
    }
    if let Some(interval) = cli_args.get("refresh-interval") {
        match interval.parse::<u64>() {
            Ok(secs) => options.refresher.interval = Duration::from_secs(secs),
            Err(_) => {
                error!("Invalid --refresh-interval: {interval}, expected seconds");
                return;
            }
        }
    }
    if let Some(host) = cli_args.get("monit-host") {
        options.monit.host = host.clone();
    }
    if let Some(group) = cli_args.get("monit-group") {
        options.monit.group = group.clone();
    }
    if let Some(user_file) = cli_args.get("monit-user-file") {
        options.monit.credentials_file = user_file.clone();
    }

    info!("Starting boshscope on {}...", hostname);
    let result = run(options, await_shutdown_signal()).await;
    if let Err(e) = result {
        error!("Failed to run the plugin: {e}");
        std::process::exit(1);
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).unwrap();
        let mut sigint = signal(SignalKind::interrupt()).unwrap();

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
        info!("Ctrl+C received, shutting down...");
    }
}
