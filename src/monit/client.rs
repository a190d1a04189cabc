//! Monit status client
//!
//! Queries the local monit daemon for the processes it supervises,
//! restricted to one process group. Monit is slow to come up after a
//! VM (re)start, so the status query runs under two composed retry
//! policies: a short one for transient request failures and a long
//! outer one that keeps waiting while monit refuses connections.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::errors::PluginError;
use crate::filesys::file::File;
use crate::monit::retry::RetryPolicy;

const SHORT_RETRY_ATTEMPTS: u32 = 20;
const BOOT_RETRY_ATTEMPTS: u32 = 300;
const RETRY_DELAY: Duration = Duration::from_secs(1);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One supervised process, as of the most recent status query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Process {
    pub name: String,
    pub status: String,
}

/// Capability to fetch the current process table
#[async_trait]
pub trait ProcessSource: Send + Sync {
    async fn processes(&self) -> Result<Vec<Process>, PluginError>;
}

/// Monit client options
#[derive(Debug, Clone)]
pub struct Options {
    /// Monit control endpoint, host:port
    pub host: String,

    /// Process group to report on
    pub group: String,

    /// Credentials file, `username:password` on the first line
    pub credentials_file: String,

    /// Retry policy for transient request failures
    pub short_retry: RetryPolicy,

    /// Outer retry policy applied while monit is still booting
    pub boot_retry: RetryPolicy,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            host: "127.0.0.1:2822".to_string(),
            group: "vcap".to_string(),
            credentials_file: "/var/vcap/monit/monit.user".to_string(),
            short_retry: RetryPolicy::new(SHORT_RETRY_ATTEMPTS, RETRY_DELAY),
            boot_retry: RetryPolicy::new(BOOT_RETRY_ATTEMPTS, RETRY_DELAY),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    services: Vec<ServiceStatus>,
}

#[derive(Debug, Deserialize)]
struct ServiceStatus {
    name: String,
    status: String,
}

/// HTTP client for the monit control endpoint
#[derive(Debug)]
pub struct MonitClient {
    client: reqwest::Client,
    base_url: String,
    group: String,
    username: String,
    password: String,
    short_retry: RetryPolicy,
    boot_retry: RetryPolicy,
}

impl MonitClient {
    /// Create a new monit client. Reads and validates the credentials
    /// file; a malformed file is a construction-time error.
    pub async fn new(options: &Options) -> Result<Self, PluginError> {
        let contents = File::new(&options.credentials_file).read_string().await?;
        let (username, password) = parse_credentials(&contents)?;

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: format!("http://{}", options.host),
            group: options.group.clone(),
            username,
            password,
            short_retry: options.short_retry,
            boot_retry: options.boot_retry,
        })
    }

    async fn status_request(&self) -> Result<Vec<Process>, PluginError> {
        let url = format!("{}/_status2", self.base_url);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[("format", "json"), ("group", self.group.as_str())])
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PluginError::ConnectionError(format!(
                "monit status request failed: {}",
                response.status()
            )));
        }

        let status: StatusResponse = response.json().await?;
        Ok(status
            .services
            .into_iter()
            .map(|s| Process {
                name: s.name,
                status: s.status,
            })
            .collect())
    }
}

#[async_trait]
impl ProcessSource for MonitClient {
    async fn processes(&self) -> Result<Vec<Process>, PluginError> {
        // The outer policy keeps re-running the whole short budget for
        // as long as monit is not accepting connections yet.
        self.boot_retry
            .run_while(
                || self.short_retry.run(|| self.status_request()),
                PluginError::is_connect,
            )
            .await
            .map_err(|e| match e {
                e @ PluginError::ConnectionError(_) => e,
                other => PluginError::ConnectionError(other.to_string()),
            })
    }
}

fn parse_credentials(contents: &str) -> Result<(String, String), PluginError> {
    match contents.split_once(':') {
        Some((username, password)) => Ok((
            username.to_string(),
            password.trim_end_matches(['\r', '\n']).to_string(),
        )),
        None => Err(PluginError::CredentialsError(
            "malformed monit user file, expected username and password separated by ':'"
                .to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_credentials() {
        let (user, pass) = parse_credentials("vcap:secret\n").unwrap();
        assert_eq!(user, "vcap");
        assert_eq!(pass, "secret");
    }

    #[test]
    fn test_parse_credentials_password_contains_colon() {
        let (user, pass) = parse_credentials("vcap:se:cr:et").unwrap();
        assert_eq!(user, "vcap");
        assert_eq!(pass, "se:cr:et");
    }

    #[test]
    fn test_parse_credentials_missing_separator() {
        let err = parse_credentials("vcap secret").unwrap_err();
        assert!(matches!(err, PluginError::CredentialsError(_)));
    }

    #[test]
    fn test_status_response_decoding() {
        let body = r#"{"services": [
            {"name": "router", "status": "running"},
            {"name": "consul", "status": "initializing"}
        ]}"#;
        let status: StatusResponse = serde_json::from_str(body).unwrap();
        assert_eq!(status.services.len(), 2);
        assert_eq!(status.services[0].name, "router");
        assert_eq!(status.services[1].status, "initializing");
    }

    #[tokio::test]
    async fn test_new_fails_on_malformed_credentials_file() {
        let path = std::env::temp_dir().join(format!(
            "monit-user-{}",
            crate::utils::generate_uuid()
        ));
        tokio::fs::write(&path, "no-separator-here").await.unwrap();

        let options = Options {
            credentials_file: path.to_string_lossy().into_owned(),
            ..Default::default()
        };
        let err = MonitClient::new(&options).await.unwrap_err();
        assert!(matches!(err, PluginError::CredentialsError(_)));

        tokio::fs::remove_file(&path).await.unwrap();
    }
}
