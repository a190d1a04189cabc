//! BOSH job spec loading
//!
//! The BOSH agent renders the instance's job spec to a JSON file
//! (`/var/vcap/bosh/spec.json`). The file is re-read on every refresh
//! tick so changes made by the director become visible without a
//! restart.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::errors::PluginError;
use crate::filesys::file::File;

/// Deployed job spec for this instance
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobSpec {
    #[serde(default)]
    pub job: Job,

    #[serde(default)]
    pub packages: BTreeMap<String, Package>,

    #[serde(default)]
    pub networks: BTreeMap<String, Network>,

    #[serde(default)]
    pub deployment: String,

    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub index: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Job {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub templates: Vec<Template>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Template {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Package {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Network {
    #[serde(default)]
    pub cloud_properties: BTreeMap<String, serde_json::Value>,

    #[serde(default)]
    pub default: Vec<String>,

    #[serde(default)]
    pub gateway: String,

    #[serde(default)]
    pub ip: String,

    #[serde(default)]
    pub netmask: String,
}

/// Load the job spec from disk. No caching, every call re-reads the file.
pub async fn load_job_spec(file: &File) -> Result<JobSpec, PluginError> {
    file.read_json().await
}
