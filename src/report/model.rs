//! Scope report data model
//!
//! The report shape is a fixed contract with the Weave Scope probe: a
//! top-level id, the plugin self-description, and a `Host` topology
//! with a single node keyed `"<hostname>;<host>"`. The node carries a
//! `latest` map of timestamped string values, split into key families
//! by prefix so each source can replace its own family wholesale.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::jobspec::JobSpec;
use crate::monit::client::Process;
use crate::utils::generate_uuid;

pub const BOSH_JOB_PREFIX: &str = "bosh_job_";
pub const BOSH_TEMPLATES_PREFIX: &str = "bosh_templates_";
pub const BOSH_PACKAGES_PREFIX: &str = "bosh_packages_";
pub const BOSH_NETWORKS_PREFIX: &str = "bosh_networks_";
pub const BOSH_JOB_NAME: &str = "bosh_job_name";
pub const BOSH_JOB_ID: &str = "bosh_job_id";
pub const BOSH_JOB_INDEX: &str = "bosh_job_index";
pub const BOSH_JOB_DEPLOYMENT: &str = "bosh_job_deployment";
pub const MONIT_PROCESSES_PREFIX: &str = "monit_processes_";

// Every descriptor-derived key starts with this.
const BOSH_KEY_PREFIX: &str = "bosh_";

/// Plugin self-description advertised in every report
#[derive(Debug, Clone, Serialize)]
pub struct PluginSpec {
    pub id: String,
    pub label: String,
    pub description: String,
    pub interfaces: Vec<String>,
    pub api_version: String,
}

/// One report, as served to the Scope probe
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    #[serde(rename = "ID")]
    pub id: String,

    #[serde(rename = "Plugins")]
    pub plugins: Vec<PluginSpec>,

    #[serde(rename = "Host")]
    pub host: HostTopology,

    #[serde(skip)]
    hostname: String,
}

/// The `Host` topology carrying this instance's single node
#[derive(Debug, Clone, Serialize)]
pub struct HostTopology {
    pub label: String,
    pub label_plural: String,
    pub nodes: BTreeMap<String, Node>,
    pub shape: String,
    pub metadata_templates: BTreeMap<String, MetadataTemplate>,
    pub table_templates: BTreeMap<String, TableTemplate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetadataTemplate {
    pub id: String,
    pub label: String,
    pub priority: i32,
    pub from: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub truncate: i32,
}

fn is_zero(n: &i32) -> bool {
    *n == 0
}

#[derive(Debug, Clone, Serialize)]
pub struct TableTemplate {
    pub id: String,
    pub label: String,
    pub prefix: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Node {
    pub id: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub topology: String,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub latest: BTreeMap<String, LatestEntry>,
}

impl Node {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            topology: "host".to_string(),
            latest: BTreeMap::new(),
        }
    }
}

/// A timestamped attribute value
#[derive(Debug, Clone, Serialize)]
pub struct LatestEntry {
    pub timestamp: DateTime<Utc>,
    pub value: String,
}

fn latest(value: impl Into<String>) -> LatestEntry {
    LatestEntry {
        timestamp: Utc::now(),
        value: value.into(),
    }
}

fn plugin_info() -> PluginSpec {
    PluginSpec {
        id: "bosh".to_string(),
        label: "bosh".to_string(),
        description: "Reports on Bosh agent properties".to_string(),
        interfaces: vec!["reporter".to_string()],
        api_version: "1".to_string(),
    }
}

fn base_table_templates() -> BTreeMap<String, TableTemplate> {
    [
        (BOSH_JOB_PREFIX, "Bosh Job Info"),
        (BOSH_TEMPLATES_PREFIX, "Bosh Templates"),
        (BOSH_PACKAGES_PREFIX, "Bosh Packages"),
        (MONIT_PROCESSES_PREFIX, "Monit Processes"),
    ]
    .into_iter()
    .map(|(prefix, label)| {
        (
            prefix.to_string(),
            TableTemplate {
                id: prefix.to_string(),
                label: label.to_string(),
                prefix: prefix.to_string(),
            },
        )
    })
    .collect()
}

impl Report {
    /// Create an empty report shell for `hostname` with a fresh id
    pub fn new(hostname: &str) -> Self {
        Self {
            id: generate_uuid(),
            plugins: vec![plugin_info()],
            host: HostTopology {
                label: "host".to_string(),
                label_plural: "hosts".to_string(),
                nodes: BTreeMap::new(),
                shape: "circle".to_string(),
                metadata_templates: BTreeMap::new(),
                table_templates: base_table_templates(),
            },
            hostname: hostname.to_string(),
        }
    }

    /// The synthetic id of this instance's host node
    pub fn host_node_id(&self) -> String {
        format!("{};<host>", self.hostname)
    }

    /// Replace all descriptor-derived keys on the host node with fresh
    /// values from `spec`, registering one table template per network.
    /// Keys from other families (monit processes) are left untouched.
    pub fn apply_job_spec(&mut self, spec: &JobSpec) {
        let host_id = self.host_node_id();
        let mut node = self
            .host
            .nodes
            .remove(&host_id)
            .unwrap_or_else(|| Node::new(&host_id));

        node.latest.retain(|k, _| !k.starts_with(BOSH_KEY_PREFIX));

        node.latest.insert(BOSH_JOB_ID.to_string(), latest(&spec.id));
        node.latest
            .insert(BOSH_JOB_NAME.to_string(), latest(&spec.job.name));
        node.latest
            .insert(BOSH_JOB_INDEX.to_string(), latest(spec.index.to_string()));
        node.latest
            .insert(BOSH_JOB_DEPLOYMENT.to_string(), latest(&spec.deployment));

        for template in &spec.job.templates {
            node.latest.insert(
                format!("{}{}", BOSH_TEMPLATES_PREFIX, template.name),
                latest(&template.version),
            );
        }

        for package in spec.packages.values() {
            node.latest.insert(
                format!("{}{}", BOSH_PACKAGES_PREFIX, package.name),
                latest(&package.version),
            );
        }

        for (name, network) in &spec.networks {
            let id = format!("{}{}", BOSH_NETWORKS_PREFIX, name);

            // Re-registering a template for the same network is an
            // overwrite, never an error.
            self.host.table_templates.insert(
                id.clone(),
                TableTemplate {
                    id: id.clone(),
                    label: format!("Bosh Networks - {}", name),
                    prefix: id.clone(),
                },
            );

            node.latest
                .insert(format!("{}ip", id), latest(&network.ip));
            node.latest
                .insert(format!("{}gateway", id), latest(&network.gateway));
            node.latest
                .insert(format!("{}netmask", id), latest(&network.netmask));
            node.latest
                .insert(format!("{}default", id), latest(network.default.join(", ")));
        }

        self.host.nodes.insert(host_id, node);
    }

    /// Replace all process-derived keys on the host node with one key
    /// per supplied process. Processes gone since the previous poll
    /// drop out; descriptor-derived keys are left untouched.
    pub fn apply_processes(&mut self, processes: &[Process]) {
        let host_id = self.host_node_id();
        let node = self
            .host
            .nodes
            .entry(host_id.clone())
            .or_insert_with(|| Node::new(&host_id));

        node.latest
            .retain(|k, _| !k.starts_with(MONIT_PROCESSES_PREFIX));

        for process in processes {
            node.latest.insert(
                format!("{}{}", MONIT_PROCESSES_PREFIX, process.name),
                latest(&process.status),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobspec::{Job, Network, Template};

    fn router_spec() -> JobSpec {
        JobSpec {
            job: Job {
                name: "router".to_string(),
                templates: vec![Template {
                    name: "router".to_string(),
                    version: "1.2".to_string(),
                }],
            },
            deployment: "prod".to_string(),
            id: "instance-7".to_string(),
            index: 0,
            ..Default::default()
        }
    }

    fn running(name: &str) -> Process {
        Process {
            name: name.to_string(),
            status: "running".to_string(),
        }
    }

    fn node_value<'a>(report: &'a Report, key: &str) -> &'a str {
        let node = &report.host.nodes[&report.host_node_id()];
        &node.latest[key].value
    }

    #[test]
    fn test_router_example_keys() {
        let mut report = Report::new("vm-1234");
        report.apply_job_spec(&router_spec());
        report.apply_processes(&[running("router"), running("consul")]);

        assert_eq!(report.host.nodes.len(), 1);
        assert!(report.host.nodes.contains_key("vm-1234;<host>"));
        assert_eq!(node_value(&report, "bosh_job_name"), "router");
        assert_eq!(node_value(&report, "bosh_job_index"), "0");
        assert_eq!(node_value(&report, "bosh_job_deployment"), "prod");
        assert_eq!(node_value(&report, "bosh_templates_router"), "1.2");
        assert_eq!(node_value(&report, "monit_processes_router"), "running");
        assert_eq!(node_value(&report, "monit_processes_consul"), "running");
    }

    #[test]
    fn test_rebuild_is_deterministic_up_to_id_and_timestamps() {
        let spec = router_spec();
        let processes = [running("router")];

        let mut first = Report::new("vm-1234");
        first.apply_job_spec(&spec);
        first.apply_processes(&processes);

        let mut second = Report::new("vm-1234");
        second.apply_job_spec(&spec);
        second.apply_processes(&processes);

        assert_ne!(first.id, second.id);

        let first_node = &first.host.nodes["vm-1234;<host>"];
        let second_node = &second.host.nodes["vm-1234;<host>"];
        let first_values: Vec<(&String, &String)> = first_node
            .latest
            .iter()
            .map(|(k, v)| (k, &v.value))
            .collect();
        let second_values: Vec<(&String, &String)> = second_node
            .latest
            .iter()
            .map(|(k, v)| (k, &v.value))
            .collect();
        assert_eq!(first_values, second_values);
    }

    #[test]
    fn test_dropped_process_key_is_removed() {
        let mut report = Report::new("vm-1234");
        report.apply_processes(&[running("router"), running("consul")]);
        report.apply_processes(&[running("router")]);

        let node = &report.host.nodes["vm-1234;<host>"];
        assert!(node.latest.contains_key("monit_processes_router"));
        assert!(!node.latest.contains_key("monit_processes_consul"));
    }

    #[test]
    fn test_network_adds_four_entries_and_template() {
        let mut spec = router_spec();
        spec.networks.insert(
            "default".to_string(),
            Network {
                ip: "10.0.0.5".to_string(),
                gateway: "10.0.0.1".to_string(),
                netmask: "255.255.255.0".to_string(),
                default: vec!["dns".to_string(), "gateway".to_string()],
                ..Default::default()
            },
        );

        let mut report = Report::new("vm-1234");
        let templates_before = report.host.table_templates.len();
        report.apply_job_spec(&spec);

        let node = &report.host.nodes["vm-1234;<host>"];
        let network_keys: Vec<&String> = node
            .latest
            .keys()
            .filter(|k| k.starts_with(BOSH_NETWORKS_PREFIX))
            .collect();
        assert_eq!(network_keys.len(), 4);
        assert_eq!(node.latest["bosh_networks_defaultdefault"].value, "dns, gateway");

        assert_eq!(report.host.table_templates.len(), templates_before + 1);
        assert!(report.host.table_templates.contains_key("bosh_networks_default"));

        // Re-applying the same spec re-registers the template as a no-op.
        report.apply_job_spec(&spec);
        assert_eq!(report.host.table_templates.len(), templates_before + 1);
    }

    #[test]
    fn test_partial_application_preserves_other_family() {
        let mut report = Report::new("vm-1234");
        report.apply_processes(&[running("router")]);
        report.apply_job_spec(&router_spec());

        let node = &report.host.nodes["vm-1234;<host>"];
        assert!(node.latest.contains_key("monit_processes_router"));
        assert!(node.latest.contains_key("bosh_job_name"));

        // And the other way round.
        report.apply_processes(&[running("router")]);
        let node = &report.host.nodes["vm-1234;<host>"];
        assert!(node.latest.contains_key("bosh_job_name"));
    }

    #[test]
    fn test_wire_shape() {
        let mut report = Report::new("vm-1234");
        report.apply_job_spec(&router_spec());
        report.apply_processes(&[running("router")]);

        let value = serde_json::to_value(&report).unwrap();
        assert!(value["ID"].is_string());
        assert_eq!(value["Plugins"][0]["id"], "bosh");
        assert_eq!(value["Plugins"][0]["interfaces"][0], "reporter");
        assert_eq!(value["Plugins"][0]["api_version"], "1");
        assert_eq!(value["Host"]["label"], "host");
        assert_eq!(value["Host"]["shape"], "circle");

        let node = &value["Host"]["nodes"]["vm-1234;<host>"];
        assert_eq!(node["id"], "vm-1234;<host>");
        assert_eq!(node["topology"], "host");
        assert_eq!(node["latest"]["bosh_job_name"]["value"], "router");
        assert!(node["latest"]["bosh_job_name"]["timestamp"].is_string());

        assert!(value["Host"]["table_templates"]["monit_processes_"].is_object());
        // The internal hostname field stays off the wire.
        assert!(value.get("hostname").is_none());
    }
}
