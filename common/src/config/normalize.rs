//! Layered configuration resolution.
//!
//! Users can set the same parameter at several levels. Going from high to
//! low priority, a value is taken from:
//!
//! 1. The instance level (an entry in the `clusters` map)
//! 2. The cluster level (the top of the cluster configuration document)
//! 3. The environment document
//! 4. A built-in default, where one exists
//!
//! For example an environment file can define a `vpc`, but if the same key
//! appears in the cluster configuration that one wins. The output is a
//! single [`NormalizedConfig`] tree, produced once per operation and never
//! mutated afterwards.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use super::{ClusterConfig, ConnectionInfo, EnvironmentConfig, ServiceSpec};

const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_CLOUD_TYPE: &str = "aws";
const DEFAULT_CLUSTER_SIZE: u32 = 1;
const DEFAULT_INSTANCE_TYPE: &str = "t2.micro";
const DEFAULT_NETWORK_TYPE: &str = "private";
const DEFAULT_CLUSTER_NAME: &str = "overture-default-cluster";

/// Fields that must resolve to something for downstream steps to work.
/// They have no built-in default; when unresolvable they are logged and
/// left absent, and the step that actually needs them fails at the point
/// of use with a specific error.
const REQUIRED_FIELDS: [&str; 4] = [
    "credentials_file",
    "profile_name",
    "public_key_loc",
    "private_key_loc",
];

/// The merge result: every field carries exactly one value, chosen by the
/// precedence order above. Serializes to the flat context consumed by
/// template rendering.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct NormalizedConfig {
    pub cluster_name: String,
    pub cloud_type: String,
    pub region: String,
    pub credentials_file: Option<String>,
    pub profile_name: Option<String>,
    pub public_key_loc: Option<String>,
    pub private_key_loc: Option<String>,
    pub subnets: Option<Vec<String>>,
    pub security_groups: Option<Vec<String>>,
    pub connection_info: Option<ConnectionInfo>,
    pub clusters: BTreeMap<String, NormalizedCluster>,
    #[serde(skip)]
    missing_required: Vec<&'static str>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct NormalizedCluster {
    pub region: String,
    pub cluster_name: String,
    pub cluster_size: u32,
    pub instance_type: String,
    pub network_type: String,
    pub public_key_loc: Option<String>,
    pub private_key_loc: Option<String>,
    pub vpc_id: Option<String>,
    pub cluster_template: Option<String>,
    pub tags: Option<BTreeMap<String, String>>,
    pub amis: Option<BTreeMap<String, String>>,
    pub subnets: Option<Vec<String>>,
    pub security_groups: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_security_groups: Option<serde_yaml::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loadbalancer: Option<serde_yaml::Value>,
    pub user_init_script: Option<PathBuf>,
    pub services: Option<BTreeMap<String, Option<ServiceSpec>>>,
}

impl NormalizedConfig {
    /// Required fields that did not resolve from any scope. Callers decide
    /// whether to proceed.
    pub fn missing_required(&self) -> &[&'static str] {
        &self.missing_required
    }
}

/// Merge the two parsed documents into one normalized tree.
///
/// Pure and deterministic: no I/O, identical inputs yield structurally
/// identical output. Missing required fields are logged, not fatal.
pub fn normalize(config: &ClusterConfig, env: &EnvironmentConfig) -> NormalizedConfig {
    let region = config
        .region
        .clone()
        .or_else(|| env.region.clone())
        .unwrap_or_else(|| DEFAULT_REGION.to_string());

    let cloud_type = env
        .cloud_type
        .clone()
        .unwrap_or_else(|| DEFAULT_CLOUD_TYPE.to_string());

    let credentials_file = config
        .credentials_file
        .clone()
        .or_else(|| env.credentials_file.clone());
    let profile_name = config
        .profile_name
        .clone()
        .or_else(|| env.profile_name.clone());
    let public_key_loc = config
        .public_key_loc
        .clone()
        .or_else(|| env.public_key_loc.clone());
    let private_key_loc = config
        .private_key_loc
        .clone()
        .or_else(|| env.private_key_loc.clone());

    let subnets = config.subnets.clone().or_else(|| env.subnets.clone());
    let security_groups = config
        .security_groups
        .clone()
        .or_else(|| env.security_groups.clone());

    let clusters = config
        .clusters
        .iter()
        .map(|(key, entry)| {
            let normalized = NormalizedCluster {
                region: region.clone(),
                cluster_name: entry.name.clone().unwrap_or_else(|| key.clone()),
                cluster_size: entry.cluster_size.unwrap_or(DEFAULT_CLUSTER_SIZE),
                instance_type: entry
                    .instance_type
                    .clone()
                    .unwrap_or_else(|| DEFAULT_INSTANCE_TYPE.to_string()),
                network_type: entry
                    .network_type
                    .clone()
                    .unwrap_or_else(|| DEFAULT_NETWORK_TYPE.to_string()),
                public_key_loc: entry.public_key_loc.clone().or_else(|| public_key_loc.clone()),
                private_key_loc: entry
                    .private_key_loc
                    .clone()
                    .or_else(|| private_key_loc.clone()),
                vpc_id: config.vpc.clone().or_else(|| env.vpc.clone()),
                cluster_template: entry
                    .cluster_template
                    .clone()
                    .or_else(|| config.cluster_template.clone()),
                // Tag and AMI maps are whole-object overrides: the more
                // specific scope replaces the map entirely, no per-key merge.
                tags: entry.tags.clone().or_else(|| config.tags.clone()),
                amis: entry
                    .amis
                    .clone()
                    .or_else(|| config.amis.clone())
                    .or_else(|| env.amis.clone()),
                subnets: subnets.clone(),
                security_groups: security_groups.clone(),
                user_security_groups: entry.user_security_groups.clone(),
                loadbalancer: entry.loadbalancer.clone(),
                user_init_script: entry.init_script.clone(),
                services: entry.services.clone(),
            };

            (key.clone(), normalized)
        })
        .collect();

    let mut data = NormalizedConfig {
        cluster_name: config
            .name
            .clone()
            .unwrap_or_else(|| DEFAULT_CLUSTER_NAME.to_string()),
        cloud_type,
        region,
        credentials_file,
        profile_name,
        public_key_loc,
        private_key_loc,
        subnets,
        security_groups,
        connection_info: config.connection_info.clone(),
        clusters,
        missing_required: Vec::new(),
    };

    for field in REQUIRED_FIELDS {
        let present = match field {
            "credentials_file" => data.credentials_file.is_some(),
            "profile_name" => data.profile_name.is_some(),
            "public_key_loc" => data.public_key_loc.is_some(),
            "private_key_loc" => data.private_key_loc.is_some(),
            _ => unreachable!(),
        };

        if !present {
            tracing::error!("{} not found in normalized data", field);
            data.missing_required.push(field);
        }
    }

    data
}
