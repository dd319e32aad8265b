//! Configuration documents for a cluster build.
//!
//! Two YAML documents drive every operation: the cluster configuration
//! (what to build, per-cluster overrides) and the environment configuration
//! (where to build it: region, network, credentials defaults). The store
//! only loads and structurally validates them; layering happens in
//! [`normalize`].

pub mod normalize;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A user-supplied cluster configuration document.
///
/// Every field except `clusters` is optional. An unset field deserializes to
/// `None`, which is distinct from an explicitly empty value; the normalizer
/// relies on that distinction when resolving precedence.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ClusterConfig {
    pub name: Option<String>,
    pub environment: Option<String>,
    pub region: Option<String>,
    pub credentials_file: Option<String>,
    pub profile_name: Option<String>,
    pub public_key_loc: Option<String>,
    pub private_key_loc: Option<String>,
    pub cluster_template: Option<String>,
    pub vpc: Option<String>,
    pub subnets: Option<Vec<String>>,
    pub security_groups: Option<Vec<String>>,
    pub tags: Option<BTreeMap<String, String>>,
    pub amis: Option<BTreeMap<String, String>>,
    pub connection_info: Option<ConnectionInfo>,
    #[serde(default)]
    pub clusters: BTreeMap<String, ClusterEntry>,
}

/// One entry in the `clusters` map. These are the instance-level overrides,
/// the most specific tier of the precedence order.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ClusterEntry {
    pub name: Option<String>,
    pub cluster_size: Option<u32>,
    pub instance_type: Option<String>,
    pub network_type: Option<String>,
    pub public_key_loc: Option<String>,
    pub private_key_loc: Option<String>,
    pub cluster_template: Option<String>,
    pub tags: Option<BTreeMap<String, String>>,
    pub amis: Option<BTreeMap<String, String>>,
    /// User-provided security group rules, passed through to the template
    /// without interpretation.
    pub user_security_groups: Option<serde_yaml::Value>,
    /// Load balancer definition, passed through to the template without
    /// interpretation.
    pub loadbalancer: Option<serde_yaml::Value>,
    pub init_script: Option<PathBuf>,
    #[serde(default)]
    pub services: Option<BTreeMap<String, Option<ServiceSpec>>>,
}

/// How to reach the hosts once they exist.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ConnectionInfo {
    pub username: String,
    pub use_private_ip: Option<bool>,
}

/// Per-service configuration overrides for the configure step. Any keys
/// beyond the recognized ones are forwarded verbatim to the
/// configuration-management tool as service vars.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ServiceSpec {
    pub service_dir: Option<PathBuf>,
    pub hosts: Option<String>,
    #[serde(flatten)]
    pub vars: BTreeMap<String, serde_yaml::Value>,
}

/// An environment configuration document, scoped to one named environment.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct EnvironmentConfig {
    #[serde(rename = "type")]
    pub cloud_type: Option<String>,
    pub region: Option<String>,
    pub vpc: Option<String>,
    pub subnets: Option<Vec<String>>,
    pub security_groups: Option<Vec<String>>,
    pub amis: Option<BTreeMap<String, String>>,
    pub credentials_file: Option<String>,
    pub profile_name: Option<String>,
    pub public_key_loc: Option<String>,
    pub private_key_loc: Option<String>,
}

impl ClusterConfig {
    pub fn from_reader(reader: impl Read) -> Result<Self, Error> {
        serde_yaml::from_reader(reader).map_err(Error::ClusterConfigParse)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(file)
    }
}

impl EnvironmentConfig {
    /// Load `<env_path>/<env_name>.yaml`.
    pub fn load(env_path: impl AsRef<Path>, env_name: &str) -> Result<Self, Error> {
        let env_path = env_path.as_ref();

        if !env_path.is_dir() {
            return Err(Error::InvalidEnvironmentPath(env_path.to_path_buf()));
        }

        let env_file = env_path.join(format!("{env_name}.yaml"));
        if !env_file.exists() {
            return Err(Error::EnvironmentNotFound(env_file));
        }

        let file = File::open(&env_file)?;
        serde_yaml::from_reader(file).map_err(|source| Error::EnvironmentConfigParse {
            path: env_file,
            source,
        })
    }
}

/// Holds the two parsed documents for one operation. No merge logic lives
/// here; the store is handed to [`normalize::normalize`] once per operation.
#[derive(Clone, Debug)]
pub struct ConfigStore {
    pub cluster: ClusterConfig,
    pub environment: EnvironmentConfig,
}

impl ConfigStore {
    /// Load the cluster configuration from `config_path`, then the
    /// environment document it references from `env_path`.
    pub fn load(config_path: impl AsRef<Path>, env_path: impl AsRef<Path>) -> Result<Self, Error> {
        let cluster = ClusterConfig::from_path(config_path)?;
        Self::with_cluster_config(cluster, env_path)
    }

    pub fn with_cluster_config(
        cluster: ClusterConfig,
        env_path: impl AsRef<Path>,
    ) -> Result<Self, Error> {
        let env_name = cluster
            .environment
            .as_deref()
            .ok_or(Error::EnvironmentNameMissing)?;

        let environment = EnvironmentConfig::load(env_path, env_name)?;

        Ok(ConfigStore {
            cluster,
            environment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLUSTER_YAML: &str = r#"
name: consul
environment: devtest
public_key_loc: .ssh/overture.pub
private_key_loc: .ssh/overture
clusters:
  consul:
    cluster_size: 3
    instance_type: t2.micro
    cluster_template: consul
    services:
      consul:
        hosts: consul
        datacenter: dc1
"#;

    #[test]
    fn parse_cluster_config() {
        let config = ClusterConfig::from_reader(CLUSTER_YAML.as_bytes()).unwrap();

        assert_eq!(config.name.as_deref(), Some("consul"));
        assert_eq!(config.environment.as_deref(), Some("devtest"));

        let entry = &config.clusters["consul"];
        assert_eq!(entry.cluster_size, Some(3));

        let services = entry.services.as_ref().unwrap();
        let consul = services["consul"].as_ref().unwrap();
        assert_eq!(consul.hosts.as_deref(), Some("consul"));
        assert_eq!(
            consul.vars["datacenter"],
            serde_yaml::Value::String("dc1".into())
        );
    }

    #[test]
    fn unset_fields_are_absent_not_empty() {
        let config = ClusterConfig::from_reader("clusters: {}".as_bytes()).unwrap();
        assert_eq!(config.credentials_file, None);
        assert_eq!(config.subnets, None);
    }

    #[test]
    fn environment_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let err = EnvironmentConfig::load(dir.path(), "missing").unwrap_err();
        assert!(matches!(err, Error::EnvironmentNotFound(_)));
    }

    #[test]
    fn environment_path_must_be_a_directory() {
        let err = EnvironmentConfig::load("/definitely/not/here", "devtest").unwrap_err();
        assert!(matches!(err, Error::InvalidEnvironmentPath(_)));
    }

    #[test]
    fn store_requires_environment_key() {
        let dir = tempfile::tempdir().unwrap();
        let cluster = ClusterConfig::from_reader("clusters: {}".as_bytes()).unwrap();
        let err = ConfigStore::with_cluster_config(cluster, dir.path()).unwrap_err();
        assert!(matches!(err, Error::EnvironmentNameMissing));
    }
}
