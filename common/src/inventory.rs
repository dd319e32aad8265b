//! Host inventory derivation.
//!
//! Turns a parsed [`ResourceModel`] into the grouped, per-host variable
//! structure consumed by the configuration-management tool. The JSON shape
//! emitted by [`HostInventory::to_json`] is a contract with that tool; key
//! names are reproduced exactly.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::json;

use crate::error::Error;
use crate::state::{ResourceModel, INSTANCE_RESOURCE_TYPE};

const NAME_TAG: &str = "tags.Name";
const TAG_PREFIX: &str = "tags.";

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct HostVars {
    pub ansible_ssh_host: String,
    pub availability_zone: String,
    pub ami: String,
    pub id: String,
    pub subnet_id: String,
}

#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct GroupVars {
    pub ipaddrs: Vec<String>,
}

/// A named host group. Tag-derived groups carry no vars; output-derived
/// groups record the raw output values under `ipaddrs`.
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct HostGroup {
    pub hosts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vars: Option<GroupVars>,
}

/// Host records keyed by display name plus named groups. Derived from a
/// borrowed [`ResourceModel`]; never mutated after construction.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HostInventory {
    pub hosts: BTreeMap<String, HostVars>,
    pub groups: BTreeMap<String, HostGroup>,
}

impl HostInventory {
    /// The dynamic-inventory document: `_meta.hostvars` plus one top-level
    /// key per group.
    pub fn to_json(&self) -> Result<serde_json::Value, Error> {
        let mut document = serde_json::Map::new();

        document.insert("_meta".to_string(), json!({ "hostvars": self.hosts }));

        for (name, group) in &self.groups {
            document.insert(name.clone(), serde_json::to_value(group)?);
        }

        Ok(serde_json::Value::Object(document))
    }
}

/// Derive the inventory from provisioning state.
///
/// Only instance-typed resources produce host records; a module with no
/// outputs or no instances simply contributes nothing. Resources without a
/// name tag cannot be referenced by configuration steps, so they are logged
/// and skipped rather than failing the whole derivation.
pub fn build_inventory(model: &ResourceModel, use_private_ip: bool) -> HostInventory {
    let mut inventory = HostInventory::default();

    let address_attribute = if use_private_ip {
        "private_ip"
    } else {
        "public_ip"
    };

    // Host records first; group derivation matches against them.
    for resource in model.instances() {
        let Some(hostname) = resource.attributes.get(NAME_TAG) else {
            tracing::error!("Tags Name not found on {}", resource.logical_key);
            continue;
        };

        let attribute = |key: &str| resource.attributes.get(key).cloned().unwrap_or_default();

        inventory.hosts.insert(
            hostname.clone(),
            HostVars {
                ansible_ssh_host: attribute(address_attribute),
                availability_zone: attribute("availability_zone"),
                ami: attribute("ami"),
                id: attribute("id"),
                subnet_id: attribute("subnet_id"),
            },
        );
    }

    // Groups for the explicitly declared output vars.
    for env in model.environments.values() {
        for module in &env.modules {
            for (output, values) in &module.outputs {
                let group = inventory.groups.entry(output.clone()).or_insert(HostGroup {
                    hosts: Vec::new(),
                    vars: Some(GroupVars::default()),
                });

                for value in values {
                    for (hostname, hostvars) in &inventory.hosts {
                        if &hostvars.ansible_ssh_host == value {
                            group.hosts.push(hostname.clone());
                            if let Some(vars) = group.vars.as_mut() {
                                vars.ipaddrs.push(value.clone());
                            }
                        }
                    }
                }
            }
        }
    }

    // Group hosts by tags. Note the create-or-append asymmetry: the host
    // whose resource first creates a group is not itself appended, only
    // later hosts sharing the tag are. Downstream consumers depend on this
    // behavior, so it is kept as is.
    for resource in model.instances() {
        let Some(hostname) = resource.attributes.get(NAME_TAG) else {
            continue;
        };

        for (key, value) in &resource.attributes {
            if !key.starts_with(TAG_PREFIX) {
                continue;
            }

            let group_name = format!("{key}={value}");
            match inventory.groups.entry(group_name) {
                Entry::Vacant(entry) => {
                    entry.insert(HostGroup::default());
                }
                Entry::Occupied(mut entry) => {
                    entry.get_mut().hosts.push(hostname.clone());
                }
            }
        }
    }

    inventory
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{EnvironmentState, ModuleState, Resource};

    fn instance(name: &str, private_ip: &str, extra_tags: &[(&str, &str)]) -> Resource {
        let mut attributes = BTreeMap::new();
        attributes.insert("tags.Name".to_string(), name.to_string());
        attributes.insert("private_ip".to_string(), private_ip.to_string());
        attributes.insert("public_ip".to_string(), format!("54.0.0.{}", 1));
        attributes.insert("availability_zone".to_string(), "us-east-1b".to_string());
        attributes.insert("ami".to_string(), "ami-2e623239".to_string());
        attributes.insert("id".to_string(), format!("i-{name}"));
        attributes.insert("subnet_id".to_string(), "subnet-b8214792".to_string());

        for (key, value) in extra_tags {
            attributes.insert(format!("tags.{key}"), value.to_string());
        }

        Resource {
            resource_type: INSTANCE_RESOURCE_TYPE.to_string(),
            logical_key: format!("aws_instance.{name}"),
            attributes,
        }
    }

    fn model_with(module: ModuleState) -> ResourceModel {
        let mut model = ResourceModel::default();
        model.environments.insert(
            "consul_devtest".to_string(),
            EnvironmentState {
                modules: vec![module],
            },
        );
        model
    }

    #[test]
    fn host_records_use_private_ip_by_default_flag() {
        let model = model_with(ModuleState {
            resources: vec![instance("web-1", "10.0.0.5", &[])],
            outputs: BTreeMap::new(),
        });

        let inventory = build_inventory(&model, true);
        assert_eq!(inventory.hosts["web-1"].ansible_ssh_host, "10.0.0.5");

        let inventory = build_inventory(&model, false);
        assert_eq!(inventory.hosts["web-1"].ansible_ssh_host, "54.0.0.1");
    }

    #[test]
    fn first_group_reference_creates_without_appending() {
        let model = model_with(ModuleState {
            resources: vec![instance("web-1", "10.0.0.5", &[])],
            outputs: BTreeMap::new(),
        });

        let inventory = build_inventory(&model, true);

        // The group exists but its creating host is not in the host list.
        let group = &inventory.groups["tags.Name=web-1"];
        assert!(group.hosts.is_empty());
        assert_eq!(group.vars, None);
    }

    #[test]
    fn later_hosts_sharing_a_tag_are_appended() {
        let model = model_with(ModuleState {
            resources: vec![
                instance("web-1", "10.0.0.5", &[("Cluster", "web")]),
                instance("web-2", "10.0.0.6", &[("Cluster", "web")]),
            ],
            outputs: BTreeMap::new(),
        });

        let inventory = build_inventory(&model, true);

        // web-1 created the group, only web-2 was appended.
        assert_eq!(inventory.groups["tags.Cluster=web"].hosts, vec!["web-2"]);
    }

    #[test]
    fn output_groups_match_hosts_by_connect_address() {
        let mut outputs = BTreeMap::new();
        outputs.insert("consul_ips".to_string(), vec!["10.0.0.5".to_string()]);

        let model = model_with(ModuleState {
            resources: vec![instance("consul-0", "10.0.0.5", &[])],
            outputs,
        });

        let inventory = build_inventory(&model, true);

        let group = &inventory.groups["consul_ips"];
        assert_eq!(group.hosts, vec!["consul-0"]);
        assert_eq!(group.vars.as_ref().unwrap().ipaddrs, vec!["10.0.0.5"]);
    }

    #[test]
    fn outputs_with_no_matching_host_still_create_the_group() {
        let mut outputs = BTreeMap::new();
        outputs.insert("vip".to_string(), vec!["192.168.0.1".to_string()]);

        let model = model_with(ModuleState {
            resources: vec![],
            outputs,
        });

        let inventory = build_inventory(&model, true);

        let group = &inventory.groups["vip"];
        assert!(group.hosts.is_empty());
        assert!(group.vars.as_ref().unwrap().ipaddrs.is_empty());
    }

    #[test]
    fn resources_without_a_name_tag_are_skipped() {
        let mut resource = instance("web-1", "10.0.0.5", &[]);
        resource.attributes.remove("tags.Name");

        let model = model_with(ModuleState {
            resources: vec![resource],
            outputs: BTreeMap::new(),
        });

        let inventory = build_inventory(&model, true);
        assert!(inventory.hosts.is_empty());
        assert!(inventory.groups.is_empty());
    }

    #[test]
    fn json_document_shape() {
        let mut outputs = BTreeMap::new();
        outputs.insert("consul_ips".to_string(), vec!["10.0.0.5".to_string()]);

        let model = model_with(ModuleState {
            resources: vec![instance("consul-0", "10.0.0.5", &[])],
            outputs,
        });

        let inventory = build_inventory(&model, true);
        let document = inventory.to_json().unwrap();

        let hostvars = &document["_meta"]["hostvars"]["consul-0"];
        assert_eq!(hostvars["ansible_ssh_host"], "10.0.0.5");
        assert_eq!(hostvars["availability_zone"], "us-east-1b");
        assert_eq!(hostvars["ami"], "ami-2e623239");
        assert_eq!(hostvars["id"], "i-consul-0");
        assert_eq!(hostvars["subnet_id"], "subnet-b8214792");

        assert_eq!(document["consul_ips"]["hosts"][0], "consul-0");
        assert_eq!(document["consul_ips"]["vars"]["ipaddrs"][0], "10.0.0.5");

        // Tag groups serialize without a vars key.
        assert!(document["tags.Name=consul-0"].get("vars").is_none());
        assert!(document["tags.Name=consul-0"].get("hosts").is_some());
    }
}
