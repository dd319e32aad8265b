//! Parsing of the provisioning tool's persisted state.
//!
//! A staging root holds one subdirectory per environment; each directory
//! containing a `terraform.tfstate` document contributes one environment
//! entry to the [`ResourceModel`]. The on-disk field names and nesting are
//! the external tool's format and are preserved exactly.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;
use walkdir::WalkDir;

use crate::error::Error;

pub const STATE_FILENAME: &str = "terraform.tfstate";

/// Resource type that carries host attributes (`private_ip`, `public_ip`,
/// `availability_zone`, ...). Other types are retained in the model but only
/// instance-shaped logic selects on this.
pub const INSTANCE_RESOURCE_TYPE: &str = "aws_instance";

// Wire format of a state document.

#[derive(Debug, Deserialize)]
struct StateDocument {
    #[serde(default)]
    modules: Vec<StateModule>,
}

#[derive(Debug, Deserialize)]
struct StateModule {
    #[serde(default)]
    resources: BTreeMap<String, StateResource>,
    #[serde(default)]
    outputs: BTreeMap<String, StateOutput>,
}

#[derive(Debug, Deserialize)]
struct StateResource {
    #[serde(rename = "type")]
    resource_type: String,
    primary: StatePrimary,
}

#[derive(Debug, Deserialize)]
struct StatePrimary {
    #[serde(default)]
    attributes: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct StateOutput {
    value: OutputValue,
}

/// Older state revisions persist a single-value output as a bare string
/// rather than a one-element list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OutputValue {
    One(String),
    Many(Vec<String>),
}

impl OutputValue {
    fn into_values(self) -> Vec<String> {
        match self {
            OutputValue::One(value) => vec![value],
            OutputValue::Many(values) => values,
        }
    }
}

/// One provisioned entity as recorded in state: a type, the logical key it
/// was declared under, and the flattened attribute map (tag keys use the
/// `tags.<Name>` convention).
#[derive(Clone, Debug, PartialEq)]
pub struct Resource {
    pub resource_type: String,
    pub logical_key: String,
    pub attributes: BTreeMap<String, String>,
}

/// One module from a state document: its resources plus its declared
/// outputs (output name to list of values, typically IP addresses).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModuleState {
    pub resources: Vec<Resource>,
    pub outputs: BTreeMap<String, Vec<String>>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnvironmentState {
    pub modules: Vec<ModuleState>,
}

/// Mapping from environment name to the typed resources and outputs found
/// in that environment's state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResourceModel {
    pub environments: BTreeMap<String, EnvironmentState>,
}

impl ResourceModel {
    /// All instance-typed resources across every environment and module.
    pub fn instances(&self) -> impl Iterator<Item = &Resource> {
        self.environments
            .values()
            .flat_map(|env| &env.modules)
            .flat_map(|module| &module.resources)
            .filter(|resource| resource.resource_type == INSTANCE_RESOURCE_TYPE)
    }
}

/// Walk the staging tree and parse every state document found.
///
/// Fails with [`Error::StateNotFound`] when the walk finds no state file at
/// all, and with [`Error::StateParse`] when a found document is malformed.
pub fn parse_state(staging_root: impl AsRef<Path>) -> Result<ResourceModel, Error> {
    let staging_root = staging_root.as_ref();

    let mut model = ResourceModel::default();

    for entry in WalkDir::new(staging_root)
        .into_iter()
        .filter_map(|entry| entry.ok())
    {
        if !entry.file_type().is_file() || entry.file_name() != STATE_FILENAME {
            continue;
        }

        let path = entry.path();

        let environment = path
            .parent()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        tracing::debug!("Parsing state document {}", path.display());

        let file = File::open(path)?;
        let document: StateDocument = serde_json::from_reader(BufReader::new(file))
            .map_err(|source| Error::StateParse {
                path: path.to_path_buf(),
                source,
            })?;

        let modules = document
            .modules
            .into_iter()
            .map(|module| ModuleState {
                resources: module
                    .resources
                    .into_iter()
                    .map(|(logical_key, resource)| Resource {
                        resource_type: resource.resource_type,
                        logical_key,
                        attributes: resource.primary.attributes,
                    })
                    .collect(),
                outputs: module
                    .outputs
                    .into_iter()
                    .map(|(name, output)| (name, output.value.into_values()))
                    .collect(),
            })
            .collect();

        model
            .environments
            .insert(environment, EnvironmentState { modules });
    }

    if model.environments.is_empty() {
        return Err(Error::StateNotFound(staging_root.to_path_buf()));
    }

    Ok(model)
}
