use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    IO(#[from] io::Error),
    #[error("Error while serializing JSON")]
    JsonSerialization(#[from] serde_json::Error),
    #[error("Failed to parse cluster configuration: {0}")]
    ClusterConfigParse(#[source] serde_yaml::Error),
    #[error("Invalid environment path {0}")]
    InvalidEnvironmentPath(PathBuf),
    #[error("Environment file {0} not found")]
    EnvironmentNotFound(PathBuf),
    #[error("Failed to parse environment configuration {path}: {source}")]
    EnvironmentConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Cluster configuration does not have an `environment` key")]
    EnvironmentNameMissing,
    #[error("No provisioning state found under {0}")]
    StateNotFound(PathBuf),
    #[error("Failed to parse state document {path}: {source}")]
    StateParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Template {0} not found")]
    TemplateNotFound(PathBuf),
    #[error("Failed to render template: {0}")]
    TemplateRender(#[from] minijinja::Error),
}
