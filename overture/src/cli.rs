use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Build, deploy and configure cloud clusters from templated infrastructure
/// definitions.
#[derive(Parser, Debug)]
#[clap(name = "overture")]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Render infrastructure definitions into a staging directory
    Build {
        /// User/cluster configuration file
        #[clap(long)]
        config: PathBuf,
        /// Path to the environments configuration directory
        #[clap(long)]
        environment: PathBuf,
        /// Location where infrastructure definitions will be generated
        #[clap(long)]
        staging: PathBuf,
        /// Path to the templates directory
        #[clap(long, default_value = "./templates")]
        templates: PathBuf,
        /// Path to the directory holding the base init script (common.sh)
        #[clap(long, default_value = "./scripts")]
        scripts: PathBuf,
        /// Skip the deploy step (plan/apply) after rendering
        #[clap(long)]
        skip_deploy: bool,
    },
    /// Run the provisioning tool (plan, then apply) in a staged environment
    Deploy {
        /// Path to the cluster staging directory
        #[clap(long)]
        staging: PathBuf,
    },
    /// Wait for provisioned hosts and configure their services
    Configure {
        /// User/cluster configuration file
        #[clap(long)]
        config: PathBuf,
        /// Path to the environments configuration directory
        #[clap(long)]
        environment: PathBuf,
        /// Path to the cluster staging directory
        #[clap(long)]
        staging: PathBuf,
        /// Directory containing per-service playbooks
        #[clap(long, default_value = "./services")]
        services: PathBuf,
        /// Control-plane port probed for readiness
        #[clap(long, default_value = "22")]
        ssh_port: u16,
    },
    /// Tear down a provisioned environment
    Destroy {
        /// Path to the cluster staging directory
        #[clap(long)]
        staging: PathBuf,
        /// Skip the interactive confirmation
        #[clap(long)]
        force: bool,
    },
    /// List the resources recorded in provisioning state
    List {
        /// Path to the staging directory
        #[clap(long)]
        staging: PathBuf,
    },
    /// Dynamic inventory entry point for the configuration-management tool
    #[clap(hide = true)]
    Inventory {
        /// Print the full inventory document
        #[clap(long)]
        list: bool,
        /// Per-host lookup (unsupported, exits non-zero)
        #[clap(long)]
        host: Option<String>,
        #[clap(long, env = "TERRAFORM_STATE_ROOT", default_value = ".")]
        state_root: PathBuf,
        #[clap(long, env = "USE_PRIVATE_IP", default_value = "True", value_parser = parse_loose_bool)]
        use_private_ip: bool,
    },
}

/// The inventory environment variables historically carried Python-style
/// booleans, so accept those spellings too.
fn parse_loose_bool(value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(format!("invalid boolean: {other}")),
    }
}
