//! Wrapper around the external configuration-management tool.
//!
//! The inventory-derivation step needs to know where provisioning state
//! lives and which address to hand out. Rather than mutating our own
//! process environment, those travel in an explicit [`InventoryEnv`] that is
//! serialized into the child environment only when the playbook process is
//! spawned.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::subprocess::run_streamed;

pub const DEFAULT_PLAYBOOK: &str = "site.yaml";

/// Settings consumed by the dynamic-inventory subprocess.
#[derive(Clone, Debug)]
pub struct InventoryEnv {
    pub state_root: PathBuf,
    pub use_private_ip: bool,
}

impl InventoryEnv {
    fn to_envs(&self) -> Vec<(String, String)> {
        vec![
            (
                "TERRAFORM_STATE_ROOT".to_string(),
                self.state_root.to_string_lossy().into_owned(),
            ),
            (
                "USE_PRIVATE_IP".to_string(),
                if self.use_private_ip { "True" } else { "False" }.to_string(),
            ),
            ("ANSIBLE_HOST_KEY_CHECKING".to_string(), "False".to_string()),
        ]
    }

    /// Write an executable wrapper that re-invokes this binary's `inventory`
    /// subcommand; the configuration-management tool calls it with `--list`.
    pub fn write_inventory_script(&self, dir: &Path) -> anyhow::Result<PathBuf> {
        let current_exe = std::env::current_exe()?;

        let script_path = dir.join("inventory.sh");
        let script = format!(
            "#!/bin/sh\nexec {} inventory \"$@\"\n",
            current_exe.display()
        );

        fs::write(&script_path, script)?;
        fs::set_permissions(&script_path, fs::Permissions::from_mode(0o755))?;

        Ok(script_path)
    }
}

/// One playbook invocation against the derived inventory.
#[derive(Clone, Debug)]
pub struct PlaybookRun {
    pub playbook_dir: PathBuf,
    pub playbook: String,
    pub hosts: String,
    pub username: String,
    pub private_key: String,
    pub service_vars: serde_json::Value,
}

pub async fn run_playbook(run: &PlaybookRun, env: &InventoryEnv) -> anyhow::Result<()> {
    tracing::info!(
        "Playbook [{}, {}] hosts: {}",
        run.playbook_dir.display(),
        run.playbook,
        run.hosts
    );

    let inventory_script = env.write_inventory_script(&env.state_root)?;
    let inventory_arg = inventory_script.to_string_lossy().into_owned();

    let extra_vars = format!("username={} hosts={}", run.username, run.hosts);
    let service_vars = serde_json::to_string(&run.service_vars)?;
    let private_key_option = format!("--private-key={}", run.private_key);

    let status = run_streamed(
        "ansible-playbook",
        "ansible-playbook",
        &[
            "-i",
            &inventory_arg,
            &run.playbook,
            "-e",
            &extra_vars,
            "-e",
            &service_vars,
            &private_key_option,
        ],
        Some(&run.playbook_dir),
        &env.to_envs(),
    )
    .await?;

    if !status.success() {
        anyhow::bail!(
            "ansible-playbook for hosts {} exited with {}",
            run.hosts,
            status
        );
    }

    Ok(())
}
