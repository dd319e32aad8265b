//! Wrapper around the external provisioning tool.

use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use crate::subprocess::{run_captured, run_streamed, CommandOutput};

#[derive(Clone, Copy, Debug)]
pub struct InitOptions {
    pub get_plugins: bool,
    pub lock: bool,
}

impl Default for InitOptions {
    fn default() -> Self {
        InitOptions {
            get_plugins: true,
            lock: true,
        }
    }
}

pub struct Terraform {
    staging_dir: PathBuf,
}

impl Terraform {
    /// A handle scoped to one staging directory. The directory must already
    /// exist; staging creation belongs to the build step.
    pub fn new(staging_dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let staging_dir = staging_dir.as_ref().to_path_buf();

        if !staging_dir.is_dir() {
            anyhow::bail!(
                "Staging dir {} should be a directory",
                staging_dir.display()
            );
        }

        Ok(Terraform { staging_dir })
    }

    pub async fn init(&self, options: InitOptions) -> anyhow::Result<CommandOutput> {
        tracing::info!("Executing terraform init");

        let mut args = vec!["init"];
        if !options.get_plugins {
            args.push("-get-plugins=false");
        }
        if !options.lock {
            args.push("-lock=false");
        }

        let output = run_captured("terraform", &args, Some(&self.staging_dir), &[]).await?;

        if !output.success() {
            tracing::error!("terraform init failed: {}", output.stderr);
        }
        tracing::debug!("Stdout: {}, Stderr: {}", output.stdout, output.stderr);

        Ok(output)
    }

    pub async fn plan(&self) -> anyhow::Result<ExitStatus> {
        run_streamed("terraform plan", "terraform", &["plan"], Some(&self.staging_dir), &[]).await
    }

    pub async fn apply(&self) -> anyhow::Result<ExitStatus> {
        run_streamed(
            "terraform apply",
            "terraform",
            &["apply"],
            Some(&self.staging_dir),
            &[],
        )
        .await
    }

    pub async fn destroy(&self) -> anyhow::Result<ExitStatus> {
        run_streamed(
            "terraform destroy",
            "terraform",
            &["destroy", "-force"],
            Some(&self.staging_dir),
            &[],
        )
        .await
    }
}
