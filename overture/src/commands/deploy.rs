use std::path::Path;

use crate::terraform::{InitOptions, Terraform};

/// Run the provisioning tool in the staged environment: init, plan, apply.
pub async fn deploy(staging: &Path) -> anyhow::Result<()> {
    let terraform = Terraform::new(staging)?;

    let output = terraform.init(InitOptions::default()).await?;
    if !output.success() {
        anyhow::bail!("terraform init failed: {}", output.stderr);
    }

    let status = terraform.plan().await?;
    if !status.success() {
        anyhow::bail!("terraform plan exited with {status}");
    }

    let status = terraform.apply().await?;
    if !status.success() {
        anyhow::bail!("terraform apply exited with {status}");
    }

    Ok(())
}
