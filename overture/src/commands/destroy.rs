use std::io::{self, BufRead, Write};
use std::path::Path;

use common::state::STATE_FILENAME;

use crate::terraform::Terraform;

/// Tear down the mapped infrastructure for one staged environment. Asks for
/// a literal `yes` unless forced.
pub async fn destroy(staging: &Path, force: bool) -> anyhow::Result<()> {
    let state_file = staging.join(STATE_FILENAME);
    if !state_file.exists() {
        anyhow::bail!("State file {} does not exist", state_file.display());
    }

    if !force {
        println!("Do you really want to destroy?");
        println!("   The provisioning tool will delete all your mapped infrastructure.");
        println!("   There is no undo. Only 'yes' will be accepted to confirm.");
        print!("Enter a value: ");
        io::stdout().flush()?;

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;

        if answer.trim() != "yes" {
            println!("Only \"yes\" will delete");
            return Ok(());
        }
    }

    let terraform = Terraform::new(staging)?;
    let status = terraform.destroy().await?;

    if !status.success() {
        anyhow::bail!("terraform destroy exited with {status}");
    }

    Ok(())
}
