use std::path::Path;

use common::inventory::build_inventory;
use common::state::parse_state;

/// Dynamic inventory entry point. The configuration-management tool invokes
/// this with `--list` and expects the full document on stdout.
pub fn inventory(
    list: bool,
    host: Option<String>,
    state_root: &Path,
    use_private_ip: bool,
) -> anyhow::Result<()> {
    if let Some(host) = host {
        // Per-host lookup is not supported; everything is in _meta.hostvars.
        anyhow::bail!("Per-host inventory lookup is not supported (host: {host})");
    }

    if list {
        let model = parse_state(state_root)?;
        let inventory = build_inventory(&model, use_private_ip);

        println!("{}", serde_json::to_string_pretty(&inventory.to_json()?)?);
    }

    Ok(())
}
