use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use anyhow::Context;
use common::config::normalize::normalize;
use common::config::ConfigStore;
use common::inventory::build_inventory;
use common::probe::{wait_ready, ProbeConfig};
use common::state::parse_state;
use serde_json::json;

use crate::ansible::{run_playbook, InventoryEnv, PlaybookRun, DEFAULT_PLAYBOOK};

/// Wait for every provisioned host to become reachable, then run the
/// configuration-management tool for each declared service.
pub async fn configure(
    config: &Path,
    environment: &Path,
    staging: &Path,
    services_dir: &Path,
    ssh_port: u16,
) -> anyhow::Result<()> {
    if !staging.is_dir() {
        anyhow::bail!("Staging dir {} does not exist", staging.display());
    }

    let store = ConfigStore::load(config, environment)?;
    let data = normalize(&store.cluster, &store.environment);

    // These were flagged, not fatal, during normalization; configuring
    // without them is impossible so they become errors here.
    let connection = data
        .connection_info
        .as_ref()
        .context("No `connection_info` resolved in configuration")?;
    let private_key = data
        .private_key_loc
        .as_deref()
        .context("No `private_key_loc` resolved in configuration")?;

    let use_private_ip = connection.use_private_ip.unwrap_or(true);

    let model = parse_state(staging)?;
    let inventory = build_inventory(&model, use_private_ip);

    let hosts: Vec<SocketAddr> = inventory
        .hosts
        .iter()
        .filter_map(|(name, host)| match host.ansible_ssh_host.parse::<IpAddr>() {
            Ok(ip) => Some(SocketAddr::new(ip, ssh_port)),
            Err(_) => {
                tracing::warn!(
                    "Host {name} has no usable connect address ({:?})",
                    host.ansible_ssh_host
                );
                None
            }
        })
        .collect();

    if !wait_ready(&hosts, &ProbeConfig::default()).await {
        anyhow::bail!("Failed to connect to hosts");
    }

    let inventory_env = InventoryEnv {
        state_root: staging.to_path_buf(),
        use_private_ip,
    };

    for (key, cluster) in &data.clusters {
        let Some(services) = &cluster.services else {
            tracing::debug!("Cluster {key} declares no services");
            continue;
        };

        for (service, spec) in services {
            tracing::info!("{key}: configuring service {service}");

            let default_dir = services_dir.join(service);

            let run = match spec {
                Some(spec) => PlaybookRun {
                    playbook_dir: spec.service_dir.clone().unwrap_or(default_dir),
                    playbook: DEFAULT_PLAYBOOK.to_string(),
                    hosts: spec
                        .hosts
                        .clone()
                        .unwrap_or_else(|| cluster.cluster_name.clone()),
                    username: connection.username.clone(),
                    private_key: private_key.to_string(),
                    service_vars: serde_json::to_value(spec)?,
                },
                None => PlaybookRun {
                    playbook_dir: default_dir,
                    playbook: DEFAULT_PLAYBOOK.to_string(),
                    hosts: cluster.cluster_name.clone(),
                    username: connection.username.clone(),
                    private_key: private_key.to_string(),
                    service_vars: json!({}),
                },
            };

            run_playbook(&run, &inventory_env).await?;
        }
    }

    Ok(())
}
