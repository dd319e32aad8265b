use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use common::config::normalize::normalize;
use common::config::ConfigStore;
use common::template::TemplateEngine;

use crate::commands::deploy;

const COMMON_TEMPLATE: &str = "common";
const BASE_INIT_SCRIPT: &str = "common.sh";

/// Render the infrastructure definitions for every declared cluster into a
/// fresh staging subdirectory, then (unless skipped) hand the result to the
/// provisioning tool.
pub async fn build(
    config: &Path,
    environment: &Path,
    staging: &Path,
    templates: &Path,
    scripts: &Path,
    skip_deploy: bool,
) -> anyhow::Result<()> {
    let store = ConfigStore::load(config, environment)?;
    let data = normalize(&store.cluster, &store.environment);

    if !data.missing_required().is_empty() {
        tracing::warn!(
            "Proceeding with missing required fields: {:?}",
            data.missing_required()
        );
    }

    if !templates.is_dir() {
        anyhow::bail!("Invalid path to templates {}", templates.display());
    }

    let cluster_staging = create_cluster_staging(staging, &store)?;
    let engine = TemplateEngine::new(templates.join(&data.cloud_type));

    // The shared definitions first, then one file per cluster.
    let rendered = engine.render(COMMON_TEMPLATE, &data)?;
    fs::write(cluster_staging.join("common.tf"), rendered)?;

    for (key, cluster) in &data.clusters {
        let template_name = cluster
            .cluster_template
            .as_deref()
            .with_context(|| format!("Cluster {key} has no cluster_template"))?;

        let tf_name = &cluster.cluster_name;

        let mut context = serde_json::to_value(cluster)?;
        context["init_script"] = format!("./scripts/{tf_name}.sh").into();

        let rendered = engine.render(template_name, &context)?;
        fs::write(cluster_staging.join(format!("{tf_name}.tf")), rendered)?;

        generate_init_script(
            scripts,
            &cluster_staging,
            tf_name,
            cluster.user_init_script.as_deref(),
        )?;
    }

    tracing::info!("Build cluster staging: successful");

    if !skip_deploy {
        deploy(&cluster_staging).await?;
    }

    Ok(())
}

/// `<staging>/<cluster name>_<environment name>` plus a `scripts/`
/// subdirectory for generated init scripts.
fn create_cluster_staging(staging: &Path, store: &ConfigStore) -> anyhow::Result<PathBuf> {
    if staging.exists() && !staging.is_dir() {
        anyhow::bail!("Staging path cannot be a file");
    }

    let name = store
        .cluster
        .name
        .as_deref()
        .context("Cluster configuration has no `name` key")?;
    let environment = store
        .cluster
        .environment
        .as_deref()
        .context("Cluster configuration has no `environment` key")?;

    let cluster_staging = staging.join(format!("{name}_{environment}"));

    let scripts_dir = cluster_staging.join("scripts");
    if !scripts_dir.exists() {
        tracing::info!("{} does not exist, creating it", scripts_dir.display());
        fs::create_dir_all(&scripts_dir)?;
    }

    Ok(cluster_staging)
}

/// Concatenate the base init script with the user's, dropping the user
/// script's shebang line, and write the result next to the rendered
/// definitions.
fn generate_init_script(
    scripts: &Path,
    cluster_staging: &Path,
    tf_name: &str,
    user_init_script: Option<&Path>,
) -> anyhow::Result<()> {
    let base_path = scripts.join(BASE_INIT_SCRIPT);
    let mut script = fs::read_to_string(&base_path)
        .with_context(|| format!("Failed to read base init script {}", base_path.display()))?;

    if let Some(user_init_script) = user_init_script {
        if !user_init_script.exists() {
            tracing::error!(
                "Invalid path to init script {}",
                user_init_script.display()
            );
        } else {
            let user_data = fs::read_to_string(user_init_script)?;
            for line in user_data.lines() {
                if line.starts_with("#!") {
                    continue;
                }
                script.push('\n');
                script.push_str(line);
            }
        }
    }

    let script_path = cluster_staging
        .join("scripts")
        .join(format!("{tf_name}.sh"));
    fs::write(script_path, script)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::config::ClusterConfig;

    #[test]
    fn staging_subdirectory_is_name_underscore_environment() {
        let staging = tempfile::tempdir().unwrap();

        let cluster = ClusterConfig {
            name: Some("consul".to_string()),
            environment: Some("devtest".to_string()),
            ..ClusterConfig::default()
        };
        let store = ConfigStore {
            cluster,
            environment: Default::default(),
        };

        let dir = create_cluster_staging(staging.path(), &store).unwrap();

        assert_eq!(dir, staging.path().join("consul_devtest"));
        assert!(dir.join("scripts").is_dir());
    }

    #[test]
    fn init_script_drops_user_shebang() {
        let scripts = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        fs::create_dir(staging.path().join("scripts")).unwrap();

        fs::write(scripts.path().join("common.sh"), "#!/bin/bash\nset -e").unwrap();

        let user_script = scripts.path().join("user.sh");
        fs::write(&user_script, "#!/bin/sh\necho hello").unwrap();

        generate_init_script(scripts.path(), staging.path(), "consul", Some(&user_script))
            .unwrap();

        let script =
            fs::read_to_string(staging.path().join("scripts").join("consul.sh")).unwrap();

        assert_eq!(script, "#!/bin/bash\nset -e\necho hello");
    }

    #[test]
    fn missing_user_script_keeps_the_base() {
        let scripts = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        fs::create_dir(staging.path().join("scripts")).unwrap();

        fs::write(scripts.path().join("common.sh"), "#!/bin/bash\n").unwrap();

        generate_init_script(
            scripts.path(),
            staging.path(),
            "consul",
            Some(Path::new("/no/such/script.sh")),
        )
        .unwrap();

        let script =
            fs::read_to_string(staging.path().join("scripts").join("consul.sh")).unwrap();
        assert_eq!(script, "#!/bin/bash\n");
    }
}
