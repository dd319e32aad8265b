use std::path::Path;

use common::state::parse_state;

/// Walk the staging root and print the resources recorded for each
/// environment.
pub fn list(staging: &Path) -> anyhow::Result<()> {
    let model = parse_state(staging)?;

    for (environment, state) in &model.environments {
        println!("Environment: {environment}");

        for module in &state.modules {
            for resource in &module.resources {
                let name = resource
                    .attributes
                    .get("tags.Name")
                    .map(String::as_str)
                    .unwrap_or("-");

                println!(
                    "  {:<24} {:<40} {}",
                    resource.resource_type, resource.logical_key, name
                );
            }

            for (output, values) in &module.outputs {
                println!("  output {output} = {}", values.join(", "));
            }
        }
    }

    Ok(())
}
