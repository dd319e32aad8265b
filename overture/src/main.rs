use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};

mod ansible;
mod cli;
mod commands;
mod subprocess;
mod terraform;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    tracing::debug!("Cli args: {:?}", cli);

    match cli.command {
        Command::Build {
            config,
            environment,
            staging,
            templates,
            scripts,
            skip_deploy,
        } => {
            commands::build(
                &config,
                &environment,
                &staging,
                &templates,
                &scripts,
                skip_deploy,
            )
            .await?
        }
        Command::Deploy { staging } => commands::deploy(&staging).await?,
        Command::Configure {
            config,
            environment,
            staging,
            services,
            ssh_port,
        } => commands::configure(&config, &environment, &staging, &services, ssh_port).await?,
        Command::Destroy { staging, force } => commands::destroy(&staging, force).await?,
        Command::List { staging } => commands::list(&staging)?,
        Command::Inventory {
            list,
            host,
            state_root,
            use_private_ip,
        } => commands::inventory(list, host, &state_root, use_private_ip)?,
    }

    Ok(())
}
