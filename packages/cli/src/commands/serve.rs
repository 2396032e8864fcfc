use super::open_store;
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use contentdesk_editor::{SectionRegistry, StatusNotifier};
use contentdesk_workspace::{AppState, ConsoleState};
use std::sync::Arc;

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to listen on (overrides the config)
    #[arg(short, long)]
    pub bind: Option<String>,
}

pub fn serve(args: ServeArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let bind = args.bind.unwrap_or_else(|| config.bind.clone());

    let gateway = Arc::new(open_store(&config, cwd)?);
    let notifier = StatusNotifier::with_ttl(config.status_ttl());

    println!("{}", "🚀 Starting content console API...".bright_blue().bold());
    println!("   Store:  {}", config.get_store_path(cwd).display());
    println!("   Listen: {}", bind.cyan());

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let console = ConsoleState::new(SectionRegistry::builtin(), gateway, notifier);
        console.load().await?;

        contentdesk_workspace::serve(&bind, AppState::new(console)).await?;
        Ok::<_, anyhow::Error>(())
    })
}
