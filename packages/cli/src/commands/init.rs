use super::open_store;
use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use contentdesk_editor::{PersistenceGateway, SectionRegistry};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Address the API listens on
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Store file, relative to the current directory
    #[arg(short, long)]
    pub store: Option<String>,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    // Check if config already exists
    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing content store...".bright_blue().bold());

    let defaults = Config::default();
    let config = Config {
        bind: args.bind.unwrap_or(defaults.bind),
        store_path: args.store.unwrap_or(defaults.store_path),
        ..defaults
    };

    // Write config file
    let config_json = serde_json::to_string_pretty(&config)?;
    fs::write(&config_path, config_json)?;
    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);

    let gateway = open_store(&config, cwd)?;
    let runtime = tokio::runtime::Runtime::new()?;
    let seeded = runtime.block_on(seed_sections(&gateway))?;
    println!(
        "  {} Seeded {} section(s) in {}",
        "✓".green(),
        seeded,
        config.store_path
    );

    println!();
    println!("{}", "✅ Content store initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Run: contentdesk serve");
    println!("  2. Open http://{}/api/sections", config.bind);

    Ok(())
}

/// Write the default value of every section the store does not have yet
async fn seed_sections(gateway: &dyn PersistenceGateway) -> Result<usize> {
    let registry = SectionRegistry::builtin();
    let mut seeded = 0;

    for spec in registry.sections() {
        if gateway.read_section(&spec.endpoint).await?.is_some() {
            continue;
        }
        gateway
            .write_section(&spec.endpoint, spec.default_value.clone(), Some(0))
            .await?;
        tracing::debug!(section = %spec.id, "section seeded");
        seeded += 1;
    }

    Ok(seeded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use contentdesk_editor::MemoryGateway;

    #[tokio::test]
    async fn test_seed_skips_existing_sections() {
        let gateway = MemoryGateway::new();
        let registry = SectionRegistry::builtin();
        let total = registry.sections().count();

        assert_eq!(seed_sections(&gateway).await.unwrap(), total);
        assert_eq!(seed_sections(&gateway).await.unwrap(), 0);
    }

    #[test]
    fn test_init_writes_config_and_store() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path().display().to_string();

        init(
            InitArgs {
                bind: Some("127.0.0.1:4000".to_string()),
                store: None,
                force: false,
            },
            &cwd,
        )
        .unwrap();

        let config = Config::load(&cwd).unwrap();
        assert_eq!(config.bind, "127.0.0.1:4000");
        assert!(config.get_store_path(&cwd).exists());
    }
}
