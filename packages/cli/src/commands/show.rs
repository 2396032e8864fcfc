use super::open_store;
use crate::config::Config;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use contentdesk_common::{FieldPath, SectionId};
use contentdesk_editor::{PersistenceGateway, SectionRegistry, SectionSpec};

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Section to print; lists all sections when omitted
    pub section: Option<String>,

    /// Only print this field of the section (dotted path)
    #[arg(short, long)]
    pub field: Option<String>,
}

pub fn show(args: ShowArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let gateway = open_store(&config, cwd)?;
    let registry = SectionRegistry::builtin();
    let runtime = tokio::runtime::Runtime::new()?;

    let Some(section) = args.section else {
        for spec in registry.sections() {
            let stored = runtime.block_on(gateway.read_section(&spec.endpoint))?;
            let version = match stored {
                Some(stored) => format!("v{}", stored.version).green(),
                None => "default".yellow(),
            };
            println!("  {:<16} {:<22} {}", spec.id.as_str().bright_white(), spec.label, version);
        }
        return Ok(());
    };

    let spec = registry.section(&SectionId::from(section))?;
    let value = runtime.block_on(current_value(&gateway, spec))?;
    let value = match args.field {
        Some(field) => {
            let path = FieldPath::parse(&field)?;
            path.get(&value)
                .cloned()
                .ok_or_else(|| anyhow!("{} has no field {}", spec.id, path))?
        }
        None => value,
    };

    println!("{}", format!("📄 {}", spec.label).bright_blue().bold());
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

/// The stored value, or the registered default if never saved
async fn current_value(gateway: &dyn PersistenceGateway, spec: &SectionSpec) -> Result<serde_json::Value> {
    Ok(gateway
        .read_section(&spec.endpoint)
        .await?
        .map(|stored| stored.value)
        .unwrap_or_else(|| spec.default_value.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use contentdesk_editor::{MemoryGateway, SectionEndpoint};
    use serde_json::json;

    #[tokio::test]
    async fn test_current_value_falls_back_to_default() {
        let gateway = MemoryGateway::new();
        let registry = SectionRegistry::builtin();
        let spec = registry.section(&SectionId::from("dashboardStats")).unwrap();

        let value = current_value(&gateway, spec).await.unwrap();
        assert_eq!(value["successRate"], json!("98%"));

        gateway.seed_section(&SectionEndpoint::DashboardStats, json!({"successRate": "99%"}));
        let value = current_value(&gateway, spec).await.unwrap();
        assert_eq!(value["successRate"], json!("99%"));
    }
}
