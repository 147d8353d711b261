use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

use crate::cli::output::print_json;
use crate::cli::service::AppContext;
use crate::domain::models::Config;
use crate::infrastructure::config::{ConfigLoader, PROJECT_DIR};

/// Write the default configuration and create the database
pub async fn execute(force: bool, config: Config, json: bool) -> Result<()> {
    let project_dir = Path::new(PROJECT_DIR);
    let config_path = project_dir.join("config.yaml");
    let targets_dir = project_dir.join("targets");

    let existed = config_path.exists();
    if existed && !force {
        bail!(
            "{} already exists. Use --force to overwrite it",
            config_path.display()
        );
    }

    fs::create_dir_all(&targets_dir)
        .with_context(|| format!("Failed to create {}", targets_dir.display()))?;
    fs::write(&config_path, ConfigLoader::default_yaml())
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    let database = config.storage.path.clone();
    let ctx = AppContext::open(config).await?;
    let progress = ctx
        .progress_store()
        .load(&ctx.catalog)
        .await
        .context("Failed to read challenge progress")?;

    if json {
        print_json(&serde_json::json!({
            "config": config_path.display().to_string(),
            "database": database,
            "targets": targets_dir.display().to_string(),
            "overwritten": existed,
            "challenges": progress.len(),
        }))?;
    } else {
        let verb = if existed { "Reinitialized" } else { "Initialized" };
        println!("{} {verb} {}", console::style("✓").green(), config_path.display());
        println!("  Database:       {database}");
        println!("  Target images:  {}", targets_dir.display());
        println!("  Challenges:     {}", progress.len());
        println!("\nNext: promptcraft session login <USERNAME>");
    }

    Ok(())
}
