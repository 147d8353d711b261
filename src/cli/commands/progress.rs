use anyhow::{bail, Context, Result};

use crate::cli::output::{print_json, TableFormatter};
use crate::cli::service::AppContext;
use crate::cli::types::ProgressCommands;
use crate::domain::models::ChallengeStatus;

pub async fn execute(command: ProgressCommands, ctx: &AppContext, json: bool) -> Result<()> {
    match command {
        ProgressCommands::Show => handle_show(ctx, json).await,
        ProgressCommands::Reset { yes } => handle_reset(ctx, yes, json).await,
    }
}

async fn handle_show(ctx: &AppContext, json: bool) -> Result<()> {
    let progress = ctx
        .progress_store()
        .load(&ctx.catalog)
        .await
        .context("Failed to load challenge progress")?;

    if json {
        return print_json(&progress);
    }

    let completed = progress
        .values()
        .filter(|p| p.status == ChallengeStatus::Completed)
        .count();

    println!("{}", TableFormatter::new().format_challenges(&ctx.catalog, &progress));
    println!("\n{completed} of {} challenges completed", ctx.catalog.len());
    Ok(())
}

async fn handle_reset(ctx: &AppContext, yes: bool, json: bool) -> Result<()> {
    if !yes {
        bail!("Resetting discards all streaks and unlocks. Re-run with --yes to confirm");
    }

    let progress = ctx
        .progress_store()
        .reset(&ctx.catalog)
        .await
        .context("Failed to reset challenge progress")?;

    if json {
        print_json(&progress)
    } else {
        println!("{} Progress reset", console::style("✓").green());
        Ok(())
    }
}
