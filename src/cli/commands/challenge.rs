use anyhow::{anyhow, Context, Result};
use console::style;

use crate::cli::output::table::format_score;
use crate::cli::output::{print_json, TableFormatter};
use crate::cli::service::AppContext;
use crate::cli::types::ChallengeCommands;
use crate::domain::models::{ChallengeId, ChallengeProgress};

pub async fn execute(command: ChallengeCommands, ctx: &AppContext, json: bool) -> Result<()> {
    match command {
        ChallengeCommands::List => handle_list(ctx, json).await,
        ChallengeCommands::Show { challenge_id } => handle_show(ctx, challenge_id, json).await,
    }
}

/// Handle challenges list command
async fn handle_list(ctx: &AppContext, json: bool) -> Result<()> {
    let progress = ctx
        .progress_store()
        .load(&ctx.catalog)
        .await
        .context("Failed to load challenge progress")?;

    if json {
        let rows: Vec<_> = ctx
            .catalog
            .iter()
            .map(|challenge| {
                serde_json::json!({
                    "challenge": challenge,
                    "progress": progress.get(&challenge.id),
                })
            })
            .collect();
        return print_json(&rows);
    }

    println!("Challenges:");
    println!("{}", TableFormatter::new().format_challenges(&ctx.catalog, &progress));
    Ok(())
}

/// Handle challenges show command
async fn handle_show(ctx: &AppContext, challenge_id: String, json: bool) -> Result<()> {
    let id = ChallengeId::from(challenge_id);
    let index = ctx
        .catalog
        .index_of(&id)
        .ok_or_else(|| anyhow!("Challenge not found: {id}"))?;
    let challenge = ctx
        .catalog
        .get(&id)
        .ok_or_else(|| anyhow!("Challenge not found: {id}"))?;

    let progress = ctx
        .progress_store()
        .load(&ctx.catalog)
        .await
        .context("Failed to load challenge progress")?;
    let entry = progress
        .get(&id)
        .cloned()
        .unwrap_or_else(ChallengeProgress::locked);

    if json {
        return print_json(&serde_json::json!({
            "position": index + 1,
            "challenge": challenge,
            "progress": entry,
        }));
    }

    println!("\n{}", style(&challenge.name).bold());
    println!("─────────────────────────────────────────");
    println!("ID:          {}", challenge.id);
    println!("Position:    {} of {}", index + 1, ctx.catalog.len());
    println!("Status:      {}", entry.status);
    println!("Streak:      {}", entry.streak);
    println!("Last score:  {}", format_score(entry.previous_similarity_score));
    println!("Target:      {}", challenge.target_image);
    println!("\nGoal:");
    println!("{}", challenge.description);

    Ok(())
}
