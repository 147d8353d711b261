use anyhow::{Context, Result};

use crate::cli::output::print_json;
use crate::cli::service::AppContext;
use crate::cli::types::SessionCommands;
use crate::domain::models::Credentials;
use crate::domain::ports::SessionProvider;

pub async fn execute(command: SessionCommands, ctx: &AppContext, json: bool) -> Result<()> {
    let sessions = ctx.sessions();

    match command {
        SessionCommands::Login {
            username,
            display_name,
        } => {
            let session = sessions
                .begin_session(Credentials {
                    username,
                    display_name,
                })
                .await
                .context("Failed to start session")?;

            if json {
                print_json(&session)?;
            } else {
                println!(
                    "{} Signed in as {}",
                    console::style("✓").green(),
                    session.user.label()
                );
            }
        }
        SessionCommands::Logout => {
            sessions.end_session().await.context("Failed to end session")?;
            if json {
                print_json(&serde_json::json!({ "signed_in": false }))?;
            } else {
                println!("Signed out");
            }
        }
        SessionCommands::Whoami => {
            let session = sessions
                .current_session()
                .await
                .context("Failed to read session")?;

            if json {
                print_json(&session)?;
            } else if let Some(session) = session {
                println!("{} ({})", session.user.label(), session.user.username);
                println!(
                    "Signed in {}",
                    session.started_at.format("%Y-%m-%d %H:%M:%S UTC")
                );
            } else {
                println!("Not signed in");
            }
        }
    }

    Ok(())
}
