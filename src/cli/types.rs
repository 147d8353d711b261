//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "promptcraft")]
#[command(about = "Promptcraft - prompt engineering challenges scored by an image oracle", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Load configuration from this file instead of .promptcraft/
    #[arg(short, long, global = true, env = "PROMPTCRAFT_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize Promptcraft configuration and database
    Init {
        /// Overwrite an existing configuration file
        #[arg(short, long)]
        force: bool,
    },

    /// Browse the challenge catalog
    #[command(subcommand)]
    Challenges(ChallengeCommands),

    /// Submit a prompt for a challenge and have it scored
    Attempt {
        /// Challenge ID
        challenge_id: String,

        /// Image generation prompt
        prompt: String,
    },

    /// Inspect or reset challenge progress
    #[command(subcommand)]
    Progress(ProgressCommands),

    /// Manage the signed-in user
    #[command(subcommand)]
    Session(SessionCommands),
}

#[derive(Subcommand)]
pub enum ChallengeCommands {
    /// List challenges in play order with their status
    List,

    /// Show details for a specific challenge
    Show {
        /// Challenge ID
        challenge_id: String,
    },
}

#[derive(Subcommand)]
pub enum ProgressCommands {
    /// Show status, streak and last score for every challenge
    Show,

    /// Discard all progress and start over
    Reset {
        /// Skip the confirmation check
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum SessionCommands {
    /// Start a session
    Login {
        /// Username (letters, digits, '-', '_' and '.')
        username: String,

        /// Name shown in output instead of the username
        #[arg(short, long)]
        display_name: Option<String>,
    },

    /// End the current session
    Logout,

    /// Show the signed-in user
    Whoami,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_attempt() {
        let cli = Cli::try_parse_from(["promptcraft", "--json", "attempt", "lighthouse", "a lighthouse at dusk"])
            .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Attempt { challenge_id, prompt } => {
                assert_eq!(challenge_id, "lighthouse");
                assert_eq!(prompt, "a lighthouse at dusk");
            }
            _ => panic!("expected attempt command"),
        }
    }

    #[test]
    fn test_parse_session_login() {
        let cli = Cli::try_parse_from(["promptcraft", "session", "login", "ada", "-d", "Ada"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Session(SessionCommands::Login { ref username, display_name: Some(ref d) })
                if username == "ada" && d == "Ada"
        ));
    }
}
