//! Command-line interface: clap definitions, command handlers and output.

pub mod commands;
pub mod output;
pub mod service;
pub mod types;

pub use service::AppContext;
pub use types::{ChallengeCommands, Cli, Commands, ProgressCommands, SessionCommands};

/// Report `err` with its cause chain and exit with status 1
///
/// JSON mode writes a single object to stdout so scripted callers can parse
/// failures the same way as results.
pub fn handle_error(err: anyhow::Error, json: bool) -> ! {
    if json {
        let causes: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
        let payload = serde_json::json!({
            "error": err.to_string(),
            "causes": causes,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&payload).unwrap_or_else(|_| err.to_string())
        );
    } else {
        eprintln!("{} {err}", console::style("Error:").red().bold());
        for cause in err.chain().skip(1) {
            eprintln!("  caused by: {cause}");
        }
    }

    std::process::exit(1)
}
