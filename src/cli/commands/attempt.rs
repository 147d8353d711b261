use anyhow::{Context, Result};
use console::style;
use indicatif::ProgressBar;
use tokio::sync::broadcast::error::RecvError;

use crate::cli::output::{create_spinner, print_json, ProgressBarExt};
use crate::cli::service::AppContext;
use crate::domain::models::{AttemptOutcome, AttemptPhase, AttemptReport, ChallengeId, StreakChange};
use crate::services::SignalKind;

/// Submit one prompt and report the outcome
///
/// The spinner follows the attempt's phase signals while the pipeline runs
/// in the background.
pub async fn execute(challenge_id: String, prompt: String, ctx: &AppContext, json: bool) -> Result<()> {
    let session = ctx.require_session().await?;
    let machine = ctx.state_machine().await?;
    let id = ChallengeId::from(challenge_id);

    let mut signals = machine.signals().subscribe();
    let mut handle = machine.spawn_submit(session.user, id.clone(), prompt)?;

    let spinner = create_spinner(json);
    spinner.set_message(format!("Submitting to {id}"));

    let outcome = loop {
        tokio::select! {
            joined = &mut handle => break joined.context("Attempt task panicked")??,
            signal = signals.recv() => match signal {
                Ok(signal) if signal.challenge_id == id => describe(&spinner, &signal.kind),
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break (&mut handle).await.context("Attempt task panicked")??,
            },
        }
    };

    match outcome {
        AttemptOutcome::Scored(report) => {
            if report.passed {
                spinner.finish_success(format!("Scored {:.0}", report.result.similarity_score));
            } else {
                spinner.finish_error(format!("Scored {:.0}", report.result.similarity_score));
            }

            if json {
                print_json(&report)
            } else {
                print_report(&report, machine.policy().pass_threshold);
                Ok(())
            }
        }
        AttemptOutcome::Failed(failure) => {
            let stage = failure.error.stage();
            spinner.finish_error(format!("Attempt failed during {stage}"));
            Err(anyhow::Error::new(failure.error)
                .context(format!("Attempt on {} failed during {stage}", failure.challenge_id)))
        }
    }
}

fn describe(spinner: &ProgressBar, kind: &SignalKind) {
    let message = match kind {
        SignalKind::AttemptStarted => "Starting attempt",
        SignalKind::PhaseChanged {
            phase: AttemptPhase::AwaitingGeneration,
        } => "Generating image",
        SignalKind::PhaseChanged {
            phase: AttemptPhase::Analyzing,
        } => "Analyzing against the target",
        SignalKind::PhaseChanged { .. } => "Recording result",
        SignalKind::StreakChanged { .. } | SignalKind::AttemptFinished { .. } => return,
    };
    spinner.set_message(message);
}

fn print_report(report: &AttemptReport, pass_threshold: f64) {
    let score = report.result.similarity_score;
    let verdict = if report.passed {
        style("PASS").green().bold()
    } else {
        style("FAIL").red().bold()
    };

    println!();
    println!("Challenge:   {}", report.challenge_id);
    println!("Similarity:  {score:.1} / 100  {verdict} (pass at {pass_threshold:.0})");

    let streak = report.progress.streak;
    let streak_line = match report.streak_change {
        StreakChange::Increase => style(format!("{streak} ▲")).green(),
        StreakChange::Decrease => style(format!("{streak} ▼ (reset)")).red(),
        StreakChange::None => style(streak.to_string()),
    };
    println!("Streak:      {streak_line}");

    if !report.result.feedback.is_empty() {
        println!("\nFeedback:");
        for item in &report.result.feedback {
            println!("  • {item}");
        }
    }

    if report.completed_now {
        println!("\n{} Challenge completed", style("✓").green());
    }
    if let Some(next) = &report.unlocked {
        println!("{} Unlocked {next}", style("→").cyan());
    }
}
