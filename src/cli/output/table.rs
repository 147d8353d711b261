//! Table output formatting for CLI commands
//!
//! Renders the challenge catalog joined with progress using comfy-table.
//! Status cells are colored unless `NO_COLOR` is set or the terminal is dumb.

use comfy_table::{presets, Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use std::env;

use crate::domain::models::{ChallengeCatalog, ChallengeProgress, ChallengeStatus, ProgressMap};

/// Table formatter for CLI output
pub struct TableFormatter {
    /// Whether to use colors in output
    use_colors: bool,
    /// Maximum width for tables (None = auto)
    max_width: Option<u16>,
}

impl TableFormatter {
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
            max_width: None,
        }
    }

    pub fn with_config(use_colors: bool, max_width: Option<u16>) -> Self {
        Self {
            use_colors,
            max_width,
        }
    }

    /// Format the catalog in play order with each challenge's progress
    pub fn format_challenges(&self, catalog: &ChallengeCatalog, progress: &ProgressMap) -> String {
        let mut table = self.create_base_table();

        table.set_header(vec![
            Cell::new("#").add_attribute(Attribute::Bold),
            Cell::new("ID").add_attribute(Attribute::Bold),
            Cell::new("Name").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
            Cell::new("Streak").add_attribute(Attribute::Bold),
            Cell::new("Last score").add_attribute(Attribute::Bold),
        ]);

        for (index, challenge) in catalog.iter().enumerate() {
            let entry = progress
                .get(&challenge.id)
                .cloned()
                .unwrap_or_else(ChallengeProgress::locked);

            table.add_row(vec![
                Cell::new(index + 1).set_alignment(CellAlignment::Right),
                Cell::new(challenge.id.as_str()),
                Cell::new(truncate_text(&challenge.name, 40)),
                self.status_cell(entry.status),
                Cell::new(entry.streak).set_alignment(CellAlignment::Right),
                Cell::new(format_score(entry.previous_similarity_score))
                    .set_alignment(CellAlignment::Right),
            ]);
        }

        table.to_string()
    }

    fn status_cell(&self, status: ChallengeStatus) -> Cell {
        if self.use_colors {
            Cell::new(status).fg(status_color(status))
        } else {
            Cell::new(format!("{} {}", status_icon(status), status))
        }
    }

    fn create_base_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        if let Some(width) = self.max_width {
            table.set_width(width);
        }

        table
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if color output is supported
fn supports_color() -> bool {
    if env::var_os("NO_COLOR").is_some() {
        return false;
    }

    !matches!(env::var("TERM").as_deref(), Ok("dumb"))
}

fn status_color(status: ChallengeStatus) -> Color {
    match status {
        ChallengeStatus::Completed => Color::Green,
        ChallengeStatus::Unlocked => Color::Yellow,
        ChallengeStatus::Locked => Color::DarkGrey,
    }
}

fn status_icon(status: ChallengeStatus) -> &'static str {
    match status {
        ChallengeStatus::Completed => "✓",
        ChallengeStatus::Unlocked => "●",
        ChallengeStatus::Locked => "⊘",
    }
}

/// `-` until a challenge has been scored at least once
pub fn format_score(score: f64) -> String {
    if score > 0.0 {
        format!("{score:.0}")
    } else {
        "-".to_string()
    }
}

fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
