//! Output formatting for CLI commands

use comfy_table::{Cell, Color, ContentArrangement, Table};
use serde::Serialize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text and tables
    #[default]
    Text,
    /// JSON output for automation
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Pretty-printed JSON for any serializable result.
pub fn to_json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Table with a cyan header row.
pub fn table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut table = Table::new();
    table
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|h| Cell::new(h).fg(Color::Cyan)));
    for row in rows {
        table.add_row(row);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_renders_every_row() {
        let rendered = table(
            &["solver", "status"],
            vec![
                vec!["glop".into(), "available".into()],
                vec!["gurobi".into(), "unavailable".into()],
            ],
        )
        .to_string();
        assert!(rendered.contains("glop"));
        assert!(rendered.contains("gurobi"));
        assert!(rendered.contains("status"));
    }

    #[test]
    fn json_is_pretty() {
        let json = to_json(&serde_json::json!({"a": 1})).unwrap();
        assert!(json.contains('\n'));
    }
}
