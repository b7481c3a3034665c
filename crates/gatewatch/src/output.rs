//! Output formatting: table, JSON, YAML.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde.

use std::io::{self, Write};

use serde_json::Value;
use tabled::{Table, Tabled, settings::Style};

use gatewatch_core::{Payload, PlatformEvent, StateSnapshot};

use crate::cli::OutputFormat;
use crate::error::CliError;

// ── Rows ─────────────────────────────────────────────────────────────

#[derive(Tabled)]
pub struct SnapshotRow {
    #[tabled(rename = "Entity")]
    pub entity: String,
    #[tabled(rename = "State")]
    pub state: String,
    #[tabled(rename = "Attributes")]
    pub attributes: String,
}

impl From<&StateSnapshot> for SnapshotRow {
    fn from(snapshot: &StateSnapshot) -> Self {
        Self {
            entity: snapshot.entity_id.clone(),
            state: snapshot.state_text(),
            attributes: attribute_summary(&snapshot.attributes),
        }
    }
}

/// `key=value` pairs, one per line, strings unquoted.
fn attribute_summary(attributes: &Payload) -> String {
    attributes
        .iter()
        .map(|(key, value)| match value {
            Value::String(s) => format!("{key}={s}"),
            Value::Null => format!("{key}=-"),
            other => format!("{key}={other}"),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => Ok(serde_json::to_string_pretty(data)?),
        OutputFormat::JsonCompact => Ok(serde_json::to_string(data)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(data)?),
    }
}

/// Render a single item; table mode uses the pre-formatted `detail`.
pub fn render_single<T>(format: OutputFormat, data: &T, detail: &str) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => Ok(detail.to_owned()),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(data)?),
        OutputFormat::JsonCompact => Ok(serde_json::to_string(data)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(data)?),
    }
}

// ── Follow stream ────────────────────────────────────────────────────

/// One line per published snapshot while following. Structured formats
/// stay line-delimited so the stream can be piped.
pub fn render_snapshot_line(
    format: OutputFormat,
    snapshot: &StateSnapshot,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => Ok(format!(
            "{:<40} {}",
            snapshot.entity_id,
            snapshot.state_text()
        )),
        OutputFormat::Json | OutputFormat::JsonCompact => Ok(serde_json::to_string(snapshot)?),
        OutputFormat::Yaml => Ok(format!("---\n{}", serde_yaml::to_string(snapshot)?)),
    }
}

pub fn render_event_line(format: OutputFormat, event: &PlatformEvent) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => {
            let PlatformEvent::Click {
                entity_id,
                click_type,
            } = event;
            Ok(format!("{:<40} {} ({click_type})", entity_id, event.name()))
        }
        OutputFormat::Json | OutputFormat::JsonCompact => Ok(serde_json::to_string(event)?),
        OutputFormat::Yaml => Ok(format!("---\n{}", serde_yaml::to_string(event)?)),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}
