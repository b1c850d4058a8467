//! Output formatting: plain text, JSON, YAML.
//!
//! Renders data in the format selected by `--output`. Plain lists use
//! `tabled`, plain single items use a per-command detail view, structured
//! formats serialize the daemon types via serde.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};
use vpnlink_api::types::TunnelState;

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
    }
}

/// Tunnel state label, green when connected and red when blocked.
pub fn paint_state(state: &TunnelState, color: bool) -> String {
    let label = state.to_string();
    if !color {
        return label;
    }
    match state {
        TunnelState::Connected(_) => label.green().bold().to_string(),
        TunnelState::Connecting(_) | TunnelState::Disconnecting(_) => label.yellow().to_string(),
        TunnelState::Blocked(_) => label.red().bold().to_string(),
        TunnelState::Disconnected => label,
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list: a table in plain mode, the original data otherwise.
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
        OutputFormat::Plain => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        structured => render_structured(structured, data),
    }
}

/// Render a single item; plain mode uses `detail_fn`.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize + ?Sized,
{
    match format {
        OutputFormat::Plain => Ok(detail_fn(data)),
        structured => render_structured(structured, data),
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

/// Status line on stderr, respecting quiet mode.
pub fn note(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{message}");
    }
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_structured<T: serde::Serialize + ?Sized>(
    format: OutputFormat,
    data: &T,
) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::JsonCompact | OutputFormat::Plain => serde_json::to_string(data)?,
        OutputFormat::Yaml => serde_yaml::to_string(data)?.trim_end().to_owned(),
    })
}

/// One line per streamed item. Pretty JSON is compacted to stay line-oriented.
pub fn render_line<T: serde::Serialize + ?Sized>(
    format: OutputFormat,
    data: &T,
    plain_fn: impl Fn(&T) -> String,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Plain => Ok(plain_fn(data)),
        OutputFormat::Json | OutputFormat::JsonCompact => Ok(serde_json::to_string(data)?),
        OutputFormat::Yaml => Ok(format!("---\n{}", serde_yaml::to_string(data)?.trim_end())),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use serde::Serialize;

    #[derive(Serialize, Tabled)]
    struct Row {
        name: String,
        count: u32,
    }

    fn rows() -> Vec<Row> {
        vec![Row {
            name: "se-got".into(),
            count: 3,
        }]
    }

    #[test]
    fn plain_list_is_a_table() {
        let out = render_list(OutputFormat::Plain, &rows(), |r| Row {
            name: r.name.clone(),
            count: r.count,
        })
        .unwrap();
        assert!(out.contains("name"));
        assert!(out.contains("se-got"));
    }

    #[test]
    fn structured_formats_serialize_data() {
        let data = rows();
        let compact = render_single(OutputFormat::JsonCompact, &data, |_| String::new()).unwrap();
        assert_eq!(compact, r#"[{"name":"se-got","count":3}]"#);

        let yaml = render_single(OutputFormat::Yaml, &data, |_| String::new()).unwrap();
        assert_eq!(yaml, "- name: se-got\n  count: 3");
    }

    #[test]
    fn uncolored_state_is_its_label() {
        assert_eq!(paint_state(&TunnelState::Disconnected, true), "disconnected");
        assert_eq!(paint_state(&TunnelState::Connected(None), false), "connected");
    }
}
