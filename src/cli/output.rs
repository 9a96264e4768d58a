//! Rendering of analysis results in the selected output format

use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use tabled::{builder::Builder, settings::Style};

use crate::cli::OutputFormat;

/// Print `value` in a structured format, or delegate to the given renderers.
///
/// `markdown` produces the `--format md` document; `human` prints the
/// styled terminal summary used for `auto`.
pub fn emit<T, M, H>(value: &T, format: OutputFormat, markdown: M, human: H) -> Result<()>
where
    T: Serialize,
    M: FnOnce(&T) -> String,
    H: FnOnce(&T),
{
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(value).into_diagnostic()?;
            print!("{}", yaml);
        }
        OutputFormat::Md => print!("{}", markdown(value)),
        OutputFormat::Auto => human(value),
    }
    Ok(())
}

/// Markdown table from a header row and data rows
pub fn markdown_table<I, R>(headers: &[&str], rows: I) -> String
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = String>,
{
    let mut builder = Builder::default();
    builder.push_record(headers.iter().map(|h| h.to_string()));
    for row in rows {
        builder.push_record(row);
    }
    let mut table = builder.build();
    table.with(Style::markdown());
    format!("{}\n", table)
}

/// Two-column `Metric | Value` table
pub fn key_value_table(rows: &[(&str, String)]) -> String {
    markdown_table(
        &["Metric", "Value"],
        rows.iter().map(|(k, v)| [k.to_string(), v.clone()]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_table_layout() {
        let table = markdown_table(
            &["Category", "Per Part"],
            vec![
                vec!["Labor".to_string(), "$10.00".to_string()],
                vec!["Energy".to_string(), "$2.50".to_string()],
            ],
        );
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("Category"));
        assert!(lines[1].contains("---"));
        assert!(lines[3].contains("$2.50"));
    }

    #[test]
    fn test_key_value_table() {
        let table = key_value_table(&[("NPV", "$1.00".to_string())]);
        assert!(table.contains("| NPV"));
        assert!(table.contains("Metric"));
    }
}
