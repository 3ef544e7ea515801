//! Text rendering of records and form kinds for the CLI.

use serde_json::Value;

use crate::error::Result;
use crate::forms::FormRegistry;
use crate::record::FormRecord;

use super::OutputFormat;

const TABLE_HEADERS: [&str; 5] = ["ID", "FORM NUMBER", "SUBMITTED BY", "DATE", "STATUS"];

/// Render a single record.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render_record(record: &FormRecord, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(record)?),
        OutputFormat::Table => render_records(std::slice::from_ref(record), format),
        OutputFormat::Plain => {
            let mut lines = vec![
                format!("id:            {}", record.id),
                format!("formNumber:    {}", record.form_number),
                format!("submittedBy:   {}", record.submitted_by),
                format!("submittedDate: {}", record.submitted_date),
                format!("status:        {}", record.status),
                "fields:".to_string(),
            ];
            lines.extend(
                record
                    .fields
                    .iter()
                    .map(|(key, value)| format!("  {key}: {}", display_value(value))),
            );
            Ok(lines.join("\n"))
        }
    }
}

/// Render a listing.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render_records(records: &[FormRecord], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(records)?),
        OutputFormat::Plain => Ok(records
            .iter()
            .map(|record| row(record).join("\t"))
            .collect::<Vec<_>>()
            .join("\n")),
        OutputFormat::Table => {
            if records.is_empty() {
                return Ok("No records found.".to_string());
            }

            let rows: Vec<[String; 5]> = records.iter().map(row).collect();
            let mut widths = TABLE_HEADERS.map(str::len);
            for cells in &rows {
                for (width, cell) in widths.iter_mut().zip(cells) {
                    *width = (*width).max(cell.chars().count());
                }
            }

            let header = TABLE_HEADERS.map(str::to_string);
            let lines: Vec<String> = std::iter::once(&header)
                .chain(&rows)
                .map(|cells| {
                    cells
                        .iter()
                        .zip(widths)
                        .map(|(cell, width)| format!("{cell:<width$}"))
                        .collect::<Vec<_>>()
                        .join("  ")
                        .trim_end()
                        .to_string()
                })
                .collect();
            Ok(lines.join("\n"))
        }
    }
}

/// Render the registered form kinds.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render_kinds(registry: &FormRegistry, json: bool) -> Result<String> {
    if json {
        let schemas: Vec<_> = registry.iter().collect();
        return Ok(serde_json::to_string_pretty(&schemas)?);
    }

    let mut lines = Vec::new();
    for schema in registry.iter() {
        lines.push(format!("{} ({})", schema.name, schema.title));
        for field in &schema.fields {
            let necessity = if field.required { "required" } else { "optional" };
            lines.push(format!("  {:<24} {:<6} {necessity}", field.name, field.field_type));
        }
    }
    Ok(lines.join("\n"))
}

fn row(record: &FormRecord) -> [String; 5] {
    [
        record.id.to_string(),
        record.form_number.clone(),
        record.submitted_by.clone(),
        record.submitted_date.to_string(),
        record.status.to_string(),
    ]
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
