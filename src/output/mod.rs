use itertools::Itertools;
use serde::Serialize;

use crate::catalog::Record;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Xml,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "txt" => Some(Self::Text),
            "json" => Some(Self::Json),
            "xml" => Some(Self::Xml),
            _ => None,
        }
    }
}

pub fn infer_format_from_path(path: &str) -> Option<OutputFormat> {
    let lower = path.trim().to_lowercase();
    if lower.ends_with(".json") {
        return Some(OutputFormat::Json);
    }
    if lower.ends_with(".xml") {
        return Some(OutputFormat::Xml);
    }
    if lower.ends_with(".txt") {
        return Some(OutputFormat::Text);
    }
    None
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputRecord {
    pub id: u64,
    pub selected: bool,
    pub title: String,
    pub place_of_origin: String,
    pub artist_display: String,
    pub inscriptions: String,
    pub date_start: Option<i64>,
    pub date_end: Option<i64>,
}

pub fn build_records(records: &[Record], is_selected: impl Fn(u64) -> bool) -> Vec<OutputRecord> {
    records
        .iter()
        .map(|r| OutputRecord {
            id: r.id,
            selected: is_selected(r.id),
            title: r.title.clone(),
            place_of_origin: r.place_of_origin.clone(),
            artist_display: r.artist_display.clone(),
            inscriptions: r.inscriptions.clone(),
            date_start: r.date_start,
            date_end: r.date_end,
        })
        .collect()
}

pub fn render(format: OutputFormat, records: &[OutputRecord]) -> Vec<u8> {
    match format {
        OutputFormat::Text => render_text(records),
        OutputFormat::Json => render_json(records),
        OutputFormat::Xml => render_xml(records),
    }
}

pub fn render_text(records: &[OutputRecord]) -> Vec<u8> {
    let mut out = String::new();
    for r in records {
        out.push_str(&format!("{}\t{}\n", r.id, single_line(&r.title)));
    }
    out.into_bytes()
}

pub fn render_json(records: &[OutputRecord]) -> Vec<u8> {
    serde_json::to_vec_pretty(records).unwrap_or_else(|_| b"[]\n".to_vec())
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn optional_year(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub fn render_xml(records: &[OutputRecord]) -> Vec<u8> {
    let mut out = String::new();
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    out.push('\n');
    out.push_str("<artworks>\n");
    for r in records {
        out.push_str(&format!(
            "  <artwork id=\"{}\" selected=\"{}\">\n",
            r.id, r.selected
        ));
        out.push_str(&format!("    <title>{}</title>\n", escape_xml(&r.title)));
        out.push_str(&format!(
            "    <place_of_origin>{}</place_of_origin>\n",
            escape_xml(&r.place_of_origin)
        ));
        out.push_str(&format!(
            "    <artist_display>{}</artist_display>\n",
            escape_xml(&r.artist_display)
        ));
        out.push_str(&format!(
            "    <inscriptions>{}</inscriptions>\n",
            escape_xml(&r.inscriptions)
        ));
        out.push_str(&format!(
            "    <date_start>{}</date_start>\n",
            optional_year(r.date_start)
        ));
        out.push_str(&format!(
            "    <date_end>{}</date_end>\n",
            optional_year(r.date_end)
        ));
        out.push_str("  </artwork>\n");
    }
    out.push_str("</artworks>\n");
    out.into_bytes()
}

const COLUMNS: [(&str, usize); 6] = [
    ("Title", 32),
    ("Origin", 14),
    ("Artist", 24),
    ("Inscriptions", 18),
    ("Start Date", 10),
    ("End Date", 10),
];

fn single_line(value: &str) -> String {
    value.split_whitespace().join(" ")
}

fn fit(value: &str, width: usize) -> String {
    let value = single_line(value);
    if value.chars().count() <= width {
        return format!("{value:<width$}");
    }
    let cut: String = value.chars().take(width.saturating_sub(1)).collect();
    format!("{cut}…")
}

/// Fixed-width table with a checkbox column, one line per record.
pub fn render_table(records: &[Record], is_selected: impl Fn(u64) -> bool) -> String {
    let header = COLUMNS
        .iter()
        .map(|(name, width)| fit(name, *width))
        .join(" | ");
    let rule = COLUMNS.iter().map(|(_, width)| "-".repeat(*width)).join("-+-");

    let mut out = format!("    | {:>8} | {header}\n----+-{}-+-{rule}\n", "id", "-".repeat(8));
    for r in records {
        let check = if is_selected(r.id) { "[x]" } else { "[ ]" };
        let cells = [
            r.title.clone(),
            r.place_of_origin.clone(),
            r.artist_display.clone(),
            r.inscriptions.clone(),
            optional_year(r.date_start),
            optional_year(r.date_end),
        ];
        let row = cells
            .iter()
            .zip(COLUMNS.iter())
            .map(|(cell, (_, width))| fit(cell, *width))
            .join(" | ");
        out.push_str(&format!("{check} | {:>8} | {row}\n", r.id));
    }
    out
}
