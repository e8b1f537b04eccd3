//! Vessel page field extraction
//!
//! Vessel pages present their data as `<dl>` definition lists and two-cell
//! table rows. Extraction walks both, normalizes whitespace, drops the UI
//! artifacts that appear as labels, and applies a few renames so the output
//! keys are self-describing.

use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// Page text fragments that indicate the source has no record for this
/// identifier even when it responds 200
const MISSING_VESSEL_MARKERS: &[&str] = &[
    "vessel not found",
    "no vessel",
    "vessel details not available",
];

/// Labels that are site chrome rather than vessel data
const DROPPED_LABELS: &[&str] = &["Clear all", "Search", "Compare"];

struct Selectors {
    dl: Selector,
    dt: Selector,
    dd: Selector,
    row: Selector,
    cell: Selector,
    title: Selector,
}

fn selectors() -> &'static Selectors {
    static SELECTORS: OnceLock<Selectors> = OnceLock::new();
    SELECTORS.get_or_init(|| Selectors {
        dl: Selector::parse("dl").expect("selector literal"),
        dt: Selector::parse("dt").expect("selector literal"),
        dd: Selector::parse("dd").expect("selector literal"),
        row: Selector::parse("table tr").expect("selector literal"),
        cell: Selector::parse("td, th").expect("selector literal"),
        title: Selector::parse("h1").expect("selector literal"),
    })
}

/// Returns true if the page body is a soft 404 for a missing vessel
pub fn looks_like_missing_vessel(body: &str) -> bool {
    let lowered = body.to_lowercase();
    MISSING_VESSEL_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

/// Extracts vessel data fields from a page body
///
/// Pulls label/value pairs from definition lists and two-cell table rows,
/// and falls back to the `<h1>` heading for the vessel name. Returns an
/// empty map for a page with no recognizable structure; the caller decides
/// whether that means the vessel is missing.
pub fn extract_vessel_fields(body: &str) -> Map<String, Value> {
    let document = Html::parse_document(body);
    let sel = selectors();
    let mut fields = Map::new();

    // Definition lists: dt labels paired with dd values in document order
    for dl in document.select(&sel.dl) {
        let labels: Vec<String> = dl.select(&sel.dt).map(element_text).collect();
        let values: Vec<String> = dl.select(&sel.dd).map(element_text).collect();
        for (label, value) in labels.into_iter().zip(values) {
            insert_field(&mut fields, label, value);
        }
    }

    // Two-cell table rows double as label/value pairs
    for row in document.select(&sel.row) {
        let cells: Vec<String> = row.select(&sel.cell).map(element_text).collect();
        if let [label, value] = cells.as_slice() {
            insert_field(&mut fields, label.clone(), value.clone());
        }
    }

    // Page heading carries the vessel name when no labelled field does
    if !fields.contains_key("Vessel name") {
        if let Some(title) = document.select(&sel.title).map(element_text).next() {
            if !title.is_empty() {
                fields.insert("Vessel name".to_string(), Value::String(title));
            }
        }
    }

    fields
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn insert_field(fields: &mut Map<String, Value>, label: String, value: String) {
    if label.is_empty() || value.is_empty() {
        return;
    }
    if DROPPED_LABELS.contains(&label.as_str()) {
        return;
    }

    let key = rename_label(&label);
    // First occurrence wins; later duplicates are usually page chrome
    fields
        .entry(key)
        .or_insert_with(|| Value::String(value));
}

fn rename_label(label: &str) -> String {
    match label {
        "Name of the ship" => "Vessel name".to_string(),
        "Gross tonnage" => "Gross tonnage (tons)".to_string(),
        "Deadweight" => "Deadweight (tons)".to_string(),
        other => other.to_string(),
    }
}
