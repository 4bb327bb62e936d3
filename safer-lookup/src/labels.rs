//! Label-driven value lookup over rendered HTML tables.
//!
//! A label lives in a `td` or `th` cell; its value is the neighbouring `td`.
//! How a cell's text is compared to a label is the only thing strategies
//! decide, so swapping substring matching for exact matching never touches
//! the table walk or the orchestrator.
use safer_config::LabelMatch;
use scraper::{ElementRef, Selector};

/// Finds the value cell that belongs to a label.
pub trait LabelLookup: Send + Sync {
    /// Whether the text of a label cell matches `label` (given in lowercase).
    fn matches(&self, cell_text: &str, label: &str) -> bool;

    /// Value next to the first cell under `scope` whose text matches `label`.
    ///
    /// `Some("")` means the label was found with a blank value; `None` means
    /// no matching label.
    fn find_value_by_label(&self, label: &str, scope: ElementRef<'_>) -> Option<String> {
        find_in_tables(self, label, scope)
    }
}

/// Case-insensitive substring match.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringLabelLookup;

impl LabelLookup for SubstringLabelLookup {
    fn matches(&self, cell_text: &str, label: &str) -> bool {
        cell_text.to_lowercase().contains(label)
    }
}

/// Case-insensitive whole-text match, ignoring a trailing colon.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactLabelLookup;

impl LabelLookup for ExactLabelLookup {
    fn matches(&self, cell_text: &str, label: &str) -> bool {
        cell_text.trim().trim_end_matches(':').trim().to_lowercase() == label
    }
}

/// Strategy selected by configuration.
pub fn label_lookup_for(mode: LabelMatch) -> Box<dyn LabelLookup> {
    match mode {
        LabelMatch::Substring => Box::new(SubstringLabelLookup),
        LabelMatch::Exact => Box::new(ExactLabelLookup),
    }
}

fn find_in_tables<L: LabelLookup + ?Sized>(
    lookup: &L,
    label: &str,
    scope: ElementRef<'_>,
) -> Option<String> {
    let label = label.to_lowercase();

    if let Ok(td) = Selector::parse("td") {
        for cell in scope.select(&td) {
            if !lookup.matches(&own_text(cell), &label) {
                continue;
            }
            let value = cell
                .next_siblings()
                .filter_map(ElementRef::wrap)
                .find(|sibling| sibling.value().name() == "td");
            if let Some(value) = value {
                return Some(rendered_text(value));
            }
        }
    }

    if let Ok(th) = Selector::parse("th") {
        for header in scope.select(&th) {
            if !lookup.matches(&own_text(header), &label) {
                continue;
            }
            let value = header
                .parent()
                .and_then(ElementRef::wrap)
                .and_then(|row| {
                    row.children()
                        .filter_map(ElementRef::wrap)
                        .find(|cell| cell.value().name() == "td")
                });
            if let Some(value) = value {
                return Some(rendered_text(value));
            }
        }
    }

    None
}

/// Text of a cell without descending into nested tables, so a layout cell
/// wrapping a whole inner table never reads as a label.
fn own_text(cell: ElementRef<'_>) -> String {
    fn collect(element: ElementRef<'_>, out: &mut String) {
        for child in element.children() {
            if let Some(text) = child.value().as_text() {
                out.push_str(text);
            } else if let Some(child) = ElementRef::wrap(child) {
                if child.value().name() != "table" {
                    collect(child, out);
                }
            }
        }
    }

    let mut out = String::new();
    collect(cell, &mut out);
    collapse_whitespace(&out)
}

fn rendered_text(cell: ElementRef<'_>) -> String {
    collapse_whitespace(&cell.text().collect::<String>())
}

fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
