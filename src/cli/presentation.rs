//! Presentation: text and JSON formatting of rendered tree snapshots.

use crate::element::Element;
use crate::error::TreeError;
use crate::node::{GLYPH_CLASS, ITEM_CLASS, LABEL_CLASS, LINK_CLASS};
use crate::view::TREE_CLASS;

/// Indented outline, one line per rendered node.
///
/// The selected node is prefixed with `>`; expanded subtrees are indented
/// beneath their node.
pub fn format_tree_text(container: &Element, selected_class: &str) -> String {
    let mut lines = Vec::new();
    write_items(container, 0, selected_class, &mut lines);
    if lines.is_empty() {
        return "(empty tree)".to_string();
    }
    lines.join("\n")
}

fn write_items(list: &Element, depth: usize, selected_class: &str, lines: &mut Vec<String>) {
    for item in list.children().iter().filter(|c| c.has_class(ITEM_CLASS)) {
        let marker = if item.has_class(selected_class) { ">" } else { " " };
        lines.push(format!(
            "{}{}{}",
            marker,
            "  ".repeat(depth + 1),
            describe_label(item)
        ));
        for nested in item.children().iter().filter(|c| c.has_class(TREE_CLASS)) {
            write_items(nested, depth + 1, selected_class, lines);
        }
    }
}

fn describe_label(item: &Element) -> String {
    let Some(label) = item.children().iter().find(|c| c.has_class(LABEL_CLASS)) else {
        return item.text_content();
    };
    let mut glyph = "";
    let mut text = String::new();
    let mut link = None;
    for part in label.children() {
        if part.has_class(GLYPH_CLASS) {
            glyph = part.text().unwrap_or_default();
        } else if part.has_class(LINK_CLASS) {
            link = part.text();
        } else {
            text.push_str(part.text().unwrap_or_default());
        }
    }
    match link {
        Some(link) => format!("{} {} {}", glyph, text, link),
        None => format!("{} {}", glyph, text),
    }
}

pub fn format_tree_json(container: &Element) -> Result<String, TreeError> {
    serde_json::to_string_pretty(container).map_err(TreeError::from)
}
