//! Structural context: table/grid membership and enclosing modal dialogs.

use crate::config::EngineConfig;
use crate::node::DomNode;
use serde::{Deserialize, Serialize};

/// Table membership of an element sitting inside a `<td>`/`<th>`.
///
/// Row and column ordinals are 0-based as exposed by the DOM, not
/// user-facing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableContext {
    pub row_index: usize,
    pub col_index: usize,
    pub table_id: String,
    pub header_text: String,
}

/// All `<tr>` descendants of a table in document order, which matches the
/// DOM `rowIndex` numbering (thead rows first).
pub(crate) fn table_rows(table: &DomNode) -> Vec<DomNode> {
    table
        .descendants()
        .into_iter()
        .filter(|n| n.tag() == "tr")
        .collect()
}

fn row_cells(row: &DomNode) -> Vec<DomNode> {
    row.element_children()
        .into_iter()
        .filter(|c| matches!(c.tag().as_str(), "td" | "th"))
        .collect()
}

/// Stable identifier for a table: id, else class, else ordinal among all
/// tables in the scope.
fn table_identifier(table: &DomNode, scope: &DomNode) -> String {
    if let Some(id) = table.id() {
        return id;
    }
    let class = table.class_attr();
    if !class.is_empty() {
        return class;
    }
    let ordinal = scope
        .descendants()
        .into_iter()
        .filter(|n| n.tag() == "table")
        .position(|n| n == *table)
        .unwrap_or(0);
    format!("table_{ordinal}")
}

/// Header text for a column: `<thead>` first row by column index, falling
/// back to the table's literal first row when that differs from the
/// element's own row.
pub(crate) fn header_text_for_column(table: &DomNode, own_row: &DomNode, col: usize) -> String {
    if let Some(thead) = table
        .descendants()
        .into_iter()
        .find(|n| n.tag() == "thead")
    {
        if let Some(header_row) = thead.descendants().into_iter().find(|n| n.tag() == "tr") {
            if let Some(cell) = row_cells(&header_row).get(col) {
                let text = cell.text_content();
                if !text.is_empty() {
                    return text;
                }
            }
        }
    }
    if let Some(first_row) = table_rows(table).first() {
        if first_row != own_row {
            if let Some(cell) = row_cells(first_row).get(col) {
                return cell.text_content();
            }
        }
    }
    String::new()
}

/// Table membership for `node`, or `None` when it is not inside a table
/// cell.
pub fn table_context(node: &DomNode, scope: &DomNode) -> Option<TableContext> {
    let cell = node.closest_tag(&["td", "th"])?;
    let row = cell.closest_tag(&["tr"])?;
    let table = cell.closest_tag(&["table"])?;

    let row_index = table_rows(&table).iter().position(|r| *r == row)?;
    let col_index = row_cells(&row).iter().position(|c| *c == cell)?;

    let header_text = header_text_for_column(&table, &row, col_index);

    Some(TableContext {
        row_index,
        col_index,
        table_id: table_identifier(&table, scope),
        header_text,
    })
}

/// Title of the nearest enclosing modal/dialog container, resolved through
/// the ordered convention list. Containers without a recognizable title
/// element report the framework tag instead.
pub fn dialog_context(node: &DomNode, config: &EngineConfig) -> Option<String> {
    for convention in &config.dialog_conventions {
        if let Some(container) = node.closest(|n| n.has_class_fragment(&convention.container)) {
            let title = container
                .descendants()
                .into_iter()
                .find(|d| d.has_class_fragment(&convention.title))
                .map(|d| d.text_content())
                .filter(|t| !t.is_empty());
            return Some(title.unwrap_or_else(|| convention.framework.clone()));
        }
    }
    None
}
