use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use super::model::{
    de_id, ColumnResolver, GroupNode, GroupTotals, LeafRow, ReportNodes, RowShape,
};
use crate::error::{ReportError, Result};

/// A backend array is grouped when its first element carries a `level` tag.
pub fn is_grouped_data(values: &[Value]) -> bool {
    values
        .first()
        .and_then(Value::as_object)
        .is_some_and(|obj| obj.contains_key("level"))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGroup {
    level: String,
    #[serde(default, deserialize_with = "de_id")]
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    product_name: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    totals: GroupTotals,
    #[serde(default)]
    data: Option<Vec<Value>>,
}

/// Parse a backend array into a tree, keeping input order.
pub fn parse_nodes(values: Vec<Value>, shape: RowShape, report: &str) -> Result<ReportNodes> {
    let invalid = |source| ReportError::InvalidRow {
        report: report.to_string(),
        source,
    };

    if !is_grouped_data(&values) {
        let rows = values
            .into_iter()
            .map(|v| shape.parse(v))
            .collect::<serde_json::Result<Vec<_>>>()
            .map_err(invalid)?;
        return Ok(ReportNodes::Leaves(rows));
    }

    let mut groups = Vec::with_capacity(values.len());
    for value in values {
        let raw: RawGroup = serde_json::from_value(value).map_err(invalid)?;
        let name = raw.name.unwrap_or_else(|| raw.id.clone());
        groups.push(GroupNode {
            level: raw.level,
            id: raw.id,
            name,
            product_name: raw.product_name,
            city: raw.city,
            unit: raw.unit,
            totals: raw.totals,
            data: parse_nodes(raw.data.unwrap_or_default(), shape, report)?,
        });
    }
    Ok(ReportNodes::Groups(groups))
}

/// Which groups are currently open.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpansionState {
    expanded: HashSet<String>,
}

impl ExpansionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open every group in the tree.
    pub fn all(nodes: &ReportNodes) -> Self {
        let mut state = Self::new();
        state.expand_all(nodes);
        state
    }

    pub fn is_expanded(&self, key: &str) -> bool {
        self.expanded.contains(key)
    }

    /// Flip one group; siblings are untouched. Returns the new state of `key`.
    pub fn toggle(&mut self, key: &str) -> bool {
        if self.expanded.remove(key) {
            false
        } else {
            self.expanded.insert(key.to_string());
            true
        }
    }

    pub fn expand(&mut self, key: impl Into<String>) {
        self.expanded.insert(key.into());
    }

    pub fn expand_all(&mut self, nodes: &ReportNodes) {
        if let ReportNodes::Groups(groups) = nodes {
            for group in groups {
                self.expanded.insert(group.key());
                self.expand_all(&group.data);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.expanded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty()
    }
}

/// One visible line of a rendered report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DisplayRow<'a> {
    Group {
        depth: usize,
        key: String,
        heading: String,
        totals: &'a GroupTotals,
        expanded: bool,
    },
    Leaf {
        depth: usize,
        row: &'a LeafRow,
    },
}

impl DisplayRow<'_> {
    pub fn depth(&self) -> usize {
        match self {
            DisplayRow::Group { depth, .. } | DisplayRow::Leaf { depth, .. } => *depth,
        }
    }
}

/// Flatten a tree into visible rows: each group precedes its children, and
/// children show only under expanded groups.
pub fn flatten<'a>(nodes: &'a ReportNodes, state: &ExpansionState) -> Vec<DisplayRow<'a>> {
    let mut rows = Vec::new();
    flatten_into(nodes, state, 0, &mut rows);
    rows
}

fn flatten_into<'a>(
    nodes: &'a ReportNodes,
    state: &ExpansionState,
    depth: usize,
    out: &mut Vec<DisplayRow<'a>>,
) {
    match nodes {
        ReportNodes::Leaves(rows) => {
            out.extend(rows.iter().map(|row| DisplayRow::Leaf { depth, row }));
        }
        ReportNodes::Groups(groups) => {
            for group in groups {
                let key = group.key();
                let expanded = state.is_expanded(&key);
                out.push(DisplayRow::Group {
                    depth,
                    key,
                    heading: group.heading(),
                    totals: &group.totals,
                    expanded,
                });
                if expanded {
                    flatten_into(&group.data, state, depth + 1, out);
                }
            }
        }
    }
}

/// Render display rows as table cells for the given column keys. The first
/// cell carries the indent and, for groups, the toggle marker and heading.
pub fn table_cells(row: &DisplayRow<'_>, keys: &[&str]) -> Vec<String> {
    let indent = "  ".repeat(row.depth());
    match row {
        DisplayRow::Group {
            heading,
            totals,
            expanded,
            ..
        } => {
            let marker = if *expanded { "▾" } else { "▸" };
            keys.iter()
                .enumerate()
                .map(|(i, key)| match (i, *key) {
                    (0, _) => format!("{indent}{marker} {heading}"),
                    (_, "qty") => format_number(totals.total_quantity),
                    (_, "amount") => format!("{:.2}", totals.total_amount),
                    (_, "rate") => format!("{:.2}", totals.average_rate()),
                    _ => String::new(),
                })
                .collect()
        }
        DisplayRow::Leaf { row, .. } => keys
            .iter()
            .enumerate()
            .map(|(i, key)| {
                let value = row.cell(key).to_string();
                if i == 0 {
                    format!("{indent}{value}")
                } else {
                    value
                }
            })
            .collect(),
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}
