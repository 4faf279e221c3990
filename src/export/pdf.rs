use serde::Serialize;
use std::path::Path;
use std::process::Command;

use crate::error::{ReportError, Result};
use crate::export::ExcelExportConfig;
use crate::report::{flatten, table_cells, DisplayRow, ExpansionState, GroupTotals, ReportNodes};

/// Embedded Typst template for report tables
/// Uses a placeholder that gets replaced with the actual JSON file path
const REPORT_TEMPLATE: &str = r##"// Report Template
// Data is loaded from JSON file

#let data = json("DATA_JSON_PATH")

#set page(
  paper: "a4",
  flipped: data.headers.len() > 6,
  margin: (top: 0.6in, bottom: 0.6in, left: 0.5in, right: 0.5in),
)

#set text(font: "Helvetica", size: 9pt)

#grid(
  columns: (1fr, 1fr),
  align: (left, right),
  [
    #text(size: 16pt, weight: "bold")[#data.title]
    #if data.range != none [
      \ #text(fill: gray)[#data.range]
    ]
  ],
  [
    #text(size: 9pt, fill: gray)[Generated #data.generated_date]
  ]
)

#v(0.8em)

#table(
  columns: data.headers.len(),
  stroke: (x, y) => if y == 0 { (bottom: 1pt + black) } else { (bottom: 0.5pt + gray) },
  inset: 5pt,
  fill: (x, y) => if y == 0 { luma(240) } else { none },

  ..data.headers.map(h => [*#h*]),

  ..data.rows.map(row => if row.kind == "group" {
    (table.cell(colspan: data.headers.len(), fill: luma(230))[*#row.cells.at(0)*],)
  } else if row.kind == "subtotal" {
    row.cells.map(c => [*#c*])
  } else {
    row.cells
  }).flatten()
)

#if data.grand_total != none [
  #v(0.8em)
  #align(right)[
    #text(weight: "bold")[Grand Total: #data.currency_symbol#data.grand_total]
  ]
]
"##;

#[derive(Debug, Serialize, PartialEq)]
pub struct PdfRow {
    pub kind: &'static str,
    pub cells: Vec<String>,
}

/// Everything the Typst template reads.
#[derive(Debug, Serialize)]
pub struct PdfReport {
    pub title: String,
    pub range: Option<String>,
    pub generated_date: String,
    pub currency_symbol: String,
    pub headers: Vec<String>,
    pub rows: Vec<PdfRow>,
    pub grand_total: Option<String>,
}

impl PdfReport {
    /// Lay out a fully expanded report. Each group gets a banner row before its
    /// children and a subtotal row after them. Columns and the grand-total
    /// switch come from the same config the spreadsheet export uses.
    pub fn build(
        title: &str,
        range: Option<String>,
        config: &ExcelExportConfig,
        data: &ReportNodes,
        totals: Option<&GroupTotals>,
        currency_symbol: &str,
    ) -> Self {
        let headers = &config.headers;
        let keys: Vec<&str> = headers.iter().map(|h| h.key.as_str()).collect();
        let display = flatten(data, &ExpansionState::all(data));

        let mut rows = Vec::with_capacity(display.len());
        // groups still open at each depth, closed by subtotal rows
        let mut open: Vec<(usize, Vec<String>)> = Vec::new();
        for row in &display {
            while open.last().is_some_and(|(depth, _)| *depth >= row.depth()) {
                if let Some((_, cells)) = open.pop() {
                    rows.push(PdfRow { kind: "subtotal", cells });
                }
            }
            let cells = table_cells(row, &keys);
            match row {
                DisplayRow::Group { depth, heading, .. } => {
                    let mut subtotal = cells.clone();
                    if let Some(first) = subtotal.first_mut() {
                        *first = format!("{}Subtotal - {}", "  ".repeat(*depth), heading);
                    }
                    open.push((*depth, subtotal));
                    rows.push(PdfRow {
                        kind: "group",
                        cells: vec![format!("{}{}", "  ".repeat(*depth), heading)],
                    });
                }
                DisplayRow::Leaf { .. } => rows.push(PdfRow { kind: "leaf", cells }),
            }
        }
        while let Some((_, cells)) = open.pop() {
            rows.push(PdfRow { kind: "subtotal", cells });
        }

        Self {
            title: title.to_string(),
            range,
            generated_date: chrono::Local::now().format("%B %d, %Y").to_string(),
            currency_symbol: currency_symbol.to_string(),
            headers: headers.iter().map(|h| h.label.clone()).collect(),
            rows,
            grand_total: totals
                .filter(|_| config.shows_totals())
                .map(|t| format!("{:.2}", t.total_amount)),
        }
    }
}

/// Generate a report PDF using Typst CLI
pub fn generate_report_pdf(report: &PdfReport, output_path: &Path) -> Result<()> {
    // Check if typst is available
    if Command::new("typst").arg("--version").output().is_err() {
        return Err(ReportError::TypstNotFound);
    }

    let temp_dir = std::env::temp_dir().join("dairy-reports");
    std::fs::create_dir_all(&temp_dir)?;

    let json_data =
        serde_json::to_string(report).map_err(|e| ReportError::PdfGeneration(e.to_string()))?;
    let json_path = temp_dir.join("report_data.json");
    std::fs::write(&json_path, &json_data)?;

    let template_content = REPORT_TEMPLATE.replace("DATA_JSON_PATH", "report_data.json");
    let template_path = temp_dir.join("report.typ");
    std::fs::write(&template_path, &template_content)?;

    let output = Command::new("typst")
        .arg("compile")
        .arg("--root")
        .arg(&temp_dir)
        .arg(&template_path)
        .arg(output_path)
        .output()?;

    let _ = std::fs::remove_file(&template_path);
    let _ = std::fs::remove_file(&json_path);

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ReportError::PdfGeneration(stderr.to_string()));
    }

    tracing::info!(path = %output_path.display(), "wrote pdf");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{ExcelHeader, GroupingConfig};
    use crate::report::{parse_nodes, RowShape};
    use serde_json::{json, Value};

    fn sample_tree() -> ReportNodes {
        let Value::Array(values) = json!([
            {
                "level": "agency", "id": 1, "name": "North",
                "totals": {"totalQuantity": 3, "totalAmount": 150},
                "data": [
                    {
                        "level": "area", "id": 7, "name": "Kothrud",
                        "totals": {"totalQuantity": 3, "totalAmount": 150},
                        "data": [{"id": 1, "customerName": "Asha", "quantity": 3, "amount": 150}]
                    }
                ]
            },
            {"level": "agency", "id": 2, "name": "South", "totals": {}, "data": []}
        ]) else {
            unreachable!()
        };
        parse_nodes(values, RowShape::Delivery, "deliveries").unwrap()
    }

    fn config(headers: Vec<ExcelHeader>, show_totals: bool) -> ExcelExportConfig {
        ExcelExportConfig {
            file_name: "deliveries.pdf".into(),
            sheet_name: "Deliveries".into(),
            title: None,
            headers,
            grouping: Some(GroupingConfig { show_totals }),
        }
    }

    fn delivery_headers() -> Vec<ExcelHeader> {
        vec![
            ExcelHeader::new("customer", "Customer"),
            ExcelHeader::new("qty", "Qty"),
            ExcelHeader::new("amount", "Amount"),
        ]
    }

    #[test]
    fn groups_are_closed_by_subtotals_in_order() {
        let data = sample_tree();
        let cfg = config(delivery_headers(), true);
        let report = PdfReport::build("Deliveries", None, &cfg, &data, None, "₹");
        let kinds: Vec<_> = report.rows.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec!["group", "group", "leaf", "subtotal", "subtotal", "group", "subtotal"]
        );
        assert_eq!(report.rows[3].cells[0], "  Subtotal - Area: Kothrud");
        assert_eq!(report.rows[3].cells[2], "150.00");
        assert_eq!(report.headers, vec!["Customer", "Qty", "Amount"]);
        assert!(report.grand_total.is_none());
    }

    #[test]
    fn grand_total_follows_show_totals() {
        let data = sample_tree();
        let totals = GroupTotals {
            total_quantity: 3.0,
            total_amount: 150.0,
            item_count: 1,
        };

        let shown = config(delivery_headers(), true);
        let report = PdfReport::build("Deliveries", None, &shown, &data, Some(&totals), "₹");
        assert_eq!(report.grand_total.as_deref(), Some("150.00"));

        let hidden = config(delivery_headers(), false);
        let report = PdfReport::build("Deliveries", None, &hidden, &data, Some(&totals), "₹");
        assert!(report.grand_total.is_none());
    }

    #[test]
    fn no_columns_still_lays_out_groups() {
        let data = sample_tree();
        let cfg = config(Vec::new(), true);
        let report = PdfReport::build("Deliveries", None, &cfg, &data, None, "₹");
        assert!(report.headers.is_empty());
        assert_eq!(report.rows.iter().filter(|r| r.kind == "subtotal").count(), 3);
        assert!(report
            .rows
            .iter()
            .filter(|r| r.kind == "subtotal")
            .all(|r| r.cells.is_empty()));
    }
}
