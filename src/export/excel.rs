use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::report::{CellValue, ColumnResolver, GroupNode, GroupTotals, LeafRow, ReportNodes};

/// Width used for headers that don't set one.
pub const DEFAULT_COLUMN_WIDTH: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    Center,
    Right,
}

impl From<Align> for FormatAlign {
    fn from(align: Align) -> Self {
        match align {
            Align::Left => FormatAlign::Left,
            Align::Center => FormatAlign::Center,
            Align::Right => FormatAlign::Right,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ExcelHeader {
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub align: Option<Align>,
}

impl ExcelHeader {
    pub fn new(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            width: None,
            align: None,
        }
    }

    pub fn width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = Some(align);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct GroupingConfig {
    pub show_totals: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ExcelExportConfig {
    pub file_name: String,
    pub sheet_name: String,
    #[serde(default)]
    pub title: Option<String>,
    pub headers: Vec<ExcelHeader>,
    #[serde(default)]
    pub grouping: Option<GroupingConfig>,
}

impl ExcelExportConfig {
    /// Grand totals are written only when grouping asks for them.
    pub fn shows_totals(&self) -> bool {
        self.grouping.is_some_and(|g| g.show_totals)
    }
}

/// Fill colour of a group header row.
fn level_color(level: &str) -> Color {
    match level {
        "agency" => Color::RGB(0xD9E1F2),
        "area" => Color::RGB(0xE2EFDA),
        "variant" => Color::RGB(0xFFF2CC),
        "status" => Color::RGB(0xFCE4D6),
        "vendor" => Color::RGB(0xDDEBF7),
        "depot" => Color::RGB(0xEDE2F6),
        "product" => Color::RGB(0xFFE699),
        _ => Color::RGB(0xEDEDED),
    }
}

/// Which group total a subtotal column shows.
fn subtotal_value(key: &str, totals: &GroupTotals) -> Option<f64> {
    match key {
        "qty" => Some(totals.total_quantity),
        "amount" => Some(totals.total_amount),
        "rate" => Some(totals.average_rate()),
        _ => None,
    }
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

struct Formats {
    title: Format,
    header: Format,
    subtotal: Format,
    subtotal_number: Format,
    grand_total: Format,
    grand_total_number: Format,
}

impl Formats {
    fn new() -> Self {
        let subtotal = Format::new()
            .set_bold()
            .set_background_color(Color::RGB(0xF2F2F2))
            .set_border(FormatBorder::Thin);
        let grand_total = Format::new()
            .set_bold()
            .set_font_color(Color::White)
            .set_background_color(Color::RGB(0x305496))
            .set_border(FormatBorder::Thin);
        Self {
            title: Format::new()
                .set_bold()
                .set_font_size(14)
                .set_align(FormatAlign::Center),
            header: Format::new()
                .set_bold()
                .set_font_color(Color::White)
                .set_background_color(Color::RGB(0x4472C4))
                .set_align(FormatAlign::Center)
                .set_border(FormatBorder::Thin),
            subtotal_number: subtotal
                .clone()
                .set_num_format("#,##0.00")
                .set_align(FormatAlign::Right),
            subtotal,
            grand_total_number: grand_total
                .clone()
                .set_num_format("#,##0.00")
                .set_align(FormatAlign::Right),
            grand_total,
        }
    }

    fn group(level: &str) -> Format {
        Format::new()
            .set_bold()
            .set_background_color(level_color(level))
            .set_border(FormatBorder::Thin)
    }

    fn cell(header: &ExcelHeader, numeric: bool) -> Format {
        let default = if numeric { Align::Right } else { Align::Left };
        let format = Format::new()
            .set_border(FormatBorder::Thin)
            .set_align(header.align.unwrap_or(default).into());
        if numeric {
            format.set_num_format("#,##0.##")
        } else {
            format
        }
    }
}

/// One worksheet row, laid out but not yet formatted.
#[derive(Debug, Clone, PartialEq)]
enum SheetRow {
    Title(String),
    Header,
    /// Merged, level-coloured group banner.
    Group { level: String, heading: String },
    Leaf(Vec<CellValue>),
    /// Label in the first column, then one slot per remaining column.
    Totals {
        label: String,
        values: Vec<Option<f64>>,
        grand: bool,
    },
    Blank,
}

/// Lay out the whole sheet: title, header, then flat rows or group blocks
/// (banner, children, subtotal, blank line), then the optional grand total.
fn layout(
    config: &ExcelExportConfig,
    data: &ReportNodes,
    totals: Option<&GroupTotals>,
) -> Vec<SheetRow> {
    let title = config
        .title
        .clone()
        .unwrap_or_else(|| config.sheet_name.clone());
    let mut rows = vec![SheetRow::Title(title), SheetRow::Header];
    push_nodes(&mut rows, &config.headers, data, 0);
    if let Some(totals) = totals.filter(|_| config.shows_totals()) {
        rows.push(totals_row("Grand Total".to_string(), &config.headers, totals, true));
    }
    rows
}

fn push_nodes(rows: &mut Vec<SheetRow>, headers: &[ExcelHeader], nodes: &ReportNodes, depth: usize) {
    match nodes {
        ReportNodes::Leaves(leaves) => {
            rows.extend(leaves.iter().map(|leaf| leaf_row(headers, leaf, depth)));
        }
        ReportNodes::Groups(groups) => {
            for group in groups {
                push_group(rows, headers, group, depth);
            }
        }
    }
}

fn push_group(rows: &mut Vec<SheetRow>, headers: &[ExcelHeader], group: &GroupNode, depth: usize) {
    rows.push(SheetRow::Group {
        level: group.level.clone(),
        heading: format!("{}{}", indent(depth), group.heading()),
    });
    push_nodes(rows, headers, &group.data, depth + 1);
    let label = format!("{}Subtotal - {}", indent(depth), group.name);
    rows.push(totals_row(label, headers, &group.totals, false));
    rows.push(SheetRow::Blank);
}

/// Nested rows carry their indent in the first cell, which is then text.
fn leaf_row(headers: &[ExcelHeader], leaf: &LeafRow, depth: usize) -> SheetRow {
    SheetRow::Leaf(
        headers
            .iter()
            .enumerate()
            .map(|(col, header)| {
                let value = leaf.cell(&header.key);
                if col == 0 && depth > 0 {
                    CellValue::Text(format!("{}{}", indent(depth), value))
                } else {
                    value
                }
            })
            .collect(),
    )
}

fn totals_row(label: String, headers: &[ExcelHeader], totals: &GroupTotals, grand: bool) -> SheetRow {
    let values = headers
        .iter()
        .enumerate()
        .map(|(col, header)| {
            if col == 0 {
                None
            } else {
                subtotal_value(&header.key, totals)
            }
        })
        .collect();
    SheetRow::Totals {
        label,
        values,
        grand,
    }
}

/// Writes report data into a styled workbook.
pub struct ExcelExporter<'a> {
    config: &'a ExcelExportConfig,
    default_width: f64,
}

impl<'a> ExcelExporter<'a> {
    pub fn new(config: &'a ExcelExportConfig) -> Self {
        Self {
            config,
            default_width: DEFAULT_COLUMN_WIDTH,
        }
    }

    pub fn default_width(mut self, width: f64) -> Self {
        self.default_width = width;
        self
    }

    /// Write the workbook to `path`. Empty data is not checked here.
    pub fn export(
        &self,
        data: &ReportNodes,
        totals: Option<&GroupTotals>,
        path: &Path,
    ) -> Result<()> {
        let mut workbook = self.build(data, totals)?;
        workbook.save(path)?;
        tracing::info!(path = %path.display(), "wrote spreadsheet");
        Ok(())
    }

    pub fn to_buffer(&self, data: &ReportNodes, totals: Option<&GroupTotals>) -> Result<Vec<u8>> {
        let mut workbook = self.build(data, totals)?;
        Ok(workbook.save_to_buffer()?)
    }

    fn build(&self, data: &ReportNodes, totals: Option<&GroupTotals>) -> Result<Workbook> {
        let rows = layout(self.config, data, totals);

        let mut workbook = Workbook::new();
        let formats = Formats::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&self.config.sheet_name)?;

        let mut sheet = SheetWriter {
            ws: worksheet,
            headers: &self.config.headers,
            formats: &formats,
            row: 0,
        };
        // widths go in before any data
        sheet.set_widths(self.default_width)?;
        for row in &rows {
            sheet.write_row(row)?;
        }

        tracing::debug!(rows = rows.len(), sheet = %self.config.sheet_name, "built workbook");
        Ok(workbook)
    }
}

/// Convenience wrapper: build and save in one call.
pub fn export_to_excel(
    data: &ReportNodes,
    totals: Option<&GroupTotals>,
    config: &ExcelExportConfig,
    path: &Path,
) -> Result<()> {
    ExcelExporter::new(config).export(data, totals, path)
}

struct SheetWriter<'w> {
    ws: &'w mut Worksheet,
    headers: &'w [ExcelHeader],
    formats: &'w Formats,
    row: u32,
}

impl SheetWriter<'_> {
    fn last_col(&self) -> u16 {
        self.headers.len().saturating_sub(1) as u16
    }

    fn set_widths(&mut self, default_width: f64) -> Result<()> {
        for (col, header) in self.headers.iter().enumerate() {
            self.ws
                .set_column_width(col as u16, header.width.unwrap_or(default_width))?;
        }
        Ok(())
    }

    fn write_row(&mut self, row: &SheetRow) -> Result<()> {
        let formats = self.formats;
        match row {
            SheetRow::Title(title) => self.write_banner(title, &formats.title)?,
            SheetRow::Header => self.write_header_row()?,
            SheetRow::Group { level, heading } => {
                self.write_banner(heading, &Formats::group(level))?
            }
            SheetRow::Leaf(cells) => self.write_leaf(cells)?,
            SheetRow::Totals {
                label,
                values,
                grand,
            } => {
                let (text, number) = if *grand {
                    (&formats.grand_total, &formats.grand_total_number)
                } else {
                    (&formats.subtotal, &formats.subtotal_number)
                };
                self.write_totals(label, values, text, number)?;
            }
            SheetRow::Blank => {}
        }
        self.row += 1;
        Ok(())
    }

    /// Full-width row; a single column can't be merged.
    fn write_banner(&mut self, text: &str, format: &Format) -> Result<()> {
        let last_col = self.last_col();
        if last_col == 0 {
            self.ws.write_string_with_format(self.row, 0, text, format)?;
        } else {
            self.ws
                .merge_range(self.row, 0, self.row, last_col, text, format)?;
        }
        Ok(())
    }

    fn write_header_row(&mut self) -> Result<()> {
        for (col, header) in self.headers.iter().enumerate() {
            self.ws
                .write_string_with_format(self.row, col as u16, &header.label, &self.formats.header)?;
        }
        self.ws.set_freeze_panes(self.row + 1, 0)?;
        Ok(())
    }

    fn write_leaf(&mut self, cells: &[CellValue]) -> Result<()> {
        for (col, (header, value)) in self.headers.iter().zip(cells).enumerate() {
            let col = col as u16;
            match value {
                CellValue::Number(n) => {
                    self.ws
                        .write_number_with_format(self.row, col, *n, &Formats::cell(header, true))?;
                }
                CellValue::Text(text) => {
                    self.ws
                        .write_string_with_format(self.row, col, text, &Formats::cell(header, false))?;
                }
                CellValue::Empty => {
                    self.ws
                        .write_blank(self.row, col, &Formats::cell(header, false))?;
                }
            }
        }
        Ok(())
    }

    fn write_totals(
        &mut self,
        label: &str,
        values: &[Option<f64>],
        text_format: &Format,
        number_format: &Format,
    ) -> Result<()> {
        for (col, value) in values.iter().enumerate() {
            let col = col as u16;
            if col == 0 {
                self.ws.write_string_with_format(self.row, col, label, text_format)?;
                continue;
            }
            match value {
                Some(value) => {
                    self.ws
                        .write_number_with_format(self.row, col, *value, number_format)?;
                }
                None => {
                    self.ws.write_blank(self.row, col, text_format)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{parse_nodes, RowShape};
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn config(show_totals: bool) -> ExcelExportConfig {
        ExcelExportConfig {
            file_name: "Delivery_Report.xlsx".into(),
            sheet_name: "Deliveries".into(),
            title: Some("Delivery Report".into()),
            headers: vec![
                ExcelHeader::new("customer", "Customer").width(25.0),
                ExcelHeader::new("qty", "Qty").align(Align::Right),
                ExcelHeader::new("amount", "Amount"),
                ExcelHeader::new("unmapped", "Notes"),
            ],
            grouping: Some(GroupingConfig { show_totals }),
        }
    }

    fn nodes(values: Value) -> ReportNodes {
        let Value::Array(values) = values else {
            unreachable!()
        };
        parse_nodes(values, RowShape::Delivery, "deliveries").unwrap()
    }

    fn grouped() -> ReportNodes {
        nodes(json!([
            {
                "level": "agency",
                "id": 1,
                "name": "North",
                "totals": {"totalQuantity": 3, "totalAmount": 150, "itemCount": 2},
                "data": [
                    {"id": 1, "customerName": "Asha", "quantity": 1, "amount": 50},
                    {"id": 2, "customerName": "Ravi", "quantity": 2, "amount": 100}
                ]
            },
            {"level": "agency", "id": 2, "name": "South", "totals": {}, "data": []}
        ]))
    }

    #[test]
    fn flat_export_produces_a_workbook() {
        let data = nodes(json!([
            {"id": 1, "customerName": "Asha", "quantity": 1, "amount": 50}
        ]));
        let cfg = config(false);
        let bytes = ExcelExporter::new(&cfg).to_buffer(&data, None).unwrap();
        // xlsx files are zip archives
        assert_eq!(&bytes[..2], b"PK");
    }

    fn north_totals() -> GroupTotals {
        GroupTotals {
            total_quantity: 3.0,
            total_amount: 150.0,
            item_count: 2,
        }
    }

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn grouped_layout_writes_blocks_in_order() {
        let cfg = config(true);
        let rows = layout(&cfg, &grouped(), Some(&north_totals()));
        assert_eq!(
            rows,
            vec![
                SheetRow::Title("Delivery Report".into()),
                SheetRow::Header,
                SheetRow::Group {
                    level: "agency".into(),
                    heading: "Agency: North".into(),
                },
                SheetRow::Leaf(vec![
                    text("  Asha"),
                    CellValue::Number(1.0),
                    CellValue::Number(50.0),
                    CellValue::Empty,
                ]),
                SheetRow::Leaf(vec![
                    text("  Ravi"),
                    CellValue::Number(2.0),
                    CellValue::Number(100.0),
                    CellValue::Empty,
                ]),
                SheetRow::Totals {
                    label: "Subtotal - North".into(),
                    values: vec![None, Some(3.0), Some(150.0), None],
                    grand: false,
                },
                SheetRow::Blank,
                SheetRow::Group {
                    level: "agency".into(),
                    heading: "Agency: South".into(),
                },
                SheetRow::Totals {
                    label: "Subtotal - South".into(),
                    values: vec![None, Some(0.0), Some(0.0), None],
                    grand: false,
                },
                SheetRow::Blank,
                SheetRow::Totals {
                    label: "Grand Total".into(),
                    values: vec![None, Some(3.0), Some(150.0), None],
                    grand: true,
                },
            ]
        );
    }

    #[test]
    fn grand_total_needs_totals_and_show_totals() {
        let hidden = layout(&config(false), &grouped(), Some(&north_totals()));
        assert!(!hidden
            .iter()
            .any(|r| matches!(r, SheetRow::Totals { grand: true, .. })));

        let missing = layout(&config(true), &grouped(), None);
        assert!(!missing
            .iter()
            .any(|r| matches!(r, SheetRow::Totals { grand: true, .. })));

        let no_grouping = ExcelExportConfig {
            grouping: None,
            ..config(true)
        };
        let rows = layout(&no_grouping, &grouped(), Some(&north_totals()));
        assert!(!matches!(rows.last(), Some(SheetRow::Totals { grand: true, .. })));
    }

    #[test]
    fn nested_groups_indent_two_spaces_per_level() {
        let data = nodes(json!([
            {
                "level": "agency", "id": 1, "name": "North",
                "totals": {"totalQuantity": 4, "totalAmount": 100},
                "data": [
                    {
                        "level": "area", "id": 7, "name": "Kothrud",
                        "totals": {"totalQuantity": 4, "totalAmount": 100},
                        "data": [{"id": 1, "customerName": "Asha", "quantity": 4, "amount": 100}]
                    }
                ]
            }
        ]));
        let mut cfg = config(false);
        cfg.headers = vec![
            ExcelHeader::new("customer", "Customer"),
            ExcelHeader::new("qty", "Qty"),
            ExcelHeader::new("rate", "Rate"),
        ];
        let rows = layout(&cfg, &data, None);

        assert_eq!(
            rows[3],
            SheetRow::Group {
                level: "area".into(),
                heading: "  Area: Kothrud".into(),
            }
        );
        assert_eq!(
            rows[4],
            SheetRow::Leaf(vec![text("    Asha"), CellValue::Number(4.0), CellValue::Empty])
        );
        assert_eq!(
            rows[5],
            SheetRow::Totals {
                label: "  Subtotal - Kothrud".into(),
                values: vec![None, Some(4.0), Some(25.0)],
                grand: false,
            }
        );
        // inner blank, outer subtotal, outer blank
        assert_eq!(rows[6], SheetRow::Blank);
        assert!(matches!(&rows[7], SheetRow::Totals { label, .. } if label == "Subtotal - North"));
        assert_eq!(rows[8], SheetRow::Blank);
        assert_eq!(rows.len(), 9);
    }

    #[test]
    fn flat_layout_has_no_indent_or_subtotals() {
        let data = nodes(json!([
            {"id": 1, "customerName": "Asha", "quantity": 1, "amount": 50}
        ]));
        let rows = layout(&config(true), &data, None);
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[2],
            SheetRow::Leaf(vec![
                text("Asha"),
                CellValue::Number(1.0),
                CellValue::Number(50.0),
                CellValue::Empty,
            ])
        );
    }

    #[test]
    fn grouped_export_produces_a_workbook() {
        let cfg = config(true);
        let bytes = ExcelExporter::new(&cfg)
            .to_buffer(&grouped(), Some(&north_totals()))
            .unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn single_column_config_does_not_merge() {
        let mut cfg = config(true);
        cfg.headers.truncate(1);
        let bytes = ExcelExporter::new(&cfg).to_buffer(&grouped(), None).unwrap();
        assert!(!bytes.is_empty());
    }

    #[test]
    fn export_writes_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.xlsx");
        let cfg = config(true);
        export_to_excel(&grouped(), None, &cfg, &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn subtotals_only_fill_numeric_columns() {
        let totals = GroupTotals {
            total_quantity: 4.0,
            total_amount: 100.0,
            item_count: 1,
        };
        assert_eq!(subtotal_value("qty", &totals), Some(4.0));
        assert_eq!(subtotal_value("amount", &totals), Some(100.0));
        assert_eq!(subtotal_value("rate", &totals), Some(25.0));
        assert_eq!(subtotal_value("customer", &totals), None);
    }

    #[test]
    fn shows_totals_reads_grouping() {
        assert!(config(true).shows_totals());
        assert!(!config(false).shows_totals());
        let mut cfg = config(true);
        cfg.grouping = None;
        assert!(!cfg.shows_totals());
    }

    #[test]
    fn invalid_sheet_name_surfaces_library_error() {
        let mut cfg = config(true);
        cfg.sheet_name = "bad/name".into();
        assert!(ExcelExporter::new(&cfg).to_buffer(&grouped(), None).is_err());
    }
}
