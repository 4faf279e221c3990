use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// A resolved spreadsheet/table cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Empty,
}

impl CellValue {
    fn text(value: &str) -> Self {
        CellValue::opt_text(Some(value))
    }

    fn opt_text(value: Option<&str>) -> Self {
        match value {
            Some(v) if !v.is_empty() => CellValue::Text(v.to_string()),
            _ => CellValue::Empty,
        }
    }

    fn date(value: Option<&str>) -> Self {
        CellValue::opt_text(value.map(date_part))
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) if n.fract() == 0.0 => write!(f, "{n:.0}"),
            CellValue::Number(n) => write!(f, "{n:.2}"),
            CellValue::Empty => Ok(()),
        }
    }
}

/// Trim an ISO timestamp (`2024-01-31T00:00:00.000Z`) down to its date.
pub fn date_part(value: &str) -> &str {
    match value.find('T') {
        Some(idx) => &value[..idx],
        None => value,
    }
}

/// Maps a column key to the value a row shape shows for it.
pub trait ColumnResolver {
    /// Unknown keys resolve to [`CellValue::Empty`].
    fn cell(&self, key: &str) -> CellValue;
    fn quantity(&self) -> f64;
    fn amount(&self) -> f64;
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderItem {
    #[serde(default, deserialize_with = "de_id")]
    pub id: String,
    #[serde(default, alias = "purchaseNumber", deserialize_with = "de_text")]
    pub purchase_no: String,
    #[serde(default)]
    pub purchase_date: Option<String>,
    #[serde(default, alias = "vendor")]
    pub vendor_name: Option<String>,
    #[serde(default, alias = "depot")]
    pub depot_name: Option<String>,
    #[serde(default, deserialize_with = "de_text")]
    pub product_name: String,
    #[serde(default)]
    pub variant_name: Option<String>,
    #[serde(default, deserialize_with = "de_number")]
    pub quantity: f64,
    #[serde(default, deserialize_with = "de_number")]
    pub rate: f64,
    #[serde(default, deserialize_with = "de_number")]
    pub amount: f64,
}

impl ColumnResolver for PurchaseOrderItem {
    fn cell(&self, key: &str) -> CellValue {
        match key {
            "purchaseNo" => CellValue::text(&self.purchase_no),
            "date" => CellValue::date(self.purchase_date.as_deref()),
            "vendor" => CellValue::opt_text(self.vendor_name.as_deref()),
            "depot" => CellValue::opt_text(self.depot_name.as_deref()),
            "product" => CellValue::text(&self.product_name),
            "variant" => CellValue::opt_text(self.variant_name.as_deref()),
            "qty" => CellValue::Number(self.quantity),
            "rate" => CellValue::Number(self.rate),
            "amount" => CellValue::Number(self.amount),
            _ => CellValue::Empty,
        }
    }

    fn quantity(&self) -> f64 {
        self.quantity
    }

    fn amount(&self) -> f64 {
        self.amount
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryItem {
    #[serde(default, deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub delivery_date: Option<String>,
    #[serde(default, alias = "agency")]
    pub agency_name: Option<String>,
    #[serde(default, alias = "area")]
    pub area_name: Option<String>,
    #[serde(default, deserialize_with = "de_text")]
    pub customer_name: String,
    #[serde(default, deserialize_with = "de_text")]
    pub product_name: String,
    #[serde(default)]
    pub variant_name: Option<String>,
    #[serde(default, deserialize_with = "de_number")]
    pub quantity: f64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "de_number")]
    pub amount: f64,
}

impl ColumnResolver for DeliveryItem {
    fn cell(&self, key: &str) -> CellValue {
        match key {
            "date" => CellValue::date(self.delivery_date.as_deref()),
            "agency" => CellValue::opt_text(self.agency_name.as_deref()),
            "area" => CellValue::opt_text(self.area_name.as_deref()),
            "customer" => CellValue::text(&self.customer_name),
            "product" => CellValue::text(&self.product_name),
            "variant" => CellValue::opt_text(self.variant_name.as_deref()),
            "qty" => CellValue::Number(self.quantity),
            "status" => CellValue::opt_text(self.status.as_deref()),
            "amount" => CellValue::Number(self.amount),
            _ => CellValue::Empty,
        }
    }

    fn quantity(&self) -> f64 {
        self.quantity
    }

    fn amount(&self) -> f64 {
        self.amount
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct DepotRef {
    #[serde(default, deserialize_with = "de_id")]
    pub id: String,
    #[serde(default, deserialize_with = "de_text")]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SnfOrderReportItem {
    #[serde(default, deserialize_with = "de_id")]
    pub id: String,
    #[serde(default, deserialize_with = "de_text")]
    pub order_no: String,
    #[serde(default, alias = "createdAt")]
    pub order_date: Option<String>,
    #[serde(default, deserialize_with = "de_text")]
    pub customer_name: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub depot: Option<DepotRef>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub payment_mode: Option<String>,
    #[serde(default, deserialize_with = "de_number")]
    pub item_count: f64,
    #[serde(default, alias = "amount", deserialize_with = "de_number")]
    pub total_amount: f64,
}

impl ColumnResolver for SnfOrderReportItem {
    fn cell(&self, key: &str) -> CellValue {
        match key {
            "orderNo" => CellValue::text(&self.order_no),
            "date" => CellValue::date(self.order_date.as_deref()),
            "customer" => CellValue::text(&self.customer_name),
            "city" => CellValue::opt_text(self.city.as_deref()),
            "depot" => CellValue::opt_text(self.depot.as_ref().map(|d| d.name.as_str())),
            "paymentStatus" => CellValue::opt_text(self.payment_status.as_deref()),
            "paymentMode" => CellValue::opt_text(self.payment_mode.as_deref()),
            "qty" => CellValue::Number(self.item_count),
            "amount" => CellValue::Number(self.total_amount),
            _ => CellValue::Empty,
        }
    }

    fn quantity(&self) -> f64 {
        self.item_count
    }

    fn amount(&self) -> f64 {
        self.total_amount
    }
}

/// Row shape shared by the subscription-status and exception reports.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionItem {
    #[serde(default, deserialize_with = "de_id")]
    pub id: String,
    #[serde(default, deserialize_with = "de_text")]
    pub customer_name: String,
    #[serde(default, deserialize_with = "de_text")]
    pub product_name: String,
    #[serde(default)]
    pub variant_name: Option<String>,
    #[serde(default, alias = "agency")]
    pub agency_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub expiry_date: Option<String>,
    #[serde(default, alias = "qty", deserialize_with = "de_number")]
    pub quantity: f64,
    #[serde(default, deserialize_with = "de_number")]
    pub amount: f64,
    #[serde(default, alias = "exceptionReason")]
    pub reason: Option<String>,
}

impl ColumnResolver for SubscriptionItem {
    fn cell(&self, key: &str) -> CellValue {
        match key {
            "customer" => CellValue::text(&self.customer_name),
            "product" => CellValue::text(&self.product_name),
            "variant" => CellValue::opt_text(self.variant_name.as_deref()),
            "agency" => CellValue::opt_text(self.agency_name.as_deref()),
            "status" => CellValue::opt_text(self.status.as_deref()),
            "startDate" => CellValue::date(self.start_date.as_deref()),
            "expiryDate" => CellValue::date(self.expiry_date.as_deref()),
            "qty" => CellValue::Number(self.quantity),
            "amount" => CellValue::Number(self.amount),
            "reason" => CellValue::opt_text(self.reason.as_deref()),
            _ => CellValue::Empty,
        }
    }

    fn quantity(&self) -> f64 {
        self.quantity
    }

    fn amount(&self) -> f64 {
        self.amount
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SaleRegisterItem {
    #[serde(default, deserialize_with = "de_id")]
    pub id: String,
    #[serde(default, deserialize_with = "de_text")]
    pub invoice_no: String,
    #[serde(default)]
    pub invoice_date: Option<String>,
    #[serde(default, deserialize_with = "de_text")]
    pub customer_name: String,
    #[serde(default, alias = "depot")]
    pub depot_name: Option<String>,
    #[serde(default, deserialize_with = "de_text")]
    pub product_name: String,
    #[serde(default)]
    pub variant_name: Option<String>,
    #[serde(default, deserialize_with = "de_number")]
    pub quantity: f64,
    #[serde(default, deserialize_with = "de_number")]
    pub rate: f64,
    #[serde(default, deserialize_with = "de_number")]
    pub amount: f64,
}

impl ColumnResolver for SaleRegisterItem {
    fn cell(&self, key: &str) -> CellValue {
        match key {
            "invoiceNo" => CellValue::text(&self.invoice_no),
            "date" => CellValue::date(self.invoice_date.as_deref()),
            "customer" => CellValue::text(&self.customer_name),
            "depot" => CellValue::opt_text(self.depot_name.as_deref()),
            "product" => CellValue::text(&self.product_name),
            "variant" => CellValue::opt_text(self.variant_name.as_deref()),
            "qty" => CellValue::Number(self.quantity),
            "rate" => CellValue::Number(self.rate),
            "amount" => CellValue::Number(self.amount),
            _ => CellValue::Empty,
        }
    }

    fn quantity(&self) -> f64 {
        self.quantity
    }

    fn amount(&self) -> f64 {
        self.amount
    }
}

/// One un-aggregated line as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LeafRow {
    Purchase(PurchaseOrderItem),
    Delivery(DeliveryItem),
    SnfOrder(SnfOrderReportItem),
    Subscription(SubscriptionItem),
    SaleRegister(SaleRegisterItem),
}

impl LeafRow {
    fn resolver(&self) -> &dyn ColumnResolver {
        match self {
            LeafRow::Purchase(row) => row,
            LeafRow::Delivery(row) => row,
            LeafRow::SnfOrder(row) => row,
            LeafRow::Subscription(row) => row,
            LeafRow::SaleRegister(row) => row,
        }
    }
}

impl ColumnResolver for LeafRow {
    fn cell(&self, key: &str) -> CellValue {
        self.resolver().cell(key)
    }

    fn quantity(&self) -> f64 {
        self.resolver().quantity()
    }

    fn amount(&self) -> f64 {
        self.resolver().amount()
    }
}

/// Which leaf struct a report's rows deserialize into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowShape {
    Purchase,
    Delivery,
    SnfOrder,
    Subscription,
    SaleRegister,
}

impl RowShape {
    pub fn parse(self, value: Value) -> serde_json::Result<LeafRow> {
        Ok(match self {
            RowShape::Purchase => LeafRow::Purchase(serde_json::from_value(value)?),
            RowShape::Delivery => LeafRow::Delivery(serde_json::from_value(value)?),
            RowShape::SnfOrder => LeafRow::SnfOrder(serde_json::from_value(value)?),
            RowShape::Subscription => LeafRow::Subscription(serde_json::from_value(value)?),
            RowShape::SaleRegister => LeafRow::SaleRegister(serde_json::from_value(value)?),
        })
    }
}

/// Flat aggregate carried by every group node regardless of depth.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupTotals {
    #[serde(default, alias = "quantity", deserialize_with = "de_number")]
    pub total_quantity: f64,
    #[serde(default, alias = "amount", deserialize_with = "de_number")]
    pub total_amount: f64,
    #[serde(default, alias = "count", deserialize_with = "de_count")]
    pub item_count: u64,
}

impl GroupTotals {
    /// Effective rate for a subtotal line; 0 when nothing was sold.
    pub fn average_rate(&self) -> f64 {
        if self.total_quantity == 0.0 {
            0.0
        } else {
            self.total_amount / self.total_quantity
        }
    }
}

/// A node in a pre-grouped report tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupNode {
    pub level: String,
    pub id: String,
    pub name: String,
    pub product_name: Option<String>,
    pub city: Option<String>,
    pub unit: Option<String>,
    pub totals: GroupTotals,
    pub data: ReportNodes,
}

impl GroupNode {
    /// Key used for expansion state; ids are only unique within a level.
    pub fn key(&self) -> String {
        format!("{}:{}", self.level, self.id)
    }

    /// Heading shown on group rows, e.g. `Agency: North Depot`.
    pub fn heading(&self) -> String {
        let mut heading = format!("{}: {}", level_label(&self.level), self.name);
        match self.level.as_str() {
            "variant" => {
                if let Some(product) = &self.product_name {
                    heading = format!("{heading} ({product})");
                }
            }
            "area" | "depot" => {
                if let Some(city) = &self.city {
                    heading = format!("{heading} - {city}");
                }
            }
            _ => {}
        }
        if let Some(unit) = &self.unit {
            heading = format!("{heading} [{unit}]");
        }
        heading
    }
}

/// Capitalise a level tag for display (`agency` -> `Agency`).
pub fn level_label(level: &str) -> String {
    let mut chars = level.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Children of a group, or the root of a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReportNodes {
    Groups(Vec<GroupNode>),
    Leaves(Vec<LeafRow>),
}

impl ReportNodes {
    pub fn is_grouped(&self) -> bool {
        matches!(self, ReportNodes::Groups(_))
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ReportNodes::Groups(groups) => groups.is_empty(),
            ReportNodes::Leaves(rows) => rows.is_empty(),
        }
    }

    /// Every leaf in the tree, in input order.
    pub fn leaves(&self) -> Vec<&LeafRow> {
        let mut out = Vec::new();
        collect_leaves(self, &mut out);
        out
    }
}

fn collect_leaves<'a>(nodes: &'a ReportNodes, out: &mut Vec<&'a LeafRow>) {
    match nodes {
        ReportNodes::Leaves(rows) => out.extend(rows.iter()),
        ReportNodes::Groups(groups) => {
            for group in groups {
                collect_leaves(&group.data, out);
            }
        }
    }
}

pub(crate) fn de_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(id_to_string(&Value::deserialize(deserializer)?))
}

/// Text columns: null becomes empty, scalars are stringified.
pub(crate) fn de_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Null => Ok(String::new()),
        scalar @ (Value::Number(_) | Value::Bool(_)) => Ok(scalar.to_string()),
        other => Err(serde::de::Error::custom(format!("expected text, got {other}"))),
    }
}

pub(crate) fn de_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        // decimal columns arrive as strings
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    })
}

fn de_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let n = de_number(deserializer)?;
    Ok(if n > 0.0 { n.round() as u64 } else { 0 })
}

pub(crate) fn id_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
