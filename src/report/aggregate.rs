use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use super::model::{CellValue, ColumnResolver, LeafRow};

type KeyFn<T> = Box<dyn Fn(&T) -> Option<(String, String)>>;

/// One axis to summarise rows along.
pub struct Dimension<T> {
    pub name: String,
    /// Bucket label for rows without a value on this axis.
    pub fallback: String,
    key: KeyFn<T>,
}

impl<T> Dimension<T> {
    /// `key` returns `(bucket id, display label)` or `None` for the fallback bucket.
    pub fn new(
        name: impl Into<String>,
        fallback: impl Into<String>,
        key: impl Fn(&T) -> Option<(String, String)> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            fallback: fallback.into(),
            key: Box::new(key),
        }
    }
}

impl<T> fmt::Debug for Dimension<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dimension")
            .field("name", &self.name)
            .field("fallback", &self.fallback)
            .finish_non_exhaustive()
    }
}

impl<T: ColumnResolver + 'static> Dimension<T> {
    /// Bucket by the text a row shows in `column`, keyed by that label.
    pub fn by_column(name: impl Into<String>, column: &'static str, fallback: impl Into<String>) -> Self {
        Self::new(name, fallback, move |row: &T| match row.cell(column) {
            CellValue::Text(label) if !label.trim().is_empty() => Some((label.clone(), label)),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketStat {
    pub key: String,
    pub label: String,
    pub count: usize,
    pub total_amount: f64,
    pub total_quantity: f64,
    pub average_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionStats {
    pub dimension: String,
    pub buckets: Vec<BucketStat>,
}

impl DimensionStats {
    pub fn bucket(&self, label: &str) -> Option<&BucketStat> {
        self.buckets.iter().find(|b| b.label == label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportStats {
    pub total_count: usize,
    pub total_amount: f64,
    pub total_quantity: f64,
    pub average_order_value: f64,
    pub dimensions: Vec<DimensionStats>,
}

impl ReportStats {
    pub fn dimension(&self, name: &str) -> Option<&DimensionStats> {
        self.dimensions.iter().find(|d| d.dimension == name)
    }
}

struct Buckets {
    index: HashMap<String, usize>,
    stats: Vec<BucketStat>,
}

impl Buckets {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            stats: Vec::new(),
        }
    }

    fn add(&mut self, key: String, label: String, quantity: f64, amount: f64) {
        let idx = match self.index.get(&key) {
            Some(&idx) => idx,
            None => {
                self.stats.push(BucketStat {
                    key: key.clone(),
                    label,
                    count: 0,
                    total_amount: 0.0,
                    total_quantity: 0.0,
                    average_amount: 0.0,
                });
                self.index.insert(key, self.stats.len() - 1);
                self.stats.len() - 1
            }
        };
        let bucket = &mut self.stats[idx];
        bucket.count += 1;
        bucket.total_amount += amount;
        bucket.total_quantity += quantity;
    }
}

fn average(total: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

/// Summarise rows along every dimension in one pass. Buckets keep first-seen
/// order and rows without a value land in the dimension's fallback bucket.
pub fn aggregate<'a, T, I>(rows: I, dimensions: &[Dimension<T>]) -> ReportStats
where
    T: ColumnResolver + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut buckets: Vec<Buckets> = dimensions.iter().map(|_| Buckets::new()).collect();
    let mut total_count = 0;
    let mut total_amount = 0.0;
    let mut total_quantity = 0.0;

    for row in rows {
        let amount = row.amount();
        let quantity = row.quantity();
        total_count += 1;
        total_amount += amount;
        total_quantity += quantity;

        for (dimension, map) in dimensions.iter().zip(buckets.iter_mut()) {
            let (key, label) = (dimension.key)(row)
                .unwrap_or_else(|| (dimension.fallback.clone(), dimension.fallback.clone()));
            map.add(key, label, quantity, amount);
        }
    }

    let dimensions = dimensions
        .iter()
        .zip(buckets)
        .map(|(dimension, map)| DimensionStats {
            dimension: dimension.name.clone(),
            buckets: map
                .stats
                .into_iter()
                .map(|mut b| {
                    b.average_amount = average(b.total_amount, b.count);
                    b
                })
                .collect(),
        })
        .collect();

    tracing::debug!(rows = total_count, total_amount, "aggregated report rows");

    ReportStats {
        total_count,
        total_amount,
        total_quantity,
        average_order_value: average(total_amount, total_count),
        dimensions,
    }
}

/// Depot, city, payment status and payment mode for SNF orders.
pub fn snf_order_dimensions() -> Vec<Dimension<LeafRow>> {
    vec![
        Dimension::new("depot", "No Depot", |row: &LeafRow| match row {
            LeafRow::SnfOrder(order) => order.depot.as_ref().and_then(|d| {
                let label = d.name.trim();
                match (d.id.is_empty(), label.is_empty()) {
                    (true, true) => None,
                    (true, false) => Some((label.to_string(), label.to_string())),
                    (false, true) => Some((d.id.clone(), d.id.clone())),
                    (false, false) => Some((d.id.clone(), label.to_string())),
                }
            }),
            _ => None,
        }),
        Dimension::by_column("city", "city", "Unknown"),
        Dimension::by_column("paymentStatus", "paymentStatus", "NOT_SPECIFIED"),
        Dimension::by_column("paymentMode", "paymentMode", "NOT_SPECIFIED"),
    ]
}

/// Agency, area and delivery status for delivery rows.
pub fn delivery_dimensions() -> Vec<Dimension<LeafRow>> {
    vec![
        Dimension::by_column("agency", "agency", "Unassigned"),
        Dimension::by_column("area", "area", "Unknown"),
        Dimension::by_column("status", "status", "NOT_SPECIFIED"),
    ]
}
