use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

use crate::error::{ReportError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(ReportError::InvalidSortOrder(s.to_string())),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => write!(f, "asc"),
            SortOrder::Desc => write!(f, "desc"),
        }
    }
}

/// Everything that narrows a report request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Grouping keys, outermost first (e.g. `agency`, `area`)
    pub group_by: Vec<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
    pub agency_id: Option<String>,
    pub depot_id: Option<String>,
    pub vendor_id: Option<String>,
    pub status: Option<String>,
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ReportError::InvalidDate(value.to_string()))
}

impl ReportFilter {
    /// Filter over a date range; either end may be open.
    pub fn with_range(from: Option<&str>, to: Option<&str>) -> Result<Self> {
        let from = from.map(parse_date).transpose()?;
        let to = to.map(parse_date).transpose()?;
        if let (Some(f), Some(t)) = (from, to) {
            if f > t {
                return Err(ReportError::InvalidDateRange {
                    from: f.to_string(),
                    to: t.to_string(),
                });
            }
        }
        Ok(Self {
            from,
            to,
            ..Self::default()
        })
    }

    /// Query parameters understood by the report endpoints.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(from) = self.from {
            pairs.push(("startDate", from.to_string()));
        }
        if let Some(to) = self.to {
            pairs.push(("endDate", to.to_string()));
        }
        if !self.group_by.is_empty() {
            pairs.push(("groupBy", self.group_by.join(",")));
        }
        let optional = [
            ("search", self.search.as_deref()),
            ("sortBy", self.sort_by.as_deref()),
            ("agencyId", self.agency_id.as_deref()),
            ("depotId", self.depot_id.as_deref()),
            ("vendorId", self.vendor_id.as_deref()),
            ("status", self.status.as_deref()),
        ];
        for (name, value) in optional {
            if let Some(v) = value.map(str::trim).filter(|v| !v.is_empty()) {
                pairs.push((name, v.to_string()));
            }
        }
        if let Some(order) = self.sort_order {
            pairs.push(("sortOrder", order.to_string()));
        }
        pairs
    }

    /// Human readable date range, if any.
    pub fn range_label(&self) -> Option<String> {
        match (self.from, self.to) {
            (Some(f), Some(t)) => Some(format!("{f} to {t}")),
            (Some(f), None) => Some(format!("from {f}")),
            (None, Some(t)) => Some(format!("up to {t}")),
            (None, None) => None,
        }
    }

    /// Download name such as `Purchase_Report_2024-01-01_to_2024-01-31.xlsx`.
    pub fn file_name(&self, title: &str, extension: &str, today: NaiveDate) -> String {
        let stem = title.split_whitespace().collect::<Vec<_>>().join("_");
        let range = match (self.from, self.to) {
            (Some(f), Some(t)) => format!("{f}_to_{t}"),
            (Some(f), None) => format!("from_{f}"),
            (None, Some(t)) => format!("to_{t}"),
            (None, None) => today.to_string(),
        };
        format!("{stem}_{range}.{extension}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn file_name_embeds_range() {
        let filter = ReportFilter::with_range(Some("2024-01-01"), Some("2024-01-31")).unwrap();
        assert_eq!(
            filter.file_name("Purchase Report", "xlsx", date("2024-02-10")),
            "Purchase_Report_2024-01-01_to_2024-01-31.xlsx"
        );
    }

    #[test]
    fn file_name_without_range_uses_today() {
        let filter = ReportFilter::default();
        assert_eq!(
            filter.file_name("SNF Orders Report", "pdf", date("2024-02-10")),
            "SNF_Orders_Report_2024-02-10.pdf"
        );
    }

    #[test]
    fn reversed_range_is_rejected() {
        let err = ReportFilter::with_range(Some("2024-02-01"), Some("2024-01-01")).unwrap_err();
        assert!(matches!(err, ReportError::InvalidDateRange { .. }));
    }

    #[test]
    fn bad_date_is_rejected() {
        let err = ReportFilter::with_range(Some("01/02/2024"), None).unwrap_err();
        assert!(err.to_string().contains("01/02/2024"));
    }

    #[test]
    fn query_pairs_skip_blank_values() {
        let mut filter = ReportFilter::with_range(Some("2024-01-01"), None).unwrap();
        filter.group_by = vec!["agency".into(), "area".into()];
        filter.search = Some("  ".into());
        filter.depot_id = Some("3".into());
        filter.sort_order = Some(SortOrder::Desc);
        assert_eq!(
            filter.query_pairs(),
            vec![
                ("startDate", "2024-01-01".to_string()),
                ("groupBy", "agency,area".to_string()),
                ("depotId", "3".to_string()),
                ("sortOrder", "desc".to_string()),
            ]
        );
    }

    #[test]
    fn sort_order_parses_case_insensitively() {
        assert_eq!("DESC".parse::<SortOrder>().unwrap(), SortOrder::Desc);
        assert!("sideways".parse::<SortOrder>().is_err());
    }
}
