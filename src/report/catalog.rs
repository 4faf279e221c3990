use chrono::NaiveDate;

use super::aggregate::{delivery_dimensions, snf_order_dimensions, Dimension};
use super::filter::ReportFilter;
use super::model::{LeafRow, RowShape};
use crate::config::ReportOverride;
use crate::error::{ReportError, Result};
use crate::export::{Align, ExcelExportConfig, ExcelHeader, GroupingConfig};

/// The reports the backend serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Purchase,
    DeliveryAgency,
    Subscriptions,
    Exceptions,
    SaleRegister,
    SnfOrders,
    DeliverySummaries,
}

impl ReportKind {
    pub const ALL: [ReportKind; 7] = [
        ReportKind::Purchase,
        ReportKind::DeliveryAgency,
        ReportKind::Subscriptions,
        ReportKind::Exceptions,
        ReportKind::SaleRegister,
        ReportKind::SnfOrders,
        ReportKind::DeliverySummaries,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            ReportKind::Purchase => "purchase",
            ReportKind::DeliveryAgency => "delivery-agency",
            ReportKind::Subscriptions => "subscriptions",
            ReportKind::Exceptions => "exceptions",
            ReportKind::SaleRegister => "sale-register",
            ReportKind::SnfOrders => "snf-orders",
            ReportKind::DeliverySummaries => "delivery-summaries",
        }
    }

    pub fn from_slug(slug: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.slug() == slug)
            .ok_or_else(|| ReportError::UnknownReport(slug.to_string()))
    }

    pub fn title(self) -> &'static str {
        match self {
            ReportKind::Purchase => "Purchase Report",
            ReportKind::DeliveryAgency => "Delivery Agency Report",
            ReportKind::Subscriptions => "Subscription Report",
            ReportKind::Exceptions => "Exception Report",
            ReportKind::SaleRegister => "Sale Register Report",
            ReportKind::SnfOrders => "SNF Orders Report",
            ReportKind::DeliverySummaries => "Delivery Summary Report",
        }
    }

    pub fn endpoint(self) -> &'static str {
        match self {
            ReportKind::Purchase => "/api/reports/purchases",
            ReportKind::DeliveryAgency => "/api/reports/delivery-agencies",
            ReportKind::Subscriptions => "/api/reports/subscriptions",
            ReportKind::Exceptions => "/api/reports/exceptions",
            ReportKind::SaleRegister => "/api/reports/sale-register",
            ReportKind::SnfOrders => "/api/admin/snf-orders",
            ReportKind::DeliverySummaries => "/api/reports/delivery-summaries",
        }
    }

    pub fn shape(self) -> RowShape {
        match self {
            ReportKind::Purchase => RowShape::Purchase,
            ReportKind::DeliveryAgency | ReportKind::DeliverySummaries => RowShape::Delivery,
            ReportKind::Subscriptions | ReportKind::Exceptions => RowShape::Subscription,
            ReportKind::SaleRegister => RowShape::SaleRegister,
            ReportKind::SnfOrders => RowShape::SnfOrder,
        }
    }

    /// Agency users may only pull their own delivery and subscription data.
    pub fn requires_admin(self) -> bool {
        matches!(
            self,
            ReportKind::Purchase | ReportKind::SaleRegister | ReportKind::SnfOrders
        )
    }

    /// Dimensions for the client-side summary, if the report has one.
    pub fn dimensions(self) -> Option<Vec<Dimension<LeafRow>>> {
        match self {
            ReportKind::SnfOrders => Some(snf_order_dimensions()),
            ReportKind::DeliverySummaries | ReportKind::DeliveryAgency => {
                Some(delivery_dimensions())
            }
            _ => None,
        }
    }

    pub fn default_headers(self) -> Vec<ExcelHeader> {
        let qty = || ExcelHeader::new("qty", "Qty").width(10.0).align(Align::Right);
        let rate = || ExcelHeader::new("rate", "Rate").width(12.0).align(Align::Right);
        let amount = || ExcelHeader::new("amount", "Amount").width(14.0).align(Align::Right);
        match self {
            ReportKind::Purchase => vec![
                ExcelHeader::new("purchaseNo", "Purchase No"),
                ExcelHeader::new("date", "Date").width(12.0),
                ExcelHeader::new("vendor", "Vendor").width(25.0),
                ExcelHeader::new("depot", "Depot").width(20.0),
                ExcelHeader::new("product", "Product").width(25.0),
                ExcelHeader::new("variant", "Variant"),
                qty(),
                rate(),
                amount(),
            ],
            ReportKind::DeliveryAgency | ReportKind::DeliverySummaries => vec![
                ExcelHeader::new("customer", "Customer").width(25.0),
                ExcelHeader::new("date", "Date").width(12.0),
                ExcelHeader::new("agency", "Agency").width(20.0),
                ExcelHeader::new("area", "Area").width(20.0),
                ExcelHeader::new("product", "Product").width(25.0),
                ExcelHeader::new("variant", "Variant"),
                qty(),
                ExcelHeader::new("status", "Status").width(14.0),
                amount(),
            ],
            ReportKind::Subscriptions => subscription_headers(false),
            ReportKind::Exceptions => subscription_headers(true),
            ReportKind::SaleRegister => vec![
                ExcelHeader::new("invoiceNo", "Invoice No"),
                ExcelHeader::new("date", "Date").width(12.0),
                ExcelHeader::new("customer", "Customer").width(25.0),
                ExcelHeader::new("depot", "Depot").width(20.0),
                ExcelHeader::new("product", "Product").width(25.0),
                ExcelHeader::new("variant", "Variant"),
                qty(),
                rate(),
                amount(),
            ],
            ReportKind::SnfOrders => vec![
                ExcelHeader::new("orderNo", "Order No"),
                ExcelHeader::new("date", "Date").width(12.0),
                ExcelHeader::new("customer", "Customer").width(25.0),
                ExcelHeader::new("city", "City"),
                ExcelHeader::new("depot", "Depot").width(20.0),
                ExcelHeader::new("paymentStatus", "Payment Status").width(16.0),
                ExcelHeader::new("paymentMode", "Payment Mode").width(16.0),
                ExcelHeader::new("qty", "Items").width(8.0).align(Align::Right),
                amount(),
            ],
        }
    }

    /// Export settings for one run: defaults, then `reports.toml` overrides.
    pub fn export_config(
        self,
        filter: &ReportFilter,
        overrides: Option<&ReportOverride>,
        today: NaiveDate,
    ) -> ExcelExportConfig {
        let title = overrides
            .and_then(|o| o.title.clone())
            .unwrap_or_else(|| self.title().to_string());
        let heading = match filter.range_label() {
            Some(range) => format!("{title} ({range})"),
            None => title.clone(),
        };
        let sheet_name = overrides
            .and_then(|o| o.sheet_name.clone())
            .unwrap_or_else(|| title.chars().take(31).collect());
        let headers = overrides
            .and_then(|o| o.headers.clone())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| self.default_headers());
        let show_totals = overrides.and_then(|o| o.show_totals).unwrap_or(true);

        ExcelExportConfig {
            file_name: filter.file_name(&title, "xlsx", today),
            sheet_name,
            title: Some(heading),
            headers,
            grouping: Some(GroupingConfig { show_totals }),
        }
    }
}

/// Subscription-status and exception exports share one column set; exceptions
/// add the reason column.
fn subscription_headers(with_reason: bool) -> Vec<ExcelHeader> {
    let mut headers = vec![
        ExcelHeader::new("customer", "Customer").width(25.0),
        ExcelHeader::new("product", "Product").width(25.0),
        ExcelHeader::new("variant", "Variant"),
        ExcelHeader::new("agency", "Agency").width(20.0),
        ExcelHeader::new("status", "Status").width(14.0),
        ExcelHeader::new("startDate", "Start Date").width(12.0),
        ExcelHeader::new("expiryDate", "Expiry Date").width(12.0),
        ExcelHeader::new("qty", "Qty").width(10.0).align(Align::Right),
        ExcelHeader::new("amount", "Amount").width(14.0).align(Align::Right),
    ];
    if with_reason {
        headers.push(ExcelHeader::new("reason", "Reason").width(30.0));
    }
    headers
}
