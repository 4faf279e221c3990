use std::time::Duration;
use ureq::Agent;

use super::envelope::{parse_envelope, Envelope};
use crate::config::ApiSettings;
use crate::error::{ReportError, Result};
use crate::report::{parse_nodes, GroupTotals, ReportFilter, ReportKind, ReportNodes};

/// A fetched report, all pages merged.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportPayload {
    pub nodes: ReportNodes,
    pub totals: Option<GroupTotals>,
    pub total_records: Option<u64>,
}

impl ReportPayload {
    /// Parse a raw envelope for `kind`.
    pub fn from_envelope(kind: ReportKind, envelope: Envelope) -> Result<Self> {
        Ok(Self {
            nodes: parse_nodes(envelope.data, kind.shape(), kind.slug())?,
            totals: envelope.totals,
            total_records: envelope.total_records,
        })
    }
}

/// Blocking client for the admin/report endpoints.
pub struct ApiClient {
    agent: Agent,
    base_url: String,
    token: Option<String>,
    page_size: u32,
}

impl ApiClient {
    pub fn new(settings: &ApiSettings, token: Option<String>) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(settings.timeout_secs)))
            .build()
            .into();

        Self {
            agent,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            token,
            page_size: settings.page_size.max(1),
        }
    }

    pub fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// GET one page of `endpoint`.
    pub fn fetch_page(&self, endpoint: &str, filter: &ReportFilter, page: u32) -> Result<Envelope> {
        let url = self.url(endpoint);
        let mut request = self
            .agent
            .get(&url)
            .query("page", page.to_string())
            .query("limit", self.page_size.to_string());
        for (name, value) in filter.query_pairs() {
            request = request.query(name, value);
        }
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        tracing::debug!(%url, page, "fetching page");
        let mut response = request.call().map_err(|e| match e {
            ureq::Error::StatusCode(status) => ReportError::HttpStatus {
                url: url.clone(),
                status,
            },
            other => ReportError::Http {
                url: url.clone(),
                reason: other.to_string(),
            },
        })?;
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ReportError::Http {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let value: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| ReportError::BadEnvelope {
                url: url.clone(),
                reason: e.to_string(),
            })?;
        parse_envelope(value).map_err(|reason| ReportError::BadEnvelope { url, reason })
    }

    /// Fetch every page of a report and parse it.
    pub fn fetch_report(&self, kind: ReportKind, filter: &ReportFilter) -> Result<ReportPayload> {
        let mut merged = Envelope::default();
        let mut page = 1;
        loop {
            let envelope = self.fetch_page(kind.endpoint(), filter, page)?;
            let received = envelope.data.len();
            merged.data.extend(envelope.data);
            merged.totals = merged.totals.or(envelope.totals);
            merged.total_records = merged.total_records.or(envelope.total_records);

            let total_pages = envelope.total_pages.unwrap_or(1);
            if received == 0 || page >= total_pages {
                break;
            }
            page += 1;
        }

        tracing::info!(
            report = kind.slug(),
            rows = merged.data.len(),
            pages = page,
            "fetched report"
        );
        ReportPayload::from_envelope(kind, merged)
    }
}
