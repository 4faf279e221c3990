mod client;
mod envelope;

pub use client::{ApiClient, ReportPayload};
pub use envelope::{load_envelope_file, parse_envelope, Envelope};
