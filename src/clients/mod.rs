use crate::error::Result;
use std::net::Ipv4Addr;

pub mod dreamhost;

/// An A-record as the provider currently reports it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRecord {
    pub record: String,
    pub value: String,
}

impl ProviderRecord {
    pub fn new(record: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            record: record.into(),
            value: value.into(),
        }
    }
}

/// Result of one provider write, as the provider itself described it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationOutcome {
    pub success: bool,
    pub message: String,
}

impl OperationOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Record operations the reconciliation engine needs from a DNS host
pub trait DnsProvider {
    /// List the A-records currently held by the provider, in provider order
    fn list_records(&self) -> Result<Vec<ProviderRecord>>;

    /// Add an A-record. A refusal reported by the provider is an `Ok` outcome
    /// with `success == false`; `Err` means the provider could not be asked.
    fn add_record(&self, domain: &str, ip: Ipv4Addr) -> Result<OperationOutcome>;

    /// Remove the A-record `domain -> ip`. Same error contract as `add_record`.
    fn remove_record(&self, domain: &str, ip: &str) -> Result<OperationOutcome>;

    /// Get the provider name for logging purposes
    fn provider_name(&self) -> &str;
}
