//! Reconciliation of desired domains against the provider's A-records
//!
//! One run is:
//!
//! 1. discover the current external IPv4 address
//! 2. list the provider's A-records
//! 3. classify every desired domain as `NoOp`, `Add` or `Replace`
//! 4. execute the actions one domain at a time, collecting outcomes
//!
//! Steps 1 and 2 are prerequisites: if either fails nothing is written and
//! the run ends with a [`RunError`] naming the step. Failures in step 4 only
//! affect the domain being processed.
//!
//! A `Replace` adds the new value before removing the old one, and removes
//! only after the provider confirmed the add. A domain is never left without
//! a record because its replacement could not be created.

use crate::clients::{DnsProvider, OperationOutcome, ProviderRecord};
use crate::config::DesiredConfig;
use crate::error::Error;
use crate::ip::IpSource;
use std::collections::HashMap;
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};

/// What has to happen to one desired domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Provider already points the domain at the current IP
    NoOp,
    /// Provider has no A-record for the domain
    Add,
    /// Provider points the domain elsewhere; `old_ip` is the value seen at diff time
    Replace { old_ip: String },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::NoOp => "NoOp",
            Action::Add => "Add",
            Action::Replace { .. } => "Replace",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedAction {
    pub domain: String,
    pub action: Action,
}

/// Outcome of one desired domain in a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub domain: String,
    pub action: Action,
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub current_ip: Ipv4Addr,
    pub entries: Vec<ReportEntry>,
    /// Domains not processed because the run was interrupted
    pub skipped: Vec<String>,
}

impl RunReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(|e| e.success)
    }

    pub fn failed(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(|e| !e.success)
    }

    pub fn is_complete_success(&self) -> bool {
        self.skipped.is_empty() && self.entries.iter().all(|e| e.success)
    }
}

/// A prerequisite read failed, so the run was aborted before any write
#[derive(thiserror::Error, Debug)]
pub enum RunError {
    #[error("could not determine the current external IP: {0}")]
    IpDiscovery(#[source] Error),

    #[error("could not list records at the provider: {0}")]
    ListRecords(#[source] Error),
}

/// Receives each domain's outcome as soon as it is known
pub trait OutcomeRecorder {
    fn record(&mut self, entry: &ReportEntry);
}

impl OutcomeRecorder for Vec<ReportEntry> {
    fn record(&mut self, entry: &ReportEntry) {
        self.push(entry.clone());
    }
}

/// Map each listed domain to its IP. Later entries for the same name win.
pub fn index_records(listing: &[ProviderRecord]) -> HashMap<&str, &str> {
    let mut current = HashMap::with_capacity(listing.len());
    for record in listing {
        if let Some(previous) = current.insert(record.record.as_str(), record.value.as_str()) {
            log::debug!(
                "{} listed more than once, using {} over {}",
                record.record,
                record.value,
                previous
            );
        }
    }
    current
}

/// Classify every desired domain, preserving the desired order.
pub fn plan(desired: &[String], listing: &[ProviderRecord], current_ip: Ipv4Addr) -> Vec<PlannedAction> {
    let current = index_records(listing);

    desired
        .iter()
        .map(|domain| {
            let action = match current.get(domain.as_str()) {
                None => Action::Add,
                Some(value) if same_ip(value, current_ip) => Action::NoOp,
                Some(value) => Action::Replace {
                    old_ip: value.to_string(),
                },
            };
            log::debug!("{}: {}", domain, action);
            PlannedAction {
                domain: domain.clone(),
                action,
            }
        })
        .collect()
}

fn same_ip(value: &str, ip: Ipv4Addr) -> bool {
    value.trim().parse::<Ipv4Addr>().map_or(false, |v| v == ip)
}

/// Drives one reconciliation run against a provider
pub struct Reconciler<'a> {
    provider: &'a dyn DnsProvider,
    recorder: &'a mut dyn OutcomeRecorder,
    dry_run: bool,
    stop: Option<&'a AtomicBool>,
}

impl<'a> Reconciler<'a> {
    pub fn new(provider: &'a dyn DnsProvider, recorder: &'a mut dyn OutcomeRecorder) -> Self {
        Self {
            provider,
            recorder,
            dry_run: false,
            stop: None,
        }
    }

    /// Plan and report, but never write to the provider
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Checked before each domain; once set, the remaining domains are skipped
    pub fn stop_flag(mut self, stop: &'a AtomicBool) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn run(&mut self, desired: &DesiredConfig, ip_source: &dyn IpSource) -> Result<RunReport, RunError> {
        let current_ip = ip_source.current_ip().map_err(RunError::IpDiscovery)?;
        log::info!("Current external IP is {}", current_ip);

        let listing = self.provider.list_records().map_err(RunError::ListRecords)?;
        log::info!(
            "{} reports {} A-records",
            self.provider.provider_name(),
            listing.len()
        );

        let actions = plan(&desired.domains, &listing, current_ip);
        Ok(self.apply(actions, current_ip))
    }

    /// Execute planned actions in order.
    pub fn apply(&mut self, actions: Vec<PlannedAction>, current_ip: Ipv4Addr) -> RunReport {
        let mut entries = Vec::with_capacity(actions.len());
        let mut skipped = Vec::new();

        for planned in actions {
            if self.stop_requested() {
                skipped.push(planned.domain);
                continue;
            }

            let entry = if self.dry_run {
                self.describe(planned, current_ip)
            } else {
                self.execute(planned, current_ip)
            };

            self.recorder.record(&entry);
            entries.push(entry);
        }

        if !skipped.is_empty() {
            log::warn!("Interrupted, {} domain(s) not processed", skipped.len());
        }

        RunReport {
            current_ip,
            entries,
            skipped,
        }
    }

    fn stop_requested(&self) -> bool {
        self.stop.map_or(false, |s| s.load(Ordering::SeqCst))
    }

    fn describe(&self, planned: PlannedAction, current_ip: Ipv4Addr) -> ReportEntry {
        let message = match &planned.action {
            Action::NoOp => "already current".to_string(),
            Action::Add => format!("test mode: would add {}", current_ip),
            Action::Replace { old_ip } => {
                format!("test mode: would add {} then remove {}", current_ip, old_ip)
            }
        };
        ReportEntry {
            domain: planned.domain,
            action: planned.action,
            success: true,
            message,
        }
    }

    fn execute(&self, planned: PlannedAction, current_ip: Ipv4Addr) -> ReportEntry {
        let PlannedAction { domain, action } = planned;

        let (success, message) = match &action {
            Action::NoOp => {
                log::info!("{} is already set to {}", domain, current_ip);
                (true, "already current".to_string())
            }
            Action::Add => {
                log::info!("{} has no A-record, adding {}", domain, current_ip);
                let outcome = flatten(self.provider.add_record(&domain, current_ip));
                (outcome.success, outcome.message)
            }
            Action::Replace { old_ip } => {
                log::info!("{} has an old IP of {}, changing to {}", domain, old_ip, current_ip);
                self.replace(&domain, old_ip, current_ip)
            }
        };

        if !success {
            log::warn!("{}: {} failed: {}", domain, action, message);
        }

        ReportEntry {
            domain,
            action,
            success,
            message,
        }
    }

    fn replace(&self, domain: &str, old_ip: &str, current_ip: Ipv4Addr) -> (bool, String) {
        let added = flatten(self.provider.add_record(domain, current_ip));
        if !added.success {
            return (
                false,
                format!("add of {} failed, kept {}: {}", current_ip, old_ip, added.message),
            );
        }

        let removed = flatten(self.provider.remove_record(domain, old_ip));
        if removed.success {
            (
                true,
                format!("{}; removed {}: {}", added.message, old_ip, removed.message),
            )
        } else {
            (
                false,
                format!(
                    "added {} but could not remove {}: {}",
                    current_ip, old_ip, removed.message
                ),
            )
        }
    }
}

/// A write that could not be delivered counts as a failed outcome for its domain.
fn flatten(result: crate::error::Result<OperationOutcome>) -> OperationOutcome {
    result.unwrap_or_else(|e| {
        if e.is_network() {
            log::warn!("Provider unreachable: {}", e);
        }
        OperationOutcome::failure(e.to_string())
    })
}
