mod args;
mod clients;
mod config;
mod engine;
mod error;
mod ip;
mod outcome_log;

use clients::DnsProvider;
use engine::{Reconciler, ReportEntry};
use outcome_log::FileRecorder;
use std::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// User-Agent header value for HTTP requests
pub const USER_AGENT: &str = concat!("dreamhostdns/", env!("CARGO_PKG_VERSION"));

fn init_logger(verbose: bool, test: bool, debug: bool, quiet: bool) {
    let log_level = if quiet {
        log::LevelFilter::Error
    } else if debug {
        log::LevelFilter::Debug
    } else if verbose || test {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    };

    env_logger::builder()
        .filter(None, log_level)
        .init();
}

fn ip_source(config: &config::Config) -> ip::IpDetectionMethod {
    match &config.ip {
        Some(manual) => ip::IpDetectionMethod::Manual(manual.clone()),
        None => ip::IpDetectionMethod::Web {
            url: config
                .ip_service
                .clone()
                .unwrap_or_else(|| ip::DEFAULT_IP_SERVICE.to_string()),
            timeout: config.timeout,
        },
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = args::Args::new();
    let test = args.test;

    init_logger(args.verbose, test, args.debug, args.quiet);

    // Load and merge configuration
    let config = config::Config::load(&args)?;
    config.validate()?;

    let mut file_recorder = if config.no_log_file {
        None
    } else {
        let recorder = FileRecorder::new(config.log_file.clone())?;
        log::info!("Logging outcomes to {}", recorder.path().display());
        Some(recorder)
    };

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        if let Err(e) = ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst)) {
            log::warn!("Could not install interrupt handler: {}", e);
        }
    }

    let desired = config.desired();
    let client = clients::dreamhost::DreamhostClient::new(&desired.api_key, &config)?;
    log::info!(
        "Starting {} DNS updater for {} domain(s){}",
        client.provider_name(),
        desired.domains.len(),
        if test { " in test mode" } else { "" }
    );
    if let Some(file) = file_recorder.as_mut() {
        file.info(&format!("Starting run for {}", desired.domains.join(", ")));
    }

    let mut discarded: Vec<ReportEntry> = Vec::new();
    let result = {
        let recorder: &mut dyn engine::OutcomeRecorder = match file_recorder.as_mut() {
            Some(file) => file,
            None => &mut discarded,
        };
        let mut reconciler = Reconciler::new(&client, recorder)
            .dry_run(test)
            .stop_flag(&stop);
        let source = ip_source(&config);
        reconciler.run(&desired, &source)
    };

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            log::error!("{}", e);
            if let Some(file) = file_recorder.as_mut() {
                file.error(&e.to_string());
            }
            return Err(e.into());
        }
    };

    for entry in &report.entries {
        let status = if entry.success { "ok" } else { "FAILED" };
        println!("{:<7} {:<8} {} ({})", status, entry.action.name(), entry.domain, entry.message);
    }
    for domain in &report.skipped {
        println!("{:<7} {:<8} {}", "skipped", "-", domain);
    }

    let succeeded = report.succeeded().count();
    let failed = report.failed().count();
    let summary = format!(
        "IP {}: {} succeeded, {} failed, {} skipped",
        report.current_ip,
        succeeded,
        failed,
        report.skipped.len()
    );
    log::info!("{}", summary);
    if let Some(file) = file_recorder.as_mut() {
        file.info(&summary);
    }

    if report.is_complete_success() {
        Ok(())
    } else {
        Err(summary.into())
    }
}
