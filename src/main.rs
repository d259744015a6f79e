//! Network Speed Tester - Main CLI Application
//!
//! Measures latency, jitter and throughput against a Cloudflare-style speed
//! test service. The report goes to stdout, diagnostics to stderr.

use clap::Parser;
use network_speed_tester::{
    app::{report_outcome, App},
    cli::Cli,
    config::load_config,
    error::{AppError, ErrorReporter, Result},
    executor::CancellationHandle,
    output::OutputFormatterFactory,
};
use std::error::Error;
use std::process;

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        eprintln!("Please report this issue with the output of `nst --debug`");
        process::exit(1);
    }));

    let cli = Cli::parse();
    let use_color = cli.use_colors();
    let verbose = cli.verbose || cli.debug;

    if let Err(e) = run_application(cli).await {
        ErrorReporter::new(use_color, verbose).report_error(&e);

        if let Some(source) = e.source() {
            eprintln!("Caused by: {}", source);
        }

        print_error_suggestions(&e);

        process::exit(e.exit_code());
    }
}

async fn run_application(cli: Cli) -> Result<()> {
    if cli.debug {
        eprintln!("{}", network_speed_tester::build_info());
        eprintln!("Debug mode enabled");
    }

    let config = load_config(cli)?;

    let (handle, signal) = CancellationHandle::new();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupt received, finishing in-flight trials...");
            handle.cancel();
        }
    });

    let report = App::new(config.clone()).run(signal).await?;

    let formatter = OutputFormatterFactory::create(&config);
    println!("{}", formatter.format_report(&report)?);

    if report.is_partial() {
        let message = if report.cancelled {
            "run was cancelled; report contains partial results".to_string()
        } else {
            format!(
                "{} of {} tests produced no usable samples",
                report.failures.len(),
                report.requested_specs
            )
        };
        eprintln!("{}", formatter.format_warning(&message));
    }

    report_outcome(&report)
}

/// Print helpful suggestions for common errors
fn print_error_suggestions(error: &AppError) {
    match error {
        AppError::Config(_) => {
            eprintln!();
            eprintln!("Configuration help:");
            eprintln!("  - Check your .env file format");
            eprintln!("  - Test lists use LABEL:REPETITIONS, e.g. --download 100KB:10,1MB:8");
            eprintln!("  - Valid labels are 100KB, 1MB, 10MB and 25MB");
            eprintln!("  - The base URL must start with http:// or https://");
        }
        AppError::Network(_) | AppError::HttpRequest(_) => {
            eprintln!();
            eprintln!("Network troubleshooting:");
            eprintln!("  - Check your internet connection");
            eprintln!("  - Verify the speed test service is reachable (--base-url)");
            eprintln!("  - Verify firewall or proxy settings");
        }
        AppError::TestExecution(_) | AppError::InsufficientSamples(_) => {
            eprintln!();
            eprintln!("Execution troubleshooting:");
            eprintln!("  - Increase the per-trial deadline with --timeout");
            eprintln!("  - Allow more attempts with --retries");
            eprintln!("  - Skip the largest payloads, e.g. --download 100KB:10,1MB:8");
        }
        _ => {}
    }
}
