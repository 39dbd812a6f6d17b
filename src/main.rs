// main.rs - droprust entry point
// Purpose: Parse arguments, scan every target and print a run summary

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use droprust::cli::{Cli, Command, ScanArgs};
use droprust::output::{Output, StandardOutput};
use droprust::probe::HttpTransport;
use droprust::report::{display_scan_report, render_json, save_reports_to_file};
use droprust::scan::Scanner;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Scan(args) => {
            let failed = run_scan(&args).await?;
            if failed > 0 {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn print_banner() {
    println!("{}", "═══════════════════════════════════════════════════════════════".cyan().bold());
    println!("{}", format!("  droprust v{} - CMS Fingerprinting Scanner", env!("CARGO_PKG_VERSION")).white().bold());
    println!("{}", "═══════════════════════════════════════════════════════════════\n".cyan().bold());
}

/// Scan every target; returns the number of targets that failed
async fn run_scan(args: &ScanArgs) -> Result<usize> {
    let output: Arc<dyn Output> = if args.json {
        Arc::new(StandardOutput::quiet())
    } else {
        print_banner();
        Arc::new(StandardOutput::new())
    };

    let options = args.scan_options()?;
    let targets = args.targets(output.as_ref())?;
    if targets.is_empty() {
        eprintln!("{}", "[ERROR] No valid targets to scan".red().bold());
        eprintln!("{}", "  Make sure the file contains one URL per line".yellow());
        eprintln!("{}", "  Lines starting with # are treated as comments".yellow());
        return Ok(1);
    }

    output.info(&format!(
        "Scanning {} target(s) for {} with {} threads",
        targets.len(),
        args.cms,
        options.threads
    ));

    let transport = HttpTransport::new().context("Failed to initialize HTTP client")?;
    let scanner = Scanner::new(args.cms, Arc::new(transport), Arc::clone(&output), options);

    let json = args.json;
    let total = targets.len();
    let mut index = 0;
    let summary = scanner
        .scan_all(&targets, |target, result| {
            index += 1;
            match result {
                Ok(report) => {
                    if !json {
                        display_scan_report(report);
                    }
                }
                Err(e) => {
                    let verdict = if e.is_fatal_for_target() {
                        "skipped"
                    } else {
                        "failed"
                    };
                    eprintln!(
                        "{}",
                        format!("[!] Target [{}/{}] {} {}: {}", index, total, target, verdict, e).red().bold()
                    );
                }
            }
        })
        .await;

    if json {
        println!("{}", render_json(&summary.reports)?);
    }

    if let Some(path) = &args.output {
        save_reports_to_file(&summary.reports, path)?;
        output.info(&format!("Reports saved to {}", path.display()));
    }

    if !json {
        println!("{}", "═══════════════════════════════════════════════════════════════".yellow().bold());
        println!("{}", "  SCAN SUMMARY".yellow().bold());
        println!("{}", "═══════════════════════════════════════════════════════════════".yellow().bold());
        println!("{}", format!("Total targets:  {}", total).white());
        println!("{}", format!("[+] Scanned:    {}", summary.reports.len()).green());
        println!("{}", format!("[!] Failed:     {}", summary.failures.len()).red());
        println!("{}", "═══════════════════════════════════════════════════════════════\n".yellow().bold());
    }

    Ok(summary.failures.len())
}
