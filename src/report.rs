// report.rs - Scan report rendering
// Purpose: Colored console summary per target, JSON export and plain text files

use crate::enumerate::{Enumeration, PluginHit};
use crate::scan::ScanReport;
use anyhow::{Context, Result};
use colored::*;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

const RULE: &str = "═══════════════════════════════════════════════════════════════";

fn display_folders(label: &str, enumeration: &Option<Enumeration<PluginHit>>) {
    let Some(enumeration) = enumeration else {
        return;
    };

    if enumeration.is_empty {
        println!("{}", format!("[*] No {} found.", label).cyan());
    } else {
        println!("{}", format!("[+] {} found:", capitalize(label)).green().bold());
        for hit in &enumeration.hits {
            println!("{}", format!("    {}", hit.name).green());
            println!("{}", format!("        {}", hit.url).cyan());
        }
    }
    if enumeration.inconclusive > 0 {
        println!(
            "{}",
            format!("    ({} inconclusive requests)", enumeration.inconclusive).yellow()
        );
    }
    println!();
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Display one target's results
pub fn display_scan_report(report: &ScanReport) {
    println!("\n{}", RULE.yellow().bold());
    println!("{}", format!("  {} SCAN: {}", report.cms.to_string().to_uppercase(), report.target).yellow().bold());
    println!("{}", RULE.yellow().bold());

    let origin = if report.method_detected { "detected" } else { "forced" };
    println!("{}", format!("Scanning method: {} ({})", report.scanning_method, origin).cyan());
    if let Some(from) = &report.redirected_from {
        println!("{}", format!("Redirected from: {}", from).cyan());
    }
    println!();

    display_folders("plugins", &report.plugins);
    display_folders("themes", &report.themes);

    if let Some(version) = &report.version {
        match &version.version {
            Some(found) => {
                println!("{}", format!("[+] Possible version: {}", found).green().bold());
                if version.candidates.len() > 1 {
                    println!("{}", format!("    Candidates: {}", version.candidates.join(", ")).cyan());
                }
            }
            None => println!("{}", "[*] No version could be determined.".cyan()),
        }
        println!();
    }

    if let Some(interesting) = &report.interesting {
        if interesting.is_empty {
            println!("{}", "[*] No interesting urls found.".cyan());
        } else {
            println!("{}", "[+] Interesting urls found:".green().bold());
            for hit in &interesting.hits {
                println!("{}", format!("    {} - {}", hit.url, hit.description).green());
            }
        }
        println!();
    }

    for error in &report.errors {
        println!("{}", format!("[!] {}", error).red());
    }

    println!("{}", RULE.yellow().bold());
}

pub fn render_json(reports: &[ScanReport]) -> Result<String> {
    serde_json::to_string_pretty(reports).context("Failed to serialize scan reports")
}

/// Plain text version of a report, written next to the JSON export
pub fn write_scan_report<W: Write>(out: &mut W, report: &ScanReport) -> Result<()> {
    writeln!(out, "=== {} SCAN: {} ===", report.cms.to_string().to_uppercase(), report.target)?;
    writeln!(out, "Scanned at: {}", report.scanned_at.to_rfc3339())?;
    writeln!(out, "Scanning method: {}", report.scanning_method)?;
    if let Some(from) = &report.redirected_from {
        writeln!(out, "Redirected from: {}", from)?;
    }

    for (label, enumeration) in [("PLUGINS", &report.plugins), ("THEMES", &report.themes)] {
        if let Some(enumeration) = enumeration {
            writeln!(out)?;
            writeln!(out, "{} ({}):", label, enumeration.hits.len())?;
            for hit in &enumeration.hits {
                writeln!(out, "  {} {}", hit.name, hit.url)?;
            }
        }
    }

    if let Some(version) = &report.version {
        writeln!(out)?;
        writeln!(
            out,
            "VERSION: {}",
            version.version.as_deref().unwrap_or("unknown")
        )?;
    }

    if let Some(interesting) = &report.interesting {
        writeln!(out)?;
        writeln!(out, "INTERESTING URLS ({}):", interesting.hits.len())?;
        for hit in &interesting.hits {
            writeln!(out, "  {} - {}", hit.url, hit.description)?;
        }
    }

    for error in &report.errors {
        writeln!(out, "ERROR: {}", error)?;
    }

    Ok(())
}

/// Save reports as JSON, plus a text summary with the same stem
pub fn save_reports_to_file(reports: &[ScanReport], output_file: &Path) -> Result<()> {
    let json = render_json(reports)?;
    fs::write(output_file, json).context(format!("Failed to write scan reports to {:?}", output_file))?;

    let txt_file = output_file.with_extension("txt");
    let mut file = File::create(&txt_file)
        .context(format!("Failed to create scan report text file: {:?}", txt_file))?;
    for report in reports {
        write_scan_report(&mut file, report)?;
        writeln!(file)?;
    }

    Ok(())
}
