// cli.rs - Command line interface
// Purpose: Parse arguments and turn them into scan options and a target list

use crate::cms::Cms;
use crate::detect::{ScanningMethod, DEFAULT_LENGTH_TOLERANCE};
use crate::output::Output;
use crate::pool::DEFAULT_WORKERS;
use crate::probe::Verb;
use crate::scan::{Enumerate, ScanOptions, DEFAULT_TIMEOUT_SECS};
use crate::target::{load_targets, Target};
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// droprust - CMS plugin, theme and version scanner
#[derive(Parser, Debug)]
#[command(
    name = "droprust",
    version,
    about = "Fingerprint CMS installations: plugins, themes, version and interesting files",
    long_about = r#"
╔═══════════════════════════════════════════════════════════════════════════════╗
║                      DROPRUST - CMS Fingerprinting Scanner                     ║
╚═══════════════════════════════════════════════════════════════════════════════╝

droprust works out how a server answers for existing and missing folders, then
enumerates plugins and themes against that signal:

  • forbidden   existing folders answer 403
  • ok          existing folders answer 200
  • not_found   folders answer 404, a README inside the folder is probed instead

SUPPORTED CMS: drupal, silverstripe

═══════════════════════════════════════════════════════════════════════════════

EXAMPLES:

  Full scan of one site:
    droprust scan drupal -u https://example.com

  Plugins and themes only, 30 concurrent requests:
    droprust scan drupal -u https://example.com -e p,t -t 30

  Many sites, JSON output:
    droprust scan drupal -U targets.txt --json

  Skip detection and use GET requests:
    droprust scan drupal -u https://example.com --method not_found --verb get

═══════════════════════════════════════════════════════════════════════════════
"#
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan one or more targets
    Scan(ScanArgs),
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// CMS to scan for
    #[arg(value_enum)]
    pub cms: Cms,

    // ═══════════════════════════════════════════════════════════════════════════
    // TARGET OPTIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Target base URL (e.g., https://example.com/)
    #[arg(short = 'u', long, value_name = "URL", help_heading = "Target Options",
          required_unless_present = "url_file", conflicts_with = "url_file")]
    pub url: Option<String>,

    #[arg(short = 'U', long, value_name = "FILE", help_heading = "Target Options",
          help = "File containing targets (one URL per line, # for comments)")]
    pub url_file: Option<PathBuf>,

    // ═══════════════════════════════════════════════════════════════════════════
    // SCAN OPTIONS
    // ═══════════════════════════════════════════════════════════════════════════

    #[arg(short, long, value_enum, value_delimiter = ',', default_value = "a",
          value_name = "p,t,v,i,a", help_heading = "Scan Options",
          help = "Enumerations to run: plugins, themes, version, interesting urls, all")]
    pub enumerate: Vec<Enumerate>,

    #[arg(long, value_enum, help_heading = "Scan Options",
          help = "Skip scanning method detection and use this method")]
    pub method: Option<ScanningMethod>,

    /// HTTP verb used for probes
    #[arg(long, value_enum, default_value_t = Verb::Head, help_heading = "Scan Options")]
    pub verb: Verb,

    /// Maximum number of wordlist entries per enumeration
    #[arg(short, long, value_name = "NUM", help_heading = "Scan Options")]
    pub number: Option<usize>,

    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_LENGTH_TOLERANCE,
          help_heading = "Scan Options",
          help = "Minimum size difference between a real file and a missing page answering 200")]
    pub length_tolerance: u64,

    // ═══════════════════════════════════════════════════════════════════════════
    // WORDLISTS & TEMPLATES
    // ═══════════════════════════════════════════════════════════════════════════

    #[arg(long, value_name = "TEMPLATE", help_heading = "Wordlists & Templates",
          help = "Plugin folder template with two %s slots (target, name); repeatable")]
    pub plugins_base_url: Vec<String>,

    #[arg(long, value_name = "TEMPLATE", help_heading = "Wordlists & Templates",
          help = "Theme folder template with two %s slots (target, name); repeatable")]
    pub themes_base_url: Vec<String>,

    #[arg(long, value_name = "FILE", help_heading = "Wordlists & Templates")]
    pub plugins_file: Option<PathBuf>,

    #[arg(long, value_name = "FILE", help_heading = "Wordlists & Templates")]
    pub themes_file: Option<PathBuf>,

    #[arg(long, value_name = "FILE", help_heading = "Wordlists & Templates",
          help = "Version fingerprint corpus (XML)")]
    pub versions_file: Option<PathBuf>,

    // ═══════════════════════════════════════════════════════════════════════════
    // PERFORMANCE
    // ═══════════════════════════════════════════════════════════════════════════

    /// Number of concurrent requests
    #[arg(short, long, default_value_t = DEFAULT_WORKERS, value_name = "NUM", help_heading = "Performance")]
    pub threads: usize,

    /// Per request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, value_name = "SECONDS", help_heading = "Performance")]
    pub timeout: u64,

    // ═══════════════════════════════════════════════════════════════════════════
    // OUTPUT
    // ═══════════════════════════════════════════════════════════════════════════

    #[arg(long, help_heading = "Output")]
    pub hide_progressbar: bool,

    /// Print reports as JSON instead of colored text
    #[arg(long, help_heading = "Output")]
    pub json: bool,

    #[arg(short, long, value_name = "FILE", help_heading = "Output",
          help = "Save reports as JSON (and a .txt summary next to it)")]
    pub output: Option<PathBuf>,
}

impl ScanArgs {
    pub fn scan_options(&self) -> Result<ScanOptions> {
        if self.threads == 0 {
            bail!("--threads must be at least 1");
        }
        if self.timeout == 0 {
            bail!("--timeout must be at least 1 second");
        }

        let overrides = |templates: &[String]| (!templates.is_empty()).then(|| templates.to_vec());

        Ok(ScanOptions {
            verb: self.verb,
            timeout: Duration::from_secs(self.timeout),
            threads: self.threads,
            number: self.number,
            method: self.method,
            enumerate: self.enumerate.clone(),
            plugins_base_url: overrides(&self.plugins_base_url),
            themes_base_url: overrides(&self.themes_base_url),
            plugins_file: self.plugins_file.clone(),
            themes_file: self.themes_file.clone(),
            versions_file: self.versions_file.clone(),
            length_tolerance: self.length_tolerance,
            progress: !self.hide_progressbar && !self.json,
        })
    }

    /// Targets from --url, or from --url-file with malformed lines skipped
    pub fn targets(&self, output: &dyn Output) -> Result<Vec<Target>> {
        if let Some(url) = &self.url {
            let target = Target::parse(url)?;
            return Ok(vec![target]);
        }

        match &self.url_file {
            Some(path) => load_targets(path, output)
                .context(format!("Failed to read targets from {:?}", path)),
            None => bail!("either --url or --url-file is required"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::RecordingOutput;
    use std::io::Write;

    fn parse(args: &[&str]) -> ScanArgs {
        let mut argv = vec!["droprust", "scan"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Scan(args) => args,
        }
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["drupal", "-u", "http://example.com"]);
        let options = args.scan_options().unwrap();

        assert_eq!(args.cms, Cms::Drupal);
        assert_eq!(options.threads, 4);
        assert_eq!(options.timeout, Duration::from_secs(15));
        assert_eq!(options.verb, Verb::Head);
        assert_eq!(options.enumerate, vec![Enumerate::All]);
        assert_eq!(options.method, None);
        assert_eq!(options.plugins_base_url, None);
        assert_eq!(options.length_tolerance, 100);
    }

    #[test]
    fn test_scan_flags() {
        let args = parse(&[
            "silverstripe",
            "-u",
            "http://example.com",
            "-t",
            "30",
            "--timeout",
            "5",
            "--verb",
            "get",
            "--method",
            "not_found",
            "-e",
            "p,t",
            "-n",
            "0",
            "--plugins-base-url",
            "%smodules/%s/",
            "--plugins-base-url",
            "%sextra/%s/",
        ]);
        let options = args.scan_options().unwrap();

        assert_eq!(args.cms, Cms::Silverstripe);
        assert_eq!(options.threads, 30);
        assert_eq!(options.timeout, Duration::from_secs(5));
        assert_eq!(options.verb, Verb::Get);
        assert_eq!(options.method, Some(ScanningMethod::NotFound));
        assert_eq!(options.enumerate, vec![Enumerate::Plugins, Enumerate::Themes]);
        assert_eq!(options.number, Some(0));
        assert_eq!(
            options.plugins_base_url,
            Some(vec!["%smodules/%s/".to_string(), "%sextra/%s/".to_string()])
        );
    }

    #[test]
    fn test_requires_a_target() {
        assert!(Cli::try_parse_from(["droprust", "scan", "drupal"]).is_err());
        assert!(Cli::try_parse_from(["droprust", "scan", "joomla", "-u", "http://example.com"]).is_err());
    }

    #[test]
    fn test_targets_from_file_skip_malformed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "http://one.example.com").unwrap();
        writeln!(file, "not a url").unwrap();
        writeln!(file, "# comment").unwrap();
        writeln!(file, "https://two.example.com/drupal").unwrap();

        let path = file.path().to_string_lossy().to_string();
        let args = parse(&["drupal", "-U", &path]);
        let output = RecordingOutput::default();
        let targets = args.targets(&output).unwrap();

        assert_eq!(targets.len(), 2);
        assert_eq!(targets[1].as_str(), "https://two.example.com/drupal/");
        assert_eq!(output.warnings().len(), 1);
    }

    #[test]
    fn test_rejects_zero_threads() {
        let args = parse(&["drupal", "-u", "http://example.com", "-t", "0"]);
        assert!(args.scan_options().is_err());
    }
}
