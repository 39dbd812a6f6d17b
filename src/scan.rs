// scan.rs - Scan orchestration
// Purpose: Run detection once per target, then the requested enumerations, sharing one
//          HTTP client and one worker pool across every probe of the run

use crate::cms::Cms;
use crate::detect::{determine_scanning_method, Detection, ScanningMethod, DEFAULT_LENGTH_TOLERANCE};
use crate::enumerate::{enumerate, EnumerateRequest, Enumeration, PluginHit};
use crate::error::{Result, ScanError};
use crate::interesting::{enumerate_interesting, InterestingHit};
use crate::output::Output;
use crate::pool::{WorkerPool, DEFAULT_WORKERS};
use crate::probe::{Prober, Transport, Verb};
use crate::target::Target;
use crate::version::{enumerate_version, VersionCorpus, VersionResult};
use crate::wordlist::read_lines;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Which enumerations to run against each target
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Enumerate {
    #[value(name = "p", alias = "plugins")]
    Plugins,
    #[value(name = "t", alias = "themes")]
    Themes,
    #[value(name = "v", alias = "version")]
    Version,
    #[value(name = "i", alias = "interesting")]
    Interesting,
    #[value(name = "a", alias = "all")]
    All,
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub verb: Verb,
    pub timeout: Duration,
    pub threads: usize,
    /// Cap on wordlist entries per enumeration
    pub number: Option<usize>,
    /// Skip detection and use this method
    pub method: Option<ScanningMethod>,
    pub enumerate: Vec<Enumerate>,
    pub plugins_base_url: Option<Vec<String>>,
    pub themes_base_url: Option<Vec<String>>,
    pub plugins_file: Option<PathBuf>,
    pub themes_file: Option<PathBuf>,
    pub versions_file: Option<PathBuf>,
    pub length_tolerance: u64,
    pub progress: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            verb: Verb::Head,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            threads: DEFAULT_WORKERS,
            number: None,
            method: None,
            enumerate: vec![Enumerate::All],
            plugins_base_url: None,
            themes_base_url: None,
            plugins_file: None,
            themes_file: None,
            versions_file: None,
            length_tolerance: DEFAULT_LENGTH_TOLERANCE,
            progress: false,
        }
    }
}

impl ScanOptions {
    pub fn wants(&self, kind: Enumerate) -> bool {
        self.enumerate
            .iter()
            .any(|e| *e == kind || *e == Enumerate::All)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub target: Target,
    pub cms: Cms,
    pub scanned_at: DateTime<Utc>,
    pub scanning_method: ScanningMethod,
    /// False when the method came from --method
    pub method_detected: bool,
    pub redirected_from: Option<Target>,
    pub plugins: Option<Enumeration<PluginHit>>,
    pub themes: Option<Enumeration<PluginHit>>,
    pub version: Option<VersionResult>,
    pub interesting: Option<Enumeration<InterestingHit>>,
    /// Enumerations that could not run (missing wordlist, bad template, bad corpus)
    pub errors: Vec<String>,
}

#[derive(Debug)]
pub struct TargetFailure {
    pub target: Target,
    pub error: ScanError,
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub reports: Vec<ScanReport>,
    pub failures: Vec<TargetFailure>,
}

/// Version corpus, loaded on first use and shared by every target of the run
enum CorpusState {
    Loaded(VersionCorpus),
    /// No --versions-file and no bundled corpus for this CMS
    Unavailable,
    Invalid(String),
}

pub struct Scanner {
    cms: Cms,
    prober: Prober,
    pool: WorkerPool,
    output: Arc<dyn Output>,
    options: ScanOptions,
    corpus: OnceLock<CorpusState>,
}

impl Scanner {
    pub fn new(cms: Cms, transport: Arc<dyn Transport>, output: Arc<dyn Output>, options: ScanOptions) -> Self {
        Self {
            cms,
            prober: Prober::new(transport, Arc::clone(&output)),
            pool: WorkerPool::new(options.threads),
            output,
            options,
            corpus: OnceLock::new(),
        }
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub async fn scan(&self, target: &Target) -> Result<ScanReport> {
        let profile = self.cms.profile();
        let scanned_at = Utc::now();

        let detection = match self.options.method {
            Some(method) => Detection {
                method,
                target: target.clone(),
                redirected: false,
            },
            None => {
                determine_scanning_method(
                    &self.prober,
                    target,
                    &profile.detection_paths(),
                    self.options.verb,
                    self.options.timeout,
                    self.options.length_tolerance,
                )
                .await?
            }
        };
        self.output.info(&format!(
            "{} uses scanning method '{}'",
            detection.target, detection.method
        ));

        let base = &detection.target;
        let mut errors = Vec::new();

        let plugins = if self.options.wants(Enumerate::Plugins) {
            let templates = self
                .options
                .plugins_base_url
                .clone()
                .unwrap_or_else(|| profile.default_plugins_base_url());
            let wordlist = self
                .options
                .plugins_file
                .clone()
                .unwrap_or_else(|| PathBuf::from(profile.plugins_file));
            let result = self
                .enumerate_folders(base, detection.method, &templates, wordlist, "plugins")
                .await;
            self.record(result, "plugins", &mut errors)
        } else {
            None
        };

        let themes = if self.options.wants(Enumerate::Themes) {
            let templates = self
                .options
                .themes_base_url
                .clone()
                .unwrap_or_else(|| profile.default_themes_base_url());
            let wordlist = self
                .options
                .themes_file
                .clone()
                .unwrap_or_else(|| PathBuf::from(profile.themes_file));
            let result = self
                .enumerate_folders(base, detection.method, &templates, wordlist, "themes")
                .await;
            self.record(result, "themes", &mut errors)
        } else {
            None
        };

        let version = if self.options.wants(Enumerate::Version) {
            match self.corpus.get_or_init(|| self.load_corpus()) {
                CorpusState::Loaded(corpus) => {
                    Some(enumerate_version(&self.prober, &self.pool, base, corpus, self.options.timeout).await)
                }
                CorpusState::Unavailable => None,
                CorpusState::Invalid(reason) => {
                    self.record::<VersionResult>(Err(ScanError::Corpus(reason.clone())), "version", &mut errors)
                }
            }
        } else {
            None
        };

        let interesting = if self.options.wants(Enumerate::Interesting) {
            Some(
                enumerate_interesting(
                    &self.prober,
                    &self.pool,
                    base,
                    &profile.interesting(),
                    self.options.verb,
                    self.options.timeout,
                    self.options.progress,
                )
                .await,
            )
        } else {
            None
        };

        Ok(ScanReport {
            target: detection.target.clone(),
            cms: self.cms,
            scanned_at,
            scanning_method: detection.method,
            method_detected: self.options.method.is_none(),
            redirected_from: detection.redirected.then(|| target.clone()),
            plugins,
            themes,
            version,
            interesting,
            errors,
        })
    }

    /// Scan targets one after another. A failing target is recorded and the batch moves on.
    pub async fn scan_all<F>(&self, targets: &[Target], mut on_done: F) -> BatchSummary
    where
        F: FnMut(&Target, std::result::Result<&ScanReport, &ScanError>),
    {
        let mut summary = BatchSummary::default();

        for target in targets {
            match self.scan(target).await {
                Ok(report) => {
                    on_done(target, Ok(&report));
                    summary.reports.push(report);
                }
                Err(error) => {
                    on_done(target, Err(&error));
                    summary.failures.push(TargetFailure {
                        target: target.clone(),
                        error,
                    });
                }
            }
        }

        summary
    }

    async fn enumerate_folders(
        &self,
        target: &Target,
        method: ScanningMethod,
        templates: &[String],
        wordlist: PathBuf,
        label: &str,
    ) -> Result<Enumeration<PluginHit>> {
        let candidates = read_lines(&wordlist, self.options.number)?;
        let request = EnumerateRequest {
            target,
            base_url_templates: templates,
            scanning_method: method,
            verb: self.options.verb,
            timeout: self.options.timeout,
            module_readme_file: self.cms.profile().module_readme_file,
            label,
            progress: self.options.progress,
        };

        enumerate(&self.prober, &self.pool, &request, candidates).await
    }

    fn load_corpus(&self) -> CorpusState {
        let (path, explicit) = match &self.options.versions_file {
            Some(path) => (path.clone(), true),
            None => (PathBuf::from(self.cms.profile().versions_file), false),
        };

        if !explicit && !path.exists() {
            self.output.info(&format!(
                "No version corpus at {}, skipping version detection (use --versions-file)",
                path.display()
            ));
            return CorpusState::Unavailable;
        }

        match VersionCorpus::load(&path) {
            Ok(corpus) => CorpusState::Loaded(corpus),
            Err(ScanError::Corpus(reason)) => CorpusState::Invalid(reason),
            Err(e) => CorpusState::Invalid(e.to_string()),
        }
    }

    fn record<T>(&self, result: Result<T>, label: &str, errors: &mut Vec<String>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                let message = format!("{} enumeration skipped: {}", label, e);
                self.output.warn(&message);
                errors.push(message);
                None
            }
        }
    }
}
