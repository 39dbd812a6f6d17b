// enumerate.rs - Plugin/theme enumerator
// Purpose: Probe every (template x candidate) pair through the worker pool and collect hits
// Hits are ordered by template, then candidate, never by completion order.

use crate::detect::ScanningMethod;
use crate::error::Result;
use crate::output::Output;
use crate::pool::WorkerPool;
use crate::probe::{Prober, Verb};
use crate::target::{expand_template, Target};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::collections::HashSet;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginHit {
    pub url: String,
    pub name: String,
}

/// Result of one enumeration call.
#[derive(Debug, Clone, Serialize)]
pub struct Enumeration<H> {
    pub hits: Vec<H>,
    pub is_empty: bool,
    /// Probes that failed at transport level or answered 5xx
    pub inconclusive: usize,
}

impl<H> Enumeration<H> {
    pub fn new(hits: Vec<H>, inconclusive: usize) -> Self {
        let is_empty = hits.is_empty();
        Self {
            hits,
            is_empty,
            inconclusive,
        }
    }
}

/// Outcome of a single probe, as seen by the enumerator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Exists,
    Absent,
    ServerError,
    TransportFailed,
}

impl Outcome {
    pub(crate) fn is_inconclusive(self) -> bool {
        matches!(self, Outcome::ServerError | Outcome::TransportFailed)
    }
}

/// Probe one URL and interpret the status under `method`.
pub(crate) async fn probe_outcome(
    prober: &Prober,
    url: &str,
    method: ScanningMethod,
    verb: Verb,
    timeout: Duration,
) -> Outcome {
    match prober.probe(url, verb, timeout).await {
        Ok(result) if result.is_server_error() => Outcome::ServerError,
        Ok(result) if method.signals_exists(result.status) => Outcome::Exists,
        Ok(_) => Outcome::Absent,
        Err(_) => Outcome::TransportFailed,
    }
}

/// Progress bar for one enumeration; hidden unless requested. Visible bars are handed to
/// the output sink so warnings are printed above them.
pub(crate) fn progress_bar(output: &dyn Output, total: usize, label: &str, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::with_template("    {msg} [{bar:40.cyan/blue}] {pos}/{len}") {
        bar.set_style(style.progress_chars("=> "));
    }
    bar.set_message(label.to_string());
    output.track(bar)
}

/// Warn about probes that could not be evaluated. 5xx responses were already
/// reported by the probe executor, one warning each.
pub(crate) fn report_inconclusive(prober: &Prober, label: &str, outcomes: &[Outcome], hits: usize) {
    let transport_failures = outcomes
        .iter()
        .filter(|o| **o == Outcome::TransportFailed)
        .count();
    let inconclusive = outcomes.iter().filter(|o| o.is_inconclusive()).count();

    if transport_failures > 0 {
        prober.output().warn(&format!(
            "{}: {} of {} requests failed (timeouts or connection errors)",
            label,
            transport_failures,
            outcomes.len()
        ));
    }
    if hits == 0 && inconclusive > 0 {
        prober.output().warn(&format!(
            "{}: nothing found but {} probes were inconclusive; results may be unreliable",
            label, inconclusive
        ));
    }
}

#[derive(Debug, Clone)]
pub struct EnumerateRequest<'a> {
    pub target: &'a Target,
    /// Templates with two '%s' slots: target, candidate name
    pub base_url_templates: &'a [String],
    pub scanning_method: ScanningMethod,
    pub verb: Verb,
    pub timeout: Duration,
    /// File every plugin/theme folder contains, probed under `not_found`
    pub module_readme_file: &'a str,
    pub label: &'a str,
    pub progress: bool,
}

struct Job {
    name: String,
    url: String,
}

pub async fn enumerate<I>(
    prober: &Prober,
    pool: &WorkerPool,
    request: &EnumerateRequest<'_>,
    candidates: I,
) -> Result<Enumeration<PluginHit>>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    let names: Vec<String> = candidates
        .into_iter()
        .filter(|name| seen.insert(name.clone()))
        .collect();

    // Expand everything first so an invalid template fails before any request is sent.
    let mut jobs = Vec::with_capacity(names.len() * request.base_url_templates.len());
    for template in request.base_url_templates {
        for name in &names {
            let folder_url = expand_template(template, request.target, name)?;
            let url = match request.scanning_method {
                ScanningMethod::NotFound => format!("{}{}", folder_url, request.module_readme_file),
                _ => folder_url,
            };
            jobs.push(Job {
                name: name.clone(),
                url,
            });
        }
    }

    let bar = progress_bar(prober.output().as_ref(), jobs.len(), request.label, request.progress);
    let handles: Vec<_> = jobs
        .iter()
        .map(|job| {
            let prober = prober.clone();
            let bar = bar.clone();
            let url = job.url.clone();
            let method = request.scanning_method;
            let verb = request.verb;
            let timeout = request.timeout;
            pool.submit(async move {
                let outcome = probe_outcome(&prober, &url, method, verb, timeout).await;
                bar.inc(1);
                outcome
            })
        })
        .collect();

    let outcomes: Vec<Outcome> = WorkerPool::join(handles)
        .await
        .into_iter()
        .map(|outcome| outcome.unwrap_or(Outcome::TransportFailed))
        .collect();
    bar.finish_and_clear();

    let hits: Vec<PluginHit> = jobs
        .into_iter()
        .zip(outcomes.iter())
        .filter(|(_, outcome)| **outcome == Outcome::Exists)
        .map(|(job, _)| PluginHit {
            url: job.url,
            name: job.name,
        })
        .collect();

    report_inconclusive(prober, request.label, &outcomes, hits.len());
    let inconclusive = outcomes.iter().filter(|o| o.is_inconclusive()).count();

    Ok(Enumeration::new(hits, inconclusive))
}
