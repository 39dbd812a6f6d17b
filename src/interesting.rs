// interesting.rs - Interesting URL prober
// Purpose: Check a fixed list of disclosure-prone paths (changelogs, login pages, ...)
// These files are expected to answer 200 directly, whatever method the host uses for folders.

use crate::detect::ScanningMethod;
use crate::enumerate::{progress_bar, probe_outcome, report_inconclusive, Enumeration, Outcome};
use crate::pool::WorkerPool;
use crate::probe::{Prober, Verb};
use crate::target::Target;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterestingHit {
    pub url: String,
    pub description: String,
}

/// A path relative to the target and what it means when it is reachable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterestingUrl {
    pub path: String,
    pub description: String,
}

impl InterestingUrl {
    pub fn new(path: &str, description: &str) -> Self {
        Self {
            path: path.to_string(),
            description: description.to_string(),
        }
    }
}

pub async fn enumerate_interesting(
    prober: &Prober,
    pool: &WorkerPool,
    target: &Target,
    urls: &[InterestingUrl],
    verb: Verb,
    timeout: Duration,
    progress: bool,
) -> Enumeration<InterestingHit> {
    let bar = progress_bar(prober.output().as_ref(), urls.len(), "interesting urls", progress);

    let handles: Vec<_> = urls
        .iter()
        .map(|interesting| {
            let prober = prober.clone();
            let bar = bar.clone();
            let url = target.join(&interesting.path);
            pool.submit(async move {
                let outcome = probe_outcome(&prober, &url, ScanningMethod::Ok, verb, timeout).await;
                bar.inc(1);
                (url, outcome)
            })
        })
        .collect();

    let results = WorkerPool::join(handles).await;
    bar.finish_and_clear();

    let mut hits = Vec::new();
    let mut outcomes = Vec::with_capacity(results.len());
    for (interesting, result) in urls.iter().zip(results) {
        let Some((url, outcome)) = result else {
            outcomes.push(Outcome::TransportFailed);
            continue;
        };
        if outcome == Outcome::Exists {
            hits.push(InterestingHit {
                url,
                description: interesting.description.clone(),
            });
        }
        outcomes.push(outcome);
    }

    report_inconclusive(prober, "interesting urls", &outcomes, hits.len());
    let inconclusive = outcomes.iter().filter(|o| o.is_inconclusive()).count();

    Enumeration::new(hits, inconclusive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::RecordingOutput;
    use crate::testing::{MockResponse, MockTransport};
    use std::sync::Arc;

    fn drupal_urls() -> Vec<InterestingUrl> {
        vec![
            InterestingUrl::new("CHANGELOG.txt", "Default changelog file"),
            InterestingUrl::new("user/login", "Default admin"),
        ]
    }

    #[tokio::test]
    async fn test_finds_interesting_urls() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(Verb::Head, "http://example.com/CHANGELOG.txt", 200);
        transport.respond(Verb::Head, "http://example.com/user/login", 404);
        let prober = Prober::new(transport, Arc::new(RecordingOutput::default()));
        let target = Target::parse("http://example.com/").unwrap();

        let found = enumerate_interesting(
            &prober,
            &WorkerPool::new(4),
            &target,
            &drupal_urls(),
            Verb::Head,
            Duration::from_secs(15),
            false,
        )
        .await;

        assert!(!found.is_empty);
        assert_eq!(
            found.hits,
            vec![InterestingHit {
                url: "http://example.com/CHANGELOG.txt".to_string(),
                description: "Default changelog file".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_order_follows_declaration() {
        let transport = Arc::new(MockTransport::new());
        transport.respond_with(Verb::Get, "http://example.com/CHANGELOG.txt", MockResponse {
            status: 200,
            delay: Duration::from_millis(60),
            ..Default::default()
        });
        transport.respond(Verb::Get, "http://example.com/user/login", 200);
        let prober = Prober::new(transport.clone(), Arc::new(RecordingOutput::default()));
        let target = Target::parse("http://example.com/").unwrap();

        let found = enumerate_interesting(
            &prober,
            &WorkerPool::new(4),
            &target,
            &drupal_urls(),
            Verb::Get,
            Duration::from_secs(5),
            false,
        )
        .await;

        let urls: Vec<&str> = found.hits.iter().map(|h| h.url.as_str()).collect();
        assert_eq!(urls, vec!["http://example.com/CHANGELOG.txt", "http://example.com/user/login"]);
        assert!(transport
            .calls()
            .iter()
            .all(|c| c.verb == Verb::Get && c.timeout == Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn test_forbidden_is_not_a_disclosure() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(Verb::Head, "http://example.com/CHANGELOG.txt", 403);
        let prober = Prober::new(transport, Arc::new(RecordingOutput::default()));
        let target = Target::parse("http://example.com/").unwrap();

        let found = enumerate_interesting(
            &prober,
            &WorkerPool::new(4),
            &target,
            &drupal_urls(),
            Verb::Head,
            Duration::from_secs(15),
            false,
        )
        .await;

        assert!(found.is_empty);
    }
}
