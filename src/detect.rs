// detect.rs - Scanning method detection
// Purpose: Decide how a host signals "resource exists" before enumerating candidates
// The folder probe classifies the host; a known-absent path guards against sites that
// answer 200 for everything. At most one redirect is followed.

use crate::error::{Result, ScanError};
use crate::probe::{ProbeResult, Prober, Verb};
use crate::target::Target;
use clap::ValueEnum;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Minimum content-length difference between a known file and a known-absent path, both
/// answering 200, for the site to count as a real installation. Approximate; overridable.
pub const DEFAULT_LENGTH_TOLERANCE: u64 = 100;

const MAX_REDIRECTS: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanningMethod {
    /// Existing folders answer 403
    Forbidden,
    /// Existing folders answer 200
    Ok,
    /// Folders always answer 404; a known file inside the folder must be probed
    #[value(name = "not_found")]
    NotFound,
}

impl ScanningMethod {
    /// Does `status` mean "exists" for a probe issued under this method?
    pub fn signals_exists(self, status: u16) -> bool {
        match self {
            ScanningMethod::Forbidden => status == 403,
            ScanningMethod::Ok => status == 200,
            ScanningMethod::NotFound => status == 200 || status == 403,
        }
    }
}

impl fmt::Display for ScanningMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanningMethod::Forbidden => f.write_str("forbidden"),
            ScanningMethod::Ok => f.write_str("ok"),
            ScanningMethod::NotFound => f.write_str("not_found"),
        }
    }
}

/// Paths probed during detection, relative to the target.
#[derive(Debug, Clone)]
pub struct DetectionPaths {
    pub cms: String,
    /// A folder every installation has (e.g. `misc/`)
    pub folder_url: String,
    /// Files every installation has; any one answering 200 is enough
    pub regular_file_urls: Vec<String>,
    /// A path no installation has
    pub not_found_url: String,
}

#[derive(Debug, Clone)]
pub struct Detection {
    pub method: ScanningMethod,
    /// Target after following a redirect, if any
    pub target: Target,
    pub redirected: bool,
}

enum Pass {
    Method(ScanningMethod),
    Redirect { target: Target, location: String },
}

pub async fn determine_scanning_method(
    prober: &Prober,
    target: &Target,
    paths: &DetectionPaths,
    verb: Verb,
    timeout: Duration,
    length_tolerance: u64,
) -> Result<Detection> {
    let mut current = target.clone();
    let mut redirects = 0;

    loop {
        match detect_once(prober, &current, paths, verb, timeout, length_tolerance).await? {
            Pass::Method(method) => {
                return Ok(Detection {
                    method,
                    target: current,
                    redirected: redirects > 0,
                });
            }
            Pass::Redirect { target: next, location } => {
                if redirects >= MAX_REDIRECTS {
                    return Err(ScanError::RedirectLimitExceeded {
                        target: target.to_string(),
                        location,
                    });
                }
                prober
                    .output()
                    .info(&format!("{} redirects to {}, restarting detection", current, next));
                redirects += 1;
                current = next;
            }
        }
    }
}

async fn detect_once(
    prober: &Prober,
    target: &Target,
    paths: &DetectionPaths,
    verb: Verb,
    timeout: Duration,
    length_tolerance: u64,
) -> Result<Pass> {
    let folder_url = target.join(&paths.folder_url);
    let folder = prober.probe(&folder_url, verb, timeout).await?;

    if folder.is_redirect() {
        let Some(location) = folder.redirect_location.as_deref() else {
            return Err(ScanError::NotThisCms {
                target: target.to_string(),
                cms: paths.cms.clone(),
                reason: format!(
                    "{} answered {} without a Location header",
                    paths.folder_url, folder.status
                ),
            });
        };
        let next = target.redirected(&folder_url, location, &paths.folder_url)?;
        return Ok(Pass::Redirect {
            target: next,
            location: location.to_string(),
        });
    }

    let mut regular: Option<ProbeResult> = None;
    for path in &paths.regular_file_urls {
        let result = prober.probe(&target.join(path), verb, timeout).await?;
        if result.status == 200 {
            regular = Some(result);
            break;
        }
    }

    let not_cms = |reason: &str| ScanError::NotThisCms {
        target: target.to_string(),
        cms: paths.cms.clone(),
        reason: reason.to_string(),
    };

    let absent = prober.probe(&target.join(&paths.not_found_url), verb, timeout).await?;
    if let Some(regular) = &regular {
        if absent.status == 200 {
            let distinct = match (regular.effective_length(), absent.effective_length()) {
                (Some(found), Some(missing)) => found.abs_diff(missing) >= length_tolerance,
                _ => false,
            };
            if !distinct {
                return Err(not_cms("the website responds with 200 for every URL"));
            }
        }
    }

    if regular.is_none() {
        return Err(not_cms("none of the files every installation has were found"));
    }

    match folder.status {
        403 => Ok(Pass::Method(ScanningMethod::Forbidden)),
        404 => Ok(Pass::Method(ScanningMethod::NotFound)),
        200 => Ok(Pass::Method(ScanningMethod::Ok)),
        other => Err(not_cms(&format!(
            "unexpected status {} for {}",
            other, paths.folder_url
        ))),
    }
}
