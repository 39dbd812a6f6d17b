// target.rs - Scan targets
// Purpose: Normalize base URLs, expand base URL templates, read target files

use crate::error::{Result, ScanError};
use crate::output::Output;
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use url::Url;

/// Base URL of a CMS installation. Always ends with exactly one '/'.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Target(String);

impl Target {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let invalid = |reason: &str| ScanError::InvalidTarget {
            url: trimmed.to_string(),
            reason: reason.to_string(),
        };

        let mut url = Url::parse(trimmed).map_err(|e| invalid(&e.to_string()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(invalid("scheme must be http or https"));
        }
        if url.host_str().map(str::is_empty).unwrap_or(true) {
            return Err(invalid("missing host"));
        }

        let path = format!("{}/", url.path().trim_end_matches('/'));
        url.set_path(&path);
        url.set_query(None);
        url.set_fragment(None);

        Ok(Self(url.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Append a path relative to the base URL.
    pub fn join(&self, path: &str) -> String {
        format!("{}{}", self.0, path.trim_start_matches('/'))
    }

    /// New base URL after the server redirected a probe of `probed_url`.
    /// `probed_path` is stripped from the resolved location so the result is a base URL again.
    pub fn redirected(&self, probed_url: &str, location: &str, probed_path: &str) -> Result<Self> {
        let base = Url::parse(probed_url).map_err(|e| ScanError::InvalidTarget {
            url: probed_url.to_string(),
            reason: e.to_string(),
        })?;
        let resolved = base.join(location).map_err(|e| ScanError::InvalidTarget {
            url: location.to_string(),
            reason: e.to_string(),
        })?;

        let resolved = resolved.as_str();
        let stripped = resolved
            .strip_suffix(probed_path)
            .unwrap_or(resolved);

        Self::parse(stripped)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Substitute the target and candidate name into a template such as `%ssites/all/modules/%s/`.
pub fn expand_template(template: &str, target: &Target, name: &str) -> Result<String> {
    let parts: Vec<&str> = template.split("%s").collect();
    if parts.len() != 3 {
        return Err(ScanError::InvalidTemplate {
            template: template.to_string(),
        });
    }

    // The target already ends with '/'; templates are written against that form.
    Ok(format!("{}{}{}{}{}", parts[0], target.as_str(), parts[1], name, parts[2]))
}

/// Read targets from a file, one per line. Blank lines and '#' comments are skipped.
/// Each malformed entry produces exactly one warning and is skipped.
pub fn load_targets(path: &Path, output: &dyn Output) -> std::io::Result<Vec<Target>> {
    let reader = BufReader::new(File::open(path)?);
    let mut targets = Vec::new();

    for (idx, raw) in reader.split(b'\n').enumerate() {
        let raw = raw?;
        let line = match String::from_utf8(raw) {
            Ok(line) => line,
            Err(e) => {
                let malformed = ScanError::MalformedInputEntry {
                    line: idx + 1,
                    entry: String::from_utf8_lossy(e.as_bytes()).trim().to_string(),
                    reason: "not valid UTF-8".to_string(),
                };
                output.warn(&format!("{}, skipping", malformed));
                continue;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        match Target::parse(trimmed) {
            Ok(target) => targets.push(target),
            Err(e) => {
                let reason = match e {
                    ScanError::InvalidTarget { reason, .. } => reason,
                    other => other.to_string(),
                };
                let malformed = ScanError::MalformedInputEntry {
                    line: idx + 1,
                    entry: trimmed.to_string(),
                    reason,
                };
                output.warn(&format!("{}, skipping", malformed));
            }
        }
    }

    Ok(targets)
}
