// version.rs - Version fingerprinting
// Purpose: Identify the installed core version by hashing disclosure files and
//          matching them against a version corpus
// Corpus format:
//   <cms>
//     <files>
//       <file url="CHANGELOG.txt">
//         <version nb="7.34" sha256="..."/>
//         <version nb="7.33" md5="..."/>
//       </file>
//     </files>
//     <changelog url="CHANGELOG.txt"/>
//   </cms>
// Each <version> carries its own digest; md5 corpora from droopescan load unchanged.

use crate::error::{Result, ScanError};
use crate::pool::WorkerPool;
use crate::probe::{Prober, Verb};
use crate::target::Target;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use md5::Md5;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Md5,
    Sha256,
}

impl HashAlgorithm {
    /// Lowercase hex digest of a response body
    pub fn digest(self, body: &[u8]) -> String {
        match self {
            HashAlgorithm::Md5 => format!("{:x}", Md5::digest(body)),
            HashAlgorithm::Sha256 => format!("{:x}", Sha256::digest(body)),
        }
    }

    fn attribute(self) -> &'static [u8] {
        match self {
            HashAlgorithm::Md5 => b"md5",
            HashAlgorithm::Sha256 => b"sha256",
        }
    }

    fn hex_len(self) -> usize {
        match self {
            HashAlgorithm::Md5 => 32,
            HashAlgorithm::Sha256 => 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionFingerprint {
    pub nb: String,
    pub algorithm: HashAlgorithm,
    pub hash: String,
}

/// One disclosure file and the fingerprint of each version that shipped it, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusFile {
    pub url: String,
    pub versions: Vec<VersionFingerprint>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionCorpus {
    files: Vec<CorpusFile>,
}

impl VersionCorpus {
    pub fn load(path: &Path) -> Result<Self> {
        let xml = fs::read_to_string(path)
            .map_err(|e| ScanError::Corpus(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_xml(&xml)
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut files = Vec::new();
        let mut current: Option<CorpusFile> = None;
        let mut saw_root = false;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    match name.as_str() {
                        "cms" => saw_root = true,
                        "files" | "changelog" => {}
                        "file" => current = Some(parse_file(&e)?),
                        "version" => push_version(current.as_mut(), &e)?,
                        other => {
                            return Err(ScanError::Corpus(format!("unexpected element <{}>", other)));
                        }
                    }
                }
                Ok(Event::Empty(e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    match name.as_str() {
                        "version" => push_version(current.as_mut(), &e)?,
                        "file" => files.push(parse_file(&e)?),
                        "files" | "changelog" => {}
                        other => {
                            return Err(ScanError::Corpus(format!("unexpected element <{}/>", other)));
                        }
                    }
                }
                Ok(Event::End(e)) => {
                    if e.name().as_ref() == b"file" {
                        if let Some(file) = current.take() {
                            files.push(file);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(ScanError::Corpus(format!(
                        "XML error at position {}: {}",
                        reader.buffer_position(),
                        e
                    )));
                }
                _ => {}
            }
            buf.clear();
        }

        if !saw_root {
            return Err(ScanError::Corpus("missing <cms> root element".to_string()));
        }
        files.retain(|f| !f.versions.is_empty());
        if files.is_empty() {
            return Err(ScanError::Corpus("no <file> with <version> entries".to_string()));
        }

        Ok(Self { files })
    }

    pub fn files(&self) -> &[CorpusFile] {
        &self.files
    }
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| ScanError::Corpus(format!("bad attribute: {}", err)))?;
        if attr.key.as_ref() == key {
            let value = attr
                .unescape_value()
                .map_err(|err| ScanError::Corpus(format!("bad attribute value: {}", err)))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn parse_file(e: &BytesStart<'_>) -> Result<CorpusFile> {
    let url = attribute(e, b"url")?
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ScanError::Corpus("<file> requires a non-empty url attribute".to_string()))?;

    Ok(CorpusFile {
        url,
        versions: Vec::new(),
    })
}

fn push_version(file: Option<&mut CorpusFile>, e: &BytesStart<'_>) -> Result<()> {
    let file = file.ok_or_else(|| ScanError::Corpus("<version> outside of <file>".to_string()))?;

    let nb = attribute(e, b"nb")?
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ScanError::Corpus(format!("<version> in {} requires nb", file.url)))?;

    let mut declared = None;
    for algorithm in [HashAlgorithm::Sha256, HashAlgorithm::Md5] {
        if let Some(hash) = attribute(e, algorithm.attribute())? {
            declared = Some((algorithm, hash.to_lowercase()));
            break;
        }
    }
    let (algorithm, hash) = declared.ok_or_else(|| {
        ScanError::Corpus(format!("version {} of {} requires sha256 or md5", nb, file.url))
    })?;
    if hash.len() != algorithm.hex_len() || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ScanError::Corpus(format!(
            "version {} of {} has a malformed {:?} digest",
            nb, file.url, algorithm
        )));
    }

    file.versions.push(VersionFingerprint { nb, algorithm, hash });
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct VersionResult {
    /// First matching version in corpus declaration order
    pub version: Option<String>,
    /// Every version consistent with all fetched files
    pub candidates: Vec<String>,
    pub is_empty: bool,
}

pub async fn enumerate_version(
    prober: &Prober,
    pool: &WorkerPool,
    target: &Target,
    corpus: &VersionCorpus,
    timeout: Duration,
) -> VersionResult {
    let handles: Vec<_> = corpus
        .files()
        .iter()
        .map(|file| {
            let prober = prober.clone();
            let url = target.join(&file.url);
            pool.submit(async move { prober.probe(&url, Verb::Get, timeout).await })
        })
        .collect();
    let responses = WorkerPool::join(handles).await;

    let mut candidates: Option<Vec<String>> = None;
    for (file, response) in corpus.files().iter().zip(responses) {
        let body = match response {
            Some(Ok(result)) if result.status == 200 => result.body,
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                prober.output().warn(&format!("Could not fetch {}: {}", file.url, e));
                continue;
            }
            None => continue,
        };

        let md5 = HashAlgorithm::Md5.digest(&body);
        let sha256 = HashAlgorithm::Sha256.digest(&body);
        let matching: Vec<String> = file
            .versions
            .iter()
            .filter(|v| match v.algorithm {
                HashAlgorithm::Md5 => v.hash == md5,
                HashAlgorithm::Sha256 => v.hash == sha256,
            })
            .map(|v| v.nb.clone())
            .collect();

        candidates = Some(match candidates {
            None => matching,
            Some(previous) => previous.into_iter().filter(|v| matching.contains(v)).collect(),
        });
    }

    let candidates = candidates.unwrap_or_default();
    VersionResult {
        version: candidates.first().cloned(),
        is_empty: candidates.is_empty(),
        candidates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::RecordingOutput;
    use crate::testing::{MockResponse, MockTransport};
    use std::sync::Arc;

    fn file_xml(url: &str, versions: &[(&str, &str)]) -> String {
        let mut xml = format!("    <file url=\"{}\">\n", url);
        for (nb, body) in versions {
            xml.push_str(&format!(
                "      <version nb=\"{}\" sha256=\"{}\"/>\n",
                nb,
                HashAlgorithm::Sha256.digest(body.as_bytes())
            ));
        }
        xml.push_str("    </file>\n");
        xml
    }

    fn corpus_xml(files: &[String]) -> String {
        format!("<cms>\n  <files>\n{}  </files>\n</cms>\n", files.concat())
    }

    fn serve(transport: &MockTransport, url: &str, body: &str) {
        transport.respond_with(Verb::Get, url, MockResponse {
            status: 200,
            body: body.as_bytes().to_vec(),
            ..Default::default()
        });
    }

    #[test]
    fn test_parses_corpus_in_declaration_order() {
        let xml = corpus_xml(&[file_xml("CHANGELOG.txt", &[("7.33", "a"), ("7.34", "b")])]);
        let corpus = VersionCorpus::from_xml(&xml).unwrap();

        assert_eq!(corpus.files().len(), 1);
        let labels: Vec<&str> = corpus.files()[0].versions.iter().map(|v| v.nb.as_str()).collect();
        assert_eq!(labels, vec!["7.33", "7.34"]);
    }

    #[test]
    fn test_rejects_invalid_corpus() {
        assert!(VersionCorpus::from_xml("<cms><files></files></cms>").is_err());
        assert!(VersionCorpus::from_xml("<cms><version nb=\"7.0\" sha256=\"00\"/></cms>").is_err());
        assert!(VersionCorpus::from_xml(
            "<cms><files><file url=\"CHANGELOG.txt\"><version nb=\"7.0\" sha256=\"xyz\"/></file></files></cms>"
        )
        .is_err());
        assert!(VersionCorpus::from_xml("<versions/>").is_err());
        assert!(VersionCorpus::from_xml("<cms><files><file url=\"a\">").is_err());
    }

    #[test]
    fn test_parses_droopescan_md5_corpus() {
        let xml = r#"<cms>
  <files>
    <file url="misc/drupal.js">
      <version md5="900150983cd24fb0d6963f7d28e17f72" nb="7.34"/>
      <version md5="D41D8CD98F00B204E9800998ECF8427E" nb="7.33"/>
    </file>
  </files>
  <changelog url="CHANGELOG.txt"/>
</cms>"#;
        let corpus = VersionCorpus::from_xml(xml).unwrap();

        let versions = &corpus.files()[0].versions;
        assert_eq!(versions.len(), 2);
        assert!(versions.iter().all(|v| v.algorithm == HashAlgorithm::Md5));
        assert_eq!(versions[1].hash, "d41d8cd98f00b204e9800998ecf8427e");
        assert!(VersionCorpus::from_xml(
            "<cms><files><file url=\"a\"><version nb=\"7.0\" md5=\"abc\"/></file></files></cms>"
        )
        .is_err());
    }

    #[tokio::test]
    async fn test_identifies_version_from_md5() {
        let xml = r#"<cms><files><file url="misc/drupal.js">
            <version md5="d41d8cd98f00b204e9800998ecf8427e" nb="7.33"/>
            <version md5="900150983cd24fb0d6963f7d28e17f72" nb="7.34"/>
        </file></files></cms>"#;
        let corpus = VersionCorpus::from_xml(xml).unwrap();
        let transport = Arc::new(MockTransport::new());
        serve(&transport, "http://example.com/misc/drupal.js", "abc");
        let prober = Prober::new(transport, Arc::new(RecordingOutput::default()));
        let target = Target::parse("http://example.com/").unwrap();

        let result = enumerate_version(&prober, &WorkerPool::new(4), &target, &corpus, Duration::from_secs(5)).await;

        assert_eq!(result.version.as_deref(), Some("7.34"));
    }

    #[tokio::test]
    async fn test_identifies_version() {
        let xml = corpus_xml(&[file_xml("CHANGELOG.txt", &[("7.33", "Drupal 7.33"), ("7.34", "Drupal 7.34")])]);
        let corpus = VersionCorpus::from_xml(&xml).unwrap();
        let transport = Arc::new(MockTransport::new());
        serve(&transport, "http://example.com/CHANGELOG.txt", "Drupal 7.34");
        let prober = Prober::new(transport.clone(), Arc::new(RecordingOutput::default()));
        let target = Target::parse("http://example.com/").unwrap();

        let result = enumerate_version(&prober, &WorkerPool::new(4), &target, &corpus, Duration::from_secs(5)).await;

        assert_eq!(result.version.as_deref(), Some("7.34"));
        assert!(!result.is_empty);
        assert!(transport
            .calls()
            .iter()
            .all(|c| c.verb == Verb::Get && c.timeout == Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn test_no_match_is_empty() {
        let xml = corpus_xml(&[file_xml("CHANGELOG.txt", &[("7.33", "Drupal 7.33")])]);
        let corpus = VersionCorpus::from_xml(&xml).unwrap();
        let transport = Arc::new(MockTransport::new());
        serve(&transport, "http://example.com/CHANGELOG.txt", "patched changelog");
        let prober = Prober::new(transport, Arc::new(RecordingOutput::default()));
        let target = Target::parse("http://example.com/").unwrap();

        let result = enumerate_version(&prober, &WorkerPool::new(4), &target, &corpus, Duration::from_secs(5)).await;

        assert!(result.is_empty);
        assert_eq!(result.version, None);
    }

    #[tokio::test]
    async fn test_ambiguous_match_prefers_declaration_order() {
        let xml = corpus_xml(&[file_xml("CHANGELOG.txt", &[("7.33", "same"), ("7.34", "same")])]);
        let corpus = VersionCorpus::from_xml(&xml).unwrap();
        let transport = Arc::new(MockTransport::new());
        serve(&transport, "http://example.com/CHANGELOG.txt", "same");
        let prober = Prober::new(transport, Arc::new(RecordingOutput::default()));
        let target = Target::parse("http://example.com/").unwrap();

        let result = enumerate_version(&prober, &WorkerPool::new(4), &target, &corpus, Duration::from_secs(5)).await;

        assert_eq!(result.version.as_deref(), Some("7.33"));
        assert_eq!(result.candidates, vec!["7.33", "7.34"]);
    }

    #[tokio::test]
    async fn test_multiple_files_narrow_candidates() {
        let xml = corpus_xml(&[
            file_xml("CHANGELOG.txt", &[("7.33", "same"), ("7.34", "same"), ("7.35", "new")]),
            file_xml("misc/drupal.js", &[("7.33", "js-old"), ("7.34", "js-new"), ("7.35", "js-new")]),
        ]);
        let corpus = VersionCorpus::from_xml(&xml).unwrap();
        let transport = Arc::new(MockTransport::new());
        serve(&transport, "http://example.com/CHANGELOG.txt", "same");
        serve(&transport, "http://example.com/misc/drupal.js", "js-new");
        let prober = Prober::new(transport, Arc::new(RecordingOutput::default()));
        let target = Target::parse("http://example.com/").unwrap();

        let result = enumerate_version(&prober, &WorkerPool::new(4), &target, &corpus, Duration::from_secs(5)).await;

        assert_eq!(result.candidates, vec!["7.34"]);
        assert_eq!(result.version.as_deref(), Some("7.34"));
    }
}
