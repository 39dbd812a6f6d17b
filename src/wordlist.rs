// wordlist.rs - Candidate source
// Purpose: Lazily read plugin/theme names from a wordlist, one name per line

use crate::error::{Result, ScanError};
use lazy_static::lazy_static;
use regex::Regex;
use std::fs::File;
use std::io::{BufRead, BufReader, Split};
use std::path::Path;

lazy_static! {
    // Candidates are bare folder names: no slashes, no whitespace
    static ref RE_CANDIDATE: Regex = Regex::new(r"^[A-Za-z0-9_.\-]+$").unwrap();
}

/// Lazy iterator over the candidates of a wordlist. `limit` counts items, not bytes.
pub struct Candidates {
    lines: Split<BufReader<File>>,
    remaining: Option<usize>,
}

impl Iterator for Candidates {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.remaining == Some(0) {
            return None;
        }

        for line in self.lines.by_ref() {
            let Ok(raw) = line else {
                return None;
            };
            // Undecodable bytes become U+FFFD and fail the name check below.
            let line = String::from_utf8_lossy(&raw);
            let name = line.trim();
            if name.is_empty() || name.starts_with('#') || !RE_CANDIDATE.is_match(name) {
                continue;
            }

            if let Some(remaining) = self.remaining.as_mut() {
                *remaining -= 1;
            }
            return Some(name.to_string());
        }

        None
    }
}

pub fn read_lines(path: &Path, limit: Option<usize>) -> Result<Candidates> {
    let file = File::open(path).map_err(|source| ScanError::Wordlist {
        path: path.display().to_string(),
        source,
    })?;

    Ok(Candidates {
        lines: BufReader::new(file).split(b'\n'),
        remaining: limit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn wordlist(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file
    }

    #[test]
    fn test_reads_every_candidate_in_order() {
        let file = wordlist(&["views", "ctools", "", "# comment", "token"]);
        let names: Vec<String> = read_lines(file.path(), None).unwrap().collect();
        assert_eq!(names, vec!["views", "ctools", "token"]);
    }

    #[test]
    fn test_limits_by_number() {
        let file = wordlist(&["views", "", "ctools", "token", "pathauto"]);
        let names: Vec<String> = read_lines(file.path(), Some(3)).unwrap().collect();
        assert_eq!(names, vec!["views", "ctools", "token"]);

        let none: Vec<String> = read_lines(file.path(), Some(0)).unwrap().collect();
        assert!(none.is_empty());
    }

    #[test]
    fn test_skips_names_with_slashes() {
        let file = wordlist(&["views", "../etc", "sites/all", "admin_menu"]);
        let names: Vec<String> = read_lines(file.path(), None).unwrap().collect();
        assert_eq!(names, vec!["views", "admin_menu"]);
    }

    #[test]
    fn test_undecodable_line_does_not_end_the_list() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"views\ncaf\xe9\nctools\r\ntoken\n").unwrap();

        let names: Vec<String> = read_lines(file.path(), None).unwrap().collect();
        assert_eq!(names, vec!["views", "ctools", "token"]);
    }

    #[test]
    fn test_missing_wordlist() {
        let result = read_lines(Path::new("/nonexistent/plugins.txt"), None);
        assert!(matches!(result, Err(ScanError::Wordlist { .. })));
    }
}
