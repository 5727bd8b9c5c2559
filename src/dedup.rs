use std::collections::HashMap;

use url::Url;

use crate::models::{ContactRecord, MasterRow};

/// Which key matched a candidate against the master dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKey {
    Name,
    Website,
}

#[derive(Debug, Clone)]
pub struct DupMatch {
    pub master_index: usize,
    pub matched_on: MatchKey,
    /// More than one master row matched; the first one is reported.
    pub ambiguous: bool,
}

/// Collapses a name or URL to a comparison key: lowercase, scheme and `www.`
/// stripped, alphanumerics only.
pub fn normalize_key(value: &str) -> String {
    let mut s = value.trim().to_lowercase();
    for prefix in ["https://", "http://"] {
        if let Some(rest) = s.strip_prefix(prefix) {
            s = rest.to_string();
        }
    }
    if let Some(rest) = s.strip_prefix("www.") {
        s = rest.to_string();
    }
    s.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

/// Extracts the host of a URL (scheme and path stripped, `www.` removed) as a
/// comparison key. Bare hosts without a scheme are accepted.
pub fn normalize_host(url_or_host: &str) -> String {
    let trimmed = url_or_host.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("n/a") {
        return String::new();
    }
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    match Url::parse(&with_scheme) {
        Ok(url) => {
            let host = url.host_str().unwrap_or("").to_lowercase();
            host.strip_prefix("www.").unwrap_or(&host).to_string()
        }
        Err(_) => String::new(),
    }
}

/// Exact-key lookup index over master rows. Rows appended mid-merge are added
/// with [`MasterIndex::insert`], so a batch cannot append the same business
/// twice.
#[derive(Debug, Default)]
pub struct MasterIndex {
    by_name: HashMap<String, Vec<usize>>,
    by_host: HashMap<String, Vec<usize>>,
}

impl MasterIndex {
    pub fn build(rows: &[MasterRow]) -> Self {
        let mut index = Self::default();
        for (i, row) in rows.iter().enumerate() {
            index.insert(i, row);
        }
        index
    }

    pub fn insert(&mut self, index: usize, row: &MasterRow) {
        let name_key = normalize_key(&row.name);
        if !name_key.is_empty() {
            self.by_name.entry(name_key).or_default().push(index);
        }
        let host_key = normalize_host(&row.website);
        if !host_key.is_empty() {
            self.by_host.entry(host_key).or_default().push(index);
        }
    }

    /// Name match takes precedence over website match.
    pub fn lookup(&self, name: &str, website: &str) -> Option<DupMatch> {
        let name_key = normalize_key(name);
        if !name_key.is_empty() {
            if let Some(hits) = self.by_name.get(&name_key) {
                return Some(DupMatch {
                    master_index: hits[0],
                    matched_on: MatchKey::Name,
                    ambiguous: hits.len() > 1,
                });
            }
        }
        let host_key = normalize_host(website);
        if !host_key.is_empty() {
            if let Some(hits) = self.by_host.get(&host_key) {
                return Some(DupMatch {
                    master_index: hits[0],
                    matched_on: MatchKey::Website,
                    ambiguous: hits.len() > 1,
                });
            }
        }
        None
    }
}

pub struct DuplicateDetector;

impl DuplicateDetector {
    /// For each candidate, the best-matching master row or `None`.
    pub fn find_duplicates(
        candidates: &[ContactRecord],
        master: &[MasterRow],
    ) -> Vec<Option<DupMatch>> {
        let index = MasterIndex::build(master);
        candidates
            .iter()
            .map(|c| index.lookup(&c.name, &c.website))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, website: &str) -> MasterRow {
        MasterRow {
            name: name.to_string(),
            website: website.to_string(),
            ..MasterRow::default()
        }
    }

    fn candidate(name: &str, website: &str) -> ContactRecord {
        ContactRecord {
            name: name.to_string(),
            whatsapp: String::new(),
            phone: String::new(),
            email: None,
            website: website.to_string(),
            city: String::new(),
            address: String::new(),
            source_id: None,
            verified: false,
        }
    }

    #[test]
    fn keys_ignore_case_scheme_and_punctuation() {
        assert_eq!(normalize_key("Acme S.A.S."), "acmesas");
        assert_eq!(normalize_key("https://www.Acme.com/x"), "acmecomx");
        assert_eq!(normalize_host("https://www.acme.com/contact"), "acme.com");
        assert_eq!(normalize_host("acme.com"), "acme.com");
        assert_eq!(normalize_host("N/A"), "");
    }

    #[test]
    fn matches_by_name_or_website() {
        let master = vec![row("Acme", "acme.com"), row("Globex", "")];
        let candidates = vec![
            candidate("ACME", ""),
            candidate("Other Name", "https://www.acme.com/"),
            candidate("Initech", "initech.co"),
        ];
        let matches = DuplicateDetector::find_duplicates(&candidates, &master);

        let first = matches[0].as_ref().unwrap();
        assert_eq!(first.master_index, 0);
        assert_eq!(first.matched_on, MatchKey::Name);

        let second = matches[1].as_ref().unwrap();
        assert_eq!(second.master_index, 0);
        assert_eq!(second.matched_on, MatchKey::Website);

        assert!(matches[2].is_none());
    }

    #[test]
    fn multiple_hits_report_first_and_flag_ambiguity() {
        let master = vec![row("Acme", "acme.com"), row("Acme", "acme.com.co")];
        let matches = DuplicateDetector::find_duplicates(&[candidate("acme", "")], &master);
        let hit = matches[0].as_ref().unwrap();
        assert_eq!(hit.master_index, 0);
        assert!(hit.ambiguous);
    }
}
