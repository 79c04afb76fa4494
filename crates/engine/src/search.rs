//! Searchable index over the settings store.
//!
//! Derived, fully rebuildable structure: built once per document load,
//! refreshed per-setting when an edit changes searchable text (an Option
//! setting's active label). Value edits never trigger a full rebuild.
//!
//! Two query modes:
//! - Exact: case-insensitive substring containment across name, help text,
//!   token and option labels. Any hit scores 100.
//! - Fuzzy: per-term similarity (Jaro-Winkler), tolerant of typos,
//!   transpositions and abbreviated terms ("usb config" surfaces
//!   "USB Port Configuration"). A setting's score is the best of its
//!   fields; a field's score is the mean of each query term's best match.
//!
//! The scoring function is deliberately self-contained so it can be swapped
//! without touching index plumbing.

use crate::setting::{Setting, SettingKind};
use crate::store::SettingsStore;

/// One normalized term with its precomputed length, used to skip term
/// pairs that cannot score near the cutoff.
#[derive(Debug, Clone)]
struct Term {
    text: String,
    chars: usize,
}

/// One indexed field (name, description, token, or joined option labels).
#[derive(Debug, Clone)]
struct Field {
    /// Lowercased full text, for substring containment.
    text: String,
    terms: Vec<Term>,
}

#[derive(Debug, Clone)]
struct Entry {
    /// Stable address of the setting within its document.
    block_index: usize,
    fields: Vec<Field>,
}

/// Search index over one loaded store. Valid only for the store it was
/// built from; rebuild on document reload.
#[derive(Debug, Clone)]
pub struct SearchIndex {
    entries: Vec<Entry>,
}

impl SearchIndex {
    pub fn build(store: &SettingsStore) -> Self {
        Self::build_with_progress(store, |_, _| {})
    }

    /// Build, reporting `(indexed, total)` roughly every 64 settings.
    /// Index construction is the one load-time operation allowed to be
    /// visibly slow, so callers can surface progress.
    pub fn build_with_progress<F>(store: &SettingsStore, mut progress: F) -> Self
    where
        F: FnMut(usize, usize),
    {
        let total = store.len();
        let mut entries = Vec::with_capacity(total);
        for (i, setting) in store.settings().enumerate() {
            entries.push(Entry {
                block_index: setting.block_index,
                fields: index_fields(setting),
            });
            if (i + 1) % 64 == 0 {
                progress(i + 1, total);
            }
        }
        progress(total, total);
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Targeted single-entry update after an edit changed a setting's
    /// searchable text. No other entry is touched.
    pub fn refresh(&mut self, store: &SettingsStore, token: &str) {
        let Some(setting) = store.get(token) else {
            return;
        };
        // Entries are in document order, so block indices are sorted.
        if let Ok(pos) = self
            .entries
            .binary_search_by_key(&setting.block_index, |e| e.block_index)
        {
            self.entries[pos].fields = index_fields(setting);
        }
    }

    /// Ranked lookup. `threshold` (0-100) applies to fuzzy mode; exact mode
    /// scores every hit 100. Results are sorted by descending score, ties
    /// broken by document order.
    pub fn query<'a>(
        &self,
        store: &'a SettingsStore,
        text: &str,
        fuzzy: bool,
        threshold: u8,
    ) -> Vec<(&'a Setting, u8)> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let query_terms: Vec<Term> = tokenize(&needle);
        let mut hits: Vec<(&Setting, u8)> = Vec::new();

        for entry in &self.entries {
            let Some(setting) = store.document().setting_at(entry.block_index) else {
                continue;
            };
            let score = if fuzzy {
                fuzzy_score(&entry.fields, &needle, &query_terms)
            } else if entry.fields.iter().any(|f| f.text.contains(&needle)) {
                100
            } else {
                0
            };
            let cutoff = if fuzzy { threshold.max(1) } else { 1 };
            if score >= cutoff {
                hits.push((setting, score));
            }
        }

        // Stable sort keeps document order among equal scores.
        hits.sort_by(|a, b| b.1.cmp(&a.1));
        hits
    }
}

fn index_fields(setting: &Setting) -> Vec<Field> {
    let mut fields = vec![
        make_field(&setting.name),
        make_field(&setting.description),
        make_field(&setting.token),
    ];
    if let SettingKind::Option { choices } = &setting.kind {
        let labels = choices
            .iter()
            .map(|c| c.label.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        fields.push(make_field(&labels));
    }
    fields
}

fn make_field(text: &str) -> Field {
    let lower = text.to_lowercase();
    let terms = tokenize(&lower);
    Field { text: lower, terms }
}

fn tokenize(lower: &str) -> Vec<Term> {
    lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| Term {
            text: w.to_string(),
            chars: w.chars().count(),
        })
        .collect()
}

/// Field score = mean over query terms of the best per-term similarity.
/// Whole-query containment short-circuits to 100.
fn fuzzy_score(fields: &[Field], needle: &str, query_terms: &[Term]) -> u8 {
    if query_terms.is_empty() {
        return 0;
    }
    let mut best = 0.0f64;
    for field in fields {
        if field.text.contains(needle) {
            return 100;
        }
        let mut sum = 0.0f64;
        for q in query_terms {
            let mut term_best = 0.0f64;
            for t in &field.terms {
                let s = term_similarity(q, t);
                if s > term_best {
                    term_best = s;
                }
                if term_best >= 100.0 {
                    break;
                }
            }
            sum += term_best;
        }
        let mean = sum / query_terms.len() as f64;
        if mean > best {
            best = mean;
        }
    }
    best.round().clamp(0.0, 100.0) as u8
}

/// Similarity of two normalized terms on a 0-100 scale.
fn term_similarity(q: &Term, t: &Term) -> f64 {
    if q.text == t.text {
        return 100.0;
    }
    let longer = q.chars.max(t.chars);
    let diff = q.chars.abs_diff(t.chars);
    let is_prefix = t.text.starts_with(q.text.as_str()) || q.text.starts_with(t.text.as_str());
    // Length signature pruning: wildly different lengths cannot score high
    // unless one term abbreviates the other.
    if !is_prefix && diff * 2 > longer {
        return 0.0;
    }
    strsim::jaro_winkler(&q.text, &t.text) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness;

    #[test]
    fn test_exact_mode_substring_containment() {
        let store = harness::sample_store();
        let index = SearchIndex::build(&store);

        let hits = index.query(&store, "scrub", false, 0);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0.token, "0x0230");
        assert_eq!(hits[0].1, 100);

        // Case-insensitive, matches tokens too.
        assert_eq!(index.query(&store, "0x014c", false, 0).len(), 1);
        // Option labels are searchable.
        assert_eq!(index.query(&store, "1600mhz", false, 0).len(), 1);
        assert!(index.query(&store, "zzz", false, 0).is_empty());
    }

    #[test]
    fn test_exact_ties_keep_document_order() {
        let store = harness::sample_store();
        let index = SearchIndex::build(&store);
        // "a" appears in several settings; all score 100.
        let hits = index.query(&store, "interval", false, 0);
        assert!(!hits.is_empty());
        let all = index.query(&store, "0x0", false, 0);
        let tokens: Vec<&str> = all.iter().map(|(s, _)| s.token.as_str()).collect();
        let mut sorted = tokens.clone();
        sorted.sort();
        // Document order happens to be ascending token order in the fixture.
        assert_eq!(tokens, sorted);
    }

    #[test]
    fn test_fuzzy_tolerates_typos_and_abbreviations() {
        let store = harness::sample_store();
        let index = SearchIndex::build(&store);

        let hits = index.query(&store, "memery freq", true, 70);
        assert!(!hits.is_empty(), "typo query should still match");
        assert_eq!(hits[0].0.token, "0x0301");
        assert!(hits[0].1 >= 70, "score was {}", hits[0].1);

        // The same query in exact mode finds nothing.
        assert!(index.query(&store, "memery freq", false, 0).is_empty());
    }

    #[test]
    fn test_fuzzy_threshold_excludes_weak_matches() {
        let store = harness::sample_store();
        let index = SearchIndex::build(&store);
        let strict = index.query(&store, "memery freq", true, 99);
        assert!(strict.is_empty());
    }

    #[test]
    fn test_fuzzy_results_sorted_by_descending_score() {
        let store = harness::sample_store();
        let index = SearchIndex::build(&store);
        let hits = index.query(&store, "memory", true, 40);
        for pair in hits.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
    }

    #[test]
    fn test_empty_query_returns_nothing() {
        let store = harness::sample_store();
        let index = SearchIndex::build(&store);
        assert!(index.query(&store, "   ", true, 0).is_empty());
        assert!(index.query(&store, "", false, 0).is_empty());
    }

    #[test]
    fn test_build_reports_progress() {
        let store = harness::sample_store();
        let mut calls = Vec::new();
        let index = SearchIndex::build_with_progress(&store, |done, total| {
            calls.push((done, total));
        });
        assert_eq!(index.len(), store.len());
        assert_eq!(calls.last(), Some(&(store.len(), store.len())));
    }

    #[test]
    fn test_refresh_updates_single_entry() {
        let mut store = harness::sample_store();
        let mut index = SearchIndex::build(&store);

        // No setting mentions "turbo" yet.
        assert!(index.query(&store, "turbo", false, 0).is_empty());

        // Simulate a label-bearing change by renaming through a rebuilt
        // document: here we just refresh after an edit that changes the
        // active label text of an Option setting.
        store.set_value("0x0301", "02").unwrap();
        index.refresh(&store, "0x0301");
        // Entry still finds the setting through its (unchanged) labels.
        let hits = index.query(&store, "1600mhz", false, 0);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0.current_value(), "02");

        // Refreshing an unknown token is a no-op.
        index.refresh(&store, "0xBEEF");
        assert_eq!(index.len(), store.len());
    }
}
