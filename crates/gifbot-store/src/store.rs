//! The gif catalog: url records, the tag reference index, and random lookups.

use std::collections::{BTreeMap, BTreeSet};

use rand::seq::{IndexedRandom, IteratorRandom};
use rand::Rng;

use crate::report::{StoreReport, TagComparison, TagReportLine};
use crate::tag_expression::TagExpression;

/// Adjective used when no modifiers are configured.
pub const DEFAULT_MODIFIER: &str = "wholesome";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Catalog of gif urls, each carrying a set of case-sensitive tags.
///
/// `tag_counts[t]` always equals the number of records whose tag set holds
/// `t`; tags whose count drops to zero are removed from the index.
pub struct GifStore {
    records: BTreeMap<String, BTreeSet<String>>,
    tag_counts: BTreeMap<String, usize>,
    modifiers: Vec<String>,
}

impl Default for GifStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl GifStore {
    /// Creates an empty store. An empty modifier list falls back to
    /// [`DEFAULT_MODIFIER`].
    pub fn new(modifiers: Vec<String>) -> Self {
        let modifiers = if modifiers.is_empty() {
            vec![DEFAULT_MODIFIER.to_string()]
        } else {
            modifiers
        };
        Self {
            records: BTreeMap::new(),
            tag_counts: BTreeMap::new(),
            modifiers,
        }
    }

    pub fn modifiers(&self) -> &[String] {
        &self.modifiers
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records with an empty tag set. The manifest format cannot hold them.
    pub fn untagged_len(&self) -> usize {
        self.records.values().filter(|tags| tags.is_empty()).count()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.records.contains_key(url)
    }

    pub fn tags_for(&self, url: &str) -> Option<&BTreeSet<String>> {
        self.records.get(url)
    }

    /// Iterates records ordered by url.
    pub fn records(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.records
            .iter()
            .map(|(url, tags)| (url.as_str(), tags))
    }

    pub fn tag_counts(&self) -> &BTreeMap<String, usize> {
        &self.tag_counts
    }

    /// Number of records holding `tag`, read straight from the index.
    pub fn tag_count(&self, tag: &str) -> usize {
        self.tag_counts.get(tag).copied().unwrap_or(0)
    }

    /// Every tag currently held by at least one record.
    pub fn tags(&self) -> impl ExactSizeIterator<Item = &str> {
        self.tag_counts.keys().map(String::as_str)
    }

    /// Adds `url`, merging `tags` into an existing record for the same url.
    ///
    /// Each tag is counted once per distinct url no matter how often it is
    /// added.
    pub fn add<I, S>(&mut self, url: impl Into<String>, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let record = self.records.entry(url.into()).or_default();
        for tag in tags {
            let tag = tag.into();
            if record.contains(&tag) {
                continue;
            }
            *self.tag_counts.entry(tag.clone()).or_insert(0) += 1;
            record.insert(tag);
        }
    }

    /// Removes the record for `url`. Returns false when no record matched.
    pub fn remove(&mut self, url: &str) -> bool {
        let Some(tags) = self.records.remove(url) else {
            return false;
        };
        for tag in tags {
            if let Some(count) = self.tag_counts.get_mut(&tag) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    self.tag_counts.remove(&tag);
                }
            }
        }
        true
    }

    /// Drops every record and index entry, keeping the modifiers.
    pub fn clear(&mut self) {
        self.records.clear();
        self.tag_counts.clear();
    }

    /// Counts records matching `expression` as literal tags; `all` is not a
    /// wildcard here.
    pub fn count(&self, expression: &str) -> usize {
        self.count_matching(&TagExpression::literal(expression))
    }

    pub fn count_matching(&self, expression: &TagExpression) -> usize {
        self.records
            .values()
            .filter(|tags| expression.matches(tags))
            .count()
    }

    /// Draws a matching url uniformly at random, or `None` when nothing matches.
    pub fn lookup(&self, expression: &str) -> Option<&str> {
        self.lookup_with(expression, &mut rand::rng())
    }

    pub fn lookup_with<R: Rng + ?Sized>(&self, expression: &str, rng: &mut R) -> Option<&str> {
        self.lookup_matching(&TagExpression::parse(expression), rng)
    }

    pub fn lookup_matching<R: Rng + ?Sized>(
        &self,
        expression: &TagExpression,
        rng: &mut R,
    ) -> Option<&str> {
        self.records
            .iter()
            .filter(|(_, tags)| expression.matches(tags))
            .map(|(url, _)| url.as_str())
            .choose(rng)
    }

    /// Builds a status report covering at most `max_tags` tags (0 = all).
    pub fn report(&self, max_tags: usize) -> StoreReport {
        self.report_with(max_tags, &mut rand::rng())
    }

    pub fn report_with<R: Rng + ?Sized>(&self, max_tags: usize, rng: &mut R) -> StoreReport {
        let known = self.tag_counts.len();
        let (selected, truncated) = if max_tags == 0 || known < max_tags {
            (self.tag_counts.iter().collect::<Vec<_>>(), false)
        } else {
            (self.tag_counts.iter().choose_multiple(rng, max_tags), true)
        };

        let lines = selected
            .into_iter()
            .map(|(tag, count)| TagReportLine {
                tag: tag.clone(),
                count: *count,
                modifier: self
                    .modifiers
                    .choose(rng)
                    .cloned()
                    .unwrap_or_else(|| DEFAULT_MODIFIER.to_string()),
            })
            .collect();

        StoreReport {
            total_records: self.records.len(),
            lines,
            truncated,
        }
    }

    /// Counts each expression with [`GifStore::count`] and picks the winners.
    pub fn compare<I, S>(&self, expressions: I) -> TagComparison
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let counts = expressions
            .into_iter()
            .map(|expression| {
                let expression = expression.as_ref();
                (expression.to_string(), self.count(expression))
            })
            .collect();
        TagComparison::from_counts(counts)
    }
}
