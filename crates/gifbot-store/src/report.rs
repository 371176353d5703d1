//! Human-readable status reports and tag comparisons.

use std::fmt;

const UNIT_NOUN: &str = "gif";

fn unit_noun(count: usize) -> String {
    if count == 1 {
        UNIT_NOUN.to_string()
    } else {
        format!("{UNIT_NOUN}s")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagReportLine {
    pub tag: String,
    pub count: usize,
    pub modifier: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Summary of the catalog: record total plus a bounded sample of tag counts.
pub struct StoreReport {
    pub total_records: usize,
    pub lines: Vec<TagReportLine>,
    /// Set when only a sample of the known tags was reported.
    pub truncated: bool,
}

impl fmt::Display for StoreReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "We have {} {}, including...",
            self.total_records,
            unit_noun(self.total_records)
        )?;
        for line in &self.lines {
            write!(
                f,
                "\n  {} {} {} {}!",
                line.count,
                line.modifier,
                line.tag,
                unit_noun(line.count)
            )?;
        }
        if self.truncated {
            f.write_str("\n... and many more!")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Per-expression counts in request order, plus every expression tied for
/// the highest non-zero count.
pub struct TagComparison {
    pub counts: Vec<(String, usize)>,
    pub winners: Vec<String>,
}

impl TagComparison {
    pub fn from_counts(counts: Vec<(String, usize)>) -> Self {
        let best = counts.iter().map(|(_, count)| *count).max().unwrap_or(0);
        let winners = if best == 0 {
            Vec::new()
        } else {
            counts
                .iter()
                .filter(|(_, count)| *count == best)
                .map(|(expression, _)| expression.clone())
                .collect()
        };
        Self { counts, winners }
    }

    pub fn best_count(&self) -> usize {
        self.counts
            .iter()
            .map(|(_, count)| *count)
            .max()
            .unwrap_or(0)
    }
}
