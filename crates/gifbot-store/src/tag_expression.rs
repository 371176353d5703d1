//! Parsed form of the `cat+dog` style tag queries accepted from chat.

use std::collections::BTreeSet;
use std::fmt;

/// Expression that matches every record regardless of its tags.
pub const WILDCARD: &str = "all";
/// Separator for AND-combined tags inside one expression.
pub const AND_DELIMITER: char = '+';

#[derive(Debug, Clone, PartialEq, Eq)]
/// A query over record tags, parsed once before touching the store.
pub enum TagExpression {
    /// Matches every record.
    All,
    /// Matches records holding every listed tag. An empty set matches nothing.
    AllOf(BTreeSet<String>),
}

impl TagExpression {
    /// Parses a raw expression, treating `all` as the wildcard.
    pub fn parse(raw: &str) -> Self {
        if raw == WILDCARD {
            Self::All
        } else {
            Self::literal(raw)
        }
    }

    /// Parses a raw expression as plain tags only; `all` is just a tag here.
    pub fn literal(raw: &str) -> Self {
        Self::AllOf(
            raw.split(AND_DELIMITER)
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn matches(&self, tags: &BTreeSet<String>) -> bool {
        match self {
            Self::All => true,
            Self::AllOf(required) => !required.is_empty() && required.is_subset(tags),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::All)
    }
}

impl fmt::Display for TagExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str(WILDCARD),
            Self::AllOf(required) => {
                let mut first = true;
                for tag in required {
                    if !first {
                        write!(f, "{AND_DELIMITER}")?;
                    }
                    f.write_str(tag)?;
                    first = false;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::TagExpression;

    fn tags(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn unit_parse_splits_compound_expressions_on_plus() {
        assert_eq!(
            TagExpression::parse("cat+dog"),
            TagExpression::AllOf(tags(&["cat", "dog"]))
        );
        assert_eq!(TagExpression::parse("all"), TagExpression::All);
        assert_eq!(
            TagExpression::literal("all"),
            TagExpression::AllOf(tags(&["all"]))
        );
    }

    #[test]
    fn unit_matches_requires_every_sub_tag() {
        let record = tags(&["cat", "dog"]);
        assert!(TagExpression::parse("cat").matches(&record));
        assert!(TagExpression::parse("dog+cat").matches(&record));
        assert!(!TagExpression::parse("cat+alpaca").matches(&record));
        assert!(TagExpression::All.matches(&BTreeSet::new()));
    }

    #[test]
    fn regression_empty_segments_are_dropped_and_empty_expression_matches_nothing() {
        assert_eq!(
            TagExpression::parse("cat++dog+"),
            TagExpression::AllOf(tags(&["cat", "dog"]))
        );
        let empty = TagExpression::parse("+");
        assert_eq!(empty, TagExpression::AllOf(BTreeSet::new()));
        assert!(!empty.matches(&tags(&["cat"])));
        assert!(!TagExpression::parse("").matches(&tags(&[""])));
    }

    #[test]
    fn unit_display_renders_canonical_sorted_form() {
        assert_eq!(TagExpression::parse("dog+cat").to_string(), "cat+dog");
        assert_eq!(TagExpression::All.to_string(), "all");
    }
}
