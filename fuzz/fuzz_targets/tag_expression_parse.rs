#![no_main]

use std::collections::BTreeSet;

use gifbot_store::{TagExpression, AND_DELIMITER, WILDCARD};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);

    let literal = TagExpression::literal(&raw);
    assert!(!literal.is_wildcard());
    if let TagExpression::AllOf(required) = &literal {
        assert!(required
            .iter()
            .all(|tag| !tag.is_empty() && !tag.contains(AND_DELIMITER)));
        assert!(required.is_empty() || literal.matches(required));
        assert!(!literal.matches(&BTreeSet::new()));
    }
    assert_eq!(TagExpression::literal(&literal.to_string()), literal);

    let parsed = TagExpression::parse(&raw);
    if parsed.is_wildcard() {
        assert_eq!(raw, WILDCARD);
    } else {
        assert_eq!(parsed, literal);
    }
});
