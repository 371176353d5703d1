#![no_main]

use std::collections::BTreeMap;

use gifbot_store::{parse_manifest, GifStore};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    let (entries, _skipped) = parse_manifest(&raw);
    for entry in &entries {
        assert!(!entry.url.is_empty());
        assert!(!entry.tags.is_empty());
        assert!(entry.tags.iter().all(|tag| !tag.is_empty()));
    }

    let (store, summary) = GifStore::from_manifest(Vec::new(), &raw);
    assert_eq!(summary.records, store.len());
    assert!(store.len() <= entries.len());

    let mut recounted = BTreeMap::<String, usize>::new();
    for (_, tags) in store.records() {
        for tag in tags {
            *recounted.entry(tag.clone()).or_default() += 1;
        }
    }
    assert_eq!(&recounted, store.tag_counts());
    assert_eq!(store.serialize(), store.serialize());
});
