#![no_main]

use std::sync::OnceLock;

use ichiryu_index::{normalize_name, CatalogRecord, NameIndex};
use libfuzzer_sys::fuzz_target;

fn index() -> &'static NameIndex {
    static INDEX: OnceLock<NameIndex> = OnceLock::new();
    INDEX.get_or_init(|| {
        NameIndex::build(&[
            CatalogRecord::new("Lightning Bolt", "http://img.example/209_lightningbolt.jpg"),
            CatalogRecord::new("Æther Vial", "http://img.example/12_aethervial.jpg"),
            CatalogRecord::new("Ow", "http://img.example/1_ow.jpg"),
        ])
    })
}

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    let normalized = normalize_name(&raw, None);
    if normalized.is_empty() {
        assert_eq!(index().lookup_longest_suffix(&raw), None);
    } else {
        let _ = index().lookup_longest_suffix(&raw);
    }
});
