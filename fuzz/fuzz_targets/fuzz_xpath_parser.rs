//! Fuzz target for the XPath parser and XPath predicate translation.
//!
//! Arbitrary paths and patterns must either be rejected with an error or
//! compile to a single quoted clause on the metadata field.

#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use metacat_core::translate::xpath::XPath;
use metacat_core::{FilterTranslator, Predicate, SuffixSchemaResolver, TranslatorOptions};

fuzz_target!(|data: (&str, &str)| {
    let (path, pattern) = data;

    if let Ok(parsed) = XPath::parse(path) {
        // Re-parsing the accepted text must succeed.
        let _ = XPath::parse(parsed.as_str()).expect("accepted path re-parses");
    }

    let translator = FilterTranslator::new(
        Arc::new(SuffixSchemaResolver::new()),
        TranslatorOptions::default(),
    );
    if let Ok(fragment) = translator.translate(&Predicate::xpath_like(path, pattern)) {
        assert!(fragment.text.starts_with("metadata_xml:\"xpath("));
        assert!(fragment.text.ends_with(")\""));
    }
});
