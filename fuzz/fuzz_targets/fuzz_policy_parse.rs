#![no_main]

use authority_policy::{parse_policies, parse_policy};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Parsing must never panic, whatever the bytes.
    let single = parse_policy(data);
    let Ok(documents) = parse_policies(data) else {
        return;
    };

    // A single document parses identically as a one-element collection.
    if let Ok(document) = single {
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0], document);
    }

    // Accepted documents survive a serialize/parse cycle unchanged.
    let text = serde_json::to_vec(&documents).expect("policy documents serialize");
    let reparsed = parse_policies(&text).expect("serialized policies must parse");
    assert_eq!(reparsed, documents);
});
