#![no_main]

use libfuzzer_sys::fuzz_target;
use purlsight_issue_resolver::{MatchMode, PurlQuery, resolve_purl};

fuzz_target!(|input: (String, String)| {
    let (purl, requirement) = input;
    let query = PurlQuery::new(purl, requirement);
    if let Ok(resolved) = resolve_purl(&query) {
        // 정규화된 이름은 버전/qualifier를 포함하지 않음
        let canonical = resolved.canonical.to_string();
        assert!(canonical.starts_with("pkg:"));
        assert!(!resolved.canonical.name.is_empty());
        if resolved.match_mode == MatchMode::Exact {
            assert!(!resolved.requirement.is_empty());
        }
    }
});
