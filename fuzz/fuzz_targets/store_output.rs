#![no_main]

use libfuzzer_sys::fuzz_target;
use purlsight_issue_resolver::store::client::{parse_issues, parse_paths, parse_pivot};

fuzz_target!(|data: &[u8]| {
    if let Ok(output) = std::str::from_utf8(data) {
        let lines = output.lines().count();

        let pivot = parse_pivot(output);
        let issues = parse_issues(output);
        let paths = parse_paths(output);

        // 버려진 라인은 전체 라인 수를 넘지 않음
        assert!(pivot.malformed <= lines);
        assert!(issues.malformed <= lines);
        assert!(paths.malformed <= lines);
    }
});
