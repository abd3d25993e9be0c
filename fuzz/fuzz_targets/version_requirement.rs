#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use purlsight_issue_resolver::RequirementConstraint;
use purlsight_issue_resolver::version::parse_lenient;

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    requirement: String,
    versions: Vec<String>,
}

fuzz_target!(|input: FuzzInput| {
    let constraint = RequirementConstraint::parse_or_unconstrained(&input.requirement);
    for raw in input.versions.iter().take(32) {
        if let Some(version) = parse_lenient(raw) {
            let _ = constraint.matches(&version);
        } else {
            let _ = constraint.matches(&semver::Version::new(0, 0, 0));
        }
    }
});
