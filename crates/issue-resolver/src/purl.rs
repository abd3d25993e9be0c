//! purl 해석 -- 입력 purl을 정규 이름과 유효 요구사항으로 분리
//!
//! 처리 순서:
//!
//! 1. `#subpath`, `?qualifiers` 제거
//! 2. `pkg:` 스킴과 타입 확인
//! 3. 마지막 경로 세그먼트의 `@`에서 버전 분리 (있으면 입력 요구사항보다 우선)
//! 4. 남은 이름이 비어있으면 [`IssueResolverError::PurlParse`]
//!
//! 네임스페이스 세그먼트의 `@`(예: npm scope `@angular`)는 버전 구분자로 보지 않습니다.

use crate::error::IssueResolverError;
use crate::types::{CanonicalPurl, MatchMode, PurlQuery, ResolvedPurl};

/// purl 스킴 접두사
const SCHEME: &str = "pkg:";

/// 범위 연산자로 취급하는 문자
const RANGE_CHARS: &[char] = &['^', '~', '<', '>', '=', '*', '|', ',', ' '];

/// 입력 항목을 해석합니다.
///
/// # Errors
///
/// 스킴/타입/이름이 없으면 `IssueResolverError::PurlParse`
pub fn resolve_purl(query: &PurlQuery) -> Result<ResolvedPurl, IssueResolverError> {
    let (canonical, pinned) = parse_purl(&query.purl)?;

    let (requirement, match_mode) = match pinned {
        Some(version) => {
            let mode = if is_plain_version(&version) {
                MatchMode::Exact
            } else {
                MatchMode::Range
            };
            (version, mode)
        }
        None => (query.requirement.trim().to_owned(), MatchMode::Range),
    };

    Ok(ResolvedPurl {
        canonical,
        requirement,
        match_mode,
    })
}

/// purl 문자열을 정규 purl과 `@` 버전 접미사로 분리합니다.
///
/// 빈 접미사(`pkg:npm/x@`)는 버전 없음으로 취급합니다.
pub fn parse_purl(raw: &str) -> Result<(CanonicalPurl, Option<String>), IssueResolverError> {
    let fail = |reason: &str| IssueResolverError::PurlParse {
        purl: raw.to_owned(),
        reason: reason.to_owned(),
    };

    let trimmed = raw.trim();
    let without_subpath = trimmed.split_once('#').map_or(trimmed, |(head, _)| head);
    let without_qualifiers = without_subpath
        .split_once('?')
        .map_or(without_subpath, |(head, _)| head);

    let has_scheme = without_qualifiers
        .get(..SCHEME.len())
        .is_some_and(|s| s.eq_ignore_ascii_case(SCHEME));
    if !has_scheme {
        return Err(fail("missing 'pkg:' scheme"));
    }
    let body = without_qualifiers[SCHEME.len()..].trim_start_matches('/');

    let segments: Vec<&str> = body.split('/').filter(|s| !s.is_empty()).collect();
    let Some((purl_type, rest)) = segments.split_first() else {
        return Err(fail("missing package type"));
    };
    let Some((last, namespace)) = rest.split_last() else {
        return Err(fail("missing package name"));
    };

    let (name, version) = match last.split_once('@') {
        Some((name, version)) => (name, Some(version.trim())),
        None => (*last, None),
    };
    if name.is_empty() {
        return Err(fail("missing package name"));
    }

    let canonical = CanonicalPurl {
        purl_type: purl_type.to_lowercase(),
        namespace: (!namespace.is_empty()).then(|| namespace.join("/")),
        name: name.to_owned(),
    };
    let version = version.filter(|v| !v.is_empty()).map(str::to_owned);

    Ok((canonical, version))
}

/// 범위 연산자나 와일드카드 없이 단일 버전만 적혀 있는지 확인합니다.
fn is_plain_version(version: &str) -> bool {
    !version.is_empty()
        && !version.contains(RANGE_CHARS)
        && !version
            .split('.')
            .any(|part| part.eq_ignore_ascii_case("x"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(purl: &str, requirement: &str) -> ResolvedPurl {
        resolve_purl(&PurlQuery::new(purl, requirement)).unwrap()
    }

    #[test]
    fn pinned_version_selects_exact_mode() {
        let resolved = resolve("pkg:npm/lodash@4.17.21", "");
        assert_eq!(resolved.canonical.to_string(), "pkg:npm/lodash");
        assert_eq!(resolved.canonical.purl_name(), "lodash");
        assert_eq!(resolved.requirement, "4.17.21");
        assert_eq!(resolved.match_mode, MatchMode::Exact);
    }

    #[test]
    fn pinned_version_overrides_supplied_requirement() {
        let resolved = resolve("pkg:github/scanoss/engine@5.0.0", ">=4");
        assert_eq!(resolved.requirement, "5.0.0");
        assert_eq!(resolved.match_mode, MatchMode::Exact);
    }

    #[test]
    fn supplied_requirement_selects_range_mode() {
        let resolved = resolve("pkg:github/scanoss/engine", "^4.1");
        assert_eq!(resolved.canonical.purl_name(), "scanoss/engine");
        assert_eq!(resolved.requirement, "^4.1");
        assert_eq!(resolved.match_mode, MatchMode::Range);
    }

    #[test]
    fn plain_supplied_requirement_stays_range_mode() {
        let resolved = resolve("pkg:github/movingblocks/gestalt", "7.1.0");
        assert_eq!(resolved.match_mode, MatchMode::Range);
    }

    #[test]
    fn pinned_range_selects_range_mode() {
        assert_eq!(resolve("pkg:npm/x@^1.2", "").match_mode, MatchMode::Range);
        assert_eq!(resolve("pkg:npm/x@1.2.x", "").match_mode, MatchMode::Range);
        assert_eq!(resolve("pkg:npm/x@>=1,<2", "").match_mode, MatchMode::Range);
    }

    #[test]
    fn qualifiers_and_subpath_are_stripped() {
        let resolved = resolve("pkg:maven/org.apache/commons@1.2?type=jar#src/main", "");
        assert_eq!(resolved.canonical.to_string(), "pkg:maven/org.apache/commons");
        assert_eq!(resolved.requirement, "1.2");
    }

    #[test]
    fn scoped_namespace_keeps_at_sign() {
        let resolved = resolve("pkg:npm/@angular/core@16.0.0", "");
        assert_eq!(resolved.canonical.purl_name(), "@angular/core");
        assert_eq!(resolved.requirement, "16.0.0");
    }

    #[test]
    fn nested_namespace_is_joined() {
        let (canonical, _) = parse_purl("pkg:golang/github.com/gorilla/mux").unwrap();
        assert_eq!(canonical.namespace.as_deref(), Some("github.com/gorilla"));
        assert_eq!(canonical.purl_name(), "github.com/gorilla/mux");
    }

    #[test]
    fn type_is_lowercased() {
        let (canonical, _) = parse_purl("PKG:NPM/lodash").unwrap();
        assert_eq!(canonical.purl_type, "npm");
        assert_eq!(canonical.name, "lodash");
    }

    #[test]
    fn empty_version_suffix_is_ignored() {
        let resolved = resolve("pkg:npm/lodash@", "~4");
        assert_eq!(resolved.requirement, "~4");
        assert_eq!(resolved.match_mode, MatchMode::Range);
    }

    #[test]
    fn missing_scheme_fails() {
        let err = resolve_purl(&PurlQuery::new("npm/lodash", "")).unwrap_err();
        assert!(matches!(err, IssueResolverError::PurlParse { .. }));
    }

    #[test]
    fn missing_name_fails() {
        assert!(parse_purl("pkg:npm").is_err());
        assert!(parse_purl("pkg:npm/").is_err());
        assert!(parse_purl("pkg:npm/@1.0.0").is_err());
        assert!(parse_purl("").is_err());
        assert!(parse_purl("@1.0").is_err());
    }
}
