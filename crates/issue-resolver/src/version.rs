//! 시맨틱 버전 선택 -- 요구사항 파싱과 후보 레코드 중 최적 버전 선택
//!
//! `semver` 크레이트를 기반으로 하되, 저장소에 실제로 들어있는 느슨한 버전 문자열
//! (`v1.2`, `01.02.003`)과 npm/composer 스타일 요구사항(`||`, 하이픈 범위,
//! 공백 구분 AND, 단독 버전 = 일치)을 받아들이도록 입력을 정규화합니다.
//!
//! # 선택 규칙
//!
//! 1. 요구사항 파싱 실패 시 제약 없음으로 대체 (경고 로그)
//! 2. 레코드 버전 파싱: `version` -> `semver` -> `0.0.0` 순서로 시도
//! 3. 제약을 만족하는 후보만 남김 (`exact` 모드는 원문 일치도 요구)
//! 4. 정규화된 버전 문자열 기준으로 그룹화, 첫 레코드가 그룹 대표
//! 5. 최고 버전 그룹 선택, `0.0.0` 대체 레코드는 정상 파싱 레코드보다 뒤
//! 6. 후보가 없으면 빈 결과

use std::collections::HashSet;

use semver::{Version, VersionReq};
use tracing::{debug, warn};

use crate::error::IssueResolverError;
use crate::types::{ComponentRecord, MatchMode, ResolvedPurl, SelectionMode, SelectionResult};

/// 요구사항 연산자로 쓰이는 문자
const OPERATOR_CHARS: &[char] = &['<', '>', '=', '^', '~', '!'];

/// 파싱된 버전 요구사항
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequirementConstraint {
    /// 모든 버전 허용 (요구사항 없음 또는 파싱 실패)
    Unconstrained,
    /// OR로 묶인 범위 목록 (하나라도 만족하면 허용)
    Ranges(Vec<VersionReq>),
}

impl RequirementConstraint {
    /// 요구사항 문자열을 파싱합니다. 빈 문자열은 `Unconstrained`입니다.
    ///
    /// # Errors
    ///
    /// 문법 오류 시 `IssueResolverError::RequirementParse`
    pub fn parse(requirement: &str) -> Result<Self, IssueResolverError> {
        let requirement = requirement.trim();
        if requirement.is_empty() {
            return Ok(Self::Unconstrained);
        }

        let fail = |reason: String| IssueResolverError::RequirementParse {
            requirement: requirement.to_owned(),
            reason,
        };

        let mut ranges = Vec::new();
        for group in requirement.split("||") {
            let translated = translate_group(group).map_err(fail)?;
            let req = VersionReq::parse(&translated).map_err(|e| fail(e.to_string()))?;
            ranges.push(req);
        }
        Ok(Self::Ranges(ranges))
    }

    /// 요구사항을 파싱하고, 실패하면 경고 후 `Unconstrained`를 반환합니다.
    pub fn parse_or_unconstrained(requirement: &str) -> Self {
        match Self::parse(requirement) {
            Ok(constraint) => constraint,
            Err(e) => {
                warn!(requirement, error = %e, "unparsable requirement, treating as unconstrained");
                Self::Unconstrained
            }
        }
    }

    /// 버전이 제약을 만족하는지 확인합니다.
    pub fn matches(&self, version: &Version) -> bool {
        match self {
            Self::Unconstrained => true,
            Self::Ranges(ranges) => ranges.iter().any(|req| req.matches(version)),
        }
    }
}

/// OR 그룹 하나를 `semver` 문법의 comparator 목록으로 바꿉니다.
fn translate_group(group: &str) -> Result<String, String> {
    let group = group.trim();
    if group.is_empty() {
        return Err("empty alternative".to_owned());
    }

    if let Some((low, high)) = group.split_once(" - ") {
        let (low, high) = (low.trim(), high.trim());
        if low.is_empty() || high.is_empty() || low.contains(' ') || high.contains(' ') {
            return Err(format!("malformed hyphen range '{group}'"));
        }
        return Ok(format!(
            ">={}, <={}",
            normalize_version(low)?,
            normalize_version(high)?
        ));
    }

    let mut comparators = Vec::new();
    let mut pending_op: Option<&str> = None;
    for token in group
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
    {
        let op_len = token
            .find(|c: char| !OPERATOR_CHARS.contains(&c))
            .unwrap_or(token.len());
        let (op, version) = token.split_at(op_len);

        if version.is_empty() {
            // `>= 1.2` 처럼 연산자와 버전이 떨어진 경우
            if pending_op.replace(op).is_some() {
                return Err(format!("dangling operator before '{op}'"));
            }
            continue;
        }

        let op = match pending_op.take() {
            Some(pending) if op.is_empty() => pending,
            Some(pending) => return Err(format!("conflicting operators '{pending}' '{op}'")),
            None => op,
        };
        comparators.push(translate_comparator(op, version)?);
    }

    if let Some(op) = pending_op {
        return Err(format!("operator '{op}' without version"));
    }
    if comparators.is_empty() {
        return Err("no comparators".to_owned());
    }
    Ok(comparators.join(", "))
}

fn translate_comparator(op: &str, version: &str) -> Result<String, String> {
    let version = normalize_version(version)?;
    let wildcard = version
        .split('.')
        .any(|part| matches!(part, "*" | "x" | "X"));

    let op = match op {
        "" if wildcard => "",
        "" | "=" | "==" => "=",
        "<" | "<=" | ">" | ">=" | "^" | "~" => op,
        "~>" => "~",
        other => return Err(format!("unsupported operator '{other}'")),
    };
    Ok(format!("{op}{version}"))
}

/// 요구사항 안의 버전을 `semver` 문법으로 정규화합니다.
///
/// pre-release/build 접미사가 있으면 `X.Y.Z-pre` 전체 형식으로 채우고
/// (`v2-m2` -> `2.0.0-m2`), 없으면 세그먼트 수를 유지한 채 선행 `v`와
/// 숫자의 선행 0만 제거합니다. `^1`, `~1`, `>1.2`의 부분 버전 의미는 그대로입니다.
fn normalize_version(version: &str) -> Result<String, String> {
    let stripped = strip_v(version.trim());
    let wildcard = stripped
        .split('.')
        .any(|part| matches!(part, "*" | "x" | "X"));
    if wildcard {
        return Ok(stripped.to_owned());
    }

    if stripped.contains(['-', '+']) {
        return parse_lenient(stripped)
            .map(|v| v.to_string())
            .ok_or_else(|| format!("invalid version '{version}'"));
    }

    let parts: Vec<String> = stripped
        .split('.')
        .map(|part| {
            if !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()) {
                let trimmed = part.trim_start_matches('0');
                let digits = if trimmed.is_empty() { "0" } else { trimmed };
                digits.to_owned()
            } else {
                part.to_owned()
            }
        })
        .collect();
    Ok(parts.join("."))
}

fn strip_v(s: &str) -> &str {
    s.strip_prefix(['v', 'V']).unwrap_or(s)
}

/// 저장소 버전 문자열을 느슨하게 파싱합니다.
///
/// - 선행 `v` 허용
/// - minor/patch 누락 시 0으로 채움
/// - 숫자 세그먼트의 선행 0 제거
/// - pre-release/build 접미사 유지
pub fn parse_lenient(raw: &str) -> Option<Version> {
    let s = strip_v(raw.trim());
    if s.is_empty() {
        return None;
    }

    let split_at = s.find(['-', '+']).unwrap_or(s.len());
    let (core, suffix) = s.split_at(split_at);

    let mut numbers = [0u64; 3];
    let mut count = 0;
    for part in core.split('.') {
        if count == 3 || part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        numbers[count] = part.parse().ok()?;
        count += 1;
    }

    Version::parse(&format!(
        "{}.{}.{}{suffix}",
        numbers[0], numbers[1], numbers[2]
    ))
    .ok()
}

/// 파싱된 후보 레코드
#[derive(Debug)]
struct Candidate<'a> {
    record: &'a ComponentRecord,
    version: Version,
    /// `0.0.0` 대체값이 아닌 실제 파싱 결과인지
    parsed: bool,
}

/// 같은 정규화 버전을 가진 후보 묶음
#[derive(Debug)]
struct VersionGroup<'a> {
    version: Version,
    members: Vec<Candidate<'a>>,
}

impl VersionGroup<'_> {
    fn has_parsed(&self) -> bool {
        self.members.iter().any(|c| c.parsed)
    }
}

/// 후보 레코드 중 요구사항에 맞는 최고 버전을 고릅니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionSelector {
    mode: SelectionMode,
}

impl VersionSelector {
    /// 선택 모드로 생성합니다.
    pub fn new(mode: SelectionMode) -> Self {
        Self { mode }
    }

    /// 현재 선택 모드
    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    /// 한 purl의 후보 레코드에서 선택 결과를 만듭니다.
    ///
    /// 후보가 없거나 모두 걸러지면 빈 결과를 반환하며, 에러가 아닙니다.
    pub fn select(&self, resolved: &ResolvedPurl, candidates: &[ComponentRecord]) -> SelectionResult {
        let purl_name = resolved.canonical.purl_name();
        let requirement = resolved.requirement.as_str();
        let mut result =
            SelectionResult::empty(&purl_name, &resolved.canonical.purl_type, requirement);

        if candidates.is_empty() {
            debug!(purl = %resolved.canonical, "no component candidates");
            return result;
        }

        let constraint = RequirementConstraint::parse_or_unconstrained(requirement);
        let groups = group_candidates(candidates, &constraint, resolved, &purl_name);

        // 정상 파싱 레코드가 있는 그룹이 `0.0.0` 대체값만 있는 그룹보다 항상 앞
        let Some(best) = groups
            .into_iter()
            .max_by(|a, b| (a.has_parsed(), &a.version).cmp(&(b.has_parsed(), &b.version)))
        else {
            warn!(
                purl = %resolved.canonical,
                requirement,
                "no component version satisfies requirement"
            );
            return result;
        };

        // 정상 파싱 레코드가 있으면 대체값 레코드는 제외
        let has_parsed = best.members.iter().any(|c| c.parsed);
        let mut chosen: Vec<ComponentRecord> = best
            .members
            .into_iter()
            .filter(|c| c.parsed || !has_parsed)
            .map(|c| c.record.clone())
            .collect();
        if self.mode == SelectionMode::SingleBest {
            chosen.truncate(1);
        }

        result.selected_version = chosen.first().map(|r| r.version.clone());
        result.records = chosen;
        debug!(
            purl = %resolved.canonical,
            requirement,
            version = ?result.selected_version,
            records = result.records.len(),
            "selected component version"
        );
        result
    }
}

/// 후보를 파싱/필터링한 뒤 버전별로 묶습니다. 그룹 순서와 그룹 내 순서는 입력 순서를 따릅니다.
fn group_candidates<'a>(
    candidates: &'a [ComponentRecord],
    constraint: &RequirementConstraint,
    resolved: &ResolvedPurl,
    purl_name: &str,
) -> Vec<VersionGroup<'a>> {
    let exact = resolved.requirement.trim();
    let mut groups: Vec<VersionGroup<'a>> = Vec::new();
    let mut seen_urls: HashSet<&str> = HashSet::new();

    for record in candidates {
        if record.version.is_empty() && record.semver.is_empty() {
            debug!(purl = purl_name, url_hash = record.url_hash.as_str(), "skipping record without version");
            continue;
        }
        if resolved.match_mode == MatchMode::Exact && record.version.trim() != exact {
            continue;
        }

        let (version, parsed) = match parse_lenient(&record.version)
            .or_else(|| parse_lenient(&record.semver))
        {
            Some(v) => (v, true),
            None => {
                warn!(
                    purl = purl_name,
                    version = record.version.as_str(),
                    semver = record.semver.as_str(),
                    "unparsable component version, using 0.0.0"
                );
                (Version::new(0, 0, 0), false)
            }
        };

        if !constraint.matches(&version) || !seen_urls.insert(record.url_hash.as_str()) {
            continue;
        }

        let candidate = Candidate {
            record,
            version,
            parsed,
        };
        match groups.iter_mut().find(|g| g.version == candidate.version) {
            Some(group) => group.members.push(candidate),
            None => groups.push(VersionGroup {
                version: candidate.version.clone(),
                members: vec![candidate],
            }),
        }
    }

    groups
}
