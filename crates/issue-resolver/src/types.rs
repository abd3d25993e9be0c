//! 도메인 타입 -- purl 해석, 컴포넌트 레코드, 이슈 리포트
//!
//! 요청 단위로 생성되고 응답 후 폐기되는 값들입니다.
//! 컴포넌트 레코드는 관계형 DB 소유이며 읽기 전용입니다.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// 입력 항목 하나: purl과 선택적 버전 요구사항
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurlQuery {
    /// 입력 purl 문자열 (예: `pkg:npm/lodash@4.17.21`)
    pub purl: String,
    /// 버전 요구사항 (비어있으면 최신 버전)
    #[serde(default)]
    pub requirement: String,
}

impl PurlQuery {
    /// purl과 요구사항으로 생성합니다.
    pub fn new(purl: impl Into<String>, requirement: impl Into<String>) -> Self {
        Self {
            purl: purl.into(),
            requirement: requirement.into(),
        }
    }
}

/// 버전 매칭 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// `@`로 고정된 단일 버전과 원문이 일치하는 레코드만
    Exact,
    /// 요구사항 범위를 만족하는 레코드
    #[default]
    Range,
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Range => write!(f, "range"),
        }
    }
}

/// 최고 버전 동률 처리 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// 최고 버전에 동률인 레코드 전부
    #[default]
    Closest,
    /// 최고 버전 레코드 하나
    SingleBest,
}

impl SelectionMode {
    /// 문자열에서 선택 모드를 파싱합니다 (대소문자 구분 없음).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "closest" | "all" => Some(Self::Closest),
            "single_best" | "single-best" | "single" | "one" => Some(Self::SingleBest),
            _ => None,
        }
    }
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closest => write!(f, "closest"),
            Self::SingleBest => write!(f, "single_best"),
        }
    }
}

/// 버전/qualifier/subpath를 제거한 정규 purl
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanonicalPurl {
    /// purl 타입 (npm, github, maven ...)
    pub purl_type: String,
    /// 네임스페이스 (없을 수 있음)
    pub namespace: Option<String>,
    /// 패키지 이름
    pub name: String,
}

impl CanonicalPurl {
    /// 관계형 DB 검색 키 (`namespace/name`, 네임스페이스가 없으면 `name`)
    pub fn purl_name(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}/{}", self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for CanonicalPurl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pkg:{}/{}", self.purl_type, self.purl_name())
    }
}

/// 해석된 purl: 정규 이름 + 유효 요구사항 + 매칭 방식
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPurl {
    /// 정규 purl
    pub canonical: CanonicalPurl,
    /// 유효 요구사항 (`@` 접미사가 있으면 그것이 우선)
    pub requirement: String,
    /// 매칭 방식
    pub match_mode: MatchMode,
}

/// 알려진 컴포넌트/버전 하나 (관계형 DB 행)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ComponentRecord {
    /// 패키지 아카이브 해시 (컴포넌트/버전/마인 단위로 유일)
    pub url_hash: String,
    /// 컴포넌트 이름
    pub component: String,
    /// 원문 버전 문자열
    pub version: String,
    /// 보조 semver 문자열
    pub semver: String,
    /// purl 이름 (`namespace/name`)
    pub purl_name: String,
    /// purl 타입 (비어있을 수 있음)
    pub purl_type: String,
    /// 마인 id
    pub mine_id: i64,
}

/// 한 purl에 대한 버전 선택 결과
///
/// 최고 버전에 동률인 레코드가 여러 개일 수 있으며, 비어있는 것도 정상입니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionResult {
    /// purl 이름
    pub purl_name: String,
    /// purl 타입
    pub purl_type: String,
    /// 적용된 요구사항
    pub requirement: String,
    /// 선택된 버전 원문 (첫 레코드 기준)
    pub selected_version: Option<String>,
    /// 선택된 레코드
    pub records: Vec<ComponentRecord>,
}

impl SelectionResult {
    /// 선택된 레코드가 없는 결과
    pub fn empty(purl_name: impl Into<String>, purl_type: impl Into<String>, requirement: impl Into<String>) -> Self {
        Self {
            purl_name: purl_name.into(),
            purl_type: purl_type.into(),
            requirement: requirement.into(),
            ..Default::default()
        }
    }

    /// 선택된 레코드의 url hash 목록 (순서 유지)
    pub fn url_hashes(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.url_hash.as_str())
    }
}

/// 정적 분석 이슈 하나
///
/// 심각도 등 모든 값은 저장소가 보고한 그대로 전달됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueItem {
    /// 규칙 id
    #[serde(rename = "ruleID")]
    pub rule_id: String,
    /// 시작 라인
    pub from: String,
    /// 끝 라인
    pub to: String,
    /// 심각도
    pub severity: String,
}

/// 이슈가 있는 파일 하나
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileIssues {
    /// 파일 해시
    #[serde(rename = "fileMD5")]
    pub file_hash: String,
    /// 컴포넌트 내 경로 (모르면 빈 문자열)
    pub path: String,
    /// 이슈 목록
    pub issues: Vec<IssueItem>,
}

/// purl 하나에 대한 최종 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurlIssues {
    /// 입력 purl 원문
    pub purl: String,
    /// 입력 요구사항
    pub requirement: String,
    /// 선택된 버전 (없으면 빈 문자열)
    pub version: String,
    /// 이슈가 있는 파일
    pub files: Vec<FileIssues>,
}

/// 경로 조회 복합 키 (`fileHash-urlHash`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileUrlKey {
    /// 파일 해시 (저장소에 실제로 보내는 키)
    pub file_hash: String,
    /// 소유 url 해시
    pub url_hash: String,
}

impl FileUrlKey {
    /// 파일/url 해시로 생성합니다.
    pub fn new(file_hash: impl Into<String>, url_hash: impl Into<String>) -> Self {
        Self {
            file_hash: file_hash.into(),
            url_hash: url_hash.into(),
        }
    }
}

impl fmt::Display for FileUrlKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.file_hash, self.url_hash)
    }
}

/// 1단계 결과: url hash -> file hash 목록
pub type PivotMap = HashMap<String, Vec<String>>;

/// 2단계 결과: file hash -> 이슈 목록
pub type IssueMap = HashMap<String, Vec<IssueItem>>;

/// 3단계 결과: (file, url) -> 경로
pub type PathMap = HashMap<FileUrlKey, String>;
