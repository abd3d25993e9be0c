//! 이슈 리졸버 에러 타입
//!
//! [`IssueResolverError`]는 purl 해석부터 이슈 집계까지 발생할 수 있는 모든 에러를 나타냅니다.
//! `From<IssueResolverError> for PurlsightError` 구현을 통해 `?` 연산자로
//! 상위 에러 타입으로 전파됩니다.
//!
//! # 에러 카테고리
//!
//! - **요청 검증**: `Validation` (요청 치명적)
//! - **purl 파싱**: `PurlParse` (해당 purl만 조회에서 제외)
//! - **요구사항 파싱**: `RequirementParse` (제약 없음으로 대체)
//! - **관계형 DB**: `Database` (요청 치명적)
//! - **외부 저장소**: `StoreUnavailable` (해당 조회 단계만 빈 결과로 저하)
//! - **설정**: `Config`
//! - **내부**: `Internal`, `Io`

use purlsight_core::error::{ConfigError, ParseError, PurlsightError, StorageError};

/// 이슈 리졸버 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum IssueResolverError {
    /// 요청 검증 실패 (빈 purl 목록 등)
    #[error("validation error: {0}")]
    Validation(String),

    /// purl 파싱 실패
    #[error("purl parse error: '{purl}': {reason}")]
    PurlParse {
        /// 입력 purl 문자열
        purl: String,
        /// 실패 사유
        reason: String,
    },

    /// 버전 요구사항 파싱 실패 (제약 없음으로 대체됨)
    #[error("requirement parse error: '{requirement}': {reason}")]
    RequirementParse {
        /// 입력 요구사항
        requirement: String,
        /// 실패 사유
        reason: String,
    },

    /// 관계형 DB 조회 실패
    #[error("database error: {0}")]
    Database(String),

    /// 외부 키-값 저장소 호출 실패
    #[error("bulk store unavailable: {hop}: {reason}")]
    StoreUnavailable {
        /// 조회 단계 (pivot, issues, paths)
        hop: String,
        /// 실패 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 내부 처리 에러
    #[error("internal error: {0}")]
    Internal(String),

    /// 파일 I/O 에러
    #[error("io error: {path}: {source}")]
    Io {
        /// 관련 파일 경로
        path: String,
        /// 원본 I/O 에러
        source: std::io::Error,
    },
}

impl From<IssueResolverError> for PurlsightError {
    fn from(err: IssueResolverError) -> Self {
        match err {
            IssueResolverError::Validation(msg) => PurlsightError::Validation(msg),
            IssueResolverError::PurlParse { purl, reason } => {
                PurlsightError::Parse(ParseError::Purl { purl, reason })
            }
            IssueResolverError::RequirementParse {
                requirement,
                reason,
            } => PurlsightError::Parse(ParseError::Requirement {
                requirement,
                reason,
            }),
            IssueResolverError::Database(msg) => {
                PurlsightError::Storage(StorageError::Query(msg))
            }
            IssueResolverError::StoreUnavailable { hop, reason } => {
                PurlsightError::Storage(StorageError::BulkStore(format!("{hop}: {reason}")))
            }
            IssueResolverError::Config { field, reason } => {
                PurlsightError::Config(ConfigError::InvalidValue { field, reason })
            }
            IssueResolverError::Internal(msg) => PurlsightError::Internal(msg),
            IssueResolverError::Io { path, source } => {
                PurlsightError::Internal(format!("io error: {path}: {source}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purl_parse_error_display() {
        let err = IssueResolverError::PurlParse {
            purl: "npm/lodash".to_owned(),
            reason: "missing scheme".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("npm/lodash"));
        assert!(msg.contains("missing scheme"));
    }

    #[test]
    fn store_unavailable_display_names_hop() {
        let err = IssueResolverError::StoreUnavailable {
            hop: "issues".to_owned(),
            reason: "exit status 1".to_owned(),
        };
        assert_eq!(err.to_string(), "bulk store unavailable: issues: exit status 1");
    }

    #[test]
    fn io_error_display() {
        let err = IssueResolverError::Io {
            path: "/tmp/x-pivot.txt".to_owned(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("/tmp/x-pivot.txt"));
    }

    #[test]
    fn converts_validation() {
        let err: PurlsightError = IssueResolverError::Validation("empty".to_owned()).into();
        assert!(matches!(err, PurlsightError::Validation(_)));
    }

    #[test]
    fn converts_purl_parse() {
        let err: PurlsightError = IssueResolverError::PurlParse {
            purl: "x".to_owned(),
            reason: "bad".to_owned(),
        }
        .into();
        assert!(matches!(err, PurlsightError::Parse(ParseError::Purl { .. })));
    }

    #[test]
    fn converts_requirement_parse() {
        let err: PurlsightError = IssueResolverError::RequirementParse {
            requirement: "!!1".to_owned(),
            reason: "bad operator".to_owned(),
        }
        .into();
        assert!(matches!(
            err,
            PurlsightError::Parse(ParseError::Requirement { .. })
        ));
    }

    #[test]
    fn converts_database() {
        let err: PurlsightError = IssueResolverError::Database("pool timed out".to_owned()).into();
        assert!(matches!(err, PurlsightError::Storage(StorageError::Query(_))));
    }

    #[test]
    fn converts_store_unavailable() {
        let err: PurlsightError = IssueResolverError::StoreUnavailable {
            hop: "paths".to_owned(),
            reason: "timeout".to_owned(),
        }
        .into();
        assert!(matches!(
            err,
            PurlsightError::Storage(StorageError::BulkStore(_))
        ));
    }

    #[test]
    fn converts_config() {
        let err: PurlsightError = IssueResolverError::Config {
            field: "pivot_table".to_owned(),
            reason: "empty".to_owned(),
        }
        .into();
        assert!(matches!(
            err,
            PurlsightError::Config(ConfigError::InvalidValue { .. })
        ));
    }
}
