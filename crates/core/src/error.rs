//! 에러 타입 — 도메인별 에러 정의

/// Purlsight 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum PurlsightError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 요청 검증 에러
    #[error("validation error: {0}")]
    Validation(String),

    /// 파싱 에러
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// 스토리지 에러 (관계형 DB, LDB)
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// 내부 처리 에러
    #[error("internal error: {0}")]
    Internal(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파싱 에러
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// 잘못된 purl
    #[error("invalid purl '{purl}': {reason}")]
    Purl { purl: String, reason: String },

    /// 잘못된 버전 요구사항
    #[error("invalid version requirement '{requirement}': {reason}")]
    Requirement { requirement: String, reason: String },
}

/// 스토리지 에러
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// 관계형 DB 연결 실패
    #[error("connection failed: {0}")]
    Connection(String),

    /// 쿼리 실패
    #[error("query failed: {0}")]
    Query(String),

    /// 외부 키-값 저장소(LDB) 사용 불가
    #[error("bulk store unavailable: {0}")]
    BulkStore(String),
}
