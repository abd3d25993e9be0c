//! 설정 관리 — purlsight.toml 파싱 및 런타임 설정
//!
//! [`PurlsightConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//! 프로세스 시작 시 한 번 로드되며, 이후에는 불변 값으로 각 컴포넌트 생성자에 전달됩니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`PURLSIGHT_LDB_BIN_PATH=/usr/bin/ldb` 형식)
//! 3. 설정 파일 (`purlsight.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), purlsight_core::error::PurlsightError> {
//! use purlsight_core::config::PurlsightConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = PurlsightConfig::load("purlsight.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = PurlsightConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, PurlsightError};

/// Purlsight 통합 설정
///
/// `purlsight.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PurlsightConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// HTTP API 서버 설정
    #[serde(default)]
    pub server: ServerConfig,
    /// 관계형 DB 설정
    #[serde(default)]
    pub database: DatabaseConfig,
    /// 외부 키-값 저장소(LDB) 설정
    #[serde(default)]
    pub ldb: LdbConfig,
    /// 버전 선택 설정
    #[serde(default)]
    pub resolver: ResolverSection,
    /// Prometheus 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl PurlsightConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, PurlsightError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, PurlsightError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PurlsightError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                PurlsightError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, PurlsightError> {
        toml::from_str(toml_str).map_err(|e| {
            PurlsightError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `PURLSIGHT_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "PURLSIGHT_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "PURLSIGHT_GENERAL_LOG_FORMAT");

        // Server
        override_string(&mut self.server.listen_addr, "PURLSIGHT_SERVER_LISTEN_ADDR");
        override_u16(&mut self.server.port, "PURLSIGHT_SERVER_PORT");

        // Database
        override_string(&mut self.database.url, "PURLSIGHT_DATABASE_URL");
        override_string(&mut self.database.driver, "PURLSIGHT_DATABASE_DRIVER");
        override_string(&mut self.database.host, "PURLSIGHT_DATABASE_HOST");
        override_string(&mut self.database.user, "PURLSIGHT_DATABASE_USER");
        override_string(&mut self.database.password, "PURLSIGHT_DATABASE_PASSWORD");
        override_string(&mut self.database.schema, "PURLSIGHT_DATABASE_SCHEMA");
        override_string(&mut self.database.ssl_mode, "PURLSIGHT_DATABASE_SSL_MODE");
        override_u32(
            &mut self.database.max_connections,
            "PURLSIGHT_DATABASE_MAX_CONNECTIONS",
        );

        // LDB
        override_string(&mut self.ldb.bin_path, "PURLSIGHT_LDB_BIN_PATH");
        override_string(&mut self.ldb.enc_bin_path, "PURLSIGHT_LDB_ENC_BIN_PATH");
        override_string(&mut self.ldb.root_dir, "PURLSIGHT_LDB_ROOT_DIR");
        override_string(&mut self.ldb.kb_name, "PURLSIGHT_LDB_KB_NAME");
        override_string(&mut self.ldb.pivot_table, "PURLSIGHT_LDB_PIVOT_TABLE");
        override_string(&mut self.ldb.issues_table, "PURLSIGHT_LDB_ISSUES_TABLE");
        override_string(&mut self.ldb.file_table, "PURLSIGHT_LDB_FILE_TABLE");
        override_string(&mut self.ldb.scratch_dir, "PURLSIGHT_LDB_SCRATCH_DIR");
        override_u64(&mut self.ldb.timeout_secs, "PURLSIGHT_LDB_TIMEOUT_SECS");

        // Resolver
        override_string(
            &mut self.resolver.selection_mode,
            "PURLSIGHT_RESOLVER_SELECTION_MODE",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "PURLSIGHT_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "PURLSIGHT_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "PURLSIGHT_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), PurlsightError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.server.port == 0 {
            return Err(invalid("server.port", "must be greater than 0".to_owned()));
        }

        if self.database.max_connections == 0 {
            return Err(invalid(
                "database.max_connections",
                "must be greater than 0".to_owned(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(invalid(
                "database.min_connections",
                "must not exceed max_connections".to_owned(),
            ));
        }

        if self.database.url.is_empty() && self.database.host.is_empty() {
            return Err(invalid(
                "database.url",
                "either url or host must be set".to_owned(),
            ));
        }

        for (field, value) in [
            ("ldb.bin_path", &self.ldb.bin_path),
            ("ldb.enc_bin_path", &self.ldb.enc_bin_path),
            ("ldb.scratch_dir", &self.ldb.scratch_dir),
        ] {
            if value.is_empty() {
                return Err(invalid(field, "must not be empty".to_owned()));
            }
        }

        // 테이블명은 쿼리 라인에 그대로 들어가므로 공백이 있으면 안 됨
        for (field, value) in [
            ("ldb.pivot_table", &self.ldb.pivot_table),
            ("ldb.issues_table", &self.ldb.issues_table),
            ("ldb.file_table", &self.ldb.file_table),
        ] {
            if value.is_empty() || value.chars().any(char::is_whitespace) {
                return Err(invalid(
                    field,
                    "must be non-empty and contain no whitespace".to_owned(),
                ));
            }
        }

        for (field, width) in [
            ("ldb.pivot_key_width", self.ldb.pivot_key_width),
            ("ldb.issues_key_width", self.ldb.issues_key_width),
            ("ldb.file_key_width", self.ldb.file_key_width),
        ] {
            if width == 0 || width > 64 {
                return Err(invalid(field, "must be 1-64".to_owned()));
            }
        }

        if self.ldb.timeout_secs == 0 || self.ldb.timeout_secs > 3600 {
            return Err(invalid("ldb.timeout_secs", "must be 1-3600".to_owned()));
        }

        let valid_modes = ["closest", "single_best"];
        if !valid_modes.contains(&self.resolver.selection_mode.as_str()) {
            return Err(invalid(
                "resolver.selection_mode",
                format!("must be one of: {}", valid_modes.join(", ")),
            ));
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(invalid("metrics.port", "must be greater than 0".to_owned()));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: String) -> PurlsightError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// HTTP API 서버 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 바인드 주소
    pub listen_addr: String,
    /// 바인드 포트
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1".to_owned(),
            port: 50061,
        }
    }
}

/// 관계형 DB 설정
///
/// `url`이 비어 있으면 개별 필드로 연결 문자열을 조립합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// 전체 연결 문자열 (설정 시 나머지 연결 필드는 무시)
    pub url: String,
    /// 드라이버 스킴 (postgres)
    pub driver: String,
    /// 호스트[:포트]
    pub host: String,
    /// 사용자명
    pub user: String,
    /// 비밀번호
    pub password: String,
    /// 데이터베이스명
    pub schema: String,
    /// sslmode 파라미터
    pub ssl_mode: String,
    /// 풀 최대 연결 수
    pub max_connections: u32,
    /// 풀 최소 유지 연결 수
    pub min_connections: u32,
    /// 유휴 연결 만료 (초)
    pub idle_timeout_secs: u64,
    /// 연결 최대 수명 (초)
    pub max_lifetime_secs: u64,
    /// 풀에서 연결을 얻기 위한 최대 대기 시간 (초)
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            driver: "postgres".to_owned(),
            host: "localhost:5432".to_owned(),
            user: "scanoss".to_owned(),
            password: String::new(),
            schema: "scanoss".to_owned(),
            ssl_mode: "disable".to_owned(),
            max_connections: 100,
            min_connections: 0,
            idle_timeout_secs: 30 * 60,
            max_lifetime_secs: 60 * 60,
            acquire_timeout_secs: 30,
        }
    }
}

impl DatabaseConfig {
    /// 실제 연결에 사용할 URL을 반환합니다.
    pub fn connection_url(&self) -> String {
        if !self.url.is_empty() {
            return self.url.clone();
        }
        format!(
            "{}://{}:{}@{}/{}?sslmode={}",
            self.driver, self.user, self.password, self.host, self.schema, self.ssl_mode
        )
    }
}

/// 외부 키-값 저장소(LDB) 설정
///
/// 테이블명과 바이너리 경로는 시작 시 고정되며 프로세스 수명 동안 변경되지 않습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LdbConfig {
    /// 일반 조회용 바이너리
    pub bin_path: String,
    /// 경로(paths) 조회용 인코딩 바이너리
    pub enc_bin_path: String,
    /// LDB 데이터 루트 디렉토리
    pub root_dir: String,
    /// 지식베이스 이름 (root_dir 하위 디렉토리)
    pub kb_name: String,
    /// url hash -> file hash 피벗 테이블
    pub pivot_table: String,
    /// file hash -> 이슈 테이블
    pub issues_table: String,
    /// file hash -> 경로 테이블
    pub file_table: String,
    /// 피벗 조회 hex 폭
    pub pivot_key_width: u32,
    /// 이슈 조회 hex 폭
    pub issues_key_width: u32,
    /// 경로 조회 hex 폭
    pub file_key_width: u32,
    /// 임시 스크립트 파일 디렉토리
    pub scratch_dir: String,
    /// 단일 조회 프로세스 최대 실행 시간 (초)
    pub timeout_secs: u64,
}

impl Default for LdbConfig {
    fn default() -> Self {
        Self {
            bin_path: "ldb".to_owned(),
            enc_bin_path: "ldb-enc".to_owned(),
            root_dir: "/var/lib/ldb".to_owned(),
            kb_name: "oss".to_owned(),
            pivot_table: "oss/pivot".to_owned(),
            issues_table: "oss/semgrep".to_owned(),
            file_table: "oss/file".to_owned(),
            pivot_key_width: 32,
            issues_key_width: 16,
            file_key_width: 32,
            scratch_dir: std::env::temp_dir().display().to_string(),
            timeout_secs: 60,
        }
    }
}

/// 버전 선택 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSection {
    /// 선택 모드 (closest, single_best)
    pub selection_mode: String,
}

impl Default for ResolverSection {
    fn default() -> Self {
        Self {
            selection_mode: "closest".to_owned(),
        }
    }
}

/// Prometheus 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 리스너 바인드 주소
    pub listen_addr: String,
    /// 리스너 포트
    pub port: u16,
    /// 스크레이프 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9100,
            endpoint: "/metrics".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    fn default_config_has_sane_values() {
        let config = PurlsightConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.ldb.pivot_key_width, 32);
        assert_eq!(config.ldb.issues_key_width, 16);
        assert_eq!(config.ldb.file_key_width, 32);
        assert_eq!(config.resolver.selection_mode, "closest");
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn default_config_passes_validation() {
        PurlsightConfig::default().validate().unwrap();
    }

    #[test]
    fn parse_empty_toml_uses_defaults() {
        let config = PurlsightConfig::parse("").unwrap();
        assert_eq!(config.ldb.pivot_table, "oss/pivot");
        assert_eq!(config.server.port, 50061);
    }

    #[test]
    fn parse_partial_toml_merges_with_defaults() {
        let toml = r#"
[ldb]
bin_path = "/opt/ldb/bin/ldb"
issues_table = "oss/semgrep2"

[resolver]
selection_mode = "single_best"
"#;
        let config = PurlsightConfig::parse(toml).unwrap();
        assert_eq!(config.ldb.bin_path, "/opt/ldb/bin/ldb");
        assert_eq!(config.ldb.issues_table, "oss/semgrep2");
        // 나머지는 기본값 유지
        assert_eq!(config.ldb.file_table, "oss/file");
        assert_eq!(config.resolver.selection_mode, "single_best");
        config.validate().unwrap();
    }

    #[test]
    fn parse_invalid_toml_returns_error() {
        let err = PurlsightConfig::parse("invalid = [[[toml").unwrap_err();
        assert!(matches!(
            err,
            PurlsightError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = PurlsightConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_table_with_whitespace() {
        let mut config = PurlsightConfig::default();
        config.ldb.pivot_table = "oss/pivot key 00".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("pivot_table"));
    }

    #[test]
    fn validate_rejects_zero_width() {
        let mut config = PurlsightConfig::default();
        config.ldb.issues_key_width = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("issues_key_width"));
    }

    #[test]
    fn validate_rejects_unknown_selection_mode() {
        let mut config = PurlsightConfig::default();
        config.resolver.selection_mode = "newest".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("selection_mode"));
    }

    #[test]
    fn validate_rejects_min_above_max_connections() {
        let mut config = PurlsightConfig::default();
        config.database.min_connections = 10;
        config.database.max_connections = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn connection_url_prefers_explicit_url() {
        let mut db = DatabaseConfig::default();
        db.url = "postgres://u:p@db:5432/kb".to_owned();
        assert_eq!(db.connection_url(), "postgres://u:p@db:5432/kb");
    }

    #[test]
    fn connection_url_is_assembled_from_parts() {
        let db = DatabaseConfig {
            user: "reader".to_owned(),
            password: "secret".to_owned(),
            host: "db:5432".to_owned(),
            schema: "kb".to_owned(),
            ssl_mode: "require".to_owned(),
            ..Default::default()
        };
        assert_eq!(
            db.connection_url(),
            "postgres://reader:secret@db:5432/kb?sslmode=require"
        );
    }

    #[test]
    #[serial]
    fn env_override_string() {
        let mut val = "original".to_owned();
        // SAFETY: serial 테스트로 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_PURLSIGHT_STR", "overridden") };
        override_string(&mut val, "TEST_PURLSIGHT_STR");
        assert_eq!(val, "overridden");
        unsafe { std::env::remove_var("TEST_PURLSIGHT_STR") };
    }

    #[test]
    #[serial]
    fn env_override_u64_invalid_keeps_original() {
        let mut val = 60u64;
        // SAFETY: serial 테스트로 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_PURLSIGHT_U64_BAD", "sixty") };
        override_u64(&mut val, "TEST_PURLSIGHT_U64_BAD");
        assert_eq!(val, 60);
        unsafe { std::env::remove_var("TEST_PURLSIGHT_U64_BAD") };
    }

    #[test]
    #[serial]
    fn apply_env_overrides_sets_ldb_fields() {
        let mut config = PurlsightConfig::default();
        // SAFETY: serial 테스트로 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("PURLSIGHT_LDB_BIN_PATH", "/usr/local/bin/ldb") };
        unsafe { std::env::set_var("PURLSIGHT_LDB_TIMEOUT_SECS", "15") };
        config.apply_env_overrides();
        unsafe { std::env::remove_var("PURLSIGHT_LDB_BIN_PATH") };
        unsafe { std::env::remove_var("PURLSIGHT_LDB_TIMEOUT_SECS") };

        assert_eq!(config.ldb.bin_path, "/usr/local/bin/ldb");
        assert_eq!(config.ldb.timeout_secs, 15);
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = PurlsightConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = PurlsightConfig::parse(&toml_str).unwrap();
        assert_eq!(config.ldb.issues_table, parsed.ldb.issues_table);
        assert_eq!(config.database.max_connections, parsed.database.max_connections);
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let err = PurlsightConfig::from_file("/nonexistent/path/purlsight.toml")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PurlsightError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
