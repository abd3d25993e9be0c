//! 리졸버 / 외부 저장소 설정
//!
//! [`ResolverConfig`]와 [`StoreConfig`]는 core의 [`PurlsightConfig`](purlsight_core::config::PurlsightConfig)
//! 섹션에서 파생되는 불변 값입니다. 시작 시 한 번 만들어져 각 컴포넌트 생성자에 전달되며,
//! 요청 처리 중에는 변경되지 않습니다.
//!
//! # 사용 예시
//!
//! ```
//! use purlsight_issue_resolver::{StoreConfig, StoreConfigBuilder};
//!
//! // 기본값으로 생성
//! let config = StoreConfig::default();
//! config.validate().unwrap();
//!
//! // 빌더로 생성
//! let config = StoreConfigBuilder::new()
//!     .bin_path("/usr/bin/ldb")
//!     .issues_table("oss/semgrep")
//!     .timeout_secs(30)
//!     .build()
//!     .unwrap();
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::IssueResolverError;
use crate::types::SelectionMode;

/// 버전 선택 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// 최고 버전 동률 처리 방식
    pub selection_mode: SelectionMode,
}

impl ResolverConfig {
    /// core 설정의 `[resolver]` 섹션에서 생성합니다.
    ///
    /// 알 수 없는 모드 문자열은 `Closest`로 대체됩니다.
    pub fn from_core(core: &purlsight_core::config::ResolverSection) -> Self {
        Self {
            selection_mode: SelectionMode::from_str_loose(&core.selection_mode)
                .unwrap_or_default(),
        }
    }
}

/// 최대 허용 hex 폭
const MAX_KEY_WIDTH: u32 = 64;
/// 최대 허용 프로세스 실행 시간 (초)
const MAX_TIMEOUT_SECS: u64 = 3600;

/// 외부 키-값 저장소(LDB) 설정
///
/// # 필드
///
/// - **bin_path / enc_bin_path**: 일반 / 인코딩 바이너리
/// - **pivot_table / issues_table / file_table**: 조회 단계별 테이블
/// - **\*_key_width**: 쿼리 라인의 `csv hex <width>` 값
/// - **scratch_dir**: 임시 스크립트 파일 위치
/// - **timeout_secs**: 단일 프로세스 실행 제한
/// - **root_dir / kb_name**: 시작 시 테이블 존재 확인용
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// 일반 조회 바이너리
    pub bin_path: String,
    /// 경로 조회용 인코딩 바이너리
    pub enc_bin_path: String,
    /// url hash -> file hash 테이블
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
    /// 임시 스크립트 디렉토리
    pub scratch_dir: PathBuf,
    /// 프로세스 실행 제한 (초)
    pub timeout_secs: u64,
    /// LDB 데이터 루트
    pub root_dir: PathBuf,
    /// 지식베이스 이름
    pub kb_name: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::from_core(&purlsight_core::config::LdbConfig::default())
    }
}

impl StoreConfig {
    /// core 설정의 `[ldb]` 섹션에서 생성합니다.
    pub fn from_core(core: &purlsight_core::config::LdbConfig) -> Self {
        Self {
            bin_path: core.bin_path.clone(),
            enc_bin_path: core.enc_bin_path.clone(),
            pivot_table: core.pivot_table.clone(),
            issues_table: core.issues_table.clone(),
            file_table: core.file_table.clone(),
            pivot_key_width: core.pivot_key_width,
            issues_key_width: core.issues_key_width,
            file_key_width: core.file_key_width,
            scratch_dir: PathBuf::from(&core.scratch_dir),
            timeout_secs: core.timeout_secs,
            root_dir: PathBuf::from(&core.root_dir),
            kb_name: core.kb_name.clone(),
        }
    }

    /// 설정 값의 유효성을 검증합니다.
    ///
    /// # 검증 규칙
    ///
    /// - 바이너리 경로: 비어있으면 안 됨
    /// - 테이블명: 비어있지 않고 공백 없음
    /// - hex 폭: 1-64
    /// - `timeout_secs`: 1-3600
    pub fn validate(&self) -> Result<(), IssueResolverError> {
        for (field, value) in [
            ("bin_path", &self.bin_path),
            ("enc_bin_path", &self.enc_bin_path),
        ] {
            if value.is_empty() {
                return Err(config_err(field, "must not be empty".to_owned()));
            }
        }

        for (field, value) in [
            ("pivot_table", &self.pivot_table),
            ("issues_table", &self.issues_table),
            ("file_table", &self.file_table),
        ] {
            if value.is_empty() || value.chars().any(char::is_whitespace) {
                return Err(config_err(
                    field,
                    "must be non-empty and contain no whitespace".to_owned(),
                ));
            }
        }

        for (field, width) in [
            ("pivot_key_width", self.pivot_key_width),
            ("issues_key_width", self.issues_key_width),
            ("file_key_width", self.file_key_width),
        ] {
            if width == 0 || width > MAX_KEY_WIDTH {
                return Err(config_err(field, format!("must be 1-{MAX_KEY_WIDTH}")));
            }
        }

        if self.timeout_secs == 0 || self.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(config_err(
                "timeout_secs",
                format!("must be 1-{MAX_TIMEOUT_SECS}"),
            ));
        }

        if self.scratch_dir.as_os_str().is_empty() {
            return Err(config_err("scratch_dir", "must not be empty".to_owned()));
        }

        Ok(())
    }
}

fn config_err(field: &str, reason: String) -> IssueResolverError {
    IssueResolverError::Config {
        field: field.to_owned(),
        reason,
    }
}

/// [`StoreConfig`] 빌더
///
/// 빌드 시 유효성 검증을 수행합니다.
#[derive(Default)]
pub struct StoreConfigBuilder {
    config: StoreConfig,
}

impl StoreConfigBuilder {
    /// 기본값을 가진 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 일반 바이너리 경로를 설정합니다.
    pub fn bin_path(mut self, path: impl Into<String>) -> Self {
        self.config.bin_path = path.into();
        self
    }

    /// 인코딩 바이너리 경로를 설정합니다.
    pub fn enc_bin_path(mut self, path: impl Into<String>) -> Self {
        self.config.enc_bin_path = path.into();
        self
    }

    /// 피벗 테이블을 설정합니다.
    pub fn pivot_table(mut self, table: impl Into<String>) -> Self {
        self.config.pivot_table = table.into();
        self
    }

    /// 이슈 테이블을 설정합니다.
    pub fn issues_table(mut self, table: impl Into<String>) -> Self {
        self.config.issues_table = table.into();
        self
    }

    /// 경로 테이블을 설정합니다.
    pub fn file_table(mut self, table: impl Into<String>) -> Self {
        self.config.file_table = table.into();
        self
    }

    /// 조회 단계별 hex 폭을 설정합니다.
    pub fn key_widths(mut self, pivot: u32, issues: u32, file: u32) -> Self {
        self.config.pivot_key_width = pivot;
        self.config.issues_key_width = issues;
        self.config.file_key_width = file;
        self
    }

    /// 임시 스크립트 디렉토리를 설정합니다.
    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_dir = dir.into();
        self
    }

    /// 프로세스 실행 제한(초)을 설정합니다.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    /// LDB 루트와 지식베이스 이름을 설정합니다.
    pub fn knowledge_base(mut self, root_dir: impl Into<PathBuf>, kb_name: impl Into<String>) -> Self {
        self.config.root_dir = root_dir.into();
        self.config.kb_name = kb_name.into();
        self
    }

    /// 설정을 검증하고 빌드합니다.
    ///
    /// # Errors
    ///
    /// 유효성 검증 실패 시 `IssueResolverError::Config` 반환
    pub fn build(self) -> Result<StoreConfig, IssueResolverError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
