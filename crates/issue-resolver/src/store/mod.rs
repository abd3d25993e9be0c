//! 외부 키-값 저장소(LDB) 조회
//!
//! 해시 키 기반 저장소에 대한 세 단계 배치 조회를 다룹니다.
//!
//! | 단계 | 키 | 폭 | 필드 수 | 바이너리 | 결과 |
//! |---|---|---|---|---|---|
//! | pivot | url hash | 32 | 3 | plain | url -> [file] |
//! | issues | file hash | 16 | 5 | plain | file -> [issue] |
//! | paths | file hash | 32 | 3 | encoded | (file, url) -> path |
//!
//! - [`BulkKeyValueStore`]: 스크립트 한 번 실행 후 원문 출력을 돌려주는 저장소 추상화
//! - [`LdbStore`]: 임시 스크립트 파일 + 하위 프로세스 구현
//! - [`BulkStoreClient`]: 키 중복 제거, 실행, 출력 파싱, 실패 시 빈 결과로 저하

pub mod client;
pub mod ldb;

use std::fmt;
use std::future::Future;

use crate::error::IssueResolverError;

pub use client::BulkStoreClient;
pub use ldb::{LdbStore, TableAvailability};

/// 조회 단계
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hop {
    /// url hash -> file hash
    Pivot,
    /// file hash -> 이슈
    Issues,
    /// file hash -> 경로
    Paths,
}

impl Hop {
    /// 로그/메트릭 레이블 값
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pivot => "pivot",
            Self::Issues => "issues",
            Self::Paths => "paths",
        }
    }

    /// 출력 라인의 기대 필드 수
    pub fn expected_fields(&self) -> usize {
        match self {
            Self::Pivot | Self::Paths => 3,
            Self::Issues => 5,
        }
    }

    /// 사용할 바이너리
    pub fn binary(&self) -> StoreBinary {
        match self {
            Self::Pivot | Self::Issues => StoreBinary::Plain,
            Self::Paths => StoreBinary::Encoded,
        }
    }
}

impl fmt::Display for Hop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 저장소 바이너리 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBinary {
    /// 일반 바이너리
    Plain,
    /// 경로 복호화가 가능한 인코딩 바이너리
    Encoded,
}

/// 한 단계의 배치 조회 요청
///
/// `keys`는 이미 중복 제거된 상태여야 합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HopQuery {
    /// 조회 단계
    pub hop: Hop,
    /// 대상 테이블
    pub table: String,
    /// 중복 없는 키 목록
    pub keys: Vec<String>,
    /// `csv hex` 폭
    pub width: u32,
    /// 바이너리 종류
    pub binary: StoreBinary,
}

impl HopQuery {
    /// 스크립트 본문을 만듭니다. 키 하나당 한 줄입니다.
    pub fn script(&self) -> String {
        let mut script = String::with_capacity(self.keys.len() * (self.table.len() + 64));
        for key in &self.keys {
            script.push_str("select from ");
            script.push_str(&self.table);
            script.push_str(" key ");
            script.push_str(key);
            script.push_str(" csv hex ");
            script.push_str(&self.width.to_string());
            script.push('\n');
        }
        script
    }
}

/// 배치 스크립트를 실행하는 해시 키 저장소
pub trait BulkKeyValueStore: Send + Sync + 'static {
    /// 스크립트를 한 번 실행하고 표준 출력 원문을 반환합니다.
    ///
    /// # Errors
    ///
    /// 실행 실패, 비정상 종료, 시간 초과, UTF-8 아닌 출력은
    /// `IssueResolverError::StoreUnavailable`
    fn select(
        &self,
        query: &HopQuery,
    ) -> impl Future<Output = Result<String, IssueResolverError>> + Send;
}
