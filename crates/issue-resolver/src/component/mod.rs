//! 컴포넌트 조회 -- 관계형 DB에서 purl 이름별 후보 레코드 수집
//!
//! 요청 한 건당 한 번의 쿼리로 모든 purl 이름의 레코드를 가져오고,
//! 메모리에서 purl 이름별로 묶어 purl 하나당 O(1)로 접근합니다.
//!
//! [`ComponentRepository`] trait으로 저장소를 추상화하며,
//! 운영 구현은 [`PgComponentRepository`]입니다.

pub mod postgres;

use std::collections::HashMap;
use std::future::Future;

use tracing::debug;

use crate::error::IssueResolverError;
use crate::types::{CanonicalPurl, ComponentRecord};

pub use postgres::PgComponentRepository;

/// 컴포넌트 레코드 저장소
///
/// 구현체는 여러 요청에서 공유되므로 `Send + Sync`여야 합니다.
pub trait ComponentRepository: Send + Sync + 'static {
    /// purl 이름 목록에 해당하는 모든 레코드를 최신순으로 반환합니다.
    ///
    /// # Errors
    ///
    /// 쿼리/풀 실패 시 `IssueResolverError::Database`
    fn find_by_purl_names(
        &self,
        purl_names: &[String],
    ) -> impl Future<Output = Result<Vec<ComponentRecord>, IssueResolverError>> + Send;

    /// 저장소 연결 상태를 확인합니다.
    fn ping(&self) -> impl Future<Output = Result<(), IssueResolverError>> + Send;
}

/// purl 이름별로 묶인 후보 레코드
#[derive(Debug, Default)]
pub struct ComponentIndex {
    by_name: HashMap<String, Vec<ComponentRecord>>,
}

impl ComponentIndex {
    /// 레코드를 purl 이름별로 묶습니다. 각 묶음 안의 순서는 입력 순서를 따릅니다.
    pub fn from_records(records: Vec<ComponentRecord>) -> Self {
        let mut by_name: HashMap<String, Vec<ComponentRecord>> = HashMap::new();
        for record in records {
            by_name
                .entry(record.purl_name.clone())
                .or_default()
                .push(record);
        }
        Self { by_name }
    }

    /// 한 purl의 후보 레코드를 반환합니다.
    ///
    /// 레코드의 purl 타입이 비어있지 않고 요청 타입과 다르면 후보에서 제외합니다.
    pub fn candidates(&self, purl: &CanonicalPurl) -> Vec<ComponentRecord> {
        self.by_name
            .get(&purl.purl_name())
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.purl_type.is_empty() || r.purl_type.eq_ignore_ascii_case(&purl.purl_type))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 묶인 purl 이름 수
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// 비어있는지 여부
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// 저장소를 감싸 배치 단위 조회를 수행합니다.
pub struct ComponentLookup<R> {
    repository: R,
}

impl<R: ComponentRepository> ComponentLookup<R> {
    /// 저장소로 생성합니다.
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    /// 내부 저장소 참조
    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// purl 이름 배치를 한 번에 조회합니다. 중복 이름은 한 번만 질의합니다.
    ///
    /// # Errors
    ///
    /// - 이름 목록이 비어있으면 `IssueResolverError::Validation`
    /// - 저장소 실패는 그대로 전파
    pub async fn lookup(&self, purl_names: &[String]) -> Result<ComponentIndex, IssueResolverError> {
        let mut unique: Vec<String> = Vec::with_capacity(purl_names.len());
        for name in purl_names {
            if !name.is_empty() && !unique.contains(name) {
                unique.push(name.clone());
            }
        }
        if unique.is_empty() {
            return Err(IssueResolverError::Validation(
                "no purl names to look up".to_owned(),
            ));
        }

        let records = self.repository.find_by_purl_names(&unique).await?;
        debug!(names = unique.len(), records = records.len(), "component lookup finished");
        Ok(ComponentIndex::from_records(records))
    }
}

/// 테스트용 인메모리 저장소
#[cfg(test)]
#[derive(Default)]
pub struct MockComponentRepository {
    /// 반환할 레코드 (이름 필터링은 mock이 수행)
    pub records: Vec<ComponentRecord>,
    /// 조회 실패 시뮬레이션 여부
    pub fail: bool,
    /// 마지막으로 받은 이름 목록
    pub last_query: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl ComponentRepository for MockComponentRepository {
    async fn find_by_purl_names(
        &self,
        purl_names: &[String],
    ) -> Result<Vec<ComponentRecord>, IssueResolverError> {
        if let Ok(mut last) = self.last_query.lock() {
            *last = purl_names.to_vec();
        }
        if self.fail {
            return Err(IssueResolverError::Database("connection refused".to_owned()));
        }
        Ok(self
            .records
            .iter()
            .filter(|r| purl_names.contains(&r.purl_name))
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<(), IssueResolverError> {
        if self.fail {
            return Err(IssueResolverError::Database("connection refused".to_owned()));
        }
        Ok(())
    }
}
