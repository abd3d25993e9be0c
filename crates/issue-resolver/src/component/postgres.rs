//! PostgreSQL 컴포넌트 저장소
//!
//! `all_urls`, `mines`, `versions` 테이블을 읽기 전용으로 조인합니다.
//! 연결은 요청마다 풀에서 빌려 쓰고, 쿼리 future가 끝나거나 drop되면 풀로 반환됩니다.

use std::time::Duration;

use purlsight_core::config::DatabaseConfig;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{debug, info};

use super::ComponentRepository;
use crate::error::IssueResolverError;
use crate::types::ComponentRecord;

/// purl 이름 배치 조회. 아카이브 해시가 없는 행은 제외하고 최신순으로 정렬합니다.
const FIND_BY_PURL_NAMES: &str = "\
SELECT u.package_hash AS url_hash, \
       COALESCE(u.component, '') AS component, \
       COALESCE(v.version_name, '') AS version, \
       COALESCE(v.semver, '') AS semver, \
       u.purl_name AS purl_name, \
       COALESCE(m.purl_type, '') AS purl_type, \
       CAST(COALESCE(u.mine_id, 0) AS BIGINT) AS mine_id \
FROM all_urls u \
LEFT JOIN mines m ON u.mine_id = m.id \
LEFT JOIN versions v ON u.version_id = v.id \
WHERE u.purl_name = ANY($1) AND u.package_hash != '' \
ORDER BY u.date DESC";

/// `PgPool` 기반 컴포넌트 저장소
#[derive(Clone)]
pub struct PgComponentRepository {
    pool: PgPool,
}

impl PgComponentRepository {
    /// 기존 풀로 생성합니다.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 설정으로 풀을 만들고 연결을 확인합니다.
    ///
    /// # Errors
    ///
    /// 연결 또는 `SELECT 1` 실패 시 `IssueResolverError::Database`
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, IssueResolverError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.connection_url())
            .await
            .map_err(|e| IssueResolverError::Database(format!("failed to connect: {e}")))?;

        let repository = Self::new(pool);
        repository.ping().await?;
        info!(
            max_connections = config.max_connections,
            host = config.host.as_str(),
            "component database connected"
        );
        Ok(repository)
    }

    /// 내부 풀 참조
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl ComponentRepository for PgComponentRepository {
    async fn find_by_purl_names(
        &self,
        purl_names: &[String],
    ) -> Result<Vec<ComponentRecord>, IssueResolverError> {
        let records = sqlx::query_as::<_, ComponentRecord>(FIND_BY_PURL_NAMES)
            .bind(purl_names)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| IssueResolverError::Database(format!("component query failed: {e}")))?;
        debug!(names = purl_names.len(), rows = records.len(), "component rows fetched");
        Ok(records)
    }

    async fn ping(&self) -> Result<(), IssueResolverError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| IssueResolverError::Database(format!("ping failed: {e}")))
    }
}
