//! 이슈 리졸버 -- 요청 한 건의 전체 해석 흐름
//!
//! [`IssueResolver`]는 purl 배치를 받아 purl별 파일 이슈 리포트를 만듭니다.
//!
//! # 내부 흐름
//!
//! ```text
//! [PurlQuery] --> resolve_purl --> ComponentLookup (DB 1회)
//!                                        |
//!                                  VersionSelector (purl별)
//!                                        |
//!                        url hashes --> pivot (1회) --> file hashes
//!                                                           |
//!                                                   issues (1회)
//!                                                           |
//!                                  (file, url) 쌍 --> paths (1회)
//!                                                           |
//!                                                   [PurlIssues]
//! ```
//!
//! 입력 하나당 출력 항목 하나를 입력 순서대로 만들며, 파싱 실패나 후보 없음도
//! 빈 파일 목록을 가진 항목으로 남습니다.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use metrics::{counter, histogram};
use purlsight_core::metrics as m;
use tracing::{debug, info, warn};

use crate::component::{ComponentIndex, ComponentLookup, ComponentRepository};
use crate::config::{ResolverConfig, StoreConfig};
use crate::error::IssueResolverError;
use crate::purl::resolve_purl;
use crate::store::{BulkKeyValueStore, BulkStoreClient};
use crate::types::{
    FileIssues, FileUrlKey, IssueItem, PurlIssues, PurlQuery, ResolvedPurl, SelectionResult,
};
use crate::version::VersionSelector;

/// 요청 단위 purl 이슈 해석기
pub struct IssueResolver<R, S> {
    lookup: ComponentLookup<R>,
    selector: VersionSelector,
    store: BulkStoreClient<S>,
    /// 처리한 요청 수
    requests_handled: Arc<AtomicU64>,
}

/// purl 하나의 중간 상태
struct Pending<'q> {
    query: &'q PurlQuery,
    resolved: Option<ResolvedPurl>,
    selection: SelectionResult,
}

/// 이슈가 확인된 (파일, 소유 url)
struct Found<'a> {
    file_hash: &'a str,
    url_hash: &'a str,
    issues: &'a [IssueItem],
}

impl<R: ComponentRepository, S: BulkKeyValueStore> IssueResolver<R, S> {
    /// 처리한 요청 수를 반환합니다.
    pub fn requests_handled(&self) -> u64 {
        self.requests_handled.load(Ordering::Relaxed)
    }

    /// 컴포넌트 저장소 참조 (헬스 체크용)
    pub fn repository(&self) -> &R {
        self.lookup.repository()
    }

    /// 외부 저장소 참조
    pub fn store(&self) -> &S {
        self.store.store()
    }

    /// purl 배치를 해석해 purl별 이슈 리포트를 반환합니다.
    ///
    /// # Errors
    ///
    /// - 입력이 비어있으면 `IssueResolverError::Validation` (외부 호출 전)
    /// - 관계형 DB 실패는 `IssueResolverError::Database`
    ///
    /// 외부 저장소 실패는 에러가 아니며 해당 단계가 빈 결과로 처리됩니다.
    pub async fn resolve(&self, queries: &[PurlQuery]) -> Result<Vec<PurlIssues>, IssueResolverError> {
        if queries.is_empty() {
            counter!(m::RESOLVER_REQUESTS_TOTAL, m::LABEL_RESULT => "invalid").increment(1);
            return Err(IssueResolverError::Validation("no purls supplied".to_owned()));
        }

        let started = Instant::now();
        let result = self.resolve_batch(queries).await;
        histogram!(m::RESOLVER_REQUEST_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
        self.requests_handled.fetch_add(1, Ordering::Relaxed);

        let label = if result.is_ok() { "success" } else { "failure" };
        counter!(m::RESOLVER_REQUESTS_TOTAL, m::LABEL_RESULT => label).increment(1);
        result
    }

    async fn resolve_batch(&self, queries: &[PurlQuery]) -> Result<Vec<PurlIssues>, IssueResolverError> {
        let mut pending: Vec<Pending<'_>> = queries.iter().map(|q| self.prepare(q)).collect();

        let names: Vec<String> = pending
            .iter()
            .filter_map(|p| p.resolved.as_ref())
            .map(|r| r.canonical.purl_name())
            .collect();
        if names.is_empty() {
            info!(purls = queries.len(), "no valid purls in batch, skipping lookups");
            return Ok(pending.iter().map(|p| emit(p, Vec::new())).collect());
        }

        let index = self.lookup.lookup(&names).await?;
        self.select_versions(&mut pending, &index);

        // 1단계: 배치 전체 url hash
        let url_hashes: Vec<String> = pending
            .iter()
            .flat_map(|p| p.selection.url_hashes())
            .map(str::to_owned)
            .collect();
        let pivot = self.store.pivot(&url_hashes).await;

        // 2단계: 배치 전체 file hash
        let file_hashes: Vec<String> = pending
            .iter()
            .flat_map(|p| p.selection.url_hashes())
            .filter_map(|url| pivot.get(url))
            .flatten()
            .cloned()
            .collect();
        let issues = self.store.issues(&file_hashes).await;

        // 이슈가 있는 파일만 (purl, url, file) 순서대로 수집
        let found: Vec<Vec<Found<'_>>> = pending
            .iter()
            .map(|p| {
                p.selection
                    .url_hashes()
                    .flat_map(|url| {
                        pivot
                            .get(url)
                            .into_iter()
                            .flatten()
                            .filter_map(|file| {
                                issues.get(file).filter(|list| !list.is_empty()).map(|list| Found {
                                    file_hash: file.as_str(),
                                    url_hash: url,
                                    issues: list.as_slice(),
                                })
                            })
                            .collect::<Vec<_>>()
                    })
                    .collect()
            })
            .collect();

        // 3단계: 복합 키로 경로 조회
        let composite: Vec<FileUrlKey> = found
            .iter()
            .flatten()
            .map(|f| FileUrlKey::new(f.file_hash, f.url_hash))
            .collect();
        let paths = self.store.paths(&composite).await;

        let report: Vec<PurlIssues> = pending
            .iter()
            .zip(found)
            .map(|(p, files)| {
                let files = files
                    .into_iter()
                    .map(|f| FileIssues {
                        file_hash: f.file_hash.to_owned(),
                        path: paths
                            .get(&FileUrlKey::new(f.file_hash, f.url_hash))
                            .cloned()
                            .unwrap_or_default(),
                        issues: f.issues.to_vec(),
                    })
                    .collect();
                emit(p, files)
            })
            .collect();

        debug!(
            purls = report.len(),
            urls = url_hashes.len(),
            files = composite.len(),
            "issue report assembled"
        );
        Ok(report)
    }

    /// 입력 하나를 해석합니다. 실패하면 조회에서 제외합니다.
    fn prepare<'q>(&self, query: &'q PurlQuery) -> Pending<'q> {
        match resolve_purl(query) {
            Ok(resolved) => Pending {
                query,
                selection: SelectionResult::empty(
                    resolved.canonical.purl_name(),
                    &resolved.canonical.purl_type,
                    &resolved.requirement,
                ),
                resolved: Some(resolved),
            },
            Err(e) => {
                warn!(
                    purl = query.purl.as_str(),
                    requirement = query.requirement.as_str(),
                    error = %e,
                    "skipping malformed purl"
                );
                counter!(m::RESOLVER_PURLS_SKIPPED_TOTAL).increment(1);
                Pending {
                    query,
                    resolved: None,
                    selection: SelectionResult::empty("", "", &query.requirement),
                }
            }
        }
    }

    fn select_versions(&self, pending: &mut [Pending<'_>], index: &ComponentIndex) {
        for p in pending.iter_mut() {
            if let Some(resolved) = &p.resolved {
                let candidates = index.candidates(&resolved.canonical);
                p.selection = self.selector.select(resolved, &candidates);
            }
        }
    }
}

fn emit(pending: &Pending<'_>, files: Vec<FileIssues>) -> PurlIssues {
    PurlIssues {
        purl: pending.query.purl.clone(),
        requirement: pending.selection.requirement.clone(),
        version: pending.selection.selected_version.clone().unwrap_or_default(),
        files,
    }
}

/// [`IssueResolver`] 빌더
pub struct IssueResolverBuilder<R, S> {
    repository: Option<R>,
    store: Option<S>,
    resolver_config: ResolverConfig,
    store_config: StoreConfig,
}

impl<R: ComponentRepository, S: BulkKeyValueStore> IssueResolverBuilder<R, S> {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            repository: None,
            store: None,
            resolver_config: ResolverConfig::default(),
            store_config: StoreConfig::default(),
        }
    }

    /// 컴포넌트 저장소를 지정합니다.
    pub fn repository(mut self, repository: R) -> Self {
        self.repository = Some(repository);
        self
    }

    /// 외부 키-값 저장소를 지정합니다.
    pub fn store(mut self, store: S) -> Self {
        self.store = Some(store);
        self
    }

    /// 버전 선택 설정을 지정합니다.
    pub fn resolver_config(mut self, config: ResolverConfig) -> Self {
        self.resolver_config = config;
        self
    }

    /// 저장소 설정을 지정합니다.
    pub fn store_config(mut self, config: StoreConfig) -> Self {
        self.store_config = config;
        self
    }

    /// 리졸버를 빌드합니다.
    ///
    /// # Errors
    ///
    /// 저장소 미지정 또는 설정 검증 실패 시 `IssueResolverError::Config`
    pub fn build(self) -> Result<IssueResolver<R, S>, IssueResolverError> {
        self.store_config.validate()?;

        let repository = self.repository.ok_or_else(|| IssueResolverError::Config {
            field: "repository".to_owned(),
            reason: "component repository is required".to_owned(),
        })?;
        let store = self.store.ok_or_else(|| IssueResolverError::Config {
            field: "store".to_owned(),
            reason: "bulk store is required".to_owned(),
        })?;

        Ok(IssueResolver {
            lookup: ComponentLookup::new(repository),
            selector: VersionSelector::new(self.resolver_config.selection_mode),
            store: BulkStoreClient::new(store, self.store_config),
            requests_handled: Arc::new(AtomicU64::new(0)),
        })
    }
}

impl<R: ComponentRepository, S: BulkKeyValueStore> Default for IssueResolverBuilder<R, S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::component::MockComponentRepository;
    use crate::store::{Hop, HopQuery};
    use crate::types::{ComponentRecord, SelectionMode};

    /// 단계별로 고정 출력을 돌려주는 저장소
    #[derive(Default)]
    struct ScriptedStore {
        outputs: HashMap<Hop, String>,
        calls: Mutex<Vec<Hop>>,
    }

    impl ScriptedStore {
        fn with(mut self, hop: Hop, output: &str) -> Self {
            self.outputs.insert(hop, output.to_owned());
            self
        }
    }

    impl BulkKeyValueStore for ScriptedStore {
        async fn select(&self, query: &HopQuery) -> Result<String, IssueResolverError> {
            self.calls.lock().unwrap().push(query.hop);
            Ok(self.outputs.get(&query.hop).cloned().unwrap_or_default())
        }
    }

    fn record(url_hash: &str, purl_name: &str, version: &str) -> ComponentRecord {
        ComponentRecord {
            url_hash: url_hash.to_owned(),
            component: purl_name.to_owned(),
            version: version.to_owned(),
            semver: String::new(),
            purl_name: purl_name.to_owned(),
            purl_type: "npm".to_owned(),
            mine_id: 1,
        }
    }

    fn resolver(
        records: Vec<ComponentRecord>,
        store: ScriptedStore,
    ) -> IssueResolver<MockComponentRepository, ScriptedStore> {
        IssueResolverBuilder::new()
            .repository(MockComponentRepository {
                records,
                ..Default::default()
            })
            .store(store)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn empty_batch_is_validation_error() {
        let resolver = resolver(Vec::new(), ScriptedStore::default());
        let err = resolver.resolve(&[]).await.unwrap_err();
        assert!(matches!(err, IssueResolverError::Validation(_)));
        assert!(resolver.store().calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn full_flow_builds_report() {
        let store = ScriptedStore::default()
            .with(Hop::Pivot, "u2,f1,x\nu2,f2,x\n")
            .with(Hop::Issues, "f1,rule.a,1,4,WARNING\nf1,rule.b,8,8,ERROR\n")
            .with(Hop::Paths, "f1,u2,lib/index.js\n");
        let resolver = resolver(
            vec![record("u1", "lodash", "4.16.0"), record("u2", "lodash", "4.17.5")],
            store,
        );

        let report = resolver
            .resolve(&[PurlQuery::new("pkg:npm/lodash", "^4.17.0")])
            .await
            .unwrap();

        assert_eq!(report.len(), 1);
        let entry = &report[0];
        assert_eq!(entry.purl, "pkg:npm/lodash");
        assert_eq!(entry.version, "4.17.5");
        assert_eq!(entry.files.len(), 1, "files without issues are excluded");
        assert_eq!(entry.files[0].file_hash, "f1");
        assert_eq!(entry.files[0].path, "lib/index.js");
        assert_eq!(entry.files[0].issues.len(), 2);
        assert_eq!(
            *resolver.store().calls.lock().unwrap(),
            vec![Hop::Pivot, Hop::Issues, Hop::Paths]
        );
        assert_eq!(resolver.requests_handled(), 1);
    }

    #[tokio::test]
    async fn every_input_gets_an_entry_in_order() {
        let resolver = resolver(vec![record("u1", "react", "18.0.0")], ScriptedStore::default());
        let queries = [
            PurlQuery::new("not-a-purl", ""),
            PurlQuery::new("pkg:npm/react@18.0.0", ""),
            PurlQuery::new("pkg:npm/unknown", ""),
        ];
        let report = resolver.resolve(&queries).await.unwrap();

        let purls: Vec<&str> = report.iter().map(|r| r.purl.as_str()).collect();
        assert_eq!(purls, vec!["not-a-purl", "pkg:npm/react@18.0.0", "pkg:npm/unknown"]);
        assert_eq!(report[0].version, "");
        assert_eq!(report[1].version, "18.0.0");
        assert_eq!(report[1].requirement, "18.0.0");
        assert!(report.iter().all(|r| r.files.is_empty()));
    }

    #[tokio::test]
    async fn all_malformed_skips_lookups() {
        let resolver = resolver(Vec::new(), ScriptedStore::default());
        let report = resolver
            .resolve(&[PurlQuery::new("", ""), PurlQuery::new("npm/x", "")])
            .await
            .unwrap();
        assert_eq!(report.len(), 2);
        assert!(resolver.repository().last_query.lock().unwrap().is_empty());
        assert!(resolver.store().calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn database_failure_is_fatal() {
        let resolver: IssueResolver<_, ScriptedStore> = IssueResolverBuilder::new()
            .repository(MockComponentRepository {
                fail: true,
                ..Default::default()
            })
            .store(ScriptedStore::default())
            .build()
            .unwrap();
        let err = resolver
            .resolve(&[PurlQuery::new("pkg:npm/lodash", "")])
            .await
            .unwrap_err();
        assert!(matches!(err, IssueResolverError::Database(_)));
    }

    #[tokio::test]
    async fn shared_file_is_emitted_once_per_owning_url() {
        let store = ScriptedStore::default()
            .with(Hop::Pivot, "u1,f1,x\nu2,f1,x\n")
            .with(Hop::Issues, "f1,r,1,1,INFO\n")
            .with(Hop::Paths, "f1,u1,a/x.js\nf1,u2,b/x.js\n");
        let resolver = resolver(
            vec![record("u1", "lodash", "1.0.0"), record("u2", "lodash", "1.0.0")],
            store,
        );

        let report = resolver
            .resolve(&[PurlQuery::new("pkg:npm/lodash", "")])
            .await
            .unwrap();
        let paths: Vec<&str> = report[0].files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["a/x.js", "b/x.js"]);
    }

    #[tokio::test]
    async fn missing_path_is_empty_string() {
        let store = ScriptedStore::default()
            .with(Hop::Pivot, "u1,f1,x\n")
            .with(Hop::Issues, "f1,r,1,1,INFO\n");
        let resolver = resolver(vec![record("u1", "lodash", "1.0.0")], store);

        let report = resolver
            .resolve(&[PurlQuery::new("pkg:npm/lodash", "")])
            .await
            .unwrap();
        assert_eq!(report[0].files[0].path, "");
    }

    #[tokio::test]
    async fn no_issues_skips_paths_hop() {
        let store = ScriptedStore::default().with(Hop::Pivot, "u1,f1,x\n");
        let resolver = resolver(vec![record("u1", "lodash", "1.0.0")], store);

        let report = resolver
            .resolve(&[PurlQuery::new("pkg:npm/lodash", "")])
            .await
            .unwrap();
        assert!(report[0].files.is_empty());
        assert_eq!(
            *resolver.store().calls.lock().unwrap(),
            vec![Hop::Pivot, Hop::Issues]
        );
    }

    #[tokio::test]
    async fn single_best_mode_limits_urls() {
        let store = ScriptedStore::default()
            .with(Hop::Pivot, "u1,f1,x\nu2,f2,x\n")
            .with(Hop::Issues, "f1,r,1,1,INFO\nf2,r,1,1,INFO\n");
        let resolver: IssueResolver<_, ScriptedStore> = IssueResolverBuilder::new()
            .repository(MockComponentRepository {
                records: vec![record("u1", "lodash", "2.0.0"), record("u2", "lodash", "2.0.0")],
                ..Default::default()
            })
            .store(store)
            .resolver_config(ResolverConfig {
                selection_mode: SelectionMode::SingleBest,
            })
            .build()
            .unwrap();

        let report = resolver
            .resolve(&[PurlQuery::new("pkg:npm/lodash", "")])
            .await
            .unwrap();
        let files: Vec<&str> = report[0].files.iter().map(|f| f.file_hash.as_str()).collect();
        assert_eq!(files, vec!["f1"]);
    }

    #[test]
    fn builder_requires_store() {
        let result = IssueResolverBuilder::<MockComponentRepository, ScriptedStore>::new()
            .repository(MockComponentRepository::default())
            .build();
        assert!(matches!(result, Err(IssueResolverError::Config { .. })));
    }
}
