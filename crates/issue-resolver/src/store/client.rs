//! 배치 조회 클라이언트 -- 키 정리, 실행, 출력 파싱
//!
//! 각 단계는 키 집합만의 순수 함수입니다. 키는 입력 순서를 유지한 채 중복과 빈 값을
//! 제거하며, 남은 키가 없으면 저장소를 호출하지 않습니다.
//!
//! 저장소 실패는 요청을 중단시키지 않습니다. 경고 로그를 남기고 해당 단계의 결과를
//! 빈 맵으로 대체합니다. 필드 수가 맞지 않는 출력 라인은 버리고 개수를 셉니다.

use std::collections::HashSet;
use std::time::Instant;

use metrics::{counter, histogram};
use purlsight_core::metrics as m;
use tracing::{debug, warn};

use super::{BulkKeyValueStore, Hop, HopQuery};
use crate::config::StoreConfig;
use crate::types::{FileUrlKey, IssueItem, IssueMap, PathMap, PivotMap};

/// 파싱 결과와 버려진 라인 수
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Parsed<T> {
    /// 파싱된 맵
    pub map: T,
    /// 필드 수가 맞지 않아 버려진 라인 수
    pub malformed: usize,
}

/// 세 단계 배치 조회를 수행하는 클라이언트
pub struct BulkStoreClient<S> {
    store: S,
    config: StoreConfig,
}

impl<S: BulkKeyValueStore> BulkStoreClient<S> {
    /// 저장소와 설정으로 생성합니다.
    pub fn new(store: S, config: StoreConfig) -> Self {
        Self { store, config }
    }

    /// 내부 저장소 참조
    pub fn store(&self) -> &S {
        &self.store
    }

    /// 1단계: url hash별 파일 해시 목록
    pub async fn pivot(&self, url_hashes: &[String]) -> PivotMap {
        let Some(output) = self.run(Hop::Pivot, url_hashes.iter().map(String::as_str)).await else {
            return PivotMap::new();
        };
        let parsed = parse_pivot(&output);
        record_malformed(Hop::Pivot, parsed.malformed);
        parsed.map
    }

    /// 2단계: 파일 해시별 이슈 목록
    pub async fn issues(&self, file_hashes: &[String]) -> IssueMap {
        let Some(output) = self.run(Hop::Issues, file_hashes.iter().map(String::as_str)).await else {
            return IssueMap::new();
        };
        let parsed = parse_issues(&output);
        record_malformed(Hop::Issues, parsed.malformed);
        parsed.map
    }

    /// 3단계: (파일, 소유 url) 쌍별 경로
    ///
    /// 저장소에 보내는 키는 파일 해시이며, 결과는 복합 키로 찾습니다.
    pub async fn paths(&self, keys: &[FileUrlKey]) -> PathMap {
        let Some(output) = self.run(Hop::Paths, keys.iter().map(|k| k.file_hash.as_str())).await else {
            return PathMap::new();
        };
        let parsed = parse_paths(&output);
        record_malformed(Hop::Paths, parsed.malformed);
        parsed.map
    }

    /// 키를 정리하고 저장소를 한 번 호출합니다. 키가 없거나 실패하면 `None`.
    async fn run<'k>(&self, hop: Hop, keys: impl Iterator<Item = &'k str>) -> Option<String> {
        let keys = dedup_keys(keys);
        if keys.is_empty() {
            debug!(hop = hop.as_str(), "no keys, skipping bulk store");
            counter!(m::STORE_HOP_INVOCATIONS_TOTAL, m::LABEL_HOP => hop.as_str(), m::LABEL_RESULT => "skipped")
                .increment(1);
            return None;
        }

        let query = HopQuery {
            hop,
            table: self.table(hop).to_owned(),
            width: self.width(hop),
            binary: hop.binary(),
            keys,
        };

        let started = Instant::now();
        let result = self.store.select(&query).await;
        histogram!(m::STORE_HOP_DURATION_SECONDS, m::LABEL_HOP => hop.as_str())
            .record(started.elapsed().as_secs_f64());

        match result {
            Ok(output) => {
                counter!(m::STORE_HOP_INVOCATIONS_TOTAL, m::LABEL_HOP => hop.as_str(), m::LABEL_RESULT => "success")
                    .increment(1);
                debug!(hop = hop.as_str(), keys = query.keys.len(), bytes = output.len(), "bulk store answered");
                Some(output)
            }
            Err(e) => {
                counter!(m::STORE_HOP_INVOCATIONS_TOTAL, m::LABEL_HOP => hop.as_str(), m::LABEL_RESULT => "failure")
                    .increment(1);
                warn!(
                    hop = hop.as_str(),
                    keys = query.keys.len(),
                    error = %e,
                    "bulk store unavailable, continuing with empty result"
                );
                None
            }
        }
    }

    fn table(&self, hop: Hop) -> &str {
        match hop {
            Hop::Pivot => &self.config.pivot_table,
            Hop::Issues => &self.config.issues_table,
            Hop::Paths => &self.config.file_table,
        }
    }

    fn width(&self, hop: Hop) -> u32 {
        match hop {
            Hop::Pivot => self.config.pivot_key_width,
            Hop::Issues => self.config.issues_key_width,
            Hop::Paths => self.config.file_key_width,
        }
    }
}

fn record_malformed(hop: Hop, malformed: usize) {
    if malformed > 0 {
        debug!(hop = hop.as_str(), malformed, "discarded malformed bulk store lines");
        counter!(m::STORE_MALFORMED_LINES_TOTAL, m::LABEL_HOP => hop.as_str())
            .increment(malformed as u64);
    }
}

/// 입력 순서를 유지하며 빈 키와 중복 키를 제거합니다.
pub fn dedup_keys<'k>(keys: impl Iterator<Item = &'k str>) -> Vec<String> {
    let mut seen = HashSet::new();
    keys.map(str::trim)
        .filter(|k| !k.is_empty() && seen.insert(*k))
        .map(str::to_owned)
        .collect()
}

/// 빈 줄을 제외한 출력 라인 (`\r` 제거)
fn lines(output: &str) -> impl Iterator<Item = &str> {
    output
        .lines()
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.trim().is_empty())
}

/// 피벗 출력 파싱: `urlHash,fileHash,unused`
///
/// url 하나에 같은 파일이 여러 번 나오면 한 번만 남깁니다.
pub fn parse_pivot(output: &str) -> Parsed<PivotMap> {
    let mut parsed = Parsed::<PivotMap>::default();
    for line in lines(output) {
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != Hop::Pivot.expected_fields() {
            parsed.malformed += 1;
            continue;
        }
        let files = parsed.map.entry(fields[0].to_owned()).or_default();
        if !files.iter().any(|f| f == fields[1]) {
            files.push(fields[1].to_owned());
        }
    }
    parsed
}

/// 이슈 출력 파싱: `fileHash,ruleId,from,to,severity`
pub fn parse_issues(output: &str) -> Parsed<IssueMap> {
    let mut parsed = Parsed::<IssueMap>::default();
    for line in lines(output) {
        let fields: Vec<&str> = line.split(',').collect();
        let [file_hash, rule_id, from, to, severity] = fields.as_slice() else {
            parsed.malformed += 1;
            continue;
        };
        parsed
            .map
            .entry((*file_hash).to_owned())
            .or_default()
            .push(IssueItem {
                rule_id: (*rule_id).to_owned(),
                from: (*from).to_owned(),
                to: (*to).to_owned(),
                severity: (*severity).to_owned(),
            });
    }
    parsed
}

/// 경로 출력 파싱: `fileHash,urlHash,path`
///
/// 경로에 쉼표가 들어갈 수 있으므로 앞의 두 필드만 분리합니다.
pub fn parse_paths(output: &str) -> Parsed<PathMap> {
    let mut parsed = Parsed::<PathMap>::default();
    for line in lines(output) {
        let mut fields = line.splitn(Hop::Paths.expected_fields(), ',');
        let (Some(file_hash), Some(url_hash), Some(path)) = (fields.next(), fields.next(), fields.next())
        else {
            parsed.malformed += 1;
            continue;
        };
        parsed
            .map
            .insert(FileUrlKey::new(file_hash, url_hash), path.to_owned());
    }
    parsed
}
