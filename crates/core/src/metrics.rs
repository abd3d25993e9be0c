//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::histogram!()`
//! 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `purlsight_`
//! - 모듈명: `resolver_`, `store_`, `daemon_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//! use purlsight_core::metrics;
//!
//! counter!(metrics::STORE_MALFORMED_LINES_TOTAL, metrics::LABEL_HOP => "pivot").increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 조회 단계 레이블 키 (pivot, issues, paths)
pub const LABEL_HOP: &str = "hop";

/// 결과 레이블 키 (success, failure, skipped)
pub const LABEL_RESULT: &str = "result";

/// 서비스 연산 레이블 키 (issues, components_issues, component_issues)
pub const LABEL_OPERATION: &str = "operation";

// ─── Resolver 메트릭 ────────────────────────────────────────────────

/// Resolver: 처리된 요청 수 (counter, labels: operation, result)
pub const RESOLVER_REQUESTS_TOTAL: &str = "purlsight_resolver_requests_total";

/// Resolver: 파싱 실패로 조회에서 제외된 purl 수 (counter)
pub const RESOLVER_PURLS_SKIPPED_TOTAL: &str = "purlsight_resolver_purls_skipped_total";

/// Resolver: 요청 한 건 처리 시간 (histogram, 초)
pub const RESOLVER_REQUEST_DURATION_SECONDS: &str =
    "purlsight_resolver_request_duration_seconds";

// ─── Bulk Store 메트릭 ──────────────────────────────────────────────

/// Store: 조회 단계별 프로세스 호출 수 (counter, labels: hop, result)
pub const STORE_HOP_INVOCATIONS_TOTAL: &str = "purlsight_store_hop_invocations_total";

/// Store: 조회 단계별 소요 시간 (histogram, 초, label: hop)
pub const STORE_HOP_DURATION_SECONDS: &str = "purlsight_store_hop_duration_seconds";

/// Store: 필드 수가 맞지 않아 버려진 출력 라인 수 (counter, label: hop)
pub const STORE_MALFORMED_LINES_TOTAL: &str = "purlsight_store_malformed_lines_total";

// ─── Daemon 메트릭 ──────────────────────────────────────────────────

/// Daemon: 빌드 정보 (gauge, 항상 1, label: version)
pub const DAEMON_BUILD_INFO: &str = "purlsight_daemon_build_info";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// 요청/조회 소요 시간 히스토그램 버킷 (초)
///
/// 1ms ~ 60s 범위 (외부 프로세스 호출 포함)
pub const REQUEST_DURATION_BUCKETS: [f64; 10] =
    [0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 60.0];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
/// 일반적으로 `purlsight-daemon`의 시작 시점에서 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    // Resolver
    describe_counter!(
        RESOLVER_REQUESTS_TOTAL,
        "Total number of issue resolution requests handled"
    );
    describe_counter!(
        RESOLVER_PURLS_SKIPPED_TOTAL,
        "Total number of purls excluded from lookup because they failed to parse"
    );
    describe_histogram!(
        RESOLVER_REQUEST_DURATION_SECONDS,
        "Time to resolve one request end to end in seconds"
    );

    // Bulk store
    describe_counter!(
        STORE_HOP_INVOCATIONS_TOTAL,
        "Bulk store invocations per hop and result"
    );
    describe_histogram!(
        STORE_HOP_DURATION_SECONDS,
        "Bulk store invocation latency per hop in seconds"
    );
    describe_counter!(
        STORE_MALFORMED_LINES_TOTAL,
        "Bulk store output lines discarded for a wrong field count"
    );

    // Daemon
    describe_gauge!(
        DAEMON_BUILD_INFO,
        "Build information (always 1, with version label)"
    );
}
