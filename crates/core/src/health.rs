//! 헬스 상태 — 모듈별 상태 보고에 쓰는 공통 타입

use serde::Serialize;

/// 컴포넌트 헬스 상태
///
/// 심각도 순서: `Unhealthy` > `Degraded` > `Healthy`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum HealthStatus {
    /// 정상 동작
    Healthy,
    /// 동작은 하지만 일부 기능이 저하됨 (예: 이슈 테이블 누락)
    Degraded(String),
    /// 요청을 처리할 수 없음
    Unhealthy(String),
}

impl HealthStatus {
    /// 정상 상태인지 확인합니다.
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// 처리 불가 상태인지 확인합니다.
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, Self::Unhealthy(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicates() {
        assert!(HealthStatus::Healthy.is_healthy());
        assert!(!HealthStatus::Degraded("x".to_owned()).is_healthy());
        assert!(!HealthStatus::Degraded("x".to_owned()).is_unhealthy());
        assert!(HealthStatus::Unhealthy("down".to_owned()).is_unhealthy());
    }

    #[test]
    fn serializes_with_state_tag() {
        let json = serde_json::to_string(&HealthStatus::Degraded("no issues table".to_owned()))
            .unwrap();
        assert_eq!(json, r#"{"state":"degraded","reason":"no issues table"}"#);

        let json = serde_json::to_string(&HealthStatus::Healthy).unwrap();
        assert_eq!(json, r#"{"state":"healthy"}"#);
    }
}
