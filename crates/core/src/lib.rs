#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod health;
pub mod metrics;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, ParseError, PurlsightError, StorageError};

// 설정
pub use config::PurlsightConfig;

// 헬스
pub use health::HealthStatus;
