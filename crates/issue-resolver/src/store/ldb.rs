//! LDB 하위 프로세스 저장소
//!
//! 조회 스크립트를 scratch 디렉토리의 고유한 임시 파일에 쓰고
//! `<bin> -f <file>`로 실행합니다. 임시 파일은 성공/실패/취소와 관계없이
//! `NamedTempFile` drop 시 삭제됩니다.
//!
//! 요청 future가 drop되면 `kill_on_drop`으로 실행 중인 프로세스도 종료됩니다.

use std::io::Write;
use std::process::Stdio;
use std::time::Duration;

use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{BulkKeyValueStore, HopQuery, StoreBinary};
use crate::config::StoreConfig;
use crate::error::IssueResolverError;

/// stderr를 에러 메시지에 포함할 때의 최대 길이
const MAX_STDERR_IN_ERROR: usize = 256;

/// 시작 시 확인한 테이블 존재 여부
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableAvailability {
    /// 지식베이스 아래에서 발견한 테이블 (`kb/table` 형식)
    pub tables: Vec<String>,
    /// 피벗 테이블 존재
    pub pivot: bool,
    /// 이슈 테이블 존재
    pub issues: bool,
    /// 경로 테이블 존재
    pub file: bool,
}

/// `ldb` 실행 파일 기반 저장소
#[derive(Debug, Clone)]
pub struct LdbStore {
    config: StoreConfig,
}

impl LdbStore {
    /// 설정으로 생성합니다.
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    /// 현재 설정
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// `root_dir/kb_name` 아래 테이블 디렉토리를 나열해 필요한 테이블이 있는지 확인합니다.
    ///
    /// # Errors
    ///
    /// 지식베이스 디렉토리를 읽을 수 없으면 `IssueResolverError::Io`
    pub async fn verify_tables(&self) -> Result<TableAvailability, IssueResolverError> {
        let kb_dir = self.config.root_dir.join(&self.config.kb_name);
        let io_err = |source: std::io::Error| IssueResolverError::Io {
            path: kb_dir.display().to_string(),
            source,
        };

        let mut entries = tokio::fs::read_dir(&kb_dir).await.map_err(io_err)?;
        let mut tables = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            if is_dir {
                tables.push(format!(
                    "{}/{}",
                    self.config.kb_name,
                    entry.file_name().to_string_lossy()
                ));
            }
        }
        tables.sort();

        let has = |name: &str| tables.iter().any(|t| t == name);
        Ok(TableAvailability {
            pivot: has(&self.config.pivot_table),
            issues: has(&self.config.issues_table),
            file: has(&self.config.file_table),
            tables,
        })
    }

    fn binary_path(&self, binary: StoreBinary) -> &str {
        match binary {
            StoreBinary::Plain => &self.config.bin_path,
            StoreBinary::Encoded => &self.config.enc_bin_path,
        }
    }

    /// 스크립트를 scratch 디렉토리의 임시 파일에 씁니다.
    async fn write_script(&self, query: &HopQuery) -> Result<NamedTempFile, IssueResolverError> {
        let dir = self.config.scratch_dir.clone();
        let prefix = format!("purlsight-{}-", query.hop);
        let script = query.script();

        tokio::task::spawn_blocking(move || -> std::io::Result<NamedTempFile> {
            let mut file = tempfile::Builder::new()
                .prefix(&prefix)
                .suffix(".txt")
                .tempfile_in(&dir)?;
            file.write_all(script.as_bytes())?;
            file.flush()?;
            Ok(file)
        })
        .await
        .map_err(|e| IssueResolverError::Internal(format!("script writer task failed: {e}")))?
        .map_err(|e| unavailable(query, format!("failed to write script: {e}")))
    }
}

fn unavailable(query: &HopQuery, reason: String) -> IssueResolverError {
    IssueResolverError::StoreUnavailable {
        hop: query.hop.as_str().to_owned(),
        reason,
    }
}

impl BulkKeyValueStore for LdbStore {
    async fn select(&self, query: &HopQuery) -> Result<String, IssueResolverError> {
        let script = self.write_script(query).await?;
        let bin = self.binary_path(query.binary);
        let timeout = Duration::from_secs(self.config.timeout_secs);

        debug!(
            hop = query.hop.as_str(),
            keys = query.keys.len(),
            bin,
            script = %script.path().display(),
            "invoking bulk store"
        );

        let output = Command::new(bin)
            .arg("-f")
            .arg(script.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let result = match tokio::time::timeout(timeout, output).await {
            Err(_) => Err(unavailable(
                query,
                format!("timed out after {}s", timeout.as_secs()),
            )),
            Ok(Err(e)) => Err(unavailable(query, format!("failed to spawn '{bin}': {e}"))),
            Ok(Ok(output)) if !output.status.success() => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let stderr: String = stderr.trim().chars().take(MAX_STDERR_IN_ERROR).collect();
                Err(unavailable(
                    query,
                    format!("'{bin}' exited with {}: {stderr}", output.status),
                ))
            }
            Ok(Ok(output)) => String::from_utf8(output.stdout)
                .map_err(|e| unavailable(query, format!("non-UTF-8 output: {e}"))),
        };

        if let Err(e) = script.close() {
            warn!(hop = query.hop.as_str(), error = %e, "failed to remove scratch script");
        }
        result
    }
}
