//! Issue service -- request validation, resolution and response shaping.
//!
//! Transport-independent: each operation takes a request DTO and returns a
//! response DTO or a [`ServiceError`]. The HTTP layer in [`crate::routes`]
//! maps errors to status codes.

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use purlsight_issue_resolver::{
    BulkKeyValueStore, ComponentRepository, FileIssues, IssueResolver, IssueResolverError,
    PurlIssues, PurlQuery,
};

/// Message returned when the resolver fails to extract data.
pub const EXTRACTION_FAILED: &str = "Problems encountered extracting Semgrep data";

// ─── Status ──────────────────────────────────────────────────────────

/// Outcome code carried in every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    Success,
    Failed,
}

/// `{status, message}` block attached to every response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: StatusCode,
    pub message: String,
}

impl StatusResponse {
    pub fn success() -> Self {
        Self {
            status: StatusCode::Success,
            message: "Success".to_owned(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::Failed,
            message: message.into(),
        }
    }
}

// ─── Requests ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EchoRequest {
    #[serde(default)]
    pub message: String,
}

/// Batch of purls for `GetIssues`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PurlRequest {
    #[serde(default)]
    pub purls: Vec<PurlQuery>,
}

/// Batch of components for `GetComponentsIssues`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComponentsRequest {
    #[serde(default)]
    pub components: Vec<PurlQuery>,
}

/// Single component for `GetComponentIssues`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComponentRequest {
    #[serde(default)]
    pub purl: String,
    #[serde(default)]
    pub requirement: String,
}

// ─── Responses ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EchoResponse {
    pub message: String,
}

/// Per-purl entry of `GetIssues`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurlInfo {
    pub purl: String,
    pub version: String,
    pub files: Vec<FileIssues>,
}

impl From<PurlIssues> for PurlInfo {
    fn from(p: PurlIssues) -> Self {
        Self {
            purl: p.purl,
            version: p.version,
            files: p.files,
        }
    }
}

/// Per-component entry of the component operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentIssueInfo {
    pub purl: String,
    pub version: String,
    pub requirement: String,
    pub files: Vec<FileIssues>,
}

impl From<PurlIssues> for ComponentIssueInfo {
    fn from(p: PurlIssues) -> Self {
        Self {
            purl: p.purl,
            version: p.version,
            requirement: p.requirement,
            files: p.files,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuesResponse {
    pub purls: Vec<PurlInfo>,
    pub status: StatusResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentsIssueResponse {
    pub components: Vec<ComponentIssueInfo>,
    pub status: StatusResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentIssueResponse {
    pub component: ComponentIssueInfo,
    pub status: StatusResponse,
}

/// Body sent for any failed operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureResponse {
    pub status: StatusResponse,
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Request-level failure, already reduced to a client-facing message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// Rejected before any lookup.
    #[error("{0}")]
    BadRequest(String),
    /// Component database failed.
    #[error("{0}")]
    Unavailable(String),
    /// Unexpected fault.
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    /// Status block for the failure body.
    pub fn status(&self) -> StatusResponse {
        StatusResponse::failed(self.to_string())
    }
}

impl From<IssueResolverError> for ServiceError {
    fn from(err: IssueResolverError) -> Self {
        match err {
            IssueResolverError::Validation(msg) => {
                warn!(error = %msg, "request rejected");
                Self::BadRequest(msg)
            }
            IssueResolverError::Database(_) => {
                error!(error = %err, "component lookup failed");
                Self::Unavailable(EXTRACTION_FAILED.to_owned())
            }
            other => {
                error!(error = %other, "issue resolution failed");
                Self::Internal(EXTRACTION_FAILED.to_owned())
            }
        }
    }
}

// ─── Service ─────────────────────────────────────────────────────────

/// The four service operations over a shared [`IssueResolver`].
pub struct IssueService<R, S> {
    resolver: IssueResolver<R, S>,
}

impl<R: ComponentRepository, S: BulkKeyValueStore> IssueService<R, S> {
    pub fn new(resolver: IssueResolver<R, S>) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &IssueResolver<R, S> {
        &self.resolver
    }

    /// Returns the received message unchanged.
    pub fn echo(&self, request: EchoRequest) -> EchoResponse {
        info!(message = request.message.as_str(), "echo");
        EchoResponse {
            message: request.message,
        }
    }

    pub async fn get_issues(&self, request: PurlRequest) -> Result<IssuesResponse, ServiceError> {
        if request.purls.is_empty() {
            return Err(ServiceError::BadRequest(
                "No purls in request data supplied".to_owned(),
            ));
        }
        let report = self.resolver.resolve(&request.purls).await?;
        Ok(IssuesResponse {
            purls: report.into_iter().map(PurlInfo::from).collect(),
            status: StatusResponse::success(),
        })
    }

    pub async fn get_components_issues(
        &self,
        request: ComponentsRequest,
    ) -> Result<ComponentsIssueResponse, ServiceError> {
        if request.components.is_empty() {
            return Err(ServiceError::BadRequest(
                "Request validation failed: 'components' array is required and must contain at least one component"
                    .to_owned(),
            ));
        }
        let report = self.resolver.resolve(&request.components).await?;
        Ok(ComponentsIssueResponse {
            components: report.into_iter().map(ComponentIssueInfo::from).collect(),
            status: StatusResponse::success(),
        })
    }

    pub async fn get_component_issues(
        &self,
        request: ComponentRequest,
    ) -> Result<ComponentIssueResponse, ServiceError> {
        if request.purl.trim().is_empty() {
            return Err(ServiceError::BadRequest(
                "Request validation failed: 'purl' is required".to_owned(),
            ));
        }
        let query = PurlQuery::new(request.purl, request.requirement);
        let component = self
            .resolver
            .resolve(std::slice::from_ref(&query))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::Internal(EXTRACTION_FAILED.to_owned()))?;
        Ok(ComponentIssueResponse {
            component: component.into(),
            status: StatusResponse::success(),
        })
    }
}
