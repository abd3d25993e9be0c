#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`IssueResolverError`)
//! - [`config`]: Resolver and store configuration (`ResolverConfig`, `StoreConfig`, builder)
//! - [`types`]: Domain types (`PurlQuery`, `ResolvedPurl`, `ComponentRecord`, `PurlIssues`)
//! - [`purl`]: purl parsing and requirement resolution
//! - [`version`]: Requirement constraints and version selection (`VersionSelector`)
//! - [`component`]: Component lookup (`ComponentRepository` trait, PostgreSQL implementation)
//! - [`store`]: Bulk key-value store hops (`BulkKeyValueStore` trait, `LdbStore`, `BulkStoreClient`)
//! - [`resolver`]: Request orchestrator (`IssueResolver`, `IssueResolverBuilder`)
//!
//! # Architecture
//!
//! ```text
//! [PurlQuery] --> resolve_purl --> ComponentLookup --> VersionSelector
//!                                                            |
//!                                                      url hashes
//!                                                            |
//!                                  BulkStoreClient: pivot --> issues --> paths
//!                                                                          |
//!                                                                  [PurlIssues]
//! ```

pub mod component;
pub mod config;
pub mod error;
pub mod purl;
pub mod resolver;
pub mod store;
pub mod types;
pub mod version;

// --- Public API Re-exports ---

// Resolver (main orchestrator)
pub use resolver::{IssueResolver, IssueResolverBuilder};

// Configuration
pub use config::{ResolverConfig, StoreConfig, StoreConfigBuilder};

// Error
pub use error::IssueResolverError;

// Types
pub use types::{
    CanonicalPurl, ComponentRecord, FileIssues, FileUrlKey, IssueItem, MatchMode, PurlIssues,
    PurlQuery, ResolvedPurl, SelectionMode, SelectionResult,
};

// purl / version
pub use purl::{parse_purl, resolve_purl};
pub use version::{RequirementConstraint, VersionSelector};

// Component lookup
pub use component::postgres::PgComponentRepository;
pub use component::{ComponentIndex, ComponentLookup, ComponentRepository};

// Bulk store
pub use store::{BulkKeyValueStore, BulkStoreClient, Hop, HopQuery, LdbStore, TableAvailability};
