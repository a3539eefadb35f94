//! Axum middleware that migrates request and response bodies across declared
//! API versions, so a single head implementation can serve every historical
//! contract a client has pinned to.
//!
//! A [`VersionMigrationBuilder`] assembles a set of declared versions, a
//! chain of [`VersionChange`] edges between adjacent versions, and a
//! [`VersionManager`] that resolves a client's version token from a request,
//! into a single [`VersionMigrationLayer`]. Wrap a router in that layer and
//! every request body is migrated forward to the head version before the
//! inner service runs; every response body is migrated backward to the
//! client's resolved version before it is written out.
//!
//! ```ignore
//! use api_version_migration::{
//!     document::Node, version::Format, FieldOperation, OperationTarget, VersionChange,
//!     VersionMigrationBuilder,
//! };
//!
//! let layer = VersionMigrationBuilder::new(Format::Date)
//!     .versions(["2025-01-01", "2025-06-01"])?
//!     .change(
//!         VersionChange::builder(
//!             api_version_migration::version::Version::parse("2025-01-01", Format::Date)?,
//!             api_version_migration::version::Version::parse("2025-06-01", Format::Date)?,
//!             "add default country",
//!         )
//!         .request_ops(
//!             OperationTarget::Path("/users".into()),
//!             vec![FieldOperation::add_field("country", Node::String("US".into()))],
//!         )
//!         .build()?,
//!     )
//!     .build()?;
//!
//! let app = axum::Router::new().layer(layer);
//! # Ok::<(), api_version_migration::Error>(())
//! ```

pub mod bundle;
pub mod builder;
pub mod chain;
pub mod change;
pub mod document;
pub mod endpoint;
pub mod error;
pub mod manager;
pub mod operations;
pub mod pipeline;
pub mod request;
pub mod version;

pub use bundle::VersionBundle;
pub use builder::VersionMigrationBuilder;
pub use chain::MigrationChain;
pub use change::{OperationTarget, VersionChange, VersionChangeBuilder};
pub use document::{Document, Node, NodeType};
pub use endpoint::{route_key, EndpointMeta, FieldPath, RouteKey};
pub use error::Error;
pub use manager::{Resolved, VersionManager};
pub use operations::FieldOperation;
pub use pipeline::{VersionContext, VersionMigration, VersionMigrationLayer};
pub use request::{RequestInfo, ResponseInfo};
pub use version::{Format, Version};
