//! GraphQL query executor for chainlens.
//!
//! Implements the [`QueryExecutor`] port from `chainlens-core` over HTTP:
//! each backend is a named endpoint accepting `POST {query, variables}`
//! and answering `{data, errors?}`.
//!
//! ```ignore
//! use chainlens_core::ports::BackendId;
//! use chainlens_graphql::{ClientConfig, HttpExecutor};
//!
//! let config = ClientConfig::default()
//!     .with_endpoint(BackendId::Archive, "https://archive.example/graphql".parse()?);
//! let executor = HttpExecutor::new(config)?;
//! ```
//!
//! [`QueryExecutor`]: chainlens_core::ports::QueryExecutor

mod client;
mod types;

pub use client::{ClientConfig, HttpExecutor};
pub use types::{GraphQLError, GraphQLRequest, GraphQLResponse};
