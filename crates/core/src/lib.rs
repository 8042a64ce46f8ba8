//! Core domain layer for the chainlens data access layer.
//!
//! This crate contains the canonical models, port traits (interfaces) and
//! services that turn heterogeneous chain-data backends into one shape for
//! explorer views. It follows hexagonal architecture principles - this is
//! the innermost layer with no dependencies on infrastructure.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    chainlens (binary)                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │ chainlens-graphql │ chainlens-adapters │ chainlens-substrate│
//! │  (HTTP executor)  │ (5 backends)       │ (SCALE, SS58)      │
//! ├───────────────────┴────────────────────┴────────────────────┤
//! │                    chainlens-core  ← YOU ARE HERE           │
//! │               (models, ports, services)                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`models`] - Canonical entities (Block, Extrinsic, Event, Transfer...)
//! - [`ports`] - Interface traits for adapters to implement
//! - [`services`] - Explorer service, runtime spec cache, name resolver
//! - [`error`] - Error types
//! - [`metrics`] - Prometheus metrics definitions
//!
//! # Key Concepts
//!
//! ## Ports
//!
//! - [`ports::QueryExecutor`] - Send a GraphQL document to a backend
//! - [`ports::DataSource`] - One entity source per entity type
//! - [`ports::RuntimeSpecSource`] - Fetch raw runtime metadata
//! - [`ports::MetadataDecoder`] - Decode metadata into a schema registry
//! - [`ports::AddressCodec`] - Validate and decode account addresses
//!
//! ## Request Flow
//!
//! 1. A binding calls a typed fetch function on [`services::ExplorerService`]
//! 2. The configured entity source queries its backend and normalizes items
//! 3. [`ports::extract_page`] wraps them into an [`ports::ItemsResponse`]
//! 4. [`services::RuntimeSpecCache`] attaches decoded metadata by spec version

pub mod error;
pub mod metrics;
pub mod models;
pub mod ports;
pub mod services;
