//! Substrate primitives for chainlens.
//!
//! This crate implements the [`MetadataDecoder`] and [`AddressCodec`]
//! ports from `chainlens-core` on top of subxt.
//!
//! # Features
//!
//! - SCALE runtime metadata decoding into a pallet/call/event registry
//! - SS58 address validation with checksum verification
//!
//! # Usage
//!
//! ```ignore
//! use chainlens_core::ports::MetadataDecoder;
//! use chainlens_substrate::{ScaleMetadataDecoder, decode_address};
//!
//! let registry = ScaleMetadataDecoder.decode(&hex)?;
//! let key = decode_address("5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY")?;
//! ```
//!
//! [`MetadataDecoder`]: chainlens_core::ports::MetadataDecoder
//! [`AddressCodec`]: chainlens_core::ports::AddressCodec

mod address;
mod metadata;

pub use address::{Ss58Codec, decode_address, is_address, to_ss58};
pub use metadata::ScaleMetadataDecoder;
