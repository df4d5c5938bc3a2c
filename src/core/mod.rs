//! # Core Module
//!
//! Shared-state primitives used by the engine. The streaming pipeline keeps
//! almost all of its data single-owner; the one value written from outside
//! the engine thread (the observer's position) lives in an [`MtResource`].

pub mod mt_resource;

pub use mt_resource::MtResource;
