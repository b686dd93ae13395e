//! Integration test utilities for the ingestion pipeline
//!
//! This crate provides helpers for driving a full listener over scripted
//! wire traffic, without a network.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
