//! Eventual Core
//!
//! This crate provides the settlement core for the Eventual promise
//! library. It implements:
//!
//! - Single-assignment cells with at-most-once settlement
//! - Transforming and flattening operators (`map`, `chain`)
//! - A resolver adapter connecting external producers to fresh cells
//!
//! The crate is a pure in-process primitive: one eventual value per
//! cell, no scheduler, no cancellation, no backpressure.
//!
//! # Architecture
//!
//! The crate is organized into two modules:
//!
//! - `promise`: cells, outcomes, reactions, and the resolver adapter
//! - `error`: the conventional rejection reason type
//!
//! # Example
//!
//! ```rust,ignore
//! use eventual_core::promise::{chain, map, run_promise};
//!
//! // Adapt an external producer into a cell
//! let fetched = run_promise(|(url,), resolve, _reject| {
//!     spawn_fetch(url, resolve);
//!     Ok(())
//! }, ("https://example.com",));
//!
//! // Transform and flatten the eventual value
//! let parsed = map(parse_body, &fetched);
//! let stored = chain(store_record, &parsed);
//!
//! // Observe the final outcome exactly once
//! stored.subscribe(|outcome| println!("done: {}", outcome.is_fulfilled()));
//! ```

pub mod error;
pub mod promise;
