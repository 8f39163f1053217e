//! Settlement Primitives
//!
//! This module implements the core of the promise system: cells,
//! reactions, and the resolver adapter.
//!
//! # Concepts
//!
//! ## Cells
//!
//! A [`Cell`] is a single-assignment container for an eventual value.
//! It settles at most once, into either a fulfillment value or a
//! rejection reason, and delivers that outcome to every registered
//! observer exactly once, in registration order. A cell may also adopt
//! another cell's eventual outcome; adoption chains of any length
//! collapse iteratively, without recursing per link.
//!
//! ## Reactions
//!
//! [`map`] and [`chain`] attach a transforming observer to an existing
//! cell and return a new downstream cell that the observer settles.
//! `map` fulfills the downstream cell with the transformed value;
//! `chain` flattens by having the downstream cell adopt the cell the
//! transform produced. [`Cell::subscribe`] attaches a terminal observer.
//!
//! ## Resolvers
//!
//! [`run_promise`] turns an external producer into a cell: it invokes a
//! resolver function with caller-supplied leading arguments plus bound
//! `resolve`/`reject` callbacks, and wires resolver errors into
//! rejection. Settlement is idempotent, so the callbacks are safe to
//! call from anywhere, any number of times; only the first call lands.
//!
//! # Implementation Notes
//!
//! Settlement and observer delivery happen synchronously within the
//! call that triggers them. There is no scheduler, no cancellation, and
//! no backpressure here; suspension lives entirely inside resolver
//! functions, which may hold the settlement callbacks for as long as
//! they like.

mod cell;
mod outcome;
mod reaction;
mod resolver;

pub use cell::{reject, resolve, Cell};
pub use outcome::Outcome;
pub use reaction::{chain, map};
pub use resolver::{run_promise, RejectFn, ResolveFn};
