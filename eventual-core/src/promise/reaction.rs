//! Reactions
//!
//! A reaction is an observer attached to a cell, invoked exactly once
//! when that cell settles. Three kinds exist:
//!
//! - `Map`: transform the fulfillment value and settle a downstream cell
//!   with the result.
//! - `Chain`: transform the fulfillment value into another cell and have
//!   the downstream cell adopt its eventual outcome, flattening one
//!   level of nesting.
//! - `Watch`: hand the outcome to a caller-supplied callback. This is
//!   the reaction behind [`Cell::subscribe`].
//!
//! All three share one rejection path: the upstream reason flows to the
//! downstream cell unchanged, and the transform is never invoked. The
//! `rejected` handler reports whether the rejection was consumed rather
//! than merely forwarded; the settling cell uses the report to flag
//! rejections that drained without reaching a terminal observer.

use super::cell::Cell;
use super::outcome::Outcome;

/// An observer of a single cell's settlement.
///
/// Implementations consume themselves on delivery; a reaction observes
/// an outcome exactly once. The trait is crate-private, so the set of
/// reactions is closed.
pub(crate) trait Reaction<T, E>: Send
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Deliver a fulfillment value.
    fn fulfilled(self: Box<Self>, value: T);

    /// Deliver a rejection reason.
    ///
    /// Returns whether the rejection was consumed, as opposed to merely
    /// forwarded downstream.
    fn rejected(self: Box<Self>, reason: E) -> bool;
}

/// Shared rejection path for the transforming reactions: pass the
/// reason downstream untouched and report it as merely forwarded.
fn forward_rejection<U, E>(out: &Cell<U, E>, reason: E) -> bool
where
    U: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    out.reject(reason);
    false
}

/// Transform-and-fulfill.
struct Map<F, U, E>
where
    U: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    transform: F,
    out: Cell<U, E>,
}

impl<T, U, E, F> Reaction<T, E> for Map<F, U, E>
where
    T: Clone + Send + Sync + 'static,
    U: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    F: FnOnce(T) -> Result<U, E> + Send + 'static,
{
    fn fulfilled(self: Box<Self>, value: T) {
        let Map { transform, out } = *self;
        match transform(value) {
            Ok(mapped) => out.fulfill(mapped),
            Err(reason) => out.reject(reason),
        }
    }

    fn rejected(self: Box<Self>, reason: E) -> bool {
        forward_rejection(&self.out, reason)
    }
}

/// Transform-and-flatten.
struct Chain<F, U, E>
where
    U: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    transform: F,
    out: Cell<U, E>,
}

impl<T, U, E, F> Reaction<T, E> for Chain<F, U, E>
where
    T: Clone + Send + Sync + 'static,
    U: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    F: FnOnce(T) -> Result<Cell<U, E>, E> + Send + 'static,
{
    fn fulfilled(self: Box<Self>, value: T) {
        let Chain { transform, out } = *self;
        match transform(value) {
            Ok(next) => out.adopt(&next),
            Err(reason) => out.reject(reason),
        }
    }

    fn rejected(self: Box<Self>, reason: E) -> bool {
        forward_rejection(&self.out, reason)
    }
}

/// Terminal observer delivering the outcome to a plain callback.
struct Watch<F> {
    deliver: F,
}

impl<T, E, F> Reaction<T, E> for Watch<F>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    F: FnOnce(Outcome<T, E>) + Send + 'static,
{
    fn fulfilled(self: Box<Self>, value: T) {
        (self.deliver)(Outcome::Fulfilled(value));
    }

    fn rejected(self: Box<Self>, reason: E) -> bool {
        (self.deliver)(Outcome::Rejected(reason));
        true
    }
}

/// Box a callback as a terminal observer.
pub(crate) fn watch<T, E, F>(deliver: F) -> Box<dyn Reaction<T, E>>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    F: FnOnce(Outcome<T, E>) + Send + 'static,
{
    Box::new(Watch { deliver })
}

/// Transform a cell's eventual value.
///
/// Returns a new cell that settles when `input` does: with
/// `transform(value)` on fulfillment (an `Err` from the transform
/// rejects the new cell instead), or with `input`'s reason on rejection,
/// in which case the transform is never invoked. The transform runs at
/// most once.
///
/// # Example
///
/// ```rust,ignore
/// let doubled = map(|v| Ok(v * 2), &resolve(21));
/// assert_eq!(doubled.outcome(), Some(Outcome::Fulfilled(42)));
/// ```
pub fn map<T, U, E, F>(transform: F, input: &Cell<T, E>) -> Cell<U, E>
where
    T: Clone + Send + Sync + 'static,
    U: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    F: FnOnce(T) -> Result<U, E> + Send + 'static,
{
    let out = Cell::new();
    input.register(Box::new(Map {
        transform,
        out: out.clone(),
    }));
    out
}

/// Transform a cell's eventual value into another cell and flatten.
///
/// Like [`map`], except the transform produces a cell and the returned
/// cell adopts that cell's eventual outcome rather than fulfilling with
/// the cell itself. Rejections propagate exactly as with [`map`].
///
/// # Example
///
/// ```rust,ignore
/// let chained = chain(|v| Ok(resolve(v + 1)), &resolve(1));
/// assert_eq!(chained.outcome(), Some(Outcome::Fulfilled(2)));
/// ```
pub fn chain<T, U, E, F>(transform: F, input: &Cell<T, E>) -> Cell<U, E>
where
    T: Clone + Send + Sync + 'static,
    U: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    F: FnOnce(T) -> Result<Cell<U, E>, E> + Send + 'static,
{
    let out = Cell::new();
    input.register(Box::new(Chain {
        transform,
        out: out.clone(),
    }));
    out
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::super::cell::{reject, resolve};
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn boom() -> Error {
        Error::Resolver("boom".into())
    }

    #[test]
    fn map_transforms_a_fulfilled_input() {
        let input: Cell<i32, Error> = resolve(21);
        let doubled = map(|v| Ok(v * 2), &input);
        assert_eq!(doubled.outcome(), Some(Outcome::Fulfilled(42)));
    }

    #[test]
    fn map_waits_for_an_unsettled_input() {
        let input: Cell<i32, Error> = Cell::new();
        let doubled = map(|v| Ok(v * 2), &input);
        assert!(!doubled.is_settled());

        input.fulfill(21);
        assert_eq!(doubled.outcome(), Some(Outcome::Fulfilled(42)));
    }

    #[test]
    fn map_can_change_the_value_type() {
        let input: Cell<i32, Error> = resolve(7);
        let text = map(|v| Ok(format!("n={v}")), &input);
        assert_eq!(text.outcome(), Some(Outcome::Fulfilled("n=7".to_string())));
    }

    #[test]
    fn map_transform_failure_rejects_only_downstream() {
        let input: Cell<i32, Error> = Cell::new();
        let mapped: Cell<i32, Error> = map(|_| Err(boom()), &input);
        let sibling = map(|v| Ok(v + 1), &input);

        input.fulfill(1);
        assert_eq!(mapped.outcome(), Some(Outcome::Rejected(boom())));
        // The input and its other observers are untouched.
        assert_eq!(input.outcome(), Some(Outcome::Fulfilled(1)));
        assert_eq!(sibling.outcome(), Some(Outcome::Fulfilled(2)));
    }

    #[test]
    fn map_propagates_rejection_without_invoking_transform() {
        let ran = Arc::new(AtomicBool::new(false));
        let input: Cell<i32, Error> = reject(boom());

        let flag = ran.clone();
        let mapped = map(
            move |v| {
                flag.store(true, Ordering::SeqCst);
                Ok(v)
            },
            &input,
        );

        assert_eq!(mapped.outcome(), Some(Outcome::Rejected(boom())));
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[test]
    fn chain_flattens_one_level() {
        let input: Cell<i32, Error> = resolve(1);
        let chained = chain(|v| Ok(resolve(v + 1)), &input);
        assert_eq!(chained.outcome(), Some(Outcome::Fulfilled(2)));
    }

    #[test]
    fn chain_adopts_a_cell_that_settles_later() {
        let inner: Cell<i32, Error> = Cell::new();
        let input: Cell<i32, Error> = resolve(0);

        let handle = inner.clone();
        let chained = chain(move |_| Ok(handle), &input);
        assert!(!chained.is_settled());

        inner.fulfill(8);
        assert_eq!(chained.outcome(), Some(Outcome::Fulfilled(8)));
    }

    #[test]
    fn chain_transform_failure_rejects_downstream() {
        let input: Cell<i32, Error> = resolve(1);
        let chained: Cell<i32, Error> = chain(|_| Err(boom()), &input);
        assert_eq!(chained.outcome(), Some(Outcome::Rejected(boom())));
    }

    #[test]
    fn chain_propagates_rejection_without_invoking_transform() {
        let ran = Arc::new(AtomicBool::new(false));
        let input: Cell<i32, Error> = reject(boom());

        let flag = ran.clone();
        let chained = chain(
            move |v| {
                flag.store(true, Ordering::SeqCst);
                Ok(resolve(v))
            },
            &input,
        );

        assert_eq!(chained.outcome(), Some(Outcome::Rejected(boom())));
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[test]
    fn chain_to_a_rejected_cell_rejects_downstream() {
        let input: Cell<i32, Error> = resolve(1);
        let chained: Cell<i32, Error> = chain(|_| Ok(reject(boom())), &input);
        assert_eq!(chained.outcome(), Some(Outcome::Rejected(boom())));
    }
}
