//! Settlement outcomes.
//!
//! An `Outcome` is what a settled cell delivers to its observers: either
//! the fulfillment value or the rejection reason. It is the borrow-free,
//! clonable snapshot handed to each reaction exactly once.

/// The result of a cell's settlement.
///
/// # Type Parameters
///
/// - `T`: The fulfillment value type.
/// - `E`: The rejection reason type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T, E> {
    /// The cell settled successfully with a value.
    Fulfilled(T),

    /// The cell settled with a failure reason.
    Rejected(E),
}

impl<T, E> Outcome<T, E> {
    /// Whether this outcome carries a fulfillment value.
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Outcome::Fulfilled(_))
    }

    /// Whether this outcome carries a rejection reason.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Outcome::Rejected(_))
    }

    /// Convert into the equivalent `Result`.
    pub fn into_result(self) -> Result<T, E> {
        match self {
            Outcome::Fulfilled(value) => Ok(value),
            Outcome::Rejected(reason) => Err(reason),
        }
    }
}

impl<T, E> From<Result<T, E>> for Outcome<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Outcome::Fulfilled(value),
            Err(reason) => Outcome::Rejected(reason),
        }
    }
}

impl<T, E> From<Outcome<T, E>> for Result<T, E> {
    fn from(outcome: Outcome<T, E>) -> Self {
        outcome.into_result()
    }
}
