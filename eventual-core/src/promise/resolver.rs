//! Resolver Adapter
//!
//! [`run_promise`] is the bridge between external producers and the
//! settlement core. It builds a fresh cell, hands a caller-supplied
//! resolver function a pair of settlement callbacks closed over that
//! cell, and returns the cell immediately. The resolver runs
//! synchronously, but it may move the callbacks anywhere (another
//! thread, an I/O completion handler) and settle arbitrarily later.
//!
//! # Settlement Discipline
//!
//! The callbacks are plain `Fn` values, callable any number of times in
//! any combination; only the first settlement of either kind has any
//! effect. A resolver that returns `Err` after it already settled the
//! cell is likewise ignored. First settlement wins, uniformly.
//!
//! # Leading Arguments
//!
//! The resolver receives the caller's `args` value ahead of the two
//! callbacks, unmodified. Callers with several leading arguments pass a
//! tuple and destructure it in the resolver's parameter list:
//!
//! ```rust,ignore
//! let cell = run_promise(
//!     |(url, retries), resolve, reject| {
//!         spawn_fetch(url, retries, resolve, reject);
//!         Ok(())
//!     },
//!     ("https://example.com", 3),
//! );
//! ```

use super::cell::Cell;

/// Callback that fulfills the cell it is closed over.
pub type ResolveFn<T> = Box<dyn Fn(T) + Send + Sync>;

/// Callback that rejects the cell it is closed over.
pub type RejectFn<E> = Box<dyn Fn(E) + Send + Sync>;

/// Run a resolver function against a fresh cell.
///
/// The resolver is invoked synchronously with `args` followed by the
/// `resolve` and `reject` callbacks. Returning `Err` from the resolver
/// rejects the cell with that reason, unless the cell was already
/// settled inside the resolver, in which case the error is swallowed.
///
/// The returned cell settles whenever one of the callbacks fires, which
/// may be long after this function returns.
///
/// # Example
///
/// ```rust,ignore
/// let cell: Cell<i32, Error> = run_promise(
///     |(), resolve, _reject| {
///         resolve(42);
///         Ok(())
///     },
///     (),
/// );
/// assert_eq!(cell.outcome(), Some(Outcome::Fulfilled(42)));
/// ```
pub fn run_promise<T, E, A, F>(resolver: F, args: A) -> Cell<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    F: FnOnce(A, ResolveFn<T>, RejectFn<E>) -> Result<(), E>,
{
    let cell = Cell::new();

    let resolve: ResolveFn<T> = {
        let cell = cell.clone();
        Box::new(move |value| cell.fulfill(value))
    };
    let reject: RejectFn<E> = {
        let cell = cell.clone();
        Box::new(move |reason| cell.reject(reason))
    };

    if let Err(reason) = resolver(args, resolve, reject) {
        // A resolver error is an ordinary rejection, subject to
        // first-settlement-wins like any other.
        cell.reject(reason);
    }
    cell
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::super::outcome::Outcome;
    use super::*;
    use crate::error::Error;
    use parking_lot::Mutex;
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn boom() -> Error {
        Error::Resolver("boom".into())
    }

    #[test]
    fn resolver_resolves() {
        let cell: Cell<i32, Error> = run_promise(
            |(), resolve, _reject| {
                resolve(42);
                Ok(())
            },
            (),
        );
        assert_eq!(cell.outcome(), Some(Outcome::Fulfilled(42)));
    }

    #[test]
    fn resolver_rejects() {
        let cell: Cell<i32, Error> = run_promise(
            |(), _resolve, reject| {
                reject(boom());
                Ok(())
            },
            (),
        );
        assert_eq!(cell.outcome(), Some(Outcome::Rejected(boom())));
    }

    #[test]
    fn resolver_error_rejects() {
        let cell: Cell<i32, Error> = run_promise(|(), _resolve, _reject| Err(boom()), ());
        assert_eq!(cell.outcome(), Some(Outcome::Rejected(boom())));
    }

    #[test]
    fn first_settlement_wins_inside_the_resolver() {
        // resolve, then reject
        let cell: Cell<i32, Error> = run_promise(
            |(), resolve, reject| {
                resolve(1);
                reject(boom());
                Ok(())
            },
            (),
        );
        assert_eq!(cell.outcome(), Some(Outcome::Fulfilled(1)));

        // reject, then resolve
        let cell: Cell<i32, Error> = run_promise(
            |(), resolve, reject| {
                reject(boom());
                resolve(1);
                Ok(())
            },
            (),
        );
        assert_eq!(cell.outcome(), Some(Outcome::Rejected(boom())));

        // resolve, then resolve
        let cell: Cell<i32, Error> = run_promise(
            |(), resolve, _reject| {
                resolve(1);
                resolve(2);
                Ok(())
            },
            (),
        );
        assert_eq!(cell.outcome(), Some(Outcome::Fulfilled(1)));

        // reject, then reject
        let cell: Cell<i32, Error> = run_promise(
            |(), _resolve, reject| {
                reject(boom());
                reject(Error::Resolver("later".into()));
                Ok(())
            },
            (),
        );
        assert_eq!(cell.outcome(), Some(Outcome::Rejected(boom())));
    }

    #[test]
    fn resolver_error_after_settlement_is_swallowed() {
        let cell: Cell<i32, Error> = run_promise(
            |(), resolve, _reject| {
                resolve(1);
                Err(boom())
            },
            (),
        );
        assert_eq!(cell.outcome(), Some(Outcome::Fulfilled(1)));

        let cell: Cell<i32, Error> = run_promise(
            |(), _resolve, reject| {
                reject(boom());
                Err(Error::Resolver("later".into()))
            },
            (),
        );
        assert_eq!(cell.outcome(), Some(Outcome::Rejected(boom())));
    }

    #[test]
    fn leading_arguments_are_forwarded_unmodified() {
        let cell: Cell<i32, Error> = run_promise(
            |(), resolve, _reject| {
                resolve(0);
                Ok(())
            },
            (),
        );
        assert_eq!(cell.outcome(), Some(Outcome::Fulfilled(0)));

        let cell: Cell<i32, Error> = run_promise(
            |a, resolve, _reject| {
                resolve(a);
                Ok(())
            },
            10,
        );
        assert_eq!(cell.outcome(), Some(Outcome::Fulfilled(10)));

        let cell: Cell<(i32, &str), Error> = run_promise(
            |(a, b), resolve, _reject| {
                resolve((a, b));
                Ok(())
            },
            (1, "two"),
        );
        assert_eq!(cell.outcome(), Some(Outcome::Fulfilled((1, "two"))));

        let cell: Cell<i32, Error> = run_promise(
            |(a, b, c), resolve, _reject| {
                resolve(a + b + c);
                Ok(())
            },
            (1, 2, 3),
        );
        assert_eq!(cell.outcome(), Some(Outcome::Fulfilled(6)));

        let cell: Cell<i32, Error> = run_promise(
            |(a, b, c, d), resolve, _reject| {
                resolve(a + b + c + d);
                Ok(())
            },
            (1, 2, 3, 4),
        );
        assert_eq!(cell.outcome(), Some(Outcome::Fulfilled(10)));
    }

    #[test]
    fn shared_values_keep_their_identity() {
        let payload = Arc::new(vec![1, 2, 3]);

        let handle = payload.clone();
        let cell: Cell<Arc<Vec<i32>>, Error> = run_promise(
            move |(), resolve, _reject| {
                resolve(handle);
                Ok(())
            },
            (),
        );

        match cell.outcome() {
            Some(Outcome::Fulfilled(value)) => assert!(Arc::ptr_eq(&value, &payload)),
            other => panic!("unexpected outcome: {:?}", other.map(|o| o.is_fulfilled())),
        }
    }

    #[test]
    fn resolver_may_settle_from_another_thread() {
        let gate = Arc::new(Barrier::new(2));
        let producer = Arc::new(Mutex::new(None));

        let cell: Cell<i32, Error> = {
            let gate = gate.clone();
            let producer = producer.clone();
            run_promise(
                move |(), resolve, _reject| {
                    *producer.lock() = Some(thread::spawn(move || {
                        gate.wait();
                        resolve(5);
                    }));
                    Ok(())
                },
                (),
            )
        };

        // The producer is parked at the barrier, so nothing has settled.
        assert!(!cell.is_settled());

        gate.wait();
        let handle = producer.lock().take();
        handle
            .expect("resolver stored the producer handle")
            .join()
            .expect("producer thread panicked");
        assert_eq!(cell.outcome(), Some(Outcome::Fulfilled(5)));
    }
}
