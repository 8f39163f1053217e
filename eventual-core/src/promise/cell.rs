//! Cell Implementation
//!
//! A Cell is the fundamental settlement primitive. It holds an eventual
//! value that is assigned at most once, and it tracks the observers that
//! are waiting for that assignment.
//!
//! # How Cells Work
//!
//! 1. A cell starts unsettled, with an empty queue of reactions.
//!
//! 2. Reactions registered while the cell is unsettled are queued in
//!    registration order. Reactions registered after settlement fire
//!    immediately with the recorded outcome.
//!
//! 3. The first call to `fulfill` or `reject` wins. It records the
//!    outcome, drains the queue in order, and delivers the outcome to
//!    each queued reaction exactly once. Every later settlement attempt
//!    is a silent no-op.
//!
//! 4. A cell may instead adopt another cell's eventual outcome via
//!    `adopt`. The adopting cell stores a forwarding link and moves its
//!    queued reactions to the link's destination, so that when the
//!    destination eventually settles it drains a single flat queue.
//!    Forwarding never re-dispatches outcomes link by link, which keeps
//!    stack depth constant no matter how long an adoption chain grows.
//!
//! # Thread Safety
//!
//! Each cell's state lives behind a mutex. State transitions and queue
//! draining are decided under the lock; reactions are always invoked
//! after the lock is released, so a reaction may freely touch the same
//! cell again.
//!
//! # Memory Layout
//!
//! Each cell consists of:
//! - A unique ID (8 bytes), used for diagnostics only
//! - The state (unsettled queue, forwarding link, or terminal outcome)
//!   stored behind Arc, so handles are cheap to clone and share

use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use smallvec::SmallVec;
use tracing::{trace, warn};

use super::outcome::Outcome;
use super::reaction::{watch, Reaction};

/// Counter for generating unique cell IDs.
static CELL_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique cell ID.
fn next_cell_id() -> u64 {
    CELL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Insertion-ordered reaction queue.
///
/// Most cells carry zero or one observer, so the queue stays inline and
/// does not allocate until a third reaction is registered.
pub(crate) type ReactionQueue<T, E> = SmallVec<[Box<dyn Reaction<T, E>>; 2]>;

/// A single-assignment eventual value.
///
/// A `Cell` transitions at most once from unsettled to either a
/// fulfillment value or a rejection reason. Observers registered with
/// [`Cell::subscribe`] see the outcome exactly once, in registration
/// order, whether they registered before or after settlement.
///
/// Cells are created through the public construction surface
/// ([`resolve`], [`reject`], and [`run_promise`](super::run_promise));
/// settlement itself is driven by the resolver callbacks, never by
/// arbitrary holders of a cell handle.
///
/// # Type Parameters
///
/// - `T`: The fulfillment value type. Must be Clone + Send + Sync.
/// - `E`: The rejection reason type. Must be Clone + Send + Sync.
///
/// # Example
///
/// ```rust,ignore
/// let cell = run_promise(|(), resolve, _reject| {
///     resolve(42);
///     Ok(())
/// }, ());
///
/// cell.subscribe(|outcome| println!("settled: {:?}", outcome.is_fulfilled()));
/// ```
pub struct Cell<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Unique identifier for this cell.
    id: u64,

    /// The settlement state, shared by every handle to this cell.
    inner: Arc<Mutex<State<T, E>>>,
}

/// The settlement state of a cell.
enum State<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// No outcome yet; reactions queue up in registration order.
    Unsettled { reactions: ReactionQueue<T, E> },

    /// The cell adopted another cell's eventual outcome. The link is
    /// transient plumbing; callers only ever observe the authoritative
    /// cell at the end of the chain.
    Forwarding { target: Cell<T, E> },

    /// Terminal success.
    Fulfilled { value: T },

    /// Terminal failure.
    Rejected { reason: E },
}

impl<T, E> Cell<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create a new unsettled cell.
    pub(crate) fn new() -> Self {
        Self {
            id: next_cell_id(),
            inner: Arc::new(Mutex::new(State::Unsettled {
                reactions: SmallVec::new(),
            })),
        }
    }

    /// Create a cell that is already fulfilled with `value`.
    pub fn fulfilled(value: T) -> Self {
        Self {
            id: next_cell_id(),
            inner: Arc::new(Mutex::new(State::Fulfilled { value })),
        }
    }

    /// Create a cell that is already rejected with `reason`.
    pub fn rejected(reason: E) -> Self {
        Self {
            id: next_cell_id(),
            inner: Arc::new(Mutex::new(State::Rejected { reason })),
        }
    }

    /// Get the cell's unique ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether two handles refer to the same underlying cell.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Whether the authoritative cell has settled.
    pub fn is_settled(&self) -> bool {
        matches!(
            &*self.near().inner.lock(),
            State::Fulfilled { .. } | State::Rejected { .. }
        )
    }

    /// Snapshot the authoritative settlement outcome, if any.
    ///
    /// Returns `None` while the forwarding chain still ends in an
    /// unsettled cell.
    pub fn outcome(&self) -> Option<Outcome<T, E>> {
        match &*self.near().inner.lock() {
            State::Fulfilled { value } => Some(Outcome::Fulfilled(value.clone())),
            State::Rejected { reason } => Some(Outcome::Rejected(reason.clone())),
            _ => None,
        }
    }

    /// Number of reactions queued on this cell itself.
    ///
    /// Settled and forwarding cells hold no queue; their reactions have
    /// already been delivered or migrated.
    pub fn reaction_count(&self) -> usize {
        match &*self.inner.lock() {
            State::Unsettled { reactions } => reactions.len(),
            _ => 0,
        }
    }

    /// Register interest in this cell's outcome.
    ///
    /// The callback fires exactly once with the settlement outcome:
    /// immediately if the authoritative cell has already settled, and in
    /// registration order at settlement time otherwise.
    pub fn subscribe<F>(&self, deliver: F)
    where
        F: FnOnce(Outcome<T, E>) + Send + 'static,
    {
        self.register(watch(deliver));
    }

    /// Collapse the forwarding chain starting here to the authoritative
    /// cell: the first cell in the chain that is not itself forwarding.
    ///
    /// The walk is a loop rather than a recursion, so a chain of
    /// arbitrary length resolves in constant additional stack. A
    /// trailing pointer at half speed protects against cycles, and the
    /// walked prefix is repointed at the terminal so later traversals
    /// are O(1).
    pub fn near(&self) -> Cell<T, E> {
        let mut fast = self.clone();
        let mut slow = self.clone();
        let mut stride = false;
        let terminal = loop {
            match fast.forward_target() {
                Some(next) => fast = next,
                None => break fast,
            }
            if stride {
                if let Some(next) = slow.forward_target() {
                    slow = next;
                }
                if fast.ptr_eq(&slow) {
                    // Every cell on a forwarding cycle is permanently
                    // unsettled; any member stands in as the terminal.
                    warn!(cell = self.id, "forwarding links form a cycle");
                    return fast;
                }
            }
            stride = !stride;
        };
        if !terminal.ptr_eq(self) {
            self.compress_path(&terminal);
        }
        terminal
    }

    /// Repoint every forwarding link on the path from `self` at
    /// `terminal`.
    fn compress_path(&self, terminal: &Cell<T, E>) {
        let mut walk = self.clone();
        while !walk.ptr_eq(terminal) {
            let next = {
                let mut state = walk.inner.lock();
                match &mut *state {
                    State::Forwarding { target } => {
                        let next = target.clone();
                        *target = terminal.clone();
                        next
                    }
                    _ => break,
                }
            };
            walk = next;
        }
    }

    /// The immediate forwarding target, if this cell is a link.
    fn forward_target(&self) -> Option<Cell<T, E>> {
        match &*self.inner.lock() {
            State::Forwarding { target } => Some(target.clone()),
            _ => None,
        }
    }

    /// Attach a reaction to the authoritative cell.
    ///
    /// Queued if that cell is unsettled; fired immediately with the
    /// recorded outcome if it has already settled. Either way the
    /// reaction observes the outcome exactly once.
    pub(crate) fn register(&self, reaction: Box<dyn Reaction<T, E>>) {
        let mut target = self.near();
        let outcome = 'walk: loop {
            {
                let mut state = target.inner.lock();
                match &mut *state {
                    State::Unsettled { reactions } => {
                        reactions.push(reaction);
                        return;
                    }
                    State::Fulfilled { value } => break 'walk Outcome::Fulfilled(value.clone()),
                    State::Rejected { reason } => break 'walk Outcome::Rejected(reason.clone()),
                    // An adoption can slip in between near() and the
                    // lock; chase the fresh link.
                    State::Forwarding { .. } => {}
                }
            }
            target = target.near();
        };
        match outcome {
            Outcome::Fulfilled(value) => reaction.fulfilled(value),
            Outcome::Rejected(reason) => {
                reaction.rejected(reason);
            }
        }
    }

    /// Settle this cell with a fulfillment value.
    ///
    /// No-op unless the cell is unsettled.
    pub(crate) fn fulfill(&self, value: T) {
        self.settle(Outcome::Fulfilled(value));
    }

    /// Settle this cell with a rejection reason.
    ///
    /// No-op unless the cell is unsettled.
    pub(crate) fn reject(&self, reason: E) {
        self.settle(Outcome::Rejected(reason));
    }

    /// Record the outcome and drain the queue.
    ///
    /// The transition is decided under the lock; delivery happens after
    /// the lock is released.
    fn settle(&self, outcome: Outcome<T, E>) {
        let reactions = {
            let mut state = self.inner.lock();
            match &mut *state {
                State::Unsettled { reactions } => {
                    let drained = mem::take(reactions);
                    *state = match &outcome {
                        Outcome::Fulfilled(value) => State::Fulfilled {
                            value: value.clone(),
                        },
                        Outcome::Rejected(reason) => State::Rejected {
                            reason: reason.clone(),
                        },
                    };
                    drained
                }
                // First settlement wins.
                _ => return,
            }
        };
        trace!(
            cell = self.id,
            fulfilled = outcome.is_fulfilled(),
            reactions = reactions.len(),
            "cell settled"
        );
        Self::deliver(self.id, reactions, outcome);
    }

    /// Deliver an outcome to a drained queue, in registration order.
    fn deliver(id: u64, reactions: ReactionQueue<T, E>, outcome: Outcome<T, E>) {
        let observers = reactions.len();
        let mut handled = false;
        for reaction in reactions {
            match &outcome {
                Outcome::Fulfilled(value) => reaction.fulfilled(value.clone()),
                Outcome::Rejected(reason) => handled |= reaction.rejected(reason.clone()),
            }
        }
        if observers > 0 && outcome.is_rejected() && !handled {
            trace!(cell = id, observers, "rejection forwarded without a consuming observer");
        }
    }

    /// Adopt another cell's eventual outcome.
    ///
    /// The adopting cell does not copy state; it stores a forwarding
    /// link to `source`'s authoritative cell and moves its queued
    /// reactions there, so they drain when that cell settles. No-op
    /// unless this cell is unsettled. A cell refusing to adopt itself
    /// stays unsettled; its outcome can never be produced.
    pub(crate) fn adopt(&self, source: &Cell<T, E>) {
        let target = source.near();
        if target.ptr_eq(self) {
            warn!(cell = self.id, "cell cannot adopt its own outcome");
            return;
        }
        let migrated = {
            let mut state = self.inner.lock();
            match &mut *state {
                State::Unsettled { reactions } => {
                    let drained = mem::take(reactions);
                    *state = State::Forwarding {
                        target: target.clone(),
                    };
                    drained
                }
                _ => return,
            }
        };
        trace!(
            cell = self.id,
            target = target.id,
            reactions = migrated.len(),
            "cell adopted"
        );
        for reaction in migrated {
            target.register(reaction);
        }
    }
}

impl<T, E> Clone for Cell<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E> fmt::Debug for Cell<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.inner.lock() {
            State::Unsettled { reactions } => format!("unsettled({} reactions)", reactions.len()),
            State::Forwarding { target } => format!("forwarding(-> {})", target.id),
            State::Fulfilled { .. } => "fulfilled".to_string(),
            State::Rejected { .. } => "rejected".to_string(),
        };
        f.debug_struct("Cell")
            .field("id", &self.id)
            .field("state", &state)
            .finish()
    }
}

/// Create a cell that is already fulfilled with `value`.
pub fn resolve<T, E>(value: T) -> Cell<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    Cell::fulfilled(value)
}

/// Create a cell that is already rejected with `reason`.
pub fn reject<T, E>(reason: E) -> Cell<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    Cell::rejected(reason)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
