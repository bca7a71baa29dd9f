//! Capabilities a kernel (or the absence of one) provides to the shim.

use core::fmt;
use core::ops::{Add, Mul};
use core::ptr::NonNull;

/// A duration or instant measured in backend scheduler ticks.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticks(u64);

impl Ticks {
    pub const ZERO: Self = Self(0);

    pub const fn new(ticks: u64) -> Self {
        Self(ticks)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl Add for Ticks {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Mul<u64> for Ticks {
    type Output = Self;

    fn mul(self, rhs: u64) -> Self {
        Self(self.0 * rhs)
    }
}

impl fmt::Display for Ticks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ticks", self.0)
    }
}

/// Function invoked by a periodic timer. The argument is the opaque input
/// value the timer was created with.
pub type TimerCallback = fn(usize);

/// Where the currently running code is executing, as far as the scheduler is
/// concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionContext {
    /// The scheduler has not been started yet.
    Uninitialized,

    /// An ordinary schedulable thread.
    Thread,

    /// An interrupt service routine.
    Interrupt,

    /// The backend's timer service (where timer callbacks run) or its idle
    /// context.
    TimerService,
}

impl ExecutionContext {
    /// Only ordinary threads may call into the filesystem.
    pub const fn may_call_filesystem(self) -> bool {
        matches!(self, Self::Thread)
    }
}

/// Primitive operations a kernel must supply. Exactly one implementation is
/// chosen per build and threaded through the shim as a generic parameter.
///
/// Mutexes must be recursive: the holder may take the mutex again without
/// blocking, and it is only released once every take has been matched by a
/// give.
pub trait Backend: Sync {
    /// Native recursive mutex object.
    type Mutex: Send + Sync;

    /// Native periodic timer object.
    type Timer: Send + Sync;

    /// Interrupt-enable state captured when interrupts are disabled.
    type InterruptState;

    /// `false` for single execution context profiles. Protection, caller
    /// checking and the media identity check all compile away when this is
    /// `false`.
    const CONCURRENT: bool = true;

    /// Scheduler tick frequency.
    fn tick_rate_hz(&self) -> u32;

    /// Allocates a recursive mutex. `None` when the backend is out of objects.
    fn mutex_create(&self) -> Option<Self::Mutex>;

    /// Binds a diagnostic name to a mutex. Returns `false` when the backend
    /// has no registry or the registry is full.
    fn mutex_register(&self, _mutex: &Self::Mutex, _name: &str) -> bool {
        false
    }

    fn mutex_unregister(&self, _mutex: &Self::Mutex) {}

    /// Takes the mutex, blocking forever. Returns `false` if the backend
    /// refused the take.
    fn mutex_take_recursive(&self, mutex: &Self::Mutex) -> bool;

    fn mutex_give_recursive(&self, mutex: &Self::Mutex);

    fn mutex_destroy(&self, mutex: Self::Mutex);

    /// Disables interrupts and returns the state to restore later.
    fn interrupts_disable(&self) -> Self::InterruptState;

    fn interrupts_restore(&self, state: Self::InterruptState);

    /// Stops the scheduler from switching away from the current thread. Calls
    /// nest.
    fn preemption_disable(&self);

    fn preemption_restore(&self);

    fn execution_context(&self) -> ExecutionContext;

    /// Allocates a dormant auto-reloading timer that calls `callback(input)`
    /// every `period` ticks once started.
    fn timer_create(
        &self,
        name: &str,
        period: Ticks,
        callback: TimerCallback,
        input: usize,
    ) -> Option<Self::Timer>;

    /// Starts a dormant timer. Returns `false` if the timer service rejected
    /// the request.
    fn timer_start(&self, timer: &Self::Timer) -> bool;

    fn timer_destroy(&self, timer: Self::Timer);
}

/// Backends with per-thread storage slots. Profiles without it simply don't
/// implement this trait, which makes [`crate::LocalPathStore`] impossible to
/// construct for them.
pub trait ThreadLocalBackend: Backend {
    /// Number of slots every thread has.
    fn thread_local_slots(&self) -> usize;

    /// Reserves `slot` for a single subsystem. Returns `false` if the slot is
    /// out of range or already reserved.
    fn thread_local_claim(&self, slot: usize) -> bool;

    /// Reads the calling thread's value in `slot`.
    fn thread_local_get(&self, slot: usize) -> Option<NonNull<()>>;

    /// Overwrites the calling thread's value in `slot`.
    fn thread_local_set(&self, slot: usize, value: Option<NonNull<()>>);
}
