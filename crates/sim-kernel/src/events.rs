/// Something that happened to a kernel object. Kept in a short history for
/// debugging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelEvent {
    /// Kernel tick count when the event happened.
    pub tick: u64,
    pub kind: EventKind,
}

/// Kernel object events. Slots identify the object within its pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    MutexCreated { slot: usize },
    MutexRegistered { slot: usize },
    MutexUnregistered { slot: usize },
    MutexDeleted { slot: usize },
    TimerCreated { slot: usize, period: u64 },
    TimerStarted { slot: usize },
    TimerStartRejected { slot: usize },
    TimerDeleted { slot: usize },
    TimerFired { slot: usize },
}

/// How many events the kernel remembers.
pub const EVENT_HISTORY: usize = 64;
