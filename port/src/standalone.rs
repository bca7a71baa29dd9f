//! Backend for builds without a kernel.
//!
//! There is a single execution context, so mutual exclusion, interrupt
//! masking and caller checking have nothing to do. Every operation succeeds.
//! Thread-local storage doesn't exist, so [`crate::LocalPathStore`] is not
//! available with this backend.

use crate::backend::{Backend, ExecutionContext, Ticks, TimerCallback};

/// Tick rate assumed when there is no kernel to ask.
pub const STANDALONE_TICK_RATE_HZ: u32 = 100;

#[derive(Debug, Default, Clone, Copy)]
pub struct Standalone;

impl Backend for Standalone {
    type Mutex = ();
    type Timer = ();
    type InterruptState = ();

    const CONCURRENT: bool = false;

    fn tick_rate_hz(&self) -> u32 {
        STANDALONE_TICK_RATE_HZ
    }

    fn mutex_create(&self) -> Option<()> {
        Some(())
    }

    fn mutex_take_recursive(&self, _mutex: &()) -> bool {
        true
    }

    fn mutex_give_recursive(&self, _mutex: &()) {}

    fn mutex_destroy(&self, _mutex: ()) {}

    fn interrupts_disable(&self) {}

    fn interrupts_restore(&self, _state: ()) {}

    fn preemption_disable(&self) {}

    fn preemption_restore(&self) {}

    fn execution_context(&self) -> ExecutionContext {
        ExecutionContext::Thread
    }

    fn timer_create(
        &self,
        _name: &str,
        _period: Ticks,
        _callback: TimerCallback,
        _input: usize,
    ) -> Option<()> {
        Some(())
    }

    fn timer_start(&self, _timer: &()) -> bool {
        true
    }

    fn timer_destroy(&self, _timer: ()) {}
}
