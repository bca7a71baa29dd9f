//! Short critical sections: interrupt masking and preemption control.
//!
//! These are for a handful of instructions around shared state like the
//! system clock, never for anything that can block. Use [`crate::MediaLock`]
//! for longer sections.

use core::marker::PhantomData;

use crate::backend::Backend;
use crate::port::Port;

/// Interrupt-enable state saved by [`Port::disable_interrupts`]. It has to be
/// handed back to [`Port::restore_interrupts`] exactly once, and tokens must
/// be restored in the reverse order they were taken.
#[must_use = "interrupts stay disabled until the token is restored"]
pub struct InterruptToken<B: Backend> {
    state: B::InterruptState,
}

impl<B: Backend> Port<B> {
    /// Disables interrupts, returning the previous state.
    pub fn disable_interrupts(&self) -> InterruptToken<B> {
        InterruptToken {
            state: self.backend().interrupts_disable(),
        }
    }

    /// Puts interrupts back the way they were before the paired
    /// [`Port::disable_interrupts`].
    pub fn restore_interrupts(&self, token: InterruptToken<B>) {
        self.backend().interrupts_restore(token.state);
    }

    /// Scoped interrupt masking. Interrupts are restored when the guard drops,
    /// including on early return.
    pub fn interrupt_guard(&self) -> InterruptGuard<'_, B> {
        InterruptGuard {
            port: self,
            token: Some(self.disable_interrupts()),
            _not_send: PhantomData,
        }
    }

    /// Runs `f` with interrupts disabled.
    pub fn without_interrupts<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = self.interrupt_guard();
        f()
    }

    /// Keeps the scheduler on the current thread until the guard drops.
    pub fn disable_preemption(&self) -> PreemptGuard<'_, B> {
        self.backend().preemption_disable();
        PreemptGuard {
            port: self,
            _not_send: PhantomData,
        }
    }
}

/// Restores interrupts to their saved state when dropped.
pub struct InterruptGuard<'p, B: Backend> {
    port: &'p Port<B>,
    // Only `None` once the guard is being dropped.
    token: Option<InterruptToken<B>>,
    _not_send: PhantomData<*const ()>,
}

impl<B: Backend> Drop for InterruptGuard<'_, B> {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            self.port.restore_interrupts(token);
        }
    }
}

/// Re-enables preemption when dropped.
pub struct PreemptGuard<'p, B: Backend> {
    port: &'p Port<B>,
    _not_send: PhantomData<*const ()>,
}

impl<B: Backend> Drop for PreemptGuard<'_, B> {
    fn drop(&mut self) {
        self.port.backend().preemption_restore();
    }
}

#[cfg(test)]
mod tests {
    use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use proptest::prelude::*;

    use super::*;
    use crate::{ExecutionContext, PortConfig, Ticks, TimerCallback};

    /// Backend with a single interrupt-enable flag and a preemption counter.
    struct FlagBackend {
        interrupts_enabled: AtomicBool,
        preempt_count: AtomicUsize,
    }

    impl FlagBackend {
        fn new() -> Self {
            Self {
                interrupts_enabled: AtomicBool::new(true),
                preempt_count: AtomicUsize::new(0),
            }
        }

        fn enabled(&self) -> bool {
            self.interrupts_enabled.load(Ordering::SeqCst)
        }
    }

    impl Backend for FlagBackend {
        type Mutex = ();
        type Timer = ();
        type InterruptState = bool;

        fn tick_rate_hz(&self) -> u32 {
            1000
        }

        fn mutex_create(&self) -> Option<()> {
            Some(())
        }

        fn mutex_take_recursive(&self, _mutex: &()) -> bool {
            true
        }

        fn mutex_give_recursive(&self, _mutex: &()) {}

        fn mutex_destroy(&self, _mutex: ()) {}

        fn interrupts_disable(&self) -> bool {
            self.interrupts_enabled.swap(false, Ordering::SeqCst)
        }

        fn interrupts_restore(&self, state: bool) {
            self.interrupts_enabled.store(state, Ordering::SeqCst);
        }

        fn preemption_disable(&self) {
            self.preempt_count.fetch_add(1, Ordering::SeqCst);
        }

        fn preemption_restore(&self) {
            self.preempt_count.fetch_sub(1, Ordering::SeqCst);
        }

        fn execution_context(&self) -> ExecutionContext {
            ExecutionContext::Thread
        }

        fn timer_create(&self, _: &str, _: Ticks, _: TimerCallback, _: usize) -> Option<()> {
            Some(())
        }

        fn timer_start(&self, _timer: &()) -> bool {
            true
        }

        fn timer_destroy(&self, _timer: ()) {}
    }

    fn port() -> Port<FlagBackend> {
        Port::new(FlagBackend::new(), &PortConfig::new()).unwrap()
    }

    #[test]
    fn guard_restores_on_early_return() {
        let port = port();

        fn bail_out(port: &Port<FlagBackend>) -> Option<u32> {
            let _guard = port.interrupt_guard();
            assert!(!port.backend().enabled());
            let missing: Option<u32> = None;
            let value = missing?;
            Some(value)
        }

        assert!(bail_out(&port).is_none());
        assert!(port.backend().enabled());
    }

    #[test]
    fn nested_guards_keep_outer_state() {
        let port = port();
        let outer = port.interrupt_guard();
        {
            let _inner = port.interrupt_guard();
            assert!(!port.backend().enabled());
        }
        // The inner guard restores "disabled", the state it found.
        assert!(!port.backend().enabled());
        drop(outer);
        assert!(port.backend().enabled());
    }

    #[test]
    fn without_interrupts_returns_value() {
        let port = port();
        let value = port.without_interrupts(|| {
            assert!(!port.backend().enabled());
            42
        });
        assert_eq!(value, 42);
        assert!(port.backend().enabled());
    }

    #[test]
    fn preempt_guards_nest() {
        let port = port();
        let a = port.disable_preemption();
        let b = port.disable_preemption();
        assert_eq!(port.backend().preempt_count.load(Ordering::SeqCst), 2);
        drop(b);
        drop(a);
        assert_eq!(port.backend().preempt_count.load(Ordering::SeqCst), 0);
    }

    proptest! {
        #[test]
        fn restore_reestablishes_state_before_each_disable(
            initially_enabled: bool,
            depth in 1..32_usize,
        ) {
            let port = port();
            port.backend().interrupts_restore(initially_enabled);

            // Record the state seen right before every disable, then unwind
            // in LIFO order and check each restore lands on that state.
            let mut stack = Vec::new();
            for _ in 0..depth {
                let before = port.backend().enabled();
                stack.push((before, port.disable_interrupts()));
                prop_assert!(!port.backend().enabled());
            }

            while let Some((before, token)) = stack.pop() {
                port.restore_interrupts(token);
                prop_assert_eq!(port.backend().enabled(), before);
            }
            prop_assert_eq!(port.backend().enabled(), initially_enabled);
        }
    }
}
