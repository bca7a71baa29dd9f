//! Periodic timer service used to advance the FAT date and time.

use crate::backend::{Backend, Ticks, TimerCallback};
use crate::error::{PortError, PortResult};
use crate::port::Port;

/// A started auto-reloading timer. There is no way to stop one: it keeps
/// firing for the rest of the process, even if the handle is dropped.
pub struct TimerHandle<B: Backend> {
    native: B::Timer,
    period: Ticks,
}

impl<B: Backend> TimerHandle<B> {
    pub fn period(&self) -> Ticks {
        self.period
    }

    pub fn native(&self) -> &B::Timer {
        &self.native
    }
}

impl<B: Backend> Port<B> {
    /// Allocates a recurring timer that runs `callback(input)` every `period`
    /// ticks on the backend's timer service, then starts it. The first call
    /// happens one period after this returns.
    ///
    /// Fails with [`PortError::Pointer`] if the timer can't be allocated and
    /// with [`PortError::Access`] if the backend won't start it. In the latter
    /// case the allocated timer is destroyed before returning.
    pub fn create_periodic_timer(
        &self,
        name: &str,
        callback: TimerCallback,
        input: usize,
        period: Ticks,
    ) -> PortResult<TimerHandle<B>> {
        if period == Ticks::ZERO {
            log::error!("timer {name:?}: period must be non-zero");
            return Err(PortError::Pointer);
        }

        let backend = self.backend();
        let Some(native) = backend.timer_create(name, period, callback, input) else {
            log::error!("timer {name:?}: backend could not allocate a timer");
            return Err(PortError::Pointer);
        };

        if !backend.timer_start(&native) {
            log::error!("timer {name:?}: backend rejected start");
            backend.timer_destroy(native);
            return Err(PortError::Access);
        }

        log::debug!("timer {name:?} started, period {period}");
        Ok(TimerHandle { native, period })
    }
}
