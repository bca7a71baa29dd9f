use core::sync::atomic::{AtomicBool, Ordering};

use spin::Once;

use crate::backend::{Backend, Ticks, TimerCallback};
use crate::config::{seconds_to_ticks, PortConfig, PortFeatures, Settings};
use crate::error::{PortError, PortResult};
use crate::timer::TimerHandle;

/// Process-wide shim state. Construct exactly one per backend at system
/// initialization and hand out references to it; everything else in this
/// crate borrows from the `Port`.
pub struct Port<B: Backend> {
    backend: B,
    settings: Settings,

    /// Slot claimed for the local path store, once claimed.
    pub(crate) local_path_slot: Once<usize>,

    system_timer_claimed: AtomicBool,
    system_timer: Once<TimerHandle<B>>,
}

impl<B: Backend> Port<B> {
    pub fn new(backend: B, config: &PortConfig) -> PortResult<Self> {
        let settings = config.resolve(backend.tick_rate_hz())?;
        log::debug!(
            "{}: {} Hz, FAT clock every {}s ({})",
            settings.version_id,
            settings.tick_rate_hz,
            settings.update_rate_seconds,
            settings.update_rate,
        );

        Ok(Self {
            backend,
            settings,
            local_path_slot: Once::new(),
            system_timer_claimed: AtomicBool::new(false),
            system_timer: Once::new(),
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn version_id(&self) -> &'static str {
        self.settings.version_id
    }

    pub fn features(&self) -> PortFeatures {
        self.settings.features
    }

    pub fn tick_rate_hz(&self) -> u32 {
        self.settings.tick_rate_hz
    }

    /// Period of the FAT clock timer.
    pub fn update_rate(&self) -> Ticks {
        self.settings.update_rate
    }

    pub fn update_rate_seconds(&self) -> u32 {
        self.settings.update_rate_seconds
    }

    pub fn seconds_to_ticks(&self, seconds: u32) -> Ticks {
        seconds_to_ticks(self.settings.tick_rate_hz, seconds)
    }

    pub(crate) fn configured_local_path_slot(&self) -> Option<usize> {
        self.settings.local_path_slot
    }

    /// Creates and starts the FAT clock timer, firing `callback(input)` every
    /// [`Port::update_rate`] ticks for the rest of the process. Only one
    /// system timer may ever be started; later calls fail with
    /// [`PortError::Access`].
    pub fn start_system_timer(&self, callback: TimerCallback, input: usize) -> PortResult<()> {
        if self.system_timer_claimed.swap(true, Ordering::AcqRel) {
            log::warn!("system timer already started");
            return Err(PortError::Access);
        }

        match self.create_periodic_timer("fsport system timer", callback, input, self.update_rate())
        {
            Ok(timer) => {
                self.system_timer.call_once(|| timer);
                Ok(())
            }
            Err(err) => {
                self.system_timer_claimed.store(false, Ordering::Release);
                Err(err)
            }
        }
    }

    pub fn system_timer(&self) -> Option<&TimerHandle<B>> {
        self.system_timer.get()
    }
}
