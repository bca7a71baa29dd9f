//! Numeric tuning and feature selection for a [`crate::Port`].

use bitflags::bitflags;

use crate::backend::Ticks;
use crate::error::{PortError, PortResult};

/// Default number of seconds between FAT clock updates.
pub const DEFAULT_UPDATE_RATE_SECONDS: u32 = 10;

/// Identification string reported by [`crate::Port::version_id`] unless the
/// configuration overrides it.
pub const DEFAULT_VERSION_ID: &str = concat!("fsport ", env!("CARGO_PKG_VERSION"));

bitflags! {
    /// Optional behaviour of the shim.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PortFeatures: u8 {
        /// Reject protected calls from interrupts, the timer service, and
        /// before the scheduler starts.
        const CALLER_CHECKING = 1 << 0;

        /// Register mutex names with the backend's diagnostic registry.
        const OBJECT_REGISTRY = 1 << 1;

        /// Per-thread current directory pointer.
        const LOCAL_PATH = 1 << 2;
    }
}

/// Unvalidated configuration. Validated once by [`crate::Port::new`].
#[derive(Debug, Clone)]
pub struct PortConfig {
    tick_rate_hz: Option<u32>,
    update_rate_seconds: u32,
    update_rate_ticks: Option<u64>,
    local_path_slot: Option<usize>,
    features: PortFeatures,
    version_id: &'static str,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: None,
            update_rate_seconds: DEFAULT_UPDATE_RATE_SECONDS,
            update_rate_ticks: None,
            local_path_slot: None,
            features: PortFeatures::all(),
            version_id: DEFAULT_VERSION_ID,
        }
    }
}

impl PortConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the tick rate the backend reports.
    pub fn with_tick_rate_hz(mut self, hz: u32) -> Self {
        self.tick_rate_hz = Some(hz);
        self
    }

    pub fn with_update_rate_seconds(mut self, seconds: u32) -> Self {
        self.update_rate_seconds = seconds;
        self
    }

    /// Uses an explicit timer period instead of deriving it from the tick
    /// rate and the update rate in seconds.
    pub fn with_update_rate_ticks(mut self, ticks: u64) -> Self {
        self.update_rate_ticks = Some(ticks);
        self
    }

    /// Thread-local slot reserved for the current directory pointer. Defaults
    /// to the last slot the backend provides.
    pub fn with_local_path_slot(mut self, slot: usize) -> Self {
        self.local_path_slot = Some(slot);
        self
    }

    pub fn with_features(mut self, features: PortFeatures) -> Self {
        self.features = features;
        self
    }

    pub fn with_version_id(mut self, version_id: &'static str) -> Self {
        self.version_id = version_id;
        self
    }

    /// Checks the configuration and fills in backend defaults.
    pub(crate) fn resolve(&self, backend_tick_rate_hz: u32) -> PortResult<Settings> {
        let tick_rate_hz = self.tick_rate_hz.unwrap_or(backend_tick_rate_hz);
        if tick_rate_hz == 0 {
            return Err(PortError::Config("tick rate must be non-zero"));
        }

        // FAT timestamps have a two second granularity.
        if self.update_rate_seconds < 2 || self.update_rate_seconds % 2 != 0 {
            return Err(PortError::Config(
                "update rate must be an even number of seconds of at least 2",
            ));
        }

        let update_rate = match self.update_rate_ticks {
            Some(0) => return Err(PortError::Config("update rate in ticks must be non-zero")),
            Some(ticks) => Ticks::new(ticks),
            None => seconds_to_ticks(tick_rate_hz, self.update_rate_seconds),
        };

        Ok(Settings {
            tick_rate_hz,
            update_rate_seconds: self.update_rate_seconds,
            update_rate,
            local_path_slot: self.local_path_slot,
            features: self.features,
            version_id: self.version_id,
        })
    }
}

/// Validated configuration owned by a [`crate::Port`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct Settings {
    pub(crate) tick_rate_hz: u32,
    pub(crate) update_rate_seconds: u32,
    pub(crate) update_rate: Ticks,
    pub(crate) local_path_slot: Option<usize>,
    pub(crate) features: PortFeatures,
    pub(crate) version_id: &'static str,
}

pub(crate) fn seconds_to_ticks(tick_rate_hz: u32, seconds: u32) -> Ticks {
    Ticks::new(u64::from(tick_rate_hz)) * u64::from(seconds)
}
