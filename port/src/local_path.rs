//! Per-thread current directory pointer.
//!
//! Each thread that uses the filesystem can have its own local path. The
//! filesystem core owns the path object; this store only remembers, per
//! thread, where it is.

use core::marker::PhantomData;
use core::ptr::NonNull;

use crate::backend::ThreadLocalBackend;
use crate::config::PortFeatures;
use crate::error::{PortError, PortResult};
use crate::port::Port;

/// Access to the calling thread's local path slot.
pub struct LocalPathStore<'p, B: ThreadLocalBackend, T = ()> {
    port: &'p Port<B>,
    slot: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<'p, B: ThreadLocalBackend, T> LocalPathStore<'p, B, T> {
    /// Reserves the configured slot (by default the backend's last one) the
    /// first time it's called on a port; later calls share that slot.
    pub fn new(port: &'p Port<B>) -> PortResult<Self> {
        if !port.features().contains(PortFeatures::LOCAL_PATH) {
            return Err(PortError::Config("local path support is disabled"));
        }

        let slot = *port
            .local_path_slot
            .try_call_once(|| claim_slot(port))?;

        Ok(Self {
            port,
            slot,
            _marker: PhantomData,
        })
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    /// The calling thread's local path, or `None` if it never set one.
    pub fn get(&self) -> Option<NonNull<T>> {
        self.port
            .backend()
            .thread_local_get(self.slot)
            .map(NonNull::cast)
    }

    /// Replaces the calling thread's local path. `None` clears it.
    pub fn set(&self, path: Option<NonNull<T>>) {
        self.port
            .backend()
            .thread_local_set(self.slot, path.map(NonNull::cast));
    }
}

fn claim_slot<B: ThreadLocalBackend>(port: &Port<B>) -> PortResult<usize> {
    let backend = port.backend();
    let slots = backend.thread_local_slots();
    let slot = match port.configured_local_path_slot() {
        Some(slot) => slot,
        None => slots
            .checked_sub(1)
            .ok_or(PortError::Config("backend has no thread-local slots"))?,
    };

    if slot >= slots {
        return Err(PortError::Config("local path slot is out of range"));
    }
    if !backend.thread_local_claim(slot) {
        return Err(PortError::Config("local path slot is used by another subsystem"));
    }

    log::debug!("local path uses thread-local slot {slot} of {slots}");
    Ok(slot)
}
