use crate::backend::Backend;
use crate::config::PortFeatures;
use crate::error::{PortError, PortResult};
use crate::port::Port;

/// Owner of a backend recursive mutex. A deleted handle is empty, which makes
/// deleting it again harmless.
pub struct MutexHandle<B: Backend> {
    native: Option<B::Mutex>,
}

impl<B: Backend> MutexHandle<B> {
    /// A handle that owns nothing, as if already deleted.
    pub const fn null() -> Self {
        Self { native: None }
    }

    pub fn is_null(&self) -> bool {
        self.native.is_none()
    }

    pub fn native(&self) -> Option<&B::Mutex> {
        self.native.as_ref()
    }
}

impl<B: Backend> Port<B> {
    /// Creates a recursive mutex and, if the registry feature is on, binds
    /// `name` to it for kernel-aware debuggers. A failed name binding only
    /// costs diagnostics; the mutex is still returned.
    pub fn create_mutex(&self, name: &str) -> PortResult<MutexHandle<B>> {
        let backend = self.backend();
        let Some(native) = backend.mutex_create() else {
            log::error!("mutex {name:?}: backend could not allocate a mutex");
            return Err(PortError::Pointer);
        };

        if self.features().contains(PortFeatures::OBJECT_REGISTRY)
            && !backend.mutex_register(&native, name)
        {
            log::warn!("mutex {name:?}: name not registered, it won't show up in diagnostics");
        }

        log::debug!("mutex {name:?} created");
        Ok(MutexHandle {
            native: Some(native),
        })
    }

    /// Unregisters and destroys the mutex, leaving `handle` null. Does nothing
    /// if `handle` is already null.
    pub fn delete_mutex(&self, handle: &mut MutexHandle<B>) {
        let Some(native) = handle.native.take() else {
            return;
        };

        let backend = self.backend();
        if self.features().contains(PortFeatures::OBJECT_REGISTRY) {
            backend.mutex_unregister(&native);
        }
        backend.mutex_destroy(native);
        log::debug!("mutex deleted");
    }
}
