use core::marker::PhantomData;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::backend::Backend;
use crate::error::{PortError, PortResult};
use crate::port::Port;

use super::mutex::MutexHandle;

/// Identity tag carried by an open media ("MEDI").
pub const MEDIA_OPEN_ID: u32 = 0x4D45_4449;

/// Identity tag of a closed media.
pub const MEDIA_CLOSED_ID: u32 = 0;

/// Protection for one mounted volume's cached state. Every filesystem
/// operation that touches that state holds a [`MediaGuard`] from
/// [`MediaLock::acquire`] while it does so.
///
/// The lock is recursive: a thread that already holds it may acquire it
/// again, and other threads get in only after every guard has been dropped.
pub struct MediaLock<'p, B: Backend> {
    port: &'p Port<B>,
    media_id: AtomicU32,
    mutex: MutexHandle<B>,
}

impl<'p, B: Backend> MediaLock<'p, B> {
    /// Creates the media mutex and marks the media open.
    pub fn open(port: &'p Port<B>, name: &str) -> PortResult<Self> {
        let mutex = port.create_mutex(name)?;
        Ok(Self {
            port,
            media_id: AtomicU32::new(MEDIA_OPEN_ID),
            mutex,
        })
    }

    pub fn is_open(&self) -> bool {
        self.media_id.load(Ordering::Acquire) == MEDIA_OPEN_ID
    }

    pub fn mutex(&self) -> &MutexHandle<B> {
        &self.mutex
    }

    /// Takes the media lock, blocking until it is available. Fails straight
    /// away with [`PortError::MediaNotOpen`] if the media has been closed.
    ///
    /// With a non-concurrent backend this always succeeds without touching
    /// the media state.
    pub fn acquire(&self) -> PortResult<MediaGuard<'_, 'p, B>> {
        if B::CONCURRENT {
            if !self.is_open() {
                return Err(PortError::MediaNotOpen);
            }

            let Some(native) = self.mutex.native() else {
                return Err(PortError::MediaNotOpen);
            };

            if !self.port.backend().mutex_take_recursive(native) {
                log::error!("backend refused to take media mutex");
                return Err(PortError::MediaNotOpen);
            }
        }

        Ok(MediaGuard {
            lock: self,
            _not_send: PhantomData,
        })
    }

    fn release(&self) {
        if !B::CONCURRENT {
            return;
        }
        if let Some(native) = self.mutex.native() {
            self.port.backend().mutex_give_recursive(native);
        }
    }

    /// Clears the identity tag so that later acquires fail. Holders of
    /// existing guards are unaffected.
    pub fn mark_closed(&self) {
        self.media_id.store(MEDIA_CLOSED_ID, Ordering::Release);
    }

    /// Marks the media closed and deletes its mutex. Safe to call more than
    /// once.
    pub fn close(&mut self) {
        self.mark_closed();
        self.port.delete_mutex(&mut self.mutex);
    }
}

impl<B: Backend> Drop for MediaLock<'_, B> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Held protection on a media. Dropping the guard releases one level of the
/// recursive lock. The guard must be dropped on the thread that acquired it.
#[must_use = "the media lock is released as soon as the guard is dropped"]
pub struct MediaGuard<'a, 'p, B: Backend> {
    lock: &'a MediaLock<'p, B>,
    _not_send: PhantomData<*const ()>,
}

impl<B: Backend> MediaGuard<'_, '_, B> {
    /// Releases the lock. Same as dropping the guard.
    pub fn release(self) {}
}

impl<B: Backend> Drop for MediaGuard<'_, '_, B> {
    fn drop(&mut self) {
        self.lock.release();
    }
}
