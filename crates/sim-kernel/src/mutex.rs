use std::collections::VecDeque;
use std::thread::{self, Thread, ThreadId};

use spin::mutex::SpinMutex;

/// Recursive mutex that puts threads to sleep while waiting for access.
#[derive(Debug)]
pub struct RecursiveMutex {
    /// Current holder and how many times it has taken the lock.
    owner: SpinMutex<Owner>,

    /// Threads waiting for the lock, oldest first.
    waiting_threads: SpinMutex<VecDeque<Thread>>,
}

#[derive(Debug, Default)]
struct Owner {
    thread: Option<ThreadId>,
    depth: usize,
}

impl RecursiveMutex {
    pub const fn new() -> Self {
        Self {
            owner: SpinMutex::new(Owner {
                thread: None,
                depth: 0,
            }),
            waiting_threads: SpinMutex::new(VecDeque::new()),
        }
    }

    /// Takes the lock, sleeping until it is free. Returns immediately if the
    /// calling thread already holds it.
    pub fn lock(&self) {
        let current = thread::current();
        loop {
            {
                let mut owner = self.owner.lock();
                match owner.thread {
                    None => {
                        owner.thread = Some(current.id());
                        owner.depth = 1;
                        return;
                    }
                    Some(id) if id == current.id() => {
                        owner.depth += 1;
                        return;
                    }
                    // Queue ourselves while still holding `owner`, so the
                    // holder can't release in between and miss us.
                    Some(_) => self.waiting_threads.lock().push_back(current.clone()),
                }
            }

            // Spurious wakeups just go around the loop again.
            thread::park();
        }
    }

    /// Takes the lock only if it can be done without sleeping.
    pub fn try_lock(&self) -> bool {
        let current = thread::current().id();
        let mut owner = self.owner.lock();
        match owner.thread {
            None => {
                owner.thread = Some(current);
                owner.depth = 1;
                true
            }
            Some(id) if id == current => {
                owner.depth += 1;
                true
            }
            Some(_) => false,
        }
    }

    /// Drops one level of the lock. Waiters are woken once the depth reaches
    /// zero.
    pub fn unlock(&self) {
        let current = thread::current().id();
        {
            let mut owner = self.owner.lock();
            assert_eq!(
                owner.thread,
                Some(current),
                "mutex unlocked by a thread that doesn't hold it"
            );
            owner.depth -= 1;
            if owner.depth > 0 {
                return;
            }
            owner.thread = None;
        }

        // TODO: Only wake the first waiter once we can tell whether it still
        // wants the lock. Waking everyone is correct but makes the losers
        // queue up again.
        let mut waiting_threads = self.waiting_threads.lock();
        while let Some(waiter) = waiting_threads.pop_front() {
            waiter.unpark();
        }
    }

    /// How many times the calling thread holds the lock.
    pub fn held_depth(&self) -> usize {
        let owner = self.owner.lock();
        if owner.thread == Some(thread::current().id()) {
            owner.depth
        } else {
            0
        }
    }

    pub fn is_locked(&self) -> bool {
        self.owner.lock().thread.is_some()
    }
}

impl Default for RecursiveMutex {
    fn default() -> Self {
        Self::new()
    }
}
