use std::collections::HashMap;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use fsport::{Backend, ExecutionContext, ThreadLocalBackend, Ticks, TimerCallback};
use ring_buffer::RingBuffer;
use spin::mutex::SpinMutex;

use crate::context;
use crate::events::{EventKind, KernelEvent, EVENT_HISTORY};
use crate::mutex::RecursiveMutex;
use crate::pool::ObjectPool;
use crate::timer_service::TimerService;

/// Sizes of the kernel's fixed resources.
#[derive(Debug, Clone, Copy)]
pub struct KernelConfig {
    pub tick_rate_hz: u32,
    pub max_mutexes: usize,
    pub max_timers: usize,

    /// Number of names the diagnostic registry can hold. Zero disables it.
    pub registry_size: usize,

    /// Thread-local storage slots each thread gets.
    pub thread_local_slots: usize,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 1000,
            max_mutexes: 16,
            max_timers: 8,
            registry_size: 8,
            thread_local_slots: 5,
        }
    }
}

/// Used to give every kernel in the process a distinct ID.
static NEXT_KERNEL_ID: AtomicUsize = AtomicUsize::new(1);

/// A preemptive kernel simulated on host threads. Every host thread that
/// touches the kernel counts as a kernel thread. Time only moves when
/// [`SimKernel::advance`] is called, and timer callbacks run on the kernel's
/// own timer service thread.
///
/// Cloning gives another handle to the same kernel.
#[derive(Debug, Clone)]
pub struct SimKernel {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    id: usize,
    config: KernelConfig,
    scheduler_running: AtomicBool,
    interrupts_enabled: AtomicBool,
    preempt_count: AtomicUsize,
    now: AtomicU64,

    /// Whether the timer service accepts start commands.
    timer_service_accepting: AtomicBool,
    timer_service: TimerService,

    /// Held for the whole of an [`SimKernel::advance`], so the clock only
    /// moves forward.
    advancing: SpinMutex<()>,

    mutexes: SpinMutex<ObjectPool<Arc<RecursiveMutex>>>,
    timers: SpinMutex<ObjectPool<SoftTimer>>,

    /// Names bound to mutex slots.
    registry: SpinMutex<Vec<(usize, String)>>,

    /// Thread-local slots reserved by some subsystem.
    claimed_slots: SpinMutex<Vec<bool>>,

    /// Thread-local storage as addresses, keyed by (thread, slot). Freed
    /// along with the kernel.
    thread_locals: SpinMutex<HashMap<(ThreadId, usize), usize>>,

    events: SpinMutex<RingBuffer<KernelEvent, EVENT_HISTORY>>,
}

#[derive(Debug)]
struct SoftTimer {
    name: String,
    period: u64,
    callback: TimerCallback,
    input: usize,

    /// Tick of the next expiration. `None` while dormant.
    next_expiry: Option<u64>,
}

/// Handle to a kernel mutex.
#[derive(Debug, Clone)]
pub struct SimMutex {
    slot: usize,
    lock: Arc<RecursiveMutex>,
}

impl SimMutex {
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// How many times the calling thread holds this mutex.
    pub fn held_depth(&self) -> usize {
        self.lock.held_depth()
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }
}

/// Handle to a kernel timer.
#[derive(Debug)]
pub struct SimTimer {
    slot: usize,
}

impl SimTimer {
    pub fn slot(&self) -> usize {
        self.slot
    }
}

impl SimKernel {
    pub fn new(config: KernelConfig) -> Self {
        let id = NEXT_KERNEL_ID.fetch_add(1, Ordering::Relaxed);
        log::debug!("sim kernel {id}: {config:?}");
        Self {
            inner: Arc::new(Inner {
                id,
                config,
                scheduler_running: AtomicBool::new(false),
                interrupts_enabled: AtomicBool::new(true),
                preempt_count: AtomicUsize::new(0),
                now: AtomicU64::new(0),
                timer_service_accepting: AtomicBool::new(true),
                timer_service: TimerService::spawn(id),
                advancing: SpinMutex::new(()),
                mutexes: SpinMutex::new(ObjectPool::new(config.max_mutexes)),
                timers: SpinMutex::new(ObjectPool::new(config.max_timers)),
                registry: SpinMutex::new(Vec::new()),
                claimed_slots: SpinMutex::new(vec![false; config.thread_local_slots]),
                thread_locals: SpinMutex::new(HashMap::new()),
                events: SpinMutex::new(RingBuffer::new()),
            }),
        }
    }

    /// A kernel with default resources whose scheduler is already running.
    pub fn running() -> Self {
        let kernel = Self::new(KernelConfig::default());
        kernel.start_scheduler();
        kernel
    }

    pub fn id(&self) -> usize {
        self.inner.id
    }

    pub fn config(&self) -> KernelConfig {
        self.inner.config
    }

    pub fn start_scheduler(&self) {
        self.inner.scheduler_running.store(true, Ordering::Release);
    }

    pub fn scheduler_running(&self) -> bool {
        self.inner.scheduler_running.load(Ordering::Acquire)
    }

    /// Current tick count.
    pub fn now(&self) -> u64 {
        self.inner.now.load(Ordering::Acquire)
    }

    /// Moves time forward by `ticks`, firing every timer that comes due on
    /// the way, in expiration order. Returns the number of callbacks run.
    /// Ticks don't advance before the scheduler starts, and the clock stops
    /// at `u64::MAX`.
    ///
    /// Callbacks run on the timer service thread while this waits, so the
    /// caller must not hold a lock a callback takes, and callbacks must not
    /// call `advance`. Concurrent calls run one after the other.
    pub fn advance(&self, ticks: u64) -> usize {
        if !self.scheduler_running() {
            log::debug!("sim kernel {}: scheduler not running, tick ignored", self.id());
            return 0;
        }

        let _advancing = self.inner.advancing.lock();
        let target = self.now().saturating_add(ticks);
        let mut fired = 0;
        while let Some((slot, expiry, callback, input)) = self.next_due(target) {
            self.inner.now.store(expiry, Ordering::Release);
            self.record(EventKind::TimerFired { slot });
            self.inner.timer_service.run_expiry(callback, input);
            fired += 1;
        }
        self.inner.now.store(target, Ordering::Release);
        fired
    }

    /// Finds the earliest timer expiring at or before `target` and reloads
    /// it. A timer whose next expiration is past `u64::MAX` goes dormant. The
    /// timer lock is released before returning so callbacks can use the
    /// kernel.
    fn next_due(&self, target: u64) -> Option<(usize, u64, TimerCallback, usize)> {
        let mut timers = self.inner.timers.lock();

        let mut due: Option<(usize, u64)> = None;
        for (slot, timer) in timers.iter() {
            let Some(expiry) = timer.next_expiry else {
                continue;
            };
            if expiry <= target && due.map_or(true, |(_, earliest)| expiry < earliest) {
                due = Some((slot, expiry));
            }
        }

        let (slot, expiry) = due?;
        let timer = timers.get_mut(slot)?;
        timer.next_expiry = expiry.checked_add(timer.period);
        Some((slot, expiry, timer.callback, timer.input))
    }

    /// Runs `f` as an interrupt service routine on the calling thread.
    pub fn run_in_interrupt<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        context::run_in(self.id(), ExecutionContext::Interrupt, f)
    }

    pub fn interrupts_enabled(&self) -> bool {
        self.inner.interrupts_enabled.load(Ordering::Acquire)
    }

    pub fn preempt_count(&self) -> usize {
        self.inner.preempt_count.load(Ordering::Acquire)
    }

    /// Makes the timer service accept or reject start commands, as when its
    /// command queue is full.
    pub fn set_timer_service_accepting(&self, accepting: bool) {
        self.inner
            .timer_service_accepting
            .store(accepting, Ordering::Release);
    }

    pub fn live_mutexes(&self) -> usize {
        self.inner.mutexes.lock().live()
    }

    pub fn live_timers(&self) -> usize {
        self.inner.timers.lock().live()
    }

    /// Name of a started or dormant timer.
    pub fn timer_name(&self, timer: &SimTimer) -> Option<String> {
        self.inner
            .timers
            .lock()
            .get(timer.slot)
            .map(|timer| timer.name.clone())
    }

    /// Name registered for the mutex in `slot`, if any.
    pub fn registered_name(&self, slot: usize) -> Option<String> {
        self.inner
            .registry
            .lock()
            .iter()
            .find(|(registered, _)| *registered == slot)
            .map(|(_, name)| name.clone())
    }

    /// Recorded events, most recent first.
    pub fn recent_events(&self) -> Vec<KernelEvent> {
        self.inner.events.lock().iter().collect()
    }

    fn record(&self, kind: EventKind) {
        let tick = self.now();
        log::trace!("sim kernel {} @{tick}: {kind:?}", self.id());
        self.inner.events.lock().push(KernelEvent { tick, kind });
    }
}

impl Default for SimKernel {
    fn default() -> Self {
        Self::new(KernelConfig::default())
    }
}

impl Backend for SimKernel {
    type Mutex = SimMutex;
    type Timer = SimTimer;
    type InterruptState = bool;

    fn tick_rate_hz(&self) -> u32 {
        self.inner.config.tick_rate_hz
    }

    fn mutex_create(&self) -> Option<SimMutex> {
        let lock = Arc::new(RecursiveMutex::new());
        let slot = self.inner.mutexes.lock().allocate(Arc::clone(&lock))?;
        self.record(EventKind::MutexCreated { slot });
        Some(SimMutex { slot, lock })
    }

    fn mutex_register(&self, mutex: &SimMutex, name: &str) -> bool {
        {
            let mut registry = self.inner.registry.lock();
            if registry.len() >= self.inner.config.registry_size {
                return false;
            }
            registry.push((mutex.slot, String::from(name)));
        }
        self.record(EventKind::MutexRegistered { slot: mutex.slot });
        true
    }

    fn mutex_unregister(&self, mutex: &SimMutex) {
        let removed = {
            let mut registry = self.inner.registry.lock();
            let before = registry.len();
            registry.retain(|(slot, _)| *slot != mutex.slot);
            registry.len() != before
        };
        if removed {
            self.record(EventKind::MutexUnregistered { slot: mutex.slot });
        }
    }

    fn mutex_take_recursive(&self, mutex: &SimMutex) -> bool {
        // Blocking inside an interrupt handler would hang the kernel.
        if context::current(self.id()) == Some(ExecutionContext::Interrupt) {
            return false;
        }
        mutex.lock.lock();
        true
    }

    fn mutex_give_recursive(&self, mutex: &SimMutex) {
        mutex.lock.unlock();
    }

    fn mutex_destroy(&self, mutex: SimMutex) {
        self.inner.mutexes.lock().free(mutex.slot);
        self.record(EventKind::MutexDeleted { slot: mutex.slot });
    }

    fn interrupts_disable(&self) -> bool {
        self.inner.interrupts_enabled.swap(false, Ordering::AcqRel)
    }

    fn interrupts_restore(&self, state: bool) {
        self.inner.interrupts_enabled.store(state, Ordering::Release);
    }

    fn preemption_disable(&self) {
        self.inner.preempt_count.fetch_add(1, Ordering::AcqRel);
    }

    fn preemption_restore(&self) {
        let previous = self.inner.preempt_count.fetch_sub(1, Ordering::AcqRel);
        assert!(previous > 0, "preemption restored more often than disabled");
    }

    fn execution_context(&self) -> ExecutionContext {
        if !self.scheduler_running() {
            return ExecutionContext::Uninitialized;
        }
        context::current(self.id()).unwrap_or(ExecutionContext::Thread)
    }

    fn timer_create(
        &self,
        name: &str,
        period: Ticks,
        callback: TimerCallback,
        input: usize,
    ) -> Option<SimTimer> {
        let period = period.as_u64();
        if period == 0 {
            return None;
        }

        let timer = SoftTimer {
            name: String::from(name),
            period,
            callback,
            input,
            next_expiry: None,
        };
        let slot = self.inner.timers.lock().allocate(timer)?;
        self.record(EventKind::TimerCreated { slot, period });
        Some(SimTimer { slot })
    }

    fn timer_start(&self, timer: &SimTimer) -> bool {
        if !self.inner.timer_service_accepting.load(Ordering::Acquire) {
            self.record(EventKind::TimerStartRejected { slot: timer.slot });
            return false;
        }

        let now = self.now();
        {
            let mut timers = self.inner.timers.lock();
            let Some(soft) = timers.get_mut(timer.slot) else {
                return false;
            };
            soft.next_expiry = now.checked_add(soft.period);
        }
        self.record(EventKind::TimerStarted { slot: timer.slot });
        true
    }

    fn timer_destroy(&self, timer: SimTimer) {
        self.inner.timers.lock().free(timer.slot);
        self.record(EventKind::TimerDeleted { slot: timer.slot });
    }
}

impl ThreadLocalBackend for SimKernel {
    fn thread_local_slots(&self) -> usize {
        self.inner.config.thread_local_slots
    }

    fn thread_local_claim(&self, slot: usize) -> bool {
        let mut claimed = self.inner.claimed_slots.lock();
        match claimed.get_mut(slot) {
            Some(taken) if !*taken => {
                *taken = true;
                true
            }
            _ => false,
        }
    }

    fn thread_local_get(&self, slot: usize) -> Option<NonNull<()>> {
        let key = (thread::current().id(), slot);
        let addr = *self.inner.thread_locals.lock().get(&key)?;
        NonNull::new(addr as *mut ())
    }

    fn thread_local_set(&self, slot: usize, value: Option<NonNull<()>>) {
        let key = (thread::current().id(), slot);
        let mut thread_locals = self.inner.thread_locals.lock();
        match value {
            Some(ptr) => thread_locals.insert(key, ptr.as_ptr() as usize),
            None => thread_locals.remove(&key),
        };
    }
}
