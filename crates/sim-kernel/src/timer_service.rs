//! The thread timer callbacks run on. Each kernel owns one, so a callback
//! never shares a thread, and therefore never shares mutex ownership, with
//! the filesystem caller that advanced the clock.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread;

use fsport::{ExecutionContext, TimerCallback};

use crate::context;

/// One expired timer's callback, and where to report that it returned.
struct Expiry {
    callback: TimerCallback,
    input: usize,
    done: SyncSender<thread::Result<()>>,
}

/// Handle to a kernel's timer service thread. The thread exits once the
/// handle is dropped.
#[derive(Debug)]
pub(crate) struct TimerService {
    expiries: SyncSender<Expiry>,
}

impl TimerService {
    pub(crate) fn spawn(kernel: usize) -> Self {
        let (expiries, receiver) = mpsc::sync_channel(0);
        let spawned = thread::Builder::new()
            .name(format!("sim-kernel-{kernel}-timer-service"))
            .spawn(move || run(kernel, &receiver));
        if let Err(err) = spawned {
            panic!("sim kernel {kernel}: failed to spawn timer service: {err}");
        }
        Self { expiries }
    }

    /// Runs `callback(input)` on the timer service thread and waits for it to
    /// return. A panic in the callback is re-raised on the calling thread.
    pub(crate) fn run_expiry(&self, callback: TimerCallback, input: usize) {
        let (done, finished) = mpsc::sync_channel(1);
        let expiry = Expiry {
            callback,
            input,
            done,
        };
        assert!(
            self.expiries.send(expiry).is_ok(),
            "timer service thread is gone"
        );

        match finished.recv() {
            Ok(Ok(())) => {}
            Ok(Err(payload)) => panic::resume_unwind(payload),
            Err(_) => panic!("timer service thread is gone"),
        }
    }
}

fn run(kernel: usize, expiries: &Receiver<Expiry>) {
    for Expiry {
        callback,
        input,
        done,
    } in expiries
    {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            context::run_in(kernel, ExecutionContext::TimerService, || callback(input));
        }));
        // Only fails if the advancing thread is already gone.
        let _ = done.send(result);
    }
    log::debug!("sim kernel {kernel}: timer service stopped");
}
