//! A preemptive kernel simulated on host threads, implementing every backend
//! capability `fsport` needs. Useful for running a filesystem core, and its
//! tests, on a development machine.
//!
//! - Mutexes are recursive and put waiting threads to sleep.
//! - Time is a tick counter moved by [`SimKernel::advance`]; software timers
//!   fire during the advance, on the kernel's timer service thread.
//! - Interrupt handlers are simulated with [`SimKernel::run_in_interrupt`].
//! - Mutexes and timers come from fixed pools, so allocation can fail.

#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(
    clippy::cargo_common_metadata,
    clippy::missing_const_for_fn,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::multiple_crate_versions,
    clippy::must_use_candidate,
    clippy::redundant_pub_crate
)]

mod context;
mod events;
mod kernel;
pub mod logging;
mod mutex;
mod pool;
mod timer_service;

pub use events::*;
pub use kernel::*;
pub use mutex::*;
