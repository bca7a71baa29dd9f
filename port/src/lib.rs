//! Operating-system abstraction layer for a FAT filesystem core.
//!
//! The filesystem core never talks to a kernel directly. Instead it goes
//! through a [`Port`], which maps a handful of primitives onto whatever
//! [`Backend`] the build selected:
//!
//! - recursive media protection ([`MediaLock`]) and interrupt/preemption
//!   guards ([`InterruptGuard`], [`PreemptGuard`]),
//! - a caller-context gate ([`Port::check_caller`]),
//! - one periodic timer driving the FAT clock ([`Port::start_system_timer`]),
//! - a per-thread current-directory pointer ([`LocalPathStore`]).
//!
//! The backend is a generic parameter, so the choice between a real kernel,
//! the [`Standalone`] no-kernel profile, or a user-supplied backend is made at
//! build time.

#![cfg_attr(not(test), no_std)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(
    clippy::cargo_common_metadata,
    clippy::doc_markdown,
    clippy::implicit_return,
    clippy::missing_const_for_fn,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::multiple_crate_versions,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::redundant_pub_crate,
    clippy::wildcard_imports
)]

mod backend;
mod caller;
mod config;
mod error;
#[cfg(feature = "local-path")]
mod local_path;
mod port;
mod standalone;
mod sync;
mod timer;

pub use backend::*;
pub use config::*;
pub use error::*;
#[cfg(feature = "local-path")]
pub use local_path::*;
pub use port::*;
pub use standalone::*;
pub use sync::*;
pub use timer::*;
