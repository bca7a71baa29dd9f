//! Which execution context each host thread is currently running in, for
//! every simulated kernel.
//!
//! Several kernels can exist in one process (every test makes its own), so
//! everything is keyed by kernel ID.

use std::cell::RefCell;

use fsport::ExecutionContext;

thread_local! {
    /// Contexts entered on this thread, innermost last.
    static CONTEXTS: RefCell<Vec<(usize, ExecutionContext)>> = const { RefCell::new(Vec::new()) };
}

/// Innermost context this thread has entered for `kernel`, if any.
pub(crate) fn current(kernel: usize) -> Option<ExecutionContext> {
    CONTEXTS.with(|contexts| {
        contexts
            .borrow()
            .iter()
            .rev()
            .find(|(id, _)| *id == kernel)
            .map(|(_, context)| *context)
    })
}

/// Runs `f` as if this thread were executing in `context` for `kernel`.
pub(crate) fn run_in<F, R>(kernel: usize, context: ExecutionContext, f: F) -> R
where
    F: FnOnce() -> R,
{
    CONTEXTS.with(|contexts| contexts.borrow_mut().push((kernel, context)));
    let _exit = ExitGuard;
    f()
}

/// Pops the context even if `f` panics.
struct ExitGuard;

impl Drop for ExitGuard {
    fn drop(&mut self) {
        CONTEXTS.with(|contexts| contexts.borrow_mut().pop());
    }
}
