use crate::backend::{Backend, ExecutionContext};
use crate::config::PortFeatures;
use crate::error::{PortError, PortResult};
use crate::port::Port;

impl<B: Backend> Port<B> {
    /// Gate run at the top of every protected filesystem entry point. Fails
    /// with [`PortError::CallerContext`] before the scheduler is running and
    /// from interrupt or timer service context. Never blocks.
    pub fn check_caller(&self) -> PortResult<()> {
        if !B::CONCURRENT || !self.features().contains(PortFeatures::CALLER_CHECKING) {
            return Ok(());
        }

        match self.backend().execution_context() {
            ExecutionContext::Thread => Ok(()),
            context => {
                log::warn!("rejecting filesystem call from {context:?} context");
                Err(PortError::CallerContext)
            }
        }
    }
}
