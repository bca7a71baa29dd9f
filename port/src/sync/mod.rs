pub(crate) mod interrupts;
pub(crate) mod media;
pub(crate) mod mutex;

pub use interrupts::*;
pub use media::*;
pub use mutex::*;
