use core::fmt;

/// Every way a shim operation can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortError {
    /// The backend could not construct an object.
    Pointer,

    /// Protected access was attempted on a media that is not open.
    MediaNotOpen,

    /// A protected API was called from an interrupt, the timer service, or
    /// before the scheduler started.
    CallerContext,

    /// The backend rejected an operation, e.g. starting a timer.
    Access,

    /// The port configuration is invalid for the selected backend.
    Config(&'static str),
}

impl PortError {
    /// Status code the filesystem core hands back to its own callers.
    pub const fn code(self) -> u32 {
        match self {
            Self::Access => 0x06,
            Self::MediaNotOpen => 0x11,
            Self::Pointer => 0x18,
            Self::CallerContext => 0x20,
            Self::Config(_) => 0x22,
        }
    }
}

impl fmt::Display for PortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pointer => write!(f, "backend failed to construct object"),
            Self::MediaNotOpen => write!(f, "media is not open"),
            Self::CallerContext => write!(f, "called from an ineligible execution context"),
            Self::Access => write!(f, "backend rejected the request"),
            Self::Config(reason) => write!(f, "invalid port configuration: {reason}"),
        }
    }
}

pub type PortResult<T> = Result<T, PortError>;
