/*!
Errors.

Every failing provider call surfaces immediately as an [`Error`] carrying the provider
[`Status`]. Nothing is retried or suppressed, with one exception: retain and release are
fire-and-forget, see [`Handle`](crate::handle::Handle).
*/

use clhost_core::Status;

/// Errors returned by clhost.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /** No provider is available.

    - The "opencl" feature is not enabled and no runtime was installed.
    */
    #[error("no compute provider is available")]
    ProviderUnavailable,
    /// The platform index is greater than or equal to the number of platforms.
    #[error("platform index {index} is out of range 0..{platforms}")]
    PlatformIndexOutOfRange { index: usize, platforms: usize },
    /// A provider call failed.
    #[error("{call} failed: {status}")]
    Status { call: &'static str, status: Status },
    /// A factory call failed.
    #[error("failed to create {resource}: {status}")]
    CreationFailed {
        resource: &'static str,
        status: Status,
    },
    /// A property query failed.
    #[error("query of property {param:#06x} failed: {status}")]
    QueryFailed { param: u32, status: Status },
    /// An array property has a byte length that is not a whole number of words.
    #[error("query of property {param:#06x} returned {size} bytes, not a whole number of words")]
    QuerySize { param: u32, size: usize },
    /** Program compilation failed.

    The program remains valid, its build log can still be retrieved. */
    #[error("program build failed: {status}")]
    BuildFailed { status: Status },
    /// No kernel with that name in the program.
    #[error("kernel {name:?} not found: {status}")]
    KernelNotFound { name: String, status: Status },
    /// A kernel argument could not be set.
    #[error("kernel argument {index} is invalid: {status}")]
    InvalidArg { index: u32, status: Status },
    /// A command could not be enqueued.
    #[error("{command} could not be enqueued: {status}")]
    EnqueueFailed {
        command: &'static str,
        status: Status,
    },
    /// Waiting for events failed.
    #[error("wait for events failed: {status}")]
    WaitFailed { status: Status },
}

impl Error {
    /// The provider status, if the error came from a provider call.
    pub fn status(&self) -> Option<Status> {
        match self {
            Self::ProviderUnavailable
            | Self::PlatformIndexOutOfRange { .. }
            | Self::QuerySize { .. } => None,
            Self::Status { status, .. }
            | Self::CreationFailed { status, .. }
            | Self::QueryFailed { status, .. }
            | Self::BuildFailed { status }
            | Self::KernelNotFound { status, .. }
            | Self::InvalidArg { status, .. }
            | Self::EnqueueFailed { status, .. }
            | Self::WaitFailed { status } => Some(*status),
        }
    }
    pub(crate) fn status_of(call: &'static str) -> impl FnOnce(Status) -> Self {
        move |status| Self::Status { call, status }
    }
    pub(crate) fn creation(resource: &'static str) -> impl FnOnce(Status) -> Self {
        move |status| Self::CreationFailed { resource, status }
    }
    pub(crate) fn enqueue(command: &'static str) -> impl FnOnce(Status) -> Self {
        move |status| Self::EnqueueFailed { command, status }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let error = Error::CreationFailed {
            resource: "context",
            status: Status::INVALID_PLATFORM,
        };
        assert_eq!(
            error.to_string(),
            "failed to create context: Invalid platform (-32)"
        );
        let error = Error::QueryFailed {
            param: 0x102B,
            status: Status::INVALID_VALUE,
        };
        assert_eq!(
            error.to_string(),
            "query of property 0x102b failed: Invalid value (-30)"
        );
        assert_eq!(
            Error::PlatformIndexOutOfRange {
                index: 3,
                platforms: 1
            }
            .to_string(),
            "platform index 3 is out of range 0..1"
        );
    }

    #[test]
    fn error_status() {
        assert_eq!(Error::ProviderUnavailable.status(), None);
        let error = Error::enqueue("write_buffer")(Status::INVALID_MEM_OBJECT);
        assert_eq!(error.status(), Some(Status::INVALID_MEM_OBJECT));
    }
}
