/*!
Provider status codes.

Every provider entry point reports a [`Status`]. Zero is success, negative values are failures.
Messages come from a fixed table; codes missing from the table render as `"Unknown"`.
*/

use std::fmt::{self, Debug, Display};

/// A provider status code.
#[derive(Clone, Copy, Eq, PartialEq, Hash, thiserror::Error)]
#[repr(transparent)]
pub struct Status(i32);

macro_rules! status_codes {
    ($($name:ident = $code:literal => $message:literal,)+) => {
        impl Status {
            $(
                #[allow(missing_docs)]
                pub const $name: Self = Self($code);
            )+
            /// Human readable message for the code.
            pub const fn message(&self) -> &'static str {
                match self.0 {
                    $(
                        $code => $message,
                    )+
                    _ => "Unknown",
                }
            }
            /// Name of the code, ie "INVALID_VALUE".
            pub const fn name(&self) -> Option<&'static str> {
                match self.0 {
                    $(
                        $code => Some(stringify!($name)),
                    )+
                    _ => None,
                }
            }
        }
    };
}

status_codes! {
    SUCCESS = 0 => "Success!",
    DEVICE_NOT_FOUND = -1 => "Device not found.",
    DEVICE_NOT_AVAILABLE = -2 => "Device not available",
    COMPILER_NOT_AVAILABLE = -3 => "Compiler not available",
    MEM_OBJECT_ALLOCATION_FAILURE = -4 => "Memory object allocation failure",
    OUT_OF_RESOURCES = -5 => "Out of resources",
    OUT_OF_HOST_MEMORY = -6 => "Out of host memory",
    PROFILING_INFO_NOT_AVAILABLE = -7 => "Profiling information not available",
    MEM_COPY_OVERLAP = -8 => "Memory copy overlap",
    IMAGE_FORMAT_MISMATCH = -9 => "Image format mismatch",
    IMAGE_FORMAT_NOT_SUPPORTED = -10 => "Image format not supported",
    BUILD_PROGRAM_FAILURE = -11 => "Program build failure",
    MAP_FAILURE = -12 => "Map failure",
    INVALID_VALUE = -30 => "Invalid value",
    INVALID_DEVICE_TYPE = -31 => "Invalid device type",
    INVALID_PLATFORM = -32 => "Invalid platform",
    INVALID_DEVICE = -33 => "Invalid device",
    INVALID_CONTEXT = -34 => "Invalid context",
    INVALID_QUEUE_PROPERTIES = -35 => "Invalid queue properties",
    INVALID_COMMAND_QUEUE = -36 => "Invalid command queue",
    INVALID_HOST_PTR = -37 => "Invalid host pointer",
    INVALID_MEM_OBJECT = -38 => "Invalid memory object",
    INVALID_IMAGE_FORMAT_DESCRIPTOR = -39 => "Invalid image format descriptor",
    INVALID_IMAGE_SIZE = -40 => "Invalid image size",
    INVALID_SAMPLER = -41 => "Invalid sampler",
    INVALID_BINARY = -42 => "Invalid binary",
    INVALID_BUILD_OPTIONS = -43 => "Invalid build options",
    INVALID_PROGRAM = -44 => "Invalid program",
    INVALID_PROGRAM_EXECUTABLE = -45 => "Invalid program executable",
    INVALID_KERNEL_NAME = -46 => "Invalid kernel name",
    INVALID_KERNEL_DEFINITION = -47 => "Invalid kernel definition",
    INVALID_KERNEL = -48 => "Invalid kernel",
    INVALID_ARG_INDEX = -49 => "Invalid argument index",
    INVALID_ARG_VALUE = -50 => "Invalid argument value",
    INVALID_ARG_SIZE = -51 => "Invalid argument size",
    INVALID_KERNEL_ARGS = -52 => "Invalid kernel arguments",
    INVALID_WORK_DIMENSION = -53 => "Invalid work dimension",
    INVALID_WORK_GROUP_SIZE = -54 => "Invalid work group size",
    INVALID_WORK_ITEM_SIZE = -55 => "Invalid work item size",
    INVALID_GLOBAL_OFFSET = -56 => "Invalid global offset",
    INVALID_EVENT_WAIT_LIST = -57 => "Invalid event wait list",
    INVALID_EVENT = -58 => "Invalid event",
    INVALID_OPERATION = -59 => "Invalid operation",
    INVALID_GL_OBJECT = -60 => "Invalid OpenGL object",
    INVALID_BUFFER_SIZE = -61 => "Invalid buffer size",
    INVALID_MIP_LEVEL = -62 => "Invalid mip-map level",
    INVALID_GLOBAL_WORK_SIZE = -63 => "Invalid global work size",
}

impl Status {
    /// Wraps a raw code.
    pub const fn from_code(code: i32) -> Self {
        Self(code)
    }
    /// The raw code.
    pub const fn code(&self) -> i32 {
        self.0
    }
    /// Is [`SUCCESS`](Self::SUCCESS).
    pub const fn is_success(&self) -> bool {
        self.0 == 0
    }
    /// `Ok(())` on success, otherwise `Err(self)`.
    pub const fn check(self) -> Result<(), Self> {
        if self.is_success() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<i32> for Status {
    fn from(code: i32) -> Self {
        Self(code)
    }
}

impl Debug for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "Status::{name}"),
            None => write!(f, "Status({})", self.0),
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.message(), self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_messages() {
        assert_eq!(Status::SUCCESS.message(), "Success!");
        assert_eq!(Status::INVALID_KERNEL_NAME.message(), "Invalid kernel name");
        assert_eq!(Status::from_code(-1000).message(), "Unknown");
        assert_eq!(
            Status::BUILD_PROGRAM_FAILURE.to_string(),
            "Program build failure (-11)"
        );
        assert_eq!(format!("{:?}", Status::INVALID_VALUE), "Status::INVALID_VALUE");
        assert_eq!(format!("{:?}", Status::from_code(7)), "Status(7)");
    }

    #[test]
    fn status_check() {
        assert_eq!(Status::SUCCESS.check(), Ok(()));
        assert_eq!(
            Status::INVALID_EVENT.check(),
            Err(Status::INVALID_EVENT)
        );
    }
}
