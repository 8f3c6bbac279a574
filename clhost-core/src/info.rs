//! Property ids accepted by the provider's info entry points.

/// Platform properties.
pub mod platform {
    pub const PROFILE: u32 = 0x0900;
    pub const VERSION: u32 = 0x0901;
    pub const NAME: u32 = 0x0902;
    pub const VENDOR: u32 = 0x0903;
    pub const EXTENSIONS: u32 = 0x0904;
}

/// Device properties.
pub mod device {
    pub const TYPE: u32 = 0x1000;
    pub const VENDOR_ID: u32 = 0x1001;
    pub const MAX_COMPUTE_UNITS: u32 = 0x1002;
    pub const MAX_WORK_ITEM_DIMENSIONS: u32 = 0x1003;
    pub const MAX_WORK_GROUP_SIZE: u32 = 0x1004;
    pub const MAX_WORK_ITEM_SIZES: u32 = 0x1005;
    pub const PREFERRED_VECTOR_WIDTH_CHAR: u32 = 0x1006;
    pub const PREFERRED_VECTOR_WIDTH_SHORT: u32 = 0x1007;
    pub const PREFERRED_VECTOR_WIDTH_INT: u32 = 0x1008;
    pub const PREFERRED_VECTOR_WIDTH_LONG: u32 = 0x1009;
    pub const PREFERRED_VECTOR_WIDTH_FLOAT: u32 = 0x100A;
    pub const PREFERRED_VECTOR_WIDTH_DOUBLE: u32 = 0x100B;
    pub const MAX_CLOCK_FREQUENCY: u32 = 0x100C;
    pub const ADDRESS_BITS: u32 = 0x100D;
    pub const MAX_READ_IMAGE_ARGS: u32 = 0x100E;
    pub const MAX_WRITE_IMAGE_ARGS: u32 = 0x100F;
    pub const MAX_MEM_ALLOC_SIZE: u32 = 0x1010;
    pub const IMAGE2D_MAX_WIDTH: u32 = 0x1011;
    pub const IMAGE2D_MAX_HEIGHT: u32 = 0x1012;
    pub const IMAGE3D_MAX_WIDTH: u32 = 0x1013;
    pub const IMAGE3D_MAX_HEIGHT: u32 = 0x1014;
    pub const IMAGE3D_MAX_DEPTH: u32 = 0x1015;
    pub const IMAGE_SUPPORT: u32 = 0x1016;
    pub const MAX_PARAMETER_SIZE: u32 = 0x1017;
    pub const MAX_SAMPLERS: u32 = 0x1018;
    pub const MEM_BASE_ADDR_ALIGN: u32 = 0x1019;
    pub const MIN_DATA_TYPE_ALIGN_SIZE: u32 = 0x101A;
    pub const SINGLE_FP_CONFIG: u32 = 0x101B;
    pub const GLOBAL_MEM_CACHE_TYPE: u32 = 0x101C;
    pub const GLOBAL_MEM_CACHELINE_SIZE: u32 = 0x101D;
    pub const GLOBAL_MEM_CACHE_SIZE: u32 = 0x101E;
    pub const GLOBAL_MEM_SIZE: u32 = 0x101F;
    pub const MAX_CONSTANT_BUFFER_SIZE: u32 = 0x1020;
    pub const MAX_CONSTANT_ARGS: u32 = 0x1021;
    pub const LOCAL_MEM_TYPE: u32 = 0x1022;
    pub const LOCAL_MEM_SIZE: u32 = 0x1023;
    pub const ERROR_CORRECTION_SUPPORT: u32 = 0x1024;
    pub const PROFILING_TIMER_RESOLUTION: u32 = 0x1025;
    pub const ENDIAN_LITTLE: u32 = 0x1026;
    pub const AVAILABLE: u32 = 0x1027;
    pub const COMPILER_AVAILABLE: u32 = 0x1028;
    pub const EXECUTION_CAPABILITIES: u32 = 0x1029;
    pub const QUEUE_PROPERTIES: u32 = 0x102A;
    pub const NAME: u32 = 0x102B;
    pub const VENDOR: u32 = 0x102C;
    pub const DRIVER_VERSION: u32 = 0x102D;
    pub const PROFILE: u32 = 0x102E;
    pub const VERSION: u32 = 0x102F;
    pub const EXTENSIONS: u32 = 0x1030;
    pub const PLATFORM: u32 = 0x1031;
    pub const DOUBLE_FP_CONFIG: u32 = 0x1032;
    pub const HALF_FP_CONFIG: u32 = 0x1033;
}

/// Context properties.
pub mod context {
    pub const REFERENCE_COUNT: u32 = 0x1080;
    pub const DEVICES: u32 = 0x1081;
    pub const PROPERTIES: u32 = 0x1082;
    pub const NUM_DEVICES: u32 = 0x1083;
    /// Key of the platform entry in a context property list.
    pub const PLATFORM: isize = 0x1084;
}

/// Program build properties, queried per device.
pub mod program_build {
    pub const STATUS: u32 = 0x1181;
    pub const OPTIONS: u32 = 0x1182;
    pub const LOG: u32 = 0x1183;
}

/// Event properties.
pub mod event {
    pub const COMMAND_QUEUE: u32 = 0x11D0;
    pub const COMMAND_TYPE: u32 = 0x11D1;
    pub const REFERENCE_COUNT: u32 = 0x11D2;
    pub const COMMAND_EXECUTION_STATUS: u32 = 0x11D3;
}
