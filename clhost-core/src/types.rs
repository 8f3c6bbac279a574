/*!
Flags and enumerations exchanged with the provider.
*/

use derive_more::Display;

bitflags::bitflags! {
    /// Device type, also used as a filter when listing devices.
    #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
    pub struct DeviceType: u64 {
        const DEFAULT = 1 << 0;
        const CPU = 1 << 1;
        const GPU = 1 << 2;
        const ACCELERATOR = 1 << 3;
        const CUSTOM = 1 << 4;
        /// Matches every device.
        const ALL = 0xFFFF_FFFF;
    }

    /// Memory object creation flags.
    #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
    pub struct MemFlags: u64 {
        const READ_WRITE = 1 << 0;
        const WRITE_ONLY = 1 << 1;
        const READ_ONLY = 1 << 2;
        const USE_HOST_PTR = 1 << 3;
        const ALLOC_HOST_PTR = 1 << 4;
        const COPY_HOST_PTR = 1 << 5;
    }

    /// Command queue properties.
    #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
    pub struct QueueProperties: u64 {
        const OUT_OF_ORDER_EXEC_MODE_ENABLE = 1 << 0;
        const PROFILING_ENABLE = 1 << 1;
    }

    /// Floating point capabilities.
    #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
    pub struct FpConfig: u64 {
        const DENORM = 1 << 0;
        const INF_NAN = 1 << 1;
        const ROUND_TO_NEAREST = 1 << 2;
        const ROUND_TO_ZERO = 1 << 3;
        const ROUND_TO_INF = 1 << 4;
        const FMA = 1 << 5;
        const SOFT_FLOAT = 1 << 6;
    }

    /// Execution capabilities.
    #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
    pub struct ExecCapabilities: u64 {
        const KERNEL = 1 << 0;
        const NATIVE_KERNEL = 1 << 1;
    }
}

macro_rules! raw_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident: $repr:ty {
            $($variant:ident = $value:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Hash)]
        pub enum $name {
            $(
                #[allow(missing_docs)]
                $variant,
            )+
        }

        impl $name {
            /// Decodes a raw provider value.
            pub const fn from_raw(raw: $repr) -> Option<Self> {
                match raw {
                    $(
                        $value => Some(Self::$variant),
                    )+
                    _ => None,
                }
            }
            /// The raw provider value.
            pub const fn to_raw(self) -> $repr {
                match self {
                    $(
                        Self::$variant => $value,
                    )+
                }
            }
        }
    };
}

raw_enum! {
    /// Global memory cache type.
    pub enum MemCacheType: u32 {
        None = 0,
        ReadOnly = 1,
        ReadWrite = 2,
    }
}

raw_enum! {
    /// Local memory type.
    pub enum LocalMemType: u32 {
        Local = 1,
        Global = 2,
    }
}

raw_enum! {
    /// Execution status of the command an event tracks.
    pub enum ExecutionStatus: i32 {
        Complete = 0,
        Running = 1,
        Submitted = 2,
        Queued = 3,
    }
}

raw_enum! {
    /// Build status of a program for one device.
    pub enum BuildStatus: i32 {
        Success = 0,
        None = -1,
        Error = -2,
        InProgress = -3,
    }
}

raw_enum! {
    /// Image channel order.
    pub enum ChannelOrder: u32 {
        R = 0x10B0,
        A = 0x10B1,
        Rg = 0x10B2,
        Ra = 0x10B3,
        Rgb = 0x10B4,
        Rgba = 0x10B5,
        Bgra = 0x10B6,
        Argb = 0x10B7,
        Intensity = 0x10B8,
        Luminance = 0x10B9,
    }
}

raw_enum! {
    /// Image channel data type.
    pub enum ChannelType: u32 {
        SnormInt8 = 0x10D0,
        SnormInt16 = 0x10D1,
        UnormInt8 = 0x10D2,
        UnormInt16 = 0x10D3,
        UnormShort565 = 0x10D4,
        UnormShort555 = 0x10D5,
        UnormInt101010 = 0x10D6,
        SignedInt8 = 0x10D7,
        SignedInt16 = 0x10D8,
        SignedInt32 = 0x10D9,
        UnsignedInt8 = 0x10DA,
        UnsignedInt16 = 0x10DB,
        UnsignedInt32 = 0x10DC,
        HalfFloat = 0x10DD,
        Float = 0x10DE,
    }
}

raw_enum! {
    /// Memory object type.
    pub enum MemObjectType: u32 {
        Buffer = 0x10F0,
        Image2d = 0x10F1,
        Image3d = 0x10F2,
    }
}

raw_enum! {
    /// The command an event tracks.
    pub enum CommandType: u32 {
        NdRangeKernel = 0x11F0,
        Task = 0x11F1,
        NativeKernel = 0x11F2,
        ReadBuffer = 0x11F3,
        WriteBuffer = 0x11F4,
        CopyBuffer = 0x11F5,
        ReadImage = 0x11F6,
        WriteImage = 0x11F7,
        CopyImage = 0x11F8,
        Marker = 0x11FE,
        Barrier = 0x1205,
    }
}

impl ChannelOrder {
    /// Number of channels.
    pub const fn channels(self) -> usize {
        use ChannelOrder::*;
        match self {
            R | A | Intensity | Luminance => 1,
            Rg | Ra => 2,
            Rgb => 3,
            Rgba | Bgra | Argb => 4,
        }
    }
}

impl ChannelType {
    /// Size of one channel in bytes.
    ///
    /// Packed types return the size of the whole pixel.
    pub const fn size(self) -> usize {
        use ChannelType::*;
        match self {
            SnormInt8 | UnormInt8 | SignedInt8 | UnsignedInt8 => 1,
            SnormInt16 | UnormInt16 | SignedInt16 | UnsignedInt16 | HalfFloat => 2,
            UnormShort565 | UnormShort555 => 2,
            SignedInt32 | UnsignedInt32 | Float | UnormInt101010 => 4,
        }
    }
    const fn is_packed(self) -> bool {
        use ChannelType::*;
        matches!(self, UnormShort565 | UnormShort555 | UnormInt101010)
    }
}

/// Image format.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct ImageFormat {
    pub channel_order: ChannelOrder,
    pub channel_type: ChannelType,
}

impl ImageFormat {
    pub const fn new(channel_order: ChannelOrder, channel_type: ChannelType) -> Self {
        Self {
            channel_order,
            channel_type,
        }
    }
    /// Size of one pixel in bytes.
    pub const fn pixel_size(&self) -> usize {
        if self.channel_type.is_packed() {
            self.channel_type.size()
        } else {
            self.channel_order.channels() * self.channel_type.size()
        }
    }
}

/// Image dimensions and layout.
///
/// Pitches of 0 let the provider compute them from the width, height and pixel size.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct ImageDesc {
    pub image_type: MemObjectType,
    pub width: usize,
    pub height: usize,
    pub depth: usize,
    pub row_pitch: usize,
    pub slice_pitch: usize,
}

impl ImageDesc {
    /// A 2d image.
    pub const fn image2d(width: usize, height: usize, row_pitch: usize) -> Self {
        Self {
            image_type: MemObjectType::Image2d,
            width,
            height,
            depth: 1,
            row_pitch,
            slice_pitch: 0,
        }
    }
    /// A 3d image.
    pub const fn image3d(
        width: usize,
        height: usize,
        depth: usize,
        row_pitch: usize,
        slice_pitch: usize,
    ) -> Self {
        Self {
            image_type: MemObjectType::Image3d,
            width,
            height,
            depth,
            row_pitch,
            slice_pitch,
        }
    }
    /// Size in bytes of the host data described by this image.
    pub fn host_size(&self, format: &ImageFormat) -> usize {
        let row_pitch = if self.row_pitch == 0 {
            self.width * format.pixel_size()
        } else {
            self.row_pitch
        };
        let slice_pitch = if self.slice_pitch == 0 {
            row_pitch * self.height
        } else {
            self.slice_pitch
        };
        slice_pitch * self.depth.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_enum_roundtrip_values() {
        assert_eq!(MemCacheType::from_raw(2), Some(MemCacheType::ReadWrite));
        assert_eq!(MemCacheType::from_raw(7), None);
        assert_eq!(BuildStatus::Error.to_raw(), -2);
        assert_eq!(ExecutionStatus::Complete.to_string(), "Complete");
    }

    #[test]
    fn image_host_size() {
        let format = ImageFormat::new(ChannelOrder::Rgba, ChannelType::UnormInt8);
        assert_eq!(format.pixel_size(), 4);
        assert_eq!(ImageDesc::image2d(4, 3, 0).host_size(&format), 48);
        assert_eq!(ImageDesc::image2d(4, 3, 20).host_size(&format), 60);
        assert_eq!(ImageDesc::image3d(2, 2, 2, 0, 0).host_size(&format), 32);
        let packed = ImageFormat::new(ChannelOrder::Rgb, ChannelType::UnormShort565);
        assert_eq!(packed.pixel_size(), 2);
    }

    #[test]
    fn device_type_all_contains_every_type() {
        assert!(DeviceType::ALL.contains(DeviceType::GPU | DeviceType::CPU));
        assert!(!DeviceType::GPU.intersects(DeviceType::CPU));
    }
}
