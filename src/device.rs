/*!
Devices.

A [`Device`] is a compute device of a [`Platform`](crate::platform::Platform). Devices are
listed with [`Platform::devices`](crate::platform::Platform::devices) and are not reference
counted.

Every capability is an accessor that performs one query:
```no_run
# use clhost::{result::Result, platform::Platform, types::DeviceType};
# fn main() -> Result<()> {
let device = Platform::platforms()?[0].devices(DeviceType::ALL)?[0].clone();
println!(
    "{}: {} compute units, {} bytes of global memory",
    device.name()?,
    device.max_compute_units()?,
    device.global_mem_size()?,
);
# Ok(())
# }
```
[`DEVICE_PROPERTIES`] lists the same properties by name, for generic display.
*/

use crate::{
    provider::Provider,
    query::{properties, InfoSource},
};
use clhost_core::{
    info::device,
    raw::{RawDevice, RawPlatform},
    types::{DeviceType, ExecCapabilities, FpConfig, LocalMemType, MemCacheType, QueueProperties},
    Status,
};
use std::{
    fmt::{self, Debug},
    hash::{Hash, Hasher},
    sync::Arc,
};

/// A device.
#[derive(Clone)]
pub struct Device {
    raw: RawDevice,
    provider: Arc<dyn Provider>,
}

impl Device {
    /// Wraps a device identifier of `provider`.
    pub fn from_raw(provider: Arc<dyn Provider>, raw: RawDevice) -> Self {
        Self { raw, provider }
    }
    /// The raw identifier.
    pub fn as_raw(&self) -> RawDevice {
        self.raw
    }
    /// The provider.
    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }
}

impl InfoSource for Device {
    fn info(&self, param: u32, value: Option<&mut [u8]>) -> Result<usize, Status> {
        self.provider.device_info(self.raw, param, value)
    }
}

properties! {
    /// Device properties, in id order.
    pub static DEVICE_PROPERTIES;
    impl Device {
        device_type: DeviceType = device::TYPE,
        /// A vendor unique id, ie the PCIe vendor id.
        vendor_id: u32 = device::VENDOR_ID,
        /// Number of parallel compute cores, at least 1.
        max_compute_units: u32 = device::MAX_COMPUTE_UNITS,
        /// At least 3.
        max_work_item_dimensions: u32 = device::MAX_WORK_ITEM_DIMENSIONS,
        /// Maximum number of work items in a work group.
        max_work_group_size: usize = device::MAX_WORK_GROUP_SIZE,
        /// Maximum number of work items per dimension of a work group.
        max_work_item_sizes: Vec<usize> = device::MAX_WORK_ITEM_SIZES,
        preferred_vector_width_char: u32 = device::PREFERRED_VECTOR_WIDTH_CHAR,
        preferred_vector_width_short: u32 = device::PREFERRED_VECTOR_WIDTH_SHORT,
        preferred_vector_width_int: u32 = device::PREFERRED_VECTOR_WIDTH_INT,
        preferred_vector_width_long: u32 = device::PREFERRED_VECTOR_WIDTH_LONG,
        preferred_vector_width_float: u32 = device::PREFERRED_VECTOR_WIDTH_FLOAT,
        /// 0 if doubles are not supported.
        preferred_vector_width_double: u32 = device::PREFERRED_VECTOR_WIDTH_DOUBLE,
        /// In MHz.
        max_clock_frequency: u32 = device::MAX_CLOCK_FREQUENCY,
        /// 32 or 64.
        address_bits: u32 = device::ADDRESS_BITS,
        max_read_image_args: u32 = device::MAX_READ_IMAGE_ARGS,
        max_write_image_args: u32 = device::MAX_WRITE_IMAGE_ARGS,
        /// Maximum size of a single allocation in bytes.
        max_mem_alloc_size: u64 = device::MAX_MEM_ALLOC_SIZE,
        image2d_max_width: usize = device::IMAGE2D_MAX_WIDTH,
        image2d_max_height: usize = device::IMAGE2D_MAX_HEIGHT,
        image3d_max_width: usize = device::IMAGE3D_MAX_WIDTH,
        image3d_max_height: usize = device::IMAGE3D_MAX_HEIGHT,
        image3d_max_depth: usize = device::IMAGE3D_MAX_DEPTH,
        image_support: bool = device::IMAGE_SUPPORT,
        /// Maximum size in bytes of all kernel arguments.
        max_parameter_size: usize = device::MAX_PARAMETER_SIZE,
        max_samplers: u32 = device::MAX_SAMPLERS,
        /// In bits.
        mem_base_addr_align: u32 = device::MEM_BASE_ADDR_ALIGN,
        /// In bytes.
        min_data_type_align_size: u32 = device::MIN_DATA_TYPE_ALIGN_SIZE,
        single_fp_config: FpConfig = device::SINGLE_FP_CONFIG,
        global_mem_cache_type: MemCacheType = device::GLOBAL_MEM_CACHE_TYPE,
        global_mem_cacheline_size: u32 = device::GLOBAL_MEM_CACHELINE_SIZE,
        global_mem_cache_size: u64 = device::GLOBAL_MEM_CACHE_SIZE,
        /// In bytes.
        global_mem_size: u64 = device::GLOBAL_MEM_SIZE,
        max_constant_buffer_size: u64 = device::MAX_CONSTANT_BUFFER_SIZE,
        max_constant_args: u32 = device::MAX_CONSTANT_ARGS,
        local_mem_type: LocalMemType = device::LOCAL_MEM_TYPE,
        /// In bytes.
        local_mem_size: u64 = device::LOCAL_MEM_SIZE,
        error_correction_support: bool = device::ERROR_CORRECTION_SUPPORT,
        /// In nanoseconds.
        profiling_timer_resolution: usize = device::PROFILING_TIMER_RESOLUTION,
        endian_little: bool = device::ENDIAN_LITTLE,
        available: bool = device::AVAILABLE,
        /// False for devices that only accept binaries.
        compiler_available: bool = device::COMPILER_AVAILABLE,
        execution_capabilities: ExecCapabilities = device::EXECUTION_CAPABILITIES,
        /// Supported command queue properties.
        queue_properties: QueueProperties = device::QUEUE_PROPERTIES,
        name: String = device::NAME,
        vendor: String = device::VENDOR,
        driver_version: String = device::DRIVER_VERSION,
        profile: String = device::PROFILE,
        version: String = device::VERSION,
        /// Space separated extension names.
        extensions: String = device::EXTENSIONS,
        /// The platform the device belongs to.
        platform: RawPlatform = device::PLATFORM,
        /// Empty if doubles are not supported.
        double_fp_config: FpConfig = device::DOUBLE_FP_CONFIG,
        /// Empty if halfs are not supported.
        half_fp_config: FpConfig = device::HALF_FP_CONFIG,
    }
}

impl PartialEq for Device {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Device {}

impl Hash for Device {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Device").field(&self.raw).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        platform::Platform,
        provider::mock::{MockDevice, MockPlatform, MockProvider},
    };
    use std::collections::HashSet;

    #[test]
    fn device_properties_table() {
        assert_eq!(DEVICE_PROPERTIES.len(), 52);
        let ids: HashSet<u32> = DEVICE_PROPERTIES.iter().map(|x| x.id).collect();
        assert_eq!(ids.len(), DEVICE_PROPERTIES.len());
        assert!(DEVICE_PROPERTIES.windows(2).all(|x| x[0].id < x[1].id));
    }

    #[test]
    fn device_accessors() {
        let mock = Arc::new(MockProvider::new([MockPlatform::new("p").with_device(
            MockDevice::new("Mock CPU", DeviceType::CPU)
                .with_property(device::GLOBAL_MEM_SIZE, 4u64 << 30)
                .with_string(device::EXTENSIONS, "cl_khr_fp64 cl_khr_int64_base_atomics"),
        )]));
        let raw_platform = mock.platforms()[0];
        let platform = Platform::from_raw(mock.clone(), raw_platform);
        let device = platform.devices(DeviceType::CPU).unwrap()[0].clone();
        assert_eq!(device.name().unwrap(), "Mock CPU");
        assert_eq!(device.device_type().unwrap(), DeviceType::CPU);
        assert_eq!(device.global_mem_size().unwrap(), 4 << 30);
        assert_eq!(device.max_work_group_size().unwrap(), 1024);
        assert_eq!(device.local_mem_type().unwrap(), LocalMemType::Local);
        assert_eq!(device.platform().unwrap(), raw_platform);
        assert!(device
            .extensions()
            .unwrap()
            .split(' ')
            .any(|x| x == "cl_khr_fp64"));
        assert!(device.double_fp_config().unwrap().is_empty());
    }
}
