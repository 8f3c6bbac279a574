/*!
Platforms.

A [`Platform`] is one installed implementation of the provider, ie a vendor driver. Platforms
are not reference counted, they live as long as the process.

Listing every platform and its GPUs:
```no_run
# use clhost::{result::Result, platform::Platform, types::DeviceType};
# fn main() -> Result<()> {
for platform in Platform::platforms()? {
    println!("{} ({})", platform.name()?, platform.vendor()?);
    for device in platform.devices(DeviceType::GPU)? {
        println!("  {}", device.name()?);
    }
}
# Ok(())
# }
```
*/

use crate::{
    device::Device,
    error::Error,
    provider::Provider,
    query::{properties, InfoSource},
    result::Result,
    runtime::Runtime,
};
use clhost_core::{info::platform, raw::RawDevice, raw::RawPlatform, types::DeviceType, Status};
use std::{
    fmt::{self, Debug},
    hash::{Hash, Hasher},
    sync::Arc,
};

/// A platform.
#[derive(Clone)]
pub struct Platform {
    raw: RawPlatform,
    provider: Arc<dyn Provider>,
}

impl Platform {
    /// The platforms of the global [`Runtime`].
    ///
    /// Enumerated once, later calls return the same list. See [`Runtime::platforms`].
    pub fn platforms() -> Result<&'static [Platform]> {
        Runtime::global()?.platforms()
    }
    /// Wraps a platform identifier of `provider`.
    pub fn from_raw(provider: Arc<dyn Provider>, raw: RawPlatform) -> Self {
        Self { raw, provider }
    }
    /// The raw identifier.
    pub fn as_raw(&self) -> RawPlatform {
        self.raw
    }
    /// The provider.
    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }
    /// The devices matching `device_type`.
    ///
    /// Use [`DeviceType::ALL`] for every device. Returns an empty list if none match.
    pub fn devices(&self, device_type: DeviceType) -> Result<Vec<Device>> {
        let count = match self.provider.device_ids(self.raw, device_type, None) {
            Ok(count) => count,
            Err(Status::DEVICE_NOT_FOUND) => 0,
            Err(status) => return Err(Error::status_of("device_ids")(status)),
        };
        let mut ids = vec![RawDevice::NULL; count as usize];
        if !ids.is_empty() {
            let count = self
                .provider
                .device_ids(self.raw, device_type, Some(&mut ids))
                .map_err(Error::status_of("device_ids"))?;
            ids.truncate(count as usize);
        }
        tracing::debug!("{:?}: {} {device_type:?} device(s)", self.raw, ids.len());
        Ok(ids
            .into_iter()
            .map(|raw| Device::from_raw(self.provider.clone(), raw))
            .collect())
    }
}

impl InfoSource for Platform {
    fn info(&self, param: u32, value: Option<&mut [u8]>) -> Result<usize, Status> {
        self.provider.platform_info(self.raw, param, value)
    }
}

properties! {
    /// Platform properties.
    pub static PLATFORM_PROPERTIES;
    impl Platform {
        /// "FULL_PROFILE" or "EMBEDDED_PROFILE".
        profile: String = platform::PROFILE,
        /// The version, "OpenCL <major>.<minor> <vendor specific>".
        version: String = platform::VERSION,
        name: String = platform::NAME,
        vendor: String = platform::VENDOR,
        /// Space separated extension names.
        extensions: String = platform::EXTENSIONS,
    }
}

impl PartialEq for Platform {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Platform {}

impl Hash for Platform {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl Debug for Platform {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Platform").field(&self.raw).finish()
    }
}
