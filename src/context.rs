/*!
Contexts.

A [`Context`] binds devices of one platform together. Memory objects, programs and queues are
created for a context.
*/

use crate::{
    device::Device,
    error::Error,
    handle::Handle,
    platform::Platform,
    query::{properties, InfoSource},
    result::Result,
};
use clhost_core::{
    info::context,
    raw::{RawContext, RawDevice},
    Status,
};
use derive_more::Deref;

/// A context.
///
/// Dereferences to its [`Handle`], cloning retains it.
#[derive(Clone, Debug, Deref)]
pub struct Context {
    #[deref]
    handle: Handle<RawContext>,
    platform: Platform,
}

impl Context {
    /// Creates a context for `devices` of `platform`.
    ///
    /// **errors**
    /// - [`CreationFailed`](Error::CreationFailed), ie `devices` is empty or contains a device
    ///   of another platform.
    pub fn new(platform: &Platform, devices: &[Device]) -> Result<Self> {
        let provider = platform.provider().clone();
        let raw_devices: Vec<RawDevice> = devices.iter().map(Device::as_raw).collect();
        let raw = provider
            .create_context(platform.as_raw(), &raw_devices)
            .map_err(Error::creation("context"))?;
        tracing::debug!("created {raw:?} with {} device(s)", raw_devices.len());
        Ok(Self {
            // Safety: `raw` was just created, its reference is ours.
            handle: unsafe { Handle::from_raw(provider, raw) },
            platform: platform.clone(),
        })
    }
    /// The platform.
    pub fn platform(&self) -> &Platform {
        &self.platform
    }
    /// The devices of the context.
    pub fn devices(&self) -> Result<Vec<Device>> {
        Ok(self
            .device_ids()?
            .into_iter()
            .map(|raw| Device::from_raw(self.provider().clone(), raw))
            .collect())
    }
}

impl InfoSource for Context {
    fn info(&self, param: u32, value: Option<&mut [u8]>) -> Result<usize, Status> {
        self.provider().context_info(self.as_raw(), param, value)
    }
}

properties! {
    /// Context properties.
    pub static CONTEXT_PROPERTIES;
    impl Context {
        /// The reference count reported by the provider.
        ///
        /// Stale as soon as it is returned, use for diagnostics only.
        reference_count: u32 = context::REFERENCE_COUNT,
        /// The raw identifiers of [`devices`](Context::devices).
        device_ids: Vec<RawDevice> = context::DEVICES,
        /// The creation property list, pairs of key and value terminated by 0.
        creation_properties: Vec<usize> = context::PROPERTIES,
        num_devices: u32 = context::NUM_DEVICES,
    }
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl Eq for Context {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::{MockDevice, MockPlatform, MockProvider};
    use clhost_core::types::DeviceType;
    use std::sync::Arc;

    fn platform(mock: &Arc<MockProvider>) -> Platform {
        Platform::from_raw(mock.clone(), mock.platforms()[0])
    }

    #[test]
    fn context_reference_count() {
        let mock = Arc::new(MockProvider::default());
        let platform = platform(&mock);
        let devices = platform.devices(DeviceType::ALL).unwrap();
        let context = Context::new(&platform, &devices).unwrap();
        assert_eq!(context.reference_count().unwrap(), 1);
        let copy = context.clone();
        assert_eq!(copy, context);
        assert_eq!(context.reference_count().unwrap(), 2);
        drop(copy);
        assert_eq!(context.reference_count().unwrap(), 1);
        assert_eq!(context.num_devices().unwrap(), 1);
        assert_eq!(context.devices().unwrap(), devices);
        assert_eq!(
            context.creation_properties().unwrap(),
            vec![
                context::PLATFORM as usize,
                platform.as_raw().addr(),
                0
            ]
        );
        let raw = context.as_raw();
        drop(context);
        assert!(!mock.is_live(raw));
    }

    #[test]
    fn context_creation_failed() {
        let mock = Arc::new(MockProvider::new([
            MockPlatform::default(),
            MockPlatform::new("other").with_device(MockDevice::new("cpu", DeviceType::CPU)),
        ]));
        let platform = platform(&mock);
        assert_eq!(
            Context::new(&platform, &[]).unwrap_err(),
            Error::CreationFailed {
                resource: "context",
                status: Status::INVALID_VALUE,
            }
        );
        let other = Platform::from_raw(mock.clone(), mock.platforms()[1]);
        let foreign = other.devices(DeviceType::ALL).unwrap();
        assert_eq!(
            Context::new(&platform, &foreign).unwrap_err().status(),
            Some(Status::INVALID_DEVICE)
        );
        assert_eq!(mock.live_count(), 0);
    }
}
