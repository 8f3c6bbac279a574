/*!
Capability queries.

Properties of platforms, devices, contexts, program builds and events are read through one
protocol. The provider reports the size of a value before committing to it, so each property is
decoded according to its [`Shape`]:

- **Scalar**: one call with a buffer the width of the value.
- **Bool**: a 32 bit scalar, true is 1.
- **String**: one call to get the byte length, then one call with a buffer of exactly that
  length. The trailing terminator is stripped.
- **Words**: one call to get the byte length, then one call with a buffer of
  `length / size_of::<usize>()` words.

Any [`QueryValue`] can be read from any [`InfoSource`] with [`query`]. The property tables
([`DEVICE_PROPERTIES`](crate::device::DEVICE_PROPERTIES) and friends) describe each property
by name, id and shape, so they can also be read generically with [`Property::read`].
*/

use crate::{error::Error, result::Result};
use bytemuck::{cast_slice_mut, Pod};
use clhost_core::{
    raw::{RawDevice, RawPlatform, RawQueue},
    types::{
        BuildStatus, CommandType, DeviceType, ExecCapabilities, ExecutionStatus, FpConfig,
        LocalMemType, MemCacheType, QueueProperties,
    },
    Status,
};
use serde::Serialize;
use std::{
    fmt::{self, Display},
    mem::size_of,
};

/// A subject of property queries.
pub trait InfoSource {
    /// Queries property `param`.
    ///
    /// With `None` returns the size of the value in bytes. Otherwise fills `value` and returns the
    /// number of bytes written.
    fn info(&self, param: u32, value: Option<&mut [u8]>) -> Result<usize, Status>;
}

impl<T: InfoSource + ?Sized> InfoSource for &T {
    fn info(&self, param: u32, value: Option<&mut [u8]>) -> Result<usize, Status> {
        (**self).info(param, value)
    }
}

/// How the bytes of a property are decoded.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
pub enum Shape {
    /// A fixed size value.
    Scalar {
        /// Width in bytes.
        size: usize,
    },
    /// A 32 bit boolean.
    Bool,
    /// Text of unknown length.
    String,
    /// An array of machine words of unknown length.
    Words,
}

/// A value that can be queried.
pub trait QueryValue: Sized {
    /// The shape of the encoded value.
    const SHAPE: Shape;
    /// Queries `param` of `source`.
    fn query<S: InfoSource + ?Sized>(source: &S, param: u32) -> Result<Self>;
}

/// Queries `param` of `source` as a `T`.
pub fn query<T: QueryValue, S: InfoSource + ?Sized>(source: &S, param: u32) -> Result<T> {
    T::query(source, param)
}

fn query_failed(param: u32) -> impl FnOnce(Status) -> Error {
    move |status| Error::QueryFailed { param, status }
}

fn query_size<S: InfoSource + ?Sized>(source: &S, param: u32) -> Result<usize> {
    source.info(param, None).map_err(query_failed(param))
}

fn query_fill<S: InfoSource + ?Sized>(source: &S, param: u32, bytes: &mut [u8]) -> Result<()> {
    source
        .info(param, Some(bytes))
        .map_err(query_failed(param))?;
    Ok(())
}

/// Queries a fixed size value in a single call.
pub fn query_pod<T: Pod, S: InfoSource + ?Sized>(source: &S, param: u32) -> Result<T> {
    let mut value = T::zeroed();
    query_fill(source, param, bytemuck::bytes_of_mut(&mut value))?;
    Ok(value)
}

/// Queries the raw bytes of a value of unknown length.
pub fn query_bytes<S: InfoSource + ?Sized>(source: &S, param: u32) -> Result<Vec<u8>> {
    let size = query_size(source, param)?;
    let mut bytes = vec![0u8; size];
    if size > 0 {
        query_fill(source, param, &mut bytes)?;
    }
    Ok(bytes)
}

/// Queries a string, stripping trailing terminators.
///
/// Invalid UTF-8 is replaced, see [`String::from_utf8_lossy`].
pub fn query_string<S: InfoSource + ?Sized>(source: &S, param: u32) -> Result<String> {
    let bytes = query_bytes(source, param)?;
    let len = bytes
        .iter()
        .rposition(|x| *x != 0)
        .map_or(0, |last| last + 1);
    Ok(String::from_utf8_lossy(&bytes[..len]).into_owned())
}

/// Queries an array of machine words.
///
/// **errors**
/// - [`QuerySize`](Error::QuerySize) if the length is not a whole number of words.
pub fn query_words<S: InfoSource + ?Sized>(source: &S, param: u32) -> Result<Vec<usize>> {
    let size = query_size(source, param)?;
    if size % size_of::<usize>() != 0 {
        return Err(Error::QuerySize { param, size });
    }
    let mut words = vec![0usize; size / size_of::<usize>()];
    if !words.is_empty() {
        query_fill(source, param, cast_slice_mut(&mut words))?;
    }
    Ok(words)
}

macro_rules! impl_query_pod {
    ($($t:ty),+) => {
        $(
            impl QueryValue for $t {
                const SHAPE: Shape = Shape::Scalar { size: size_of::<$t>() };
                fn query<S: InfoSource + ?Sized>(source: &S, param: u32) -> Result<Self> {
                    query_pod(source, param)
                }
            }
        )+
    };
}

impl_query_pod!(u32, i32, u64, usize, RawPlatform, RawDevice, RawQueue);

impl QueryValue for bool {
    const SHAPE: Shape = Shape::Bool;
    fn query<S: InfoSource + ?Sized>(source: &S, param: u32) -> Result<Self> {
        Ok(query_pod::<u32, _>(source, param)? == 1)
    }
}

impl QueryValue for String {
    const SHAPE: Shape = Shape::String;
    fn query<S: InfoSource + ?Sized>(source: &S, param: u32) -> Result<Self> {
        query_string(source, param)
    }
}

impl QueryValue for Vec<usize> {
    const SHAPE: Shape = Shape::Words;
    fn query<S: InfoSource + ?Sized>(source: &S, param: u32) -> Result<Self> {
        query_words(source, param)
    }
}

impl QueryValue for Vec<RawDevice> {
    const SHAPE: Shape = Shape::Words;
    fn query<S: InfoSource + ?Sized>(source: &S, param: u32) -> Result<Self> {
        let words = query_words(source, param)?;
        Ok(words.into_iter().map(RawDevice::from_addr).collect())
    }
}

macro_rules! impl_query_flags {
    ($($t:ty),+) => {
        $(
            impl QueryValue for $t {
                const SHAPE: Shape = Shape::Scalar { size: size_of::<u64>() };
                fn query<S: InfoSource + ?Sized>(source: &S, param: u32) -> Result<Self> {
                    Ok(Self::from_bits_retain(query_pod(source, param)?))
                }
            }
        )+
    };
}

impl_query_flags!(DeviceType, FpConfig, ExecCapabilities, QueueProperties);

macro_rules! impl_query_enum {
    ($($t:ty: $repr:ty),+) => {
        $(
            impl QueryValue for $t {
                const SHAPE: Shape = Shape::Scalar { size: size_of::<$repr>() };
                fn query<S: InfoSource + ?Sized>(source: &S, param: u32) -> Result<Self> {
                    let raw = query_pod::<$repr, _>(source, param)?;
                    Self::from_raw(raw).ok_or(Error::QueryFailed {
                        param,
                        status: Status::INVALID_VALUE,
                    })
                }
            }
        )+
    };
}

impl_query_enum!(
    MemCacheType: u32,
    LocalMemType: u32,
    CommandType: u32,
    ExecutionStatus: i32,
    BuildStatus: i32
);

/// A named property of a table.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct Property {
    /// Name of the accessor.
    pub name: &'static str,
    /// Property id.
    pub id: u32,
    /// Encoding.
    pub shape: Shape,
}

impl Property {
    /// Reads the property from `source`, decoded by shape.
    pub fn read<S: InfoSource + ?Sized>(&self, source: &S) -> Result<PropertyValue> {
        let value = match self.shape {
            Shape::Scalar { size: 4 } => {
                PropertyValue::Scalar(query_pod::<u32, _>(source, self.id)?.into())
            }
            Shape::Scalar { size: 8 } => PropertyValue::Scalar(query_pod(source, self.id)?),
            Shape::Scalar { size } => {
                let mut bytes = vec![0u8; size];
                query_fill(source, self.id, &mut bytes)?;
                let mut word = [0u8; 8];
                let n = size.min(8);
                word[..n].copy_from_slice(&bytes[..n]);
                PropertyValue::Scalar(u64::from_ne_bytes(word))
            }
            Shape::Bool => PropertyValue::Bool(bool::query(source, self.id)?),
            Shape::String => PropertyValue::String(query_string(source, self.id)?),
            Shape::Words => PropertyValue::Words(query_words(source, self.id)?),
        };
        Ok(value)
    }
}

/// A decoded property value.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Scalar(u64),
    Bool(bool),
    String(String),
    Words(Vec<usize>),
}

impl Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Scalar(x) => write!(f, "{x}"),
            Self::Bool(x) => write!(f, "{x}"),
            Self::String(x) => f.write_str(x),
            Self::Words(words) => f.debug_list().entries(words.iter()).finish(),
        }
    }
}

/// Reads every property of `table` from `source`.
pub fn read_all<'a, S: InfoSource + ?Sized>(
    table: &'a [Property],
    source: &S,
) -> Result<Vec<(&'a Property, PropertyValue)>> {
    table
        .iter()
        .map(|property| Ok((property, property.read(source)?)))
        .collect()
}

/// Generates a property table and one accessor per property.
macro_rules! properties {
    (
        $(#[$table_meta:meta])*
        $vis:vis static $table:ident;
        impl $subject:ty {
            $(
                $(#[$meta:meta])*
                $name:ident: $t:ty = $id:path,
            )+
        }
    ) => {
        $(#[$table_meta])*
        $vis static $table: &[$crate::query::Property] = &[
            $(
                $crate::query::Property {
                    name: stringify!($name),
                    id: $id,
                    shape: <$t as $crate::query::QueryValue>::SHAPE,
                },
            )+
        ];

        impl $subject {
            $(
                $(#[$meta])*
                pub fn $name(&self) -> $crate::result::Result<$t> {
                    $crate::query::query::<$t, _>(self, $id)
                }
            )+
        }
    };
}
pub(crate) use properties;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        device::Device,
        platform::Platform,
        provider::mock::{MockCall, MockDevice, MockPlatform, MockProvider},
        runtime::Runtime,
    };
    use clhost_core::info;
    use std::sync::Arc;

    fn device_with(mock: MockDevice) -> (Arc<MockProvider>, Device) {
        let provider = Arc::new(MockProvider::new([MockPlatform::new("p").with_device(mock)]));
        let runtime = Runtime::new(provider.clone());
        let platform = runtime.platforms().unwrap()[0].clone();
        let device = platform.devices(DeviceType::ALL).unwrap()[0].clone();
        provider.clear_calls();
        (provider, device)
    }

    #[test]
    fn query_string_two_phase() {
        let (mock, device) = device_with(MockDevice::new("Mock GPU", DeviceType::GPU));
        assert_eq!(device.name().unwrap(), "Mock GPU");
        let raw = device.as_raw();
        assert_eq!(
            mock.calls(),
            vec![
                MockCall::DeviceInfo {
                    device: raw,
                    param: info::device::NAME,
                    capacity: None,
                },
                MockCall::DeviceInfo {
                    device: raw,
                    param: info::device::NAME,
                    capacity: Some("Mock GPU".len() + 1),
                },
            ]
        );
    }

    #[test]
    fn query_words_partial_word() {
        let (mock, device) = device_with(
            MockDevice::new("d", DeviceType::CPU)
                .with_property(info::device::MAX_WORK_ITEM_SIZES, [1u8; 13]),
        );
        assert_eq!(
            device.max_work_item_sizes().unwrap_err(),
            Error::QuerySize {
                param: info::device::MAX_WORK_ITEM_SIZES,
                size: 13,
            }
        );
        assert_eq!(mock.calls().len(), 1);
    }

    #[test]
    fn query_words_two_phase() {
        let (mock, device) = device_with(
            MockDevice::new("d", DeviceType::CPU)
                .with_words(info::device::MAX_WORK_ITEM_SIZES, &[64, 32]),
        );
        assert_eq!(device.max_work_item_sizes().unwrap(), vec![64, 32]);
        let capacities: Vec<_> = mock
            .calls()
            .into_iter()
            .map(|call| match call {
                MockCall::DeviceInfo { capacity, .. } => capacity,
                call => panic!("unexpected {call:?}"),
            })
            .collect();
        assert_eq!(capacities, vec![None, Some(2 * size_of::<usize>())]);
    }

    #[test]
    fn query_empty_words_single_call() {
        let (mock, device) = device_with(
            MockDevice::new("d", DeviceType::CPU).with_words(info::device::MAX_WORK_ITEM_SIZES, &[]),
        );
        assert!(device.max_work_item_sizes().unwrap().is_empty());
        assert_eq!(mock.calls().len(), 1);
    }

    #[test]
    fn query_scalar_single_call() {
        let (mock, device) = device_with(
            MockDevice::new("d", DeviceType::GPU)
                .with_property(info::device::MAX_COMPUTE_UNITS, 12u32)
                .with_bool(info::device::IMAGE_SUPPORT, false),
        );
        assert_eq!(device.max_compute_units().unwrap(), 12);
        assert!(!device.image_support().unwrap());
        assert!(device.available().unwrap());
        assert_eq!(
            mock.calls()[0],
            MockCall::DeviceInfo {
                device: device.as_raw(),
                param: info::device::MAX_COMPUTE_UNITS,
                capacity: Some(4),
            }
        );
    }

    #[test]
    fn query_missing_property_fails() {
        let (_, device) = device_with(
            MockDevice::new("d", DeviceType::GPU).without_property(info::device::EXTENSIONS),
        );
        let error = device.extensions().unwrap_err();
        assert_eq!(
            error,
            Error::QueryFailed {
                param: info::device::EXTENSIONS,
                status: Status::INVALID_VALUE,
            }
        );
    }

    #[test]
    fn query_unknown_enum_value_fails() {
        let (_, device) = device_with(
            MockDevice::new("d", DeviceType::GPU)
                .with_property(info::device::GLOBAL_MEM_CACHE_TYPE, 9u32),
        );
        assert!(matches!(
            device.global_mem_cache_type(),
            Err(Error::QueryFailed { .. })
        ));
    }

    #[test]
    fn query_string_strips_terminators() {
        struct Padded;
        impl InfoSource for Padded {
            fn info(&self, _: u32, value: Option<&mut [u8]>) -> Result<usize, Status> {
                let bytes = b"abc\0\0";
                if let Some(value) = value {
                    value.copy_from_slice(bytes);
                }
                Ok(bytes.len())
            }
        }
        assert_eq!(query_string(&Padded, 0).unwrap(), "abc");
    }

    #[test]
    fn property_read_by_shape() {
        let (_, device) = device_with(MockDevice::new("dev", DeviceType::GPU));
        let values = read_all(crate::device::DEVICE_PROPERTIES, &device).unwrap();
        let value = |name: &str| {
            values
                .iter()
                .find(|(property, _)| property.name == name)
                .map(|(_, value)| value.clone())
                .unwrap()
        };
        assert_eq!(value("name"), PropertyValue::String("dev".into()));
        assert_eq!(value("endian_little"), PropertyValue::Bool(true));
        assert_eq!(value("max_compute_units"), PropertyValue::Scalar(4));
        assert_eq!(
            value("max_work_item_sizes"),
            PropertyValue::Words(vec![1024, 1024, 64])
        );
        assert_eq!(value("max_work_item_sizes").to_string(), "[1024, 1024, 64]");
        let platform = Platform::from_raw(device.provider().clone(), device.platform().unwrap());
        let values = read_all(crate::platform::PLATFORM_PROPERTIES, &platform).unwrap();
        assert_eq!(values[2].1, PropertyValue::String("p".into()));
    }
}
