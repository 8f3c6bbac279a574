/*!
Memory objects.

[`Buffer`]s are untyped device allocations, [`Image2d`] and [`Image3d`] are formatted images.
All of them wrap a [`Handle<RawMem>`](Handle), cloning one shares the allocation.

Data moves between host and device through a [`Queue`](crate::queue::Queue), or is copied in at
creation with [`Buffer::from_slice`] and the `with_data` constructors.
*/

use crate::{context::Context, error::Error, handle::Handle, result::Result};
use bytemuck::Pod;
use clhost_core::{
    raw::RawMem,
    types::{ImageDesc, ImageFormat, MemFlags},
    Status,
};
use derive_more::Deref;
use std::{ffi::c_void, ptr::null_mut};

/// A buffer.
#[derive(Clone, Debug, Deref)]
pub struct Buffer {
    #[deref]
    handle: Handle<RawMem>,
    size: usize,
    flags: MemFlags,
}

impl Buffer {
    /// Allocates `size` bytes.
    ///
    /// `flags` must not request host memory, see [`from_slice`](Self::from_slice).
    ///
    /// **errors**
    /// - [`CreationFailed`](Error::CreationFailed), ie `size` is 0.
    pub fn new(context: &Context, flags: MemFlags, size: usize) -> Result<Self> {
        // Safety: no host pointer.
        unsafe { Self::create(context, flags, size, null_mut()) }
    }
    /// Allocates a buffer initialized with `data`.
    ///
    /// [`MemFlags::COPY_HOST_PTR`] is added to `flags`, [`MemFlags::USE_HOST_PTR`] is removed.
    pub fn from_slice<T: Pod>(context: &Context, flags: MemFlags, data: &[T]) -> Result<Self> {
        let flags = (flags - MemFlags::USE_HOST_PTR) | MemFlags::COPY_HOST_PTR;
        let bytes: &[u8] = bytemuck::cast_slice(data);
        // Safety: the data is copied during creation.
        unsafe { Self::create(context, flags, bytes.len(), bytes.as_ptr() as *mut c_void) }
    }
    unsafe fn create(
        context: &Context,
        flags: MemFlags,
        size: usize,
        host_ptr: *mut c_void,
    ) -> Result<Self> {
        let provider = context.provider().clone();
        // Safety: upheld by the caller.
        let raw = unsafe { provider.create_buffer(context.as_raw(), flags, size, host_ptr) }
            .map_err(Error::creation("buffer"))?;
        tracing::debug!("created {raw:?} of {size} bytes");
        Ok(Self {
            // Safety: `raw` was just created, its reference is ours.
            handle: unsafe { Handle::from_raw(provider, raw) },
            size,
            flags,
        })
    }
    /// Size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }
    /// The creation flags.
    pub fn flags(&self) -> MemFlags {
        self.flags
    }
}

/// A 2d image.
#[derive(Clone, Debug, Deref)]
pub struct Image2d {
    #[deref]
    handle: Handle<RawMem>,
    format: ImageFormat,
    desc: ImageDesc,
}

impl Image2d {
    /// Allocates a `width` x `height` image.
    ///
    /// **errors**
    /// - [`CreationFailed`](Error::CreationFailed), ie the format is not supported or a
    ///   dimension is 0.
    pub fn new(
        context: &Context,
        flags: MemFlags,
        format: ImageFormat,
        width: usize,
        height: usize,
    ) -> Result<Self> {
        let desc = ImageDesc::image2d(width, height, 0);
        let handle = create_image(context, flags, format, desc, None)?;
        Ok(Self {
            handle,
            format,
            desc,
        })
    }
    /// Allocates an image initialized with `data`, rows are `row_pitch` bytes apart.
    ///
    /// A `row_pitch` of 0 means tightly packed rows.
    pub fn with_data<T: Pod>(
        context: &Context,
        flags: MemFlags,
        format: ImageFormat,
        width: usize,
        height: usize,
        row_pitch: usize,
        data: &[T],
    ) -> Result<Self> {
        let desc = ImageDesc::image2d(width, height, row_pitch);
        let handle = create_image(context, flags, format, desc, Some(bytemuck::cast_slice(data)))?;
        Ok(Self {
            handle,
            format,
            desc,
        })
    }
    /// The format.
    pub fn format(&self) -> ImageFormat {
        self.format
    }
    pub fn width(&self) -> usize {
        self.desc.width
    }
    pub fn height(&self) -> usize {
        self.desc.height
    }
}

/// A 3d image.
#[derive(Clone, Debug, Deref)]
pub struct Image3d {
    #[deref]
    handle: Handle<RawMem>,
    format: ImageFormat,
    desc: ImageDesc,
}

impl Image3d {
    /// Allocates a `width` x `height` x `depth` image.
    ///
    /// **errors**
    /// - [`CreationFailed`](Error::CreationFailed), ie the format is not supported, a
    ///   dimension is 0 or `depth` is 1.
    pub fn new(
        context: &Context,
        flags: MemFlags,
        format: ImageFormat,
        width: usize,
        height: usize,
        depth: usize,
    ) -> Result<Self> {
        let desc = ImageDesc::image3d(width, height, depth, 0, 0);
        let handle = create_image(context, flags, format, desc, None)?;
        Ok(Self {
            handle,
            format,
            desc,
        })
    }
    /// Allocates an image initialized with `data`.
    ///
    /// Rows are `row_pitch` bytes apart and slices `slice_pitch` bytes apart, 0 means tightly
    /// packed.
    #[allow(clippy::too_many_arguments)]
    pub fn with_data<T: Pod>(
        context: &Context,
        flags: MemFlags,
        format: ImageFormat,
        width: usize,
        height: usize,
        depth: usize,
        row_pitch: usize,
        slice_pitch: usize,
        data: &[T],
    ) -> Result<Self> {
        let desc = ImageDesc::image3d(width, height, depth, row_pitch, slice_pitch);
        let handle = create_image(context, flags, format, desc, Some(bytemuck::cast_slice(data)))?;
        Ok(Self {
            handle,
            format,
            desc,
        })
    }
    /// The format.
    pub fn format(&self) -> ImageFormat {
        self.format
    }
    pub fn width(&self) -> usize {
        self.desc.width
    }
    pub fn height(&self) -> usize {
        self.desc.height
    }
    pub fn depth(&self) -> usize {
        self.desc.depth
    }
}

fn create_image(
    context: &Context,
    flags: MemFlags,
    format: ImageFormat,
    desc: ImageDesc,
    data: Option<&[u8]>,
) -> Result<Handle<RawMem>> {
    let (flags, host_ptr) = match data {
        Some(data) => {
            if data.len() < desc.host_size(&format) {
                return Err(Error::CreationFailed {
                    resource: "image",
                    status: Status::INVALID_HOST_PTR,
                });
            }
            let flags = (flags - MemFlags::USE_HOST_PTR) | MemFlags::COPY_HOST_PTR;
            (flags, data.as_ptr() as *mut c_void)
        }
        None => (flags, null_mut()),
    };
    let provider = context.provider().clone();
    // Safety: `host_ptr` is null or holds `host_size` bytes, which are copied during creation.
    let raw = unsafe { provider.create_image(context.as_raw(), flags, &format, &desc, host_ptr) }
        .map_err(Error::creation("image"))?;
    tracing::debug!(
        "created {raw:?}, {}x{}x{} {format:?}",
        desc.width,
        desc.height,
        desc.depth
    );
    // Safety: `raw` was just created, its reference is ours.
    Ok(unsafe { Handle::from_raw(provider, raw) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{platform::Platform, provider::mock::MockProvider};
    use clhost_core::types::{ChannelOrder, ChannelType, DeviceType};
    use std::sync::Arc;

    fn context() -> (Arc<MockProvider>, Context) {
        let mock = Arc::new(MockProvider::default());
        let platform = Platform::from_raw(mock.clone(), mock.platforms()[0]);
        let devices = platform.devices(DeviceType::ALL).unwrap();
        let context = Context::new(&platform, &devices).unwrap();
        (mock, context)
    }

    #[test]
    fn buffer_from_slice() {
        let (mock, context) = context();
        let buffer = Buffer::from_slice(&context, MemFlags::READ_ONLY, &[1u32, 2, 3]).unwrap();
        assert_eq!(buffer.size(), 12);
        assert!(buffer.flags().contains(MemFlags::COPY_HOST_PTR));
        let data = mock.mem_data(buffer.as_raw()).unwrap();
        assert_eq!(bytemuck::cast_slice::<u8, u32>(&data), &[1, 2, 3]);
        let copy = buffer.clone();
        let raw = buffer.as_raw();
        drop(buffer);
        assert!(mock.is_live(raw));
        drop(copy);
        assert!(!mock.is_live(raw));
    }

    #[test]
    fn buffer_zero_size() {
        let (_, context) = context();
        assert_eq!(
            Buffer::new(&context, MemFlags::READ_WRITE, 0).unwrap_err(),
            Error::CreationFailed {
                resource: "buffer",
                status: Status::INVALID_BUFFER_SIZE,
            }
        );
    }

    #[test]
    fn image2d_with_data() {
        let (mock, context) = context();
        let format = ImageFormat::new(ChannelOrder::Rgba, ChannelType::UnormInt8);
        let pixels = [0xFFu8; 2 * 2 * 4];
        let image =
            Image2d::with_data(&context, MemFlags::READ_ONLY, format, 2, 2, 0, &pixels).unwrap();
        assert_eq!((image.width(), image.height()), (2, 2));
        assert_eq!(mock.mem_data(image.as_raw()).unwrap(), pixels);
        assert!(matches!(
            Image2d::with_data(&context, MemFlags::READ_ONLY, format, 4, 4, 0, &pixels),
            Err(Error::CreationFailed { .. })
        ));
    }

    #[test]
    fn image3d_depth() {
        let (_, context) = context();
        let format = ImageFormat::new(ChannelOrder::R, ChannelType::Float);
        let image = Image3d::new(&context, MemFlags::READ_WRITE, format, 4, 4, 2).unwrap();
        assert_eq!(image.depth(), 2);
        assert_eq!(
            Image3d::new(&context, MemFlags::READ_WRITE, format, 4, 4, 1)
                .unwrap_err()
                .status(),
            Some(Status::INVALID_IMAGE_FORMAT_DESCRIPTOR)
        );
    }
}
