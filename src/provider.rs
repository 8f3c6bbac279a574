/*!
The provider boundary.

A [`Provider`] is the external compute API: it owns the resources, counts their references and
answers property queries. clhost never looks behind an identifier, it only calls the provider.

Two providers ship with the crate:
- [`mock::MockProvider`], a scripted in-process provider for tests and for running without a
  driver. It does not execute kernels.
- `opencl::OpenCl`, the native provider (requires the "opencl" feature).

# Two-phase queries
Info entry points take `Option<&mut [u8]>`. Called with `None` they return the number of bytes
the value needs. Called with a buffer they fill it and return the number of bytes written. A
buffer smaller than the value is an error ([`Status::INVALID_VALUE`]).

# Thread safety
Providers are `Send + Sync`. Retain and release in particular may be called concurrently from
any thread for the same identifier; [`Handle`](crate::handle::Handle) adds no locking of its own.
*/

use clhost_core::{
    raw::{RawContext, RawDevice, RawEvent, RawKernel, RawMem, RawPlatform, RawProgram, RawQueue},
    types::{DeviceType, ImageDesc, ImageFormat, MemFlags, QueueProperties},
    Status,
};
use std::ffi::c_void;

pub mod mock;
#[cfg(feature = "opencl")]
pub mod opencl;

/// The value of a kernel argument.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ArgValue<'a> {
    /// Bytes copied into the argument slot. Memory objects pass their raw identifier.
    Bytes(&'a [u8]),
    /// `__local` memory of the given size in bytes.
    Local(usize),
}

impl ArgValue<'_> {
    /// Size of the argument in bytes.
    pub fn size(&self) -> usize {
        match self {
            Self::Bytes(bytes) => bytes.len(),
            Self::Local(size) => *size,
        }
    }
}

/// The external compute API.
pub trait Provider: Send + Sync + 'static {
    /// Name of the provider, for diagnostics.
    fn name(&self) -> &str;

    /// Lists platforms. Returns the number of platforms.
    fn platform_ids(&self, platforms: Option<&mut [RawPlatform]>) -> Result<u32, Status>;
    /// Queries a platform property.
    fn platform_info(
        &self,
        platform: RawPlatform,
        param: u32,
        value: Option<&mut [u8]>,
    ) -> Result<usize, Status>;
    /// Lists the devices of `platform` matching `device_type`. Returns the number of devices.
    fn device_ids(
        &self,
        platform: RawPlatform,
        device_type: DeviceType,
        devices: Option<&mut [RawDevice]>,
    ) -> Result<u32, Status>;
    /// Queries a device property.
    fn device_info(
        &self,
        device: RawDevice,
        param: u32,
        value: Option<&mut [u8]>,
    ) -> Result<usize, Status>;

    /// Creates a context for `devices` of `platform`.
    fn create_context(
        &self,
        platform: RawPlatform,
        devices: &[RawDevice],
    ) -> Result<RawContext, Status>;
    /// Queries a context property.
    fn context_info(
        &self,
        context: RawContext,
        param: u32,
        value: Option<&mut [u8]>,
    ) -> Result<usize, Status>;

    /// Creates a buffer.
    ///
    /// # Safety
    /// If `host_ptr` is not null it must be valid for reads of `size` bytes, and for
    /// [`MemFlags::USE_HOST_PTR`] it must outlive the buffer.
    unsafe fn create_buffer(
        &self,
        context: RawContext,
        flags: MemFlags,
        size: usize,
        host_ptr: *mut c_void,
    ) -> Result<RawMem, Status>;
    /// Creates an image.
    ///
    /// # Safety
    /// If `host_ptr` is not null it must be valid for reads of
    /// [`desc.host_size(format)`](ImageDesc::host_size) bytes, and for
    /// [`MemFlags::USE_HOST_PTR`] it must outlive the image.
    unsafe fn create_image(
        &self,
        context: RawContext,
        flags: MemFlags,
        format: &ImageFormat,
        desc: &ImageDesc,
        host_ptr: *mut c_void,
    ) -> Result<RawMem, Status>;

    /// Creates a program from source text. Does not compile it.
    fn create_program_with_source(
        &self,
        context: RawContext,
        source: &str,
    ) -> Result<RawProgram, Status>;
    /// Compiles `program` for `devices`, or for every device of its context if empty.
    fn build_program(
        &self,
        program: RawProgram,
        devices: &[RawDevice],
        options: &str,
    ) -> Result<(), Status>;
    /// Queries a build property of `program` for `device`.
    fn program_build_info(
        &self,
        program: RawProgram,
        device: RawDevice,
        param: u32,
        value: Option<&mut [u8]>,
    ) -> Result<usize, Status>;

    /// Creates a kernel for the entry point `name` of a built program.
    fn create_kernel(&self, program: RawProgram, name: &str) -> Result<RawKernel, Status>;
    /// Sets argument `index` of `kernel`.
    fn set_kernel_arg(
        &self,
        kernel: RawKernel,
        index: u32,
        value: ArgValue<'_>,
    ) -> Result<(), Status>;

    /// Creates a command queue for `device`.
    fn create_command_queue(
        &self,
        context: RawContext,
        device: RawDevice,
        properties: QueueProperties,
    ) -> Result<RawQueue, Status>;
    /// Enqueues a device to host transfer.
    ///
    /// # Safety
    /// `dst` must be valid for writes of `size` bytes until the returned event completes.
    #[allow(clippy::too_many_arguments)]
    unsafe fn enqueue_read_buffer(
        &self,
        queue: RawQueue,
        buffer: RawMem,
        blocking: bool,
        offset: usize,
        size: usize,
        dst: *mut c_void,
        wait_list: &[RawEvent],
    ) -> Result<RawEvent, Status>;
    /// Enqueues a host to device transfer.
    ///
    /// # Safety
    /// `src` must be valid for reads of `size` bytes until the returned event completes.
    #[allow(clippy::too_many_arguments)]
    unsafe fn enqueue_write_buffer(
        &self,
        queue: RawQueue,
        buffer: RawMem,
        blocking: bool,
        offset: usize,
        size: usize,
        src: *const c_void,
        wait_list: &[RawEvent],
    ) -> Result<RawEvent, Status>;
    /// Enqueues a device to device copy.
    #[allow(clippy::too_many_arguments)]
    fn enqueue_copy_buffer(
        &self,
        queue: RawQueue,
        src: RawMem,
        dst: RawMem,
        src_offset: usize,
        dst_offset: usize,
        size: usize,
        wait_list: &[RawEvent],
    ) -> Result<RawEvent, Status>;
    /// Enqueues an N-dimensional kernel dispatch.
    ///
    /// `global_work_offset` and `local_work_size`, when given, have the same length as
    /// `global_work_size`.
    fn enqueue_nd_range_kernel(
        &self,
        queue: RawQueue,
        kernel: RawKernel,
        global_work_offset: Option<&[usize]>,
        global_work_size: &[usize],
        local_work_size: Option<&[usize]>,
        wait_list: &[RawEvent],
    ) -> Result<RawEvent, Status>;
    /// Enqueues a marker that completes once `wait_list` (or, if empty, all prior commands)
    /// completes.
    fn enqueue_marker(&self, queue: RawQueue, wait_list: &[RawEvent]) -> Result<RawEvent, Status>;
    /// Holds back later commands of `queue` until `events` complete. Does not block the host.
    fn enqueue_wait_for_events(&self, queue: RawQueue, events: &[RawEvent]) -> Result<(), Status>;
    /// Submits queued commands to the device.
    fn flush(&self, queue: RawQueue) -> Result<(), Status>;
    /// Blocks until every command of `queue` completes.
    fn finish(&self, queue: RawQueue) -> Result<(), Status>;

    /// Blocks until `events` complete.
    fn wait_for_events(&self, events: &[RawEvent]) -> Result<(), Status>;
    /// Queries an event property.
    fn event_info(
        &self,
        event: RawEvent,
        param: u32,
        value: Option<&mut [u8]>,
    ) -> Result<usize, Status>;

    fn retain_context(&self, context: RawContext) -> Result<(), Status>;
    fn release_context(&self, context: RawContext) -> Result<(), Status>;
    fn retain_mem_object(&self, mem: RawMem) -> Result<(), Status>;
    fn release_mem_object(&self, mem: RawMem) -> Result<(), Status>;
    fn retain_program(&self, program: RawProgram) -> Result<(), Status>;
    fn release_program(&self, program: RawProgram) -> Result<(), Status>;
    fn retain_kernel(&self, kernel: RawKernel) -> Result<(), Status>;
    fn release_kernel(&self, kernel: RawKernel) -> Result<(), Status>;
    fn retain_command_queue(&self, queue: RawQueue) -> Result<(), Status>;
    fn release_command_queue(&self, queue: RawQueue) -> Result<(), Status>;
    fn retain_event(&self, event: RawEvent) -> Result<(), Status>;
    fn release_event(&self, event: RawEvent) -> Result<(), Status>;
}
