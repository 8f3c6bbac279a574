/*!
The native provider.

Forwards every call to the system OpenCL loader through [`opencl_sys`]. Requires OpenCL 1.2.
*/

use super::{ArgValue, Provider};
use clhost_core::{
    raw::{
        RawContext, RawDevice, RawEvent, RawHandle, RawKernel, RawMem, RawPlatform, RawProgram,
        RawQueue,
    },
    types::{DeviceType, ImageDesc, ImageFormat, MemFlags, QueueProperties},
    Status,
};
use opencl_sys::{
    cl_event, cl_image_desc, cl_image_format, cl_int, cl_uint, clBuildProgram,
    clCreateBuffer, clCreateCommandQueue, clCreateContext, clCreateImage, clCreateKernel,
    clCreateProgramWithSource, clEnqueueBarrierWithWaitList, clEnqueueCopyBuffer,
    clEnqueueMarkerWithWaitList, clEnqueueNDRangeKernel, clEnqueueReadBuffer,
    clEnqueueWriteBuffer, clFinish, clFlush, clGetContextInfo, clGetDeviceIDs, clGetDeviceInfo,
    clGetEventInfo, clGetPlatformIDs, clGetPlatformInfo, clGetProgramBuildInfo,
    clReleaseCommandQueue, clReleaseContext, clReleaseEvent, clReleaseKernel,
    clReleaseMemObject, clReleaseProgram, clRetainCommandQueue, clRetainContext,
    clRetainEvent, clRetainKernel, clRetainMemObject, clRetainProgram, clSetKernelArg,
    clWaitForEvents,
};
use std::{
    ffi::{c_void, CString},
    ptr::{null, null_mut},
};

const CONTEXT_PLATFORM: isize = clhost_core::info::context::PLATFORM;

fn check(code: cl_int) -> Result<(), Status> {
    Status::from_code(code).check()
}

fn count(len: usize) -> Result<cl_uint, Status> {
    cl_uint::try_from(len).map_err(|_| Status::INVALID_VALUE)
}

/// Calls an info entry point with the two-phase protocol of [`Provider`].
fn info(
    value: Option<&mut [u8]>,
    f: impl FnOnce(usize, *mut c_void, *mut usize) -> cl_int,
) -> Result<usize, Status> {
    let (len, ptr) = match value {
        Some(value) => (value.len(), value.as_mut_ptr().cast()),
        None => (0, null_mut()),
    };
    let mut size = 0;
    check(f(len, ptr, &mut size))?;
    Ok(size)
}

/// Calls an id listing entry point. Returns the number of ids.
fn ids<R: RawHandle>(
    ids: Option<&mut [R]>,
    f: impl FnOnce(cl_uint, *mut *mut c_void, *mut cl_uint) -> cl_int,
) -> Result<u32, Status> {
    let (len, ptr) = match ids {
        Some(ids) => (count(ids.len())?, ids.as_mut_ptr().cast()),
        None => (0, null_mut()),
    };
    let mut n = 0;
    check(f(len, ptr, &mut n))?;
    Ok(n)
}

/// Calls a factory entry point, which reports its status through an out parameter.
fn create<R: RawHandle>(f: impl FnOnce(*mut cl_int) -> *mut c_void) -> Result<R, Status> {
    let mut code = 0;
    let ptr = f(&mut code);
    check(code)?;
    if ptr.is_null() {
        return Err(Status::OUT_OF_HOST_MEMORY);
    }
    Ok(R::from_ptr(ptr))
}

/// Calls an enqueue entry point. Returns the event of the command.
fn enqueue(
    wait_list: &[RawEvent],
    f: impl FnOnce(cl_uint, *const cl_event, *mut cl_event) -> cl_int,
) -> Result<RawEvent, Status> {
    let (len, ptr) = events(wait_list)?;
    let mut event: cl_event = null_mut();
    check(f(len, ptr, &mut event))?;
    Ok(RawEvent::from_ptr(event))
}

fn events(events: &[RawEvent]) -> Result<(cl_uint, *const cl_event), Status> {
    if events.is_empty() {
        Ok((0, null()))
    } else {
        Ok((count(events.len())?, events.as_ptr().cast()))
    }
}

fn c_string(s: &str, status: Status) -> Result<CString, Status> {
    CString::new(s).map_err(|_| status)
}

/// The system OpenCL implementation.
#[derive(Debug, Default)]
pub struct OpenCl {
    _m: (),
}

impl OpenCl {
    pub fn new() -> Self {
        Self::default()
    }
}

macro_rules! impl_retain_release {
    ($($name:ident: $raw:ty => $cl:ident),+ $(,)?) => {
        paste::paste! {
            $(
                fn [<retain_ $name>](&self, raw: $raw) -> Result<(), Status> {
                    // Safety: invalid ids are reported by the provider.
                    check(unsafe { [<clRetain $cl>](raw.as_ptr()) })
                }
                fn [<release_ $name>](&self, raw: $raw) -> Result<(), Status> {
                    // Safety: invalid ids are reported by the provider.
                    check(unsafe { [<clRelease $cl>](raw.as_ptr()) })
                }
            )+
        }
    };
}

impl Provider for OpenCl {
    fn name(&self) -> &str {
        "opencl"
    }
    fn platform_ids(&self, platforms: Option<&mut [RawPlatform]>) -> Result<u32, Status> {
        // Safety: `ids` passes a buffer of `n` ids or null.
        ids(platforms, |n, ptr, ret| unsafe {
            clGetPlatformIDs(n, ptr, ret)
        })
    }
    fn platform_info(
        &self,
        platform: RawPlatform,
        param: u32,
        value: Option<&mut [u8]>,
    ) -> Result<usize, Status> {
        // Safety: `info` passes a buffer of `len` bytes or null.
        info(value, |len, ptr, ret| unsafe {
            clGetPlatformInfo(platform.as_ptr(), param, len, ptr, ret)
        })
    }
    fn device_ids(
        &self,
        platform: RawPlatform,
        device_type: DeviceType,
        devices: Option<&mut [RawDevice]>,
    ) -> Result<u32, Status> {
        // Safety: `ids` passes a buffer of `n` ids or null.
        ids(devices, |n, ptr, ret| unsafe {
            clGetDeviceIDs(platform.as_ptr(), device_type.bits(), n, ptr, ret)
        })
    }
    fn device_info(
        &self,
        device: RawDevice,
        param: u32,
        value: Option<&mut [u8]>,
    ) -> Result<usize, Status> {
        // Safety: `info` passes a buffer of `len` bytes or null.
        info(value, |len, ptr, ret| unsafe {
            clGetDeviceInfo(device.as_ptr(), param, len, ptr, ret)
        })
    }
    fn create_context(
        &self,
        platform: RawPlatform,
        devices: &[RawDevice],
    ) -> Result<RawContext, Status> {
        if devices.is_empty() {
            return Err(Status::INVALID_VALUE);
        }
        let properties = [CONTEXT_PLATFORM, platform.addr() as isize, 0];
        let n = count(devices.len())?;
        // Safety: `properties` is zero terminated, `devices` holds `n` ids.
        create(|code| unsafe {
            clCreateContext(
                properties.as_ptr(),
                n,
                devices.as_ptr().cast(),
                None,
                null_mut(),
                code,
            )
        })
    }
    fn context_info(
        &self,
        context: RawContext,
        param: u32,
        value: Option<&mut [u8]>,
    ) -> Result<usize, Status> {
        // Safety: `info` passes a buffer of `len` bytes or null.
        info(value, |len, ptr, ret| unsafe {
            clGetContextInfo(context.as_ptr(), param, len, ptr, ret)
        })
    }
    unsafe fn create_buffer(
        &self,
        context: RawContext,
        flags: MemFlags,
        size: usize,
        host_ptr: *mut c_void,
    ) -> Result<RawMem, Status> {
        // Safety: `host_ptr` is upheld by the caller.
        create(|code| unsafe {
            clCreateBuffer(context.as_ptr(), flags.bits(), size, host_ptr, code)
        })
    }
    unsafe fn create_image(
        &self,
        context: RawContext,
        flags: MemFlags,
        format: &ImageFormat,
        desc: &ImageDesc,
        host_ptr: *mut c_void,
    ) -> Result<RawMem, Status> {
        let format = cl_image_format {
            image_channel_order: format.channel_order.to_raw(),
            image_channel_data_type: format.channel_type.to_raw(),
        };
        let desc = cl_image_desc {
            image_type: desc.image_type.to_raw(),
            image_width: desc.width,
            image_height: desc.height,
            image_depth: desc.depth,
            image_array_size: 0,
            image_row_pitch: desc.row_pitch,
            image_slice_pitch: desc.slice_pitch,
            num_mip_levels: 0,
            num_samples: 0,
            buffer: null_mut(),
        };
        // Safety: `host_ptr` is upheld by the caller.
        create(|code| unsafe {
            clCreateImage(context.as_ptr(), flags.bits(), &format, &desc, host_ptr, code)
        })
    }
    fn create_program_with_source(
        &self,
        context: RawContext,
        source: &str,
    ) -> Result<RawProgram, Status> {
        if source.is_empty() {
            return Err(Status::INVALID_VALUE);
        }
        let strings = [source.as_ptr().cast()];
        let lengths = [source.len()];
        // Safety: one string of `source.len()` bytes.
        create(|code| unsafe {
            clCreateProgramWithSource(
                context.as_ptr(),
                1,
                strings.as_ptr(),
                lengths.as_ptr(),
                code,
            )
        })
    }
    fn build_program(
        &self,
        program: RawProgram,
        devices: &[RawDevice],
        options: &str,
    ) -> Result<(), Status> {
        let options = c_string(options, Status::INVALID_BUILD_OPTIONS)?;
        let (n, ptr) = if devices.is_empty() {
            (0, null())
        } else {
            (count(devices.len())?, devices.as_ptr().cast())
        };
        // Safety: `ptr` holds `n` ids or is null, `options` is nul terminated. The build is
        // synchronous without a callback.
        check(unsafe {
            clBuildProgram(program.as_ptr(), n, ptr, options.as_ptr(), None, null_mut())
        })
    }
    fn program_build_info(
        &self,
        program: RawProgram,
        device: RawDevice,
        param: u32,
        value: Option<&mut [u8]>,
    ) -> Result<usize, Status> {
        // Safety: `info` passes a buffer of `len` bytes or null.
        info(value, |len, ptr, ret| unsafe {
            clGetProgramBuildInfo(program.as_ptr(), device.as_ptr(), param, len, ptr, ret)
        })
    }
    fn create_kernel(&self, program: RawProgram, name: &str) -> Result<RawKernel, Status> {
        let name = c_string(name, Status::INVALID_KERNEL_NAME)?;
        // Safety: `name` is nul terminated.
        create(|code| unsafe { clCreateKernel(program.as_ptr(), name.as_ptr(), code) })
    }
    fn set_kernel_arg(
        &self,
        kernel: RawKernel,
        index: u32,
        value: ArgValue<'_>,
    ) -> Result<(), Status> {
        let ptr: *const c_void = match value {
            ArgValue::Bytes(bytes) => bytes.as_ptr().cast(),
            ArgValue::Local(_) => null(),
        };
        // Safety: `ptr` holds `value.size()` bytes, or is null for local memory.
        check(unsafe { clSetKernelArg(kernel.as_ptr(), index, value.size(), ptr) })
    }
    #[allow(deprecated)]
    fn create_command_queue(
        &self,
        context: RawContext,
        device: RawDevice,
        properties: QueueProperties,
    ) -> Result<RawQueue, Status> {
        // Safety: plain ids.
        create(|code| unsafe {
            clCreateCommandQueue(context.as_ptr(), device.as_ptr(), properties.bits(), code)
        })
    }
    unsafe fn enqueue_read_buffer(
        &self,
        queue: RawQueue,
        buffer: RawMem,
        blocking: bool,
        offset: usize,
        size: usize,
        dst: *mut c_void,
        wait_list: &[RawEvent],
    ) -> Result<RawEvent, Status> {
        // Safety: `dst` is upheld by the caller.
        enqueue(wait_list, |n, list, event| unsafe {
            clEnqueueReadBuffer(
                queue.as_ptr(),
                buffer.as_ptr(),
                blocking.into(),
                offset,
                size,
                dst,
                n,
                list,
                event,
            )
        })
    }
    unsafe fn enqueue_write_buffer(
        &self,
        queue: RawQueue,
        buffer: RawMem,
        blocking: bool,
        offset: usize,
        size: usize,
        src: *const c_void,
        wait_list: &[RawEvent],
    ) -> Result<RawEvent, Status> {
        // Safety: `src` is upheld by the caller.
        enqueue(wait_list, |n, list, event| unsafe {
            clEnqueueWriteBuffer(
                queue.as_ptr(),
                buffer.as_ptr(),
                blocking.into(),
                offset,
                size,
                src,
                n,
                list,
                event,
            )
        })
    }
    fn enqueue_copy_buffer(
        &self,
        queue: RawQueue,
        src: RawMem,
        dst: RawMem,
        src_offset: usize,
        dst_offset: usize,
        size: usize,
        wait_list: &[RawEvent],
    ) -> Result<RawEvent, Status> {
        // Safety: bounds are checked by the provider.
        enqueue(wait_list, |n, list, event| unsafe {
            clEnqueueCopyBuffer(
                queue.as_ptr(),
                src.as_ptr(),
                dst.as_ptr(),
                src_offset,
                dst_offset,
                size,
                n,
                list,
                event,
            )
        })
    }
    fn enqueue_nd_range_kernel(
        &self,
        queue: RawQueue,
        kernel: RawKernel,
        global_work_offset: Option<&[usize]>,
        global_work_size: &[usize],
        local_work_size: Option<&[usize]>,
        wait_list: &[RawEvent],
    ) -> Result<RawEvent, Status> {
        let dims = global_work_size.len();
        if global_work_offset.map_or(false, |x| x.len() != dims) {
            return Err(Status::INVALID_GLOBAL_OFFSET);
        }
        if local_work_size.map_or(false, |x| x.len() != dims) {
            return Err(Status::INVALID_WORK_GROUP_SIZE);
        }
        let work_dim = count(dims)?;
        let offset = global_work_offset.map_or(null(), <[usize]>::as_ptr);
        let local = local_work_size.map_or(null(), <[usize]>::as_ptr);
        // Safety: every work size array has `work_dim` items or is null.
        enqueue(wait_list, |n, list, event| unsafe {
            clEnqueueNDRangeKernel(
                queue.as_ptr(),
                kernel.as_ptr(),
                work_dim,
                offset,
                global_work_size.as_ptr(),
                local,
                n,
                list,
                event,
            )
        })
    }
    fn enqueue_marker(&self, queue: RawQueue, wait_list: &[RawEvent]) -> Result<RawEvent, Status> {
        // Safety: plain ids.
        enqueue(wait_list, |n, list, event| unsafe {
            clEnqueueMarkerWithWaitList(queue.as_ptr(), n, list, event)
        })
    }
    fn enqueue_wait_for_events(&self, queue: RawQueue, events: &[RawEvent]) -> Result<(), Status> {
        if events.is_empty() {
            return Err(Status::INVALID_VALUE);
        }
        let (n, list) = self::events(events)?;
        // Safety: `list` holds `n` events. No event is returned.
        check(unsafe { clEnqueueBarrierWithWaitList(queue.as_ptr(), n, list, null_mut()) })
    }
    fn flush(&self, queue: RawQueue) -> Result<(), Status> {
        // Safety: plain id.
        check(unsafe { clFlush(queue.as_ptr()) })
    }
    fn finish(&self, queue: RawQueue) -> Result<(), Status> {
        // Safety: plain id.
        check(unsafe { clFinish(queue.as_ptr()) })
    }
    fn wait_for_events(&self, events: &[RawEvent]) -> Result<(), Status> {
        if events.is_empty() {
            return Err(Status::INVALID_VALUE);
        }
        let (n, list) = self::events(events)?;
        // Safety: `list` holds `n` events.
        check(unsafe { clWaitForEvents(n, list) })
    }
    fn event_info(
        &self,
        event: RawEvent,
        param: u32,
        value: Option<&mut [u8]>,
    ) -> Result<usize, Status> {
        // Safety: `info` passes a buffer of `len` bytes or null.
        info(value, |len, ptr, ret| unsafe {
            clGetEventInfo(event.as_ptr(), param, len, ptr, ret)
        })
    }
    impl_retain_release! {
        context: RawContext => Context,
        mem_object: RawMem => MemObject,
        program: RawProgram => Program,
        kernel: RawKernel => Kernel,
        command_queue: RawQueue => CommandQueue,
        event: RawEvent => Event,
    }
}
