/*!
Command queues.

A [`Queue`] submits transfers and kernel dispatches to one device. Each submission:
- takes a list of events that must complete before the command starts,
- returns an [`Event`] that completes with the command, even when the call blocked.

Commands of an in order queue (the default) run in submission order. An
[out of order](builder::QueueBuilder::out_of_order) queue only orders commands through their
wait lists. Commands can not be cancelled.

```no_run
# use clhost::{result::Result, context::Context, device::Device, kernel::Kernel};
# use clhost::{memory::Buffer, queue::Queue, types::MemFlags};
# fn run(context: &Context, device: &Device, kernel: &mut Kernel) -> Result<()> {
let queue = Queue::new(context, device)?;
let x = Buffer::new(context, MemFlags::READ_WRITE, 4 * 1024)?;
let upload = queue.upload(&x, 0, &[1f32; 1024])?;
kernel.set_arg(0, &x)?;
let run = queue.run_kernel(kernel, &[1024], Some(&[64][..]), &[upload])?;
let mut y = vec![0f32; 1024];
queue.download(&x, 0, &mut y, &[run])?;
# Ok(())
# }
```
*/

use crate::{
    context::Context,
    device::Device,
    error::Error,
    event::{raw_events, Event},
    handle::Handle,
    kernel::Kernel,
    memory::Buffer,
    result::Result,
};
use bytemuck::Pod;
use clhost_core::{raw::RawQueue, types::QueueProperties, Status};
use derive_more::Deref;
use std::{ffi::c_void, mem::size_of_val};

/// Builders.
pub mod builder {
    use super::*;

    /// Builder for creating a [`Queue`].
    pub struct QueueBuilder<'a> {
        pub(super) context: &'a Context,
        pub(super) device: &'a Device,
        pub(super) properties: QueueProperties,
    }

    impl QueueBuilder<'_> {
        /// Allows commands to run in any order consistent with their wait lists. Defaults to
        /// false.
        pub fn out_of_order(mut self, out_of_order: bool) -> Self {
            self.properties.set(
                QueueProperties::OUT_OF_ORDER_EXEC_MODE_ENABLE,
                out_of_order,
            );
            self
        }
        /// Enables profiling of commands. Defaults to false.
        pub fn profiling(mut self, profiling: bool) -> Self {
            self.properties
                .set(QueueProperties::PROFILING_ENABLE, profiling);
            self
        }
        /// Creates a queue.
        ///
        /// **errors**
        /// - [`CreationFailed`](Error::CreationFailed), ie `device` is not in the context or
        ///   the properties are not supported.
        pub fn build(self) -> Result<Queue> {
            let provider = self.context.provider().clone();
            let raw = provider
                .create_command_queue(
                    self.context.as_raw(),
                    self.device.as_raw(),
                    self.properties,
                )
                .map_err(Error::creation("command queue"))?;
            tracing::debug!("created {raw:?} for {:?}", self.device.as_raw());
            Ok(Queue {
                // Safety: `raw` was just created, its reference is ours.
                handle: unsafe { Handle::from_raw(provider, raw) },
                device: self.device.clone(),
                properties: self.properties,
            })
        }
    }
}
use builder::QueueBuilder;

/// A command queue.
///
/// Dereferences to its [`Handle`], cloning retains it.
#[derive(Clone, Debug, Deref)]
pub struct Queue {
    #[deref]
    handle: Handle<RawQueue>,
    device: Device,
    properties: QueueProperties,
}

impl Queue {
    /// Creates an in order queue for `device`.
    pub fn new(context: &Context, device: &Device) -> Result<Self> {
        Self::builder(context, device).build()
    }
    /// A builder for creating a queue.
    pub fn builder<'a>(context: &'a Context, device: &'a Device) -> QueueBuilder<'a> {
        QueueBuilder {
            context,
            device,
            properties: QueueProperties::empty(),
        }
    }
    /// The device.
    pub fn device(&self) -> &Device {
        &self.device
    }
    /// The creation properties.
    pub fn properties(&self) -> QueueProperties {
        self.properties
    }
    unsafe fn adopt_event(&self, raw: clhost_core::raw::RawEvent) -> Event {
        // Safety: `raw` was just returned by an enqueue, its reference is ours.
        unsafe { Event::from_raw(self.provider().clone(), raw) }
    }
    /** Enqueues a read of `buffer` at byte `offset` into `data`.

    With `blocking` the call returns once `data` is filled.

    # Safety
    Unless `blocking`, `data` must not be accessed until the returned event completes.

    **errors**
    - [`EnqueueFailed`](Error::EnqueueFailed), ie the range is out of bounds. */
    pub unsafe fn read_buffer<T: Pod>(
        &self,
        buffer: &Buffer,
        offset: usize,
        data: &mut [T],
        blocking: bool,
        wait_for: &[Event],
    ) -> Result<Event> {
        let size = size_of_val(data);
        let wait_list = raw_events(wait_for);
        // Safety: `data` is valid for `size` bytes, the caller upholds its lifetime.
        let raw = unsafe {
            self.provider().enqueue_read_buffer(
                self.as_raw(),
                buffer.as_raw(),
                blocking,
                offset,
                size,
                data.as_mut_ptr() as *mut c_void,
                &wait_list,
            )
        }
        .map_err(Error::enqueue("read_buffer"))?;
        tracing::trace!(
            "read_buffer {:?}[{offset}..{}] blocking={blocking} after {wait_list:?} -> {raw:?}",
            buffer.as_raw(),
            offset + size,
        );
        // Safety: returned by the enqueue.
        Ok(unsafe { self.adopt_event(raw) })
    }
    /** Enqueues a write of `data` into `buffer` at byte `offset`.

    With `blocking` the call returns once `data` has been copied.

    # Safety
    Unless `blocking`, `data` must not be modified or dropped until the returned event
    completes.

    **errors**
    - [`EnqueueFailed`](Error::EnqueueFailed), ie the range is out of bounds. */
    pub unsafe fn write_buffer<T: Pod>(
        &self,
        buffer: &Buffer,
        offset: usize,
        data: &[T],
        blocking: bool,
        wait_for: &[Event],
    ) -> Result<Event> {
        let size = size_of_val(data);
        let wait_list = raw_events(wait_for);
        // Safety: `data` is valid for `size` bytes, the caller upholds its lifetime.
        let raw = unsafe {
            self.provider().enqueue_write_buffer(
                self.as_raw(),
                buffer.as_raw(),
                blocking,
                offset,
                size,
                data.as_ptr() as *const c_void,
                &wait_list,
            )
        }
        .map_err(Error::enqueue("write_buffer"))?;
        tracing::trace!(
            "write_buffer {:?}[{offset}..{}] blocking={blocking} after {wait_list:?} -> {raw:?}",
            buffer.as_raw(),
            offset + size,
        );
        // Safety: returned by the enqueue.
        Ok(unsafe { self.adopt_event(raw) })
    }
    /// Writes `data` into `buffer` at byte `offset`, blocking until it has been copied.
    pub fn upload<T: Pod>(&self, buffer: &Buffer, offset: usize, data: &[T]) -> Result<Event> {
        // Safety: blocking.
        unsafe { self.write_buffer(buffer, offset, data, true, &[]) }
    }
    /// Reads `buffer` at byte `offset` into `data` after `wait_for`, blocking until `data` is
    /// filled.
    pub fn download<T: Pod>(
        &self,
        buffer: &Buffer,
        offset: usize,
        data: &mut [T],
        wait_for: &[Event],
    ) -> Result<Event> {
        // Safety: blocking.
        unsafe { self.read_buffer(buffer, offset, data, true, wait_for) }
    }
    /// Enqueues a copy of `size` bytes from `src` at `src_offset` to `dst` at `dst_offset`.
    pub fn copy_buffer(
        &self,
        src: &Buffer,
        dst: &Buffer,
        src_offset: usize,
        dst_offset: usize,
        size: usize,
        wait_for: &[Event],
    ) -> Result<Event> {
        let wait_list = raw_events(wait_for);
        let raw = self
            .provider()
            .enqueue_copy_buffer(
                self.as_raw(),
                src.as_raw(),
                dst.as_raw(),
                src_offset,
                dst_offset,
                size,
                &wait_list,
            )
            .map_err(Error::enqueue("copy_buffer"))?;
        tracing::trace!(
            "copy_buffer {:?} -> {:?} ({size} bytes) after {wait_list:?} -> {raw:?}",
            src.as_raw(),
            dst.as_raw(),
        );
        // Safety: returned by the enqueue.
        Ok(unsafe { self.adopt_event(raw) })
    }
    /** Enqueues a dispatch of `kernel` over `global` work items.

    `global` has 1 to 3 dimensions. `local` is the work group size, with the same number of
    dimensions, or None to let the provider choose.

    **errors**
    - [`EnqueueFailed`](Error::EnqueueFailed), ie an argument is not set or `local` does not
      divide `global`. */
    pub fn run_kernel(
        &self,
        kernel: &Kernel,
        global: &[usize],
        local: Option<&[usize]>,
        wait_for: &[Event],
    ) -> Result<Event> {
        if !(1..=3).contains(&global.len()) {
            return Err(Error::EnqueueFailed {
                command: "run_kernel",
                status: Status::INVALID_WORK_DIMENSION,
            });
        }
        if local.map_or(false, |local| local.len() != global.len()) {
            return Err(Error::EnqueueFailed {
                command: "run_kernel",
                status: Status::INVALID_WORK_GROUP_SIZE,
            });
        }
        let wait_list = raw_events(wait_for);
        let raw = self
            .provider()
            .enqueue_nd_range_kernel(
                self.as_raw(),
                kernel.as_raw(),
                None,
                global,
                local,
                &wait_list,
            )
            .map_err(Error::enqueue("run_kernel"))?;
        tracing::trace!(
            "run_kernel {:?} global={global:?} local={local:?} after {wait_list:?} -> {raw:?}",
            kernel.name(),
        );
        // Safety: returned by the enqueue.
        Ok(unsafe { self.adopt_event(raw) })
    }
    /// Enqueues a marker that completes once `wait_for` completes, or with every prior command
    /// if `wait_for` is empty.
    pub fn marker(&self, wait_for: &[Event]) -> Result<Event> {
        let wait_list = raw_events(wait_for);
        let raw = self
            .provider()
            .enqueue_marker(self.as_raw(), &wait_list)
            .map_err(Error::enqueue("marker"))?;
        tracing::trace!("marker after {wait_list:?} -> {raw:?}");
        // Safety: returned by the enqueue.
        Ok(unsafe { self.adopt_event(raw) })
    }
    /// Holds back later commands until `events` complete. Does not block the host.
    pub fn enqueue_wait_for_events(&self, events: &[Event]) -> Result<()> {
        let wait_list = raw_events(events);
        self.provider()
            .enqueue_wait_for_events(self.as_raw(), &wait_list)
            .map_err(Error::enqueue("wait_for_events"))?;
        tracing::trace!("wait_for_events {wait_list:?}");
        Ok(())
    }
    /// Submits enqueued commands to the device.
    pub fn flush(&self) -> Result<()> {
        self.provider()
            .flush(self.as_raw())
            .map_err(Error::status_of("flush"))
    }
    /// Blocks until every enqueued command completes.
    pub fn finish(&self) -> Result<()> {
        self.provider()
            .finish(self.as_raw())
            .map_err(Error::status_of("finish"))
    }
}

impl PartialEq for Queue {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl Eq for Queue {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        platform::Platform,
        program::Program,
        provider::mock::{MockCall, MockProvider},
    };
    use clhost_core::types::{CommandType, DeviceType, ExecutionStatus, MemFlags};
    use std::sync::Arc;

    struct Fixture {
        mock: Arc<MockProvider>,
        context: Context,
        queue: Queue,
    }

    fn fixture() -> Fixture {
        let mock = Arc::new(MockProvider::default());
        let platform = Platform::from_raw(mock.clone(), mock.platforms()[0]);
        let devices = platform.devices(DeviceType::ALL).unwrap();
        let context = Context::new(&platform, &devices).unwrap();
        let queue = Queue::new(&context, &devices[0]).unwrap();
        Fixture {
            mock,
            context,
            queue,
        }
    }

    #[test]
    fn queue_upload_download() {
        let Fixture { context, queue, .. } = fixture();
        let buffer = Buffer::new(&context, MemFlags::READ_WRITE, 16).unwrap();
        let upload = queue.upload(&buffer, 4, &[7u32, 8]).unwrap();
        assert!(upload.is_complete().unwrap());
        assert_eq!(upload.command_type().unwrap(), CommandType::WriteBuffer);
        assert_eq!(upload.queue_id().unwrap(), queue.as_raw());
        let mut out = [0u32; 4];
        queue.download(&buffer, 0, &mut out, &[upload]).unwrap();
        assert_eq!(out, [0, 7, 8, 0]);
    }

    #[test]
    fn queue_transfer_out_of_bounds() {
        let Fixture { context, queue, .. } = fixture();
        let buffer = Buffer::new(&context, MemFlags::READ_WRITE, 8).unwrap();
        assert_eq!(
            queue.upload(&buffer, 4, &[1u32, 2]).unwrap_err(),
            Error::EnqueueFailed {
                command: "write_buffer",
                status: Status::INVALID_VALUE,
            }
        );
    }

    #[test]
    fn queue_copy_buffer() {
        let Fixture {
            mock,
            context,
            queue,
        } = fixture();
        let src = Buffer::from_slice(&context, MemFlags::READ_ONLY, &[1u8, 2, 3, 4]).unwrap();
        let dst = Buffer::new(&context, MemFlags::READ_WRITE, 4).unwrap();
        let event = queue.copy_buffer(&src, &dst, 1, 0, 3, &[]).unwrap();
        event.wait().unwrap();
        assert_eq!(mock.mem_data(dst.as_raw()).unwrap(), [2, 3, 4, 0]);
    }

    #[test]
    fn queue_run_kernel_dimensions() {
        let Fixture { context, queue, .. } = fixture();
        let program = Program::with_build(&context, "__kernel void k() {}", "").unwrap();
        let kernel = program.get_kernel("k").unwrap();
        let dims: [&[usize]; 2] = [&[], &[1, 1, 1, 1]];
        for global in dims {
            assert_eq!(
                queue.run_kernel(&kernel, global, None, &[]).unwrap_err(),
                Error::EnqueueFailed {
                    command: "run_kernel",
                    status: Status::INVALID_WORK_DIMENSION,
                }
            );
        }
        assert_eq!(
            queue
                .run_kernel(&kernel, &[64, 64], Some(&[8][..]), &[])
                .unwrap_err()
                .status(),
            Some(Status::INVALID_WORK_GROUP_SIZE)
        );
        assert_eq!(
            queue
                .run_kernel(&kernel, &[64], Some(&[48][..]), &[])
                .unwrap_err()
                .status(),
            Some(Status::INVALID_WORK_GROUP_SIZE)
        );
        queue.run_kernel(&kernel, &[64, 64], Some(&[8, 8][..]), &[]).unwrap();
    }

    #[test]
    fn queue_run_kernel_unset_args() {
        let Fixture { context, queue, .. } = fixture();
        let program = Program::with_build(&context, "__kernel void k(int x) {}", "").unwrap();
        let mut kernel = program.get_kernel("k").unwrap();
        assert_eq!(
            queue.run_kernel(&kernel, &[1], None, &[]).unwrap_err().status(),
            Some(Status::INVALID_KERNEL_ARGS)
        );
        kernel.set_arg(0, &1i32).unwrap();
        queue.run_kernel(&kernel, &[1], None, &[]).unwrap();
    }

    #[test]
    fn queue_marker_and_wait() {
        let Fixture { mock, queue, .. } = fixture();
        mock.set_manual_completion(true);
        let a = queue.marker(&[]).unwrap();
        let b = queue.marker(&[a.clone()]).unwrap();
        assert_eq!(b.status().unwrap(), ExecutionStatus::Queued);
        queue.enqueue_wait_for_events(&[a.clone(), b.clone()]).unwrap();
        assert!(mock.calls().contains(&MockCall::EnqueueWaitForEvents {
            queue: queue.as_raw(),
            events: vec![a.as_raw(), b.as_raw()],
        }));
        assert_eq!(
            queue.enqueue_wait_for_events(&[]).unwrap_err().status(),
            Some(Status::INVALID_VALUE)
        );
        mock.complete_all();
        crate::event::wait_for_events(&[a, b]).unwrap();
        queue.flush().unwrap();
        queue.finish().unwrap();
    }

    #[test]
    fn queue_builder_properties() {
        let Fixture { context, queue, .. } = fixture();
        let device = queue.device().clone();
        let queue = Queue::builder(&context, &device)
            .out_of_order(true)
            .profiling(true)
            .build()
            .unwrap();
        assert_eq!(queue.properties(), QueueProperties::all());
        let queue = Queue::builder(&context, &device)
            .profiling(true)
            .profiling(false)
            .build()
            .unwrap();
        assert!(queue.properties().is_empty());
    }
}
