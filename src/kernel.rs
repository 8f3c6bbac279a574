/*!
Kernels.

A [`Kernel`] is an entry point of a built [`Program`](crate::program::Program). Arguments are
bound by position with [`set_arg`](Kernel::set_arg) and the kernel is dispatched with
[`Queue::run_kernel`](crate::queue::Queue::run_kernel).

```no_run
# use clhost::{result::Result, kernel::{Kernel, LocalMemory}, memory::Buffer};
# fn bind(kernel: &mut Kernel, x: &Buffer, y: &Buffer) -> Result<()> {
kernel
    .set_arg(0, &2f32)?
    .set_arg(1, x)?
    .set_arg(2, y)?
    .set_arg(3, &LocalMemory(256 * 4))?;
# Ok(())
# }
```

Arguments are:
- plain values ([`Pod`]), copied by size,
- memory objects, bound by identifier,
- [`LocalMemory`], a size in bytes for `__local` pointers.
*/

use crate::{
    error::Error,
    handle::Handle,
    memory::{Buffer, Image2d, Image3d},
    program::Program,
    provider::ArgValue,
    result::Result,
};
use bytemuck::Pod;
use clhost_core::raw::RawKernel;
use derive_more::Deref;

/// A kernel argument.
pub trait KernelArg {
    /// The bytes passed to the provider.
    fn arg_value(&self) -> ArgValue<'_>;
}

impl<T: Pod> KernelArg for T {
    fn arg_value(&self) -> ArgValue<'_> {
        ArgValue::Bytes(bytemuck::bytes_of(self))
    }
}

macro_rules! impl_kernel_arg_mem {
    ($($t:ty),+) => {
        $(
            impl KernelArg for $t {
                fn arg_value(&self) -> ArgValue<'_> {
                    ArgValue::Bytes(bytemuck::bytes_of(self.raw_ref()))
                }
            }
        )+
    };
}

impl_kernel_arg_mem!(Buffer, Image2d, Image3d);

/// `__local` memory of the given size in bytes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LocalMemory(pub usize);

impl KernelArg for LocalMemory {
    fn arg_value(&self) -> ArgValue<'_> {
        ArgValue::Local(self.0)
    }
}

/// A kernel.
///
/// Dereferences to its [`Handle`]. Clones share arguments.
#[derive(Clone, Debug, Deref)]
pub struct Kernel {
    #[deref]
    handle: Handle<RawKernel>,
    name: String,
}

impl Kernel {
    pub(crate) fn new(program: &Program, name: &str) -> Result<Self> {
        let provider = program.provider().clone();
        let raw = provider
            .create_kernel(program.as_raw(), name)
            .map_err(|status| Error::KernelNotFound {
                name: name.to_string(),
                status,
            })?;
        tracing::debug!("created {raw:?} for {name:?}");
        Ok(Self {
            // Safety: `raw` was just created, its reference is ours.
            handle: unsafe { Handle::from_raw(provider, raw) },
            name: name.to_string(),
        })
    }
    /// The entry point name.
    pub fn name(&self) -> &str {
        &self.name
    }
    /// Binds argument `index` to `value`.
    ///
    /// **errors**
    /// - [`InvalidArg`](Error::InvalidArg), ie `index` is out of range or the size of `value`
    ///   does not match the parameter.
    pub fn set_arg<T: KernelArg + ?Sized>(&mut self, index: u32, value: &T) -> Result<&mut Self> {
        self.provider()
            .set_kernel_arg(self.as_raw(), index, value.arg_value())
            .map_err(|status| Error::InvalidArg { index, status })?;
        Ok(self)
    }
}

impl PartialEq for Kernel {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl Eq for Kernel {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::Context,
        platform::Platform,
        provider::mock::{MockCall, MockProvider},
    };
    use clhost_core::{
        types::{DeviceType, MemFlags},
        Status,
    };
    use std::{mem::size_of, sync::Arc};

    const SOURCE: &str = "
        __kernel void saxpy(float a, __global const float *x, __global float *y, __local float *tmp) {}
    ";

    fn kernel() -> (Arc<MockProvider>, Context, Kernel) {
        let mock = Arc::new(MockProvider::default());
        let platform = Platform::from_raw(mock.clone(), mock.platforms()[0]);
        let devices = platform.devices(DeviceType::ALL).unwrap();
        let context = Context::new(&platform, &devices).unwrap();
        let program = Program::with_build(&context, SOURCE, "").unwrap();
        let kernel = program.get_kernel("saxpy").unwrap();
        (mock, context, kernel)
    }

    #[test]
    fn kernel_set_args() {
        let (mock, context, mut kernel) = kernel();
        assert_eq!(kernel.name(), "saxpy");
        let x = Buffer::new(&context, MemFlags::READ_ONLY, 16).unwrap();
        let y = Buffer::new(&context, MemFlags::READ_WRITE, 16).unwrap();
        mock.clear_calls();
        kernel
            .set_arg(0, &2f32)
            .unwrap()
            .set_arg(1, &x)
            .unwrap()
            .set_arg(2, &y)
            .unwrap()
            .set_arg(3, &LocalMemory(64))
            .unwrap();
        let sizes: Vec<_> = mock
            .calls()
            .into_iter()
            .map(|call| match call {
                MockCall::SetKernelArg { size, .. } => size,
                call => panic!("unexpected {call:?}"),
            })
            .collect();
        assert_eq!(sizes, [4, size_of::<usize>(), size_of::<usize>(), 64]);
    }

    #[test]
    fn kernel_invalid_args() {
        let (_, _, mut kernel) = kernel();
        assert_eq!(
            kernel.set_arg(4, &1u32).unwrap_err(),
            Error::InvalidArg {
                index: 4,
                status: Status::INVALID_ARG_INDEX,
            }
        );
        assert_eq!(
            kernel.set_arg(1, &1u8).unwrap_err().status(),
            Some(Status::INVALID_ARG_SIZE)
        );
        assert_eq!(
            kernel.set_arg(0, &LocalMemory(4)).unwrap_err().status(),
            Some(Status::INVALID_ARG_VALUE)
        );
    }

    #[test]
    fn kernel_not_found() {
        let (_, context, _) = kernel();
        let program = Program::with_build(&context, SOURCE, "").unwrap();
        assert_eq!(
            program.get_kernel("axpy").unwrap_err(),
            Error::KernelNotFound {
                name: "axpy".into(),
                status: Status::INVALID_KERNEL_NAME,
            }
        );
        let unbuilt = Program::new(&context, SOURCE).unwrap();
        assert_eq!(
            unbuilt.get_kernel("saxpy").unwrap_err().status(),
            Some(Status::INVALID_PROGRAM_EXECUTABLE)
        );
    }
}
