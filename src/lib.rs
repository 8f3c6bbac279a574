/*!
Reference counted handles and uniform property queries over a compute device provider.

A [`Provider`](provider::Provider) hands out opaque identifiers for platforms, devices, contexts,
memory objects, programs, kernels, command queues and events. **clhost** wraps the owned ones in
[`Handle`](handle::Handle)s that retain on clone and release on drop, and reads properties of any
shape (scalar, boolean, string, array) through one [query protocol](query).

```no_run
# use clhost::{result::Result, context::Context, program::Program, platform::Platform};
# use clhost::types::DeviceType;
# fn main() -> Result<()> {
let platform = Platform::platforms()?[0].clone();
let devices = platform.devices(DeviceType::ALL)?;
let context = Context::new(&platform, &devices)?;
let mut program = Program::new(&context, "__kernel void k() {}")?;
if program.build("").is_err() {
    for device in devices.iter() {
        eprintln!("{}", program.build_log(device)?);
    }
}
# Ok(())
# }
```
*/

#![forbid(unsafe_op_in_unsafe_fn)]

pub use clhost_core;

#[doc(inline)]
pub use clhost_core::{info, raw, types, Status};

pub mod result {
    pub type Result<T, E = crate::error::Error> = std::result::Result<T, E>;
}

pub mod context;
pub mod device;
pub mod error;
pub mod event;
pub mod handle;
pub mod kernel;
pub mod memory;
pub mod platform;
pub mod program;
pub mod provider;
pub mod query;
pub mod queue;
pub mod runtime;
