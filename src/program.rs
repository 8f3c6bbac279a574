/*!
Programs.

A [`Program`] is created from source text and compiled for the devices of its context with
[`build`](Program::build). When a build fails the program stays usable and
[`build_log`](Program::build_log) explains why:

```no_run
# use clhost::{result::Result, context::Context, program::Program};
# fn build(context: &Context, source: &str) -> Result<()> {
let mut program = Program::new(context, source)?;
if let Err(e) = program.build("-cl-fast-relaxed-math") {
    for device in context.devices()? {
        eprintln!("{}:\n{}", device.name()?, program.build_log(&device)?);
    }
    return Err(e);
}
let kernel = program.get_kernel("main")?;
# Ok(())
# }
```
*/

use crate::{
    context::Context,
    device::Device,
    error::Error,
    handle::Handle,
    kernel::Kernel,
    query::{query, InfoSource},
    result::Result,
};
use clhost_core::{
    info::program_build,
    raw::RawProgram,
    types::BuildStatus,
    Status,
};
use derive_more::Deref;

/// A program.
///
/// Dereferences to its [`Handle`], cloning retains it. Clones share the build.
#[derive(Clone, Debug, Deref)]
pub struct Program {
    #[deref]
    handle: Handle<RawProgram>,
}

impl Program {
    /// Creates a program from `source`. Does not compile it.
    ///
    /// **errors**
    /// - [`CreationFailed`](Error::CreationFailed), ie `source` is empty.
    pub fn new(context: &Context, source: &str) -> Result<Self> {
        let provider = context.provider().clone();
        let raw = provider
            .create_program_with_source(context.as_raw(), source)
            .map_err(Error::creation("program"))?;
        tracing::debug!("created {raw:?} from {} bytes of source", source.len());
        Ok(Self {
            // Safety: `raw` was just created, its reference is ours.
            handle: unsafe { Handle::from_raw(provider, raw) },
        })
    }
    /** Creates a program from `source` and builds it with `options`.

    On failure the program is dropped with the error, so its build log can not be retrieved.
    Use [`new`](Self::new) and [`build`](Self::build) to see compiler diagnostics.

    **errors**
    - [`CreationFailed`](Error::CreationFailed)
    - [`BuildFailed`](Error::BuildFailed) */
    pub fn with_build(context: &Context, source: &str, options: &str) -> Result<Self> {
        let mut program = Self::new(context, source)?;
        program.build(options)?;
        Ok(program)
    }
    /// Compiles the program for every device of its context.
    ///
    /// `options` are passed to the compiler verbatim.
    ///
    /// **errors**
    /// - [`BuildFailed`](Error::BuildFailed). The program remains valid, see
    ///   [`build_log`](Self::build_log).
    pub fn build(&mut self, options: &str) -> Result<()> {
        let result = self
            .provider()
            .build_program(self.as_raw(), &[], options);
        match result {
            Ok(()) => {
                tracing::debug!("built {:?} with {options:?}", self.as_raw());
                Ok(())
            }
            Err(status) => {
                tracing::debug!("build of {:?} failed: {status}", self.as_raw());
                Err(Error::BuildFailed { status })
            }
        }
    }
    /// The compiler output of the last build for `device`.
    ///
    /// Empty if the program was not built for `device`.
    pub fn build_log(&self, device: &Device) -> Result<String> {
        query(&self.build_info(device), program_build::LOG)
    }
    /// The status of the last build for `device`.
    pub fn build_status(&self, device: &Device) -> Result<BuildStatus> {
        query(&self.build_info(device), program_build::STATUS)
    }
    /// The options of the last build for `device`.
    pub fn build_options(&self, device: &Device) -> Result<String> {
        query(&self.build_info(device), program_build::OPTIONS)
    }
    /// Creates the kernel for entry point `name`.
    ///
    /// **errors**
    /// - [`KernelNotFound`](Error::KernelNotFound), ie the program is not built or has no
    ///   entry point `name`.
    pub fn get_kernel(&self, name: &str) -> Result<Kernel> {
        Kernel::new(self, name)
    }
    fn build_info<'a>(&'a self, device: &'a Device) -> BuildInfo<'a> {
        BuildInfo {
            program: self,
            device,
        }
    }
}

struct BuildInfo<'a> {
    program: &'a Program,
    device: &'a Device,
}

impl InfoSource for BuildInfo<'_> {
    fn info(&self, param: u32, value: Option<&mut [u8]>) -> Result<usize, Status> {
        self.program.provider().program_build_info(
            self.program.as_raw(),
            self.device.as_raw(),
            param,
            value,
        )
    }
}

impl PartialEq for Program {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl Eq for Program {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        platform::Platform,
        provider::mock::{MockCall, MockProvider},
    };
    use clhost_core::types::DeviceType;
    use std::sync::Arc;

    fn context() -> (Arc<MockProvider>, Context, Device) {
        let mock = Arc::new(MockProvider::default());
        let platform = Platform::from_raw(mock.clone(), mock.platforms()[0]);
        let devices = platform.devices(DeviceType::ALL).unwrap();
        let context = Context::new(&platform, &devices).unwrap();
        (mock, context, devices[0].clone())
    }

    #[test]
    fn program_build_success() {
        let (mock, context, device) = context();
        let mut program = Program::new(&context, "__kernel void k(){}").unwrap();
        assert_eq!(program.build_status(&device).unwrap(), BuildStatus::None);
        program.build("-w").unwrap();
        assert_eq!(program.build_status(&device).unwrap(), BuildStatus::Success);
        assert_eq!(program.build_log(&device).unwrap(), "");
        assert_eq!(program.build_options(&device).unwrap(), "-w");
        assert!(mock.calls().contains(&MockCall::BuildProgram {
            program: program.as_raw(),
            devices: Vec::new(),
            options: "-w".into(),
        }));
        program.get_kernel("k").unwrap();
    }

    #[test]
    fn program_build_failure_keeps_log() {
        let (mock, context, device) = context();
        let mut program = Program::new(&context, "__kernel void k( {}").unwrap();
        assert_eq!(
            program.build("").unwrap_err(),
            Error::BuildFailed {
                status: Status::BUILD_PROGRAM_FAILURE
            }
        );
        assert!(mock.is_live(program.as_raw()));
        assert_eq!(program.build_status(&device).unwrap(), BuildStatus::Error);
        assert_eq!(
            program.build_log(&device).unwrap(),
            "1:16: error: unclosed '('\n"
        );
        assert!(matches!(
            program.get_kernel("k"),
            Err(Error::KernelNotFound { .. })
        ));
    }

    #[test]
    fn program_with_build() {
        let (mock, context, _) = context();
        let program = Program::with_build(&context, "kernel void a(int x) {}", "").unwrap();
        program.get_kernel("a").unwrap();
        let raw = program.as_raw();
        drop(program);
        assert!(!mock.is_live(raw));
        assert!(Program::with_build(&context, "kernel void a(int x) {", "").is_err());
        assert_eq!(mock.live_count(), 1);
    }

    #[test]
    fn program_new_does_not_query_devices() {
        let (mock, context, _) = context();
        let live = mock.live_count();
        mock.fail_next("context_info", Status::OUT_OF_HOST_MEMORY);
        let program = Program::new(&context, "__kernel void k(){}").unwrap();
        assert_eq!(mock.live_count(), live + 1);
        drop(program);
        assert_eq!(mock.live_count(), live);
        mock.fail_next("create_program_with_source", Status::OUT_OF_HOST_MEMORY);
        assert_eq!(
            Program::new(&context, "__kernel void k(){}").unwrap_err(),
            Error::CreationFailed {
                resource: "program",
                status: Status::OUT_OF_HOST_MEMORY,
            }
        );
        assert_eq!(mock.live_count(), live);
    }

    #[test]
    fn program_empty_source() {
        let (_, context, _) = context();
        assert_eq!(
            Program::new(&context, "").unwrap_err(),
            Error::CreationFailed {
                resource: "program",
                status: Status::INVALID_VALUE,
            }
        );
    }
}
