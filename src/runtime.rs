/*!
The process scoped provider and platform cache.

A [`Runtime`] owns a provider and enumerates its platforms at most once. The global runtime
backs [`Platform::platforms()`](crate::platform::Platform::platforms):

```no_run
# use clhost::{result::Result, runtime::Runtime, provider::mock::MockProvider};
# use std::sync::Arc;
# fn main() -> Result<()> {
// Optional, before first use. Otherwise the native provider is used.
let _ = Runtime::install(Runtime::new(Arc::new(MockProvider::default())));
let platforms = Runtime::global()?.platforms()?;
# Ok(())
# }
```

The platform list is never refreshed. Platforms added to the provider afterwards (hot plug) are
not seen by a runtime that has already enumerated.
*/

use crate::{error::Error, platform::Platform, provider::Provider, result::Result};
use clhost_core::raw::RawPlatform;
use once_cell::sync::OnceCell;
use std::{
    fmt::{self, Debug},
    sync::Arc,
};

/// Builders.
pub mod builder {
    use super::*;

    /// Builder for creating a [`Runtime`].
    #[derive(Default)]
    pub struct RuntimeBuilder {
        pub(super) provider: Option<Arc<dyn Provider>>,
    }

    impl RuntimeBuilder {
        /// The provider, defaults to the native provider.
        pub fn provider(self, provider: Arc<dyn Provider>) -> Self {
            Self {
                provider: Some(provider),
            }
        }
        /// Creates a runtime.
        ///
        /// **errors**
        /// - [`ProviderUnavailable`](Error::ProviderUnavailable) if no provider was given and
        ///   the "opencl" feature is not enabled.
        pub fn build(self) -> Result<Runtime> {
            match self.provider {
                Some(provider) => Ok(Runtime::new(provider)),
                None => Runtime::native(),
            }
        }
    }
}
use builder::RuntimeBuilder;

struct RuntimeInner {
    provider: Arc<dyn Provider>,
    platforms: OnceCell<Vec<Platform>>,
}

/// A provider with a cached platform list.
///
/// Runtimes can be cloned, which is equivalent to [`Arc::clone()`].
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

static GLOBAL: OnceCell<Runtime> = OnceCell::new();

impl Runtime {
    /// Creates a runtime for `provider`.
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            inner: Arc::new(RuntimeInner {
                provider,
                platforms: OnceCell::new(),
            }),
        }
    }
    /// A builder for creating a runtime.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::default()
    }
    fn native() -> Result<Self> {
        #[cfg(feature = "opencl")]
        {
            Ok(Self::new(Arc::new(crate::provider::opencl::OpenCl::new())))
        }
        #[cfg(not(feature = "opencl"))]
        {
            Err(Error::ProviderUnavailable)
        }
    }
    /// The global runtime.
    ///
    /// Initialized on first use with the native provider unless one was
    /// [installed](Self::install).
    ///
    /// **errors**
    /// - [`ProviderUnavailable`](Error::ProviderUnavailable)
    pub fn global() -> Result<&'static Self> {
        GLOBAL.get_or_try_init(Self::native)
    }
    /// Installs `runtime` as the global runtime.
    ///
    /// Returns `runtime` back if the global runtime was already initialized.
    pub fn install(runtime: Self) -> Result<(), Self> {
        GLOBAL.set(runtime)
    }
    /// The provider.
    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.inner.provider
    }
    /// The platforms, enumerated on first call.
    ///
    /// **errors**
    /// - The provider failed to list platforms. Nothing is cached, the next call tries again.
    pub fn platforms(&self) -> Result<&[Platform]> {
        let platforms = self
            .inner
            .platforms
            .get_or_try_init(|| enumerate(&self.inner.provider))?;
        Ok(platforms)
    }
    /// The platform at `index`.
    ///
    /// **errors**
    /// - [`PlatformIndexOutOfRange`](Error::PlatformIndexOutOfRange)
    pub fn platform(&self, index: usize) -> Result<&Platform> {
        let platforms = self.platforms()?;
        platforms.get(index).ok_or(Error::PlatformIndexOutOfRange {
            index,
            platforms: platforms.len(),
        })
    }
}

fn enumerate(provider: &Arc<dyn Provider>) -> Result<Vec<Platform>> {
    let count = provider
        .platform_ids(None)
        .map_err(Error::status_of("platform_ids"))?;
    let mut ids = vec![RawPlatform::NULL; count as usize];
    if !ids.is_empty() {
        let count = provider
            .platform_ids(Some(&mut ids))
            .map_err(Error::status_of("platform_ids"))?;
        ids.truncate(count as usize);
    }
    tracing::debug!("{}: {} platform(s)", provider.name(), ids.len());
    Ok(ids
        .into_iter()
        .map(|raw| Platform::from_raw(provider.clone(), raw))
        .collect())
}

impl Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("provider", &self.inner.provider.name())
            .field("platforms", &self.inner.platforms.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::{MockCall, MockDevice, MockPlatform, MockProvider};
    use clhost_core::{types::DeviceType, Status};

    #[test]
    fn runtime_platforms_cached() {
        let mock = Arc::new(MockProvider::default());
        let runtime = Runtime::builder().provider(mock.clone()).build().unwrap();
        let first = runtime.platforms().unwrap().to_vec();
        mock.push_platform(MockPlatform::new("late").with_device(MockDevice::new(
            "cpu",
            DeviceType::CPU,
        )));
        assert_eq!(mock.platforms().len(), 2);
        let second = runtime.platforms().unwrap();
        assert_eq!(first.as_slice(), second);
        let enumerations = mock
            .calls()
            .into_iter()
            .filter(|call| matches!(call, MockCall::PlatformIds { .. }))
            .count();
        assert_eq!(enumerations, 2);
    }

    #[test]
    fn runtime_platform_index_out_of_range() {
        let runtime = Runtime::new(Arc::new(MockProvider::default()));
        assert!(runtime.platform(0).is_ok());
        assert_eq!(
            runtime.platform(1).unwrap_err(),
            Error::PlatformIndexOutOfRange {
                index: 1,
                platforms: 1,
            }
        );
    }

    #[test]
    fn runtime_platforms_failure_not_cached() {
        let mock = Arc::new(MockProvider::default());
        let runtime = Runtime::new(mock.clone());
        mock.fail_next("platform_ids", Status::OUT_OF_HOST_MEMORY);
        assert_eq!(
            runtime.platforms().unwrap_err().status(),
            Some(Status::OUT_OF_HOST_MEMORY)
        );
        assert_eq!(runtime.platforms().unwrap().len(), 1);
    }

    #[cfg(not(feature = "opencl"))]
    #[test]
    fn runtime_builder_without_provider() {
        assert_eq!(
            Runtime::builder().build().unwrap_err(),
            Error::ProviderUnavailable
        );
    }
}
