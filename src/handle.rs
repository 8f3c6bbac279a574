/*!
Reference counted ownership of provider resources.

[`Resource`] is the dispatch table: each owned raw identifier type names its retain and release
entry points. [`Handle`] is generic over it, so one implementation of the lifetime rules serves
contexts, memory objects, programs, kernels, queues and events. A new kind of resource needs
only a new [`Resource`] impl.

Ownership rules:
- [`Handle::from_raw`] adopts a reference the caller already owns (factory results). No retain.
- [`Clone`], [`Clone::clone_from`], [`Handle::retain_raw`] and [`Handle::reset`] retain the
  identifier they bind to.
- [`Drop`] and rebinding release the previous identifier exactly once.
- Null identifiers are never retained or released.

Equality and hashing use the identifier only.

Retain and release are fire-and-forget: a failure is logged and otherwise ignored. Their thread
safety is that of the provider, see [`Provider`].
*/

use crate::provider::Provider;
use clhost_core::{
    raw::{RawContext, RawEvent, RawHandle, RawKernel, RawMem, RawProgram, RawQueue},
    Status,
};
use paste::paste;
use std::{
    fmt::{self, Debug},
    hash::{Hash, Hasher},
    mem::{forget, replace},
    sync::Arc,
};

/// A reference counted resource kind.
pub trait Resource: RawHandle {
    /// Increments the provider's reference count of `raw`.
    fn retain(provider: &dyn Provider, raw: Self) -> Result<(), Status>;
    /// Decrements the provider's reference count of `raw`.
    fn release(provider: &dyn Provider, raw: Self) -> Result<(), Status>;
}

macro_rules! impl_resource {
    ($($raw:ty => $name:ident),+ $(,)?) => {
        paste! {
            $(
                impl Resource for $raw {
                    fn retain(provider: &dyn Provider, raw: Self) -> Result<(), Status> {
                        provider.[<retain_ $name>](raw)
                    }
                    fn release(provider: &dyn Provider, raw: Self) -> Result<(), Status> {
                        provider.[<release_ $name>](raw)
                    }
                }
            )+
        }
    };
}

impl_resource! {
    RawContext => context,
    RawMem => mem_object,
    RawProgram => program,
    RawKernel => kernel,
    RawQueue => command_queue,
    RawEvent => event,
}

/// An owning, reference counted handle to a provider resource.
pub struct Handle<R: Resource> {
    raw: R,
    provider: Arc<dyn Provider>,
}

impl<R: Resource> Handle<R> {
    /// A handle to nothing.
    pub fn null(provider: Arc<dyn Provider>) -> Self {
        Self {
            raw: R::NULL,
            provider,
        }
    }
    /** Adopts `raw` without retaining it.

    # Safety
    `raw` must be null or a live identifier of `provider` carrying one reference owned by the
    caller, which is transferred to the handle. Factory results are such identifiers. */
    pub unsafe fn from_raw(provider: Arc<dyn Provider>, raw: R) -> Self {
        Self { raw, provider }
    }
    /** Binds to `raw` and retains it.

    # Safety
    `raw` must be null or a live identifier of `provider`. */
    pub unsafe fn retain_raw(provider: Arc<dyn Provider>, raw: R) -> Self {
        let handle = Self { raw, provider };
        handle.retain();
        handle
    }
    /// The raw identifier. Ownership is unaffected.
    pub fn as_raw(&self) -> R {
        self.raw
    }
    pub(crate) fn raw_ref(&self) -> &R {
        &self.raw
    }
    /// Releases ownership without decrementing the reference count.
    pub fn into_raw(self) -> R {
        let raw = self.raw;
        forget(self);
        raw
    }
    /// Is bound to the null identifier.
    pub fn is_null(&self) -> bool {
        self.raw.is_null()
    }
    /// The provider.
    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }
    /** Rebinds the handle to `raw`.

    Does nothing if `raw` is the current identifier. Otherwise `raw` is retained and the current
    identifier released.

    # Safety
    `raw` must be null or a live identifier of this handle's provider. */
    pub unsafe fn reset(&mut self, raw: R) {
        if self.raw == raw {
            return;
        }
        let old = replace(&mut self.raw, raw);
        self.retain();
        release(&*self.provider, old);
    }
    fn retain(&self) {
        if !self.raw.is_null() {
            if let Err(status) = R::retain(&*self.provider, self.raw) {
                tracing::warn!("retain of {:?} failed: {status}", self.raw);
            }
        }
    }
}

fn release<R: Resource>(provider: &dyn Provider, raw: R) {
    if !raw.is_null() {
        if let Err(status) = R::release(provider, raw) {
            tracing::warn!("release of {raw:?} failed: {status}");
        }
    }
}

impl<R: Resource> Clone for Handle<R> {
    fn clone(&self) -> Self {
        let handle = Self {
            raw: self.raw,
            provider: self.provider.clone(),
        };
        handle.retain();
        handle
    }
    /// Rebinds to `source`'s identifier, see [`reset`](Handle::reset).
    fn clone_from(&mut self, source: &Self) {
        if self.raw == source.raw {
            return;
        }
        let old = replace(&mut self.raw, source.raw);
        let old_provider = replace(&mut self.provider, source.provider.clone());
        self.retain();
        release(&*old_provider, old);
    }
}

impl<R: Resource> Drop for Handle<R> {
    fn drop(&mut self) {
        release(&*self.provider, self.raw);
    }
}

impl<R: Resource> PartialEq for Handle<R> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<R: Resource> Eq for Handle<R> {}

impl<R: Resource> PartialEq<R> for Handle<R> {
    fn eq(&self, other: &R) -> bool {
        self.raw == *other
    }
}

impl<R: Resource> Hash for Handle<R> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<R: Resource> Debug for Handle<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Handle").field(&self.raw).finish()
    }
}
