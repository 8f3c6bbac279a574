/*!
Raw provider identifiers.

Identifiers are opaque, pointer sized values handed out by a provider. They are stored as
addresses so that they are `Send + Sync` and can be compared and hashed. Zero is the null
identifier.
*/

use bytemuck::{Pod, Zeroable};
use std::{
    ffi::c_void,
    fmt::{self, Debug},
    hash::Hash,
};

/// Common interface of the raw identifier types.
pub trait RawHandle: Pod + Eq + Hash + Debug + Send + Sync + 'static {
    /// The null identifier.
    const NULL: Self;
    /// Name of the identifier type, ie "RawContext".
    const NAME: &'static str;
    /// Creates an identifier from an address.
    fn from_addr(addr: usize) -> Self;
    /// The address.
    fn addr(self) -> usize;
    /// Is the null identifier.
    fn is_null(self) -> bool {
        self.addr() == 0
    }
    /// Creates an identifier from a provider pointer.
    fn from_ptr(ptr: *mut c_void) -> Self {
        Self::from_addr(ptr as usize)
    }
    /// The identifier as a provider pointer.
    fn as_ptr(self) -> *mut c_void {
        self.addr() as *mut c_void
    }
}

macro_rules! raw_handles {
    ($($(#[$meta:meta])* $name:ident,)+) => {
        $(
            $(#[$meta])*
            #[repr(transparent)]
            #[derive(Clone, Copy, Default, Eq, PartialEq, Hash, Pod, Zeroable)]
            pub struct $name(usize);

            impl $name {
                /// The null identifier.
                pub const NULL: Self = Self(0);
                /// Creates an identifier from an address.
                pub const fn from_addr(addr: usize) -> Self {
                    Self(addr)
                }
                /// The address.
                pub const fn addr(self) -> usize {
                    self.0
                }
                /// Is the null identifier.
                pub const fn is_null(self) -> bool {
                    self.0 == 0
                }
            }

            impl RawHandle for $name {
                const NULL: Self = Self(0);
                const NAME: &'static str = stringify!($name);
                fn from_addr(addr: usize) -> Self {
                    Self(addr)
                }
                fn addr(self) -> usize {
                    self.0
                }
            }

            impl Debug for $name {
                fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                    write!(f, "{}({:#x})", stringify!($name), self.0)
                }
            }
        )+
    };
}

raw_handles! {
    /// A platform identifier. Not reference counted.
    RawPlatform,
    /// A device identifier. Not reference counted.
    RawDevice,
    /// A context identifier.
    RawContext,
    /// A memory object (buffer or image) identifier.
    RawMem,
    /// A program identifier.
    RawProgram,
    /// A kernel identifier.
    RawKernel,
    /// A command queue identifier.
    RawQueue,
    /// An event identifier.
    RawEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_handle_null() {
        assert!(RawMem::NULL.is_null());
        assert!(<RawMem as RawHandle>::NULL.is_null());
        assert!(!RawMem::from_addr(0x10).is_null());
        assert_eq!(RawEvent::default(), RawEvent::NULL);
    }

    #[test]
    fn raw_handle_ptr() {
        let raw = RawQueue::from_addr(0x1230);
        assert_eq!(RawQueue::from_ptr(RawHandle::as_ptr(raw)), raw);
        assert_eq!(format!("{raw:?}"), "RawQueue(0x1230)");
    }

    #[test]
    fn raw_handle_words() {
        let raws = [RawDevice::from_addr(1), RawDevice::from_addr(2)];
        let words: &[usize] = bytemuck::cast_slice(&raws);
        assert_eq!(words, &[1, 2]);
    }
}
