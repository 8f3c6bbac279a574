/*!
Provider vocabulary shared by [clhost](https://docs.rs/clhost) and its providers.

This crate has no notion of ownership. It only names things: [status codes](status),
[raw identifiers](raw), [property ids](info), and the [flags and enums](types) that cross the
provider boundary.
*/

#![forbid(unsafe_op_in_unsafe_fn)]

pub use bytemuck;

pub mod info;
pub mod raw;
pub mod status;
pub mod types;

#[doc(inline)]
pub use status::Status;
