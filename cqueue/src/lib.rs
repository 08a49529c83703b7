//! A bounded, lock-free single-producer/single-consumer ring buffer.
//!
//! [`BoundedQueue`] stores its elements inline and coordinates the two roles
//! with a pair of atomic indices. [`ffi`] exposes an `i32` instance of it,
//! together with a plain [`VariableCell`], to C callers.

mod cell;
pub mod ffi;
mod queue;

pub use cell::VariableCell;
pub use queue::{BoundedQueue, Consumer, DEFAULT_CAPACITY, Producer};
