//! # Operation abstractions.
//!
//! - [`Operation`] - trait for opaque async request functions
//! - [`OperationFn`] - function-backed operation implementation
//! - [`OperationRef`] - shared reference to an operation (`Arc<dyn Operation>`)
//! - [`Registration`] - base name + concurrency mode

mod operation;
mod operation_fn;
mod registration;

pub use operation::{BoxOperationFuture, Operation, OperationRef};
pub use operation_fn::OperationFn;
pub use registration::Registration;
