//! # Service abstractions and descriptors.
//!
//! - [`Service`] - trait for long-running, cancelable service bodies
//! - [`ServiceFn`] - closure-backed service implementation
//! - [`ServiceRef`] - shared reference to a service (`Arc<dyn Service>`)
//! - [`ServiceDescriptor`] - immutable description of one supervised service
//! - [`DescriptorBuilder`] - fluent construction of descriptors

mod builder;
mod descriptor;
mod service;
mod service_fn;

pub use builder::DescriptorBuilder;
pub use descriptor::ServiceDescriptor;
pub use service::{Service, ServiceRef};
pub use service_fn::ServiceFn;
