use std::borrow::Cow;
use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::ServiceError;
use crate::policies::{BackoffPolicy, RestartPolicy};
use crate::services::{ServiceDescriptor, ServiceFn, ServiceRef};

/// Fluent builder for [`ServiceDescriptor`].
///
/// Defaults: `stack_size = 4096`, `priority = 1`, `restart = OnCrash { max_crashes: 3 }`,
/// non-essential, supervisor-wide backoff.
#[derive(Clone, Debug)]
pub struct DescriptorBuilder {
    name: Cow<'static, str>,
    stack_size: usize,
    priority: u8,
    restart: RestartPolicy,
    essential: bool,
    backoff: Option<BackoffPolicy>,
}

impl DescriptorBuilder {
    /// Creates a builder for a service called `name`.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            stack_size: 4096,
            priority: 1,
            restart: RestartPolicy::default(),
            essential: false,
            backoff: None,
        }
    }

    pub fn stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = stack_size;
        self
    }

    pub fn priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn restart(mut self, restart: RestartPolicy) -> Self {
        self.restart = restart;
        self
    }

    pub fn essential(mut self, essential: bool) -> Self {
        self.essential = essential;
        self
    }

    pub fn backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = Some(backoff);
        self
    }

    /// Builds a descriptor whose entry is the closure `f`.
    pub fn build<F, Fut>(self, f: F) -> ServiceDescriptor
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ServiceError>> + Send + 'static,
    {
        let entry: ServiceRef = ServiceFn::arc(self.name.clone(), f);
        self.build_from_service(entry)
    }

    /// Builds a descriptor around an existing service.
    ///
    /// The table key is the service's own name; the builder name is not used.
    pub fn build_from_service(self, entry: ServiceRef) -> ServiceDescriptor {
        let desc = ServiceDescriptor::new(
            entry,
            self.stack_size,
            self.priority,
            self.restart,
            self.essential,
        );
        match self.backoff {
            Some(b) => desc.with_backoff(b),
            None => desc,
        }
    }
}

impl ServiceDescriptor {
    /// Creates a builder for a service called `name`.
    pub fn builder(name: impl Into<Cow<'static, str>>) -> DescriptorBuilder {
        DescriptorBuilder::new(name)
    }
}
