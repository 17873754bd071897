//! # Closure-backed service (`ServiceFn`)
//!
//! [`ServiceFn`] wraps a closure `F: Fn(CancellationToken) -> Fut`, producing a fresh
//! future per start. Whatever the closure captures is the service's context: share it
//! with `Arc<...>` when it must outlive restarts.
//!
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use tokio_util::sync::CancellationToken;
//! use initvisor::{ServiceFn, ServiceRef, ServiceError};
//!
//! let boots = Arc::new(AtomicU32::new(0));
//! let ctx = Arc::clone(&boots);
//! let svc: ServiceRef = ServiceFn::arc("link", move |token: CancellationToken| {
//!     let ctx = Arc::clone(&ctx);
//!     async move {
//!         ctx.fetch_add(1, Ordering::Relaxed);
//!         token.cancelled().await;
//!         Ok::<_, ServiceError>(())
//!     }
//! });
//!
//! assert_eq!(svc.name(), "link");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ServiceError;
use crate::services::service::Service;

/// Closure-backed service implementation.
#[derive(Debug)]
pub struct ServiceFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> ServiceFn<F> {
    /// Creates a new closure-backed service.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self { name: name.into(), f }
    }

    /// Creates the service and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Service for ServiceFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ServiceError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: CancellationToken) -> Result<(), ServiceError> {
        (self.f)(ctx).await
    }
}
