//! Transport and transport-context seams, plus the scoped context guard.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::types::{Endpoint, Request, Response, Result, TransportError};

/// Factory for per-exchange transport contexts.
///
/// Every exchange opens its own context; contexts are never shared between
/// concurrent exchanges.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a client context able to reach `endpoint`.
    async fn open(&self, endpoint: &Endpoint) -> Result<Box<dyn TransportContext>>;
}

/// An open client session.
#[async_trait]
pub trait TransportContext: Send {
    /// Send `request` and wait for its reply.
    ///
    /// Any status is returned as `Ok`; only failures to obtain a reply at all
    /// are errors.
    async fn request(&mut self, request: &Request) -> Result<Response>;

    /// Tear the context down. Called exactly once by [`ContextGuard`].
    fn release(&mut self) -> Result<()>;
}

/// Owns a context for the duration of one exchange and releases it on every
/// exit path.
///
/// [`close`](Self::close) releases explicitly and reports teardown failures.
/// If the guard is dropped without `close` (early return, panic, or the
/// owning future being cancelled) the context is released from `Drop` and a
/// teardown failure is only logged.
pub struct ContextGuard {
    inner: Option<Box<dyn TransportContext>>,
}

impl ContextGuard {
    pub fn new(context: Box<dyn TransportContext>) -> Self {
        Self {
            inner: Some(context),
        }
    }

    pub async fn request(&mut self, request: &Request) -> Result<Response> {
        match self.inner.as_mut() {
            Some(context) => context.request(request).await,
            None => Err(TransportError::Closed),
        }
    }

    /// Release the context now.
    pub fn close(mut self) -> Result<()> {
        match self.inner.take() {
            Some(mut context) => {
                debug!("Releasing transport context");
                context.release()
            }
            None => Ok(()),
        }
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        if let Some(mut context) = self.inner.take() {
            debug!("Releasing transport context on early exit");
            if let Err(e) = context.release() {
                warn!("Failed to release transport context: {}", e);
            }
        }
    }
}
