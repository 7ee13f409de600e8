//! Access gate of the federation info endpoint.

use std::cell::Cell;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use http::HeaderMap;
use http::Method;
use http::Uri;
use http::request::Parts;
use tower::BoxError;

/// What the `enabled` predicate gets to look at.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

impl From<&Parts> for RequestContext {
    fn from(parts: &Parts) -> Self {
        Self {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
        }
    }
}

thread_local! {
    static EVALUATING_PREDICATE: Cell<bool> = const { Cell::new(false) };
}

/// Whether the current thread is running an `enabled` predicate.
///
/// Panics raised while this is true are caught and turned into a denied request.
pub fn is_evaluating_predicate() -> bool {
    EVALUATING_PREDICATE.with(Cell::get)
}

/// Restores the previous flag on drop, unwinding included.
struct PredicateGuard(bool);

impl PredicateGuard {
    fn enter() -> Self {
        Self(EVALUATING_PREDICATE.with(|flag| flag.replace(true)))
    }
}

impl Drop for PredicateGuard {
    fn drop(&mut self) {
        EVALUATING_PREDICATE.with(|flag| flag.set(self.0));
    }
}

fn in_predicate<T>(f: impl FnOnce() -> T) -> T {
    let _guard = PredicateGuard::enter();
    f()
}

type EnabledFn = dyn Fn(RequestContext) -> BoxFuture<'static, Result<bool, BoxError>> + Send + Sync;

/// Whether the endpoint answers a request.
#[derive(Clone)]
pub enum Enabled {
    Always(bool),
    /// Decided per request. A predicate that fails or panics disables the endpoint.
    Predicate(Arc<EnabledFn>),
}

impl Enabled {
    /// Gate requests with an asynchronous predicate.
    pub fn predicate<F, Fut>(predicate: F) -> Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool, BoxError>> + Send + 'static,
    {
        Self::Predicate(Arc::new(move |context: RequestContext| {
            predicate(context).boxed()
        }))
    }

    /// Gate requests with a synchronous predicate.
    pub fn from_fn<F>(predicate: F) -> Self
    where
        F: Fn(&RequestContext) -> Result<bool, BoxError> + Send + Sync + 'static,
    {
        Self::predicate(move |context| futures::future::ready(predicate(&context)))
    }

    pub async fn evaluate(&self, context: RequestContext) -> bool {
        let predicate = match self {
            Self::Always(enabled) => return *enabled,
            Self::Predicate(predicate) => predicate,
        };

        let decision = std::panic::catch_unwind(AssertUnwindSafe(|| {
            in_predicate(|| predicate.as_ref()(context))
        }));
        let Ok(mut decision) = decision else {
            tracing::debug!("enabled predicate panicked, federation info is disabled");
            return false;
        };
        let decision =
            futures::future::poll_fn(move |cx| in_predicate(|| decision.as_mut().poll(cx)));
        match AssertUnwindSafe(decision).catch_unwind().await {
            Ok(Ok(enabled)) => enabled,
            Ok(Err(error)) => {
                tracing::debug!(%error, "enabled predicate failed, federation info is disabled");
                false
            }
            Err(_) => {
                tracing::debug!("enabled predicate panicked, federation info is disabled");
                false
            }
        }
    }
}

impl Default for Enabled {
    fn default() -> Self {
        Self::Always(true)
    }
}

impl From<bool> for Enabled {
    fn from(enabled: bool) -> Self {
        Self::Always(enabled)
    }
}

impl fmt::Debug for Enabled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always(enabled) => f.debug_tuple("Always").field(enabled).finish(),
            Self::Predicate(_) => f.write_str("Predicate"),
        }
    }
}
