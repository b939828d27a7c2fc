//! Async invoker
//!
//! Dispatches a built request on a background task and suspends the caller
//! until exactly one of: a response (< 400), a translated [`ApiError`]
//! (>= 400), a transport failure, or cancellation.
//!
//! [`ApiError`]: crate::error::ApiError

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use reqwest::Response;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::{
    error::{ClientError, Result},
    request::OutgoingRequest,
    translate::translate_error,
};

/// One-shot completion with a single-resolution guard.
///
/// Whichever of [`resolve`](Completion::resolve) and
/// [`cancel`](Completion::cancel) runs first wins; the other is a no-op.
#[derive(Debug)]
pub struct Completion<T> {
    resolved: AtomicBool,
    sender: Mutex<Option<oneshot::Sender<T>>>,
}

impl<T> Completion<T> {
    pub fn channel() -> (Arc<Self>, oneshot::Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        let completion = Arc::new(Self {
            resolved: AtomicBool::new(false),
            sender: Mutex::new(Some(tx)),
        });
        (completion, rx)
    }

    /// Deliver `value`. Returns false, dropping `value`, if the completion
    /// was already resolved or cancelled.
    pub fn resolve(&self, value: T) -> bool {
        if !self.claim() {
            return false;
        }
        match self.sender.lock().take() {
            Some(tx) => tx.send(value).is_ok(),
            None => false,
        }
    }

    /// Cancel the completion. Returns false if it had already been resolved.
    pub fn cancel(&self) -> bool {
        if !self.claim() {
            return false;
        }
        self.sender.lock().take();
        true
    }

    pub fn is_settled(&self) -> bool {
        self.resolved.load(Ordering::SeqCst)
    }

    fn claim(&self) -> bool {
        self.resolved
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

/// Aborts the worker when the waiting side goes away
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Dispatch `request` on `transport` and wait for its outcome.
///
/// `transport` is the snapshot captured for this call. Dropping the returned
/// future aborts the in-flight call just like cancelling `cancel` does.
pub async fn invoke(
    transport: reqwest::Client,
    request: OutgoingRequest,
    cancel: &CancellationToken,
) -> Result<Response> {
    if cancel.is_cancelled() {
        return Err(ClientError::Cancelled);
    }

    let method = request.method.clone();
    let url = request.url.clone();
    let request = request.into_reqwest(&transport)?;
    debug!("HTTP {}: {}", method, url);

    let result = run_on_worker(dispatch(transport, request), cancel).await;
    match &result {
        Err(ClientError::Cancelled) => debug!("HTTP {}: {} cancelled", method, url),
        Err(ClientError::Dispatch(reason)) => warn!("HTTP {}: {} failed: {}", method, url, reason),
        _ => {}
    }
    result
}

/// Run `work` on a background task, resolving with its output or with
/// [`ClientError::Cancelled`], whichever comes first.
async fn run_on_worker<F, T>(work: F, cancel: &CancellationToken) -> Result<T>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let (completion, receiver) = Completion::channel();
    let mut worker = {
        let completion = completion.clone();
        AbortOnDrop(tokio::spawn(async move {
            let outcome = work.await;
            if !completion.resolve(outcome) {
                trace!("Discarding late completion of a cancelled call");
            }
        }))
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            completion.cancel();
            Err(ClientError::Cancelled)
        }
        outcome = receiver => outcome.unwrap_or_else(|_| {
            Err(ClientError::Dispatch("worker ended without a result".to_string()))
        }),
        // the worker resolves before it returns, so finishing first means it failed
        joined = &mut worker.0 => {
            let reason = match joined {
                Err(join) => join.to_string(),
                Ok(()) => "worker ended without a result".to_string(),
            };
            Err(ClientError::Dispatch(reason))
        }
    }
}

async fn dispatch(transport: reqwest::Client, request: reqwest::Request) -> Result<Response> {
    let response = transport.execute(request).await?;
    let status = response.status().as_u16();
    if status < 400 {
        return Ok(response);
    }

    let headers = response.headers().clone();
    // consumes the body, releasing the connection
    let body = response.bytes().await?;
    Err(ClientError::Http(translate_error(status, &headers, &body)))
}
