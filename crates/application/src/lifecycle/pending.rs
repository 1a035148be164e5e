use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use domain::BridgeError;
use tokio::sync::oneshot;

/// Completion slot of a foreground capture request.
///
/// Resolves with the scanned payload, or with the error the request was
/// completed with. A slot dropped without completion (abandoned by a context
/// teardown) resolves to `ContextGone`.
#[derive(Debug)]
pub struct PendingScan {
    request_code: i32,
    rx: oneshot::Receiver<Result<String, BridgeError>>,
}

impl PendingScan {
    pub(crate) fn new(request_code: i32, rx: oneshot::Receiver<Result<String, BridgeError>>) -> Self {
        Self { request_code, rx }
    }

    pub fn request_code(&self) -> i32 {
        self.request_code
    }
}

impl Future for PendingScan {
    type Output = Result<String, BridgeError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(BridgeError::ContextGone)))
    }
}
