//! Single-slot completion handles.
//!
//! A [`CompletionSlot`] holds at most one waiting consumer. Resolving it
//! takes the consumer out, so a second resolution finds the slot empty and
//! does nothing.

use crate::error::{Result, VpnError};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Receiving side of a pending operation
#[derive(Debug)]
pub struct Completion<T> {
    rx: oneshot::Receiver<Result<T>>,
}

impl<T> Completion<T> {
    /// A completion that is already resolved
    pub fn ready(value: Result<T>) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(value);
        Self { rx }
    }

    /// Non-blocking check. Do not poll the completion again after this
    /// returns `Some`.
    pub fn try_result(&mut self) -> Option<Result<T>> {
        match self.rx.try_recv() {
            Ok(value) => Some(value),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(abandoned())),
        }
    }
}

impl<T> Future for Completion<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or_else(|_| Err(abandoned())))
    }
}

fn abandoned() -> VpnError {
    VpnError::InvalidState("Completion dropped before it was resolved".to_string())
}

/// Holder for the one outstanding completion of an operation
#[derive(Debug)]
pub struct CompletionSlot<T> {
    name: &'static str,
    pending: Mutex<Option<oneshot::Sender<Result<T>>>>,
}

impl<T> CompletionSlot<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            pending: Mutex::new(None),
        }
    }

    /// Install a fresh consumer and hand back its receiving side
    pub fn arm(&self) -> Completion<T> {
        let (tx, rx) = oneshot::channel();
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if pending.replace(tx).is_some() {
            log::warn!("Replacing unresolved {} completion", self.name);
        }
        Completion { rx }
    }

    /// Resolve the pending consumer, if any. Returns whether one was waiting.
    pub fn complete(&self, value: Result<T>) -> bool {
        let sender = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match sender {
            Some(tx) => {
                if tx.send(value).is_err() {
                    log::debug!("{} completion receiver already gone", self.name);
                }
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
