// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! One-shot completion handle for callback-style collaborators.
//!
//! A collaborator that cannot return a value or a future receives a
//! [`Completion`] and calls it exactly once, possibly from another task.
//! Consuming `self` makes a second call impossible; dropping the handle
//! without calling it is observed by the waiting attempt as a failure.

use tokio::sync::oneshot;

/// Handle a collaborator uses to deliver its result.
#[derive(Debug)]
pub struct Completion<T> {
    tx: oneshot::Sender<T>,
}

/// Receiving side held by the authentication attempt.
#[derive(Debug)]
pub(crate) struct Pending<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> Completion<T> {
    pub(crate) fn channel() -> (Self, Pending<T>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, Pending { rx })
    }

    /// Deliver the result. A no-op if the attempt was already abandoned.
    pub fn complete(self, value: T) {
        if self.tx.send(value).is_err() {
            tracing::debug!("Completion delivered after the authentication attempt was abandoned");
        }
    }

    /// Whether the waiting attempt has gone away (e.g. the request was aborted).
    pub fn is_abandoned(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<T> Pending<T> {
    /// Wait for the collaborator. `None` if the handle was dropped unused.
    pub(crate) async fn wait(self) -> Option<T> {
        self.rx.await.ok()
    }
}
