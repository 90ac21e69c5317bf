// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cancellable streams of live snapshots.
//!
//! Every subscription (current user, a document, a query) is a
//! [`Snapshots`] stream backed by a producer task. Dropping the stream (or
//! calling [`Snapshots::cancel`]) aborts the producer, so a subscription
//! never outlives its owner.

use futures_util::{Stream, StreamExt};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

const SNAPSHOT_BUFFER: usize = 16;

/// A live sequence of snapshots produced by a background task.
pub struct Snapshots<T> {
    inner: ReceiverStream<T>,
    task: JoinHandle<()>,
}

impl<T: Send + 'static> Snapshots<T> {
    /// Spawn `producer` and stream whatever it sends.
    ///
    /// The producer should return once `send` fails; it is aborted anyway
    /// when the stream is dropped.
    pub fn spawn<F, Fut>(producer: F) -> Self
    where
        F: FnOnce(mpsc::Sender<T>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(SNAPSHOT_BUFFER);
        let task = tokio::spawn(producer(tx));
        Self {
            inner: ReceiverStream::new(rx),
            task,
        }
    }

    /// Transform each snapshot, keeping the subscription alive as long as
    /// the returned stream.
    pub fn map<U, F>(mut self, mut f: F) -> Snapshots<U>
    where
        U: Send + 'static,
        F: FnMut(T) -> U + Send + 'static,
    {
        Snapshots::spawn(move |tx| async move {
            while let Some(item) = self.next().await {
                if tx.send(f(item)).await.is_err() {
                    return;
                }
            }
        })
    }

    /// Unsubscribe explicitly.
    pub fn cancel(self) {}
}

impl<T> Drop for Snapshots<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl<T> Stream for Snapshots<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        Pin::new(&mut self.get_mut().inner).poll_next(cx)
    }
}
