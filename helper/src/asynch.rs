//! `async` related utilities.

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use futures::{channel::oneshot, FutureExt};

/// A oneshot receiver that resolves to `T` instead of `Result<T, Canceled>`.
///
/// The sender side must guarantee a value is always sent before it is
/// dropped; this future panics otherwise.
pub struct InfallibleOneshotReceiver<T>(oneshot::Receiver<T>);

impl<T> From<oneshot::Receiver<T>> for InfallibleOneshotReceiver<T> {
    fn from(rx: oneshot::Receiver<T>) -> Self {
        Self(rx)
    }
}

impl<T> Future for InfallibleOneshotReceiver<T> {
    type Output = T;

    #[inline]
    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.0
            .poll_unpin(cx)
            .map(|res| res.expect("sender was dropped without sending a response"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_to_the_sent_value() {
        let (tx, rx) = futures::channel::oneshot::channel::<u64>();

        tx.send(101).unwrap();

        let rx = InfallibleOneshotReceiver::from(rx);
        assert_eq!(rx.await, 101);
    }
}
