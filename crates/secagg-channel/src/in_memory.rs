//! In-memory implementation of a channel.
use crate::util::Counter;
use futures::channel::mpsc;
use futures::channel::mpsc::{unbounded, SendError};
use futures::{Sink, Stream};
use pin_project::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};

#[pin_project]
/// Two-way in-memory channel using unbounded channels. Counts the messages passing through it.
#[derive(Debug)]
pub struct InMemory<Item> {
    #[pin]
    sender: mpsc::UnboundedSender<Item>,
    #[pin]
    receiver: mpsc::UnboundedReceiver<Item>,
    sent: Counter,
    received: Counter,
}

impl<Item> InMemory<Item> {
    pub fn new_pair() -> (InMemory<Item>, InMemory<Item>) {
        let (s1, r1) = unbounded();
        let (s2, r2) = unbounded();
        let t1 = InMemory::new(s1, r2);
        let t2 = InMemory::new(s2, r1);
        (t1, t2)
    }

    fn new(sender: mpsc::UnboundedSender<Item>, receiver: mpsc::UnboundedReceiver<Item>) -> Self {
        Self {
            sender,
            receiver,
            sent: Counter::default(),
            received: Counter::default(),
        }
    }

    /// Counter of the messages sent over this channel.
    #[inline]
    pub fn sent(&self) -> Counter {
        self.sent.clone()
    }

    /// Counter of the messages received from this channel.
    #[inline]
    pub fn received(&self) -> Counter {
        self.received.clone()
    }
}

impl<Item> Stream for InMemory<Item> {
    type Item = Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        let poll = this.receiver.poll_next(cx);
        if let Poll::Ready(Some(_)) = &poll {
            *this.received += 1;
        }
        poll
    }
}

impl<Item> Sink<Item> for InMemory<Item> {
    type Error = SendError;

    fn poll_ready(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        let this = self.project();
        this.sender.poll_ready(cx)
    }

    fn start_send(self: Pin<&mut Self>, item: Item) -> Result<(), Self::Error> {
        let this = self.project();
        this.sender.start_send(item)?;
        *this.sent += 1;
        Ok(())
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        let this = self.project();
        this.sender.poll_flush(cx)
    }

    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        let this = self.project();
        this.sender.poll_close(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::InMemory;
    use futures::{SinkExt, StreamExt};

    #[tokio::test]
    async fn counts_messages() {
        let (mut a, mut b) = InMemory::<u64>::new_pair();
        a.send(1).await.unwrap();
        a.send(2).await.unwrap();
        b.send(3).await.unwrap();

        assert_eq!(Some(1), b.next().await);
        assert_eq!(Some(2), b.next().await);
        assert_eq!(Some(3), a.next().await);

        assert_eq!(2, a.sent().get());
        assert_eq!(1, a.received().get());
        assert_eq!(1, b.sent().get());
        assert_eq!(2, b.received().get());
    }

    #[tokio::test]
    async fn dropped_peer_ends_stream() {
        let (a, mut b) = InMemory::<u64>::new_pair();
        drop(a);
        assert_eq!(None, b.next().await);
        assert!(b.send(1).await.is_err());
    }
}
