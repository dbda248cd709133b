//! Explicit subscribe/unsubscribe event fan-out.
//!
//! Each subscriber gets its own unbounded channel and drains it with
//! `try_recv` from the owner's tick, the same way the run loop drains every
//! other background channel.

use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

pub struct Subscription<E> {
  pub id: SubscriptionId,
  pub rx: mpsc::UnboundedReceiver<E>,
}

impl<E> Subscription<E> {
  /// Drain everything published so far.
  pub fn drain(&mut self) -> Vec<E> {
    std::iter::from_fn(|| self.rx.try_recv().ok()).collect()
  }
}

pub struct EventBus<E> {
  subscribers: Vec<(SubscriptionId, mpsc::UnboundedSender<E>)>,
  next_id: u64,
}

impl<E> Default for EventBus<E> {
  fn default() -> Self {
    Self { subscribers: Vec::new(), next_id: 0 }
  }
}

impl<E: Clone> EventBus<E> {
  pub fn subscribe(&mut self) -> Subscription<E> {
    let id = SubscriptionId(self.next_id);
    self.next_id += 1;
    let (tx, rx) = mpsc::unbounded_channel();
    self.subscribers.push((id, tx));
    Subscription { id, rx }
  }

  pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
    let before = self.subscribers.len();
    self.subscribers.retain(|(sid, _)| *sid != id);
    self.subscribers.len() != before
  }

  /// Deliver `event` to every live subscriber. Subscribers whose receiver
  /// was dropped are pruned.
  pub fn publish(&mut self, event: E) {
    self.subscribers.retain(|(_, tx)| tx.send(event.clone()).is_ok());
  }

  #[cfg(test)]
  pub fn subscriber_count(&self) -> usize {
    self.subscribers.len()
  }
}
