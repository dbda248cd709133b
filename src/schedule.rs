//! Cancellable one-shot task queue driven by an external clock.
//!
//! Nothing here sleeps: the owner calls [`Timers::pop_due`] from its tick
//! with the current instant. A task that has been cancelled is gone from the
//! collection, so it can never be returned afterwards.

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

#[derive(Debug)]
pub struct Timers<T> {
  queue: BTreeMap<(Instant, TaskId), T>,
  deadlines: HashMap<TaskId, Instant>,
  next_id: u64,
}

impl<T> Default for Timers<T> {
  fn default() -> Self {
    Self { queue: BTreeMap::new(), deadlines: HashMap::new(), next_id: 0 }
  }
}

impl<T> Timers<T> {
  pub fn new() -> Self {
    Self::default()
  }

  /// Schedule `task` to become due at `deadline`. Tasks sharing a deadline
  /// fire in scheduling order.
  pub fn schedule_at(&mut self, deadline: Instant, task: T) -> TaskId {
    let id = TaskId(self.next_id);
    self.next_id += 1;
    self.queue.insert((deadline, id), task);
    self.deadlines.insert(id, deadline);
    id
  }

  #[cfg(test)]
  pub fn cancel(&mut self, id: TaskId) -> Option<T> {
    let deadline = self.deadlines.remove(&id)?;
    self.queue.remove(&(deadline, id))
  }

  /// Cancel every task matching `pred`; returns how many were removed.
  pub fn cancel_where(&mut self, mut pred: impl FnMut(&T) -> bool) -> usize {
    let doomed: Vec<(Instant, TaskId)> = self.queue.iter().filter(|(_, t)| pred(t)).map(|(k, _)| *k).collect();
    for key in &doomed {
      self.queue.remove(key);
      self.deadlines.remove(&key.1);
    }
    doomed.len()
  }

  /// Drop everything at once.
  pub fn cancel_all(&mut self) -> usize {
    let n = self.queue.len();
    self.queue.clear();
    self.deadlines.clear();
    n
  }

  /// Remove and return the earliest task whose deadline is `<= now`,
  /// together with that deadline.
  pub fn pop_due(&mut self, now: Instant) -> Option<(Instant, T)> {
    let (&(deadline, id), _) = self.queue.first_key_value()?;
    if deadline > now {
      return None;
    }
    self.deadlines.remove(&id);
    self.queue.remove(&(deadline, id)).map(|task| (deadline, task))
  }

  #[cfg(test)]
  pub fn next_deadline(&self) -> Option<Instant> {
    self.queue.first_key_value().map(|((deadline, _), _)| *deadline)
  }

  #[cfg(test)]
  pub fn contains(&self, id: TaskId) -> bool {
    self.deadlines.contains_key(&id)
  }

  #[cfg(test)]
  pub fn len(&self) -> usize {
    self.queue.len()
  }

  #[cfg(test)]
  pub fn is_empty(&self) -> bool {
    self.queue.is_empty()
  }
}
