use tokio::sync::{Mutex, Notify};

/// Single-slot rendezvous between the receive loop and one session worker.
///
/// `deposit` never waits for the consumer: a value deposited while the previous one is still
///  unconsumed replaces it. For a live stream the latest datagram is the valuable one - a
///  worker that lagged behind gets the freshest data instead of a backlog.
pub struct HandoffSlot<T> {
    slot: Mutex<Option<T>>,
    ready: Notify,
}

impl<T> HandoffSlot<T> {
    pub fn new() -> HandoffSlot<T> {
        HandoffSlot {
            slot: Mutex::new(None),
            ready: Notify::new(),
        }
    }

    /// Deposits a value, returning the unconsumed one it replaced (if any). Only ever blocks
    ///  for the slot's own mutex, never for the consumer.
    pub async fn deposit(&self, value: T) -> Option<T> {
        let overwritten = self.slot.lock().await.replace(value);
        self.ready.notify_one();
        overwritten
    }

    /// Takes the deposited value, suspending until one is present.
    pub async fn take(&self) -> T {
        loop {
            if let Some(value) = self.slot.lock().await.take() {
                return value;
            }
            // a deposit between the check above and this await leaves a stored permit, so the
            //  wakeup is never lost
            self.ready.notified().await;
        }
    }
}

impl<T> Default for HandoffSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;

    #[tokio::test]
    async fn test_deposit_then_take() {
        let slot = HandoffSlot::new();
        assert_eq!(slot.deposit(1).await, None);
        assert_eq!(slot.take().await, 1);
    }

    #[tokio::test]
    async fn test_latest_deposit_wins() {
        let slot = HandoffSlot::new();
        assert_eq!(slot.deposit(1).await, None);
        assert_eq!(slot.deposit(2).await, Some(1));
        assert_eq!(slot.deposit(3).await, Some(2));

        assert_eq!(slot.take().await, 3);
    }

    #[tokio::test]
    async fn test_take_suspends_until_deposit() {
        let slot = Arc::new(HandoffSlot::new());

        let taker = {
            let slot = slot.clone();
            tokio::spawn(async move { slot.take().await })
        };

        tokio::task::yield_now().await;
        slot.deposit(42).await;

        let taken = timeout(Duration::from_secs(5), taker).await.unwrap().unwrap();
        assert_eq!(taken, 42);
    }

    #[tokio::test]
    async fn test_slot_is_reusable_after_take() {
        let slot = HandoffSlot::new();

        slot.deposit(1).await;
        assert_eq!(slot.take().await, 1);

        assert_eq!(slot.deposit(2).await, None);
        assert_eq!(slot.take().await, 2);
    }
}
