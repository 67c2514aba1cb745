use anyhow::bail;

/// Synchronization progress of one peer. Progression is strictly forward: a state is never
///  revisited, and media is accepted only in `Synced`.
///
/// Producer and consumer run through the same states; the consumer's first step (sync record
///  seen, delay request sent) maps to `SyncSent` as well.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub enum SyncState {
    Unsynced,
    SyncSent,
    DelayPending,
    DelaySent,
    Synced,
    Terminated,
}

impl SyncState {
    pub fn is_synced(&self) -> bool {
        matches!(self, SyncState::Synced)
    }

    pub fn advance_to(&mut self, next: SyncState) -> anyhow::Result<()> {
        if next <= *self {
            bail!("sync state may only move forward, not {:?} -> {:?}", self, next);
        }
        *self = next;
        Ok(())
    }
}
