//! Channel and space subscriptions that survive reconnects.

use std::collections::HashSet;

use parking_lot::RwLock;
use scatter_proto::ClientFrame;

/// The channel and space ids a gateway re-subscribes to after every
/// successful authentication.
///
/// Mutated only through `track_*`/`untrack_*`; the resubscribe step only
/// reads it. Entries never expire on their own.
#[derive(Debug, Default)]
pub struct SubscriptionTracker {
    channels: RwLock<HashSet<String>>,
    spaces: RwLock<HashSet<String>>,
}

impl SubscriptionTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a channel. Returns `false` if it was already tracked.
    pub fn track_channel(&self, channel_id: impl Into<String>) -> bool {
        self.channels.write().insert(channel_id.into())
    }

    /// Stop tracking a channel. Returns `false` if it was not tracked.
    pub fn untrack_channel(&self, channel_id: &str) -> bool {
        self.channels.write().remove(channel_id)
    }

    /// Track a space. Returns `false` if it was already tracked.
    pub fn track_space(&self, space_id: impl Into<String>) -> bool {
        self.spaces.write().insert(space_id.into())
    }

    /// Stop tracking a space. Returns `false` if it was not tracked.
    pub fn untrack_space(&self, space_id: &str) -> bool {
        self.spaces.write().remove(space_id)
    }

    /// Whether a channel is tracked.
    #[must_use]
    pub fn is_tracking_channel(&self, channel_id: &str) -> bool {
        self.channels.read().contains(channel_id)
    }

    /// Whether a space is tracked.
    #[must_use]
    pub fn is_tracking_space(&self, space_id: &str) -> bool {
        self.spaces.read().contains(space_id)
    }

    /// Snapshot of tracked channel ids, sorted.
    #[must_use]
    pub fn channels(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.channels.read().iter().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Snapshot of tracked space ids, sorted.
    #[must_use]
    pub fn spaces(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.spaces.read().iter().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// One subscribe frame per tracked channel, then one per tracked space.
    #[must_use]
    pub fn resubscribe_frames(&self) -> Vec<ClientFrame> {
        self.channels()
            .into_iter()
            .map(ClientFrame::subscribe)
            .chain(self.spaces().into_iter().map(ClientFrame::subscribe_space))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_track_is_idempotent() {
        let tracker = SubscriptionTracker::new();
        assert!(tracker.track_channel("c1"));
        assert!(!tracker.track_channel("c1"));
        assert_eq!(tracker.channels(), vec!["c1".to_string()]);
    }

    #[test]
    fn test_untrack_missing_is_noop() {
        let tracker = SubscriptionTracker::new();
        assert!(!tracker.untrack_space("s1"));
        tracker.track_space("s1");
        assert!(tracker.untrack_space("s1"));
        assert!(tracker.spaces().is_empty());
    }

    #[test]
    fn test_channels_and_spaces_are_separate() {
        let tracker = SubscriptionTracker::new();
        tracker.track_channel("x");
        assert!(tracker.is_tracking_channel("x"));
        assert!(!tracker.is_tracking_space("x"));
    }

    #[test]
    fn test_resubscribe_frames() {
        let tracker = SubscriptionTracker::new();
        tracker.track_channel("c2");
        tracker.track_channel("c1");
        tracker.track_space("s1");
        tracker.untrack_channel("c2");

        assert_eq!(
            tracker.resubscribe_frames(),
            vec![ClientFrame::subscribe("c1"), ClientFrame::subscribe_space("s1")]
        );
    }

    proptest! {
        #[test]
        fn resubscribe_has_one_frame_per_distinct_id(
            channels in proptest::collection::vec("[a-c][0-3]", 0..20),
            spaces in proptest::collection::vec("[a-c][0-3]", 0..20),
        ) {
            let tracker = SubscriptionTracker::new();
            for id in &channels {
                tracker.track_channel(id.clone());
            }
            for id in &spaces {
                tracker.track_space(id.clone());
            }

            let distinct_channels: HashSet<&String> = channels.iter().collect();
            let distinct_spaces: HashSet<&String> = spaces.iter().collect();
            let frames = tracker.resubscribe_frames();
            prop_assert_eq!(frames.len(), distinct_channels.len() + distinct_spaces.len());

            let unique: HashSet<String> = frames
                .iter()
                .map(|f| serde_json::to_string(f).unwrap_or_default())
                .collect();
            prop_assert_eq!(unique.len(), frames.len());
        }
    }
}
