//! The single per-frame tick shared by the loader, the trigger tracker and every
//! mounted section.

use slotmap::{SlotMap, new_key_type};

use crate::lifecycle::SectionKey;

new_key_type! {
    /// Handle to a tick subscription.
    pub struct TickId;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Subscriber {
    Loader,
    /// Evaluates viewport triggers; subscribed before any section so edge events
    /// are delivered ahead of section playback within a frame.
    Triggers,
    Section(SectionKey),
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct FrameInfo {
    pub index: u64,
    pub dt: f64,
    pub elapsed: f64,
}

/// Subscriptions may be added or removed while a frame is being dispatched:
/// [`FrameScheduler::begin_frame`] hands out a snapshot, subscribers added
/// mid-frame first run on the next frame, and subscribers removed mid-frame are
/// skipped because [`FrameScheduler::get`] no longer resolves them.
#[derive(Debug, Default)]
pub struct FrameScheduler {
    subscribers: SlotMap<TickId, Subscriber>,
    order: Vec<TickId>,
    frames: u64,
    elapsed: f64,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, subscriber: Subscriber) -> TickId {
        let id = self.subscribers.insert(subscriber);
        self.order.push(id);
        tracing::trace!(?id, ?subscriber, "tick subscribed");
        id
    }

    /// Idempotent; returns whether `id` was live.
    pub fn unsubscribe(&mut self, id: TickId) -> bool {
        if self.subscribers.remove(id).is_none() {
            return false;
        }
        self.order.retain(|o| *o != id);
        tracing::trace!(?id, "tick unsubscribed");
        true
    }

    /// Drops every subscription.
    pub fn clear(&mut self) {
        self.subscribers.clear();
        self.order.clear();
    }

    pub fn get(&self, id: TickId) -> Option<Subscriber> {
        self.subscribers.get(id).copied()
    }

    pub fn is_live(&self, id: TickId) -> bool {
        self.subscribers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Starts a frame of `dt` seconds and returns the subscriptions to run, in
    /// subscription order.
    pub fn begin_frame(&mut self, dt: f64) -> (FrameInfo, Vec<TickId>) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.elapsed += dt;
        let info = FrameInfo {
            index: self.frames,
            dt,
            elapsed: self.elapsed,
        };
        self.frames += 1;
        (info, self.order.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_preserves_subscription_order() {
        let mut ticks = FrameScheduler::new();
        let a = ticks.subscribe(Subscriber::Loader);
        let b = ticks.subscribe(Subscriber::Triggers);
        let (info, ids) = ticks.begin_frame(0.016);
        assert_eq!(ids, vec![a, b]);
        assert_eq!(info.index, 0);
        let (info, _) = ticks.begin_frame(0.016);
        assert_eq!(info.index, 1);
        assert!((info.elapsed - 0.032).abs() < 1e-12);
    }

    #[test]
    fn changes_during_dispatch_are_safe() {
        let mut ticks = FrameScheduler::new();
        let loader = ticks.subscribe(Subscriber::Loader);
        let triggers = ticks.subscribe(Subscriber::Triggers);

        let (_, ids) = ticks.begin_frame(0.016);
        let mut ran = Vec::new();
        let mut added = None;
        for id in ids {
            let Some(sub) = ticks.get(id) else {
                continue;
            };
            ran.push(sub);
            if sub == Subscriber::Loader {
                // The loader retires itself and hands over within the same frame.
                ticks.unsubscribe(loader);
                ticks.unsubscribe(triggers);
                added = Some(ticks.subscribe(Subscriber::Triggers));
            }
        }
        assert_eq!(ran, vec![Subscriber::Loader]);

        let (_, ids) = ticks.begin_frame(0.016);
        assert_eq!(ids, vec![added.unwrap()]);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let mut ticks = FrameScheduler::new();
        let id = ticks.subscribe(Subscriber::Loader);
        assert!(ticks.unsubscribe(id));
        assert!(!ticks.unsubscribe(id));
        assert!(ticks.is_empty());
        assert!(!ticks.is_live(id));
    }

    #[test]
    fn negative_or_nan_dt_is_clamped() {
        let mut ticks = FrameScheduler::new();
        assert_eq!(ticks.begin_frame(-1.0).0.dt, 0.0);
        assert_eq!(ticks.begin_frame(f64::NAN).0.dt, 0.0);
    }
}
