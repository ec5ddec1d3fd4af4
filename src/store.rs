//! Current-frame store.
//!
//! `FrameStore` holds exactly one frame. `replace` swaps it wholesale and then
//! calls every subscriber, in registration order, with the new value before
//! returning. Everything runs on the caller's thread, so a reader can never
//! observe a half-installed frame and notifications follow replacement order.

use std::rc::Rc;

use crate::frame::Frame;

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&Frame)>;

pub struct FrameStore {
    current: Rc<Frame>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_id: u64,
    generation: u64,
}

impl FrameStore {
    pub fn new() -> Self {
        Self {
            current: Rc::new(Frame::empty()),
            subscribers: Vec::new(),
            next_id: 0,
            generation: 0,
        }
    }

    /// Latest installed frame, or the empty sentinel before the first one.
    pub fn current(&self) -> Rc<Frame> {
        Rc::clone(&self.current)
    }

    /// Number of frames installed so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Install `frame` as the current value, then notify subscribers.
    pub fn replace(&mut self, frame: Frame) {
        self.current = Rc::new(frame);
        self.generation += 1;
        log::debug!(
            "frame #{} installed: {} detector(s), {} detection(s)",
            self.generation,
            self.current.results().len(),
            self.current.detection_count()
        );

        let frame = Rc::clone(&self.current);
        for (_, subscriber) in self.subscribers.iter_mut() {
            subscriber(frame.as_ref());
        }
    }

    pub fn subscribe<F>(&mut self, subscriber: F) -> SubscriptionId
    where
        F: FnMut(&Frame) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    /// Remove a subscriber. Returns false if it was not registered.
    ///
    /// The subscriber closure is dropped here, releasing anything it captured.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl Default for FrameStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FrameStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameStore")
            .field("current", &self.current)
            .field("subscribers", &self.subscribers.len())
            .field("generation", &self.generation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn frame(names: &[&str]) -> Frame {
        let json = names
            .iter()
            .map(|n| format!(r#"{{"detector_name": "{n}", "detections": []}}"#))
            .collect::<Vec<_>>()
            .join(",");
        Frame::parse(&format!("[{json}]")).unwrap()
    }

    #[test]
    fn current_is_empty_sentinel_before_first_replace() {
        let store = FrameStore::new();
        assert!(store.current().is_empty());
        assert_eq!(store.generation(), 0);
    }

    #[test]
    fn replace_discards_previous_frame() {
        let mut store = FrameStore::new();
        store.replace(frame(&["a", "b"]));
        store.replace(frame(&["c"]));
        let current = store.current();
        assert_eq!(current.results().len(), 1);
        assert_eq!(current.results()[0].detector_name, "c");
        assert_eq!(store.generation(), 2);
    }

    #[test]
    fn held_snapshot_is_not_affected_by_later_replace() {
        let mut store = FrameStore::new();
        store.replace(frame(&["a"]));
        let held = store.current();
        store.replace(frame(&["b"]));
        assert_eq!(held.results()[0].detector_name, "a");
    }

    #[test]
    fn subscribers_see_new_value_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut store = FrameStore::new();

        let first = Rc::clone(&log);
        store.subscribe(move |f| first.borrow_mut().push(format!("1:{}", f.results()[0].detector_name)));
        let second = Rc::clone(&log);
        store.subscribe(move |f| second.borrow_mut().push(format!("2:{}", f.results()[0].detector_name)));

        store.replace(frame(&["x"]));
        store.replace(frame(&["y"]));

        assert_eq!(*log.borrow(), vec!["1:x", "2:x", "1:y", "2:y"]);
    }

    #[test]
    fn unsubscribe_stops_notifications_and_drops_closure() {
        let captured = Rc::new(());
        let calls = Rc::new(RefCell::new(0));
        let mut store = FrameStore::new();

        let held = Rc::clone(&captured);
        let counter = Rc::clone(&calls);
        let id = store.subscribe(move |_| {
            let _ = &held;
            *counter.borrow_mut() += 1;
        });
        store.replace(frame(&["a"]));
        assert_eq!(Rc::strong_count(&captured), 2);

        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        assert_eq!(Rc::strong_count(&captured), 1);

        store.replace(frame(&["b"]));
        assert_eq!(*calls.borrow(), 1);
        assert_eq!(store.subscriber_count(), 0);
    }
}
