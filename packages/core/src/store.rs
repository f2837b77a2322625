//! In-memory alert inbox.
//!
//! `AlertInbox` holds alerts raised by signal derivation until the UI
//! drains them. Each alert is handed out once. When the inbox is full the
//! oldest alert is evicted before the new one is inserted (ring-buffer
//! semantics backed by `VecDeque`).
//!
//! The inbox itself is not `Sync`; callers wrap it in
//! `Arc<RwLock<AlertInbox>>` so it can be shared between the polling task
//! and the Axum handlers.

use std::collections::VecDeque;

use crate::signals::Alert;

/// Default maximum number of undelivered alerts retained.
pub const DEFAULT_CAPACITY: usize = 500;

#[derive(Debug)]
pub struct AlertInbox {
    data: VecDeque<Alert>,
    capacity: usize,
}

impl AlertInbox {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            capacity: capacity.max(1),
        }
    }

    /// Append an alert, evicting the oldest if the inbox is full.
    pub fn push(&mut self, alert: Alert) {
        if self.data.len() >= self.capacity {
            self.data.pop_front();
        }
        self.data.push_back(alert);
    }

    pub fn push_all(&mut self, alerts: impl IntoIterator<Item = Alert>) {
        for alert in alerts {
            self.push(alert);
        }
    }

    /// Take every pending alert, oldest first. The inbox is empty afterwards.
    pub fn drain(&mut self) -> Vec<Alert> {
        self.data.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Default for AlertInbox {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::signals::{AlertKind, Severity};

    fn make_alert(title: &str) -> Alert {
        Alert {
            kind: AlertKind::FareDrop,
            severity: Severity::Warning,
            title: title.to_string(),
            message: String::new(),
            subject: "MIA-JFK-2026-11-01".to_string(),
            raised_at: Utc::now(),
        }
    }

    #[test]
    fn new_inbox_is_empty() {
        let inbox = AlertInbox::default();
        assert!(inbox.is_empty());
        assert_eq!(inbox.len(), 0);
    }

    #[test]
    fn push_evicts_oldest_when_at_capacity() {
        let mut inbox = AlertInbox::new(3);
        inbox.push_all(["a", "b", "c", "d"].map(make_alert));

        assert_eq!(inbox.len(), 3);
        let titles: Vec<_> = inbox.drain().into_iter().map(|a| a.title).collect();
        assert_eq!(titles, ["b", "c", "d"]);
    }

    #[test]
    fn drain_hands_out_each_alert_once() {
        let mut inbox = AlertInbox::new(10);
        inbox.push(make_alert("a"));
        inbox.push(make_alert("b"));

        assert_eq!(inbox.drain().len(), 2);
        assert!(inbox.drain().is_empty());
        assert!(inbox.is_empty());
    }

    #[test]
    fn zero_capacity_still_keeps_latest() {
        let mut inbox = AlertInbox::new(0);
        inbox.push(make_alert("a"));
        inbox.push(make_alert("b"));
        assert_eq!(inbox.drain()[0].title, "b");
    }
}
