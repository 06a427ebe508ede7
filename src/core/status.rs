//! # Status Lifecycle
//!
//! A [`StatusEvent`] is one user-visible progress or result message. Its
//! owner publishes it on [`Topic::Status`](crate::core::bus::Topic::Status)
//! and keeps mutating the same value: `update()` keeps it alive across long
//! polling loops, `done()` marks it finished.
//!
//! ```text
//! send()  ──►  in_progress  ──update()──►  in_progress  ──done()──►  finished
//!   │                                                                   │
//!   └── assigns id + created_at (once)             toast: hides after 2s
//! ```
//!
//! The engine never removes events. The display drops them once
//! [`StatusEvent::has_expired`] turns true.

use std::error::Error;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use log::debug;
use uuid::Uuid;

use crate::core::bus::{BusEvent, EventBus};

/// Timeout given to events sent without one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
/// How far `update()` pushes the expiry past now.
pub const UPDATE_EXTENSION: Duration = Duration::from_secs(5);
/// Visible time left to a toast once it is done.
pub const TOAST_HIDE_AFTER: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq)]
pub struct StatusEvent {
    id: Option<Uuid>,
    created_at: Option<DateTime<Utc>>,
    timeout: Option<Duration>,
    pub message: String,
    pub in_progress: bool,
    pub failure: bool,
    pub is_toast: bool,
}

impl StatusEvent {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            id: None,
            created_at: None,
            timeout: None,
            message: message.into(),
            in_progress: false,
            failure: false,
            is_toast: false,
        }
    }

    pub fn in_progress(message: impl Into<String>) -> Self {
        Self {
            in_progress: true,
            ..Self::new(message)
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            failure: true,
            ..Self::new(message)
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn toast(mut self) -> Self {
        self.is_toast = true;
        self
    }

    /// Assigned on first send, `None` before.
    pub fn id(&self) -> Option<Uuid> {
        self.id
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn timeout(&self) -> Duration {
        self.timeout.unwrap_or(DEFAULT_TIMEOUT)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let created_at = self.created_at?;
        let timeout = TimeDelta::from_std(self.timeout()).unwrap_or(TimeDelta::MAX);
        created_at.checked_add_signed(timeout)
    }

    pub fn has_expired(&self) -> bool {
        self.has_expired_at(Utc::now())
    }

    /// True iff `now` is strictly past `created_at + timeout`. Unsent events never expire.
    pub fn has_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|expires_at| now > expires_at)
    }

    /// Publishes the event, assigning id, timestamp and default timeout
    /// only if they are still unset.
    pub fn send(&mut self, bus: &EventBus) {
        if self.id.is_none() {
            self.id = Some(Uuid::new_v4());
        }
        if self.created_at.is_none() {
            self.created_at = Some(Utc::now());
        }
        if self.timeout.is_none() {
            self.timeout = Some(DEFAULT_TIMEOUT);
        }
        debug!("Status {:?}: {}", self.id, self.message);
        bus.publish(BusEvent::Status(self.clone()));
    }

    /// Keeps the event alive until at least now + [`UPDATE_EXTENSION`] and
    /// republishes. A later expiry already in place is kept.
    pub fn update(&mut self, bus: &EventBus) {
        let previous = self.timeout;
        self.extend_from_now(UPDATE_EXTENSION);
        if let (Some(previous), Some(extended)) = (previous, self.timeout)
            && previous > extended
        {
            self.timeout = Some(previous);
        }
        self.send(bus);
    }

    /// Marks the event finished and republishes it.
    pub fn done(&mut self, bus: &EventBus) {
        self.in_progress = false;
        if self.is_toast {
            self.extend_from_now(TOAST_HIDE_AFTER);
        }
        self.send(bus);
    }

    // `created_at` is fixed, so the window moves by growing `timeout`.
    fn extend_from_now(&mut self, extension: Duration) {
        let Some(created_at) = self.created_at else {
            self.timeout = Some(extension);
            return;
        };
        let elapsed = (Utc::now() - created_at).to_std().unwrap_or_default();
        self.timeout = Some(elapsed + extension);
    }
}

/// Owner's handle to a sent [`StatusEvent`].
///
/// Holds the event and the bus it was published on, so finishing the work
/// is a single `done()` call.
pub struct StatusHandle {
    event: StatusEvent,
    bus: EventBus,
}

impl StatusHandle {
    pub fn event(&self) -> &StatusEvent {
        &self.event
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.event.message = message.into();
        self.event.update(&self.bus);
    }

    pub fn update(&mut self) {
        self.event.update(&self.bus);
    }

    pub fn done(mut self) -> StatusEvent {
        self.event.done(&self.bus);
        self.event
    }

    /// Finishes the event as a failure with a new message.
    pub fn fail(mut self, message: impl Into<String>) -> StatusEvent {
        self.event.message = message.into();
        self.event.failure = true;
        self.event.is_toast = false;
        self.event.timeout = None;
        self.event.in_progress = false;
        self.event.extend_from_now(DEFAULT_TIMEOUT);
        self.event.send(&self.bus);
        self.event
    }
}

impl EventBus {
    pub fn send_status(&self, mut event: StatusEvent) -> StatusHandle {
        event.send(self);
        StatusHandle {
            event,
            bus: self.clone(),
        }
    }

    pub fn send_failure(&self, message: impl Into<String>) -> StatusEvent {
        let mut event = StatusEvent::failure(message);
        event.send(self);
        event
    }

    pub fn send_error(&self, err: &dyn Error) -> StatusEvent {
        self.send_failure(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bus::Topic;

    fn next_status(sub: &mut crate::core::bus::Subscription) -> StatusEvent {
        match sub.try_recv() {
            Some(BusEvent::Status(event)) => event,
            other => panic!("expected status event, got {:?}", other),
        }
    }

    #[test]
    fn test_send_assigns_identity_and_default_timeout() {
        let bus = EventBus::new();
        let mut event = StatusEvent::new("hello");
        assert!(event.id().is_none());
        assert!(event.created_at().is_none());

        event.send(&bus);

        assert!(event.id().is_some());
        assert!(event.created_at().is_some());
        assert_eq!(event.timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_identity_survives_resend_and_update() {
        let bus = EventBus::new();
        let mut event = StatusEvent::in_progress("working").with_timeout(Duration::from_secs(60));
        event.send(&bus);
        let id = event.id();
        let created_at = event.created_at();

        for _ in 0..5 {
            event.update(&bus);
            event.send(&bus);
        }
        event.done(&bus);

        assert_eq!(event.id(), id);
        assert_eq!(event.created_at(), created_at);
    }

    #[test]
    fn test_has_expired_boundary() {
        let bus = EventBus::new();
        let mut event = StatusEvent::new("x").with_timeout(Duration::from_secs(10));
        event.send(&bus);
        let expires_at = event.expires_at().unwrap();

        assert!(!event.has_expired_at(expires_at - TimeDelta::seconds(1)));
        assert!(!event.has_expired_at(expires_at));
        assert!(event.has_expired_at(expires_at + TimeDelta::milliseconds(1)));
    }

    #[test]
    fn test_unsent_event_never_expires() {
        let event = StatusEvent::new("draft").with_timeout(Duration::ZERO);
        assert!(!event.has_expired_at(Utc::now() + TimeDelta::days(1)));
    }

    #[test]
    fn test_update_extends_window_past_now() {
        let bus = EventBus::new();
        let mut event = StatusEvent::new("poll").with_timeout(Duration::ZERO);
        event.send(&bus);
        event.update(&bus);

        let expires_at = event.expires_at().unwrap();
        assert!(expires_at > Utc::now() + TimeDelta::seconds(4));
    }

    #[test]
    fn test_update_never_shortens_a_long_window() {
        let bus = EventBus::new();
        let mut event = StatusEvent::in_progress("deploy").with_timeout(Duration::from_secs(900));
        event.send(&bus);
        let expires_at = event.expires_at().unwrap();

        event.update(&bus);

        assert_eq!(event.expires_at(), Some(expires_at));
        assert_eq!(event.timeout(), Duration::from_secs(900));
    }

    #[test]
    fn test_done_publishes_finished_event() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe(Topic::Status);

        let handle = bus.send_status(StatusEvent::in_progress("loading"));
        let first = next_status(&mut sub);
        assert!(first.in_progress);

        let finished = handle.done();
        let second = next_status(&mut sub);
        assert!(!second.in_progress);
        assert_eq!(second.id(), first.id());
        assert_eq!(finished, second);
    }

    #[test]
    fn test_toast_done_hides_quickly() {
        let bus = EventBus::new();
        let handle = bus.send_status(
            StatusEvent::in_progress("deleting")
                .with_timeout(Duration::from_secs(900))
                .toast(),
        );
        let finished = handle.done();

        assert!(finished.timeout() < Duration::from_secs(10));
        assert!(!finished.has_expired());
    }

    #[test]
    fn test_fail_marks_failure() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe(Topic::Status);
        let handle = bus.send_status(StatusEvent::in_progress("expanding").toast());
        let _ = next_status(&mut sub);

        let failed = handle.fail("timed out");

        let published = next_status(&mut sub);
        assert!(published.failure);
        assert!(!published.in_progress);
        assert_eq!(published.message, "timed out");
        assert_eq!(failed.id(), published.id());
    }

    #[test]
    fn test_send_error_publishes_failure() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe(Topic::Status);
        let err = std::io::Error::other("boom");

        let event = bus.send_error(&err);

        assert!(event.failure);
        assert_eq!(next_status(&mut sub).message, "boom");
    }
}
