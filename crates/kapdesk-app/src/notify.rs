// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::time::{Duration, Instant};

pub const TOAST_DURATION: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
    Warning,
}

impl ToastKind {
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Success => "✔",
            Self::Error => "✖",
            Self::Info => "ℹ",
            Self::Warning => "⚠",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
            Self::Warning => "warning",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    pub token: u64,
    shown_at: Instant,
    duration: Duration,
}

impl Toast {
    pub fn visible_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.shown_at) < self.duration
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

/// Holds at most one toast; showing a new one replaces the old.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToastSlot {
    current: Option<Toast>,
    last_token: u64,
}

impl ToastSlot {
    pub fn show(&mut self, kind: ToastKind, message: impl Into<String>) -> u64 {
        self.show_at(kind, message, Instant::now())
    }

    pub fn show_at(&mut self, kind: ToastKind, message: impl Into<String>, now: Instant) -> u64 {
        self.last_token = self.last_token.saturating_add(1);
        self.current = Some(Toast {
            message: message.into(),
            kind,
            token: self.last_token,
            shown_at: now,
            duration: TOAST_DURATION,
        });
        self.last_token
    }

    pub fn current(&self) -> Option<&Toast> {
        self.current.as_ref()
    }

    pub fn close(&mut self) {
        self.current = None;
    }

    /// Timer-driven dismissal; a stale token never hides a newer toast.
    pub fn dismiss(&mut self, token: u64) -> bool {
        match &self.current {
            Some(toast) if toast.token == token => {
                self.current = None;
                true
            }
            _ => false,
        }
    }

    pub fn tick(&mut self, now: Instant) {
        if self
            .current
            .as_ref()
            .is_some_and(|toast| !toast.visible_at(now))
        {
            self.current = None;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmIntent<Id> {
    pub ids: Vec<Id>,
    pub is_bulk: bool,
    pub label: String,
}

impl<Id> ConfirmIntent<Id> {
    pub fn single(id: Id, label: impl Into<String>) -> Self {
        Self {
            ids: vec![id],
            is_bulk: false,
            label: label.into(),
        }
    }

    pub fn bulk(ids: Vec<Id>) -> Self {
        let label = format!("{} selected items", ids.len());
        Self {
            ids,
            is_bulk: true,
            label,
        }
    }

    pub fn title(&self) -> &'static str {
        if self.is_bulk {
            "Delete Selected"
        } else {
            "Confirm Delete"
        }
    }

    pub fn message(&self) -> String {
        format!("Are you sure you want to delete {}?", self.label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmChoice {
    Confirm,
    Cancel,
}

/// Binary dialog; resolving consumes it so exactly one outcome is taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmDialog<T> {
    pub title: String,
    pub message: String,
    payload: T,
}

impl<T> ConfirmDialog<T> {
    pub fn new(title: impl Into<String>, message: impl Into<String>, payload: T) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            payload,
        }
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }

    pub fn resolve(self, choice: ConfirmChoice) -> Option<T> {
        match choice {
            ConfirmChoice::Confirm => Some(self.payload),
            ConfirmChoice::Cancel => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfirmChoice, ConfirmDialog, ConfirmIntent, TOAST_DURATION, ToastKind, ToastSlot};
    use std::time::{Duration, Instant};

    #[test]
    fn toast_auto_hides_after_three_seconds() {
        let start = Instant::now();
        let mut slot = ToastSlot::default();
        slot.show_at(ToastKind::Info, "saved", start);

        slot.tick(start + Duration::from_millis(2999));
        assert!(slot.current().is_some());

        slot.tick(start + TOAST_DURATION);
        assert!(slot.current().is_none());
    }

    #[test]
    fn every_kind_uses_the_same_default_duration() {
        let start = Instant::now();
        for kind in [
            ToastKind::Success,
            ToastKind::Error,
            ToastKind::Info,
            ToastKind::Warning,
        ] {
            let mut slot = ToastSlot::default();
            slot.show_at(kind, "x", start);
            let toast = slot.current().expect("toast shown");
            assert_eq!(toast.duration(), Duration::from_millis(3000));
            assert!(!toast.visible_at(start + Duration::from_millis(3000)));
        }
    }

    #[test]
    fn new_toast_replaces_old_and_stale_timer_is_ignored() {
        let mut slot = ToastSlot::default();
        let first = slot.show(ToastKind::Success, "created");
        let second = slot.show(ToastKind::Error, "failed");
        assert_ne!(first, second);

        assert!(!slot.dismiss(first));
        assert_eq!(
            slot.current().map(|toast| toast.message.as_str()),
            Some("failed")
        );
        assert!(slot.dismiss(second));
        assert!(slot.current().is_none());
    }

    #[test]
    fn manual_close_hides_immediately() {
        let mut slot = ToastSlot::default();
        slot.show(ToastKind::Warning, "select rows first");
        slot.close();
        assert!(slot.current().is_none());
    }

    #[test]
    fn confirm_dialog_yields_payload_only_on_confirm() {
        let intent = ConfirmIntent::single(3_i64, "Water Sector");
        assert_eq!(
            intent.message(),
            "Are you sure you want to delete Water Sector?"
        );
        let dialog = ConfirmDialog::new(intent.title(), intent.message(), intent.clone());
        assert_eq!(dialog.resolve(ConfirmChoice::Confirm), Some(intent.clone()));

        let dialog = ConfirmDialog::new(intent.title(), intent.message(), intent);
        assert_eq!(dialog.resolve(ConfirmChoice::Cancel), None);
    }

    #[test]
    fn bulk_intent_labels_by_count() {
        let intent = ConfirmIntent::bulk(vec![1_i64, 2, 3]);
        assert!(intent.is_bulk);
        assert_eq!(intent.label, "3 selected items");
        assert_eq!(intent.title(), "Delete Selected");
    }
}
