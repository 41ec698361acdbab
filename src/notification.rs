//! Single channel for user feedback: one timed toast slot and one confirm prompt slot.

use std::time::{Duration, Instant};

use crate::editor::FeatureKey;
use crate::state::{StateError, StateResult, ToolKind};

pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Success,
    Warning,
    Error,
}

impl ToastKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub text: String,
    pub kind: ToastKind,
    pub expires_at: Instant,
}

/// Work to run once the user accepts a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmAction {
    DiscardEdits { then: ToolKind },
    SaveEdits,
    DeleteFeature(FeatureKey),
    DeleteAll,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPrompt {
    pub text: String,
    pub action: ConfirmAction,
}

#[derive(Debug)]
pub struct Notifier {
    duration: Duration,
    toast: Option<Toast>,
    confirm: Option<ConfirmPrompt>,
    dropped_toasts: usize,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_TOAST_DURATION)
    }
}

impl Notifier {
    pub const fn new(duration: Duration) -> Self {
        Self {
            duration,
            toast: None,
            confirm: None,
            dropped_toasts: 0,
        }
    }

    /// Shows a toast unless one is still visible; the first toast wins until it expires.
    pub fn show_toast(&mut self, text: impl Into<String>, kind: ToastKind, now: Instant) -> bool {
        let text = text.into();
        self.tick(now);
        if let Some(visible) = &self.toast {
            self.dropped_toasts = self.dropped_toasts.saturating_add(1);
            tracing::debug!(
                dropped = %text,
                visible = %visible.text,
                "toast slot busy; dropping notification"
            );
            return false;
        }

        match kind {
            ToastKind::Error => tracing::warn!(%text, "error toast"),
            _ => tracing::info!(kind = kind.label(), %text, "toast"),
        }
        self.toast = Some(Toast {
            text,
            kind,
            expires_at: now + self.duration,
        });
        true
    }

    pub fn tick(&mut self, now: Instant) {
        if self
            .toast
            .as_ref()
            .is_some_and(|toast| now >= toast.expires_at)
        {
            self.toast = None;
        }
    }

    pub fn dismiss_toast(&mut self) {
        self.toast = None;
    }

    pub fn toast(&self) -> Option<&Toast> {
        self.toast.as_ref()
    }

    pub fn dropped_toasts(&self) -> usize {
        self.dropped_toasts
    }

    /// Prompts are serialized: a second prompt is refused until the first is resolved.
    pub fn show_confirm(
        &mut self,
        text: impl Into<String>,
        action: ConfirmAction,
    ) -> StateResult<()> {
        if let Some(pending) = &self.confirm {
            tracing::warn!(pending = ?pending.action, requested = ?action, "confirm prompt already pending");
            return Err(StateError::ConfirmPending);
        }
        let text = text.into();
        tracing::info!(%text, ?action, "confirm prompt");
        self.confirm = Some(ConfirmPrompt { text, action });
        Ok(())
    }

    pub fn pending_confirm(&self) -> Option<&ConfirmPrompt> {
        self.confirm.as_ref()
    }

    pub fn take_confirm(&mut self) -> StateResult<ConfirmPrompt> {
        self.confirm.take().ok_or(StateError::NoConfirmPending)
    }
}
