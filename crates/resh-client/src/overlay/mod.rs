//! Frame overlays.
//!
//! Everything painted on top of the remote screen before display: the
//! notification bar and the predictive echo, composed by [`OverlayManager`].

mod notification;

pub use notification::NotificationEngine;

use std::time::Duration;

use resh_core::terminal::Framebuffer;

use crate::prediction::{DisplayPreference, PredictionEngine};

/// Composes all overlay engines onto a base framebuffer and reports the
/// soonest any of them needs re-evaluation.
#[derive(Debug)]
pub struct OverlayManager {
    notification: NotificationEngine,
    prediction: PredictionEngine,
    title_prefix: Option<String>,
}

impl OverlayManager {
    pub fn new(preference: DisplayPreference) -> Self {
        Self {
            notification: NotificationEngine::new(),
            prediction: PredictionEngine::new(preference),
            title_prefix: None,
        }
    }

    pub fn notification(&self) -> &NotificationEngine {
        &self.notification
    }

    pub fn notification_mut(&mut self) -> &mut NotificationEngine {
        &mut self.notification
    }

    pub fn prediction_mut(&mut self) -> &mut PredictionEngine {
        &mut self.prediction
    }

    /// Prefix prepended to the remote window title (e.g. `[resh] `).
    pub fn set_title_prefix(&mut self, prefix: Option<String>) {
        self.title_prefix = prefix;
    }

    /// Apply all overlays. Prediction first, then the notification bar so
    /// it is never painted over.
    pub fn apply(&mut self, frame: &mut Framebuffer) {
        self.prediction.apply(frame);
        self.notification.apply(frame);

        if let Some(prefix) = &self.title_prefix {
            let title = match frame.title.take() {
                Some(t) => format!("{prefix}{t}"),
                None => prefix.clone(),
            };
            frame.title = Some(title);
        }
    }

    /// Minimum of the engines' advised wait times.
    pub fn wait_time(&self) -> Duration {
        self.notification.wait_time().min(self.prediction.wait_time())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_prefix_is_prepended() {
        let mut ov = OverlayManager::new(DisplayPreference::Never);
        ov.set_title_prefix(Some("[resh] ".into()));

        let mut fb = Framebuffer::new(10, 2);
        fb.title = Some("host".into());
        ov.apply(&mut fb);
        assert_eq!(fb.title.as_deref(), Some("[resh] host"));

        let mut untitled = Framebuffer::new(10, 2);
        ov.apply(&mut untitled);
        assert_eq!(untitled.title.as_deref(), Some("[resh] "));
    }

    #[test]
    fn wait_time_is_min_of_engines() {
        let ov = OverlayManager::new(DisplayPreference::Never);
        let w = ov.wait_time();
        assert!(w <= ov.notification().wait_time());
    }
}
