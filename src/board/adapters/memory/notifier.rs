//! Notifier that records notices.

use crate::board::ports::{BoardNotifier, ErrorNotice};
use std::sync::{Arc, RwLock};

/// Thread-safe notifier keeping every notice it receives.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    notices: Arc<RwLock<Vec<ErrorNotice>>>,
}

impl RecordingNotifier {
    /// Creates a notifier with no recorded notices.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the notices received so far, oldest first.
    #[must_use]
    pub fn notices(&self) -> Vec<ErrorNotice> {
        self.notices
            .read()
            .map_or_else(|poisoned| poisoned.into_inner().clone(), |notices| notices.clone())
    }
}

impl BoardNotifier for RecordingNotifier {
    fn notify(&self, notice: &ErrorNotice) {
        let mut notices = self
            .notices
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        notices.push(notice.clone());
    }
}
