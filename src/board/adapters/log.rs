//! Notifier that reports rolled-back mutations through `tracing`.

use crate::board::ports::{BoardNotifier, ErrorNotice, NoticeKind};
use tracing::{error, warn};

/// Logs each notice instead of showing it.
///
/// Rejections are logged at `warn`, transport failures at `error`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl BoardNotifier for LogNotifier {
    fn notify(&self, notice: &ErrorNotice) {
        match notice.kind {
            NoticeKind::ValidationRejected => warn!(
                task_id = %notice.task_id,
                operation = %notice.operation,
                "{notice}"
            ),
            NoticeKind::TransportFailure => error!(
                task_id = %notice.task_id,
                operation = %notice.operation,
                "{notice}"
            ),
        }
    }
}
