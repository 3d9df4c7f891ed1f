use std::sync::Arc;
use tokio::sync::watch;

use crate::sync::controller::FetchController;

/// Visibility of the pagination sentinel, as reported by the rendering surface.
///
/// Subscribers are woken on every transition into "visible". The trigger keeps
/// no pagination state of its own; the controller's guards decide whether a
/// wake-up turns into a request.
#[derive(Clone)]
pub struct ViewportTrigger {
    visible: Arc<watch::Sender<bool>>,
}

impl Default for ViewportTrigger {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewportTrigger {
    #[must_use]
    pub fn new() -> Self {
        let (visible, _) = watch::channel(false);
        Self {
            visible: Arc::new(visible),
        }
    }

    /// Record the sentinel's visibility. Returns `true` when this report is a
    /// transition into view, which is what wakes subscribers.
    pub fn set_visible(&self, visible: bool) -> bool {
        let mut entered = false;
        self.visible.send_if_modified(|current| {
            entered = visible && !*current;
            *current = visible;
            entered
        });
        entered
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        *self.visible.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.visible.subscribe()
    }
}

/// Request the next page each time the sentinel scrolls into view.
///
/// Runs until every [`ViewportTrigger`] clone is dropped or the task is aborted.
pub async fn run_pagination(controller: Arc<FetchController>, mut visibility: watch::Receiver<bool>) {
    while visibility.changed().await.is_ok() {
        let visible = *visibility.borrow_and_update();
        if !visible {
            continue;
        }

        let outcome = controller.request_next_page().await;
        tracing::debug!(?outcome, "viewport_next_page");

        if !controller.is_alive() {
            break;
        }
    }
}
