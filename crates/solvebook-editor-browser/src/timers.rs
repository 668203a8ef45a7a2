use std::cell::RefCell;
use std::rc::Weak;
use std::time::Duration;

use gloo_timers::callback::Timeout;
use solvebook_editor_core::{
    EditorId, PageController, Subscription, TimerScheduler, TimerToken,
};

use crate::dom::with_page;

/// Debounce deadlines as `setTimeout` callbacks.
///
/// Dropping the returned subscription clears the timeout; a callback that
/// still arrives late carries a token the editor no longer accepts.
#[derive(Debug, Clone)]
pub struct GlooScheduler {
    page: Weak<RefCell<PageController>>,
}

impl GlooScheduler {
    pub fn new(page: Weak<RefCell<PageController>>) -> Self {
        Self { page }
    }
}

impl TimerScheduler for GlooScheduler {
    fn schedule(
        &self,
        editor: &EditorId,
        token: TimerToken,
        delay: Duration,
    ) -> Option<Subscription> {
        let page = self.page.clone();
        let editor = editor.clone();
        let millis = u32::try_from(delay.as_millis()).unwrap_or(u32::MAX);
        let timeout = Timeout::new(millis, move || {
            with_page(&page, |page| page.fire_render(&editor, token));
        });
        Some(Subscription::new(timeout))
    }
}
