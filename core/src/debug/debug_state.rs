//! Debug overlay state
//!
//! Sits next to the game state at the root of the tree. It never keeps the
//! tree alive on its own and only runs its pages while enabled.

use std::collections::VecDeque;

use ff_graphics::{CommandContext, RenderTargets};

use crate::app_time::AppTimeHandle;
use crate::state::{self, AdvanceType, SharedState, State, Status};

/// Number of frames kept in the update history
pub const FRAME_HISTORY_SIZE: usize = 120;

struct DebugPage {
    name: String,
    state: SharedState,
}

pub struct DebugState {
    time: AppTimeHandle,
    enabled: bool,
    pages: Vec<DebugPage>,
    selected_page: usize,
    frame_updates: usize,
    /// Updates per rendered frame, oldest first
    update_history: VecDeque<usize>,
    second_start: f64,
    updates_this_second: usize,
    renders_this_second: usize,
    updates_per_second: usize,
    renders_per_second: usize,
}

impl DebugState {
    pub fn new(time: AppTimeHandle) -> Self {
        Self {
            time,
            enabled: false,
            pages: Vec::new(),
            selected_page: 0,
            frame_updates: 0,
            update_history: VecDeque::with_capacity(FRAME_HISTORY_SIZE),
            second_start: 0.0,
            updates_this_second: 0,
            renders_this_second: 0,
            updates_per_second: 0,
            renders_per_second: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            tracing::debug!("Debug state {}", if enabled { "shown" } else { "hidden" });
            self.enabled = enabled;
        }
    }

    pub fn toggle(&mut self) {
        self.set_enabled(!self.enabled);
    }

    /// Adds a page, replacing any page with the same name
    pub fn add_page(&mut self, name: impl Into<String>, page: SharedState) {
        let name = name.into();
        let page = state::wrap(page);
        match self.pages.iter_mut().find(|p| p.name == name) {
            Some(existing) => existing.state = page,
            None => self.pages.push(DebugPage { name, state: page }),
        }
    }

    pub fn remove_page(&mut self, name: &str) {
        if let Some(index) = self.pages.iter().position(|p| p.name == name) {
            self.pages.remove(index);
            if self.selected_page > index || self.selected_page >= self.pages.len() {
                self.selected_page = self.selected_page.saturating_sub(1);
            }
        }
    }

    /// Selects a page and shows the debug state. Returns false for unknown pages.
    pub fn show_page(&mut self, name: &str) -> bool {
        match self.pages.iter().position(|p| p.name == name) {
            Some(index) => {
                self.selected_page = index;
                self.set_enabled(true);
                true
            }
            None => false,
        }
    }

    pub fn page_names(&self) -> impl Iterator<Item = &str> {
        self.pages.iter().map(|p| p.name.as_str())
    }

    pub fn selected_page(&self) -> Option<&str> {
        self.pages.get(self.selected_page).map(|p| p.name.as_str())
    }

    /// Updates counted over the last full second
    pub fn updates_per_second(&self) -> usize {
        self.updates_per_second
    }

    /// Rendered frames counted over the last full second
    pub fn renders_per_second(&self) -> usize {
        self.renders_per_second
    }

    /// Updates per rendered frame, oldest first
    pub fn update_history(&self) -> impl Iterator<Item = usize> + '_ {
        self.update_history.iter().copied()
    }

    pub fn average_updates_per_frame(&self) -> f64 {
        if self.update_history.is_empty() {
            0.0
        } else {
            self.update_history.iter().sum::<usize>() as f64 / self.update_history.len() as f64
        }
    }

    fn visible_page(&self) -> Option<&DebugPage> {
        if self.enabled {
            self.pages.get(self.selected_page)
        } else {
            None
        }
    }
}

impl State for DebugState {
    fn advance_time(&mut self) -> Option<SharedState> {
        self.frame_updates += 1;
        self.updates_this_second += 1;

        if let Some(page) = self.visible_page() {
            page.state.borrow_mut().advance_time();
        }
        None
    }

    fn frame_started(&mut self, advance_type: AdvanceType) {
        self.frame_updates = 0;

        let clock_seconds = self.time.get().clock_seconds;
        if clock_seconds - self.second_start >= 1.0 {
            self.updates_per_second = std::mem::take(&mut self.updates_this_second);
            self.renders_per_second = std::mem::take(&mut self.renders_this_second);
            self.second_start = clock_seconds;
            tracing::trace!(
                "{} updates/s, {} renders/s",
                self.updates_per_second,
                self.renders_per_second
            );
        }

        state::for_each_child(&*self, |child| child.frame_started(advance_type));
    }

    fn frame_rendered(
        &mut self,
        advance_type: AdvanceType,
        context: &mut dyn CommandContext,
        targets: &mut dyn RenderTargets,
    ) {
        self.renders_this_second += 1;
        if self.update_history.len() == FRAME_HISTORY_SIZE {
            self.update_history.pop_front();
        }
        self.update_history.push_back(self.frame_updates);

        state::for_each_child(&*self, |child| child.frame_rendered(advance_type, context, targets));
    }

    fn status(&self) -> Status {
        Status::Ignore
    }

    fn child_state_count(&self) -> usize {
        usize::from(self.visible_page().is_some())
    }

    fn child_state(&self, index: usize) -> Option<SharedState> {
        match index {
            0 => self.visible_page().map(|page| page.state.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_time::AppTime;
    use crate::test_utils::{RecordingState, TestContext, TestTargets, call_log};

    fn frame(debug: &mut DebugState, updates: usize) {
        debug.frame_started(AdvanceType::Running);
        for _ in 0..updates {
            debug.advance_time();
        }
        debug.frame_rendered(AdvanceType::Running, &mut TestContext, &mut TestTargets::new());
    }

    #[test]
    fn test_debug_state_is_ignored() {
        let debug = DebugState::new(AppTimeHandle::new());
        assert_eq!(debug.status(), Status::Ignore);
    }

    #[test]
    fn test_update_history_is_ring_buffer() {
        let mut debug = DebugState::new(AppTimeHandle::new());

        for i in 0..FRAME_HISTORY_SIZE + 5 {
            frame(&mut debug, i % 3);
        }

        let history: Vec<usize> = debug.update_history().collect();
        assert_eq!(history.len(), FRAME_HISTORY_SIZE);
        // Oldest surviving frame is frame 5
        assert_eq!(history[0], 5 % 3);
        assert_eq!(history[FRAME_HISTORY_SIZE - 1], (FRAME_HISTORY_SIZE + 4) % 3);
    }

    #[test]
    fn test_rates_roll_over_each_second() {
        let time = AppTimeHandle::new();
        let mut debug = DebugState::new(time.clone());

        for _ in 0..10 {
            frame(&mut debug, 2);
        }
        assert_eq!(debug.updates_per_second(), 0);

        time.publish(AppTime {
            clock_seconds: 1.0,
            ..AppTime::default()
        });
        frame(&mut debug, 1);

        assert_eq!(debug.updates_per_second(), 20);
        assert_eq!(debug.renders_per_second(), 10);
    }

    #[test]
    fn test_average_updates_per_frame() {
        let mut debug = DebugState::new(AppTimeHandle::new());
        assert_eq!(debug.average_updates_per_frame(), 0.0);

        frame(&mut debug, 1);
        frame(&mut debug, 3);
        assert_eq!(debug.average_updates_per_frame(), 2.0);
    }

    #[test]
    fn test_pages_run_only_while_enabled() {
        let log = call_log();
        let page = RecordingState::new("page", &log);
        let mut debug = DebugState::new(AppTimeHandle::new());
        debug.add_page("perf", page.clone());

        debug.advance_time();
        assert_eq!(page.borrow().updates, 0);
        assert_eq!(debug.child_state_count(), 0);

        assert!(debug.show_page("perf"));
        assert!(debug.is_enabled());
        debug.advance_time();
        assert_eq!(page.borrow().updates, 1);
        assert_eq!(debug.child_state_count(), 1);

        debug.toggle();
        debug.advance_time();
        assert_eq!(page.borrow().updates, 1);
    }

    #[test]
    fn test_page_management() {
        let log = call_log();
        let mut debug = DebugState::new(AppTimeHandle::new());
        debug.add_page("a", RecordingState::new("a", &log));
        debug.add_page("b", RecordingState::new("b", &log));
        debug.add_page("a", RecordingState::new("a2", &log));

        assert_eq!(debug.page_names().collect::<Vec<_>>(), ["a", "b"]);
        assert!(!debug.show_page("missing"));

        assert!(debug.show_page("b"));
        assert_eq!(debug.selected_page(), Some("b"));

        debug.remove_page("a");
        assert_eq!(debug.selected_page(), Some("b"));

        debug.remove_page("b");
        assert_eq!(debug.selected_page(), None);
        assert_eq!(debug.child_state_count(), 0);
    }
}
