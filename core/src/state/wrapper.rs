//! Replaceable slot holding one state node

use std::rc::Rc;

use ff_graphics::{CommandContext, RenderTargets};

use super::{AdvanceType, Cursor, SharedState, State, Status};

/// Holds a single node and swaps it for whatever its `advance_time` returns.
///
/// Always stores the innermost node: assigning another wrapper copies that
/// wrapper's node, and assigning a dead node empties the slot. An empty
/// wrapper reports [`Status::Dead`].
#[derive(Default)]
pub struct StateWrapper {
    state: Option<SharedState>,
}

impl StateWrapper {
    /// Settings are not loaded here, the owner decides when that happens
    pub fn new(state: Option<SharedState>) -> Self {
        Self {
            state: accepted(state),
        }
    }

    /// Replaces the held node, saving settings of the old node and loading
    /// them for the new one when it actually changes.
    pub fn set(&mut self, state: Option<SharedState>) {
        let state = accepted(state);

        let unchanged = match (&state, &self.state) {
            (Some(new), Some(old)) => Rc::ptr_eq(new, old),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return;
        }

        if let Some(old) = &self.state {
            old.borrow_mut().save_settings();
        }

        self.state = state;

        if let Some(new) = &self.state {
            new.borrow_mut().load_settings();
        }
    }

    pub fn reset(&mut self) {
        self.set(None);
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_none()
    }

    pub fn wrapped_state(&self) -> Option<SharedState> {
        self.state.clone()
    }
}

fn accepted(state: Option<SharedState>) -> Option<SharedState> {
    state
        .and_then(innermost)
        .filter(|state| state.borrow().status() != Status::Dead)
}

/// Looks through wrappers, which may be empty
fn innermost(state: SharedState) -> Option<SharedState> {
    let inner = state.borrow().as_wrapper().map(StateWrapper::wrapped_state);
    match inner {
        Some(inner) => inner,
        None => Some(state),
    }
}

fn is_sole_child(parent: &SharedState, candidate: &SharedState) -> bool {
    let parent = parent.borrow();
    if parent.child_state_count() != 1 {
        return false;
    }
    let child = parent.child_state(0).and_then(innermost);
    match (child, innermost(Rc::clone(candidate))) {
        (Some(child), Some(candidate)) => Rc::ptr_eq(&child, &candidate),
        _ => false,
    }
}

impl State for StateWrapper {
    fn advance_time(&mut self) -> Option<SharedState> {
        let state = self.state.clone()?;
        let next = state.borrow_mut().advance_time();

        // A node collapsing into its only child hands over a loaded child
        if next.as_ref().is_some_and(|next| is_sole_child(&state, next)) {
            self.state = accepted(next);
            return None;
        }

        // Reassigning the current node drops it if it died during the update
        self.set(Some(next.unwrap_or(state)));
        None
    }

    fn advance_input(&mut self) {
        if let Some(state) = &self.state {
            state.borrow_mut().advance_input();
        }
    }

    fn render(&mut self, context: &mut dyn CommandContext, targets: &mut dyn RenderTargets) {
        if let Some(state) = &self.state {
            state.borrow_mut().render(context, targets);
        }
    }

    fn frame_started(&mut self, advance_type: AdvanceType) {
        if let Some(state) = &self.state {
            state.borrow_mut().frame_started(advance_type);
        }
    }

    fn frame_rendering(
        &mut self,
        advance_type: AdvanceType,
        context: &mut dyn CommandContext,
        targets: &mut dyn RenderTargets,
    ) {
        if let Some(state) = &self.state {
            state.borrow_mut().frame_rendering(advance_type, context, targets);
        }
    }

    fn frame_rendered(
        &mut self,
        advance_type: AdvanceType,
        context: &mut dyn CommandContext,
        targets: &mut dyn RenderTargets,
    ) {
        if let Some(state) = &self.state {
            state.borrow_mut().frame_rendered(advance_type, context, targets);
        }
    }

    fn save_settings(&mut self) {
        if let Some(state) = &self.state {
            state.borrow_mut().save_settings();
        }
    }

    fn load_settings(&mut self) {
        if let Some(state) = &self.state {
            state.borrow_mut().load_settings();
        }
    }

    fn cursor(&self) -> Cursor {
        self.state
            .as_ref()
            .map_or(Cursor::Default, |state| state.borrow().cursor())
    }

    fn status(&self) -> Status {
        self.state
            .as_ref()
            .map_or(Status::Dead, |state| state.borrow().status())
    }

    fn child_state_count(&self) -> usize {
        usize::from(self.state.is_some())
    }

    fn child_state(&self, index: usize) -> Option<SharedState> {
        if index == 0 { self.state.clone() } else { None }
    }

    fn as_wrapper(&self) -> Option<&StateWrapper> {
        Some(self)
    }
}
