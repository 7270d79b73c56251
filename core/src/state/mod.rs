//! State tree
//!
//! A game is a tree of [`State`] nodes driven by the scheduler. Every hook
//! forwards to the node's children by default, so a node only has to report
//! its children to act as a transparent container.
//!
//! Nodes replace themselves by returning a new node from
//! [`State::advance_time`]. Whoever holds the node (a [`StateWrapper`] or a
//! [`StateList`] slot) performs the swap.

use std::cell::RefCell;
use std::rc::Rc;

use ff_graphics::{CommandContext, RenderTargets};

mod list;
mod wrapper;


pub use list::StateList;
pub use wrapper::StateWrapper;

/// Shared handle to a node in the state tree
pub type SharedState = Rc<RefCell<dyn State>>;

/// How time moves during a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdvanceType {
    #[default]
    Running,
    /// Exactly one update this frame
    SingleStep,
    Stopped,
}

/// Liveness reported by a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Alive,
    /// The holder drops the node
    Dead,
    Loading,
    /// Does not keep its parent alive
    Ignore,
}

/// Cursor a node wants shown over the window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    #[default]
    Default,
    Hand,
}

pub trait State {
    /// Runs one fixed update. A returned node replaces this one in its holder.
    fn advance_time(&mut self) -> Option<SharedState> {
        for_each_child(&*self, |child| {
            child.advance_time();
        });
        None
    }

    fn advance_input(&mut self) {
        for_each_child(&*self, |child| child.advance_input());
    }

    fn render(&mut self, context: &mut dyn CommandContext, targets: &mut dyn RenderTargets) {
        for_each_child(&*self, |child| child.render(context, targets));
    }

    fn frame_started(&mut self, advance_type: AdvanceType) {
        for_each_child(&*self, |child| child.frame_started(advance_type));
    }

    fn frame_rendering(
        &mut self,
        advance_type: AdvanceType,
        context: &mut dyn CommandContext,
        targets: &mut dyn RenderTargets,
    ) {
        for_each_child(&*self, |child| child.frame_rendering(advance_type, context, targets));
    }

    fn frame_rendered(
        &mut self,
        advance_type: AdvanceType,
        context: &mut dyn CommandContext,
        targets: &mut dyn RenderTargets,
    ) {
        for_each_child(&*self, |child| child.frame_rendered(advance_type, context, targets));
    }

    fn save_settings(&mut self) {
        for_each_child(&*self, |child| child.save_settings());
    }

    fn load_settings(&mut self) {
        for_each_child(&*self, |child| child.load_settings());
    }

    /// The first non-default cursor among the children
    fn cursor(&self) -> Cursor {
        for index in 0..self.child_state_count() {
            if let Some(child) = self.child_state(index) {
                let cursor = child.borrow().cursor();
                if cursor != Cursor::Default {
                    return cursor;
                }
            }
        }
        Cursor::Default
    }

    fn status(&self) -> Status {
        Status::Alive
    }

    fn child_state_count(&self) -> usize {
        0
    }

    fn child_state(&self, _index: usize) -> Option<SharedState> {
        None
    }

    #[doc(hidden)]
    fn as_wrapper(&self) -> Option<&StateWrapper> {
        None
    }
}

/// Calls `f` on each child of `state` in index order
pub fn for_each_child<S: State + ?Sized>(state: &S, mut f: impl FnMut(&mut dyn State)) {
    for index in 0..state.child_state_count() {
        if let Some(child) = state.child_state(index) {
            f(&mut *child.borrow_mut());
        }
    }
}

/// Puts `state` into its own [`StateWrapper`], or returns it unchanged if it
/// already is one.
pub fn wrap(state: SharedState) -> SharedState {
    if state.borrow().as_wrapper().is_some() {
        return state;
    }
    Rc::new(RefCell::new(StateWrapper::new(Some(state))))
}

/// The innermost node behind `state`.
///
/// An empty wrapper unwraps to itself.
pub fn unwrap(state: &SharedState) -> SharedState {
    let inner = state.borrow().as_wrapper().and_then(StateWrapper::wrapped_state);
    inner.unwrap_or_else(|| Rc::clone(state))
}

/// Wraps a concrete node into a [`SharedState`]
pub fn shared<S: State + 'static>(state: S) -> SharedState {
    Rc::new(RefCell::new(state))
}
