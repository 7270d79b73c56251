//! Ordered container of state nodes

use super::{SharedState, State, Status, wrap};

/// Runs several nodes side by side, in order.
///
/// Every entry sits in its own [`super::StateWrapper`] so each can replace
/// itself independently. Dead entries are pruned after each update, and a
/// list left with a single entry hands that entry to its own holder.
#[derive(Default)]
pub struct StateList {
    states: Vec<SharedState>,
}

impl StateList {
    pub fn new(states: impl IntoIterator<Item = SharedState>) -> Self {
        Self {
            states: states.into_iter().map(wrap).collect(),
        }
    }

    pub fn push(&mut self, state: SharedState) {
        self.states.push(wrap(state));
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl State for StateList {
    fn advance_time(&mut self) -> Option<SharedState> {
        for slot in &mut self.states {
            let next = slot.borrow_mut().advance_time();
            if let Some(next) = next {
                *slot = wrap(next);
            }
        }

        let before = self.states.len();
        self.states.retain(|state| state.borrow().status() != Status::Dead);
        if self.states.len() != before {
            tracing::debug!(
                "Pruned {} dead states, {} left",
                before - self.states.len(),
                self.states.len()
            );
        }

        // A lone ignored entry stays inside the list so the list still reports dead
        match self.states.as_slice() {
            [only] if only.borrow().status() != Status::Ignore => Some(only.clone()),
            _ => None,
        }
    }

    /// Loading wins over everything. Otherwise alive if any entry is alive,
    /// and dead when only dead or ignored entries remain.
    fn status(&self) -> Status {
        let mut status = Status::Dead;
        for state in &self.states {
            match state.borrow().status() {
                Status::Loading => return Status::Loading,
                Status::Alive => status = Status::Alive,
                Status::Dead | Status::Ignore => {}
            }
        }
        status
    }

    fn child_state_count(&self) -> usize {
        self.states.len()
    }

    fn child_state(&self, index: usize) -> Option<SharedState> {
        self.states.get(index).cloned()
    }
}
