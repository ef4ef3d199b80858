//! Append-only action history with an undo cursor.

use crate::action::Action;

/// Ordered actions plus a cursor marking the last visible one.
///
/// Only `actions[..=cursor]` is ever rendered. Appending while the cursor is
/// behind the tail discards everything after it, so redo only works until
/// the next append.
#[derive(Debug, Clone, Default)]
pub struct History {
    actions: Vec<Action>,
    /// Index of the last visible action, -1 when nothing is visible.
    cursor: isize,
}

impl History {
    /// Create an empty history.
    pub fn new() -> Self {
        Self {
            actions: Vec::new(),
            cursor: -1,
        }
    }

    /// Create a history from loaded actions with every action visible.
    pub fn from_actions(actions: Vec<Action>) -> Self {
        let cursor = actions.len() as isize - 1;
        Self { actions, cursor }
    }

    /// Append an action after the cursor, discarding any redo tail.
    pub fn add(&mut self, action: Action) {
        self.actions.truncate(self.visible_len());
        self.actions.push(action);
        self.cursor = self.actions.len() as isize - 1;
    }

    /// Step back one action. Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        if self.cursor >= 0 {
            self.cursor -= 1;
            true
        } else {
            false
        }
    }

    /// Step forward one action. Returns false when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        if self.cursor < self.actions.len() as isize - 1 {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    /// Drop every action.
    pub fn reset(&mut self) {
        self.actions.clear();
        self.cursor = -1;
    }

    pub fn can_undo(&self) -> bool {
        self.cursor >= 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.actions.len() as isize - 1
    }

    pub fn cursor(&self) -> isize {
        self.cursor
    }

    /// Actions currently rendered, oldest first.
    pub fn visible(&self) -> &[Action] {
        &self.actions[..self.visible_len()]
    }

    /// Consume the history, keeping only the visible prefix.
    pub fn into_visible(mut self) -> Vec<Action> {
        self.actions.truncate(self.visible_len());
        self.actions
    }

    /// Total stored actions, including undone ones.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    fn visible_len(&self) -> usize {
        (self.cursor + 1) as usize
    }
}
