//! Undo/redo history
//!
//! Two stacks over a linear timeline plus an optional pending batch. Recording a new command
//! discards the redo stack. The undo stack is bounded; once the limit is exceeded the oldest
//! entries are dropped from the front and cannot be recovered.

use std::collections::VecDeque;
use tracing::warn;

use crate::commands::{BatchCommand, Command};
use crate::config::DEFAULT_UNDO_LIMIT;

/// Bounded undo/redo stacks with batching
#[derive(Debug, Clone)]
pub struct History {
    undo_stack: VecDeque<Command>,
    redo_stack: Vec<Command>,
    limit: usize,
    pending: Vec<Command>,
    batch_depth: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_UNDO_LIMIT)
    }
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            limit,
            pending: Vec::new(),
            batch_depth: 0,
        }
    }

    /// Record an applied command; returns true when it reached the undo stack directly
    pub fn record(&mut self, command: Command) -> bool {
        self.redo_stack.clear();
        if self.is_batching() {
            self.pending.push(command);
            return false;
        }
        self.push_undo(command);
        true
    }

    /// Start collecting commands into one undo step; nested calls are counted
    pub fn begin_batch(&mut self) {
        self.batch_depth += 1;
    }

    /// Close the current batch; returns true when a command was pushed
    ///
    /// Only the outermost call flushes. An empty batch pushes nothing, a single command is pushed
    /// as-is, and two or more are wrapped into one [`Command::Batch`].
    pub fn end_batch(&mut self, description: impl Into<String>) -> bool {
        if self.batch_depth == 0 {
            warn!("end_batch called without a matching begin_batch");
            return false;
        }
        self.batch_depth -= 1;
        if self.batch_depth > 0 {
            return false;
        }

        let mut commands = std::mem::take(&mut self.pending);
        match commands.len() {
            0 => false,
            1 => {
                if let Some(command) = commands.pop() {
                    self.push_undo(command);
                }
                true
            }
            _ => {
                self.push_undo(Command::Batch(BatchCommand {
                    commands,
                    description: description.into(),
                }));
                true
            }
        }
    }

    pub fn is_batching(&self) -> bool {
        self.batch_depth > 0
    }

    /// Commands collected by the open batch so far
    pub fn pending(&self) -> &[Command] {
        &self.pending
    }

    pub fn pop_undo(&mut self) -> Option<Command> {
        self.undo_stack.pop_back()
    }

    pub fn pop_redo(&mut self) -> Option<Command> {
        self.redo_stack.pop()
    }

    /// Park an undone command so it can be redone
    pub fn push_redo(&mut self, command: Command) {
        self.redo_stack.push(command);
    }

    /// Return a redone command to the undo stack without touching the redo stack
    pub fn push_undo(&mut self, command: Command) {
        self.undo_stack.push_back(command);
        self.enforce_limit();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// Command the next undo would revert
    pub fn peek_undo(&self) -> Option<&Command> {
        self.undo_stack.back()
    }

    /// Command the next redo would reapply
    pub fn peek_redo(&self) -> Option<&Command> {
        self.redo_stack.last()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Change the bound, trimming the oldest entries immediately
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
        self.enforce_limit();
    }

    /// Drop both stacks and any open batch
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.pending.clear();
        self.batch_depth = 0;
    }

    fn enforce_limit(&mut self) {
        let excess = self.undo_stack.len().saturating_sub(self.limit);
        if excess > 0 {
            self.undo_stack.drain(..excess);
            warn!(discarded = excess, limit = self.limit, "Undo stack truncated");
        }
    }
}
