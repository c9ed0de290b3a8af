//! Named-action undo/redo stack.
//!
//! Actions are registered by name with a forward and an inverse handler. Each
//! handler receives the value the opposite handler produced last time, so a
//! record only ever stores one payload.

use crate::error::ActionError;
use graphdesk_events::{Event, EventBus};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt::Debug;

/// Passed to every handler call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionContext {
    /// True on the initial `execute`/`batch`, false on redo and rollback.
    pub first_time: bool,
}

pub type ActionFn<S, A> = Box<dyn Fn(&mut S, A, &ActionContext) -> Result<A, ActionError>>;

struct RegisteredAction<S, A> {
    do_fn: ActionFn<S, A>,
    undo_fn: ActionFn<S, A>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionRecord<A> {
    Single { name: String, args: A },
    Batch(Vec<(String, A)>),
}

impl<A> ActionRecord<A> {
    pub fn description(&self) -> String {
        match self {
            ActionRecord::Single { name, .. } => name.clone(),
            ActionRecord::Batch(entries) => {
                let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
                format!("batch({})", names.join(", "))
            }
        }
    }

    fn into_entries(self) -> (bool, Vec<(String, A)>) {
        match self {
            ActionRecord::Single { name, args } => (false, vec![(name, args)]),
            ActionRecord::Batch(entries) => (true, entries),
        }
    }

    fn from_entries(batch: bool, mut entries: Vec<(String, A)>) -> Self {
        if !batch && entries.len() == 1 {
            let (name, args) = entries.remove(0);
            ActionRecord::Single { name, args }
        } else {
            ActionRecord::Batch(entries)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UndoRedoOptions {
    /// Oldest records are dropped beyond this many. `None` keeps everything.
    pub stack_size_limit: Option<usize>,
    /// Record finished drags as `move` actions.
    pub undoable_drag: bool,
    /// Trace every action at debug level.
    pub log_actions: bool,
}

impl Default for UndoRedoOptions {
    fn default() -> Self {
        Self {
            stack_size_limit: None,
            undoable_drag: true,
            log_actions: false,
        }
    }
}

pub struct UndoRedo<S, A> {
    actions: HashMap<String, RegisteredAction<S, A>>,
    undo_stack: VecDeque<ActionRecord<A>>,
    redo_stack: Vec<ActionRecord<A>>,
    options: UndoRedoOptions,
    event_bus: EventBus,
}

impl<S, A: Clone + Debug> UndoRedo<S, A> {
    pub fn new(options: UndoRedoOptions, event_bus: EventBus) -> Self {
        Self {
            actions: HashMap::new(),
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            options,
            event_bus,
        }
    }

    pub fn options(&self) -> &UndoRedoOptions {
        &self.options
    }

    /// Associate `name` with its handlers. Registering again replaces them.
    pub fn register<D, U>(&mut self, name: impl Into<String>, do_fn: D, undo_fn: U)
    where
        D: Fn(&mut S, A, &ActionContext) -> Result<A, ActionError> + 'static,
        U: Fn(&mut S, A, &ActionContext) -> Result<A, ActionError> + 'static,
    {
        let name = name.into();
        if self.actions.contains_key(&name) {
            tracing::warn!("Replacing handlers for action {}", name);
        }
        self.actions.insert(
            name,
            RegisteredAction {
                do_fn: Box::new(do_fn),
                undo_fn: Box::new(undo_fn),
            },
        );
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn registered_actions(&self) -> Vec<String> {
        let mut names: Vec<String> = self.actions.keys().cloned().collect();
        names.sort();
        names
    }

    fn action(&self, name: &str) -> Result<&RegisteredAction<S, A>, ActionError> {
        self.actions
            .get(name)
            .ok_or_else(|| ActionError::Unregistered(name.to_string()))
    }

    /// Run a registered action and record it.
    pub fn execute(&mut self, state: &mut S, name: &str, args: A) -> Result<A, ActionError> {
        let mut done = self.run_forward(state, vec![(name.to_string(), args)], true)?;
        let (name, result) = done.remove(0);
        if self.options.log_actions {
            tracing::debug!("do {} -> {:?}", name, result);
        }
        self.redo_stack.clear();
        self.push_undo(ActionRecord::Single {
            name: name.clone(),
            args: result.clone(),
        });
        self.event_bus.publish(Event::ActionDone { name });
        self.notify_change();
        Ok(result)
    }

    /// Run several actions as one undo step. Every name is checked before
    /// anything runs; a failure part-way rolls back what already ran.
    pub fn batch(&mut self, state: &mut S, entries: Vec<(String, A)>) -> Result<Vec<A>, ActionError> {
        for (name, _) in &entries {
            self.action(name)?;
        }
        if entries.is_empty() {
            return Ok(Vec::new());
        }
        let done = self.run_forward(state, entries, true)?;
        let results = done.iter().map(|(_, a)| a.clone()).collect();
        let record = ActionRecord::Batch(done);
        let description = record.description();
        if self.options.log_actions {
            tracing::debug!("do {}", description);
        }
        self.redo_stack.clear();
        self.push_undo(record);
        self.event_bus.publish(Event::ActionDone { name: description });
        self.notify_change();
        Ok(results)
    }

    /// Invert the most recent record. Empty stack is a no-op.
    pub fn undo(&mut self, state: &mut S) -> Result<Option<Vec<A>>, ActionError> {
        let Some(record) = self.undo_stack.pop_back() else {
            tracing::debug!("Undo requested on an empty stack");
            return Ok(None);
        };
        let description = record.description();
        self.event_bus.publish(Event::BeforeUndo {
            name: description.clone(),
        });

        let (batch, entries) = record.clone().into_entries();
        let inverted = match self.run_inverse(state, entries) {
            Ok(inverted) => inverted,
            Err(e) => {
                self.undo_stack.push_back(record);
                self.event_bus.publish(Event::ShowWarning {
                    message: format!("Undo of {} failed: {}", description, e),
                });
                return Err(e);
            }
        };
        if self.options.log_actions {
            tracing::debug!("undo {}", description);
        }
        let results = inverted.iter().map(|(_, a)| a.clone()).collect();
        self.redo_stack
            .push(ActionRecord::from_entries(batch, inverted));
        self.event_bus.publish(Event::AfterUndo { name: description });
        self.notify_change();
        Ok(Some(results))
    }

    /// Re-apply the most recently undone record. Empty stack is a no-op.
    pub fn redo(&mut self, state: &mut S) -> Result<Option<Vec<A>>, ActionError> {
        let Some(record) = self.redo_stack.pop() else {
            tracing::debug!("Redo requested on an empty stack");
            return Ok(None);
        };
        let description = record.description();
        self.event_bus.publish(Event::BeforeRedo {
            name: description.clone(),
        });

        let (batch, entries) = record.clone().into_entries();
        let done = match self.run_forward(state, entries, false) {
            Ok(done) => done,
            Err(e) => {
                self.redo_stack.push(record);
                self.event_bus.publish(Event::ShowWarning {
                    message: format!("Redo of {} failed: {}", description, e),
                });
                return Err(e);
            }
        };
        if self.options.log_actions {
            tracing::debug!("redo {}", description);
        }
        let results = done.iter().map(|(_, a)| a.clone()).collect();
        self.push_undo(ActionRecord::from_entries(batch, done));
        self.event_bus.publish(Event::AfterRedo { name: description });
        self.notify_change();
        Ok(Some(results))
    }

    /// Forward handlers in order. On failure the applied prefix is inverted.
    fn run_forward(
        &self,
        state: &mut S,
        entries: Vec<(String, A)>,
        first_time: bool,
    ) -> Result<Vec<(String, A)>, ActionError> {
        let ctx = ActionContext { first_time };
        let mut done: Vec<(String, A)> = Vec::with_capacity(entries.len());
        for (name, args) in entries {
            let outcome = self
                .action(&name)
                .and_then(|action| (action.do_fn)(state, args, &ctx));
            match outcome {
                Ok(result) => done.push((name, result)),
                Err(e) => {
                    self.rollback(state, done.into_iter().rev(), true);
                    return Err(e);
                }
            }
        }
        Ok(done)
    }

    /// Inverse handlers in reverse order; results come back in forward order.
    fn run_inverse(
        &self,
        state: &mut S,
        entries: Vec<(String, A)>,
    ) -> Result<Vec<(String, A)>, ActionError> {
        let ctx = ActionContext { first_time: false };
        let mut inverted: Vec<(String, A)> = Vec::with_capacity(entries.len());
        for (name, args) in entries.into_iter().rev() {
            let outcome = self
                .action(&name)
                .and_then(|action| (action.undo_fn)(state, args, &ctx));
            match outcome {
                Ok(result) => inverted.push((name, result)),
                Err(e) => {
                    self.rollback(state, inverted.into_iter().rev(), false);
                    return Err(e);
                }
            }
        }
        inverted.reverse();
        Ok(inverted)
    }

    fn rollback(
        &self,
        state: &mut S,
        entries: impl Iterator<Item = (String, A)>,
        with_inverse: bool,
    ) {
        let ctx = ActionContext { first_time: false };
        for (name, args) in entries {
            let Ok(action) = self.action(&name) else {
                continue;
            };
            let handler = if with_inverse {
                &action.undo_fn
            } else {
                &action.do_fn
            };
            if let Err(e) = handler(state, args, &ctx) {
                tracing::warn!("Rollback of {} failed: {}", name, e);
            }
        }
    }

    fn push_undo(&mut self, record: ActionRecord<A>) {
        self.undo_stack.push_back(record);
        if let Some(limit) = self.options.stack_size_limit {
            while self.undo_stack.len() > limit {
                if let Some(evicted) = self.undo_stack.pop_front() {
                    tracing::debug!("Evicting {} from undo stack", evicted.description());
                }
            }
        }
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

    pub fn undo_description(&self) -> Option<String> {
        self.undo_stack.back().map(|r| r.description())
    }

    pub fn redo_description(&self) -> Option<String> {
        self.redo_stack.last().map(|r| r.description())
    }

    pub fn undo_records(&self) -> impl Iterator<Item = &ActionRecord<A>> {
        self.undo_stack.iter()
    }

    pub fn reset(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.notify_change();
    }

    pub fn reset_undo(&mut self) {
        self.undo_stack.clear();
        self.notify_change();
    }

    pub fn reset_redo(&mut self) {
        self.redo_stack.clear();
        self.notify_change();
    }

    fn notify_change(&self) {
        self.event_bus.publish(Event::UndoStackChanged {
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
            undo_description: self.undo_description(),
            redo_description: self.redo_description(),
        });
    }
}
