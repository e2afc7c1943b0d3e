//! Per-instance validation state
//!
//! Holds the current messages of every registered field, in registration order, and
//! publishes a [`ValidationChangedEvent`] whenever a field's list changes. Each event
//! carries the field's complete post-change list.

use std::collections::HashMap;
use std::fmt;

use tokio::sync::broadcast;

use crate::config::EngineConfig;
use crate::error::{ValidationError, ValidationResult};
use crate::validation::events::{EventBroadcaster, ValidationChangedEvent};
use crate::validation::message::{MessageKind, ValidationMessage};
use crate::validation::validation_engine::{Validatable, ValidationOwner};

/// Synchronous observer invoked for every change event.
pub type ChangeListener = Box<dyn Fn(&ValidationChangedEvent) + Send + Sync>;

pub struct ValidationState {
    fields: Vec<(String, Vec<ValidationMessage>)>,
    broadcaster: EventBroadcaster,
    listeners: Vec<ChangeListener>,
}

impl ValidationState {
    /// Empty state whose event channel uses the configured capacity.
    ///
    /// A model built on it gets its declared fields registered by the first
    /// `Validatable` operation; [`ValidationState::for_type`] registers them up front.
    pub fn new() -> Self {
        Self::with_capacity(EngineConfig::global().event_capacity)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::new(),
            broadcaster: EventBroadcaster::new(capacity),
            listeners: Vec::new(),
        }
    }

    /// State with an empty entry for every field `T` declares rules on.
    pub fn for_type<T: Validatable>() -> ValidationResult<Self> {
        let map = T::rule_map()?;
        let mut state = Self::new();
        for name in map.field_names() {
            state.register_field(name);
        }
        Ok(state)
    }

    /// Ensures `field` has an entry. Fires no event.
    pub fn register_field(&mut self, field: &str) {
        if !self.is_registered(field) {
            self.fields.push((field.to_string(), Vec::new()));
        }
    }

    pub fn is_registered(&self, field: &str) -> bool {
        self.position(field).is_some()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Appends `message` to `field` unless an equal message is already there.
    ///
    /// Registers the field if needed. Fires an event only when the list changed.
    pub fn add(&mut self, message: ValidationMessage, field: &str) -> ValidationResult<()> {
        if field.is_empty() {
            return Err(ValidationError::MissingFieldName);
        }

        let index = self.entry(field);
        let messages = &mut self.fields[index].1;
        if messages.contains(&message) {
            return Ok(());
        }
        messages.push(message);
        self.notify(field);
        Ok(())
    }

    /// Removes the first message equal to `message`. Returns whether one was removed.
    pub fn remove(&mut self, message: &ValidationMessage, field: &str) -> bool {
        let Some(index) = self.position(field) else {
            return false;
        };
        let messages = &mut self.fields[index].1;
        match messages.iter().position(|existing| existing == message) {
            Some(found) => {
                messages.remove(found);
                self.notify(field);
                true
            }
            None => false,
        }
    }

    /// Empties one registered field and fires its event. Unknown fields are ignored.
    pub fn clear_field(&mut self, field: &str) {
        if let Some(index) = self.position(field) {
            self.fields[index].1.clear();
            self.notify(field);
        }
    }

    /// Empties every field, firing one event per field.
    pub fn clear(&mut self) {
        let names: Vec<String> = self.fields.iter().map(|(name, _)| name.clone()).collect();
        for name in names {
            self.clear_field(&name);
        }
    }

    /// Whether any message exists, optionally restricted to a field and a kind.
    ///
    /// A missing, empty or unregistered field name queries the whole instance.
    pub fn has(&self, field: Option<&str>, kind: Option<MessageKind>) -> bool {
        let matches_kind =
            |message: &ValidationMessage| kind.is_none_or(|kind| message.kind() == kind);

        match field.and_then(|field| self.position(field)) {
            Some(index) => self.fields[index].1.iter().any(matches_kind),
            None => self
                .fields
                .iter()
                .flat_map(|(_, messages)| messages)
                .any(matches_kind),
        }
    }

    /// Current messages of `field`; empty when unregistered.
    pub fn messages(&self, field: &str) -> &[ValidationMessage] {
        self.position(field)
            .map(|index| self.fields[index].1.as_slice())
            .unwrap_or_default()
    }

    /// Every registered field with its messages.
    pub fn snapshot(&self) -> HashMap<String, Vec<ValidationMessage>> {
        self.fields.iter().cloned().collect()
    }

    pub fn is_valid(&self) -> bool {
        !self.has(None, None)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ValidationChangedEvent> {
        self.broadcaster.subscribe()
    }

    /// Registers a synchronous observer; observers run in registration order.
    pub fn on_changed<F>(&mut self, listener: F)
    where
        F: Fn(&ValidationChangedEvent) + Send + Sync + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Publishes the current list of `field`.
    pub fn notify(&self, field: &str) {
        let event = ValidationChangedEvent::new(field, self.messages(field).to_vec());
        for listener in &self.listeners {
            listener(&event);
        }
        self.broadcaster.send(event);
    }

    /// Replaces the list of `field` and fires one event.
    pub(crate) fn commit(&mut self, field: &str, messages: Vec<ValidationMessage>) {
        let index = self.entry(field);
        self.fields[index].1 = messages;
        self.notify(field);
    }

    /// Replaces the lists of every evaluated field, in order.
    ///
    /// Fields not covered by `results` that still hold messages are cleared first,
    /// each with its own event; evaluated fields get exactly one event each.
    pub(crate) fn commit_all(&mut self, results: Vec<(String, Vec<ValidationMessage>)>) {
        let stale: Vec<String> = self
            .fields
            .iter()
            .filter(|(name, messages)| {
                !messages.is_empty() && !results.iter().any(|(field, _)| field == name)
            })
            .map(|(name, _)| name.clone())
            .collect();
        for name in stale {
            self.clear_field(&name);
        }

        for (field, messages) in results {
            self.commit(&field, messages);
        }
    }

    fn position(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|(name, _)| name == field)
    }

    fn entry(&mut self, field: &str) -> usize {
        match self.position(field) {
            Some(index) => index,
            None => {
                self.fields.push((field.to_string(), Vec::new()));
                self.fields.len() - 1
            }
        }
    }
}

impl Default for ValidationState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ValidationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationState")
            .field("fields", &self.fields)
            .field("listeners", &self.listeners.len())
            .field("subscribers", &self.broadcaster.receiver_count())
            .finish()
    }
}

/// A bare state can stand in as a proxy owner.
impl ValidationOwner for ValidationState {
    fn validation_state(&self) -> &ValidationState {
        self
    }

    fn validation_state_mut(&mut self) -> &mut ValidationState {
        self
    }
}
