//! Localized failure text
//!
//! Rules that carry a localization key ask a [`Localizer`] for their failure text
//! before building a message, and keep their static text when the lookup misses or
//! returns blank text. A process-wide service can be installed with [`initialize`];
//! types may override it through `Validatable::localizer`.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

/// Resolves a resource key to display text.
pub trait Localizer: Send + Sync {
    fn lookup(&self, key: &str) -> Option<String>;
}

impl<F> Localizer for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn lookup(&self, key: &str) -> Option<String> {
        self(key)
    }
}

/// In-memory key to text table.
#[derive(Debug, Clone, Default)]
pub struct LocalizationTable(HashMap<String, String>);

impl LocalizationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, text: impl Into<String>) -> &mut Self {
        self.0.insert(key.into(), text.into());
        self
    }
}

impl Localizer for LocalizationTable {
    fn lookup(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }
}

impl<K, V> FromIterator<(K, V)> for LocalizationTable
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, text)| (key.into(), text.into()))
                .collect(),
        )
    }
}

static SERVICE: Lazy<RwLock<Option<Arc<dyn Localizer>>>> = Lazy::new(|| RwLock::new(None));

/// Installs the process-wide localization service, replacing any previous one.
pub fn initialize<L: Localizer + 'static>(service: L) {
    initialize_shared(Arc::new(service));
}

pub fn initialize_shared(service: Arc<dyn Localizer>) {
    let mut slot = SERVICE.write().unwrap_or_else(|poisoned| {
        log::warn!("Localization service lock poisoned; recovering");
        poisoned.into_inner()
    });
    *slot = Some(service);
}

/// The installed service, if any.
pub fn service() -> Option<Arc<dyn Localizer>> {
    let slot = SERVICE.read().unwrap_or_else(|poisoned| {
        log::warn!("Localization service lock poisoned; recovering");
        poisoned.into_inner()
    });
    slot.clone()
}

/// Removes the installed service.
pub fn reset() {
    let mut slot = SERVICE.write().unwrap_or_else(|poisoned| poisoned.into_inner());
    *slot = None;
}

/// Failure text for a rule: the localized text for `key` when it is non-blank,
/// otherwise `fallback`.
pub fn localize(localizer: Option<&dyn Localizer>, key: Option<&str>, fallback: &str) -> String {
    let localized = match (localizer, key) {
        (Some(localizer), Some(key)) if !key.trim().is_empty() => localizer.lookup(key),
        _ => None,
    };

    match localized {
        Some(text) if !text.trim().is_empty() => text,
        _ => {
            if let Some(key) = key {
                log::trace!("No localized text for '{}', using static failure text", key);
            }
            fallback.to_string()
        }
    }
}
