//! Process-wide rule metadata cache
//!
//! Maps a type to its compiled [`FieldRuleMap`]. Entries are built lazily on first use
//! and never replaced: when two threads race to build the same type, both may compile,
//! but only the first published map is kept and every caller gets that one.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use once_cell::sync::Lazy;

use crate::error::{ValidationError, ValidationResult};
use crate::validation::rule_set::{FieldRuleMap, RuleSet};
use crate::validation::value::FieldSource;

type Entry = Arc<dyn Any + Send + Sync>;

static GLOBAL: Lazy<RuleRegistry> = Lazy::new(RuleRegistry::new);

/// Append-only cache of compiled rule maps keyed by type.
#[derive(Default)]
pub struct RuleRegistry {
    cache: RwLock<HashMap<TypeId, Entry>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by every `Validatable` type in the process.
    pub fn global() -> &'static RuleRegistry {
        &GLOBAL
    }

    /// Cached map for `T`, if it has been built.
    pub fn get<T: FieldSource + 'static>(&self) -> Option<Arc<FieldRuleMap<T>>> {
        let entry = self.read().get(&TypeId::of::<T>()).cloned()?;
        entry.downcast::<FieldRuleMap<T>>().ok()
    }

    /// Returns the cached map for `T`, compiling `declare()` on first use.
    ///
    /// A compilation error is returned to the caller and nothing is cached.
    pub fn get_or_build<T, F>(&self, declare: F) -> ValidationResult<Arc<FieldRuleMap<T>>>
    where
        T: FieldSource + 'static,
        F: FnOnce() -> RuleSet<T>,
    {
        if let Some(map) = self.get::<T>() {
            return Ok(map);
        }

        log::debug!("Building validation rules for {}", type_name::<T>());
        let built: Entry = Arc::new(declare().compile()?);

        let published = {
            let mut cache = self.write();
            Arc::clone(cache.entry(TypeId::of::<T>()).or_insert(built))
        };

        published
            .downcast::<FieldRuleMap<T>>()
            .map_err(|_| ValidationError::Configuration {
                type_name: type_name::<T>().to_string(),
                field: String::new(),
                rule: "RuleRegistry",
                reason: "cached rule map has an unexpected type".to_string(),
            })
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.read().contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<TypeId, Entry>> {
        self.cache.read().unwrap_or_else(|poisoned| {
            log::warn!("Rule registry lock poisoned; recovering");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<TypeId, Entry>> {
        self.cache.write().unwrap_or_else(|poisoned| {
            log::warn!("Rule registry lock poisoned; recovering");
            poisoned.into_inner()
        })
    }
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("types", &self.len())
            .finish()
    }
}
