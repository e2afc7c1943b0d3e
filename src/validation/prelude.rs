//! Prelude for validatable types
//!
//! Re-exports what a type needs to declare rules and drive validation.

pub use crate::error::{PathError, ValidationError, ValidationResult};
pub use crate::localization::{LocalizationTable, Localizer};
pub use crate::validation::events::ValidationChangedEvent;
pub use crate::validation::message::{first_message_text, MessageKind, ValidationMessage};
pub use crate::validation::numeric::{Number, NumericWidth};
pub use crate::validation::registry::RuleRegistry;
pub use crate::validation::rule_set::{FieldRuleMap, Rule, RuleKind, RuleSet};
pub use crate::validation::state::ValidationState;
pub use crate::validation::validation_engine::{Validatable, ValidationOwner};
pub use crate::validation::value::{FieldDescriptor, FieldPath, FieldSource, Value};
