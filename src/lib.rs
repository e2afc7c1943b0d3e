//! Declarative per-instance validation.
//!
//! A type lists its fields and the rules that apply to each one in a [`RuleSet`].
//! The rules are compiled once per process and cached in a shared registry. Every
//! instance keeps its own [`ValidationState`] with the current messages per field,
//! and observers are told whenever a field's messages change.
//!
//! ```ignore
//! use validatable::prelude::*;
//!
//! struct User {
//!     state: ValidationState,
//!     email: String,
//! }
//!
//! impl FieldSource for User {
//!     fn field(&self, name: &str) -> Option<Value<'_>> {
//!         match name {
//!             "Email" => Some(Value::from(&self.email)),
//!             _ => None,
//!         }
//!     }
//! }
//!
//! impl ValidationOwner for User {
//!     fn validation_state(&self) -> &ValidationState { &self.state }
//!     fn validation_state_mut(&mut self) -> &mut ValidationState { &mut self.state }
//! }
//!
//! impl Validatable for User {
//!     fn rules() -> RuleSet<Self> {
//!         RuleSet::new().field("Email", |u: &User| Value::from(&u.email), [
//!             Rule::value_present().error("Email is required"),
//!         ])
//!     }
//! }
//! ```
//!
//! [`RuleSet`]: validation::rule_set::RuleSet
//! [`ValidationState`]: validation::state::ValidationState

pub mod config;
pub mod error;
pub mod localization;
pub mod utils;
pub mod validation;

pub use validation::prelude;
