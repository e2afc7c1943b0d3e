pub mod events;
pub mod message;
pub mod numeric;
pub mod prelude;
pub mod registry;
pub mod rule_set;
pub mod state;
pub mod validation_engine;
pub mod validation_rules;
pub mod value;
