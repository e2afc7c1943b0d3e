//! Validation orchestration
//!
//! [`ValidationOwner`] is the instance-facing message API: anything that owns a
//! [`ValidationState`] gets add/remove/query operations and ad-hoc delegate checks.
//! [`Validatable`] adds declared rules on top: it fetches the type's compiled rules
//! from the process-wide registry, runs them field by field in declaration order and
//! commits each field's results with a single change event.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::error::{ValidationError, ValidationResult};
use crate::localization::{self, Localizer};
use crate::validation::events::ValidationChangedEvent;
use crate::validation::message::{MessageKind, ValidationMessage};
use crate::validation::registry::RuleRegistry;
use crate::validation::rule_set::{FieldEntry, FieldRuleMap, Rule, RuleSet};
use crate::validation::state::ValidationState;
use crate::validation::value::FieldSource;

/// Something that owns validation messages.
pub trait ValidationOwner {
    fn validation_state(&self) -> &ValidationState;

    fn validation_state_mut(&mut self) -> &mut ValidationState;

    fn add_message(&mut self, message: ValidationMessage, field: &str) -> ValidationResult<()> {
        self.validation_state_mut().add(message, field)
    }

    fn remove_message(&mut self, message: &ValidationMessage, field: &str) -> bool {
        self.validation_state_mut().remove(message, field)
    }

    /// Clears one field, or every field when `field` is `None`.
    fn remove_messages(&mut self, field: Option<&str>) {
        match field {
            Some(field) => self.validation_state_mut().clear_field(field),
            None => self.validation_state_mut().clear(),
        }
    }

    fn has_messages(&self, field: Option<&str>, kind: Option<MessageKind>) -> bool {
        self.validation_state().has(field, kind)
    }

    fn messages(&self, field: &str) -> &[ValidationMessage] {
        self.validation_state().messages(field)
    }

    fn all_messages(&self) -> HashMap<String, Vec<ValidationMessage>> {
        self.validation_state().snapshot()
    }

    fn subscribe(&self) -> broadcast::Receiver<ValidationChangedEvent> {
        self.validation_state().subscribe()
    }

    fn on_validation_changed<F>(&mut self, listener: F)
    where
        Self: Sized,
        F: Fn(&ValidationChangedEvent) + Send + Sync + 'static,
    {
        self.validation_state_mut().on_changed(listener);
    }

    /// Runs an ad-hoc check not backed by declared rules.
    ///
    /// On failure `failure` is added to `field`; on success it is removed. With a
    /// `proxy` the write goes to the proxy and this instance is left untouched. Returns
    /// the failure message when the check failed.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let mut view = ValidationState::new();
    /// let confirm = "hunter22".to_string();
    /// user.validate_with_delegate(
    ///     |u| u.password == confirm,
    ///     ValidationMessage::error("Passwords do not match"),
    ///     "Password",
    ///     Some(&mut view),
    /// )?;
    /// ```
    fn validate_with_delegate<P>(
        &mut self,
        predicate: P,
        failure: ValidationMessage,
        field: &str,
        proxy: Option<&mut dyn ValidationOwner>,
    ) -> ValidationResult<Option<ValidationMessage>>
    where
        Self: Sized,
        P: FnOnce(&Self) -> bool,
    {
        if field.is_empty() {
            return Err(ValidationError::MissingFieldName);
        }

        let passed = predicate(self);
        let target: &mut dyn ValidationOwner = match proxy {
            Some(proxy) => proxy,
            None => self,
        };

        if passed {
            target.remove_message(&failure, field);
            Ok(None)
        } else {
            target.add_message(failure.clone(), field)?;
            Ok(Some(failure))
        }
    }
}

/// A type with declared validation rules.
pub trait Validatable: ValidationOwner + FieldSource + Sized + 'static {
    /// The rule table for this type. Compiled once per process.
    fn rules() -> RuleSet<Self>;

    /// Localization used for rule failure text.
    fn localizer(&self) -> Option<Arc<dyn Localizer>> {
        localization::service()
    }

    fn rule_map() -> ValidationResult<Arc<FieldRuleMap<Self>>> {
        RuleRegistry::global().get_or_build(Self::rules)
    }

    /// Ensures every declared field has an entry in this instance's state. Fires no
    /// events; every validation entry point calls it, so a state built with
    /// [`ValidationState::new`] catches up on first use.
    fn register_rule_fields(&mut self) -> ValidationResult<Arc<FieldRuleMap<Self>>> {
        let map = Self::rule_map()?;
        let state = self.validation_state_mut();
        for name in map.field_names() {
            state.register_field(name);
        }
        Ok(map)
    }

    /// Messages of every declared and registered field, declared fields included even
    /// when the state has never seen them.
    fn field_messages(&self) -> ValidationResult<HashMap<String, Vec<ValidationMessage>>> {
        let map = Self::rule_map()?;
        let mut snapshot = self.validation_state().snapshot();
        for name in map.field_names() {
            snapshot.entry(name.to_string()).or_default();
        }
        Ok(snapshot)
    }

    /// Re-evaluates every declared field.
    ///
    /// All fields are evaluated before anything is written, so a rule error leaves the
    /// state as it was. Afterwards each field holds exactly its new messages and has
    /// fired one event.
    fn validate_all(&mut self) -> ValidationResult<()> {
        let map = self.register_rule_fields()?;
        let _span = tracing::debug_span!("validate_all", type_name = map.type_name()).entered();
        let localizer = self.localizer();

        let results = {
            let this: &Self = self;
            map.fields()
                .iter()
                .map(|entry| {
                    let messages = evaluate_field(this, entry, localizer.as_deref())?;
                    Ok((entry.name().to_string(), messages))
                })
                .collect::<ValidationResult<Vec<_>>>()?
        };

        log::debug!(
            "Validated {} fields of {} ({} with messages)",
            results.len(),
            map.type_name(),
            results.iter().filter(|(_, messages)| !messages.is_empty()).count()
        );
        self.validation_state_mut().commit_all(results);
        Ok(())
    }

    /// Re-evaluates one field. An empty name validates everything.
    ///
    /// A field registered on the state without declared rules is simply cleared.
    fn validate_field(&mut self, field: &str) -> ValidationResult<()> {
        if field.is_empty() {
            return self.validate_all();
        }

        let map = self.register_rule_fields()?;
        let Some(entry) = map.field(field) else {
            if self.validation_state().is_registered(field) {
                self.validation_state_mut().commit(field, Vec::new());
                return Ok(());
            }
            return Err(ValidationError::UnknownField {
                field: field.to_string(),
                type_name: map.type_name().to_string(),
            });
        };

        let localizer = self.localizer();
        let messages = evaluate_field(&*self, entry, localizer.as_deref())?;
        log::trace!("{}.{} -> {} messages", map.type_name(), field, messages.len());
        self.validation_state_mut().commit(field, messages);
        Ok(())
    }

    /// Re-validates `field` only if it currently has messages, so fixed fields clear
    /// while untouched ones stay quiet. Always fires one event for the field.
    fn refresh_validation(&mut self, field: &str) -> ValidationResult<()> {
        if field.is_empty() {
            return Err(ValidationError::MissingFieldName);
        }
        let map = self.register_rule_fields()?;
        if !self.validation_state().is_registered(field) {
            return Err(ValidationError::UnknownField {
                field: field.to_string(),
                type_name: map.type_name().to_string(),
            });
        }

        if !self.validation_state().messages(field).is_empty() && map.field(field).is_some() {
            return self.validate_field(field);
        }

        self.validation_state().notify(field);
        Ok(())
    }

    /// Evaluates a rule that is not part of the declared table against a declared
    /// field and adds its failure, to `proxy` when one is given.
    ///
    /// Handler names in `rule` resolve against this type's handler table.
    fn perform_validation(
        &mut self,
        rule: Rule,
        field: &str,
        proxy: Option<&mut dyn ValidationOwner>,
    ) -> ValidationResult<Option<ValidationMessage>> {
        if field.is_empty() {
            return Err(ValidationError::MissingFieldName);
        }

        let map = self.register_rule_fields()?;
        let entry = map.field(field).ok_or_else(|| ValidationError::UnknownField {
            field: field.to_string(),
            type_name: map.type_name().to_string(),
        })?;

        let metadata = map.compile_rule(field, rule)?;
        let localizer = self.localizer();
        let result = metadata.validate(entry.descriptor(), &*self, localizer.as_deref())?;

        if let Some(message) = &result {
            let target: &mut dyn ValidationOwner = match proxy {
                Some(proxy) => proxy,
                None => self,
            };
            target.add_message(message.clone(), field)?;
        }
        Ok(result)
    }
}

/// Runs every rule of `entry`, in order, collecting distinct failures.
fn evaluate_field<T: Validatable>(
    owner: &T,
    entry: &FieldEntry<T>,
    localizer: Option<&dyn Localizer>,
) -> ValidationResult<Vec<ValidationMessage>> {
    let mut messages: Vec<ValidationMessage> = Vec::new();
    for rule in entry.rules() {
        if let Some(message) = rule.validate(entry.descriptor(), owner, localizer)? {
            if !messages.contains(&message) {
                messages.push(message);
            }
        }
    }
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::value::Value;

    struct Signup {
        state: ValidationState,
        email: String,
        password: String,
        age: i32,
        accepts_terms: bool,
    }

    impl Signup {
        fn new() -> Self {
            Self {
                state: ValidationState::for_type::<Signup>().unwrap(),
                email: String::new(),
                password: String::new(),
                age: 0,
                accepts_terms: false,
            }
        }
    }

    impl FieldSource for Signup {
        fn field(&self, name: &str) -> Option<Value<'_>> {
            match name {
                "Email" => Some(Value::from(&self.email)),
                "Password" => Some(Value::from(&self.password)),
                "Age" => Some(Value::from(self.age)),
                "AcceptsTerms" => Some(Value::from(self.accepts_terms)),
                _ => None,
            }
        }
    }

    impl ValidationOwner for Signup {
        fn validation_state(&self) -> &ValidationState {
            &self.state
        }

        fn validation_state_mut(&mut self) -> &mut ValidationState {
            &mut self.state
        }
    }

    impl Validatable for Signup {
        fn rules() -> RuleSet<Self> {
            RuleSet::new()
                .field("Email", |s: &Signup| Value::from(&s.email), [
                    Rule::value_present().error("Email is required"),
                    Rule::string_length_greater_than(3).error("Email is required"),
                ])
                .field("Password", |s: &Signup| Value::from(&s.password), [
                    Rule::string_length_greater_than(6).error("Password is too short"),
                    Rule::custom("NoSpaces").warning("Password contains spaces"),
                ])
                .field("Age", |s: &Signup| Value::from(s.age), [
                    Rule::number_in_range(18, 65)
                        .error("Age is out of range")
                        .validate_if("AcceptsTerms"),
                ])
                .handler("NoSpaces", |s: &Signup, candidate, _| {
                    if s.password.contains(' ') {
                        candidate
                    } else {
                        None
                    }
                })
                .handler("AlwaysInvalid", |_: &Signup, candidate, _| {
                    candidate.or_else(|| Some(ValidationMessage::error("Intercepted")))
                })
        }

        fn localizer(&self) -> Option<Arc<dyn Localizer>> {
            None
        }
    }

    #[test]
    fn test_new_instance_has_an_entry_per_declared_field() {
        let signup = Signup::new();
        let names: Vec<_> = signup.validation_state().field_names().collect();
        assert_eq!(names, ["Email", "Password", "Age"]);
        assert!(!signup.has_messages(None, None));
    }

    #[test]
    fn test_validate_all_collects_distinct_messages_per_field() {
        let mut signup = Signup::new();
        signup.validate_all().unwrap();

        assert_eq!(signup.messages("Email"), [ValidationMessage::error("Email is required")]);
        assert_eq!(
            signup.messages("Password"),
            [ValidationMessage::error("Password is too short")]
        );
        // Age is gated by AcceptsTerms.
        assert!(signup.messages("Age").is_empty());
    }

    #[test]
    fn test_validate_field_only_touches_that_field() {
        let mut signup = Signup::new();
        signup.validate_all().unwrap();
        let mut events = signup.subscribe();

        signup.email = "ab@cd.com".into();
        signup.validate_field("Email").unwrap();

        assert!(signup.messages("Email").is_empty());
        assert!(signup.has_messages(Some("Password"), Some(MessageKind::Error)));
        let event = events.try_recv().unwrap();
        assert_eq!(event.field, "Email");
        assert!(event.is_valid());
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_validate_field_with_empty_name_validates_everything() {
        let mut signup = Signup::new();
        signup.validate_field("").unwrap();
        assert!(signup.has_messages(Some("Email"), None));
        assert!(signup.has_messages(Some("Password"), None));
    }

    #[test]
    fn test_unknown_field_is_an_error() {
        let mut signup = Signup::new();
        assert!(matches!(
            signup.validate_field("Nickname"),
            Err(ValidationError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_rule_error_leaves_state_untouched() {
        let mut signup = Signup::new();
        signup
            .add_message(ValidationMessage::error("kept"), "Email")
            .unwrap();

        let err = signup
            .perform_validation(Rule::number_greater_than(0).error("x"), "Email", None)
            .unwrap_err();
        assert!(matches!(err, ValidationError::TypeMismatch { .. }));
        assert_eq!(signup.messages("Email"), [ValidationMessage::error("kept")]);
    }

    #[test]
    fn test_refresh_only_revalidates_fields_with_messages() {
        let mut signup = Signup::new();
        signup.validate_all().unwrap();
        signup.email = "ab@cd.com".into();
        signup.password = "short".into();
        let mut events = signup.subscribe();

        signup.refresh_validation("Email").unwrap();
        assert!(signup.messages("Email").is_empty());

        signup.refresh_validation("Age").unwrap();
        assert!(signup.messages("Age").is_empty());

        let fields: Vec<_> = std::iter::from_fn(|| events.try_recv().ok())
            .map(|event| event.field)
            .collect();
        assert_eq!(fields, ["Email", "Age"]);

        assert!(matches!(
            signup.refresh_validation("Nope"),
            Err(ValidationError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_perform_validation_adds_to_self_or_proxy() {
        let mut signup = Signup::new();
        let mut view = ValidationState::with_capacity(4);

        let result = signup
            .perform_validation(
                Rule::value_present().warning("Password should be set"),
                "Password",
                Some(&mut view),
            )
            .unwrap();
        assert_eq!(result, Some(ValidationMessage::warning("Password should be set")));
        assert_eq!(view.messages("Password").len(), 1);
        assert!(signup.messages("Password").is_empty());

        signup
            .perform_validation(
                Rule::value_present().intercept_with("AlwaysInvalid").error("unused"),
                "Email",
                None,
            )
            .unwrap();
        assert_eq!(signup.messages("Email"), [ValidationMessage::error("unused")]);

        signup.email = "someone@example.com".into();
        signup
            .perform_validation(
                Rule::value_present().intercept_with("AlwaysInvalid").error("unused"),
                "Email",
                None,
            )
            .unwrap();
        assert!(signup.has_messages(Some("Email"), None));
        assert!(signup
            .messages("Email")
            .contains(&ValidationMessage::error("Intercepted")));
    }

    #[test]
    fn test_validate_with_delegate_adds_then_removes() {
        let mut signup = Signup::new();
        let failure = ValidationMessage::error("Terms must be accepted");

        let result = signup
            .validate_with_delegate(|s| s.accepts_terms, failure.clone(), "AcceptsTerms", None)
            .unwrap();
        assert_eq!(result, Some(failure.clone()));
        assert_eq!(signup.messages("AcceptsTerms"), [failure.clone()]);

        signup.accepts_terms = true;
        let result = signup
            .validate_with_delegate(|s| s.accepts_terms, failure.clone(), "AcceptsTerms", None)
            .unwrap();
        assert_eq!(result, None);
        assert!(signup.messages("AcceptsTerms").is_empty());

        assert_eq!(
            signup.validate_with_delegate(|_| true, failure, "", None),
            Err(ValidationError::MissingFieldName)
        );
    }

    #[test]
    fn test_registered_field_without_rules_is_cleared_by_validate_field() {
        let mut signup = Signup::new();
        signup
            .add_message(ValidationMessage::error("Mismatch"), "Confirm")
            .unwrap();

        signup.validate_field("Confirm").unwrap();
        assert!(signup.messages("Confirm").is_empty());

        signup
            .add_message(ValidationMessage::error("Mismatch"), "Confirm")
            .unwrap();
        signup.validate_all().unwrap();
        assert!(signup.messages("Confirm").is_empty());
    }

    #[test]
    fn remove_messages_clears_one_or_all_fields() {
        let mut signup = Signup::new();
        signup.validate_all().unwrap();

        signup.remove_messages(Some("Email"));
        assert!(signup.messages("Email").is_empty());
        assert!(signup.has_messages(None, None));

        signup.remove_messages(None);
        assert!(!signup.has_messages(None, None));
        assert_eq!(signup.all_messages().len(), 3);
    }

    #[test]
    fn listeners_observe_one_event_per_field() {
        use std::sync::Mutex;

        let mut signup = Signup::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        signup.on_validation_changed(move |event| {
            sink.lock().unwrap().push((event.field.clone(), event.messages.len()))
        });

        signup.password = "has a space".into();
        signup.validate_all().unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                ("Email".to_string(), 1),
                ("Password".to_string(), 1),
                ("Age".to_string(), 0),
            ]
        );
    }

    struct Applicant {
        state: ValidationState,
        age: i32,
    }

    impl FieldSource for Applicant {
        fn field(&self, name: &str) -> Option<Value<'_>> {
            match name {
                "Age" => Some(Value::from(self.age)),
                _ => None,
            }
        }
    }

    impl ValidationOwner for Applicant {
        fn validation_state(&self) -> &ValidationState {
            &self.state
        }

        fn validation_state_mut(&mut self) -> &mut ValidationState {
            &mut self.state
        }
    }

    impl Validatable for Applicant {
        fn rules() -> RuleSet<Self> {
            RuleSet::new().field("Age", |a: &Applicant| Value::from(a.age), [
                Rule::number_in_range(18, 65).error("Age is out of range"),
            ])
        }
    }

    #[test]
    fn test_default_state_still_exposes_declared_fields() {
        let mut applicant = Applicant {
            state: ValidationState::default(),
            age: 10,
        };

        let snapshot = applicant.field_messages().unwrap();
        assert_eq!(snapshot.get("Age"), Some(&Vec::new()));

        let mut events = applicant.subscribe();
        applicant.refresh_validation("Age").unwrap();
        assert!(applicant.validation_state().is_registered("Age"));
        assert_eq!(events.try_recv().unwrap().field, "Age");

        applicant.validate_field("Age").unwrap();
        assert_eq!(applicant.all_messages().len(), 1);
        assert_eq!(applicant.messages("Age"), [ValidationMessage::error("Age is out of range")]);
    }
}
