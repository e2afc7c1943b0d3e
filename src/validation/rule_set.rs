//! Rule declaration tables
//!
//! A type declares its rules once, as an ordered table of fields, each with an ordered
//! list of [`Rule`]s, plus the named handlers its custom rules and interceptors refer
//! to. [`RuleSet::compile`] checks the declarations, parses every path and binds every
//! handler name, producing the immutable [`FieldRuleMap`] the registry caches.

use std::any::type_name;
use std::collections::HashMap;
use std::fmt;

use crate::error::{PathError, ValidationError, ValidationResult};
use crate::validation::message::{MessageKind, ValidationMessage};
use crate::validation::validation_rules::{
    into_handler, CustomHandler, Guard, Handler, Interceptor, LengthBound, NumberGreaterThan,
    NumberInRange, NumberLessThan, NumericBound, RuleMetadata, StringLengthGreaterThan,
    StringLengthLessThan, ValidationRule, ValuePresent,
};
use crate::validation::value::{FieldDescriptor, FieldPath, FieldSource, Value};

/// Kind-specific parameters of a declared rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleKind {
    ValuePresent,
    NumberInRange {
        min: String,
        max: String,
        min_path: Option<String>,
        max_path: Option<String>,
    },
    NumberLessThan {
        bound: String,
        path: Option<String>,
    },
    NumberGreaterThan {
        bound: String,
        path: Option<String>,
    },
    StringLengthGreaterThan {
        min: i64,
        path: Option<String>,
    },
    StringLengthLessThan {
        max: i64,
        path: Option<String>,
    },
    CustomHandler {
        delegate: Option<String>,
    },
}

impl RuleKind {
    pub fn name(&self) -> &'static str {
        match self {
            RuleKind::ValuePresent => "ValuePresent",
            RuleKind::NumberInRange { .. } => "NumberInRange",
            RuleKind::NumberLessThan { .. } => "NumberLessThan",
            RuleKind::NumberGreaterThan { .. } => "NumberGreaterThan",
            RuleKind::StringLengthGreaterThan { .. } => "StringLengthGreaterThan",
            RuleKind::StringLengthLessThan { .. } => "StringLengthLessThan",
            RuleKind::CustomHandler { .. } => "CustomHandler",
        }
    }

    /// Every comparison path this rule declares, as written.
    pub fn comparison_paths(&self) -> impl Iterator<Item = &str> + '_ {
        let paths = match self {
            RuleKind::NumberInRange {
                min_path, max_path, ..
            } => [min_path.as_ref(), max_path.as_ref()],
            RuleKind::NumberLessThan { path, .. }
            | RuleKind::NumberGreaterThan { path, .. }
            | RuleKind::StringLengthGreaterThan { path, .. }
            | RuleKind::StringLengthLessThan { path, .. } => [path.as_ref(), None],
            RuleKind::ValuePresent | RuleKind::CustomHandler { .. } => [None, None],
        };
        paths.into_iter().flatten().map(String::as_str)
    }
}

/// A single declared rule, before compilation.
///
/// Every rule needs a message kind, usually set together with its failure text through
/// [`Rule::error`] or [`Rule::warning`].
///
/// # Examples
///
/// ```
/// use validatable::prelude::*;
///
/// let rule = Rule::number_in_range(18, 65)
///     .error("Age must be between 18 and 65")
///     .validate_if("IsAdultCheckEnabled");
/// assert_eq!(rule.kind().name(), "NumberInRange");
/// ```
#[derive(Debug, Clone)]
pub struct Rule {
    kind: RuleKind,
    message_kind: Option<MessageKind>,
    failure_message: String,
    localization_key: Option<String>,
    guard: Option<String>,
    interceptor: Option<String>,
    misapplied: Vec<&'static str>,
}

impl Rule {
    fn of(kind: RuleKind) -> Self {
        Self {
            kind,
            message_kind: None,
            failure_message: String::new(),
            localization_key: None,
            guard: None,
            interceptor: None,
            misapplied: Vec::new(),
        }
    }

    pub fn value_present() -> Self {
        Self::of(RuleKind::ValuePresent)
    }

    pub fn number_in_range(min: impl ToString, max: impl ToString) -> Self {
        Self::of(RuleKind::NumberInRange {
            min: min.to_string(),
            max: max.to_string(),
            min_path: None,
            max_path: None,
        })
    }

    pub fn number_less_than(bound: impl ToString) -> Self {
        Self::of(RuleKind::NumberLessThan {
            bound: bound.to_string(),
            path: None,
        })
    }

    pub fn number_greater_than(bound: impl ToString) -> Self {
        Self::of(RuleKind::NumberGreaterThan {
            bound: bound.to_string(),
            path: None,
        })
    }

    pub fn string_length_greater_than(min: i64) -> Self {
        Self::of(RuleKind::StringLengthGreaterThan { min, path: None })
    }

    pub fn string_length_less_than(max: i64) -> Self {
        Self::of(RuleKind::StringLengthLessThan { max, path: None })
    }

    /// A rule decided by the named handler. An empty name always reports the failure.
    pub fn custom(delegate: impl Into<String>) -> Self {
        let delegate = delegate.into();
        Self::of(RuleKind::CustomHandler {
            delegate: (!delegate.trim().is_empty()).then_some(delegate),
        })
    }

    pub fn error(self, text: impl Into<String>) -> Self {
        self.message_kind(MessageKind::Error).failure_message(text)
    }

    pub fn warning(self, text: impl Into<String>) -> Self {
        self.message_kind(MessageKind::Warning).failure_message(text)
    }

    pub fn message_kind(mut self, kind: MessageKind) -> Self {
        self.message_kind = Some(kind);
        self
    }

    pub fn failure_message(mut self, text: impl Into<String>) -> Self {
        self.failure_message = text.into();
        self
    }

    /// Localization key looked up before the static failure text is used.
    pub fn localized(mut self, key: impl Into<String>) -> Self {
        self.localization_key = Some(key.into());
        self
    }

    /// Only run this rule while the field at `path` is valid (`!path` inverts).
    pub fn validate_if(mut self, path: impl Into<String>) -> Self {
        self.guard = Some(path.into());
        self
    }

    /// Route the raw result through the named handler.
    pub fn intercept_with(mut self, handler: impl Into<String>) -> Self {
        self.interceptor = Some(handler.into());
        self
    }

    /// Take the bound from another field.
    pub fn compared_to(mut self, path: impl Into<String>) -> Self {
        let path = Some(path.into());
        match &mut self.kind {
            RuleKind::NumberLessThan { path: slot, .. }
            | RuleKind::NumberGreaterThan { path: slot, .. }
            | RuleKind::StringLengthGreaterThan { path: slot, .. }
            | RuleKind::StringLengthLessThan { path: slot, .. } => *slot = path,
            _ => self.misapplied.push("compared_to"),
        }
        self
    }

    pub fn min_compared_to(mut self, path: impl Into<String>) -> Self {
        match &mut self.kind {
            RuleKind::NumberInRange { min_path, .. } => *min_path = Some(path.into()),
            _ => self.misapplied.push("min_compared_to"),
        }
        self
    }

    pub fn max_compared_to(mut self, path: impl Into<String>) -> Self {
        match &mut self.kind {
            RuleKind::NumberInRange { max_path, .. } => *max_path = Some(path.into()),
            _ => self.misapplied.push("max_compared_to"),
        }
        self
    }

    pub fn kind(&self) -> &RuleKind {
        &self.kind
    }
}

/// The declaration table for `T`.
///
/// # Examples
///
/// ```ignore
/// fn rules() -> RuleSet<User> {
///     RuleSet::new()
///         .field("Email", |u: &User| Value::from(&u.email), [
///             Rule::value_present().error("Email is required"),
///         ])
///         .field("Password", |u: &User| Value::from(&u.password), [
///             Rule::string_length_greater_than(6)
///                 .compared_to("Email")
///                 .error("Password is too short"),
///             Rule::custom("PasswordHasNoSpaces").error("Password cannot contain spaces"),
///         ])
///         .handler("PasswordHasNoSpaces", |u: &User, candidate, _| {
///             u.password.contains(' ').then_some(candidate).flatten()
///         })
/// }
/// ```
pub struct RuleSet<T> {
    fields: Vec<(FieldDescriptor<T>, Vec<Rule>)>,
    handlers: HashMap<String, Handler<T>>,
}

impl<T> Default for RuleSet<T> {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            handlers: HashMap::new(),
        }
    }
}

impl<T> RuleSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a field with its getter and rules. Declaring the same name again
    /// appends to the first declaration.
    pub fn field<F, I>(mut self, name: impl Into<String>, getter: F, rules: I) -> Self
    where
        F: for<'a> Fn(&'a T) -> Value<'a> + Send + Sync + 'static,
        I: IntoIterator<Item = Rule>,
    {
        let name = name.into();
        match self.fields.iter_mut().find(|(field, _)| field.name() == name) {
            Some((_, existing)) => existing.extend(rules),
            None => {
                let descriptor = FieldDescriptor::new(name, getter);
                self.fields.push((descriptor, rules.into_iter().collect()));
            }
        }
        self
    }

    /// Registers a named handler for custom rules and interceptors.
    pub fn handler<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&T, Option<ValidationMessage>, &FieldDescriptor<T>) -> Option<ValidationMessage>
            + Send
            + Sync
            + 'static,
    {
        self.handlers.insert(name.into(), into_handler(handler));
        self
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<T: FieldSource + 'static> RuleSet<T> {
    /// Checks every declaration and binds paths and handlers.
    pub fn compile(self) -> ValidationResult<FieldRuleMap<T>> {
        let mut map = FieldRuleMap {
            type_name: type_name::<T>(),
            fields: Vec::with_capacity(self.fields.len()),
            handlers: self.handlers,
        };

        for (descriptor, rules) in self.fields {
            let rules = rules
                .into_iter()
                .map(|rule| map.compile_rule(descriptor.name(), rule))
                .collect::<ValidationResult<Vec<_>>>()?;
            map.fields.push(FieldEntry { descriptor, rules });
        }

        log::debug!(
            "Compiled {} rules across {} fields for {}",
            map.rule_count(),
            map.fields.len(),
            map.type_name
        );
        Ok(map)
    }
}

impl<T> fmt::Debug for RuleSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleSet")
            .field("fields", &self.fields)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A field together with its compiled rules, in declaration order.
pub struct FieldEntry<T> {
    descriptor: FieldDescriptor<T>,
    rules: Vec<RuleMetadata<T>>,
}

impl<T> FieldEntry<T> {
    pub fn descriptor(&self) -> &FieldDescriptor<T> {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn rules(&self) -> &[RuleMetadata<T>] {
        &self.rules
    }
}

impl<T> fmt::Debug for FieldEntry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldEntry")
            .field("descriptor", &self.descriptor)
            .field("rules", &self.rules)
            .finish()
    }
}

/// Compiled, immutable rule metadata for one type.
pub struct FieldRuleMap<T> {
    type_name: &'static str,
    fields: Vec<FieldEntry<T>>,
    handlers: HashMap<String, Handler<T>>,
}

impl<T> FieldRuleMap<T> {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn fields(&self) -> &[FieldEntry<T>] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldEntry<T>> {
        self.fields.iter().find(|entry| entry.name() == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.iter().map(FieldEntry::name)
    }

    pub fn rule_count(&self) -> usize {
        self.fields.iter().map(|entry| entry.rules.len()).sum()
    }

    fn handler(&self, name: &str) -> ValidationResult<Handler<T>> {
        self.handlers
            .get(name)
            .cloned()
            .ok_or_else(|| ValidationError::MissingHandler {
                handler: name.to_string(),
                type_name: self.type_name.to_string(),
            })
    }
}

impl<T: FieldSource + 'static> FieldRuleMap<T> {
    /// Compiles one rule for `field` against this type's handler table.
    pub fn compile_rule(&self, field: &str, rule: Rule) -> ValidationResult<RuleMetadata<T>> {
        let rule_name = rule.kind.name();
        let misconfigured =
            |reason: String| ValidationError::configuration(self.type_name, field, rule_name, reason);

        if let Some(option) = rule.misapplied.first() {
            return Err(misconfigured(format!("'{}' does not apply to this rule", option)));
        }
        if let Some(path) = rule
            .kind
            .comparison_paths()
            .find(|path| path.trim_start().starts_with('!'))
        {
            return Err(misconfigured(format!("comparison path '{}' cannot be negated", path)));
        }
        let message_kind = rule
            .message_kind
            .ok_or_else(|| misconfigured("no message kind was declared".to_string()))?;

        let guard = match rule.guard.as_deref().filter(|raw| !raw.trim().is_empty()) {
            Some(raw) => Some(Guard::new(FieldPath::parse(raw)?)),
            None => None,
        };

        let interceptor = match rule.interceptor.filter(|name| !name.trim().is_empty()) {
            Some(name) if matches!(rule.kind, RuleKind::CustomHandler { .. }) => {
                log::warn!(
                    "Ignoring interceptor '{}' on custom rule for {}.{}",
                    name,
                    self.type_name,
                    field
                );
                None
            }
            Some(name) => {
                let handler = self.handler(&name)?;
                Some(Interceptor::new(name, handler))
            }
            None => None,
        };

        let compiled: Box<dyn ValidationRule<T>> = match rule.kind {
            RuleKind::ValuePresent => Box::new(ValuePresent),
            RuleKind::NumberInRange {
                min,
                max,
                min_path,
                max_path,
            } => Box::new(NumberInRange::new(
                NumericBound::new(min, comparison_path(min_path.as_deref())?),
                NumericBound::new(max, comparison_path(max_path.as_deref())?),
            )),
            RuleKind::NumberLessThan { bound, path } => Box::new(NumberLessThan::new(
                NumericBound::new(bound, comparison_path(path.as_deref())?),
            )),
            RuleKind::NumberGreaterThan { bound, path } => Box::new(NumberGreaterThan::new(
                NumericBound::new(bound, comparison_path(path.as_deref())?),
            )),
            RuleKind::StringLengthGreaterThan { min, path } => Box::new(
                StringLengthGreaterThan::new(LengthBound::new(min, comparison_path(path.as_deref())?)),
            ),
            RuleKind::StringLengthLessThan { max, path } => Box::new(StringLengthLessThan::new(
                LengthBound::new(max, comparison_path(path.as_deref())?),
            )),
            RuleKind::CustomHandler { delegate: Some(name) } => {
                let handler = self.handler(&name)?;
                Box::new(CustomHandler::new(name, handler))
            }
            RuleKind::CustomHandler { delegate: None } => Box::new(CustomHandler::unbound()),
        };

        Ok(RuleMetadata::new(compiled, message_kind, rule.failure_message)
            .with_localization_key(rule.localization_key)
            .with_guard(guard)
            .with_interceptor(interceptor))
    }
}

impl<T> fmt::Debug for FieldRuleMap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldRuleMap")
            .field("type_name", &self.type_name)
            .field("fields", &self.fields)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn comparison_path(raw: Option<&str>) -> Result<Option<FieldPath>, PathError> {
    match raw.filter(|raw| !raw.trim().is_empty()) {
        Some(raw) => {
            let path = FieldPath::parse(raw)?;
            Ok(Some(path))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Order {
        code: String,
        quantity: i32,
        max_quantity: i32,
        express: bool,
    }

    impl FieldSource for Order {
        fn field(&self, name: &str) -> Option<Value<'_>> {
            match name {
                "Code" => Some(Value::from(&self.code)),
                "Quantity" => Some(Value::from(self.quantity)),
                "MaxQuantity" => Some(Value::from(self.max_quantity)),
                "Express" => Some(Value::from(self.express)),
                _ => None,
            }
        }
    }

    fn code(o: &Order) -> Value<'_> {
        Value::from(&o.code)
    }

    fn quantity(o: &Order) -> Value<'_> {
        Value::from(o.quantity)
    }

    #[test]
    fn test_compile_preserves_declaration_order() {
        let map = RuleSet::<Order>::new()
            .field("Quantity", quantity, [
                Rule::number_greater_than(0).error("Quantity must be positive"),
                Rule::number_less_than(100)
                    .compared_to("MaxQuantity")
                    .warning("Quantity is unusually large"),
            ])
            .field("Code", code, [Rule::value_present().error("Code is required")])
            .compile()
            .unwrap();

        assert_eq!(map.field_names().collect::<Vec<_>>(), ["Quantity", "Code"]);
        assert_eq!(map.rule_count(), 3);

        let quantity_rules = map.field("Quantity").unwrap().rules();
        assert_eq!(quantity_rules[0].rule_name(), "NumberGreaterThan");
        assert_eq!(quantity_rules[1].rule_name(), "NumberLessThan");
        assert_eq!(quantity_rules[1].message_kind(), MessageKind::Warning);
        assert!(map.field("Missing").is_none());
        assert!(map.type_name().ends_with("Order"));
    }

    #[test]
    fn test_duplicate_field_declarations_merge() {
        let map = RuleSet::<Order>::new()
            .field("Code", code, [Rule::value_present().error("Code is required")])
            .field("Code", code, [Rule::string_length_less_than(5).error("Code is too long")])
            .compile()
            .unwrap();

        assert_eq!(map.fields().len(), 1);
        assert_eq!(map.field("Code").unwrap().rules().len(), 2);
    }

    #[test]
    fn test_missing_message_kind_is_a_configuration_error() {
        let err = RuleSet::<Order>::new()
            .field("Code", code, [Rule::value_present().failure_message("Code is required")])
            .compile()
            .unwrap_err();

        assert!(matches!(
            err,
            ValidationError::Configuration { ref field, rule: "ValuePresent", .. } if field == "Code"
        ));
    }

    #[test]
    fn test_unknown_handler_is_a_lookup_error() {
        let err = RuleSet::<Order>::new()
            .field("Code", code, [Rule::custom("CheckCode").error("Bad code")])
            .compile()
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingHandler {
                handler: "CheckCode".into(),
                type_name: type_name::<Order>().into(),
            }
        );

        let err = RuleSet::<Order>::new()
            .field("Code", code, [Rule::value_present().error("x").intercept_with("Nope")])
            .compile()
            .unwrap_err();
        assert!(err.is_lookup());
    }

    #[test]
    fn test_misapplied_option_is_rejected() {
        let err = RuleSet::<Order>::new()
            .field("Code", code, [Rule::value_present().compared_to("Quantity").error("x")])
            .compile()
            .unwrap_err();
        assert!(matches!(err, ValidationError::Configuration { .. }));

        let err = RuleSet::<Order>::new()
            .field("Quantity", quantity, [Rule::number_less_than(3).min_compared_to("MaxQuantity").error("x")])
            .compile()
            .unwrap_err();
        assert!(err.to_string().contains("min_compared_to"));
    }

    #[test]
    fn test_negated_comparison_path_is_rejected() {
        let err = RuleSet::<Order>::new()
            .field("Quantity", quantity, [
                Rule::number_less_than(100).compared_to("!MaxQuantity").error("x"),
            ])
            .compile()
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::Configuration { rule: "NumberLessThan", ref reason, .. }
                if reason.contains("!MaxQuantity")
        ));

        let err = RuleSet::<Order>::new()
            .field("Quantity", quantity, [
                Rule::number_in_range(1, 10).max_compared_to(" !MaxQuantity").error("x"),
            ])
            .compile()
            .unwrap_err();
        assert!(matches!(err, ValidationError::Configuration { .. }));

        // Guards keep their negation.
        assert!(RuleSet::<Order>::new()
            .field("Code", code, [Rule::value_present().error("x").validate_if("!Express")])
            .compile()
            .is_ok());
    }

    #[test]
    fn test_bad_guard_path_fails_compilation() {
        let err = RuleSet::<Order>::new()
            .field("Code", code, [Rule::value_present().error("x").validate_if("Express..Flag")])
            .compile()
            .unwrap_err();
        assert!(matches!(err, ValidationError::Path(PathError::EmptySegment { .. })));
    }

    #[test]
    fn interceptor_on_custom_rule_is_ignored() {
        let map = RuleSet::<Order>::new()
            .field("Code", code, [Rule::custom("Check").error("x").intercept_with("Other")])
            .handler("Check", |_: &Order, candidate, _| candidate)
            .compile()
            .unwrap();
        assert!(map.field("Code").unwrap().rules()[0].interceptor().is_none());
    }

    #[test]
    fn compiled_rules_evaluate() {
        let map = RuleSet::<Order>::new()
            .field("Quantity", quantity, [
                Rule::number_in_range(1, 10)
                    .max_compared_to("MaxQuantity")
                    .error("Quantity out of range")
                    .validate_if("Express"),
            ])
            .compile()
            .unwrap();
        let entry = map.field("Quantity").unwrap();
        let rule = &entry.rules()[0];

        let mut order = Order {
            quantity: 20,
            max_quantity: 50,
            ..Order::default()
        };
        assert_eq!(rule.validate(entry.descriptor(), &order, None).unwrap(), None);

        order.express = true;
        assert_eq!(rule.validate(entry.descriptor(), &order, None).unwrap(), None);

        order.max_quantity = 15;
        assert_eq!(
            rule.validate(entry.descriptor(), &order, None).unwrap(),
            Some(ValidationMessage::error("Quantity out of range"))
        );
    }

    #[test]
    fn ad_hoc_rules_compile_against_the_handler_table() {
        let map = RuleSet::<Order>::new()
            .handler("NeverValid", |_: &Order, candidate, _| candidate)
            .compile()
            .unwrap();

        let metadata = map
            .compile_rule("Code", Rule::custom("NeverValid").warning("Never"))
            .unwrap();
        assert_eq!(metadata.rule_name(), "CustomHandler");
        assert!(map.compile_rule("Code", Rule::custom("Absent").error("x")).is_err());

        let unbound = map.compile_rule("Code", Rule::custom("").error("Always")).unwrap();
        let descriptor = FieldDescriptor::new("Code", code);
        assert_eq!(
            unbound.validate(&descriptor, &Order::default(), None).unwrap(),
            Some(ValidationMessage::error("Always"))
        );
    }
}
