//! Rule variants
//!
//! Every rule consumes a field descriptor plus the owning instance and yields
//! `Ok(None)` on success, `Ok(Some(message))` on an ordinary failure, or `Err(..)` for
//! a wiring defect (type mismatch, bad bound, unresolvable path). Rules are compiled
//! once per type and shared by every instance, so they hold no per-instance state;
//! the only interior mutability is the numeric width a rule binds to on first use.

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::error::{ValidationError, ValidationResult};
use crate::localization::{self, Localizer};
use crate::validation::message::{MessageKind, ValidationMessage};
use crate::validation::numeric::{Number, NumericWidth};
use crate::validation::value::{resolve, resolve_descriptor, FieldDescriptor, FieldPath, FieldSource, Value};

/// A named custom-handler delegate.
///
/// Receives the owning instance, the candidate message (absent when an intercepted rule
/// passed) and the field being validated. Returning `None` forces success; returning a
/// message makes it the rule's verdict.
pub type Handler<T> = Arc<
    dyn Fn(&T, Option<ValidationMessage>, &FieldDescriptor<T>) -> Option<ValidationMessage>
        + Send
        + Sync,
>;

/// Boxes a closure as a [`Handler`].
pub fn into_handler<T, F>(handler: F) -> Handler<T>
where
    F: Fn(&T, Option<ValidationMessage>, &FieldDescriptor<T>) -> Option<ValidationMessage>
        + Send
        + Sync
        + 'static,
{
    Arc::new(handler)
}

/// Core rule contract shared by every variant.
pub trait ValidationRule<T>: Send + Sync {
    fn name(&self) -> &'static str;

    /// Evaluates the rule. `candidate` is the message to report on failure.
    fn validate(
        &self,
        field: &FieldDescriptor<T>,
        owner: &T,
        candidate: ValidationMessage,
    ) -> ValidationResult<Option<ValidationMessage>>;
}

/// Fails on null, blank text and empty collections.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValuePresent;

impl ValuePresent {
    pub fn is_present(value: &Value<'_>) -> bool {
        match value {
            Value::Null => false,
            Value::Text(text) => !text.trim().is_empty(),
            Value::List(len) => *len > 0,
            Value::Bool(_) | Value::Number(_) | Value::Object(_) => true,
        }
    }
}

impl<T: FieldSource> ValidationRule<T> for ValuePresent {
    fn name(&self) -> &'static str {
        "ValuePresent"
    }

    fn validate(
        &self,
        field: &FieldDescriptor<T>,
        owner: &T,
        candidate: ValidationMessage,
    ) -> ValidationResult<Option<ValidationMessage>> {
        let value = field.value(owner);
        Ok((!Self::is_present(&value)).then_some(candidate))
    }
}

/// A configured numeric bound with an optional comparison path that may override it.
#[derive(Debug, Clone)]
pub struct NumericBound {
    literal: String,
    path: Option<FieldPath>,
}

impl NumericBound {
    pub fn new(literal: impl Into<String>, path: Option<FieldPath>) -> Self {
        Self {
            literal: literal.into(),
            path,
        }
    }

    pub fn literal(&self) -> &str {
        &self.literal
    }

    pub fn path(&self) -> Option<&FieldPath> {
        self.path.as_ref()
    }

    /// The bound in effect for `owner`.
    ///
    /// A comparison value that parses to a non-zero number of `width` wins. A zero or
    /// unparseable comparison value falls back to the static literal, which must parse.
    pub fn effective(&self, owner: &dyn FieldSource, width: NumericWidth) -> ValidationResult<Number> {
        if let Some(path) = &self.path {
            let value = resolve(owner, path)?;
            match value.to_literal().and_then(|raw| width.parse(&raw)) {
                Some(number) if !number.is_zero() => return Ok(number),
                _ => log::trace!(
                    "Comparison value at '{}' is zero or not a {}; using static bound {}",
                    path,
                    width,
                    self.literal
                ),
            }
        }

        width
            .parse(&self.literal)
            .ok_or_else(|| ValidationError::Conversion {
                value: self.literal.clone(),
                width,
            })
    }
}

#[derive(Debug, Clone)]
enum Comparison {
    InRange { min: NumericBound, max: NumericBound },
    LessThan(NumericBound),
    GreaterThan(NumericBound),
}

/// Width inferred from the first value a numeric rule sees.
#[derive(Debug, Default)]
struct WidthSlot(OnceLock<NumericWidth>);

impl WidthSlot {
    fn bind(&self, field: &str, number: &Number) -> ValidationResult<NumericWidth> {
        let width = *self.0.get_or_init(|| number.width());
        if width == number.width() {
            Ok(width)
        } else {
            Err(ValidationError::TypeMismatch {
                field: field.to_string(),
                expected: width.to_string(),
                found: number.width().to_string(),
            })
        }
    }

    fn get(&self) -> Option<NumericWidth> {
        self.0.get().copied()
    }
}

/// Shared evaluation for the three numeric rules.
#[derive(Debug)]
struct NumericCheck {
    comparison: Comparison,
    width: WidthSlot,
}

impl NumericCheck {
    fn new(comparison: Comparison) -> Self {
        Self {
            comparison,
            width: WidthSlot::default(),
        }
    }

    fn passes(&self, field: &str, value: &Value<'_>, owner: &dyn FieldSource) -> ValidationResult<bool> {
        let number = value.as_number().ok_or_else(|| ValidationError::TypeMismatch {
            field: field.to_string(),
            expected: self
                .width
                .get()
                .map(|width| width.to_string())
                .unwrap_or_else(|| "number".to_string()),
            found: value.kind_name(),
        })?;
        let width = self.width.bind(field, &number)?;

        let passed = match &self.comparison {
            Comparison::InRange { min, max } => {
                let min = min.effective(owner, width)?;
                let max = max.effective(owner, width)?;
                min <= number && number <= max
            }
            Comparison::LessThan(bound) => number < bound.effective(owner, width)?,
            Comparison::GreaterThan(bound) => number > bound.effective(owner, width)?,
        };
        log::trace!("{} {:?} -> {}", field, self.comparison, passed);
        Ok(passed)
    }

    fn evaluate<T: FieldSource>(
        &self,
        field: &FieldDescriptor<T>,
        owner: &T,
        candidate: ValidationMessage,
    ) -> ValidationResult<Option<ValidationMessage>> {
        let value = field.value(owner);
        let passed = self.passes(field.name(), &value, owner)?;
        Ok((!passed).then_some(candidate))
    }
}

/// Passes iff `min <= value <= max`.
#[derive(Debug)]
pub struct NumberInRange {
    check: NumericCheck,
}

impl NumberInRange {
    pub fn new(min: NumericBound, max: NumericBound) -> Self {
        Self {
            check: NumericCheck::new(Comparison::InRange { min, max }),
        }
    }

    /// Width this rule bound to, once it has seen a value.
    pub fn width(&self) -> Option<NumericWidth> {
        self.check.width.get()
    }
}

impl<T: FieldSource> ValidationRule<T> for NumberInRange {
    fn name(&self) -> &'static str {
        "NumberInRange"
    }

    fn validate(
        &self,
        field: &FieldDescriptor<T>,
        owner: &T,
        candidate: ValidationMessage,
    ) -> ValidationResult<Option<ValidationMessage>> {
        self.check.evaluate(field, owner, candidate)
    }
}

/// Passes iff `value < bound`.
#[derive(Debug)]
pub struct NumberLessThan {
    check: NumericCheck,
}

impl NumberLessThan {
    pub fn new(bound: NumericBound) -> Self {
        Self {
            check: NumericCheck::new(Comparison::LessThan(bound)),
        }
    }

    pub fn width(&self) -> Option<NumericWidth> {
        self.check.width.get()
    }
}

impl<T: FieldSource> ValidationRule<T> for NumberLessThan {
    fn name(&self) -> &'static str {
        "NumberLessThan"
    }

    fn validate(
        &self,
        field: &FieldDescriptor<T>,
        owner: &T,
        candidate: ValidationMessage,
    ) -> ValidationResult<Option<ValidationMessage>> {
        self.check.evaluate(field, owner, candidate)
    }
}

/// Passes iff `value > bound`.
#[derive(Debug)]
pub struct NumberGreaterThan {
    check: NumericCheck,
}

impl NumberGreaterThan {
    pub fn new(bound: NumericBound) -> Self {
        Self {
            check: NumericCheck::new(Comparison::GreaterThan(bound)),
        }
    }

    pub fn width(&self) -> Option<NumericWidth> {
        self.check.width.get()
    }

    /// Evaluates against an arbitrary value rather than a declared field.
    pub fn passes(&self, field: &str, value: &Value<'_>, owner: &dyn FieldSource) -> ValidationResult<bool> {
        self.check.passes(field, value, owner)
    }
}

impl<T: FieldSource> ValidationRule<T> for NumberGreaterThan {
    fn name(&self) -> &'static str {
        "NumberGreaterThan"
    }

    fn validate(
        &self,
        field: &FieldDescriptor<T>,
        owner: &T,
        candidate: ValidationMessage,
    ) -> ValidationResult<Option<ValidationMessage>> {
        self.check.evaluate(field, owner, candidate)
    }
}

/// A string length bound, optionally taken from another field.
///
/// A comparison value that is text contributes its length; any other scalar must parse
/// as an integer to replace the static length.
#[derive(Debug, Clone)]
pub struct LengthBound {
    length: i64,
    path: Option<FieldPath>,
}

impl LengthBound {
    pub fn new(length: i64, path: Option<FieldPath>) -> Self {
        Self { length, path }
    }

    pub fn effective(&self, owner: &dyn FieldSource) -> ValidationResult<i64> {
        let Some(path) = &self.path else {
            return Ok(self.length);
        };

        let bound = match resolve(owner, path)? {
            Value::Text(text) => text.chars().count() as i64,
            Value::Null => self.length,
            other => other
                .to_literal()
                .and_then(|raw| raw.trim().parse().ok())
                .unwrap_or(self.length),
        };
        Ok(bound)
    }
}

fn text_length(value: &Value<'_>) -> Option<i64> {
    match value {
        Value::Text(text) => Some(text.chars().count() as i64),
        Value::Null => Some(0),
        _ => None,
    }
}

/// Fails when the text is shorter than the bound or empty. Null counts as empty;
/// non-text values always fail.
#[derive(Debug, Clone)]
pub struct StringLengthGreaterThan {
    bound: LengthBound,
}

impl StringLengthGreaterThan {
    pub fn new(bound: LengthBound) -> Self {
        Self { bound }
    }
}

impl<T: FieldSource> ValidationRule<T> for StringLengthGreaterThan {
    fn name(&self) -> &'static str {
        "StringLengthGreaterThan"
    }

    fn validate(
        &self,
        field: &FieldDescriptor<T>,
        owner: &T,
        candidate: ValidationMessage,
    ) -> ValidationResult<Option<ValidationMessage>> {
        let bound = self.bound.effective(owner)?;
        let failed = match text_length(&field.value(owner)) {
            Some(len) => len < bound || len == 0,
            None => true,
        };
        Ok(failed.then_some(candidate))
    }
}

/// Fails when the text is longer than the bound. Null counts as empty; non-text
/// values pass.
#[derive(Debug, Clone)]
pub struct StringLengthLessThan {
    bound: LengthBound,
}

impl StringLengthLessThan {
    pub fn new(bound: LengthBound) -> Self {
        Self { bound }
    }
}

impl<T: FieldSource> ValidationRule<T> for StringLengthLessThan {
    fn name(&self) -> &'static str {
        "StringLengthLessThan"
    }

    fn validate(
        &self,
        field: &FieldDescriptor<T>,
        owner: &T,
        candidate: ValidationMessage,
    ) -> ValidationResult<Option<ValidationMessage>> {
        let bound = self.bound.effective(owner)?;
        let failed = match text_length(&field.value(owner)) {
            Some(len) => len > bound,
            None => false,
        };
        Ok(failed.then_some(candidate))
    }
}

/// Delegates the verdict to a named handler. Without a handler the candidate is
/// always reported.
pub struct CustomHandler<T> {
    delegate: Option<(String, Handler<T>)>,
}

impl<T> CustomHandler<T> {
    pub fn new(name: impl Into<String>, handler: Handler<T>) -> Self {
        Self {
            delegate: Some((name.into(), handler)),
        }
    }

    pub fn unbound() -> Self {
        Self { delegate: None }
    }

    pub fn delegate_name(&self) -> Option<&str> {
        self.delegate.as_ref().map(|(name, _)| name.as_str())
    }
}

impl<T> fmt::Debug for CustomHandler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomHandler")
            .field("delegate", &self.delegate_name())
            .finish()
    }
}

impl<T> ValidationRule<T> for CustomHandler<T> {
    fn name(&self) -> &'static str {
        "CustomHandler"
    }

    fn validate(
        &self,
        field: &FieldDescriptor<T>,
        owner: &T,
        candidate: ValidationMessage,
    ) -> ValidationResult<Option<ValidationMessage>> {
        Ok(match &self.delegate {
            Some((_, handler)) => handler(owner, Some(candidate), field),
            None => Some(candidate),
        })
    }
}

/// A handler that gets the final say over another rule's raw result.
pub struct Interceptor<T> {
    name: String,
    handler: Handler<T>,
}

impl<T> Interceptor<T> {
    pub fn new(name: impl Into<String>, handler: Handler<T>) -> Self {
        Self {
            name: name.into(),
            handler,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn intercept(
        &self,
        owner: &T,
        raw: Option<ValidationMessage>,
        field: &FieldDescriptor<T>,
    ) -> Option<ValidationMessage> {
        (self.handler)(owner, raw, field)
    }
}

impl<T> fmt::Debug for Interceptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor").field("name", &self.name).finish()
    }
}

/// Gates a rule on the validity of another field.
#[derive(Debug, Clone)]
pub struct Guard {
    path: FieldPath,
}

impl Guard {
    pub fn new(path: FieldPath) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    /// Whether the guarded rule should run for `owner`.
    ///
    /// Booleans are used as-is, text must be non-blank, numbers must be greater than
    /// zero, null never passes and any other value does. A negated path inverts the
    /// outcome.
    pub fn allows(&self, owner: &dyn FieldSource) -> ValidationResult<bool> {
        let field = resolve_descriptor(owner, &self.path)?;
        let value = field.value();
        let valid = match &value {
            Value::Bool(flag) => *flag,
            Value::Text(text) => !text.trim().is_empty(),
            Value::Number(_) => {
                let positive = NumberGreaterThan::new(NumericBound::new("0", None));
                positive.passes(field.name(), &value, field.owner())?
            }
            Value::Null => false,
            Value::List(_) | Value::Object(_) => true,
        };
        Ok(valid != self.path.is_negated())
    }
}

/// One compiled rule with everything needed to evaluate it.
pub struct RuleMetadata<T> {
    rule: Box<dyn ValidationRule<T>>,
    message_kind: MessageKind,
    failure_message: String,
    localization_key: Option<String>,
    guard: Option<Guard>,
    interceptor: Option<Interceptor<T>>,
}

impl<T: FieldSource> RuleMetadata<T> {
    pub fn new(
        rule: Box<dyn ValidationRule<T>>,
        message_kind: MessageKind,
        failure_message: impl Into<String>,
    ) -> Self {
        Self {
            rule,
            message_kind,
            failure_message: failure_message.into(),
            localization_key: None,
            guard: None,
            interceptor: None,
        }
    }

    pub fn with_localization_key(mut self, key: Option<String>) -> Self {
        self.localization_key = key;
        self
    }

    pub fn with_guard(mut self, guard: Option<Guard>) -> Self {
        self.guard = guard;
        self
    }

    pub fn with_interceptor(mut self, interceptor: Option<Interceptor<T>>) -> Self {
        self.interceptor = interceptor;
        self
    }

    pub fn rule_name(&self) -> &'static str {
        self.rule.name()
    }

    pub fn message_kind(&self) -> MessageKind {
        self.message_kind
    }

    pub fn failure_message(&self) -> &str {
        &self.failure_message
    }

    pub fn localization_key(&self) -> Option<&str> {
        self.localization_key.as_deref()
    }

    pub fn guard(&self) -> Option<&Guard> {
        self.guard.as_ref()
    }

    pub fn interceptor(&self) -> Option<&Interceptor<T>> {
        self.interceptor.as_ref()
    }

    pub fn can_validate(&self, owner: &T) -> ValidationResult<bool> {
        match &self.guard {
            Some(guard) => guard.allows(owner),
            None => Ok(true),
        }
    }

    /// The message this rule reports when it fails.
    pub fn candidate(&self, localizer: Option<&dyn Localizer>) -> ValidationMessage {
        let text = localization::localize(
            localizer,
            self.localization_key.as_deref(),
            &self.failure_message,
        );
        ValidationMessage::new(self.message_kind, text)
    }

    /// Guard, then rule, then interception.
    pub fn validate(
        &self,
        field: &FieldDescriptor<T>,
        owner: &T,
        localizer: Option<&dyn Localizer>,
    ) -> ValidationResult<Option<ValidationMessage>> {
        if !self.can_validate(owner)? {
            log::trace!("{} on {} skipped by guard", self.rule.name(), field.name());
            return Ok(None);
        }

        let raw = self.rule.validate(field, owner, self.candidate(localizer))?;
        Ok(match &self.interceptor {
            Some(interceptor) => interceptor.intercept(owner, raw, field),
            None => raw,
        })
    }
}

impl<T> fmt::Debug for RuleMetadata<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleMetadata")
            .field("rule", &self.rule.name())
            .field("message_kind", &self.message_kind)
            .field("failure_message", &self.failure_message)
            .field("localization_key", &self.localization_key)
            .field("guard", &self.guard)
            .field("interceptor", &self.interceptor)
            .finish()
    }
}
