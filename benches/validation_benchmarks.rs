//! # Validation Engine Benchmarks
//!
//! Measures the hot paths of declared-rule validation:
//! - Full-instance validation on valid and invalid models
//! - Single-field validation
//! - Registry lookup of an already compiled rule table
//! - Nested comparison paths

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use validatable::prelude::*;

struct Address {
    street: String,
    number: i32,
}

impl FieldSource for Address {
    fn field(&self, name: &str) -> Option<Value<'_>> {
        match name {
            "Street" => Some(Value::from(&self.street)),
            "Number" => Some(Value::from(self.number)),
            _ => None,
        }
    }
}

/// Test data structure for benchmarking
struct BenchmarkPerson {
    state: ValidationState,
    name: String,
    email: String,
    age: i32,
    active: bool,
    nickname: String,
    address: Option<Address>,
}

impl BenchmarkPerson {
    fn new(id: u32, valid: bool) -> Self {
        let mut person = Self {
            state: ValidationState::with_capacity(16),
            name: format!("Person {}", id),
            email: format!("person{}@example.com", id),
            age: 20 + (id % 40) as i32,
            active: true,
            nickname: format!("p{}", id),
            address: Some(Address {
                street: "Rua Augusta".into(),
                number: 100 + id as i32,
            }),
        };
        if !valid {
            person.name.clear();
            person.age = 12;
            person.nickname = "a-nickname-longer-than-the-street".into();
        }
        person
    }
}

impl FieldSource for BenchmarkPerson {
    fn field(&self, name: &str) -> Option<Value<'_>> {
        match name {
            "Name" => Some(Value::from(&self.name)),
            "Email" => Some(Value::from(&self.email)),
            "Age" => Some(Value::from(self.age)),
            "Active" => Some(Value::from(self.active)),
            "Nickname" => Some(Value::from(&self.nickname)),
            "Address" => Some(Value::optional_object(&self.address)),
            _ => None,
        }
    }
}

impl ValidationOwner for BenchmarkPerson {
    fn validation_state(&self) -> &ValidationState {
        &self.state
    }

    fn validation_state_mut(&mut self) -> &mut ValidationState {
        &mut self.state
    }
}

impl Validatable for BenchmarkPerson {
    fn rules() -> RuleSet<Self> {
        RuleSet::new()
            .field("Name", |p: &BenchmarkPerson| Value::from(&p.name), [
                Rule::value_present().error("Name is required"),
                Rule::string_length_less_than(50).error("Name is too long"),
            ])
            .field("Email", |p: &BenchmarkPerson| Value::from(&p.email), [
                Rule::value_present().error("Email is required"),
                Rule::custom("EmailFormat").error("Email is invalid"),
            ])
            .field("Age", |p: &BenchmarkPerson| Value::from(p.age), [
                Rule::number_in_range(18, 120)
                    .validate_if("Active")
                    .error("Age is out of range"),
            ])
            .field("Nickname", |p: &BenchmarkPerson| Value::from(&p.nickname), [
                Rule::string_length_less_than(0)
                    .compared_to("Address.Street")
                    .warning("Nickname is longer than the street name"),
            ])
            .handler("EmailFormat", |p: &BenchmarkPerson, failure, _| {
                if p.email.contains('@') {
                    None
                } else {
                    failure
                }
            })
    }
}

/// Benchmark: Full-instance validation
pub fn benchmark_validate_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate_all");

    for valid in [true, false] {
        let label = if valid { "valid" } else { "invalid" };
        group.bench_with_input(BenchmarkId::new("person", label), &valid, |b, &valid| {
            let mut person = BenchmarkPerson::new(7, valid);
            b.iter(|| {
                person.validate_all().unwrap();
                black_box(person.has_messages(None, None))
            })
        });
    }

    group.finish();
}

/// Benchmark: Single-field validation
pub fn benchmark_validate_field(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate_field");

    for field in ["Name", "Age", "Nickname"] {
        group.bench_with_input(BenchmarkId::new("field", field), &field, |b, &field| {
            let mut person = BenchmarkPerson::new(7, false);
            b.iter(|| {
                person.validate_field(black_box(field)).unwrap();
                black_box(person.messages(field).len())
            })
        });
    }

    group.finish();
}

/// Benchmark: Cached rule table lookup
pub fn benchmark_rule_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("rule_lookup");

    // Warm the process-wide cache
    let _ = BenchmarkPerson::rule_map().unwrap();

    group.bench_function("registry_hit", |b| {
        b.iter(|| black_box(BenchmarkPerson::rule_map().unwrap().rule_count()))
    });

    group.bench_function("local_registry_compile", |b| {
        b.iter(|| {
            let registry = RuleRegistry::new();
            black_box(
                registry
                    .get_or_build(BenchmarkPerson::rules)
                    .unwrap()
                    .rule_count(),
            )
        })
    });

    group.finish();
}

/// Benchmark: Many instances validated in sequence
pub fn benchmark_batch_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_validation");

    for size in [100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("people", size), size, |b, &size| {
            let mut people: Vec<_> = (0..size as u32)
                .map(|i| BenchmarkPerson::new(i, i % 4 != 0))
                .collect();
            b.iter(|| {
                let invalid = people
                    .iter_mut()
                    .filter_map(|p| p.validate_all().ok().map(|_| p.has_messages(None, None)))
                    .filter(|invalid| *invalid)
                    .count();
                black_box(invalid)
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_validate_all,
    benchmark_validate_field,
    benchmark_rule_lookup,
    benchmark_batch_validation
);
criterion_main!(benches);
