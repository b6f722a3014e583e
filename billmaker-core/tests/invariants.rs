//! Contract Invariant Tests
//!
//! These tests verify the guarantees other components rely on.

use billmaker_core::{
    focus::FocusRing,
    form::{FieldDescriptor, FieldOption, FieldType, SubmitFeedback},
    hashing::canonical_json,
    keys::resolve_combination,
    policy::ShortcutPolicy,
    validation::ValidatorKind,
    Combo, EventTarget, FieldValue, FormEngine, FormSpec, KeyEvent, LineItem, Money,
    ShortcutDispatcher,
};

#[test]
fn invariant_modifier_order_irrelevant() {
    let a = KeyEvent::new("k").ctrl().shift();
    let b = KeyEvent::new("K").shift().ctrl();
    assert_eq!(resolve_combination(&a), resolve_combination(&b));
    assert_eq!(resolve_combination(&a).unwrap().as_str(), "Ctrl+Shift+K");

    assert_eq!(
        Combo::parse("shift+ctrl+k").unwrap(),
        Combo::parse("Ctrl+Shift+K").unwrap()
    );
}

#[test]
fn invariant_resolution_is_deterministic() {
    let event = KeyEvent::new("ArrowDown").alt().meta().on(EventTarget::TextArea);
    let first = resolve_combination(&event);
    for _ in 0..10 {
        assert_eq!(resolve_combination(&event), first);
    }
}

#[test]
fn invariant_plain_keys_never_fire_in_inputs() {
    let dispatcher: ShortcutDispatcher<()> = ShortcutDispatcher::new(ShortcutPolicy::default());

    let typing = KeyEvent::new("a").on(EventTarget::TextInput);
    assert!(!dispatcher.is_executable(&typing, false));

    let outside = KeyEvent::new("a").on(EventTarget::Document);
    assert!(dispatcher.is_executable(&outside, false));

    let button = KeyEvent::new("a").on(EventTarget::Button);
    assert!(dispatcher.is_executable(&button, false));
}

#[test]
fn invariant_validators_short_circuit_in_order() {
    let spec = FormSpec::new(
        "Contact",
        vec![FieldDescriptor::new("email", FieldType::Email, "Email")
            .validators(vec![ValidatorKind::Required, ValidatorKind::Email])],
    );
    let mut engine = FormEngine::new();
    let id = engine.build_form(spec, |_| SubmitFeedback::Accepted).unwrap().id;

    assert!(!engine.validate_all(&id));
    let errors = engine.form(&id).unwrap().errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors["email"], "This field is required");
}

#[test]
fn invariant_untouched_form_extracts_initial_values() {
    let spec = FormSpec::new(
        "Settings",
        vec![
            FieldDescriptor::new("business", FieldType::Text, "Business").initial("UnifyX"),
            FieldDescriptor::new("terms", FieldType::Number, "Terms").initial("30"),
            FieldDescriptor::new("gst", FieldType::Checkbox, "Registered").initial("true"),
            FieldDescriptor::new("newsletter", FieldType::Checkbox, "Newsletter"),
            FieldDescriptor::new("template", FieldType::Select, "Template")
                .options(vec![
                    FieldOption::new("corporate", "Corporate"),
                    FieldOption::new("creative", "Creative"),
                ])
                .initial("creative"),
        ],
    );
    let mut engine = FormEngine::new();
    let id = engine.build_form(spec, |_| SubmitFeedback::Accepted).unwrap().id;
    let data = engine.extract_data(&id).unwrap();

    assert_eq!(data["business"], FieldValue::Text("UnifyX".into()));
    assert_eq!(data["terms"], FieldValue::Text("30".into()));
    assert_eq!(data["gst"], FieldValue::Bool(true));
    assert_eq!(data["newsletter"], FieldValue::Bool(false));
    assert_eq!(data["template"], FieldValue::Text("creative".into()));
}

#[test]
fn invariant_line_arithmetic_example() {
    let line = LineItem::new("Widget", 2.0, 100.0).with_discount(10.0).with_tax(18.0).totals().unwrap();
    assert_eq!(line.taxable_amount, Money::from_paise(18_000));
    assert_eq!(line.total_tax, Money::from_paise(3_240));
    assert_eq!(line.total, Money::from_paise(21_240));
    assert_eq!(line.total.to_string(), "212.40");
}

#[test]
fn invariant_gstin_examples() {
    assert!(ValidatorKind::Gstin.validate("29ABCDE1234F1Z5").valid);
    assert!(!ValidatorKind::Gstin.validate("1234ABCDE1234F1Z5").valid);
}

#[test]
fn invariant_focus_wraps_both_ways() {
    let mut ring = FocusRing::new(["name", "email", "submit"]);

    ring.focus_index(2);
    assert_eq!(ring.focus_next(), Some("name"));
    assert_eq!(ring.current_index(), Some(0));

    assert_eq!(ring.focus_previous(), Some("submit"));
    assert_eq!(ring.current_index(), Some(2));
}

#[test]
fn invariant_canonical_json_deterministic() {
    use serde_json::json;

    let obj1 = json!({"z": 1, "a": 2, "m": {"b": 1, "a": 2}});
    let obj2 = json!({"a": 2, "m": {"a": 2, "b": 1}, "z": 1});

    // Must be identical despite different input ordering
    assert_eq!(canonical_json(&obj1).unwrap(), canonical_json(&obj2).unwrap());
}
