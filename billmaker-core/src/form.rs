//! Form Engine - declarative fields, validation, data extraction
//!
//! A form moves `Rendered -> Validating -> Submitted`, or back to
//! `Rendered` with error annotations when any field fails. Re-submitting
//! always starts at `Validating` again.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::markup;
use crate::validation::{first_failure, FormValidation, ValidatorKind};

#[derive(Debug, Error)]
pub enum FormError {
    #[error("Invalid form spec: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Field #{index} has no name")]
    MissingName { index: usize },

    #[error("Radio field '{0}' has no options")]
    MissingOptions(String),

    #[error("Field name '{0}' is shared by a checkbox and another control")]
    MixedControls(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Text,
    Email,
    Tel,
    Number,
    Date,
    Password,
    Textarea,
    Select,
    Checkbox,
    Radio,
    File,
}

impl FieldType {
    /// The `type` attribute of an `<input>` for this field.
    pub fn input_type(self) -> &'static str {
        match self {
            FieldType::Text | FieldType::Textarea | FieldType::Select => "text",
            FieldType::Email => "email",
            FieldType::Tel => "tel",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::Password => "password",
            FieldType::Checkbox => "checkbox",
            FieldType::Radio => "radio",
            FieldType::File => "file",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    pub value: String,
    pub label: String,
}

impl FieldOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub placeholder: String,
    /// Marks the control as required in markup. Validation only runs `validators`.
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub options: Vec<FieldOption>,
    #[serde(default)]
    pub initial_value: Option<String>,
    #[serde(default)]
    pub validators: Vec<ValidatorKind>,
    /// Multi-valued select.
    #[serde(default)]
    pub multiple: bool,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, field_type: FieldType, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type,
            label: label.into(),
            placeholder: String::new(),
            required: false,
            options: Vec::new(),
            initial_value: None,
            validators: Vec::new(),
            multiple: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn options(mut self, options: Vec<FieldOption>) -> Self {
        self.options = options;
        self
    }

    pub fn initial(mut self, value: impl Into<String>) -> Self {
        self.initial_value = Some(value.into());
        self
    }

    pub fn validators(mut self, validators: Vec<ValidatorKind>) -> Self {
        self.validators = validators;
        self
    }

    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    /// What a ticked checkbox submits: its first option value, else `"true"`.
    pub fn checkbox_value(&self) -> &str {
        self.options.first().map_or("true", |o| o.value.as_str())
    }

    fn initial_control(&self) -> ControlValue {
        let initial = self.initial_value.as_deref();
        match self.field_type {
            FieldType::Checkbox => ControlValue::Checked(initial.is_some_and(is_truthy)),
            FieldType::Select if self.multiple => ControlValue::Selected(
                initial
                    .map(|v| {
                        v.split(',')
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(String::from)
                            .collect()
                    })
                    .unwrap_or_default(),
            ),
            FieldType::Select | FieldType::Radio => {
                ControlValue::Selected(initial.map(String::from).into_iter().collect())
            }
            // File inputs cannot be pre-filled.
            FieldType::File => ControlValue::Text(String::new()),
            _ => ControlValue::Text(initial.unwrap_or_default().to_string()),
        }
    }

    fn cleared_control(&self) -> ControlValue {
        match self.field_type {
            FieldType::Checkbox => ControlValue::Checked(false),
            FieldType::Select | FieldType::Radio => ControlValue::Selected(Vec::new()),
            _ => ControlValue::Text(String::new()),
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "on" | "1" | "yes" | "checked"
    )
}

fn default_submit_label() -> String {
    "Submit".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSpec {
    /// Generated when absent.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    pub fields: Vec<FieldDescriptor>,
    #[serde(default = "default_submit_label")]
    pub submit_label: String,
}

impl FormSpec {
    pub fn new(title: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            id: None,
            title: title.into(),
            fields,
            submit_label: default_submit_label(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_submit_label(mut self, label: impl Into<String>) -> Self {
        self.submit_label = label.into();
        self
    }

    pub fn from_json(json: &str) -> Result<Self, FormError> {
        let spec: FormSpec = serde_json::from_str(json)?;
        spec.check()?;
        Ok(spec)
    }

    pub fn check(&self) -> Result<(), FormError> {
        let mut is_checkbox: HashMap<&str, bool> = HashMap::new();
        for (index, field) in self.fields.iter().enumerate() {
            if field.name.trim().is_empty() {
                return Err(FormError::MissingName { index });
            }
            if field.field_type == FieldType::Radio && field.options.is_empty() {
                return Err(FormError::MissingOptions(field.name.clone()));
            }
            let checkbox = field.field_type == FieldType::Checkbox;
            if *is_checkbox.entry(field.name.as_str()).or_insert(checkbox) != checkbox {
                return Err(FormError::MixedControls(field.name.clone()));
            }
        }
        Ok(())
    }
}

/// Current state of one rendered control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlValue {
    Text(String),
    Checked(bool),
    Selected(Vec<String>),
}

impl ControlValue {
    pub fn text(&self) -> &str {
        match self {
            ControlValue::Text(s) => s,
            _ => "",
        }
    }

    pub fn selected(&self) -> &[String] {
        match self {
            ControlValue::Selected(values) => values,
            _ => &[],
        }
    }

    /// The string validators see for this control.
    fn validation_value(&self) -> String {
        match self {
            ControlValue::Text(s) => s.clone(),
            ControlValue::Checked(true) => "true".to_string(),
            ControlValue::Checked(false) => String::new(),
            ControlValue::Selected(values) => values.join(","),
        }
    }
}

/// One extracted value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn merge(self, next: FieldValue) -> FieldValue {
        match (self, next) {
            (FieldValue::List(mut items), FieldValue::List(more)) => {
                items.extend(more);
                FieldValue::List(items)
            }
            (FieldValue::List(mut items), FieldValue::Text(s)) => {
                items.push(s);
                FieldValue::List(items)
            }
            (FieldValue::Text(prev), FieldValue::Text(s)) => FieldValue::List(vec![prev, s]),
            (FieldValue::Text(prev), FieldValue::List(more)) => {
                let mut items = vec![prev];
                items.extend(more);
                FieldValue::List(items)
            }
            // A bare flag carries no submitted value.
            (FieldValue::Bool(_), other) | (other, FieldValue::Bool(_)) => other,
        }
    }
}

/// Field name to submitted value.
pub type FormResult = BTreeMap<String, FieldValue>;

fn accumulate(data: &mut FormResult, name: &str, value: FieldValue) {
    match data.remove(name) {
        Some(existing) => {
            data.insert(name.to_string(), existing.merge(value));
        }
        None => {
            data.insert(name.to_string(), value);
        }
    }
}

/// Build the key/value result from a field set and its control states.
///
/// Repeated names accumulate into a list and multi-selects are always
/// lists. A lone checkbox is a flag; a checkbox group lists the values of
/// its ticked boxes, or is `false` when none are ticked.
pub fn extract_data(fields: &[FieldDescriptor], controls: &[ControlValue]) -> FormResult {
    let mut checkboxes: HashMap<&str, usize> = HashMap::new();
    for field in fields.iter().filter(|f| f.field_type == FieldType::Checkbox) {
        *checkboxes.entry(field.name.as_str()).or_default() += 1;
    }

    let mut data = FormResult::new();
    for (field, control) in fields.iter().zip(controls) {
        let name = field.name.as_str();
        match (field.field_type, control) {
            (_, ControlValue::Checked(checked)) if checkboxes.get(name).copied().unwrap_or(0) > 1 => {
                if *checked {
                    let value = field.checkbox_value().to_string();
                    accumulate(&mut data, name, FieldValue::List(vec![value]));
                }
            }
            (_, ControlValue::Checked(checked)) => {
                accumulate(&mut data, name, FieldValue::Bool(*checked));
            }
            (FieldType::Select, ControlValue::Selected(values)) if field.multiple => {
                accumulate(&mut data, name, FieldValue::List(values.clone()));
            }
            (FieldType::Select, ControlValue::Selected(values)) => {
                let value = values.first().cloned().unwrap_or_default();
                accumulate(&mut data, name, FieldValue::Text(value));
            }
            (_, ControlValue::Selected(values)) => {
                // An unanswered radio group submits nothing.
                for value in values {
                    accumulate(&mut data, name, FieldValue::Text(value.clone()));
                }
            }
            (_, ControlValue::Text(value)) => {
                accumulate(&mut data, name, FieldValue::Text(value.clone()));
            }
        }
    }
    for (name, count) in checkboxes {
        if count > 1 && !data.contains_key(name) {
            data.insert(name.to_string(), FieldValue::Bool(false));
        }
    }
    data
}

/// Whether the submission callback accepted the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitFeedback {
    Accepted,
    Rejected,
}

pub type SubmitHandler = Box<dyn FnMut(&FormResult) -> SubmitFeedback>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormPhase {
    Rendered,
    Validating,
    Submitted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted {
        data: FormResult,
        feedback: SubmitFeedback,
    },
    Invalid(BTreeMap<String, String>),
    UnknownForm,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedForm {
    pub id: String,
    pub markup: String,
}

pub struct FormInstance {
    id: String,
    spec: FormSpec,
    controls: Vec<ControlValue>,
    errors: BTreeMap<String, String>,
    phase: FormPhase,
    on_submit: SubmitHandler,
}

impl FormInstance {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn spec(&self) -> &FormSpec {
        &self.spec
    }

    pub fn controls(&self) -> &[ControlValue] {
        &self.controls
    }

    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    pub fn phase(&self) -> FormPhase {
        self.phase
    }

    pub fn markup(&self) -> String {
        markup::render_form(&self.id, &self.spec, &self.controls, &self.errors)
    }

    /// Clear old errors, then run each field's validators in declaration
    /// order, keeping only the first failure per field.
    pub fn validate_all(&mut self) -> FormValidation {
        self.errors.clear();
        for (field, control) in self.spec.fields.iter().zip(&self.controls) {
            if field.validators.is_empty() || self.errors.contains_key(&field.name) {
                continue;
            }
            if let Some(failure) = first_failure(&field.validators, &control.validation_value()) {
                self.errors.insert(field.name.clone(), failure.message);
            }
        }
        if !self.errors.is_empty() {
            debug!(form = %self.id, invalid = self.errors.len(), "form validation failed");
        }
        FormValidation::failure(self.errors.clone())
    }

    pub fn extract_data(&self) -> FormResult {
        extract_data(&self.spec.fields, &self.controls)
    }

    fn control_mut(&mut self, name: &str) -> Option<(&FieldDescriptor, &mut ControlValue)> {
        let index = self.spec.fields.iter().position(|f| f.name == name)?;
        Some((&self.spec.fields[index], &mut self.controls[index]))
    }

    /// Tick exactly the checkboxes named `name` whose value is in `values`.
    fn tick_checkboxes(&mut self, name: &str, values: &[&str]) -> bool {
        let mut found = false;
        for (field, control) in self.spec.fields.iter().zip(self.controls.iter_mut()) {
            if field.name == name && field.field_type == FieldType::Checkbox {
                *control = ControlValue::Checked(values.iter().any(|v| *v == field.checkbox_value()));
                found = true;
            }
        }
        found
    }

    fn reset(&mut self) {
        self.controls = self.spec.fields.iter().map(FieldDescriptor::cleared_control).collect();
        self.errors.clear();
        self.phase = FormPhase::Rendered;
    }
}

/// Owns every built form, looked up by form id.
#[derive(Default)]
pub struct FormEngine {
    forms: HashMap<String, FormInstance>,
}

impl FormEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render `spec` and store it for later lookup. A spec reusing an
    /// existing id replaces that form.
    pub fn build_form<F>(&mut self, spec: FormSpec, on_submit: F) -> Result<RenderedForm, FormError>
    where
        F: FnMut(&FormResult) -> SubmitFeedback + 'static,
    {
        spec.check()?;
        let id = spec
            .id
            .clone()
            .unwrap_or_else(|| format!("form-{}", Uuid::new_v4()));
        let controls = spec.fields.iter().map(FieldDescriptor::initial_control).collect();
        let form = FormInstance {
            id: id.clone(),
            spec,
            controls,
            errors: BTreeMap::new(),
            phase: FormPhase::Rendered,
            on_submit: Box::new(on_submit),
        };
        let markup = form.markup();
        debug!(form = %id, fields = form.spec.fields.len(), "form built");
        self.forms.insert(id.clone(), form);
        Ok(RenderedForm { id, markup })
    }

    pub fn form(&self, form_id: &str) -> Option<&FormInstance> {
        self.forms.get(form_id)
    }

    pub fn contains(&self, form_id: &str) -> bool {
        self.forms.contains_key(form_id)
    }

    pub fn remove(&mut self, form_id: &str) -> bool {
        self.forms.remove(form_id).is_some()
    }

    pub fn phase(&self, form_id: &str) -> Option<FormPhase> {
        self.forms.get(form_id).map(FormInstance::phase)
    }

    pub fn render(&self, form_id: &str) -> Option<String> {
        self.forms.get(form_id).map(FormInstance::markup)
    }

    /// Type into a text-like control, pick a radio/select option or tick a
    /// checkbox with a truthy string. False when the form or field is unknown.
    pub fn set_value(&mut self, form_id: &str, name: &str, value: &str) -> bool {
        let Some((_, control)) = self.control_mut(form_id, name) else {
            return false;
        };
        *control = match &*control {
            ControlValue::Text(_) => ControlValue::Text(value.to_string()),
            ControlValue::Checked(_) => ControlValue::Checked(is_truthy(value)),
            ControlValue::Selected(_) if value.is_empty() => ControlValue::Selected(Vec::new()),
            ControlValue::Selected(_) => ControlValue::Selected(vec![value.to_string()]),
        };
        true
    }

    pub fn set_checked(&mut self, form_id: &str, name: &str, checked: bool) -> bool {
        match self.control_mut(form_id, name) {
            Some((_, control)) if matches!(control, ControlValue::Checked(_)) => {
                *control = ControlValue::Checked(checked);
                true
            }
            _ => false,
        }
    }

    /// Replace the selection of a select, radio or checkbox group.
    /// Single-valued controls keep only the first value.
    pub fn select_values(&mut self, form_id: &str, name: &str, values: &[&str]) -> bool {
        if let Some(form) = self.forms.get_mut(form_id) {
            if form.tick_checkboxes(name, values) {
                return true;
            }
        }
        match self.control_mut(form_id, name) {
            Some((field, control)) if matches!(control, ControlValue::Selected(_)) => {
                let limit = if field.multiple { values.len() } else { 1 };
                *control = ControlValue::Selected(
                    values.iter().take(limit).map(|v| v.to_string()).collect(),
                );
                true
            }
            _ => false,
        }
    }

    fn control_mut(
        &mut self,
        form_id: &str,
        name: &str,
    ) -> Option<(&FieldDescriptor, &mut ControlValue)> {
        let form = self.forms.get_mut(form_id)?;
        let found = form.control_mut(name);
        if found.is_none() {
            debug!(form = %form_id, field = %name, "no such field");
        }
        found
    }

    /// Overall validity; an unknown form is never valid.
    pub fn validate_all(&mut self, form_id: &str) -> bool {
        match self.forms.get_mut(form_id) {
            Some(form) => form.validate_all().valid,
            None => false,
        }
    }

    pub fn extract_data(&self, form_id: &str) -> Option<FormResult> {
        self.forms.get(form_id).map(FormInstance::extract_data)
    }

    /// Validate, and only when every field passes, hand the extracted data
    /// to the form's submission callback.
    pub fn submit(&mut self, form_id: &str) -> SubmitOutcome {
        let Some(form) = self.forms.get_mut(form_id) else {
            debug!(form = %form_id, "submit for unknown form");
            return SubmitOutcome::UnknownForm;
        };

        form.phase = FormPhase::Validating;
        let validation = form.validate_all();
        if !validation.valid {
            form.phase = FormPhase::Rendered;
            return SubmitOutcome::Invalid(validation.errors);
        }

        let data = form.extract_data();
        form.phase = FormPhase::Submitted;
        let feedback = (form.on_submit)(&data);
        info!(form = %form_id, feedback = ?feedback, "form submitted");
        SubmitOutcome::Submitted { data, feedback }
    }

    /// Clear every value and error annotation.
    pub fn reset_form(&mut self, form_id: &str) -> bool {
        match self.forms.get_mut(form_id) {
            Some(form) => {
                form.reset();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn contact_spec() -> FormSpec {
        FormSpec::new(
            "Contact",
            vec![
                FieldDescriptor::new("name", FieldType::Text, "Name")
                    .required()
                    .validators(vec![ValidatorKind::Required]),
                FieldDescriptor::new("email", FieldType::Email, "Email")
                    .validators(vec![ValidatorKind::Required, ValidatorKind::Email]),
                FieldDescriptor::new("notes", FieldType::Textarea, "Notes"),
                FieldDescriptor::new("newsletter", FieldType::Checkbox, "Newsletter"),
            ],
        )
        .with_id("contact")
    }

    fn noop(_: &FormResult) -> SubmitFeedback {
        SubmitFeedback::Accepted
    }

    #[test]
    fn build_renders_every_control_with_error_slot() {
        let mut engine = FormEngine::new();
        let rendered = engine.build_form(contact_spec(), noop).unwrap();
        assert_eq!(rendered.id, "contact");
        assert!(rendered.markup.contains("type=\"email\""));
        assert!(rendered.markup.contains("<textarea"));
        assert!(rendered.markup.contains("type=\"checkbox\""));
        assert_eq!(rendered.markup.matches("class=\"error-message\"").count(), 4);
        assert_eq!(engine.phase("contact"), Some(FormPhase::Rendered));
    }

    #[test]
    fn generated_id_when_absent() {
        let mut engine = FormEngine::new();
        let spec = FormSpec::new("Anon", vec![FieldDescriptor::new("a", FieldType::Text, "A")]);
        let rendered = engine.build_form(spec, noop).unwrap();
        assert!(rendered.id.starts_with("form-"));
        assert!(engine.contains(&rendered.id));
    }

    #[test]
    fn select_has_placeholder_option() {
        let mut engine = FormEngine::new();
        let spec = FormSpec::new(
            "Pick",
            vec![FieldDescriptor::new("state", FieldType::Select, "State")
                .options(vec![FieldOption::new("KA", "Karnataka")])],
        );
        let rendered = engine.build_form(spec, noop).unwrap();
        assert!(rendered.markup.contains("<option value=\"\">Select State</option>"));
    }

    #[test]
    fn invalid_submission_keeps_callback_idle() {
        let calls = Rc::new(RefCell::new(0));
        let seen = Rc::clone(&calls);
        let mut engine = FormEngine::new();
        engine
            .build_form(contact_spec(), move |_| {
                *seen.borrow_mut() += 1;
                SubmitFeedback::Accepted
            })
            .unwrap();

        let outcome = engine.submit("contact");
        let SubmitOutcome::Invalid(errors) = outcome else {
            panic!("expected invalid outcome");
        };
        assert_eq!(errors.len(), 2);
        assert_eq!(errors["email"], "This field is required");
        assert_eq!(*calls.borrow(), 0);
        assert_eq!(engine.phase("contact"), Some(FormPhase::Rendered));
        assert!(engine.render("contact").unwrap().contains("has-error"));
    }

    #[test]
    fn valid_submission_invokes_callback_with_data() {
        let received = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&received);
        let mut engine = FormEngine::new();
        engine
            .build_form(contact_spec(), move |data| {
                *sink.borrow_mut() = Some(data.clone());
                SubmitFeedback::Rejected
            })
            .unwrap();
        assert!(engine.set_value("contact", "name", "Asha"));
        assert!(engine.set_value("contact", "email", "asha@example.in"));
        assert!(engine.set_checked("contact", "newsletter", true));

        let SubmitOutcome::Submitted { data, feedback } = engine.submit("contact") else {
            panic!("expected submission");
        };
        assert_eq!(feedback, SubmitFeedback::Rejected);
        assert_eq!(data["name"], FieldValue::Text("Asha".into()));
        assert_eq!(data["newsletter"], FieldValue::Bool(true));
        assert_eq!(received.borrow().as_ref(), Some(&data));
        assert_eq!(engine.phase("contact"), Some(FormPhase::Submitted));
    }

    #[test]
    fn resubmission_revalidates() {
        let mut engine = FormEngine::new();
        engine.build_form(contact_spec(), noop).unwrap();
        engine.set_value("contact", "name", "Asha");
        engine.set_value("contact", "email", "asha@example.in");
        assert!(matches!(engine.submit("contact"), SubmitOutcome::Submitted { .. }));
        engine.set_value("contact", "email", "broken");
        let SubmitOutcome::Invalid(errors) = engine.submit("contact") else {
            panic!("expected invalid outcome");
        };
        assert_eq!(errors["email"], "Please enter a valid email address");
    }

    #[test]
    fn validation_ignores_fields_without_validators() {
        let mut engine = FormEngine::new();
        let spec = FormSpec::new(
            "Loose",
            vec![FieldDescriptor::new("phone", FieldType::Tel, "Phone").required()],
        )
        .with_id("loose");
        engine.build_form(spec, noop).unwrap();
        assert!(engine.validate_all("loose"));
    }

    #[test]
    fn repeated_names_and_multi_select_accumulate() {
        let fields = vec![
            FieldDescriptor::new("tag", FieldType::Text, "Tag").initial("a"),
            FieldDescriptor::new("tag", FieldType::Text, "Tag").initial("b"),
            FieldDescriptor::new("tag", FieldType::Text, "Tag").initial("c"),
            FieldDescriptor::new("days", FieldType::Select, "Days")
                .multiple()
                .options(vec![FieldOption::new("mon", "Mon"), FieldOption::new("tue", "Tue")])
                .initial("mon, tue"),
            FieldDescriptor::new("size", FieldType::Radio, "Size")
                .options(vec![FieldOption::new("s", "S")]),
        ];
        let controls: Vec<_> = fields.iter().map(FieldDescriptor::initial_control).collect();
        let data = extract_data(&fields, &controls);
        assert_eq!(data["tag"], FieldValue::List(vec!["a".into(), "b".into(), "c".into()]));
        assert_eq!(data["days"], FieldValue::List(vec!["mon".into(), "tue".into()]));
        assert!(!data.contains_key("size"));
    }

    fn features_spec() -> FormSpec {
        FormSpec::new(
            "Features",
            vec![
                FieldDescriptor::new("features", FieldType::Checkbox, "GST")
                    .options(vec![FieldOption::new("gst", "GST")]),
                FieldDescriptor::new("features", FieldType::Checkbox, "Email")
                    .options(vec![FieldOption::new("email", "Email")]),
                FieldDescriptor::new("terms", FieldType::Checkbox, "Accept"),
            ],
        )
        .with_id("features")
    }

    #[test]
    fn checkbox_group_collects_ticked_values() {
        let mut engine = FormEngine::new();
        engine.build_form(features_spec(), noop).unwrap();

        let data = engine.extract_data("features").unwrap();
        assert_eq!(data["features"], FieldValue::Bool(false));
        assert_eq!(data["terms"], FieldValue::Bool(false));

        assert!(engine.select_values("features", "features", &["gst", "email"]));
        assert!(engine.set_checked("features", "terms", true));
        let data = engine.extract_data("features").unwrap();
        assert_eq!(data["features"], FieldValue::List(vec!["gst".into(), "email".into()]));
        assert_eq!(data["terms"], FieldValue::Bool(true));

        assert!(engine.select_values("features", "features", &["email"]));
        let data = engine.extract_data("features").unwrap();
        assert_eq!(data["features"], FieldValue::List(vec!["email".into()]));
    }

    #[test]
    fn checkbox_group_from_initial_values() {
        let mut spec = features_spec();
        spec.fields[0].initial_value = Some("true".into());
        spec.fields[1].initial_value = Some("on".into());
        let controls: Vec<_> = spec.fields.iter().map(FieldDescriptor::initial_control).collect();
        let data = extract_data(&spec.fields, &controls);
        assert_eq!(data["features"], FieldValue::List(vec!["gst".into(), "email".into()]));
    }

    #[test]
    fn checkbox_cannot_share_name_with_other_controls() {
        let spec = FormSpec::new(
            "Mixed",
            vec![
                FieldDescriptor::new("notify", FieldType::Text, "Notify").initial("sms"),
                FieldDescriptor::new("notify", FieldType::Checkbox, "Email"),
            ],
        );
        assert!(matches!(spec.check(), Err(FormError::MixedControls(name)) if name == "notify"));
        let mut engine = FormEngine::new();
        assert!(engine.build_form(spec, noop).is_err());

        let err = FormSpec::from_json(
            r#"{"fields": [{"name": "x", "type": "checkbox"}, {"name": "x", "type": "email"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, FormError::MixedControls(_)));
    }

    #[test]
    fn reset_clears_values_and_errors() {
        let mut engine = FormEngine::new();
        let spec = contact_spec();
        let mut spec_with_initial = spec.clone();
        spec_with_initial.fields[2].initial_value = Some("hello".into());
        engine.build_form(spec_with_initial, noop).unwrap();
        engine.submit("contact");
        assert!(!engine.form("contact").unwrap().errors().is_empty());

        assert!(engine.reset_form("contact"));
        let form = engine.form("contact").unwrap();
        assert!(form.errors().is_empty());
        let data = form.extract_data();
        assert_eq!(data["notes"], FieldValue::Text(String::new()));
        assert_eq!(data["newsletter"], FieldValue::Bool(false));
        assert!(!engine.reset_form("missing"));
    }

    #[test]
    fn unknown_form_and_field_are_noops() {
        let mut engine = FormEngine::new();
        engine.build_form(contact_spec(), noop).unwrap();
        assert!(!engine.set_value("missing", "name", "x"));
        assert!(!engine.set_value("contact", "missing", "x"));
        assert!(!engine.set_checked("contact", "name", true));
        assert!(!engine.validate_all("missing"));
        assert_eq!(engine.submit("missing"), SubmitOutcome::UnknownForm);
    }

    #[test]
    fn spec_from_json() {
        let spec = FormSpec::from_json(
            r#"{
                "id": "product",
                "title": "Add Product",
                "submitLabel": "Save",
                "fields": [
                    {"name": "rate", "type": "number", "label": "Rate", "validators": ["required", "number"]},
                    {"name": "unit", "type": "select", "label": "Unit",
                     "options": [{"value": "pcs", "label": "Pieces"}], "initialValue": "pcs"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(spec.submit_label, "Save");
        assert_eq!(spec.fields[0].field_type, FieldType::Number);
        assert_eq!(spec.fields[1].initial_value.as_deref(), Some("pcs"));

        let err = FormSpec::from_json(r#"{"fields": [{"name": " "}]}"#).unwrap_err();
        assert!(matches!(err, FormError::MissingName { index: 0 }));
        let err = FormSpec::from_json(r#"{"fields": [{"name": "r", "type": "radio"}]}"#)
            .unwrap_err();
        assert!(matches!(err, FormError::MissingOptions(_)));
    }
}
