//! HTML generation helpers shared by forms, the help panel and invoices.

use std::collections::BTreeMap;

use crate::form::{ControlValue, FieldDescriptor, FieldType, FormSpec};

/// Escape text for use in element content and double-quoted attributes.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn control_id(form_id: &str, index: usize, field: &FieldDescriptor) -> String {
    format!("{}-{}-{}", form_id, field.name, index)
}

/// Render a whole form in its current state, error annotations included.
pub fn render_form(
    form_id: &str,
    spec: &FormSpec,
    controls: &[ControlValue],
    errors: &BTreeMap<String, String>,
) -> String {
    let mut out = format!(
        "<form id=\"{}\" class=\"dynamic-form\" novalidate>\n",
        escape(form_id)
    );
    if !spec.title.is_empty() {
        out.push_str(&format!("  <h3 class=\"form-title\">{}</h3>\n", escape(&spec.title)));
    }
    for (index, (field, control)) in spec.fields.iter().zip(controls).enumerate() {
        let error = errors.get(&field.name).map(String::as_str);
        out.push_str(&render_field(form_id, index, field, control, error));
    }
    out.push_str(&format!(
        "  <div class=\"form-actions\">\n    <button type=\"submit\" class=\"btn btn-primary\">{}</button>\n  </div>\n",
        escape(&spec.submit_label)
    ));
    out.push_str("</form>\n");
    out
}

fn render_field(
    form_id: &str,
    index: usize,
    field: &FieldDescriptor,
    control: &ControlValue,
    error: Option<&str>,
) -> String {
    let id = control_id(form_id, index, field);
    let name = escape(&field.name);
    let group_class = if error.is_some() { "form-group has-error" } else { "form-group" };
    let required_attr = if field.required { " required" } else { "" };
    let marker = if field.required { "<span class=\"required\">*</span>" } else { "" };

    let mut out = format!("  <div class=\"{group_class}\" data-field=\"{name}\">\n");
    let label = escape(&field.label);

    match field.field_type {
        FieldType::Checkbox => {
            let checked = matches!(control, ControlValue::Checked(true));
            out.push_str(&format!(
                "    <label class=\"checkbox-label\"><input type=\"checkbox\" id=\"{id}\" name=\"{name}\" value=\"{}\"{}{required_attr}> {label}{marker}</label>\n",
                escape(field.checkbox_value()),
                if checked { " checked" } else { "" }
            ));
        }
        FieldType::Radio => {
            let selected = control.selected();
            out.push_str(&format!("    <span class=\"form-label\">{label}{marker}</span>\n"));
            out.push_str("    <div class=\"radio-group\">\n");
            for option in &field.options {
                let checked = selected.iter().any(|s| s == &option.value);
                out.push_str(&format!(
                    "      <label><input type=\"radio\" name=\"{name}\" value=\"{}\"{}{required_attr}> {}</label>\n",
                    escape(&option.value),
                    if checked { " checked" } else { "" },
                    escape(&option.label)
                ));
            }
            out.push_str("    </div>\n");
        }
        FieldType::Select => {
            let selected = control.selected();
            out.push_str(&format!("    <label for=\"{id}\">{label}{marker}</label>\n"));
            out.push_str(&format!(
                "    <select id=\"{id}\" name=\"{name}\" class=\"form-control\"{}{required_attr}>\n",
                if field.multiple { " multiple" } else { "" }
            ));
            if !field.multiple {
                out.push_str(&format!("      <option value=\"\">Select {label}</option>\n"));
            }
            for option in &field.options {
                let is_selected = selected.iter().any(|s| s == &option.value);
                out.push_str(&format!(
                    "      <option value=\"{}\"{}>{}</option>\n",
                    escape(&option.value),
                    if is_selected { " selected" } else { "" },
                    escape(&option.label)
                ));
            }
            out.push_str("    </select>\n");
        }
        FieldType::Textarea => {
            out.push_str(&format!("    <label for=\"{id}\">{label}{marker}</label>\n"));
            out.push_str(&format!(
                "    <textarea id=\"{id}\" name=\"{name}\" class=\"form-control\" rows=\"3\" placeholder=\"{}\"{required_attr}>{}</textarea>\n",
                escape(&field.placeholder),
                escape(control.text())
            ));
        }
        FieldType::File => {
            out.push_str(&format!("    <label for=\"{id}\">{label}{marker}</label>\n"));
            out.push_str(&format!(
                "    <input type=\"file\" id=\"{id}\" name=\"{name}\" class=\"form-control\"{required_attr}>\n"
            ));
        }
        text_like => {
            out.push_str(&format!("    <label for=\"{id}\">{label}{marker}</label>\n"));
            out.push_str(&format!(
                "    <input type=\"{}\" id=\"{id}\" name=\"{name}\" class=\"form-control\" placeholder=\"{}\" value=\"{}\"{required_attr}>\n",
                text_like.input_type(),
                escape(&field.placeholder),
                escape(control.text())
            ));
        }
    }

    out.push_str(&format!(
        "    <div class=\"error-message\" id=\"{id}-error\">{}</div>\n",
        escape(error.unwrap_or(""))
    ));
    out.push_str("  </div>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_and_quotes() {
        assert_eq!(
            escape(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
        assert_eq!(escape("₹ 212.40"), "₹ 212.40");
    }

    #[test]
    fn checkbox_submits_its_option_value() {
        use crate::form::FieldOption;

        let spec = FormSpec::new(
            "Prefs",
            vec![
                FieldDescriptor::new("features", FieldType::Checkbox, "GST")
                    .options(vec![FieldOption::new("gst", "GST")]),
                FieldDescriptor::new("terms", FieldType::Checkbox, "Accept"),
            ],
        );
        let controls = [ControlValue::Checked(true), ControlValue::Checked(false)];
        let html = render_form("prefs", &spec, &controls, &BTreeMap::new());
        assert!(html.contains(r#"name="features" value="gst" checked>"#));
        assert!(html.contains(r#"name="terms" value="true">"#));
    }
}
