//! Invoice Templates - Corporate and Creative renderers
//!
//! Each renderer turns an `Invoice` into one self-contained HTML document
//! with inline styles. Colours and fonts come from a `TemplateTheme`;
//! custom themes are JSON files loaded into a `ThemeRegistry`.

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

use crate::hashing::{fingerprint, sha256_hex};
use crate::invoice::{
    amount_in_words, format_indian, Invoice, InvoiceError, InvoiceTotals, LineItem, LineTotals, Money,
    Party, TaxRegime,
};
use crate::markup::escape;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    #[error("Theme not found: {0}")]
    ThemeNotFound(String),

    #[error("Invoice {0} has no line items")]
    NoItems(String),

    #[error(transparent)]
    Invoice(#[from] InvoiceError),

    #[error("Fingerprint error: {0}")]
    Fingerprint(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    #[default]
    Corporate,
    Creative,
}

impl TemplateKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TemplateKind::Corporate => "corporate",
            TemplateKind::Creative => "creative",
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateKind {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "corporate" => Ok(TemplateKind::Corporate),
            "creative" => Ok(TemplateKind::Creative),
            other => Err(TemplateError::UnknownTemplate(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateTheme {
    pub id: String,
    pub kind: TemplateKind,
    pub name: String,
    #[serde(default = "default_accent")]
    pub accent_color: String,
    #[serde(default = "default_secondary")]
    pub secondary_color: String,
    #[serde(default = "default_font")]
    pub font_family: String,
    #[serde(default)]
    pub footer_text: Option<String>,
}

fn default_accent() -> String { "#1f3a5f".to_string() }
fn default_secondary() -> String { "#f4f6f9".to_string() }
fn default_font() -> String { "'Segoe UI', Arial, sans-serif".to_string() }

impl TemplateTheme {
    pub fn builtin(kind: TemplateKind) -> Self {
        match kind {
            TemplateKind::Corporate => Self {
                id: "corporate".to_string(),
                kind,
                name: "Corporate".to_string(),
                accent_color: default_accent(),
                secondary_color: default_secondary(),
                font_family: default_font(),
                footer_text: Some("Thank you for your business.".to_string()),
            },
            TemplateKind::Creative => Self {
                id: "creative".to_string(),
                kind,
                name: "Creative".to_string(),
                accent_color: "#7c3aed".to_string(),
                secondary_color: "#f59e0b".to_string(),
                font_family: "'Poppins', 'Helvetica Neue', sans-serif".to_string(),
                footer_text: Some("Thanks for choosing us!".to_string()),
            },
        }
    }
}

/// Theme registry - built-in themes plus JSON overrides
pub struct ThemeRegistry {
    themes: HashMap<String, TemplateTheme>,
}

impl ThemeRegistry {
    pub fn new() -> Self {
        let mut registry = Self { themes: HashMap::new() };
        registry.register(TemplateTheme::builtin(TemplateKind::Corporate));
        registry.register(TemplateTheme::builtin(TemplateKind::Creative));
        registry
    }

    /// Built-ins, then every `*.json` theme in `dir`. Unreadable or
    /// malformed files are skipped; a file may replace a built-in by id.
    pub fn load_from_dir(dir: &Path) -> Result<Self, std::io::Error> {
        let mut registry = Self::new();
        if dir.exists() {
            for entry in fs::read_dir(dir)? {
                let path = entry?.path();
                if path.extension().map_or(false, |e| e == "json") {
                    let parsed = fs::read_to_string(&path)
                        .map_err(|e| e.to_string())
                        .and_then(|content| {
                            serde_json::from_str::<TemplateTheme>(&content).map_err(|e| e.to_string())
                        });
                    match parsed {
                        Ok(theme) => {
                            debug!(theme = %theme.id, path = %path.display(), "loaded theme");
                            registry.register(theme);
                        }
                        Err(error) => warn!(path = %path.display(), %error, "skipping theme file"),
                    }
                }
            }
        }
        Ok(registry)
    }

    pub fn get(&self, id: &str) -> Option<&TemplateTheme> {
        self.themes.get(id)
    }

    /// The theme registered under the kind's own id.
    pub fn for_kind(&self, kind: TemplateKind) -> Result<&TemplateTheme, TemplateError> {
        self.get(kind.as_str())
            .ok_or_else(|| TemplateError::ThemeNotFound(kind.as_str().to_string()))
    }

    pub fn list(&self) -> Vec<&TemplateTheme> {
        let mut themes: Vec<_> = self.themes.values().collect();
        themes.sort_by(|a, b| a.id.cmp(&b.id));
        themes
    }

    pub fn register(&mut self, theme: TemplateTheme) {
        self.themes.insert(theme.id.clone(), theme);
    }
}

impl Default for ThemeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Logo {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl Logo {
    pub fn from_file(path: &Path) -> Result<Self, std::io::Error> {
        let mime = match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("svg") => "image/svg+xml",
            Some("gif") => "image/gif",
            Some("webp") => "image/webp",
            _ => "image/png",
        };
        Ok(Self {
            mime: mime.to_string(),
            bytes: fs::read(path)?,
        })
    }

    pub fn data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime,
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub currency_symbol: String,
    pub logo: Option<Logo>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            currency_symbol: "₹".to_string(),
            logo: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedInvoice {
    pub kind: TemplateKind,
    pub theme_id: String,
    pub html: String,
    pub fingerprint: String,
}

/// Render `invoice` with `theme`. Identical inputs give identical output.
pub fn render_invoice(
    invoice: &Invoice,
    theme: &TemplateTheme,
    options: &RenderOptions,
) -> Result<RenderedInvoice, TemplateError> {
    if invoice.items.is_empty() {
        return Err(TemplateError::NoItems(invoice.invoice_number.clone()));
    }

    let lines = invoice
        .items
        .iter()
        .map(LineItem::totals)
        .collect::<Result<Vec<_>, _>>()?;
    let totals = InvoiceTotals::from_lines(&lines, invoice.regime())?;
    let page = Page {
        invoice,
        lines: &lines,
        totals: &totals,
        theme,
        options,
    };
    let html = match theme.kind {
        TemplateKind::Corporate => page.corporate(),
        TemplateKind::Creative => page.creative(),
    };

    let fingerprint = fingerprint(&json!({
        "invoice": invoice,
        "theme": theme,
        "currency": options.currency_symbol,
        "logo": options.logo.as_ref().map(|l| sha256_hex(&l.bytes)),
    }))?;
    debug!(invoice = %invoice.invoice_number, template = %theme.kind, "invoice rendered");

    Ok(RenderedInvoice {
        kind: theme.kind,
        theme_id: theme.id.clone(),
        html,
        fingerprint,
    })
}

/// Strip characters that could close a style rule or the style element.
fn css_value(value: &str) -> String {
    value.chars().filter(|c| !matches!(c, '<' | '>' | '{' | '}' | ';')).collect()
}

struct Page<'a> {
    invoice: &'a Invoice,
    lines: &'a [LineTotals],
    totals: &'a InvoiceTotals,
    theme: &'a TemplateTheme,
    options: &'a RenderOptions,
}

const CORPORATE_CSS: &str = r#"
* { box-sizing: border-box; margin: 0; padding: 0; }
body { font-family: var(--font); color: #222; background: #fff; font-size: 13px; }
.invoice { max-width: 800px; margin: 0 auto; padding: 40px; }
.header { display: flex; justify-content: space-between; border-bottom: 3px solid var(--accent); padding-bottom: 20px; }
.header img { max-height: 60px; margin-bottom: 8px; }
.business h1 { color: var(--accent); font-size: 22px; }
.meta { text-align: right; }
.meta h2 { color: var(--accent); letter-spacing: 2px; font-size: 20px; }
.parties { display: flex; justify-content: space-between; margin: 24px 0; }
.party h3 { font-size: 11px; text-transform: uppercase; color: #666; margin-bottom: 6px; }
table.items { width: 100%; border-collapse: collapse; }
table.items th { background: var(--accent); color: #fff; padding: 8px; text-align: left; }
table.items td { padding: 8px; border-bottom: 1px solid #ddd; }
table.items tr:nth-child(even) td { background: var(--secondary); }
.num { text-align: right; }
.totals { margin-left: auto; width: 320px; margin-top: 16px; }
.totals td { padding: 6px 8px; }
.totals tr.grand td { border-top: 2px solid var(--accent); font-weight: bold; font-size: 15px; }
.words { margin-top: 16px; font-style: italic; }
.notes { margin-top: 16px; padding: 12px; background: var(--secondary); }
.footer { margin-top: 32px; text-align: center; color: #666; font-size: 11px; }
@media print { .invoice { padding: 0; } }
"#;

const CREATIVE_CSS: &str = r#"
* { box-sizing: border-box; margin: 0; padding: 0; }
body { font-family: var(--font); color: #1f2937; background: #faf7ff; font-size: 13px; }
.invoice { max-width: 800px; margin: 0 auto; background: #fff; border-radius: 16px; overflow: hidden; }
.banner { background: linear-gradient(135deg, var(--accent), var(--secondary)); color: #fff; padding: 32px 40px; display: flex; justify-content: space-between; align-items: center; }
.banner img { max-height: 56px; border-radius: 8px; background: #fff; padding: 4px; }
.banner h1 { font-size: 26px; }
.banner .tag { font-size: 34px; font-weight: 800; opacity: 0.9; }
.body { padding: 32px 40px; }
.cards { display: flex; gap: 16px; margin-bottom: 24px; }
.card { flex: 1; border-radius: 12px; padding: 16px; background: #f5f3ff; border-left: 4px solid var(--accent); }
.card h3 { color: var(--accent); font-size: 12px; text-transform: uppercase; margin-bottom: 6px; }
table.items { width: 100%; border-collapse: separate; border-spacing: 0 6px; }
table.items th { color: var(--accent); text-align: left; padding: 6px 10px; font-size: 11px; text-transform: uppercase; }
table.items td { background: #f9fafb; padding: 10px; }
.num { text-align: right; }
.totals { margin-left: auto; width: 320px; margin-top: 16px; }
.totals td { padding: 6px 10px; }
.totals tr.grand td { background: var(--accent); color: #fff; font-weight: bold; font-size: 16px; }
.words { margin-top: 16px; color: var(--accent); }
.notes { margin-top: 16px; padding: 12px; border-radius: 12px; border: 2px dashed var(--secondary); }
.footer { padding: 20px; text-align: center; background: #f5f3ff; color: var(--accent); font-weight: 600; }
@media print { body { background: #fff; } .invoice { border-radius: 0; } }
"#;

impl<'a> Page<'a> {
    fn money(&self, amount: Money) -> String {
        format!("{}{}", escape(&self.options.currency_symbol), format_indian(amount))
    }

    fn head(&self, css: &str) -> String {
        format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n<title>Invoice {}</title>\n<style>\n:root {{ --accent: {}; --secondary: {}; --font: {}; }}\n{}</style>\n</head>\n",
            escape(&self.invoice.invoice_number),
            css_value(&self.theme.accent_color),
            css_value(&self.theme.secondary_color),
            css_value(&self.theme.font_family),
            css
        )
    }

    fn logo(&self) -> String {
        match &self.options.logo {
            Some(logo) => format!("<img src=\"{}\" alt=\"logo\">", logo.data_uri()),
            None => String::new(),
        }
    }

    fn party_details(party: &Party) -> String {
        let mut out = format!("<strong>{}</strong>", escape(&party.name));
        for (prefix, value) in [
            ("", &party.address),
            ("Phone: ", &party.phone),
            ("Email: ", &party.email),
            ("GSTIN: ", &party.gstin),
        ] {
            if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
                out.push_str(&format!("<br>{}{}", prefix, escape(value)));
            }
        }
        out
    }

    fn dates(&self) -> String {
        let mut out = format!(
            "Invoice #: <strong>{}</strong><br>Date: {}",
            escape(&self.invoice.invoice_number),
            self.invoice.invoice_date.format("%d %b %Y")
        );
        if let Some(due) = self.invoice.due_date {
            out.push_str(&format!("<br>Due: {}", due.format("%d %b %Y")));
        }
        out
    }

    fn item_rows(&self) -> String {
        let mut out = String::new();
        for (index, (item, line)) in self.invoice.items.iter().zip(self.lines).enumerate() {
            let hsn = item.hsn.as_deref().map(escape).unwrap_or_default();
            let unit = item.unit.as_deref().map(|u| format!(" {}", escape(u))).unwrap_or_default();
            out.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td class=\"num\">{}{}</td><td class=\"num\">{}</td><td class=\"num\">{}%</td><td class=\"num\">{}%</td><td class=\"num\">{}</td></tr>\n",
                index + 1,
                escape(&item.description),
                hsn,
                item.quantity,
                unit,
                self.money(Money::from_rupees(item.rate)),
                item.discount_percent,
                item.tax_rate,
                self.money(line.total)
            ));
        }
        out
    }

    fn item_table(&self) -> String {
        format!(
            "<table class=\"items\">\n<thead><tr><th>#</th><th>Item</th><th>HSN</th><th class=\"num\">Qty</th><th class=\"num\">Rate</th><th class=\"num\">Disc</th><th class=\"num\">GST</th><th class=\"num\">Amount</th></tr></thead>\n<tbody>\n{}</tbody>\n</table>\n",
            self.item_rows()
        )
    }

    fn totals_table(&self) -> String {
        let t = self.totals;
        let mut rows = vec![("Subtotal".to_string(), t.subtotal)];
        if t.discount != Money::ZERO {
            rows.push(("Discount".to_string(), t.discount));
        }
        rows.push(("Taxable Amount".to_string(), t.taxable_amount));
        match t.regime {
            TaxRegime::Intra => {
                rows.push(("CGST".to_string(), t.cgst));
                rows.push(("SGST".to_string(), t.sgst));
            }
            TaxRegime::Inter => rows.push(("IGST".to_string(), t.igst)),
        }

        let mut out = String::from("<table class=\"totals\">\n");
        for (label, amount) in rows {
            let shown = if label == "Discount" {
                format!("-{}", self.money(amount))
            } else {
                self.money(amount)
            };
            out.push_str(&format!("<tr><td>{}</td><td class=\"num\">{}</td></tr>\n", label, shown));
        }
        out.push_str(&format!(
            "<tr class=\"grand\"><td>Total</td><td class=\"num\">{}</td></tr>\n</table>\n",
            self.money(t.grand_total)
        ));
        out
    }

    fn closing(&self) -> String {
        let mut out = format!(
            "<p class=\"words\">{}</p>\n",
            escape(&amount_in_words(self.totals.grand_total))
        );
        if let Some(notes) = self.invoice.notes.as_deref().filter(|n| !n.trim().is_empty()) {
            out.push_str(&format!(
                "<div class=\"notes\"><strong>Notes</strong><br>{}</div>\n",
                escape(notes).replace('\n', "<br>")
            ));
        }
        out
    }

    fn footer(&self) -> String {
        self.theme
            .footer_text
            .as_deref()
            .map(|text| format!("<div class=\"footer\">{}</div>\n", escape(text)))
            .unwrap_or_default()
    }

    fn corporate(&self) -> String {
        let mut html = self.head(CORPORATE_CSS);
        html.push_str("<body>\n<div class=\"invoice\">\n");
        html.push_str(&format!(
            "<div class=\"header\">\n<div class=\"business\">{}<h1>{}</h1><p>{}</p></div>\n<div class=\"meta\"><h2>TAX INVOICE</h2><p>{}</p></div>\n</div>\n",
            self.logo(),
            escape(&self.invoice.business.name),
            Self::party_details(&self.invoice.business),
            self.dates()
        ));
        html.push_str(&format!(
            "<div class=\"parties\">\n<div class=\"party\"><h3>Bill To</h3><p>{}</p></div>\n</div>\n",
            Self::party_details(&self.invoice.customer)
        ));
        html.push_str(&self.item_table());
        html.push_str(&self.totals_table());
        html.push_str(&self.closing());
        html.push_str(&self.footer());
        html.push_str("</div>\n</body>\n</html>\n");
        html
    }

    fn creative(&self) -> String {
        let mut html = self.head(CREATIVE_CSS);
        html.push_str("<body>\n<div class=\"invoice\">\n");
        html.push_str(&format!(
            "<div class=\"banner\">\n<div>{}<h1>{}</h1></div>\n<div class=\"tag\">Invoice</div>\n</div>\n",
            self.logo(),
            escape(&self.invoice.business.name)
        ));
        html.push_str("<div class=\"body\">\n<div class=\"cards\">\n");
        html.push_str(&format!(
            "<div class=\"card\"><h3>From</h3><p>{}</p></div>\n<div class=\"card\"><h3>Billed To</h3><p>{}</p></div>\n<div class=\"card\"><h3>Details</h3><p>{}</p></div>\n",
            Self::party_details(&self.invoice.business),
            Self::party_details(&self.invoice.customer),
            self.dates()
        ));
        html.push_str("</div>\n");
        html.push_str(&self.item_table());
        html.push_str(&self.totals_table());
        html.push_str(&self.closing());
        html.push_str("</div>\n");
        html.push_str(&self.footer());
        html.push_str("</div>\n</body>\n</html>\n");
        html
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn invoice() -> Invoice {
        Invoice {
            business: Party {
                name: "UnifyX Traders".into(),
                gstin: Some("29ABCDE1234F1Z5".into()),
                ..Party::default()
            },
            customer: Party {
                name: "Asha <Stores>".into(),
                ..Party::default()
            },
            items: vec![LineItem::new("Widget", 2.0, 100.0).with_discount(10.0).with_tax(18.0)],
            totals: None,
            invoice_number: "INV-001".into(),
            invoice_date: NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
            due_date: None,
            notes: Some("Pay within\n30 days".into()),
        }
    }

    #[test]
    fn kinds_parse_case_insensitively() {
        assert_eq!("Creative".parse::<TemplateKind>().unwrap(), TemplateKind::Creative);
        assert!(matches!(
            "modern".parse::<TemplateKind>(),
            Err(TemplateError::UnknownTemplate(_))
        ));
    }

    #[test]
    fn corporate_shows_split_tax_and_escapes() {
        let theme = TemplateTheme::builtin(TemplateKind::Corporate);
        let rendered = render_invoice(&invoice(), &theme, &RenderOptions::default()).unwrap();
        assert!(rendered.html.contains("TAX INVOICE"));
        assert!(rendered.html.contains("Asha &lt;Stores&gt;"));
        assert!(rendered.html.contains("CGST"));
        assert!(rendered.html.contains("₹212.40"));
        assert!(rendered.html.contains("Rupees Two Hundred Twelve and Forty Paise Only"));
        assert!(rendered.html.contains("Pay within<br>30 days"));
    }

    #[test]
    fn creative_uses_theme_colours() {
        let theme = TemplateTheme::builtin(TemplateKind::Creative);
        let rendered = render_invoice(&invoice(), &theme, &RenderOptions::default()).unwrap();
        assert_eq!(rendered.kind, TemplateKind::Creative);
        assert!(rendered.html.contains("--accent: #7c3aed"));
        assert!(rendered.html.contains("Billed To"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let theme = TemplateTheme::builtin(TemplateKind::Corporate);
        let a = render_invoice(&invoice(), &theme, &RenderOptions::default()).unwrap();
        let b = render_invoice(&invoice(), &theme, &RenderOptions::default()).unwrap();
        assert_eq!(a, b);

        let other = TemplateTheme::builtin(TemplateKind::Creative);
        let c = render_invoice(&invoice(), &other, &RenderOptions::default()).unwrap();
        assert_ne!(a.fingerprint, c.fingerprint);
    }

    #[test]
    fn empty_invoice_rejected() {
        let mut empty = invoice();
        empty.items.clear();
        let theme = TemplateTheme::builtin(TemplateKind::Corporate);
        assert!(matches!(
            render_invoice(&empty, &theme, &RenderOptions::default()),
            Err(TemplateError::NoItems(_))
        ));
    }

    #[test]
    fn oversized_invoice_is_an_error() {
        let mut huge = invoice();
        huge.items = vec![LineItem::new("Bulk", 1e15, 1e6).with_tax(28.0)];
        let theme = TemplateTheme::builtin(TemplateKind::Corporate);
        assert!(matches!(
            render_invoice(&huge, &theme, &RenderOptions::default()),
            Err(TemplateError::Invoice(InvoiceError::LineOverflow(_)))
        ));
    }

    #[test]
    fn logo_embedded_as_data_uri() {
        let theme = TemplateTheme::builtin(TemplateKind::Corporate);
        let options = RenderOptions {
            logo: Some(Logo { mime: "image/png".into(), bytes: vec![1, 2, 3] }),
            ..RenderOptions::default()
        };
        let rendered = render_invoice(&invoice(), &theme, &options).unwrap();
        assert!(rendered.html.contains("data:image/png;base64,AQID"));
    }

    #[test]
    fn theme_values_cannot_break_out_of_style() {
        let mut theme = TemplateTheme::builtin(TemplateKind::Corporate);
        theme.accent_color = "red;}</style><script>".into();
        let rendered = render_invoice(&invoice(), &theme, &RenderOptions::default()).unwrap();
        assert!(!rendered.html.contains("<script>"));
    }

    #[test]
    fn registry_loads_overrides_and_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("corporate.json"),
            r##"{"id": "corporate", "kind": "corporate", "name": "Navy", "accentColor": "#000080"}"##,
        )
        .unwrap();
        fs::write(
            dir.path().join("sunset.json"),
            r#"{"id": "sunset", "kind": "creative", "name": "Sunset"}"#,
        )
        .unwrap();
        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        fs::write(dir.path().join("readme.txt"), "ignored").unwrap();

        let registry = ThemeRegistry::load_from_dir(dir.path()).unwrap();
        assert_eq!(registry.list().len(), 3);
        assert_eq!(registry.for_kind(TemplateKind::Corporate).unwrap().accent_color, "#000080");
        assert_eq!(registry.get("sunset").unwrap().font_family, default_font());
    }

    #[test]
    fn missing_dir_gives_builtins() {
        let registry = ThemeRegistry::load_from_dir(Path::new("/nonexistent/themes")).unwrap();
        assert_eq!(registry.list().len(), 2);
    }
}
