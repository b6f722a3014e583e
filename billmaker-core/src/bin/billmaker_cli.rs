//! BillMaker CLI - scripting front end for the core
//!
//! Commands: shortcuts, validate, totals, render
//! Outputs JSON to stdout, logs to stderr
//! Returns 2 on validation failure

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};

use billmaker_core::{
    app::default_dispatcher,
    form::SubmitFeedback,
    logging::init_logging,
    templates::{Logo, RenderOptions},
    AppConfig, FieldValue, FormEngine, FormSpec, Invoice, TemplateKind, ThemeRegistry,
};

#[derive(Parser)]
#[command(name = "billmaker-cli")]
#[command(about = "BillMaker CLI - shortcuts, forms and invoices", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the default shortcuts by category
    Shortcuts,

    /// Build a form, apply values and validate it
    Validate {
        /// Form spec JSON file
        #[arg(short, long)]
        form: PathBuf,

        /// JSON object of field name to value
        #[arg(long)]
        values: PathBuf,
    },

    /// Compute line and invoice totals
    Totals {
        /// Invoice JSON file
        #[arg(short, long)]
        invoice: PathBuf,
    },

    /// Render an invoice to HTML
    Render {
        /// Invoice JSON file
        #[arg(short, long)]
        invoice: PathBuf,

        /// corporate or creative (defaults to the configured template)
        #[arg(short, long)]
        template: Option<String>,

        /// Theme id from the themes directory, overrides --template
        #[arg(long)]
        theme: Option<String>,

        /// Business logo image to embed
        #[arg(long)]
        logo: Option<PathBuf>,

        /// Write the HTML here instead of including it in the output
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

fn emit(value: &Value) {
    println!("{value:#}");
}

fn fail(message: impl std::fmt::Display) -> ExitCode {
    emit(&json!({ "error": message.to_string() }));
    ExitCode::FAILURE
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, String> {
    let content =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    serde_json::from_str(&content).map_err(|e| format!("Invalid JSON in {}: {}", path.display(), e))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match AppConfig::load(path) {
            Ok(c) => c,
            Err(e) => return fail(e),
        },
        None => AppConfig::default(),
    };
    if cli.verbose {
        config.log.level = "debug".to_string();
    }
    init_logging(&config.log);
    debug!(config = ?cli.config, "configuration loaded");

    match cli.command {
        Commands::Shortcuts => shortcuts(&config),
        Commands::Validate { form, values } => validate(&form, &values),
        Commands::Totals { invoice } => totals(&invoice),
        Commands::Render { invoice, template, theme, logo, out } => {
            render(&config, &invoice, template, theme, logo, out)
        }
    }
}

fn shortcuts(config: &AppConfig) -> ExitCode {
    let dispatcher = default_dispatcher(config);
    let groups: Vec<_> = dispatcher
        .grouped()
        .into_iter()
        .map(|(category, bindings)| {
            json!({
                "category": category.title(),
                "shortcuts": bindings
                    .iter()
                    .map(|b| json!({
                        "combo": b.combo,
                        "description": b.description,
                        "action": b.action,
                    }))
                    .collect::<Vec<_>>(),
            })
        })
        .collect();
    emit(&Value::Array(groups));
    ExitCode::SUCCESS
}

fn validate(form: &Path, values: &Path) -> ExitCode {
    let spec: FormSpec = match read_json(form) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    let values: serde_json::Map<String, Value> = match read_json(values) {
        Ok(v) => v,
        Err(e) => return fail(e),
    };

    let mut engine = FormEngine::new();
    let form_id = match engine.build_form(spec, |_| SubmitFeedback::Accepted) {
        Ok(rendered) => rendered.id,
        Err(e) => return fail(e),
    };

    let mut unknown = Vec::new();
    for (name, value) in &values {
        let applied = match serde_json::from_value::<FieldValue>(value.clone()) {
            Ok(FieldValue::Bool(checked)) => engine.set_checked(&form_id, name, checked),
            Ok(FieldValue::Text(text)) => engine.set_value(&form_id, name, &text),
            Ok(FieldValue::List(items)) => {
                let refs: Vec<&str> = items.iter().map(String::as_str).collect();
                engine.select_values(&form_id, name, &refs)
            }
            Err(_) => false,
        };
        if !applied {
            unknown.push(name.clone());
        }
    }

    let valid = engine.validate_all(&form_id);
    let errors = engine
        .form(&form_id)
        .map(|f| f.errors().clone())
        .unwrap_or_default();
    let data = engine.extract_data(&form_id).unwrap_or_default();
    info!(form = %form_id, valid, "form validated");

    emit(&json!({
        "valid": valid,
        "errors": errors,
        "data": data,
        "ignored": unknown,
    }));
    if valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    }
}

fn totals(path: &Path) -> ExitCode {
    let invoice: Invoice = match read_json(path) {
        Ok(i) => i,
        Err(e) => return fail(e),
    };
    let mut lines = Vec::with_capacity(invoice.items.len());
    for item in &invoice.items {
        match item.totals() {
            Ok(t) => lines.push(json!({ "description": item.description, "totals": t })),
            Err(e) => return fail(e),
        }
    }
    let totals = match invoice.computed_totals() {
        Ok(t) => t,
        Err(e) => return fail(e),
    };
    emit(&json!({
        "invoiceNumber": invoice.invoice_number,
        "lines": lines,
        "totals": totals,
        "amountInWords": billmaker_core::invoice::amount_in_words(totals.grand_total),
    }));
    ExitCode::SUCCESS
}

fn render(
    config: &AppConfig,
    path: &Path,
    template: Option<String>,
    theme: Option<String>,
    logo: Option<PathBuf>,
    out: Option<PathBuf>,
) -> ExitCode {
    let mut invoice: Invoice = match read_json(path) {
        Ok(i) => i,
        Err(e) => return fail(e),
    };
    if let Err(e) = invoice.finalize(config.payment_terms_days) {
        return fail(e);
    }

    let registry = match &config.themes_dir {
        Some(dir) => match ThemeRegistry::load_from_dir(dir) {
            Ok(r) => r,
            Err(e) => return fail(format!("Failed to load themes: {e}")),
        },
        None => ThemeRegistry::new(),
    };

    let kind = match template.as_deref().map(str::parse::<TemplateKind>) {
        Some(Ok(kind)) => kind,
        Some(Err(e)) => return fail(e),
        None => config.default_template,
    };
    let selected = match &theme {
        Some(id) => registry.get(id).ok_or_else(|| format!("Theme not found: {id}")),
        None => registry.for_kind(kind).map_err(|e| e.to_string()),
    };
    let selected = match selected {
        Ok(t) => t,
        Err(e) => return fail(e),
    };

    let logo = match logo.as_deref().map(Logo::from_file).transpose() {
        Ok(l) => l,
        Err(e) => return fail(format!("Failed to read logo: {e}")),
    };
    let options = RenderOptions {
        currency_symbol: config.currency_symbol.clone(),
        logo,
    };

    let rendered = match billmaker_core::render_invoice(&invoice, selected, &options) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };

    let mut output = json!({
        "template": rendered.kind,
        "theme": rendered.theme_id,
        "fingerprint": rendered.fingerprint,
        "bytes": rendered.html.len(),
    });
    match out {
        Some(path) => {
            if let Err(e) = fs::write(&path, &rendered.html) {
                return fail(format!("Failed to write {}: {}", path.display(), e));
            }
            output["out"] = json!(path.display().to_string());
        }
        None => output["html"] = json!(rendered.html),
    }
    emit(&output);
    ExitCode::SUCCESS
}
