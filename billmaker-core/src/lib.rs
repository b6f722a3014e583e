//! BillMaker Core - keyboard, forms and invoices for the UnifyX Bill Maker
//!
//! # Layers
//! 1. Keys resolve to canonical chords (`Ctrl+Shift+Alt+Meta+Key`)
//! 2. Context policy decides whether a chord may fire
//! 3. Forms are data: built, edited, validated and submitted without a DOM
//! 4. Money is fixed-point paise, so `total == taxable + tax` exactly
//! 5. Rendered invoices are deterministic and fingerprinted

pub mod app;
pub mod collaborators;
pub mod config;
pub mod focus;
pub mod form;
pub mod hashing;
pub mod invoice;
pub mod keys;
pub mod logging;
pub mod markup;
pub mod policy;
pub mod shortcuts;
pub mod templates;
pub mod validation;

pub use app::{AppAction, BillMaker};
pub use collaborators::{CollaboratorError, Collaborators, InMemoryCollaborators, Tab};
pub use config::{AppConfig, ConfigError, LogConfig};
pub use form::{FieldValue, FormEngine, FormError, FormResult, FormSpec, SubmitOutcome};
pub use invoice::{Invoice, InvoiceError, InvoiceTotals, LineItem, Money};
pub use keys::{Combo, EventTarget, KeyEvent};
pub use shortcuts::{DispatchOutcome, ShortcutDispatcher};
pub use templates::{render_invoice, RenderedInvoice, TemplateError, TemplateKind, ThemeRegistry};
pub use validation::{FormValidation, ValidatorKind};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
