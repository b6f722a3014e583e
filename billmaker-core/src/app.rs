//! BillMaker - the application service object.
//!
//! Owns the shortcut dispatcher and a `Workspace` (forms, focus ring, help
//! panel, modal state, collaborators). The host feeds it DOM events through
//! `handle_key`, `handle_click`, `dom_mutated` and `submit_form`.

use serde::Serialize;
use std::rc::Rc;
use tracing::{debug, info, warn};

use crate::collaborators::{
    CollaboratorError, Collaborators, Customer, CustomerStore, Notifier, Product, ProductStore,
    Tab,
};
use crate::config::AppConfig;
use crate::focus::FocusRing;
use crate::form::{
    FieldDescriptor, FieldOption, FieldType, FormEngine, FormResult, FormSpec, SubmitFeedback,
    SubmitOutcome,
};
use crate::keys::{Combo, KeyEvent};
use crate::shortcuts::{
    ActionError, DispatchOutcome, HelpPanel, ShortcutCategory, ShortcutDispatcher, ShortcutHost,
};
use crate::validation::ValidatorKind;

pub const CUSTOMER_FORM_ID: &str = "quick-add-customer";
pub const PRODUCT_FORM_ID: &str = "quick-add-product";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AppAction {
    NewInvoice,
    SaveInvoice,
    PrintInvoice,
    QuickAddCustomer,
    QuickAddProduct,
    SwitchTab(Tab),
    ToggleTheme,
    FocusNext,
    FocusPrevious,
    ToggleHelp,
    /// Close the open modal, else the help panel.
    Escape,
}

const DEFAULT_BINDINGS: &[(&str, AppAction, &str, ShortcutCategory)] = &[
    ("Ctrl+N", AppAction::NewInvoice, "New invoice", ShortcutCategory::Invoice),
    ("Ctrl+S", AppAction::SaveInvoice, "Save invoice", ShortcutCategory::Invoice),
    ("Ctrl+P", AppAction::PrintInvoice, "Print invoice", ShortcutCategory::Invoice),
    ("Ctrl+Shift+C", AppAction::QuickAddCustomer, "Quick add customer", ShortcutCategory::Customers),
    ("Ctrl+Shift+P", AppAction::QuickAddProduct, "Quick add product", ShortcutCategory::Products),
    ("Ctrl+1", AppAction::SwitchTab(Tab::Billing), "Billing tab", ShortcutCategory::Navigation),
    ("Ctrl+2", AppAction::SwitchTab(Tab::Customers), "Customers tab", ShortcutCategory::Navigation),
    ("Ctrl+3", AppAction::SwitchTab(Tab::Products), "Products tab", ShortcutCategory::Navigation),
    ("Ctrl+4", AppAction::SwitchTab(Tab::History), "History tab", ShortcutCategory::Navigation),
    ("Alt+ArrowDown", AppAction::FocusNext, "Next field", ShortcutCategory::Navigation),
    ("Alt+ArrowUp", AppAction::FocusPrevious, "Previous field", ShortcutCategory::Navigation),
    ("Ctrl+D", AppAction::ToggleTheme, "Toggle dark mode", ShortcutCategory::View),
    ("F1", AppAction::ToggleHelp, "Show shortcuts", ShortcutCategory::Help),
    ("Ctrl+/", AppAction::ToggleHelp, "Show shortcuts", ShortcutCategory::Help),
    ("Escape", AppAction::Escape, "Close dialog", ShortcutCategory::Help),
];

/// A dispatcher holding every default binding under the configured policy.
pub fn default_dispatcher(config: &AppConfig) -> ShortcutDispatcher<AppAction> {
    let mut dispatcher = ShortcutDispatcher::new(config.shortcut_policy.clone());
    for &(chord, action, description, category) in DEFAULT_BINDINGS {
        match Combo::parse(chord) {
            Ok(combo) => dispatcher.register(combo, action, description, category),
            Err(error) => warn!(chord, %error, "skipping default binding"),
        }
    }
    dispatcher
}

pub fn customer_form_spec() -> FormSpec {
    FormSpec::new(
        "Add Customer",
        vec![
            FieldDescriptor::new("name", FieldType::Text, "Customer Name")
                .required()
                .placeholder("Full name or business name")
                .validators(vec![ValidatorKind::Required, ValidatorKind::MinLength(2)]),
            FieldDescriptor::new("phone", FieldType::Tel, "Phone")
                .placeholder("+91 98765 43210")
                .validators(vec![ValidatorKind::Phone]),
            FieldDescriptor::new("email", FieldType::Email, "Email")
                .validators(vec![ValidatorKind::Email]),
            FieldDescriptor::new("gstin", FieldType::Text, "GSTIN")
                .placeholder("29ABCDE1234F1Z5")
                .validators(vec![ValidatorKind::Gstin]),
            FieldDescriptor::new("address", FieldType::Textarea, "Address")
                .validators(vec![ValidatorKind::MaxLength(250)]),
        ],
    )
    .with_id(CUSTOMER_FORM_ID)
    .with_submit_label("Save Customer")
}

pub fn product_form_spec() -> FormSpec {
    let tax_rates = ["0", "5", "12", "18", "28"]
        .iter()
        .map(|r| FieldOption::new(*r, format!("{r}%")))
        .collect();
    let units = [("pcs", "Pieces"), ("kg", "Kilograms"), ("ltr", "Litres"), ("box", "Boxes")]
        .iter()
        .map(|(value, label)| FieldOption::new(*value, *label))
        .collect();

    FormSpec::new(
        "Add Product",
        vec![
            FieldDescriptor::new("name", FieldType::Text, "Product Name")
                .required()
                .validators(vec![ValidatorKind::Required, ValidatorKind::MinLength(2)]),
            FieldDescriptor::new("hsn", FieldType::Text, "HSN/SAC Code")
                .validators(vec![ValidatorKind::Number, ValidatorKind::MaxLength(8)]),
            FieldDescriptor::new("price", FieldType::Number, "Price")
                .required()
                .placeholder("0.00")
                .validators(vec![ValidatorKind::Required, ValidatorKind::Number]),
            FieldDescriptor::new("taxRate", FieldType::Select, "GST Rate")
                .options(tax_rates)
                .initial("18"),
            FieldDescriptor::new("unit", FieldType::Select, "Unit")
                .options(units)
                .initial("pcs"),
        ],
    )
    .with_id(PRODUCT_FORM_ID)
    .with_submit_label("Save Product")
}

fn customer_submit(
    store: Rc<dyn CustomerStore>,
    notifier: Rc<dyn Notifier>,
) -> impl FnMut(&FormResult) -> SubmitFeedback {
    move |data| match Customer::from_form(data).and_then(|c| store.create(c)) {
        Ok(customer) => {
            notifier.success(&format!("Customer \"{}\" added", customer.name));
            SubmitFeedback::Accepted
        }
        Err(error) => {
            warn!(%error, "customer create failed");
            notifier.error(&error.to_string());
            SubmitFeedback::Rejected
        }
    }
}

fn product_submit(
    store: Rc<dyn ProductStore>,
    notifier: Rc<dyn Notifier>,
) -> impl FnMut(&FormResult) -> SubmitFeedback {
    move |data| match Product::from_form(data).and_then(|p| store.create(p)) {
        Ok(product) => {
            notifier.success(&format!("Product \"{}\" added", product.name));
            SubmitFeedback::Accepted
        }
        Err(error) => {
            warn!(%error, "product create failed");
            notifier.error(&error.to_string());
            SubmitFeedback::Rejected
        }
    }
}

/// Everything a shortcut action may touch.
pub struct Workspace {
    forms: FormEngine,
    focus: FocusRing,
    panel: HelpPanel,
    modal: Option<String>,
    collaborators: Collaborators,
}

impl Workspace {
    fn new(collaborators: Collaborators) -> Self {
        Self {
            forms: FormEngine::new(),
            focus: FocusRing::default(),
            panel: HelpPanel::default(),
            modal: None,
            collaborators,
        }
    }

    fn open_customer_modal(&mut self) -> Result<(), ActionError> {
        let on_submit = customer_submit(
            self.collaborators.customers.clone(),
            self.collaborators.notifier.clone(),
        );
        self.open_modal(customer_form_spec(), on_submit)
    }

    fn open_product_modal(&mut self) -> Result<(), ActionError> {
        let on_submit = product_submit(
            self.collaborators.products.clone(),
            self.collaborators.notifier.clone(),
        );
        self.open_modal(product_form_spec(), on_submit)
    }

    fn open_modal<F>(&mut self, spec: FormSpec, on_submit: F) -> Result<(), ActionError>
    where
        F: FnMut(&FormResult) -> SubmitFeedback + 'static,
    {
        self.close_modal();
        self.panel.close();
        let rendered = self
            .forms
            .build_form(spec, on_submit)
            .map_err(|e| ActionError::Failed(e.to_string()))?;
        debug!(form = %rendered.id, "modal opened");
        self.modal = Some(rendered.id);
        Ok(())
    }

    fn close_modal(&mut self) -> bool {
        match self.modal.take() {
            Some(id) => {
                self.forms.remove(&id);
                debug!(form = %id, "modal closed");
                true
            }
            None => false,
        }
    }

    /// Run a billing call, surfacing failures to the user before the
    /// dispatcher logs them.
    fn billing<T>(
        &self,
        call: impl FnOnce() -> Result<T, CollaboratorError>,
    ) -> Result<T, ActionError> {
        call().map_err(|error| {
            self.collaborators.notifier.error(&error.to_string());
            ActionError::from(error)
        })
    }
}

impl ShortcutHost<AppAction> for Workspace {
    fn modal_open(&self) -> bool {
        self.modal.is_some()
    }

    fn perform(&mut self, action: &AppAction) -> Result<(), ActionError> {
        let desk = self.collaborators.billing.clone();
        match *action {
            AppAction::NewInvoice => {
                let number = self.billing(|| desk.new_invoice())?;
                self.collaborators.shell.switch_tab(Tab::Billing);
                self.collaborators
                    .notifier
                    .success(&format!("Started invoice {number}"));
            }
            AppAction::SaveInvoice => {
                let number = self.billing(|| desk.save_invoice())?;
                self.collaborators
                    .notifier
                    .success(&format!("Invoice {number} saved"));
            }
            AppAction::PrintInvoice => self.billing(|| desk.print_invoice())?,
            AppAction::QuickAddCustomer => self.open_customer_modal()?,
            AppAction::QuickAddProduct => self.open_product_modal()?,
            AppAction::SwitchTab(tab) => self.collaborators.shell.switch_tab(tab),
            AppAction::ToggleTheme => self.collaborators.shell.toggle_theme(),
            AppAction::FocusNext => {
                self.focus.focus_next();
            }
            AppAction::FocusPrevious => {
                self.focus.focus_previous();
            }
            AppAction::ToggleHelp => {
                self.panel.toggle();
            }
            AppAction::Escape => {
                if !self.close_modal() {
                    self.panel.close();
                }
            }
        }
        Ok(())
    }
}

pub struct BillMaker {
    dispatcher: ShortcutDispatcher<AppAction>,
    workspace: Workspace,
    config: AppConfig,
}

impl BillMaker {
    pub fn new(config: AppConfig, collaborators: Collaborators) -> Self {
        let dispatcher = default_dispatcher(&config);
        info!(bindings = dispatcher.len(), "bill maker ready");
        Self {
            dispatcher,
            workspace: Workspace::new(collaborators),
            config,
        }
    }

    pub fn handle_key(&mut self, event: &mut KeyEvent) -> DispatchOutcome {
        self.dispatcher.dispatch(event, &mut self.workspace)
    }

    /// A document click; true when it closed the help panel.
    pub fn handle_click(&mut self, inside_panel: bool) -> bool {
        self.workspace.panel.handle_click(inside_panel)
    }

    /// The focusable elements changed.
    pub fn dom_mutated<I, S>(&mut self, focusable: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.workspace.focus.refresh(focusable);
    }

    /// Submit a form; an accepted quick-add submission closes its modal.
    pub fn submit_form(&mut self, form_id: &str) -> SubmitOutcome {
        let outcome = self.workspace.forms.submit(form_id);
        match &outcome {
            SubmitOutcome::Submitted { feedback: SubmitFeedback::Accepted, .. }
                if self.workspace.modal.as_deref() == Some(form_id) =>
            {
                self.workspace.close_modal();
            }
            SubmitOutcome::Invalid(errors) => {
                debug!(form = %form_id, errors = errors.len(), "submission invalid");
            }
            _ => {}
        }
        outcome
    }

    pub fn open_modal(&self) -> Option<&str> {
        self.workspace.modal.as_deref()
    }

    pub fn modal_markup(&self) -> Option<String> {
        self.open_modal().and_then(|id| self.workspace.forms.render(id))
    }

    pub fn help_open(&self) -> bool {
        self.workspace.panel.is_open()
    }

    pub fn help_panel_markup(&self) -> Option<String> {
        self.workspace.panel.render(&self.dispatcher)
    }

    pub fn focused(&self) -> Option<&str> {
        self.workspace.focus.active()
    }

    pub fn focus(&mut self, element: &str) -> bool {
        self.workspace.focus.focus(element)
    }

    pub fn forms(&self) -> &FormEngine {
        &self.workspace.forms
    }

    pub fn forms_mut(&mut self) -> &mut FormEngine {
        &mut self.workspace.forms
    }

    pub fn dispatcher(&self) -> &ShortcutDispatcher<AppAction> {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut ShortcutDispatcher<AppAction> {
        &mut self.dispatcher
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
