//! Collaborator contracts consumed by the application core.
//!
//! Persistence, notifications, the tab shell and the billing desk live
//! outside this crate. Each is a trait taking `&self` so one handle can be
//! shared between the shortcut host and form submission callbacks.
//! Completion is synchronous: the caller's continuation runs on the result.

use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::form::FormResult;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    #[error("{0}")]
    Rejected(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
}

fn text(data: &FormResult, name: &str) -> Option<String> {
    data.get(name)
        .and_then(|v| v.as_text())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn number(data: &FormResult, name: &str, label: &str) -> Result<f64, CollaboratorError> {
    match text(data, name) {
        None => Ok(0.0),
        Some(raw) => raw
            .parse::<f64>()
            .map_err(|_| CollaboratorError::Rejected(format!("{label} must be a number"))),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub gstin: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl Customer {
    /// Build from quick-add form data. The id is assigned by the store.
    pub fn from_form(data: &FormResult) -> Result<Self, CollaboratorError> {
        let name = text(data, "name")
            .ok_or_else(|| CollaboratorError::Rejected("Customer name is required".to_string()))?;
        Ok(Self {
            id: String::new(),
            name,
            phone: text(data, "phone"),
            email: text(data, "email"),
            gstin: text(data, "gstin").map(|g| g.to_ascii_uppercase()),
            address: text(data, "address"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub hsn: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub tax_rate: f64,
    #[serde(default)]
    pub unit: Option<String>,
}

impl Product {
    pub fn from_form(data: &FormResult) -> Result<Self, CollaboratorError> {
        let name = text(data, "name")
            .ok_or_else(|| CollaboratorError::Rejected("Product name is required".to_string()))?;
        Ok(Self {
            id: String::new(),
            name,
            hsn: text(data, "hsn"),
            price: number(data, "price", "Price")?,
            tax_rate: number(data, "taxRate", "Tax rate")?,
            unit: text(data, "unit"),
        })
    }
}

pub trait CustomerStore {
    fn create(&self, customer: Customer) -> Result<Customer, CollaboratorError>;
    fn update(&self, customer: Customer) -> Result<Customer, CollaboratorError>;
}

pub trait ProductStore {
    fn create(&self, product: Product) -> Result<Product, CollaboratorError>;
    fn update(&self, product: Product) -> Result<Product, CollaboratorError>;
}

pub trait Notifier {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    Billing,
    Customers,
    Products,
    History,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::Billing, Tab::Customers, Tab::Products, Tab::History];

    /// 1-based, matching the `Ctrl+1`..`Ctrl+4` bindings.
    pub fn from_number(n: usize) -> Option<Tab> {
        n.checked_sub(1).and_then(|i| Self::ALL.get(i).copied())
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tab::Billing => "billing",
            Tab::Customers => "customers",
            Tab::Products => "products",
            Tab::History => "history",
        };
        f.write_str(name)
    }
}

pub trait AppShell {
    fn switch_tab(&self, tab: Tab);
    fn toggle_theme(&self);
}

/// The invoice editor behind the billing tab.
pub trait BillingDesk {
    /// Start a fresh invoice, returning its number.
    fn new_invoice(&self) -> Result<String, CollaboratorError>;
    fn save_invoice(&self) -> Result<String, CollaboratorError>;
    fn print_invoice(&self) -> Result<(), CollaboratorError>;
}

/// Shared handles passed to `BillMaker`.
#[derive(Clone)]
pub struct Collaborators {
    pub customers: Rc<dyn CustomerStore>,
    pub products: Rc<dyn ProductStore>,
    pub notifier: Rc<dyn Notifier>,
    pub shell: Rc<dyn AppShell>,
    pub billing: Rc<dyn BillingDesk>,
}

// In-memory implementations

fn same_name(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

#[derive(Debug, Default)]
pub struct MemoryCustomerStore {
    customers: RefCell<Vec<Customer>>,
    failure: RefCell<Option<String>>,
}

impl MemoryCustomerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call fail with `message` until cleared with `None`.
    pub fn fail_with(&self, message: Option<&str>) {
        *self.failure.borrow_mut() = message.map(str::to_string);
    }

    pub fn all(&self) -> Vec<Customer> {
        self.customers.borrow().clone()
    }

    fn check_failure(&self) -> Result<(), CollaboratorError> {
        match self.failure.borrow().as_ref() {
            Some(message) => Err(CollaboratorError::Rejected(message.clone())),
            None => Ok(()),
        }
    }
}

impl CustomerStore for MemoryCustomerStore {
    fn create(&self, mut customer: Customer) -> Result<Customer, CollaboratorError> {
        self.check_failure()?;
        let mut customers = self.customers.borrow_mut();
        if customers.iter().any(|c| same_name(&c.name, &customer.name)) {
            return Err(CollaboratorError::Rejected(format!(
                "Customer \"{}\" already exists",
                customer.name
            )));
        }
        customer.id = Uuid::new_v4().to_string();
        debug!(id = %customer.id, "customer created");
        customers.push(customer.clone());
        Ok(customer)
    }

    fn update(&self, customer: Customer) -> Result<Customer, CollaboratorError> {
        self.check_failure()?;
        let mut customers = self.customers.borrow_mut();
        let slot = customers
            .iter_mut()
            .find(|c| c.id == customer.id)
            .ok_or_else(|| CollaboratorError::NotFound {
                entity: "Customer",
                id: customer.id.clone(),
            })?;
        *slot = customer.clone();
        Ok(customer)
    }
}

#[derive(Debug, Default)]
pub struct MemoryProductStore {
    products: RefCell<Vec<Product>>,
    failure: RefCell<Option<String>>,
}

impl MemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(&self, message: Option<&str>) {
        *self.failure.borrow_mut() = message.map(str::to_string);
    }

    pub fn all(&self) -> Vec<Product> {
        self.products.borrow().clone()
    }

    fn check_failure(&self) -> Result<(), CollaboratorError> {
        match self.failure.borrow().as_ref() {
            Some(message) => Err(CollaboratorError::Rejected(message.clone())),
            None => Ok(()),
        }
    }
}

impl ProductStore for MemoryProductStore {
    fn create(&self, mut product: Product) -> Result<Product, CollaboratorError> {
        self.check_failure()?;
        if product.price < 0.0 {
            return Err(CollaboratorError::Rejected("Price cannot be negative".to_string()));
        }
        let mut products = self.products.borrow_mut();
        if products.iter().any(|p| same_name(&p.name, &product.name)) {
            return Err(CollaboratorError::Rejected(format!(
                "Product \"{}\" already exists",
                product.name
            )));
        }
        product.id = Uuid::new_v4().to_string();
        debug!(id = %product.id, "product created");
        products.push(product.clone());
        Ok(product)
    }

    fn update(&self, product: Product) -> Result<Product, CollaboratorError> {
        self.check_failure()?;
        let mut products = self.products.borrow_mut();
        let slot = products
            .iter_mut()
            .find(|p| p.id == product.id)
            .ok_or_else(|| CollaboratorError::NotFound {
                entity: "Product",
                id: product.id.clone(),
            })?;
        *slot = product.clone();
        Ok(product)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: RefCell<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.borrow().clone()
    }

    pub fn last(&self) -> Option<Notice> {
        self.notices.borrow().last().cloned()
    }
}

impl Notifier for RecordingNotifier {
    fn success(&self, message: &str) {
        self.notices.borrow_mut().push(Notice::Success(message.to_string()));
    }

    fn error(&self, message: &str) {
        self.notices.borrow_mut().push(Notice::Error(message.to_string()));
    }
}

#[derive(Debug)]
pub struct RecordingShell {
    tab: Cell<Tab>,
    dark: Cell<bool>,
}

impl RecordingShell {
    pub fn new() -> Self {
        Self {
            tab: Cell::new(Tab::Billing),
            dark: Cell::new(false),
        }
    }

    pub fn tab(&self) -> Tab {
        self.tab.get()
    }

    pub fn dark_theme(&self) -> bool {
        self.dark.get()
    }
}

impl Default for RecordingShell {
    fn default() -> Self {
        Self::new()
    }
}

impl AppShell for RecordingShell {
    fn switch_tab(&self, tab: Tab) {
        self.tab.set(tab);
    }

    fn toggle_theme(&self) {
        self.dark.set(!self.dark.get());
    }
}

/// Numbers invoices `INV-0001`, `INV-0002`, ... and tracks the open one.
#[derive(Debug, Default)]
pub struct RecordingBillingDesk {
    issued: Cell<u32>,
    open: RefCell<Option<String>>,
    saved: RefCell<Vec<String>>,
    printed: Cell<u32>,
}

impl RecordingBillingDesk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<String> {
        self.open.borrow().clone()
    }

    pub fn saved(&self) -> Vec<String> {
        self.saved.borrow().clone()
    }

    pub fn printed(&self) -> u32 {
        self.printed.get()
    }

    fn require_open(&self) -> Result<String, CollaboratorError> {
        self.open
            .borrow()
            .clone()
            .ok_or_else(|| CollaboratorError::Rejected("No invoice in progress".to_string()))
    }
}

impl BillingDesk for RecordingBillingDesk {
    fn new_invoice(&self) -> Result<String, CollaboratorError> {
        let next = self.issued.get() + 1;
        self.issued.set(next);
        let number = format!("INV-{next:04}");
        *self.open.borrow_mut() = Some(number.clone());
        Ok(number)
    }

    fn save_invoice(&self) -> Result<String, CollaboratorError> {
        let number = self.require_open()?;
        self.saved.borrow_mut().push(number.clone());
        Ok(number)
    }

    fn print_invoice(&self) -> Result<(), CollaboratorError> {
        self.require_open()?;
        self.printed.set(self.printed.get() + 1);
        Ok(())
    }
}

/// Concrete in-memory collaborators, kept typed so callers can inspect them.
#[derive(Debug, Clone)]
pub struct InMemoryCollaborators {
    pub customers: Rc<MemoryCustomerStore>,
    pub products: Rc<MemoryProductStore>,
    pub notifier: Rc<RecordingNotifier>,
    pub shell: Rc<RecordingShell>,
    pub billing: Rc<RecordingBillingDesk>,
}

impl InMemoryCollaborators {
    pub fn new() -> Self {
        Self {
            customers: Rc::new(MemoryCustomerStore::new()),
            products: Rc::new(MemoryProductStore::new()),
            notifier: Rc::new(RecordingNotifier::new()),
            shell: Rc::new(RecordingShell::new()),
            billing: Rc::new(RecordingBillingDesk::new()),
        }
    }

    pub fn handles(&self) -> Collaborators {
        Collaborators {
            customers: self.customers.clone(),
            products: self.products.clone(),
            notifier: self.notifier.clone(),
            shell: self.shell.clone(),
            billing: self.billing.clone(),
        }
    }
}

impl Default for InMemoryCollaborators {
    fn default() -> Self {
        Self::new()
    }
}
