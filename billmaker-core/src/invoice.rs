//! Invoice data and GST arithmetic.
//!
//! Amounts are fixed-point paise (1/100 rupee). Each derived amount is
//! rounded half away from zero exactly once, so for every line and every
//! invoice `total == taxable_amount + total_tax` holds without drift.
//! Every amount stays within `Money::MAX`; computations that would leave
//! that range fail with `InvoiceError` instead of wrapping.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, Sub};
use thiserror::Error;

/// 10^15 paise, i.e. ten lakh crore rupees.
const MAX_PAISE: i64 = 1_000_000_000_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvoiceError {
    #[error("Line '{0}' exceeds the maximum invoice amount")]
    LineOverflow(String),

    #[error("Invoice total exceeds the maximum invoice amount")]
    TotalOverflow,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);
    pub const MAX: Money = Money(MAX_PAISE);

    pub fn from_paise(paise: i64) -> Self {
        Self(paise)
    }

    /// Round a rupee amount to the nearest paisa.
    pub fn from_rupees(rupees: f64) -> Self {
        Self(round_paise(rupees * 100.0))
    }

    pub fn paise(self) -> i64 {
        self.0
    }

    pub fn rupees(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// A paise value rounded to the paisa, `None` outside `±Money::MAX`.
    pub fn from_paise_f64(paise: f64) -> Option<Money> {
        (paise.is_finite() && paise.abs() <= MAX_PAISE as f64).then(|| Money(paise.round() as i64))
    }

    /// `self × percent / 100`, rounded to the paisa.
    pub fn checked_percent(self, percent: f64) -> Option<Money> {
        Money::from_paise_f64(self.0 as f64 * percent / 100.0)
    }

    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).filter(|v| v.abs() <= MAX_PAISE).map(Money)
    }

    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).filter(|v| v.abs() <= MAX_PAISE).map(Money)
    }

    /// Sum of `amounts`, `None` once the running total leaves range.
    pub fn checked_sum<I: IntoIterator<Item = Money>>(amounts: I) -> Option<Money> {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, |acc, amount| acc.checked_add(amount))
    }

    /// The larger half when the amount is odd.
    pub fn upper_half(self) -> Money {
        Money(self.0 / 2 + self.0 % 2)
    }
}

/// Saturating float to paise; NaN is zero. Only used for external input.
fn round_paise(value: f64) -> i64 {
    value.round() as i64
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.rupees())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        f64::deserialize(deserializer).map(Money::from_rupees)
    }
}

/// Indian grouping: `12,34,567.89`.
pub fn format_indian(amount: Money) -> String {
    let plain = amount.to_string();
    let (sign, rest) = match plain.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", plain.as_str()),
    };
    let (whole, fraction) = rest.split_once('.').unwrap_or((rest, "00"));
    if whole.len() <= 3 {
        return format!("{sign}{whole}.{fraction}");
    }
    let (head, last3) = whole.split_at(whole.len() - 3);
    let mut groups = Vec::new();
    let mut end = head.len();
    while end > 2 {
        groups.push(&head[end - 2..end]);
        end -= 2;
    }
    groups.push(&head[..end]);
    groups.reverse();
    format!("{sign}{},{last3}.{fraction}", groups.join(","))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub gstin: Option<String>,
}

impl Party {
    /// Two-digit state code that prefixes a GSTIN.
    pub fn state_code(&self) -> Option<&str> {
        let gstin = self.gstin.as_deref()?.trim();
        let code = gstin.get(..2)?;
        code.chars().all(|c| c.is_ascii_digit()).then_some(code)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub description: String,
    #[serde(default)]
    pub hsn: Option<String>,
    pub quantity: f64,
    /// Unit price in rupees.
    pub rate: f64,
    #[serde(default)]
    pub discount_percent: f64,
    #[serde(default)]
    pub tax_rate: f64,
    #[serde(default)]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineTotals {
    pub gross: Money,
    pub discount: Money,
    pub taxable_amount: Money,
    pub total_tax: Money,
    pub total: Money,
}

impl LineItem {
    pub fn new(description: impl Into<String>, quantity: f64, rate: f64) -> Self {
        Self {
            description: description.into(),
            hsn: None,
            quantity,
            rate,
            discount_percent: 0.0,
            tax_rate: 0.0,
            unit: None,
        }
    }

    pub fn with_discount(mut self, percent: f64) -> Self {
        self.discount_percent = percent;
        self
    }

    pub fn with_tax(mut self, rate: f64) -> Self {
        self.tax_rate = rate;
        self
    }

    /// Negative inputs count as zero; discounts cap at 100%.
    pub fn totals(&self) -> Result<LineTotals, InvoiceError> {
        let overflow = || InvoiceError::LineOverflow(self.description.clone());
        let quantity = non_negative(self.quantity);
        let rate = Money::from_rupees(non_negative(self.rate));
        let discount_percent = non_negative(self.discount_percent).min(100.0);
        let tax_rate = non_negative(self.tax_rate);

        let gross = Money::from_paise_f64(rate.0 as f64 * quantity).ok_or_else(overflow)?;
        let discount = gross.checked_percent(discount_percent).ok_or_else(overflow)?;
        let taxable_amount = gross.checked_sub(discount).ok_or_else(overflow)?;
        let total_tax = taxable_amount.checked_percent(tax_rate).ok_or_else(overflow)?;
        let total = taxable_amount.checked_add(total_tax).ok_or_else(overflow)?;
        Ok(LineTotals {
            gross,
            discount,
            taxable_amount,
            total_tax,
            total,
        })
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Intra-state supplies split GST into CGST + SGST; inter-state supplies pay IGST.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxRegime {
    #[default]
    Intra,
    Inter,
}

impl TaxRegime {
    /// Inter-state only when both parties carry GSTINs from different states.
    pub fn between(business: &Party, customer: &Party) -> Self {
        match (business.state_code(), customer.state_code()) {
            (Some(a), Some(b)) if a != b => TaxRegime::Inter,
            _ => TaxRegime::Intra,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub taxable_amount: Money,
    pub cgst: Money,
    pub sgst: Money,
    pub igst: Money,
    pub total_tax: Money,
    pub grand_total: Money,
    pub regime: TaxRegime,
}

impl InvoiceTotals {
    pub fn compute(items: &[LineItem], regime: TaxRegime) -> Result<Self, InvoiceError> {
        let lines = items
            .iter()
            .map(LineItem::totals)
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_lines(&lines, regime)
    }

    pub fn from_lines(lines: &[LineTotals], regime: TaxRegime) -> Result<Self, InvoiceError> {
        let sum = |pick: fn(&LineTotals) -> Money| {
            Money::checked_sum(lines.iter().map(pick)).ok_or(InvoiceError::TotalOverflow)
        };
        let subtotal = sum(|l| l.gross)?;
        let discount = sum(|l| l.discount)?;
        let taxable_amount = sum(|l| l.taxable_amount)?;
        let total_tax = sum(|l| l.total_tax)?;
        let grand_total = taxable_amount
            .checked_add(total_tax)
            .ok_or(InvoiceError::TotalOverflow)?;

        let (cgst, sgst, igst) = match regime {
            TaxRegime::Intra => {
                let cgst = total_tax.upper_half();
                (cgst, total_tax - cgst, Money::ZERO)
            }
            TaxRegime::Inter => (Money::ZERO, Money::ZERO, total_tax),
        };

        Ok(Self {
            subtotal,
            discount,
            taxable_amount,
            cgst,
            sgst,
            igst,
            total_tax,
            grand_total,
            regime,
        })
    }
}

/// The structure handed to template renderers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub business: Party,
    #[serde(rename = "customerData")]
    pub customer: Party,
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub totals: Option<InvoiceTotals>,
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Invoice {
    pub fn regime(&self) -> TaxRegime {
        TaxRegime::between(&self.business, &self.customer)
    }

    /// Always recomputed from the line items.
    pub fn computed_totals(&self) -> Result<InvoiceTotals, InvoiceError> {
        InvoiceTotals::compute(&self.items, self.regime())
    }

    /// Fill in totals and, if missing, the due date.
    pub fn finalize(&mut self, payment_terms_days: u32) -> Result<(), InvoiceError> {
        self.totals = Some(self.computed_totals()?);
        if self.due_date.is_none() {
            self.due_date =
                Some(self.invoice_date + Duration::days(i64::from(payment_terms_days)));
        }
        Ok(())
    }
}

const ONES: [&str; 20] = [
    "Zero", "One", "Two", "Three", "Four", "Five", "Six", "Seven", "Eight", "Nine", "Ten",
    "Eleven", "Twelve", "Thirteen", "Fourteen", "Fifteen", "Sixteen", "Seventeen", "Eighteen",
    "Nineteen",
];

const TENS: [&str; 10] = [
    "", "", "Twenty", "Thirty", "Forty", "Fifty", "Sixty", "Seventy", "Eighty", "Ninety",
];

fn below_hundred(n: u64) -> String {
    if n < 20 {
        ONES[n as usize].to_string()
    } else if n % 10 == 0 {
        TENS[(n / 10) as usize].to_string()
    } else {
        format!("{} {}", TENS[(n / 10) as usize], ONES[(n % 10) as usize])
    }
}

fn number_in_words(n: u64) -> String {
    if n == 0 {
        return ONES[0].to_string();
    }
    let mut parts = Vec::new();
    let crore = n / 10_000_000;
    let lakh = (n / 100_000) % 100;
    let thousand = (n / 1_000) % 100;
    let hundred = (n / 100) % 10;
    let rest = n % 100;

    if crore > 0 {
        parts.push(format!("{} Crore", number_in_words(crore)));
    }
    if lakh > 0 {
        parts.push(format!("{} Lakh", below_hundred(lakh)));
    }
    if thousand > 0 {
        parts.push(format!("{} Thousand", below_hundred(thousand)));
    }
    if hundred > 0 {
        parts.push(format!("{} Hundred", ONES[hundred as usize]));
    }
    if rest > 0 {
        parts.push(below_hundred(rest));
    }
    parts.join(" ")
}

/// `212.40` -> `"Rupees Two Hundred Twelve and Forty Paise Only"`.
pub fn amount_in_words(amount: Money) -> String {
    let paise = amount.paise().unsigned_abs();
    let rupees = number_in_words(paise / 100);
    let prefix = if amount.paise() < 0 { "Minus " } else { "" };
    match paise % 100 {
        0 => format!("{prefix}Rupees {rupees} Only"),
        p => format!("{prefix}Rupees {rupees} and {} Paise Only", below_hundred(p)),
    }
}
