//! Checkout customer details and the pluggable validator that checks them.
//!
//! The checkout form is collected as a raw [`CustomerForm`]. A
//! [`CustomerValidator`] turns it into a [`Customer`] or explains which fields
//! are wrong. Applications can swap in their own rules; the
//! [`BasicCustomerValidator`] covers the usual storefront checks.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::email::Email;

/// Raw checkout form input, exactly as the buyer typed it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerForm {
    pub name: String,
    pub email: String,
    pub tel: String,
    pub address: String,
}

/// Validated customer details sent with an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub email: Email,
    pub tel: String,
    pub address: String,
}

/// Checkout form fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerField {
    Name,
    Email,
    Tel,
    Address,
}

impl fmt::Display for CustomerField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Tel => "tel",
            Self::Address => "address",
        })
    }
}

/// A single rejected field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: CustomerField,
    pub message: String,
}

/// Every field the validator rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid customer details: {}", format_field_errors(.0))]
pub struct CustomerError(pub Vec<FieldError>);

impl CustomerError {
    /// Whether the given field was rejected.
    #[must_use]
    pub fn has(&self, field: CustomerField) -> bool {
        self.0.iter().any(|e| e.field == field)
    }
}

fn format_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Checks a checkout form before an order is submitted.
pub trait CustomerValidator: Send + Sync {
    /// Validate the form, returning the customer to submit.
    ///
    /// # Errors
    ///
    /// Returns a [`CustomerError`] listing every rejected field.
    fn validate(&self, form: &CustomerForm) -> Result<Customer, CustomerError>;
}

/// Default storefront rules: required name and address, a parseable email and
/// a telephone number with at least [`Self::MIN_TEL_DIGITS`] digits.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicCustomerValidator;

impl BasicCustomerValidator {
    /// Minimum number of digits in a telephone number.
    pub const MIN_TEL_DIGITS: usize = 8;
}

impl CustomerValidator for BasicCustomerValidator {
    fn validate(&self, form: &CustomerForm) -> Result<Customer, CustomerError> {
        let mut errors = Vec::new();

        let name = form.name.trim();
        if name.is_empty() {
            errors.push(FieldError {
                field: CustomerField::Name,
                message: "is required".to_string(),
            });
        }

        let email = match Email::parse(&form.email) {
            Ok(email) => Some(email),
            Err(e) => {
                errors.push(FieldError {
                    field: CustomerField::Email,
                    message: e.to_string(),
                });
                None
            }
        };

        let tel = form.tel.trim();
        let digits = tel.chars().filter(char::is_ascii_digit).count();
        let allowed = tel
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'));
        if !allowed || digits < Self::MIN_TEL_DIGITS {
            errors.push(FieldError {
                field: CustomerField::Tel,
                message: format!(
                    "must be a phone number with at least {} digits",
                    Self::MIN_TEL_DIGITS
                ),
            });
        }

        let address = form.address.trim();
        if address.is_empty() {
            errors.push(FieldError {
                field: CustomerField::Address,
                message: "is required".to_string(),
            });
        }

        match email {
            Some(email) if errors.is_empty() => Ok(Customer {
                name: name.to_string(),
                email,
                tel: tel.to_string(),
                address: address.to_string(),
            }),
            _ => Err(CustomerError(errors)),
        }
    }
}
