//! Form payloads accepted by the POST handlers.

use crate::models::{CreateAdjustment, CreatePayment, RetrieveBill};
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::{Validate, ValidationError};

#[derive(Debug, Deserialize, Validate)]
pub struct PaymentForm {
    #[validate(range(min = 1, message = "Bill ID must be a positive integer"))]
    pub bill_id: i32,

    #[validate(custom(function = "validate_positive_amount"))]
    pub amount: Decimal,

    #[validate(range(min = 1, message = "Payment method ID must be a positive integer"))]
    pub payment_method_id: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BillRetrievalForm {
    #[validate(
        length(max = 50, message = "Customer ID is too long"),
        custom(function = "validate_not_blank")
    )]
    pub customer_id: String,

    #[validate(
        length(max = 50, message = "Connection ID is too long"),
        custom(function = "validate_not_blank")
    )]
    pub connection_id: String,

    #[validate(range(min = 1, max = 12, message = "Month must be between 1 and 12"))]
    pub month: i32,

    #[validate(range(min = 1900, max = 9999, message = "Year is out of range"))]
    pub year: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AdjustmentForm {
    #[validate(range(min = 1, message = "Bill ID must be a positive integer"))]
    pub bill_id: i32,

    #[validate(
        length(max = 100, message = "Officer name is too long"),
        custom(function = "validate_not_blank")
    )]
    pub officer_name: String,

    #[validate(
        length(max = 100, message = "Officer designation is too long"),
        custom(function = "validate_not_blank")
    )]
    pub officer_designation: String,

    #[validate(custom(function = "validate_non_negative_amount"))]
    pub original_bill_amount: Decimal,

    /// Negative amounts raise the bill.
    pub adjustment_amount: Decimal,

    #[validate(
        length(max = 500, message = "Adjustment reason is too long"),
        custom(function = "validate_not_blank")
    )]
    pub adjustment_reason: String,
}

fn validate_positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_positive() && !amount.is_zero() {
        Ok(())
    } else {
        Err(ValidationError::new("positive_amount")
            .with_message("Amount must be greater than zero".into()))
    }
}

fn validate_non_negative_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        Err(ValidationError::new("non_negative_amount")
            .with_message("Amount must not be negative".into()))
    } else {
        Ok(())
    }
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("not_blank").with_message("Value is required".into()))
    } else {
        Ok(())
    }
}

impl From<PaymentForm> for CreatePayment {
    fn from(form: PaymentForm) -> Self {
        CreatePayment::new(form.bill_id, form.amount, form.payment_method_id)
    }
}

impl From<BillRetrievalForm> for RetrieveBill {
    fn from(form: BillRetrievalForm) -> Self {
        RetrieveBill {
            customer_id: form.customer_id.trim().to_string(),
            connection_id: form.connection_id.trim().to_string(),
            month: form.month,
            year: form.year,
        }
    }
}

impl From<AdjustmentForm> for CreateAdjustment {
    fn from(form: AdjustmentForm) -> Self {
        CreateAdjustment {
            bill_id: form.bill_id,
            officer_name: form.officer_name.trim().to_string(),
            officer_designation: form.officer_designation.trim().to_string(),
            original_bill_amount: form.original_bill_amount,
            adjustment_amount: form.adjustment_amount,
            adjustment_reason: form.adjustment_reason.trim().to_string(),
        }
    }
}
