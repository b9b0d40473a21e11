use askama::Template;
use axum::extract::State;
use tracing::instrument;

use crate::dtos::PaymentForm;
use crate::error::PortalError;
use crate::models::{CreatePayment, PaymentReceipt};
use crate::services::{record_error, record_payment};
use crate::startup::AppState;
use crate::utils::ValidatedForm;

const ROUTE: &str = "/bill-payment";

#[derive(Template)]
#[template(path = "payment_receipt.html")]
pub struct PaymentReceiptTemplate {
    pub payment: PaymentReceipt,
}

/// Record a payment and render the receipt.
#[instrument(skip(state, form), fields(bill_id = form.bill_id))]
pub async fn post_bill_payment(
    State(state): State<AppState>,
    ValidatedForm(form): ValidatedForm<PaymentForm>,
) -> Result<PaymentReceiptTemplate, PortalError> {
    let input = CreatePayment::from(form);

    let payment = state.db.record_payment(&input).await.map_err(|e| {
        let err = PortalError::from_app_error(e, "Error processing payment.");
        record_error(err.kind.as_str(), ROUTE);
        err
    })?;

    record_payment(payment.payment_status.as_str());

    Ok(PaymentReceiptTemplate { payment })
}
