use askama::Template;
use axum::extract::State;
use tracing::instrument;

use crate::dtos::AdjustmentForm;
use crate::error::PortalError;
use crate::models::{BillAdjustment, CreateAdjustment};
use crate::services::{record_adjustment, record_error};
use crate::startup::AppState;
use crate::utils::ValidatedForm;

const ROUTE: &str = "/bill-adjustment";

#[derive(Template)]
#[template(path = "adjustment_receipt.html")]
pub struct AdjustmentReceiptTemplate {
    pub adjustment: BillAdjustment,
}

/// Record an officer's adjustment to a bill.
#[instrument(skip(state, form), fields(bill_id = form.bill_id))]
pub async fn post_bill_adjustment(
    State(state): State<AppState>,
    ValidatedForm(form): ValidatedForm<AdjustmentForm>,
) -> Result<AdjustmentReceiptTemplate, PortalError> {
    let input = CreateAdjustment::from(form);

    let adjustment = state.db.record_adjustment(input).await.map_err(|e| {
        let err = PortalError::from_app_error(e, "Error recording adjustment.");
        record_error(err.kind.as_str(), ROUTE);
        err
    })?;

    record_adjustment();

    Ok(AdjustmentReceiptTemplate { adjustment })
}
