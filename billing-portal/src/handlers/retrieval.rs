use askama::Template;
use axum::extract::State;
use tracing::instrument;

use crate::dtos::BillRetrievalForm;
use crate::error::{ErrorKind, PortalError};
use crate::models::{BillDetails, RetrieveBill};
use crate::services::{record_error, record_retrieval};
use crate::startup::AppState;
use crate::utils::ValidatedForm;

const ROUTE: &str = "/bill-retrieval";

#[derive(Template)]
#[template(path = "bill_details.html")]
pub struct BillDetailsTemplate {
    pub bill: BillDetails,
}

/// Look up a bill with its tariff, tax and history context.
#[instrument(skip(state, form), fields(connection_id = %form.connection_id))]
pub async fn post_bill_retrieval(
    State(state): State<AppState>,
    ValidatedForm(form): ValidatedForm<BillRetrievalForm>,
) -> Result<BillDetailsTemplate, PortalError> {
    let input = RetrieveBill::from(form);

    let bill = state.db.fetch_bill_details(&input).await.map_err(|e| {
        let err = PortalError::from_app_error(e, "Error retrieving bill details.");
        match err.kind {
            ErrorKind::NotFound => record_retrieval("not_found"),
            _ => record_retrieval("error"),
        }
        record_error(err.kind.as_str(), ROUTE);
        err
    })?;

    record_retrieval("found");

    Ok(BillDetailsTemplate { bill })
}
