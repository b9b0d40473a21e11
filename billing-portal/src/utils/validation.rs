use axum::{
    extract::{FromRequest, Request},
    Form,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::PortalError;
use crate::services::record_error;

/// Form extractor that rejects unparsable or invalid input before the
/// handler runs.
pub struct ValidatedForm<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedForm<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = PortalError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let route = req.uri().path().to_string();

        let Form(value) = Form::<T>::from_request(req, state).await.map_err(|e| {
            record_error("validation", &route);
            PortalError::validation(e.body_text())
        })?;

        value.validate().map_err(|e| {
            record_error("validation", &route);
            PortalError::validation(e.to_string())
        })?;

        Ok(ValidatedForm(value))
    }
}
