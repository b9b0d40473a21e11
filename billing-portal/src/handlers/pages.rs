use askama::Template;
use axum::response::IntoResponse;

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {}

#[derive(Template)]
#[template(path = "bill_payment.html")]
pub struct BillPaymentTemplate {}

#[derive(Template)]
#[template(path = "bill_retrieval.html")]
pub struct BillRetrievalTemplate {}

#[derive(Template)]
#[template(path = "bill_adjustment.html")]
pub struct BillAdjustmentTemplate {}

pub async fn index() -> impl IntoResponse {
    IndexTemplate {}
}

pub async fn bill_payment_page() -> impl IntoResponse {
    BillPaymentTemplate {}
}

pub async fn bill_retrieval_page() -> impl IntoResponse {
    BillRetrievalTemplate {}
}

pub async fn bill_adjustment_page() -> impl IntoResponse {
    BillAdjustmentTemplate {}
}
