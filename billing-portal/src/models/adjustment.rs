//! Bill adjustment model.

use chrono::{DateTime, SubsecRound, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// Input for adjusting a bill, as submitted by an officer.
#[derive(Debug, Clone)]
pub struct CreateAdjustment {
    pub bill_id: i32,
    pub officer_name: String,
    pub officer_designation: String,
    pub original_bill_amount: Decimal,
    pub adjustment_amount: Decimal,
    pub adjustment_reason: String,
}

/// A `BillAdjustments` row.
#[derive(Debug, Clone, Serialize)]
pub struct BillAdjustment {
    pub adjustment_id: Uuid,
    pub bill_id: i32,
    pub officer_name: String,
    pub officer_designation: String,
    pub original_bill_amount: Decimal,
    pub adjustment_amount: Decimal,
    pub adjusted_bill_amount: Decimal,
    pub adjustment_reason: String,
    pub adjustment_date: DateTime<Utc>,
}

impl BillAdjustment {
    /// Assign a fresh identifier and timestamp.
    ///
    /// `original_bill_amount` is taken as submitted; it is not re-read from
    /// the bill.
    pub fn new(input: CreateAdjustment) -> Self {
        Self {
            adjustment_id: Uuid::new_v4(),
            adjusted_bill_amount: input.original_bill_amount - input.adjustment_amount,
            bill_id: input.bill_id,
            officer_name: input.officer_name,
            officer_designation: input.officer_designation,
            original_bill_amount: input.original_bill_amount,
            adjustment_amount: input.adjustment_amount,
            adjustment_reason: input.adjustment_reason,
            adjustment_date: Utc::now().trunc_subsecs(0),
        }
    }
}
