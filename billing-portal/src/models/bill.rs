//! Bill retrieval models.
//!
//! Rows are fetched into the `FromRow` structs, collected into a
//! [`BillSnapshot`], and flattened into [`BillDetails`] for rendering.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

/// Most bills shown in the history table.
pub const PREVIOUS_BILLS_LIMIT: i64 = 10;

/// Input for retrieving a bill.
#[derive(Debug, Clone)]
pub struct RetrieveBill {
    pub customer_id: String,
    pub connection_id: String,
    pub month: i32,
    pub year: i32,
}

#[derive(Debug, Clone, FromRow)]
pub struct ConnectionInfo {
    pub customer_id: String,
    pub division_name: String,
    pub sub_div_name: String,
    pub installation_date: Option<NaiveDate>,
    pub meter_type: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct CustomerInfo {
    pub first_name: String,
    pub last_name: String,
    pub address: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub customer_type: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct CurrentBill {
    pub bill_id: i32,
    pub bill_issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub total_before_due_date: Decimal,
    pub total_after_due_date: Decimal,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TariffLine {
    pub name: String,
    pub units: Decimal,
    pub rate: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Clone, FromRow)]
pub struct TaxRate {
    pub tax_type: String,
    pub rate: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaxLine {
    pub name: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SubsidyLine {
    pub name: String,
    pub provider_name: String,
    pub rate_per_unit: Decimal,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FixedChargeLine {
    pub name: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, FromRow)]
pub struct PreviousBillRow {
    pub billing_month: i32,
    pub billing_year: i32,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreviousBill {
    /// `month-year`, e.g. `3-2024`.
    pub month: String,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub status: String,
}

impl From<PreviousBillRow> for PreviousBill {
    fn from(row: PreviousBillRow) -> Self {
        Self {
            month: format!("{}-{}", row.billing_month, row.billing_year),
            amount: row.amount,
            due_date: row.due_date,
            status: row.status,
        }
    }
}

/// Results of the `fun_compute_*` stored functions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComputedCharges {
    pub import_peak_units: Decimal,
    pub import_off_peak_units: Decimal,
    pub export_off_peak_units: Decimal,
    pub peak_amount: Decimal,
    pub off_peak_amount: Decimal,
    pub arrears: Decimal,
    pub fixed_fee: Decimal,
    pub tax_amount: Decimal,
}

impl ComputedCharges {
    /// Exported energy offsets imported off-peak consumption; may be negative.
    pub fn net_off_peak_units(&self) -> Decimal {
        self.import_off_peak_units - self.export_off_peak_units
    }
}

/// Everything the database returned for one retrieval.
#[derive(Debug, Clone)]
pub struct BillSnapshot {
    pub connection: ConnectionInfo,
    pub customer: CustomerInfo,
    pub bill: CurrentBill,
    pub tariffs: Vec<TariffLine>,
    pub tax_rates: Vec<TaxRate>,
    pub subsidies: Vec<SubsidyLine>,
    pub fixed_charges: Vec<FixedChargeLine>,
    pub previous_bills: Vec<PreviousBillRow>,
    pub charges: ComputedCharges,
}

/// Flat view rendered on the bill details page.
#[derive(Debug, Clone, Serialize)]
pub struct BillDetails {
    pub customer_id: String,
    pub connection_id: String,
    pub customer_name: String,
    pub customer_address: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub connection_type: Option<String>,
    pub division: String,
    pub subdivision: String,
    pub installation_date: Option<NaiveDate>,
    pub meter_type: Option<String>,
    pub issue_date: NaiveDate,
    pub net_peak_units: Decimal,
    pub net_off_peak_units: Decimal,
    pub bill_amount: Decimal,
    pub due_date: NaiveDate,
    pub amount_after_due_date: Decimal,
    pub month: i32,
    pub year: i32,
    pub peak_amount: Decimal,
    pub off_peak_amount: Decimal,
    pub arrears_amount: Decimal,
    pub fixed_fee_amount: Decimal,
    pub tax_amount: Decimal,
    pub tariffs: Vec<TariffLine>,
    pub taxes: Vec<TaxLine>,
    pub subsidies: Vec<SubsidyLine>,
    pub fixed_charges: Vec<FixedChargeLine>,
    pub previous_bills: Vec<PreviousBill>,
}

impl BillDetails {
    pub fn from_snapshot(request: RetrieveBill, snapshot: BillSnapshot) -> Self {
        let BillSnapshot {
            connection,
            customer,
            bill,
            tariffs,
            tax_rates,
            subsidies,
            fixed_charges,
            previous_bills,
            charges,
        } = snapshot;

        // Tax lines are shown against the amount payable before the due date.
        let taxes = tax_rates
            .into_iter()
            .map(|t| TaxLine {
                name: t.tax_type,
                amount: t.rate * bill.total_before_due_date,
            })
            .collect();

        Self {
            customer_id: request.customer_id,
            connection_id: request.connection_id,
            customer_name: format!("{} {}", customer.first_name, customer.last_name),
            customer_address: customer.address,
            customer_phone: customer.phone_number,
            customer_email: customer.email,
            connection_type: customer.customer_type,
            division: connection.division_name,
            subdivision: connection.sub_div_name,
            installation_date: connection.installation_date,
            meter_type: connection.meter_type,
            issue_date: bill.bill_issue_date,
            net_peak_units: charges.import_peak_units,
            net_off_peak_units: charges.net_off_peak_units(),
            bill_amount: bill.total_before_due_date,
            due_date: bill.due_date,
            amount_after_due_date: bill.total_after_due_date,
            month: request.month,
            year: request.year,
            peak_amount: charges.peak_amount,
            off_peak_amount: charges.off_peak_amount,
            arrears_amount: charges.arrears,
            fixed_fee_amount: charges.fixed_fee,
            tax_amount: charges.tax_amount,
            tariffs,
            taxes,
            subsidies,
            fixed_charges,
            previous_bills: previous_bills
                .into_iter()
                .take(PREVIOUS_BILLS_LIMIT as usize)
                .map(PreviousBill::from)
                .collect(),
        }
    }
}
