//! Domain models for billing-portal.

mod adjustment;
mod bill;
mod payment;

pub use adjustment::{BillAdjustment, CreateAdjustment};
pub use bill::{
    BillDetails, BillSnapshot, ComputedCharges, ConnectionInfo, CurrentBill, CustomerInfo,
    FixedChargeLine, PreviousBill, PreviousBillRow, RetrieveBill, SubsidyLine, TariffLine,
    TaxLine, TaxRate, PREVIOUS_BILLS_LIMIT,
};
pub use payment::{CreatePayment, PaymentReceipt, PaymentStatus, Settlement};
