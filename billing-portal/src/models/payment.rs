//! Payment model.

use chrono::{DateTime, SubsecRound, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a `PaymentDetails` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    PartiallyPaid,
    FullyPaid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::PartiallyPaid => "Partially Paid",
            PaymentStatus::FullyPaid => "Fully Paid",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for recording a payment against a bill.
#[derive(Debug, Clone)]
pub struct CreatePayment {
    pub bill_id: i32,
    pub amount: Decimal,
    pub payment_method_id: i32,
    /// Single instant used for the insert, the status update and the receipt.
    pub payment_date: DateTime<Utc>,
}

impl CreatePayment {
    pub fn new(bill_id: i32, amount: Decimal, payment_method_id: i32) -> Self {
        Self {
            bill_id,
            amount,
            payment_method_id,
            // PostgreSQL stores microseconds; the update re-matches on this value.
            payment_date: Utc::now().trunc_subsecs(6),
        }
    }
}

/// Balance left on a bill after a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub outstanding_amount: Decimal,
    pub status: PaymentStatus,
}

impl Settlement {
    pub fn compute(total_after_due_date: Decimal, amount_paid: Decimal) -> Self {
        let outstanding_amount = total_after_due_date - amount_paid;
        let status = if outstanding_amount <= Decimal::ZERO {
            PaymentStatus::FullyPaid
        } else {
            PaymentStatus::PartiallyPaid
        };

        Self {
            outstanding_amount,
            status,
        }
    }
}

/// What the payer sees after a committed payment.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub bill_id: i32,
    pub amount: Decimal,
    pub payment_method_id: i32,
    pub payment_method_description: String,
    pub payment_date: DateTime<Utc>,
    pub payment_status: PaymentStatus,
    pub outstanding_amount: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn exact_payment_settles_the_bill() {
        let settlement = Settlement::compute(dec("500.00"), dec("500.00"));
        assert_eq!(settlement.status, PaymentStatus::FullyPaid);
        assert_eq!(settlement.outstanding_amount, dec("0.00"));
    }

    #[test]
    fn short_payment_leaves_balance() {
        let settlement = Settlement::compute(dec("500.00"), dec("300.00"));
        assert_eq!(settlement.status, PaymentStatus::PartiallyPaid);
        assert_eq!(settlement.outstanding_amount, dec("200.00"));
    }

    #[test]
    fn overpayment_goes_negative() {
        let settlement = Settlement::compute(dec("500.00"), dec("750.25"));
        assert_eq!(settlement.status, PaymentStatus::FullyPaid);
        assert_eq!(settlement.outstanding_amount, dec("-250.25"));
    }

    #[test]
    fn zero_payment_keeps_full_balance() {
        let settlement = Settlement::compute(dec("123.45"), Decimal::ZERO);
        assert_eq!(settlement.status, PaymentStatus::PartiallyPaid);
        assert_eq!(settlement.outstanding_amount, dec("123.45"));
    }

    #[test]
    fn zero_bill_is_fully_paid_by_anything() {
        let settlement = Settlement::compute(Decimal::ZERO, Decimal::ZERO);
        assert_eq!(settlement.status, PaymentStatus::FullyPaid);
    }

    #[test]
    fn status_follows_sign_of_outstanding() {
        let totals = [dec("0"), dec("0.01"), dec("99.99"), dec("500"), dec("12345.67")];
        let amounts = [dec("0"), dec("0.01"), dec("100"), dec("500"), dec("20000")];

        for total in totals {
            for amount in amounts {
                let settlement = Settlement::compute(total, amount);
                assert_eq!(settlement.outstanding_amount, total - amount);
                let expected = if amount >= total {
                    PaymentStatus::FullyPaid
                } else {
                    PaymentStatus::PartiallyPaid
                };
                assert_eq!(settlement.status, expected, "total={total} amount={amount}");
            }
        }
    }

    #[test]
    fn payment_date_has_microsecond_precision() {
        let payment = CreatePayment::new(1, dec("10"), 1);
        assert_eq!(payment.payment_date.timestamp_subsec_nanos() % 1_000, 0);
    }

    #[test]
    fn status_labels_match_stored_values() {
        assert_eq!(PaymentStatus::Pending.to_string(), "Pending");
        assert_eq!(PaymentStatus::PartiallyPaid.to_string(), "Partially Paid");
        assert_eq!(PaymentStatus::FullyPaid.to_string(), "Fully Paid");
    }
}
