//! Database service for billing-portal.

use crate::models::{
    BillAdjustment, BillDetails, BillSnapshot, ComputedCharges, ConnectionInfo, CreateAdjustment,
    CreatePayment, CurrentBill, CustomerInfo, FixedChargeLine, PaymentReceipt, PaymentStatus,
    PreviousBillRow, RetrieveBill, Settlement, SubsidyLine, TariffLine, TaxRate,
    PREVIOUS_BILLS_LIMIT,
};
use crate::services::metrics::DB_QUERY_DURATION;
use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "billing-portal"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check out one connection for the caller's exclusive use.
    ///
    /// It goes back to the pool when dropped, on success and error paths alike.
    pub async fn connection(&self) -> Result<PoolConnection<Postgres>, AppError> {
        self.pool.acquire().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to acquire connection: {}", e))
        })
    }

    /// Start a transaction. Dropping it without `commit` rolls it back.
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>, AppError> {
        self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["health_check"])
            .start_timer();

        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;

        timer.observe_duration();
        Ok(())
    }

    // =========================================================================
    // Payments
    // =========================================================================

    /// Record a payment and settle the bill's status in one transaction.
    ///
    /// The row is inserted as `Pending`, then updated to its final status by
    /// the `PaymentID` the insert returned.
    #[instrument(skip(self, input), fields(bill_id = input.bill_id, payment_method_id = input.payment_method_id))]
    pub async fn record_payment(&self, input: &CreatePayment) -> Result<PaymentReceipt, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["record_payment"])
            .start_timer();

        let mut tx = self.begin().await?;

        let payment_id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO PaymentDetails (BillID, PaymentDate, PaymentMethodID, AmountPaid, PaymentStatus)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING PaymentID
            "#,
        )
        .bind(input.bill_id)
        .bind(input.payment_date)
        .bind(input.payment_method_id)
        .bind(input.amount)
        .bind(PaymentStatus::Pending.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                let names_method = db_err
                    .constraint()
                    .is_some_and(|c| c.to_ascii_lowercase().contains("paymentmethod"));
                if names_method {
                    AppError::NotFound(anyhow::anyhow!("Payment method not found."))
                } else {
                    AppError::NotFound(anyhow::anyhow!("Bill not found."))
                }
            }
            other => AppError::DatabaseError(anyhow::anyhow!("Failed to insert payment: {}", other)),
        })?;

        let payment_method_description = sqlx::query_scalar::<_, String>(
            r#"
            SELECT PaymentMethodDescription
            FROM PaymentMethods
            WHERE PaymentMethodID = $1
            "#,
        )
        .bind(input.payment_method_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get payment method: {}", e))
        })?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Payment method not found.")))?;

        let total_after_due_date = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT TotalAmount_AfterDueDate
            FROM Bill
            WHERE BillID = $1
            "#,
        )
        .bind(input.bill_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get bill total: {}", e)))?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Bill not found.")))?;

        let settlement = Settlement::compute(total_after_due_date, input.amount);

        let updated = sqlx::query(
            r#"
            UPDATE PaymentDetails
            SET PaymentStatus = $1
            WHERE PaymentID = $2
            "#,
        )
        .bind(settlement.status.as_str())
        .bind(payment_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to update payment status: {}", e))
        })?
        .rows_affected();

        if updated == 0 {
            // Dropping `tx` rolls back the pending insert.
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "Payment {} for bill {} vanished before status update",
                payment_id,
                input.bill_id
            )));
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit payment: {}", e))
        })?;

        timer.observe_duration();
        info!(
            payment_id = payment_id,
            status = %settlement.status,
            outstanding_amount = %settlement.outstanding_amount,
            "Payment recorded"
        );

        Ok(PaymentReceipt {
            bill_id: input.bill_id,
            amount: input.amount,
            payment_method_id: input.payment_method_id,
            payment_method_description,
            payment_date: input.payment_date,
            payment_status: settlement.status,
            outstanding_amount: settlement.outstanding_amount,
        })
    }

    // =========================================================================
    // Bill Retrieval
    // =========================================================================

    /// Gather everything shown on the bill details page.
    ///
    /// Reads only, so no transaction; all statements share one pooled
    /// connection. Missing connection, customer or bill rows short-circuit
    /// before any stored function runs.
    #[instrument(skip(self, input), fields(connection_id = %input.connection_id, month = input.month, year = input.year))]
    pub async fn fetch_bill_details(&self, input: &RetrieveBill) -> Result<BillDetails, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["fetch_bill_details"])
            .start_timer();

        let mut conn = self.connection().await?;

        let connection = sqlx::query_as::<_, ConnectionInfo>(
            r#"
            SELECT C.CustomerID AS customer_id,
                   D.DivisionName AS division_name, D.SubDivName AS sub_div_name,
                   C.InstallationDate AS installation_date, C.MeterType AS meter_type
            FROM DivInfo D
            JOIN Connections C ON C.DivisionID = D.DivisionID AND C.SubDivID = D.SubDivID
            WHERE C.ConnectionID = $1
            "#,
        )
        .bind(&input.connection_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get connection details: {}", e))
        })?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Connection not found.")))?;

        let customer = sqlx::query_as::<_, CustomerInfo>(
            r#"
            SELECT FirstName AS first_name, LastName AS last_name, Address AS address,
                   PhoneNumber AS phone_number, Email AS email, CustomerType AS customer_type
            FROM Customers
            WHERE CustomerID = $1
            "#,
        )
        .bind(&input.customer_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get customer details: {}", e))
        })?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Customer not found.")))?;

        // A connection is only visible to the customer who holds it.
        if connection.customer_id != input.customer_id {
            warn!(
                customer_id = %input.customer_id,
                "Connection belongs to a different customer"
            );
            return Err(AppError::NotFound(anyhow::anyhow!("Connection not found.")));
        }

        let bill = sqlx::query_as::<_, CurrentBill>(
            r#"
            SELECT BillID AS bill_id, BillIssueDate AS bill_issue_date, DueDate AS due_date,
                   TotalAmount_BeforeDueDate AS total_before_due_date,
                   TotalAmount_AfterDueDate AS total_after_due_date
            FROM Bill
            WHERE ConnectionID = $1 AND BillingMonth = $2 AND BillingYear = $3
            ORDER BY BillIssueDate DESC
            LIMIT 1
            "#,
        )
        .bind(&input.connection_id)
        .bind(input.month)
        .bind(input.year)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get bill: {}", e)))?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Bill not found.")))?;

        let tariffs = sqlx::query_as::<_, TariffLine>(
            r#"
            SELECT T.TarrifDescription AS name, T.MinUnit AS units,
                   T.RatePerUnit AS rate, T.MinAmount AS amount
            FROM Tariff T
            JOIN Connections C ON T.ConnectionTypeCode = C.ConnectionTypeCode
            WHERE C.ConnectionID = $1
            ORDER BY T.MinUnit
            "#,
        )
        .bind(&input.connection_id)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list tariffs: {}", e)))?;

        let tax_rates = sqlx::query_as::<_, TaxRate>(
            r#"
            SELECT T.TaxType AS tax_type, T.Rate AS rate
            FROM TaxRates T
            JOIN Connections C ON T.ConnectionTypeCode = C.ConnectionTypeCode
            WHERE C.ConnectionID = $1
            "#,
        )
        .bind(&input.connection_id)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list taxes: {}", e)))?;

        let subsidies = sqlx::query_as::<_, SubsidyLine>(
            r#"
            SELECT S.SubsidyCode AS name, P.ProviderName AS provider_name,
                   S.RatePerUnit AS rate_per_unit
            FROM Subsidy S
            JOIN SubsidyProvider P ON S.ProviderID = P.ProviderID
            JOIN Connections C ON S.ConnectionTypeCode = C.ConnectionTypeCode
            WHERE C.ConnectionID = $1
            "#,
        )
        .bind(&input.connection_id)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list subsidies: {}", e)))?;

        let fixed_charges = sqlx::query_as::<_, FixedChargeLine>(
            r#"
            SELECT F.FixedChargeType AS name, F.FixedFee AS amount
            FROM FixedCharges F
            JOIN Connections C ON F.ConnectionTypeCode = C.ConnectionTypeCode
            WHERE C.ConnectionID = $1
            "#,
        )
        .bind(&input.connection_id)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list fixed charges: {}", e))
        })?;

        let previous_bills = sqlx::query_as::<_, PreviousBillRow>(
            r#"
            SELECT B.BillingMonth AS billing_month, B.BillingYear AS billing_year,
                   B.TotalAmount_BeforeDueDate AS amount, B.DueDate AS due_date,
                   COALESCE(P.PaymentStatus, 'Unpaid') AS status
            FROM Bill B
            LEFT JOIN LATERAL (
                SELECT PD.PaymentStatus
                FROM PaymentDetails PD
                WHERE PD.BillID = B.BillID
                ORDER BY PD.PaymentDate DESC
                LIMIT 1
            ) P ON TRUE
            WHERE B.ConnectionID = $1 AND B.BillID <> $2 AND B.BillIssueDate < $3
            ORDER BY B.BillIssueDate DESC
            LIMIT $4
            "#,
        )
        .bind(&input.connection_id)
        .bind(bill.bill_id)
        .bind(bill.bill_issue_date)
        .bind(PREVIOUS_BILLS_LIMIT)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list previous bills: {}", e))
        })?;

        let charges = compute_charges(&mut conn, input, &bill).await?;

        timer.observe_duration();
        info!(bill_id = bill.bill_id, "Bill details retrieved");

        Ok(BillDetails::from_snapshot(
            input.clone(),
            BillSnapshot {
                connection,
                customer,
                bill,
                tariffs,
                tax_rates,
                subsidies,
                fixed_charges,
                previous_bills,
                charges,
            },
        ))
    }

    // =========================================================================
    // Adjustments
    // =========================================================================

    /// Insert one `BillAdjustments` row under a freshly generated identifier.
    #[instrument(skip(self, input), fields(bill_id = input.bill_id))]
    pub async fn record_adjustment(
        &self,
        input: CreateAdjustment,
    ) -> Result<BillAdjustment, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["record_adjustment"])
            .start_timer();

        let adjustment = BillAdjustment::new(input);
        let mut tx = self.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO BillAdjustments
                (AdjustmentID, BillID, AdjustmentAmount, AdjustmentReason, AdjustmentDate,
                 OfficerName, OfficerDesignation, OriginalBillAmount)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(adjustment.adjustment_id)
        .bind(adjustment.bill_id)
        .bind(adjustment.adjustment_amount)
        .bind(&adjustment.adjustment_reason)
        .bind(adjustment.adjustment_date)
        .bind(&adjustment.officer_name)
        .bind(&adjustment.officer_designation)
        .bind(adjustment.original_bill_amount)
        .execute(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                AppError::NotFound(anyhow::anyhow!("Bill not found."))
            }
            other => AppError::DatabaseError(anyhow::anyhow!(
                "Failed to insert adjustment: {}",
                other
            )),
        })?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit adjustment: {}", e))
        })?;

        timer.observe_duration();
        info!(adjustment_id = %adjustment.adjustment_id, "Adjustment recorded");

        Ok(adjustment)
    }
}

/// Call the `fun_compute_*` stored functions for the current bill.
async fn compute_charges(
    conn: &mut PgConnection,
    input: &RetrieveBill,
    bill: &CurrentBill,
) -> Result<ComputedCharges, AppError> {
    let import_peak_units = unit_function(conn, "fun_compute_ImportPeakUnits", input).await?;
    let import_off_peak_units = unit_function(conn, "fun_compute_ImportOffPeakUnits", input).await?;
    let export_off_peak_units = unit_function(conn, "fun_compute_ExportOffPeakUnits", input).await?;

    let peak_amount = dated_function(conn, "fun_compute_PeakAmount", input, bill).await?;
    let off_peak_amount = dated_function(conn, "fun_compute_OffPeakAmount", input, bill).await?;
    let arrears = dated_function(conn, "fun_compute_Arrears", input, bill).await?;
    let fixed_fee = dated_function(conn, "fun_compute_FixedFee", input, bill).await?;

    let tax_amount = numeric_result(
        "fun_compute_TaxAmount",
        sqlx::query_scalar::<_, Option<Decimal>>(
            "SELECT fun_compute_TaxAmount($1, $2, $3, $4, $5, $6)",
        )
        .bind(&input.connection_id)
        .bind(input.month)
        .bind(input.year)
        .bind(bill.bill_issue_date)
        .bind(peak_amount)
        .bind(off_peak_amount)
        .fetch_one(&mut *conn)
        .await,
    )?;

    Ok(ComputedCharges {
        import_peak_units,
        import_off_peak_units,
        export_off_peak_units,
        peak_amount,
        off_peak_amount,
        arrears,
        fixed_fee,
        tax_amount,
    })
}

/// `function(connection_id, month, year)`
async fn unit_function(
    conn: &mut PgConnection,
    function: &'static str,
    input: &RetrieveBill,
) -> Result<Decimal, AppError> {
    let sql = format!("SELECT {}($1, $2, $3)", function);
    numeric_result(
        function,
        sqlx::query_scalar::<_, Option<Decimal>>(&sql)
            .bind(&input.connection_id)
            .bind(input.month)
            .bind(input.year)
            .fetch_one(&mut *conn)
            .await,
    )
}

/// `function(connection_id, month, year, issue_date)`
async fn dated_function(
    conn: &mut PgConnection,
    function: &'static str,
    input: &RetrieveBill,
    bill: &CurrentBill,
) -> Result<Decimal, AppError> {
    let sql = format!("SELECT {}($1, $2, $3, $4)", function);
    numeric_result(
        function,
        sqlx::query_scalar::<_, Option<Decimal>>(&sql)
            .bind(&input.connection_id)
            .bind(input.month)
            .bind(input.year)
            .bind(bill.bill_issue_date)
            .fetch_one(&mut *conn)
            .await,
    )
}

/// A `NULL` from a stored function counts as zero.
fn numeric_result(
    function: &str,
    result: Result<Option<Decimal>, sqlx::Error>,
) -> Result<Decimal, AppError> {
    match result {
        Ok(Some(value)) => Ok(value),
        Ok(None) => {
            warn!(function = function, "Stored function returned NULL, using zero");
            Ok(Decimal::ZERO)
        }
        Err(e) => Err(AppError::DatabaseError(anyhow::anyhow!(
            "Stored function {} failed: {}",
            function,
            e
        ))),
    }
}
