//! Return operation: close a loan, assess the fine, release the copy.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set, TransactionTrait};

use crate::config::CirculationConfig;
use crate::context::RequestContext;
use crate::domain::CirculationError;
use crate::models::copy::CopyStatus;
use crate::models::loan::LoanStatus;
use crate::models::{copy, fine, loan};
use crate::repositories::reservation_repository;

/// Fine for a loan returned at `returned_at`: whole days late (truncated,
/// never rounded up) times the daily rate. Zero when on time, including a
/// return that is only hours past due.
pub fn calculate_fine(
    due_at: DateTime<Utc>,
    returned_at: DateTime<Utc>,
    daily_rate: f64,
) -> f64 {
    if returned_at <= due_at {
        return 0.0;
    }

    let days_late = (returned_at - due_at).num_days();
    days_late as f64 * daily_rate
}

/// Return a loan. Only an ACTIVE loan may be returned; anything else is an
/// error, never a no-op. Returns the fine amount (0 when on time).
pub async fn return_book(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    config: &CirculationConfig,
    loan_id: i32,
) -> Result<f64, CirculationError> {
    let txn = db.begin().await?;

    let open_loan = loan::Entity::find_by_id(loan_id)
        .one(&txn)
        .await?
        .ok_or(CirculationError::NotFound)?;

    if open_loan.status != LoanStatus::Active {
        tracing::warn!(
            request_id = %ctx.request_id,
            loan_id,
            status = ?open_loan.status,
            reason = "Loan already closed",
            "return rejected"
        );
        return Err(CirculationError::Rejected("Loan already closed".to_string()));
    }

    let now = Utc::now();
    let fine_amount = calculate_fine(open_loan.due_at, now, config.daily_fine_rate);

    let copy_id = open_loan.copy_id;
    let member_id = open_loan.member_id;

    let mut closing: loan::ActiveModel = open_loan.into();
    closing.returned_at = Set(Some(now));
    closing.status = Set(if fine_amount > 0.0 {
        LoanStatus::Overdue
    } else {
        LoanStatus::Returned
    });
    closing.updated_at = Set(now);
    closing.update(&txn).await?;

    if fine_amount > 0.0 {
        let new_fine = fine::ActiveModel {
            loan_id: Set(loan_id),
            amount: Set(fine_amount),
            currency: Set("EUR".to_string()),
            is_paid: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        new_fine.insert(&txn).await?;
    }

    // Resolve the copy's next state: held for the reservation queue when one
    // is waiting, back on the open shelf otherwise.
    let returned_copy = copy::Entity::find_by_id(copy_id)
        .one(&txn)
        .await?
        .ok_or(CirculationError::NotFound)?;

    let has_reservations =
        reservation_repository::book_has_unfulfilled(&txn, returned_copy.book_id).await?;

    let mut copy_active: copy::ActiveModel = returned_copy.into();
    copy_active.status = Set(if has_reservations {
        CopyStatus::Reserved
    } else {
        CopyStatus::Available
    });
    copy_active.updated_at = Set(now);
    copy_active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        request_id = %ctx.request_id,
        loan_id,
        member_id,
        copy_id,
        fine = fine_amount,
        "return succeeded"
    );

    Ok(fine_amount)
}
