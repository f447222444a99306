//! Borrow operation: one atomic transaction from rule checks to loan
//! creation.

use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};

use crate::config::CirculationConfig;
use crate::context::RequestContext;
use crate::domain::CirculationError;
use crate::models::copy::CopyStatus;
use crate::models::loan::LoanStatus;
use crate::models::reservation::ReservationStatus;
use crate::models::{book, copy, loan, member, reservation};
use crate::repositories::{copy_repository, reservation_repository};
use crate::services::specifications;

/// Borrow one copy of a book for a member.
///
/// Gates run in a fixed order, each a veto: member standing, unpaid fines,
/// borrow limit, reservation priority, then copy selection under an
/// exclusive row lock. Any failure rolls the whole transaction back; no
/// observer ever sees a partially applied borrow.
pub async fn borrow_book(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    config: &CirculationConfig,
    member_id: i32,
    book_id: i32,
) -> Result<loan::Model, CirculationError> {
    let txn = db.begin().await?;

    let member = member::Entity::find_by_id(member_id)
        .one(&txn)
        .await?
        .ok_or(CirculationError::NotFound)?;

    // Soft-deleted books are invisible to member-facing operations.
    let book = book::Entity::find_by_id(book_id)
        .filter(book::Column::IsDeleted.eq(false))
        .one(&txn)
        .await?
        .ok_or(CirculationError::NotFound)?;

    for gate in specifications::borrow_gates() {
        if !gate.is_satisfied_by(&txn, &member, &book).await? {
            let reason = gate.error_message();
            tracing::warn!(
                request_id = %ctx.request_id,
                member_id,
                book_id,
                reason,
                "borrow rejected"
            );
            return Err(CirculationError::Rejected(reason.to_string()));
        }
    }

    let selected = match copy_repository::find_available_for_book(&txn, book.id).await? {
        Some(found) => found,
        // A copy held back as RESERVED on return can only leave that state
        // through the head of the queue borrowing it. The FIFO gate already
        // ran, so reaching this point with an own reservation at the head
        // entitles the member to the held copy.
        None => {
            let held = match reservation_repository::first_unfulfilled_for_book(&txn, book.id)
                .await?
            {
                Some(head) if head.member_id == member.id => {
                    copy_repository::find_reserved_for_book(&txn, book.id).await?
                }
                _ => None,
            };

            let Some(found) = held else {
                tracing::warn!(
                    request_id = %ctx.request_id,
                    member_id,
                    book_id,
                    reason = "No available copies",
                    "borrow rejected"
                );
                return Err(CirculationError::Rejected("No available copies".to_string()));
            };
            found
        }
    };

    let now = Utc::now();

    let new_loan = loan::ActiveModel {
        member_id: Set(member.id),
        copy_id: Set(selected.id),
        borrowed_at: Set(now),
        due_at: Set(now + Duration::days(config.loan_period_days)),
        returned_at: Set(None),
        status: Set(LoanStatus::Active),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let saved_loan = match new_loan.insert(&txn).await {
        Ok(saved) => saved,
        // Lost the race on the one-active-loan-per-copy index: another
        // transaction claimed this copy between our lock wait and commit.
        Err(e) if CirculationError::is_unique_violation(&e) => {
            tracing::warn!(
                request_id = %ctx.request_id,
                member_id,
                book_id,
                copy_id = selected.id,
                reason = "No available copies",
                "borrow rejected"
            );
            return Err(CirculationError::Rejected("No available copies".to_string()));
        }
        Err(e) => {
            tracing::error!(
                request_id = %ctx.request_id,
                member_id,
                book_id,
                error = %e,
                "borrow failed"
            );
            return Err(e.into());
        }
    };

    let mut copy_active: copy::ActiveModel = selected.into();
    copy_active.status = Set(CopyStatus::Borrowed);
    copy_active.updated_at = Set(now);
    copy_active.update(&txn).await?;

    // The FIFO gate above guarantees any queue head at this point is the
    // borrower's own reservation; fulfilling it is part of the same
    // transaction as the loan.
    if let Some(head) = reservation_repository::first_unfulfilled_for_book(&txn, book.id).await?
        && head.member_id == member.id
    {
        let mut fulfilled: reservation::ActiveModel = head.into();
        fulfilled.status = Set(ReservationStatus::Fulfilled);
        fulfilled.fulfilled = Set(true);
        fulfilled.updated_at = Set(now);
        fulfilled.update(&txn).await?;
    }

    txn.commit().await?;

    tracing::info!(
        request_id = %ctx.request_id,
        member_id,
        book_id,
        loan_id = saved_loan.id,
        due_at = %saved_loan.due_at,
        "borrow succeeded"
    );

    Ok(saved_loan)
}
