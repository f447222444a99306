//! Reserve and cancel-reservation operations.
//!
//! Reservations are a weak claim on a book (not a specific copy): they only
//! exist to queue for a book with no available copy, and they convert into a
//! loan through the borrow path, never directly.

use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};

use crate::config::CirculationConfig;
use crate::context::RequestContext;
use crate::domain::CirculationError;
use crate::models::reservation::ReservationStatus;
use crate::models::{book, member, reservation};
use crate::repositories::{copy_repository, loan_repository, reservation_repository};

pub async fn reserve_book(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    config: &CirculationConfig,
    member_id: i32,
    book_id: i32,
) -> Result<reservation::Model, CirculationError> {
    let txn = db.begin().await?;

    let member = member::Entity::find_by_id(member_id)
        .one(&txn)
        .await?
        .ok_or(CirculationError::NotFound)?;

    let book = book::Entity::find_by_id(book_id)
        .filter(book::Column::IsDeleted.eq(false))
        .one(&txn)
        .await?
        .ok_or(CirculationError::NotFound)?;

    if loan_repository::member_has_open_loan_for_book(&txn, member.id, book.id).await? {
        return Err(reject(ctx, member.id, book.id, "You already borrowed this book"));
    }

    if reservation_repository::member_has_active_for_book(&txn, member.id, book.id).await? {
        return Err(reject(ctx, member.id, book.id, "You already reserved this book"));
    }

    if copy_repository::book_has_available_copy(&txn, book.id).await? {
        return Err(reject(
            ctx,
            member.id,
            book.id,
            "Book is available, reservation not allowed",
        ));
    }

    let now = Utc::now();

    let new_reservation = reservation::ActiveModel {
        member_id: Set(member.id),
        book_id: Set(book.id),
        status: Set(ReservationStatus::Active),
        reserved_at: Set(now),
        expires_at: Set(now + Duration::days(config.reservation_expiry_days)),
        fulfilled: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let saved = match new_reservation.insert(&txn).await {
        Ok(saved) => saved,
        // The pre-check and a concurrent reserve can both pass before either
        // commits; the partial unique index closes the window and the loser
        // gets the same rejection as the pre-check.
        Err(e) if CirculationError::is_unique_violation(&e) => {
            return Err(reject(ctx, member.id, book.id, "You already reserved this book"));
        }
        Err(e) => {
            tracing::error!(
                request_id = %ctx.request_id,
                member_id,
                book_id,
                error = %e,
                "reserve failed"
            );
            return Err(e.into());
        }
    };

    txn.commit().await?;

    tracing::info!(
        request_id = %ctx.request_id,
        member_id,
        book_id,
        reservation_id = saved.id,
        expires_at = %saved.expires_at,
        "reserve succeeded"
    );

    Ok(saved)
}

/// Cancel an ACTIVE reservation. Terminal states (fulfilled, cancelled,
/// expired) are rejected by name, so a second cancel always fails.
pub async fn cancel_reservation(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    reservation_id: i32,
) -> Result<(), CirculationError> {
    let txn = db.begin().await?;

    let found = reservation::Entity::find_by_id(reservation_id)
        .one(&txn)
        .await?
        .ok_or(CirculationError::NotFound)?;

    if found.status != ReservationStatus::Active {
        let reason = format!("Cannot cancel a {} reservation", found.status.as_lowercase());
        tracing::warn!(
            request_id = %ctx.request_id,
            reservation_id,
            reason = %reason,
            "cancel rejected"
        );
        return Err(CirculationError::Rejected(reason));
    }

    let member_id = found.member_id;
    let book_id = found.book_id;

    let now = Utc::now();
    let mut cancelling: reservation::ActiveModel = found.into();
    cancelling.status = Set(ReservationStatus::Cancelled);
    cancelling.updated_at = Set(now);
    cancelling.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        request_id = %ctx.request_id,
        reservation_id,
        member_id,
        book_id,
        "cancel succeeded"
    );

    Ok(())
}

fn reject(
    ctx: &RequestContext,
    member_id: i32,
    book_id: i32,
    reason: &str,
) -> CirculationError {
    tracing::warn!(
        request_id = %ctx.request_id,
        member_id,
        book_id,
        reason,
        "reserve rejected"
    );
    CirculationError::Rejected(reason.to_string())
}
