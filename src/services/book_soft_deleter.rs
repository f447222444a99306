//! Soft delete: a one-way flag, guarded against copies still in circulation.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set, TransactionTrait};

use crate::context::RequestContext;
use crate::domain::CirculationError;
use crate::models::book;
use crate::models::copy::CopyStatus;
use crate::repositories::copy_repository;

/// Soft-delete a book. The active-copy guard and the flag write are one
/// atomic unit: copies are read under an exclusive lock, so a borrow or
/// reservation committed concurrently cannot slip past the check.
pub async fn soft_delete_book(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    book_id: i32,
) -> Result<(), CirculationError> {
    let txn = db.begin().await?;

    let existing = book::Entity::find_by_id(book_id)
        .one(&txn)
        .await?
        .ok_or(CirculationError::NotFound)?;

    if existing.is_deleted {
        tracing::warn!(
            request_id = %ctx.request_id,
            book_id,
            reason = "Book is already deleted",
            "soft delete rejected"
        );
        return Err(CirculationError::Rejected("Book is already deleted".to_string()));
    }

    let copies = copy_repository::find_for_book_locked(&txn, book_id).await?;
    let in_circulation = copies
        .iter()
        .any(|c| matches!(c.status, CopyStatus::Borrowed | CopyStatus::Reserved));

    if in_circulation {
        tracing::warn!(
            request_id = %ctx.request_id,
            book_id,
            reason = "Cannot delete a book with borrowed or reserved copies",
            "soft delete rejected"
        );
        return Err(CirculationError::Rejected(
            "Cannot delete a book with borrowed or reserved copies".to_string(),
        ));
    }

    let now = Utc::now();
    let mut deleting: book::ActiveModel = existing.into();
    deleting.is_deleted = Set(true);
    deleting.deleted_at = Set(Some(now));
    deleting.updated_at = Set(now);
    deleting.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        request_id = %ctx.request_id,
        book_id,
        "soft delete succeeded"
    );

    Ok(())
}
