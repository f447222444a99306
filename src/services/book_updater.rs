//! Book update: scalar fields, author set, and copy reconciliation in one
//! transaction.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};

use crate::context::RequestContext;
use crate::domain::CirculationError;
use crate::models::copy::CopyStatus;
use crate::models::{book, book_authors, copy};
use crate::repositories::copy_repository;
use crate::services::book_factory::link_authors;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct CopyPayload {
    /// Present for an existing copy to update in place; absent for a new one.
    pub id: Option<i32>,
    pub barcode: String,
    pub shelf_location: String,
}

/// Partial update. The isbn is immutable and deliberately has no field here.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct UpdateBookInput {
    pub title: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub published_year: Option<i32>,
    pub authors: Option<Vec<String>>,
    pub copies: Vec<CopyPayload>,
}

/// Update a book and reconcile its copy set against the incoming list.
///
/// Existing copies are read under an exclusive lock for the whole
/// reconciliation: matched ids update in place, entries without a match are
/// created, and copies missing from the list are deleted unless any of them
/// is out with a borrower or held for a reservation, which aborts the whole
/// operation. A concurrent borrow cannot slip between the check and the
/// delete.
pub async fn update_book_with_copies(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    book_id: i32,
    input: UpdateBookInput,
) -> Result<book::Model, CirculationError> {
    for payload in &input.copies {
        if payload.barcode.trim().is_empty() {
            return Err(CirculationError::Validation(
                "copy barcode is required".to_string(),
            ));
        }
    }

    let txn = db.begin().await?;
    let now = Utc::now();

    let existing_book = book::Entity::find_by_id(book_id)
        .one(&txn)
        .await?
        .ok_or(CirculationError::NotFound)?;

    let mut updating: book::ActiveModel = existing_book.into();
    if let Some(title) = input.title {
        updating.title = Set(title);
    }
    if let Some(category) = input.category {
        updating.category = Set(category);
    }
    if let Some(description) = input.description {
        updating.description = Set(description);
    }
    if let Some(published_year) = input.published_year {
        updating.published_year = Set(published_year);
    }
    updating.updated_at = Set(now);
    let updated_book = updating.update(&txn).await?;

    if let Some(names) = &input.authors {
        book_authors::Entity::delete_many()
            .filter(book_authors::Column::BookId.eq(book_id))
            .exec(&txn)
            .await?;
        link_authors(&txn, book_id, names).await?;
    }

    let existing_copies: HashMap<i32, copy::Model> =
        copy_repository::find_for_book_locked(&txn, book_id)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

    let mut matched_ids: Vec<i32> = Vec::new();

    for payload in input.copies {
        match payload.id.and_then(|id| existing_copies.get(&id)) {
            Some(matched) => {
                matched_ids.push(matched.id);
                let mut updating_copy: copy::ActiveModel = matched.clone().into();
                updating_copy.barcode = Set(payload.barcode);
                updating_copy.shelf_location = Set(payload.shelf_location);
                updating_copy.updated_at = Set(now);
                updating_copy.update(&txn).await?;
            }
            None => {
                let new_copy = copy::ActiveModel {
                    book_id: Set(book_id),
                    barcode: Set(payload.barcode),
                    status: Set(CopyStatus::Available),
                    shelf_location: Set(payload.shelf_location),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                };
                new_copy.insert(&txn).await?;
            }
        }
    }

    let to_delete: Vec<&copy::Model> = existing_copies
        .values()
        .filter(|c| !matched_ids.contains(&c.id))
        .collect();

    let protected = to_delete
        .iter()
        .any(|c| matches!(c.status, CopyStatus::Borrowed | CopyStatus::Reserved));

    if protected {
        tracing::warn!(
            request_id = %ctx.request_id,
            book_id,
            reason = "Cannot delete borrowed or reserved copies",
            "update book rejected"
        );
        return Err(CirculationError::Rejected(
            "Cannot delete borrowed or reserved copies".to_string(),
        ));
    }

    if !to_delete.is_empty() {
        let delete_ids: Vec<i32> = to_delete.iter().map(|c| c.id).collect();
        copy::Entity::delete_many()
            .filter(copy::Column::Id.is_in(delete_ids))
            .exec(&txn)
            .await?;
    }

    txn.commit().await?;

    tracing::info!(
        request_id = %ctx.request_id,
        book_id,
        "update book succeeded"
    );

    Ok(updated_book)
}
