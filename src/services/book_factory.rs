//! Book creation: book, authors and physical copies in one transaction.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};

use crate::context::RequestContext;
use crate::domain::CirculationError;
use crate::models::copy::CopyStatus;
use crate::models::{author, book, book_authors, copy};

#[derive(Debug, Clone, serde::Deserialize)]
pub struct NewCopy {
    pub barcode: String,
    pub shelf_location: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct CreateBookInput {
    pub title: String,
    pub isbn: String,
    pub category: String,
    pub description: String,
    pub published_year: i32,
    pub authors: Vec<String>,
    pub copies: Vec<NewCopy>,
}

pub async fn create_book_with_copies(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    input: CreateBookInput,
) -> Result<book::Model, CirculationError> {
    // Structural validation happens before any transaction is opened.
    if input.title.trim().is_empty() {
        return Err(CirculationError::Validation("title is required".to_string()));
    }
    if input.isbn.trim().is_empty() {
        return Err(CirculationError::Validation("isbn is required".to_string()));
    }
    for new_copy in &input.copies {
        if new_copy.barcode.trim().is_empty() {
            return Err(CirculationError::Validation(
                "copy barcode is required".to_string(),
            ));
        }
    }

    let txn = db.begin().await?;
    let now = Utc::now();

    let new_book = book::ActiveModel {
        title: Set(input.title.clone()),
        isbn: Set(input.isbn.clone()),
        category: Set(input.category.clone()),
        description: Set(input.description.clone()),
        published_year: Set(input.published_year),
        is_deleted: Set(false),
        deleted_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let saved_book = match new_book.insert(&txn).await {
        Ok(saved) => saved,
        Err(e) if CirculationError::is_unique_violation(&e) => {
            tracing::warn!(
                request_id = %ctx.request_id,
                isbn = %input.isbn,
                reason = "A book with this ISBN already exists",
                "create book rejected"
            );
            return Err(CirculationError::Rejected(
                "A book with this ISBN already exists".to_string(),
            ));
        }
        Err(e) => {
            tracing::error!(request_id = %ctx.request_id, error = %e, "create book failed");
            return Err(e.into());
        }
    };

    link_authors(&txn, saved_book.id, &input.authors).await?;

    if !input.copies.is_empty() {
        let copy_models = input.copies.iter().map(|new_copy| copy::ActiveModel {
            book_id: Set(saved_book.id),
            barcode: Set(new_copy.barcode.clone()),
            status: Set(CopyStatus::Available),
            shelf_location: Set(new_copy.shelf_location.clone()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        });

        if let Err(e) = copy::Entity::insert_many(copy_models).exec(&txn).await {
            if CirculationError::is_unique_violation(&e) {
                tracing::warn!(
                    request_id = %ctx.request_id,
                    book_id = saved_book.id,
                    reason = "A copy with this barcode already exists",
                    "create book rejected"
                );
                return Err(CirculationError::Rejected(
                    "A copy with this barcode already exists".to_string(),
                ));
            }
            tracing::error!(request_id = %ctx.request_id, error = %e, "create book failed");
            return Err(e.into());
        }
    }

    txn.commit().await?;

    tracing::info!(
        request_id = %ctx.request_id,
        book_id = saved_book.id,
        copies = input.copies.len(),
        "create book succeeded"
    );

    Ok(saved_book)
}

/// Resolve each author name to a row (exact-match get-or-create) and attach
/// it to the book. Shared with the update path.
pub(crate) async fn link_authors<C: ConnectionTrait>(
    conn: &C,
    book_id: i32,
    names: &[String],
) -> Result<(), CirculationError> {
    let now = Utc::now();
    let mut linked_ids: Vec<i32> = Vec::with_capacity(names.len());

    for name in names {
        let existing = author::Entity::find()
            .filter(author::Column::Name.eq(name.as_str()))
            .one(conn)
            .await?;

        let resolved = match existing {
            Some(found) => found,
            None => {
                let new_author = author::ActiveModel {
                    name: Set(name.clone()),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                };
                new_author.insert(conn).await?
            }
        };

        // A name listed twice resolves to the same row; link it once.
        if linked_ids.contains(&resolved.id) {
            continue;
        }
        linked_ids.push(resolved.id);

        let link = book_authors::ActiveModel {
            book_id: Set(book_id),
            author_id: Set(resolved.id),
        };
        link.insert(conn).await?;
    }

    Ok(())
}
