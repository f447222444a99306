//! Availability listing: read-only, no transaction or locking concerns.

use std::str::FromStr;

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter, QueryOrder};
use serde::Serialize;

use crate::domain::CirculationError;
use crate::models::{author, book};
use crate::repositories::copy_repository;

/// Allow-listed ordering fields; anything else is a validation error at
/// parse time, so callers can pass query-string input straight through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderBy {
    #[default]
    Title,
    PublishedYear,
}

impl FromStr for OrderBy {
    type Err = CirculationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(OrderBy::Title),
            "published_year" => Ok(OrderBy::PublishedYear),
            other => Err(CirculationError::Validation(format!(
                "Unsupported ordering field: {}",
                other
            ))),
        }
    }
}

/// Filter parameters for the availability listing
#[derive(Debug, Default, Clone)]
pub struct AvailableBookFilter {
    pub title: Option<String>,
    pub author: Option<String>,
    pub order_by: OrderBy,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvailableBook {
    pub id: i32,
    pub title: String,
    pub authors: Vec<String>,
    pub category: String,
    pub published_year: i32,
    pub available_copies: u64,
}

/// Paginated result with total count
#[derive(Debug)]
pub struct PaginatedAvailableBooks {
    pub books: Vec<AvailableBook>,
    pub total: u64,
}

/// Books that are not soft-deleted and have at least one AVAILABLE copy,
/// with a per-book available-copy count. Title and author filters are
/// case-insensitive substring matches.
pub async fn list_available_books(
    db: &DatabaseConnection,
    filter: AvailableBookFilter,
) -> Result<PaginatedAvailableBooks, CirculationError> {
    let mut query = book::Entity::find().filter(book::Column::IsDeleted.eq(false));

    query = match filter.order_by {
        OrderBy::Title => query.order_by_asc(book::Column::Title),
        OrderBy::PublishedYear => query.order_by_asc(book::Column::PublishedYear),
    };

    let candidates = query.all(db).await?;

    let title_needle = filter
        .title
        .as_deref()
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase);
    let author_needle = filter
        .author
        .as_deref()
        .filter(|a| !a.is_empty())
        .map(str::to_lowercase);

    let mut rows = Vec::new();

    for candidate in candidates {
        if let Some(needle) = &title_needle
            && !candidate.title.to_lowercase().contains(needle)
        {
            continue;
        }

        let authors: Vec<String> = candidate
            .find_related(author::Entity)
            .all(db)
            .await?
            .into_iter()
            .map(|a| a.name)
            .collect();

        if let Some(needle) = &author_needle
            && !authors.iter().any(|n| n.to_lowercase().contains(needle))
        {
            continue;
        }

        let available_copies = copy_repository::count_available_for_book(db, candidate.id).await?;
        if available_copies == 0 {
            continue;
        }

        rows.push(AvailableBook {
            id: candidate.id,
            title: candidate.title,
            authors,
            category: candidate.category,
            published_year: candidate.published_year,
            available_copies,
        });
    }

    let total = rows.len() as u64;

    if let Some(limit) = filter.limit {
        let page = filter.page.unwrap_or(0);
        rows = rows
            .into_iter()
            .skip((page * limit) as usize)
            .take(limit as usize)
            .collect();
    }

    Ok(PaginatedAvailableBooks { books: rows, total })
}
