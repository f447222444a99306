use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect,
};

use crate::domain::CirculationError;
use crate::models::copy::{self, CopyStatus, Entity as Copy};

/// Select one AVAILABLE copy of a book under an exclusive row lock.
///
/// The lock is taken with the read so two concurrent borrow transactions
/// cannot both observe the same copy as available; the second blocks until
/// the first commits or aborts, then re-evaluates.
pub async fn find_available_for_book<C: ConnectionTrait>(
    conn: &C,
    book_id: i32,
) -> Result<Option<copy::Model>, CirculationError> {
    let found = Copy::find()
        .filter(copy::Column::BookId.eq(book_id))
        .filter(copy::Column::Status.eq(CopyStatus::Available))
        .lock_exclusive()
        .one(conn)
        .await?;

    Ok(found)
}

/// All copies of a book, exclusively locked for the current transaction.
pub async fn find_for_book_locked<C: ConnectionTrait>(
    conn: &C,
    book_id: i32,
) -> Result<Vec<copy::Model>, CirculationError> {
    let copies = Copy::find()
        .filter(copy::Column::BookId.eq(book_id))
        .lock_exclusive()
        .all(conn)
        .await?;

    Ok(copies)
}

/// Select one RESERVED copy of a book under an exclusive row lock. Only the
/// head of the reservation queue is ever offered one of these.
pub async fn find_reserved_for_book<C: ConnectionTrait>(
    conn: &C,
    book_id: i32,
) -> Result<Option<copy::Model>, CirculationError> {
    let found = Copy::find()
        .filter(copy::Column::BookId.eq(book_id))
        .filter(copy::Column::Status.eq(CopyStatus::Reserved))
        .lock_exclusive()
        .one(conn)
        .await?;

    Ok(found)
}

pub async fn book_has_available_copy<C: ConnectionTrait>(
    conn: &C,
    book_id: i32,
) -> Result<bool, CirculationError> {
    let found = Copy::find()
        .filter(copy::Column::BookId.eq(book_id))
        .filter(copy::Column::Status.eq(CopyStatus::Available))
        .one(conn)
        .await?;

    Ok(found.is_some())
}

pub async fn count_available_for_book<C: ConnectionTrait>(
    conn: &C,
    book_id: i32,
) -> Result<u64, CirculationError> {
    let count = Copy::find()
        .filter(copy::Column::BookId.eq(book_id))
        .filter(copy::Column::Status.eq(CopyStatus::Available))
        .count(conn)
        .await?;

    Ok(count)
}
