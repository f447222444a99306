use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};

use crate::domain::CirculationError;
use crate::models::reservation::{self, Entity as Reservation, ReservationStatus};

/// Head of the FIFO queue for a book: the oldest reservation that is still
/// ACTIVE. Cancelled and expired reservations never hold a place in line.
pub async fn first_unfulfilled_for_book<C: ConnectionTrait>(
    conn: &C,
    book_id: i32,
) -> Result<Option<reservation::Model>, CirculationError> {
    let first = Reservation::find()
        .filter(reservation::Column::BookId.eq(book_id))
        .filter(reservation::Column::Status.eq(ReservationStatus::Active))
        .order_by_asc(reservation::Column::ReservedAt)
        .one(conn)
        .await?;

    Ok(first)
}

pub async fn book_has_unfulfilled<C: ConnectionTrait>(
    conn: &C,
    book_id: i32,
) -> Result<bool, CirculationError> {
    Ok(first_unfulfilled_for_book(conn, book_id).await?.is_some())
}

pub async fn member_has_active_for_book<C: ConnectionTrait>(
    conn: &C,
    member_id: i32,
    book_id: i32,
) -> Result<bool, CirculationError> {
    let found = Reservation::find()
        .filter(reservation::Column::MemberId.eq(member_id))
        .filter(reservation::Column::BookId.eq(book_id))
        .filter(reservation::Column::Status.eq(ReservationStatus::Active))
        .one(conn)
        .await?;

    Ok(found.is_some())
}
