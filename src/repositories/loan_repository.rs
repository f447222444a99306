use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};

use crate::domain::CirculationError;
use crate::models::copy::{self, Entity as Copy};
use crate::models::loan::{self, Entity as Loan, LoanStatus};

pub async fn count_active_by_member<C: ConnectionTrait>(
    conn: &C,
    member_id: i32,
) -> Result<u64, CirculationError> {
    let count = Loan::find()
        .filter(loan::Column::MemberId.eq(member_id))
        .filter(loan::Column::Status.eq(LoanStatus::Active))
        .count(conn)
        .await?;

    Ok(count)
}

/// Whether the member still holds an unreturned loan on any copy of the book.
pub async fn member_has_open_loan_for_book<C: ConnectionTrait>(
    conn: &C,
    member_id: i32,
    book_id: i32,
) -> Result<bool, CirculationError> {
    let copy_ids: Vec<i32> = Copy::find()
        .filter(copy::Column::BookId.eq(book_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|c| c.id)
        .collect();

    if copy_ids.is_empty() {
        return Ok(false);
    }

    let open_loan = Loan::find()
        .filter(loan::Column::MemberId.eq(member_id))
        .filter(loan::Column::CopyId.is_in(copy_ids))
        .filter(loan::Column::ReturnedAt.is_null())
        .one(conn)
        .await?;

    Ok(open_loan.is_some())
}
