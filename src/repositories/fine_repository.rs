use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

use crate::domain::CirculationError;
use crate::models::fine::{self, Entity as Fine};
use crate::models::loan::{self, Entity as Loan};

/// Whether any fine linked to the member, through any of their loans, is
/// still unpaid.
pub async fn member_has_unpaid_fines<C: ConnectionTrait>(
    conn: &C,
    member_id: i32,
) -> Result<bool, CirculationError> {
    let loan_ids: Vec<i32> = Loan::find()
        .filter(loan::Column::MemberId.eq(member_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|l| l.id)
        .collect();

    if loan_ids.is_empty() {
        return Ok(false);
    }

    let unpaid = Fine::find()
        .filter(fine::Column::LoanId.is_in(loan_ids))
        .filter(fine::Column::IsPaid.eq(false))
        .one(conn)
        .await?;

    Ok(unpaid.is_some())
}
