//! Business rule predicates evaluated before a borrow is allowed.
//!
//! Each rule is an independently testable check over a (member, book) pair.
//! [`borrow_gates`] fixes the evaluation order; the first failing rule vetoes
//! the whole operation and its message becomes the rejection reason.

use async_trait::async_trait;
use sea_orm::DatabaseTransaction;

use crate::domain::CirculationError;
use crate::models::{book, member};
use crate::repositories::{fine_repository, loan_repository, reservation_repository};

#[async_trait]
pub trait Specification: Send + Sync {
    /// Rejection reason surfaced to the caller when the rule fails.
    fn error_message(&self) -> &'static str;

    async fn is_satisfied_by(
        &self,
        txn: &DatabaseTransaction,
        member: &member::Model,
        book: &book::Model,
    ) -> Result<bool, CirculationError>;
}

pub struct MemberIsActive;

#[async_trait]
impl Specification for MemberIsActive {
    fn error_message(&self) -> &'static str {
        "Inactive member"
    }

    async fn is_satisfied_by(
        &self,
        _txn: &DatabaseTransaction,
        member: &member::Model,
        _book: &book::Model,
    ) -> Result<bool, CirculationError> {
        Ok(member.is_active)
    }
}

pub struct MemberHasNoUnpaidFines;

#[async_trait]
impl Specification for MemberHasNoUnpaidFines {
    fn error_message(&self) -> &'static str {
        "Outstanding fines"
    }

    async fn is_satisfied_by(
        &self,
        txn: &DatabaseTransaction,
        member: &member::Model,
        _book: &book::Model,
    ) -> Result<bool, CirculationError> {
        Ok(!fine_repository::member_has_unpaid_fines(txn, member.id).await?)
    }
}

pub struct MemberBelowBorrowLimit;

#[async_trait]
impl Specification for MemberBelowBorrowLimit {
    fn error_message(&self) -> &'static str {
        "Borrow limit reached"
    }

    async fn is_satisfied_by(
        &self,
        txn: &DatabaseTransaction,
        member: &member::Model,
        _book: &book::Model,
    ) -> Result<bool, CirculationError> {
        let active = loan_repository::count_active_by_member(txn, member.id).await?;
        Ok(active < member.max_books_allowed as u64)
    }
}

/// Reservation priority is strict FIFO per book: if the head of the queue
/// belongs to someone else, this member may not borrow past them.
pub struct BookNotReservedByAnother;

#[async_trait]
impl Specification for BookNotReservedByAnother {
    fn error_message(&self) -> &'static str {
        "Book reserved by another member"
    }

    async fn is_satisfied_by(
        &self,
        txn: &DatabaseTransaction,
        member: &member::Model,
        book: &book::Model,
    ) -> Result<bool, CirculationError> {
        match reservation_repository::first_unfulfilled_for_book(txn, book.id).await? {
            Some(first) if first.member_id != member.id => Ok(false),
            _ => Ok(true),
        }
    }
}

/// The borrow gates in their fixed evaluation order.
pub fn borrow_gates() -> [&'static dyn Specification; 4] {
    [
        &MemberIsActive,
        &MemberHasNoUnpaidFines,
        &MemberBelowBorrowLimit,
        &BookNotReservedByAnother,
    ]
}
