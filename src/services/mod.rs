//! Services Layer
//!
//! The circulation transaction engine: every mutating operation here runs
//! inside a single transaction and either applies completely or not at all.
//! HTTP handling, serialization and permission checks live with the caller.

pub mod book_factory;
pub mod book_queries;
pub mod book_soft_deleter;
pub mod book_updater;
pub mod borrowing;
pub mod reservation;
pub mod returning;
pub mod specifications;

// Re-export for convenience
pub use book_factory::{create_book_with_copies, CreateBookInput, NewCopy};
pub use book_queries::{list_available_books, AvailableBook, AvailableBookFilter, OrderBy};
pub use book_soft_deleter::soft_delete_book;
pub use book_updater::{update_book_with_copies, CopyPayload, UpdateBookInput};
pub use borrowing::borrow_book;
pub use reservation::{cancel_reservation, reserve_book};
pub use returning::{calculate_fine, return_book};
