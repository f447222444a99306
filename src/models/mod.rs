pub mod author;
pub mod book;
pub mod book_authors;
pub mod copy;
pub mod fine;
pub mod loan;
pub mod member;
pub mod reservation;

pub use copy::CopyStatus;
pub use loan::LoanStatus;
pub use reservation::ReservationStatus;
