//! Narrow query helpers over the entity collections.
//!
//! Functions are generic over [`sea_orm::ConnectionTrait`] so the same query
//! serves a plain connection or an open transaction; the circulation
//! services always call them with the transaction they run in.

pub mod copy_repository;
pub mod fine_repository;
pub mod loan_repository;
pub mod reservation_repository;
