use bibliocirc::config::CirculationConfig;
use bibliocirc::context::RequestContext;
use bibliocirc::db;
use bibliocirc::domain::CirculationError;
use bibliocirc::models::{CopyStatus, LoanStatus, ReservationStatus};
use bibliocirc::models::{book, copy, fine, loan, member, reservation};
use bibliocirc::services::returning::{calculate_fine, return_book};
use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, Set};

async fn setup_test_db() -> DatabaseConnection {
    db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB")
}

async fn create_test_member(db: &DatabaseConnection, user_id: i32) -> i32 {
    let now = Utc::now();
    let new_member = member::ActiveModel {
        user_id: Set(user_id),
        membership_number: Set(format!("M-{:04}", user_id)),
        joined_at: Set(now),
        is_active: Set(true),
        max_books_allowed: Set(5),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    new_member.insert(db).await.expect("Failed to create member").id
}

async fn create_test_book(db: &DatabaseConnection, title: &str, isbn: &str) -> i32 {
    let now = Utc::now();
    let new_book = book::ActiveModel {
        title: Set(title.to_string()),
        isbn: Set(isbn.to_string()),
        category: Set("Fiction".to_string()),
        description: Set(String::new()),
        published_year: Set(2001),
        is_deleted: Set(false),
        deleted_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    new_book.insert(db).await.expect("Failed to create book").id
}

async fn create_test_copy(
    db: &DatabaseConnection,
    book_id: i32,
    barcode: &str,
    status: CopyStatus,
) -> i32 {
    let now = Utc::now();
    let new_copy = copy::ActiveModel {
        book_id: Set(book_id),
        barcode: Set(barcode.to_string()),
        status: Set(status),
        shelf_location: Set("A-1".to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    new_copy.insert(db).await.expect("Failed to create copy").id
}

/// Active loan with a controllable due date, copy flipped to BORROWED.
async fn create_active_loan_due(
    db: &DatabaseConnection,
    member_id: i32,
    copy_id: i32,
    due_at: chrono::DateTime<Utc>,
) -> i32 {
    let now = Utc::now();
    let new_loan = loan::ActiveModel {
        member_id: Set(member_id),
        copy_id: Set(copy_id),
        borrowed_at: Set(due_at - Duration::days(14)),
        due_at: Set(due_at),
        returned_at: Set(None),
        status: Set(LoanStatus::Active),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    new_loan.insert(db).await.expect("Failed to create loan").id
}

#[tokio::test]
async fn on_time_return_closes_loan_without_fine() {
    let db = setup_test_db().await;
    let ctx = RequestContext::new();
    let config = CirculationConfig::default();

    let member_id = create_test_member(&db, 1).await;
    let book_id = create_test_book(&db, "Dune", "9780441013593").await;
    let copy_id = create_test_copy(&db, book_id, "C-001", CopyStatus::Borrowed).await;
    let loan_id =
        create_active_loan_due(&db, member_id, copy_id, Utc::now() + Duration::days(10)).await;

    let fine_amount = return_book(&db, &ctx, &config, loan_id)
        .await
        .expect("return should succeed");
    assert_eq!(fine_amount, 0.0);

    let closed = loan::Entity::find_by_id(loan_id).one(&db).await.unwrap().unwrap();
    assert_eq!(closed.status, LoanStatus::Returned);
    assert!(closed.returned_at.is_some());

    let freed = copy::Entity::find_by_id(copy_id).one(&db).await.unwrap().unwrap();
    assert_eq!(freed.status, CopyStatus::Available);

    let fines = fine::Entity::find().count(&db).await.unwrap();
    assert_eq!(fines, 0);
}

#[tokio::test]
async fn late_return_charges_whole_days_and_records_fine() {
    let db = setup_test_db().await;
    let ctx = RequestContext::new();
    let config = CirculationConfig::default();

    let member_id = create_test_member(&db, 1).await;
    let book_id = create_test_book(&db, "Dune", "9780441013593").await;
    let copy_id = create_test_copy(&db, book_id, "C-001", CopyStatus::Borrowed).await;

    // Two days and one hour late: charged for exactly 2 days.
    let due_at = Utc::now() - Duration::days(2) - Duration::hours(1);
    let loan_id = create_active_loan_due(&db, member_id, copy_id, due_at).await;

    let fine_amount = return_book(&db, &ctx, &config, loan_id)
        .await
        .expect("return should succeed");
    assert_eq!(fine_amount, 3.0);

    let closed = loan::Entity::find_by_id(loan_id).one(&db).await.unwrap().unwrap();
    assert_eq!(closed.status, LoanStatus::Overdue);

    let recorded = fine::Entity::find().one(&db).await.unwrap().unwrap();
    assert_eq!(recorded.loan_id, loan_id);
    assert_eq!(recorded.amount, 3.0);
    assert!(!recorded.is_paid);
}

#[tokio::test]
async fn return_hours_late_is_free_and_closes_as_returned() {
    let db = setup_test_db().await;
    let ctx = RequestContext::new();
    let config = CirculationConfig::default();

    let member_id = create_test_member(&db, 1).await;
    let book_id = create_test_book(&db, "Dune", "9780441013593").await;
    let copy_id = create_test_copy(&db, book_id, "C-001", CopyStatus::Borrowed).await;

    // Late, but by less than a whole day.
    let due_at = Utc::now() - Duration::hours(5);
    let loan_id = create_active_loan_due(&db, member_id, copy_id, due_at).await;

    let fine_amount = return_book(&db, &ctx, &config, loan_id)
        .await
        .expect("return should succeed");
    assert_eq!(fine_amount, 0.0);

    let closed = loan::Entity::find_by_id(loan_id).one(&db).await.unwrap().unwrap();
    assert_eq!(closed.status, LoanStatus::Returned);
}

#[tokio::test]
async fn returning_closed_loan_is_always_an_error() {
    let db = setup_test_db().await;
    let ctx = RequestContext::new();
    let config = CirculationConfig::default();

    let member_id = create_test_member(&db, 1).await;
    let book_id = create_test_book(&db, "Dune", "9780441013593").await;
    let copy_id = create_test_copy(&db, book_id, "C-001", CopyStatus::Borrowed).await;
    let loan_id =
        create_active_loan_due(&db, member_id, copy_id, Utc::now() + Duration::days(10)).await;

    return_book(&db, &ctx, &config, loan_id).await.expect("first return");

    let result = return_book(&db, &ctx, &config, loan_id).await;
    match result {
        Err(CirculationError::Rejected(msg)) => assert_eq!(msg, "Loan already closed"),
        other => panic!("expected rejection, got {:?}", other),
    }

    // The failed second return must not have mutated anything.
    let closed = loan::Entity::find_by_id(loan_id).one(&db).await.unwrap().unwrap();
    assert_eq!(closed.status, LoanStatus::Returned);
    let fines = fine::Entity::find().count(&db).await.unwrap();
    assert_eq!(fines, 0);
}

#[tokio::test]
async fn return_parks_copy_for_waiting_reservation() {
    let db = setup_test_db().await;
    let ctx = RequestContext::new();
    let config = CirculationConfig::default();

    let borrower_id = create_test_member(&db, 1).await;
    let holder_id = create_test_member(&db, 2).await;
    let book_id = create_test_book(&db, "Dune", "9780441013593").await;
    let copy_id = create_test_copy(&db, book_id, "C-001", CopyStatus::Borrowed).await;
    let loan_id =
        create_active_loan_due(&db, borrower_id, copy_id, Utc::now() + Duration::days(10)).await;

    let now = Utc::now();
    let waiting = reservation::ActiveModel {
        member_id: Set(holder_id),
        book_id: Set(book_id),
        status: Set(ReservationStatus::Active),
        reserved_at: Set(now - Duration::hours(2)),
        expires_at: Set(now + Duration::days(2)),
        fulfilled: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    waiting.insert(&db).await.unwrap();

    return_book(&db, &ctx, &config, loan_id).await.expect("return");

    let held = copy::Entity::find_by_id(copy_id).one(&db).await.unwrap().unwrap();
    assert_eq!(held.status, CopyStatus::Reserved);
}

#[tokio::test]
async fn return_unknown_loan_is_not_found() {
    let db = setup_test_db().await;
    let ctx = RequestContext::new();
    let config = CirculationConfig::default();

    let result = return_book(&db, &ctx, &config, 4242).await;
    assert!(matches!(result, Err(CirculationError::NotFound)));
}

#[tokio::test]
async fn fine_calculation_truncates_to_whole_days() {
    let due = Utc::now();

    assert_eq!(calculate_fine(due, due, 1.50), 0.0);
    assert_eq!(calculate_fine(due, due - Duration::days(3), 1.50), 0.0);
    assert_eq!(calculate_fine(due, due + Duration::hours(23), 1.50), 0.0);
    assert_eq!(calculate_fine(due, due + Duration::days(2), 1.50), 3.0);
    assert_eq!(
        calculate_fine(due, due + Duration::days(2) + Duration::hours(23), 1.50),
        3.0
    );
    // The rate is configuration, not a constant.
    assert_eq!(calculate_fine(due, due + Duration::days(4), 0.25), 1.0);
}
