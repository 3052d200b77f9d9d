use crate::repository::{order, Customer, Order};
use docrepo::common::Value;
use docrepo::errors::ErrorKind;
use docrepo::query::{CountOptions, InsertOptions, WriteConcern};
use docrepo::repository::{Repository, RepositoryBuilder};
use docrepo_int_test::test_util::{cleanup, create_test_context, random_endpoint, run_async_test, TEST_DATABASE};

#[test]
fn test_open_on_endpoint() {
    run_async_test(
        create_test_context,
        |_ctx| async move {
            let endpoint = random_endpoint();
            let repo: Repository<Order> = RepositoryBuilder::new()
                .endpoint(&endpoint)
                .database("shop")
                .open()?;
            assert_eq!(repo.collection_name(), "orders");
            assert_eq!(repo.database_name(), "shop");
            assert_eq!(repo.client().endpoint(), endpoint);

            repo.insert(order("alice", 1.0), InsertOptions::new()).await?;

            // a second repository over the same endpoint sees the data
            let again: Repository<Order> = RepositoryBuilder::new()
                .endpoint(&endpoint)
                .database("shop")
                .open()?;
            assert_eq!(again.count(None, CountOptions::new()).await?, 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_collection_override_and_shared_sequence_collection() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let archive: Repository<Order> = RepositoryBuilder::new()
                .database(TEST_DATABASE)
                .collection("orders_archive")
                .open_with(ctx.client())?;
            let live: Repository<Order> = ctx.repository()?;

            archive.insert(order("alice", 1.0), InsertOptions::new()).await?;
            let live_order = live.insert(order("bob", 2.0), InsertOptions::new()).await?;

            // one sequence per collection
            assert_eq!(live_order.id, 1);
            assert_eq!(ctx.recording().calls_of("insert", Some("orders_archive")).len(), 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_custom_sequence_collection() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo: Repository<Order> = RepositoryBuilder::new()
                .database(TEST_DATABASE)
                .sequence_collection("counters")
                .open_with(ctx.client())?;
            repo.insert(order("alice", 1.0), InsertOptions::new()).await?;

            assert_eq!(ctx.recording().calls_of("findAndModify", Some("counters")).len(), 1);
            assert!(ctx.recording().calls_of("findAndModify", Some("_Sequence")).is_empty());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_default_write_concern() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo: Repository<Customer> = RepositoryBuilder::new()
                .database(TEST_DATABASE)
                .write_concern(WriteConcern::Journaled)
                .open_with(ctx.client())?;
            repo.insert(
                Customer {
                    code: "C-1".to_string(),
                    ..Default::default()
                },
                InsertOptions::new(),
            )
            .await?;

            let insert = &ctx.recording().calls_of("insert", Some("customers"))[0];
            let concern = insert.get("writeConcern");
            let concern = concern.as_document().expect("write concern sent");
            assert_eq!(concern.get("w")?, Value::I32(1));
            assert_eq!(concern.get("j")?, Value::Bool(true));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_invalid_configuration() {
    let err = RepositoryBuilder::new().open::<Order>().unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::InvalidOperation);

    let err = RepositoryBuilder::new()
        .database(" ")
        .open::<Order>()
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::InvalidOperation);

    let err = RepositoryBuilder::new()
        .endpoint("mongodb://localhost:27017")
        .database("shop")
        .open::<Order>()
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::StoreFailure);
}
