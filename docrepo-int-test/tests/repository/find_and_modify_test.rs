use crate::repository::{generate_customer, order, seed_orders, Customer, Order};
use docrepo::common::{SortOrder, Value, SEQUENCE_COLLECTION};
use docrepo::errors::ErrorKind;
use docrepo::filter::field;
use docrepo::query::{CountOptions, FindOneAndModifyOptions, InsertOptions, ReturnDocument};
use docrepo::repository::Repository;
use docrepo::update::{inc, set};
use docrepo_int_test::test_util::{cleanup, create_test_context, run_async_test};

#[test]
fn test_find_one_and_update_returns_pre_image() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo: Repository<Order> = ctx.repository()?;
            repo.insert_many(seed_orders(), InsertOptions::new()).await?;

            let before = repo
                .find_one_and_update(field("customer").eq("bob"), inc("total", 5), FindOneAndModifyOptions::new())
                .await?
                .expect("bob must match");
            assert_eq!(before.total, 25.0);

            let after = repo.get_by_id(&2).await?.expect("bob must exist");
            assert_eq!(after.total, 30.0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_find_one_and_update_returns_post_image_in_sort_order() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo: Repository<Order> = ctx.repository()?;
            repo.insert_many(seed_orders(), InsertOptions::new()).await?;

            let options = FindOneAndModifyOptions::new()
                .order_by("total", SortOrder::Descending)
                .return_document(ReturnDocument::After);
            let updated = repo
                .find_one_and_update_with(field("customer").eq("alice"), |u, f| u.set(f.status, "vip"), options)
                .await?
                .expect("alice must match");
            assert_eq!(updated.id, 3);
            assert_eq!(updated.status.as_deref(), Some("vip"));

            let untouched = repo.get_by_id(&1).await?.expect("order 1 must exist");
            assert_eq!(untouched.status, None);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_find_one_and_update_without_match() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo: Repository<Order> = ctx.repository()?;
            let result = repo
                .find_one_and_update(
                    field("customer").eq("nobody"),
                    set("status", "x"),
                    FindOneAndModifyOptions::new(),
                )
                .await?;
            assert!(result.is_none());
            assert_eq!(repo.count(None, CountOptions::new()).await?, 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_auto_increment_upsert_allocates_fresh_id() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo: Repository<Order> = ctx.repository()?;
            repo.insert_many(seed_orders(), InsertOptions::new()).await?;
            ctx.recording().reset();

            let options = FindOneAndModifyOptions::new()
                .upsert(true)
                .return_document(ReturnDocument::After);
            let created = repo
                .find_one_and_update_entity(field("customer").eq("dave"), &order("dave", 12.0), options)
                .await?
                .expect("upsert returns the new order");
            assert_eq!(created.id, 5);
            assert_eq!(created.customer, "dave");

            let increments = ctx.recording().calls_of("findAndModify", Some(SEQUENCE_COLLECTION));
            assert_eq!(increments.len(), 1);

            // a matching upsert keeps the stored id, though an id was reserved
            let options = FindOneAndModifyOptions::new()
                .upsert(true)
                .return_document(ReturnDocument::After);
            let updated = repo
                .find_one_and_update_entity(field("customer").eq("dave"), &order("dave", 13.0), options)
                .await?
                .expect("dave must match");
            assert_eq!(updated.id, 5);
            assert_eq!(updated.total, 13.0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_find_one_and_replace_keeps_identity() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo: Repository<Order> = ctx.repository()?;
            repo.insert_many(seed_orders(), InsertOptions::new()).await?;

            let mut replacement = order("bobby", 26.0);
            replacement.id = 2;
            let before = repo
                .find_one_and_replace(field("customer").eq("bob"), replacement, FindOneAndModifyOptions::new())
                .await?
                .expect("bob must match");
            assert_eq!(before.customer, "bob");

            let stored = repo.get_by_id(&2).await?.expect("order 2 must exist");
            assert_eq!(stored.customer, "bobby");
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_find_one_and_replace_rejects_identity_change() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo: Repository<Order> = ctx.repository()?;
            repo.insert_many(seed_orders(), InsertOptions::new()).await?;

            let mut replacement = order("bob", 1.0);
            replacement.id = 77;
            let err = repo
                .find_one_and_replace(field("customer").eq("bob"), replacement, FindOneAndModifyOptions::new())
                .await
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::ImmutableField);
            assert_eq!(repo.get_by_id(&2).await?.map(|o| o.total), Some(25.0));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_find_one_and_replace_upsert_without_identity_allocates() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo: Repository<Order> = ctx.repository()?;
            repo.insert_many(seed_orders(), InsertOptions::new()).await?;

            let options = FindOneAndModifyOptions::new()
                .upsert(true)
                .return_document(ReturnDocument::After);
            let created = repo
                .find_one_and_replace(field("customer").eq("erin"), order("erin", 3.0), options)
                .await?
                .expect("upsert returns the new order");
            assert_eq!(created.id, 5);
            assert_eq!(repo.count(None, CountOptions::new()).await?, 5);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_find_one_and_replace_upsert_ignores_supplied_id() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo: Repository<Order> = ctx.repository()?;

            let mut replacement = order("nobody", 1.0);
            replacement.id = 2;
            let options = FindOneAndModifyOptions::new()
                .upsert(true)
                .return_document(ReturnDocument::After);
            let created = repo
                .find_one_and_replace(field("customer").eq("nobody"), replacement, options)
                .await?
                .expect("upsert returns the new order");
            assert_eq!(created.id, 1);

            let first = repo.insert(order("alice", 2.0), InsertOptions::new()).await?;
            let second = repo.insert(order("bob", 3.0), InsertOptions::new()).await?;
            assert_eq!((first.id, second.id), (2, 3));
            assert_eq!(repo.count(None, CountOptions::new()).await?, 3);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_find_one_and_replace_upsert_with_plain_key() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo: Repository<Customer> = ctx.repository()?;

            let options = FindOneAndModifyOptions::new().upsert(true);
            let before = repo
                .find_one_and_replace(field("code").eq("C-9"), generate_customer("C-9"), options)
                .await?;
            assert!(before.is_none());

            let stored = repo.get_by_id(&"C-9".to_string()).await?;
            assert_eq!(stored.map(|c| c.code), Some("C-9".to_string()));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_find_one_and_delete_honours_sort() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo: Repository<Order> = ctx.repository()?;
            repo.insert_many(seed_orders(), InsertOptions::new()).await?;

            let options = FindOneAndModifyOptions::new().order_by("total", SortOrder::Ascending);
            let deleted = repo
                .find_one_and_delete(None, options)
                .await?
                .expect("one order must be deleted");
            assert_eq!(deleted.customer, "carol");
            assert_eq!(repo.count(None, CountOptions::new()).await?, 3);

            let modify = &ctx.recording().calls_of("findAndModify", Some("orders"))[0];
            assert_eq!(modify.get("remove"), Value::Bool(true));
            Ok(())
        },
        cleanup,
    )
}
