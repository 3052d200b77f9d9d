use crate::repository::{generate_order, order, Order};
use docrepo::common::{Value, SEQUENCE_COLLECTION};
use docrepo::errors::ErrorKind;
use docrepo::query::InsertOptions;
use docrepo::repository::Repository;
use docrepo_int_test::test_util::{cleanup, create_test_context, run_async_test};
use std::collections::HashSet;

#[test]
fn test_sequential_inserts_get_consecutive_ids() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo: Repository<Order> = ctx.repository()?;

            let mut ids = vec![];
            for _ in 0..5 {
                ids.push(repo.insert(generate_order(), InsertOptions::new()).await?.id);
            }
            assert_eq!(ids, vec![1, 2, 3, 4, 5]);

            let increments = ctx.recording().calls_of("findAndModify", Some(SEQUENCE_COLLECTION));
            assert_eq!(increments.len(), 5);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_supplied_id_is_ignored_for_auto_increment() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo: Repository<Order> = ctx.repository()?;

            let mut first = order("alice", 10.0);
            first.id = 99;
            let first = repo.insert(first, InsertOptions::new()).await?;
            assert_eq!(first.id, 1);

            let stored = repo.get_by_id(&1).await?;
            assert_eq!(stored.map(|o| o.customer), Some("alice".to_string()));
            assert!(repo.get_by_id(&99).await?.is_none());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_batch_insert_reserves_one_contiguous_range() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo: Repository<Order> = ctx.repository()?;
            repo.insert(generate_order(), InsertOptions::new()).await?;
            ctx.recording().reset();

            let batch: Vec<Order> = (0..7).map(|_| generate_order()).collect();
            let inserted = repo.insert_many(batch, InsertOptions::new()).await?;

            let ids: Vec<i64> = inserted.iter().map(|o| o.id).collect();
            assert_eq!(ids, (2..=8).collect::<Vec<i64>>());

            let increments = ctx.recording().calls_of("findAndModify", Some(SEQUENCE_COLLECTION));
            assert_eq!(increments.len(), 1);
            let update = increments[0].get("update");
            let inc = update.as_document().and_then(|u| u.get_ref("$inc").cloned());
            let step = inc.and_then(|inc| inc.as_document().and_then(|d| d.get_ref("counter").cloned()));
            assert_eq!(step, Some(Value::I64(7)));

            let inserts = ctx.recording().calls_of("insert", Some("orders"));
            assert_eq!(inserts.len(), 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_empty_batch_makes_no_store_call() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo: Repository<Order> = ctx.repository()?;
            let inserted = repo.insert_many(vec![], InsertOptions::new()).await?;
            assert!(inserted.is_empty());
            assert_eq!(ctx.recording().call_count(), 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_concurrent_inserts_get_distinct_ids() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo: Repository<Order> = ctx.repository()?;

            let mut handles = vec![];
            for _ in 0..16 {
                let repo = repo.clone();
                handles.push(tokio::spawn(async move {
                    repo.insert(generate_order(), InsertOptions::new()).await
                }));
            }

            let mut ids = HashSet::new();
            for handle in handles {
                let inserted = handle.await.expect("insert task panicked")?;
                assert!(ids.insert(inserted.id), "duplicate id {}", inserted.id);
            }
            assert_eq!(ids, (1..=16).collect::<HashSet<i64>>());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_concurrent_batches_from_two_clients_are_disjoint() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let first: Repository<Order> = ctx.repository()?;
            let second: Repository<Order> = ctx.second_repository()?;

            let mut handles = vec![];
            for i in 0..8 {
                let repo = if i % 2 == 0 { first.clone() } else { second.clone() };
                handles.push(tokio::spawn(async move {
                    let batch: Vec<Order> = (0..5).map(|_| generate_order()).collect();
                    repo.insert_many(batch, InsertOptions::new()).await
                }));
            }

            let mut ranges = vec![];
            for handle in handles {
                let inserted = handle.await.expect("batch task panicked")?;
                let ids: Vec<i64> = inserted.iter().map(|o| o.id).collect();
                let start = ids[0];
                assert_eq!(ids, (start..start + 5).collect::<Vec<i64>>());
                ranges.push(start);
            }

            ranges.sort();
            assert_eq!(ranges, vec![1, 6, 11, 16, 21, 26, 31, 36]);
            assert_eq!(first.count(None, Default::default()).await?, 40);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_allocator_rejects_bad_requests_without_store_call() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo: Repository<Order> = ctx.repository()?;
            let allocator = repo.allocator();

            let err = allocator.allocate_range("orders", 0).await.unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidOperation);
            let err = allocator.allocate_range("", 3).await.unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidOperation);
            assert_eq!(ctx.recording().call_count(), 0);

            assert_eq!(allocator.allocate_range("invoices", 10).await?, 1);
            assert_eq!(allocator.allocate_id("invoices").await?, 11);
            Ok(())
        },
        cleanup,
    )
}
