use crate::repository::{generate_customer, generate_order, order, AuditEntry, Customer, Order, Tier};
use docrepo::common::Value;
use docrepo::errors::ErrorKind;
use docrepo::filter::field;
use docrepo::query::{DeleteOptions, FindOptions, InsertOptions, UpdateOptions, WriteConcern};
use docrepo::repository::Repository;
use docrepo::update::{set, Update};
use docrepo_int_test::test_util::{cleanup, create_test_context, run_async_test};

// =============================================================================
// INSERT OPERATIONS
// =============================================================================

#[test]
fn test_insert_and_get_round_trip() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo: Repository<Order> = ctx.repository()?;
            let original = generate_order();

            let inserted = repo.insert(original.clone(), InsertOptions::new()).await?;
            let stored = repo.get_by_id(&inserted.id).await?.expect("order must exist");

            assert_eq!(stored.customer, original.customer);
            assert_eq!(stored.total, original.total);
            assert_eq!(stored.tags, original.tags);
            assert_eq!(stored.placed_at, original.placed_at);
            // not persisted
            assert_eq!(stored.cached_label, String::new());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_insert_stores_identity_under_id() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo: Repository<Order> = ctx.repository()?;
            repo.insert(order("alice", 10.0), InsertOptions::new()).await?;

            let inserts = ctx.recording().calls_of("insert", Some("orders"));
            let documents = inserts[0].get("documents");
            let document = documents.as_array().and_then(|docs| docs[0].as_document().cloned());
            let document = document.expect("inserted document");
            assert_eq!(document.get("_id")?, Value::I64(1));
            assert!(!document.contains_key("id"));
            assert!(!document.contains_key("cached_label"));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_insert_with_plain_key() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo: Repository<Customer> = ctx.repository()?;
            let mut customer = generate_customer("C-1");
            customer.tier = Tier::Gold { since: 2019 };

            repo.insert(customer.clone(), InsertOptions::new()).await?;
            let stored = repo.get_by_id(&"C-1".to_string()).await?;
            assert_eq!(stored, Some(customer));

            // no sequence is touched for caller supplied keys
            assert!(ctx.recording().calls_of("findAndModify", None).is_empty());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_insert_without_required_key_fails() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo: Repository<Customer> = ctx.repository()?;
            let err = repo
                .insert(generate_customer(""), InsertOptions::new())
                .await
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidId);
            assert_eq!(ctx.recording().call_count(), 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_insert_duplicate_key_fails() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo: Repository<Customer> = ctx.repository()?;
            repo.insert(generate_customer("C-1"), InsertOptions::new()).await?;
            let err = repo
                .insert(generate_customer("C-1"), InsertOptions::new())
                .await
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::DuplicateKey);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_insert_generates_object_id() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo: Repository<AuditEntry> = ctx.repository()?;
            let entries = vec![
                AuditEntry {
                    action: "created".to_string(),
                    order_id: 1,
                    ..Default::default()
                },
                AuditEntry {
                    action: "paid".to_string(),
                    order_id: 1,
                    ..Default::default()
                },
            ];

            let inserted = repo.insert_many(entries, InsertOptions::new()).await?;
            let first = inserted[0].id.expect("generated id");
            let second = inserted[1].id.expect("generated id");
            assert_ne!(first, second);

            let stored = repo.get_by_id(&second).await?.expect("entry must exist");
            assert_eq!(stored.action, "paid");
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_write_concern_propagation() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo: Repository<Order> = ctx.repository()?;
            repo.insert(order("alice", 1.0), InsertOptions::new()).await?;
            repo.insert(order("bob", 2.0), InsertOptions::new().write_concern(WriteConcern::W0))
                .await?;

            let inserts = ctx.recording().calls_of("insert", Some("orders"));
            let concerns: Vec<Value> = inserts.iter().map(|call| call.get("writeConcern")).collect();
            assert_eq!(concerns[0].as_document().and_then(|wc| wc.get_ref("w").cloned()), Some(Value::I32(1)));
            assert_eq!(concerns[1].as_document().and_then(|wc| wc.get_ref("w").cloned()), Some(Value::I32(0)));

            // sequence increments always use the strongest concern
            let increment = &ctx.recording().calls_of("findAndModify", Some("_Sequence"))[0];
            let concern = increment.get("writeConcern");
            assert_eq!(
                concern.as_document().and_then(|wc| wc.get_ref("w").cloned()),
                Some(Value::from("majority"))
            );
            Ok(())
        },
        cleanup,
    )
}

// =============================================================================
// UPDATE OPERATIONS
// =============================================================================

#[test]
fn test_update_one_with_typed_fields() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo: Repository<Order> = ctx.repository()?;
            repo.insert(order("alice", 10.0), InsertOptions::new()).await?;

            let result = repo
                .update_one_with(
                    field("customer").eq("alice"),
                    |u, f| u.set(f.status, "paid").inc(f.total, 2.5).push(f.tags, "express"),
                    UpdateOptions::new(),
                )
                .await?;
            assert_eq!(result.matched_count, 1);
            assert_eq!(result.modified_count, 1);

            let stored = repo.get_by_id(&1).await?.expect("order must exist");
            assert_eq!(stored.status.as_deref(), Some("paid"));
            assert_eq!(stored.total, 12.5);
            assert_eq!(stored.tags, vec!["express".to_string()]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_update_many_translates_identity_field() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo: Repository<Order> = ctx.repository()?;
            for i in 0..4 {
                repo.insert(order("alice", i as f64), InsertOptions::new()).await?;
            }

            let result = repo
                .update_many(field("id").gt(2), set("status", "archived"), UpdateOptions::new())
                .await?;
            assert_eq!(result.matched_count, 2);

            let update = &ctx.recording().calls_of("update", Some("orders"))[0];
            let query = update.get("q");
            assert!(query.as_document().map_or(false, |q| q.contains_key("_id")));
            assert_eq!(update.get("multi"), Value::Bool(true));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_empty_update_is_rejected() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo: Repository<Order> = ctx.repository()?;
            let err = repo
                .update_one(None, Update::new(), UpdateOptions::new())
                .await
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::UpdateError);
            assert_eq!(ctx.recording().call_count(), 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_update_entity_never_changes_identity() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo: Repository<Order> = ctx.repository()?;
            repo.insert(order("alice", 10.0), InsertOptions::new()).await?;

            let mut replacement = order("alice", 99.0);
            replacement.id = 42;
            replacement.status = Some("paid".to_string());
            let result = repo
                .update_entity(field("id").eq(1i64), &replacement, UpdateOptions::new())
                .await?;
            assert_eq!(result.matched_count, 1);

            assert!(repo.get_by_id(&42).await?.is_none());
            let stored = repo.get_by_id(&1).await?.expect("order must keep its id");
            assert_eq!(stored.total, 99.0);
            assert_eq!(stored.status.as_deref(), Some("paid"));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_update_entity_upsert_allocates_fresh_id() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo: Repository<Order> = ctx.repository()?;
            repo.insert(order("alice", 10.0), InsertOptions::new()).await?;

            let result = repo
                .update_entity(
                    field("customer").eq("dave"),
                    &order("dave", 7.0),
                    UpdateOptions::new().upsert(true),
                )
                .await?;
            assert_eq!(result.matched_count, 0);
            assert_eq!(result.upserted_id, Some(Value::I64(2)));

            let dave = repo.get(field("customer").eq("dave"), FindOptions::new()).await?;
            assert_eq!(dave.map(|o| o.id), Some(2));
            Ok(())
        },
        cleanup,
    )
}

// =============================================================================
// DELETE OPERATIONS
// =============================================================================

#[test]
fn test_delete_one_and_many() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo: Repository<Order> = ctx.repository()?;
            for customer in ["alice", "bob", "alice", "carol"] {
                repo.insert(order(customer, 1.0), InsertOptions::new()).await?;
            }

            let deleted = repo
                .delete_one(field("customer").eq("alice"), DeleteOptions::new())
                .await?;
            assert_eq!(deleted.deleted_count, 1);

            let deleted = repo.delete_by_id(&2, DeleteOptions::new()).await?;
            assert_eq!(deleted.deleted_count, 1);

            let deleted = repo.delete_many(None, DeleteOptions::new()).await?;
            assert_eq!(deleted.deleted_count, 2);
            assert_eq!(repo.count(None, Default::default()).await?, 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_delete_on_empty_collection() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo: Repository<Order> = ctx.repository()?;
            let deleted = repo
                .delete_many(field("customer").eq("nobody"), DeleteOptions::new())
                .await?;
            assert_eq!(deleted.deleted_count, 0);
            Ok(())
        },
        cleanup,
    )
}
