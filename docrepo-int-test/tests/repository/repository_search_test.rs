use crate::repository::{seed_orders, Order, OrderSummary};
use docrepo::common::{Document, SortOrder, Value};
use docrepo::errors::ErrorKind;
use docrepo::filter::{all, and, field, or};
use docrepo::query::{order_by, CountOptions, FindOptions, InsertOptions, ReadPreference, Selector};
use docrepo::record;
use docrepo::repository::{Entity, Repository, RepositoryBuilder};
use docrepo_int_test::test_util::{cleanup, create_test_context, run_async_test, TestContext, TEST_DATABASE};

async fn seeded(ctx: &TestContext) -> docrepo::errors::RepoResult<Repository<Order>> {
    let repo: Repository<Order> = ctx.repository()?;
    repo.insert_many(seed_orders(), InsertOptions::new()).await?;
    ctx.recording().reset();
    Ok(repo)
}

fn customers(orders: &[Order]) -> Vec<&str> {
    orders.iter().map(|o| o.customer.as_str()).collect()
}

#[test]
fn test_absent_filter_matches_all() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo = seeded(&ctx).await?;

            let without = repo.get_list(None, FindOptions::new()).await?;
            let with_all = repo.get_list(all(), FindOptions::new()).await?;
            assert_eq!(without, with_all);
            assert_eq!(without.len(), 4);

            let finds = ctx.recording().calls_of("find", Some("orders"));
            assert_eq!(finds[0].get("filter"), Value::Document(Document::new()));
            assert_eq!(finds[0].get("filter"), finds[1].get("filter"));

            assert_eq!(repo.count(None, CountOptions::new()).await?, 4);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_sort_skip_and_limit() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo = seeded(&ctx).await?;

            let by_total = repo
                .get_list(None, order_by("total", SortOrder::Descending))
                .await?;
            assert_eq!(customers(&by_total), vec!["alice", "bob", "alice", "carol"]);

            let page = repo
                .get_list(
                    None,
                    FindOptions::new().sort_by("total", SortOrder::Ascending).skip(1).limit(2),
                )
                .await?;
            let totals: Vec<f64> = page.iter().map(|o| o.total).collect();
            assert_eq!(totals, vec![10.0, 25.0]);

            let find = &ctx.recording().calls_of("find", Some("orders"))[1];
            assert_eq!(find.get("skip"), Value::I64(1));
            assert_eq!(find.get("limit"), Value::I64(2));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_sort_by_identity_uses_stored_id() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo = seeded(&ctx).await?;

            let latest = repo
                .get(None, order_by(Order::fields().id, SortOrder::Descending))
                .await?;
            assert_eq!(latest.map(|o| o.id), Some(4));

            let find = &ctx.recording().calls_of("find", Some("orders"))[0];
            let sort = find.get("sort");
            assert_eq!(sort.as_document().and_then(|s| s.get_ref("_id").cloned()), Some(Value::I32(-1)));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_typed_predicates() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo = seeded(&ctx).await?;

            let big = repo
                .get_list_by(|f| f.total.gt(20.0), FindOptions::new())
                .await?;
            assert_eq!(customers(&big), vec!["bob", "alice"]);

            let alice_or_cheap = repo
                .get_list_by(
                    |f| f.customer.eq("alice").or(f.total.lt(6.0)),
                    order_by("total", SortOrder::Ascending),
                )
                .await?;
            assert_eq!(customers(&alice_or_cheap), vec!["carol", "alice", "alice"]);

            let first_alice = repo
                .get_by(|f| f.customer.eq("alice").and(f.id.gte(2)), FindOptions::new())
                .await?;
            assert_eq!(first_alice.map(|o| o.id), Some(3));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_fluent_filters() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo = seeded(&ctx).await?;

            let filter = or(vec![
                field("customer").eq("carol"),
                and(vec![field("customer").eq("alice"), field("total").gte(40)]),
            ]);
            let found = repo.get_list(filter, FindOptions::new()).await?;
            assert_eq!(customers(&found), vec!["alice", "carol"]);

            let found = repo
                .get_list(field("customer").in_array(vec!["bob", "carol"]), FindOptions::new())
                .await?;
            assert_eq!(found.len(), 2);

            let found = repo.get_list(field("customer").regex("^a"), FindOptions::new()).await?;
            assert_eq!(found.len(), 2);

            let none = repo.get(field("customer").eq("nobody"), FindOptions::new()).await?;
            assert!(none.is_none());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_projection_into_summary() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo = seeded(&ctx).await?;

            let summaries: Vec<OrderSummary> = repo
                .get_projected(
                    field("customer").eq("alice"),
                    |f| record![f.customer, f.total],
                    FindOptions::new(),
                )
                .await?;
            assert_eq!(
                summaries,
                vec![
                    OrderSummary {
                        customer: "alice".to_string(),
                        total: 10.0
                    },
                    OrderSummary {
                        customer: "alice".to_string(),
                        total: 40.0
                    },
                ]
            );

            let find = &ctx.recording().calls_of("find", Some("orders"))[0];
            let projection = find.get("projection");
            let projection = projection.as_document().expect("projection sent");
            assert!(projection.contains_key("customer"));
            assert!(projection.contains_key("total"));
            assert!(!projection.contains_key("tags"));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_invalid_projection_makes_no_store_call() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo = seeded(&ctx).await?;

            let err = repo
                .get_projected::<OrderSummary, _>(None, |f| Selector::from(f.customer), FindOptions::new())
                .await
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidProjectionExpression);

            let err = repo
                .get_projected::<OrderSummary, _>(
                    None,
                    |f| record![f.customer, Selector::computed("total * 2")],
                    FindOptions::new(),
                )
                .await
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidProjectionExpression);

            let err = repo
                .get_projected::<OrderSummary, _>(None, |_| record!["missing"], FindOptions::new())
                .await
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidProjectionExpression);

            assert_eq!(ctx.recording().call_count(), 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_count_with_options() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo = seeded(&ctx).await?;

            let alice = repo
                .count(field("customer").eq("alice"), CountOptions::new())
                .await?;
            assert_eq!(alice, 2);

            let capped = repo.count(None, CountOptions::new().skip(1).limit(2)).await?;
            assert_eq!(capped, 2);

            let count = &ctx.recording().calls_of("count", Some("orders"))[1];
            assert_eq!(count.get("skip"), Value::I64(1));
            assert_eq!(count.get("limit"), Value::I64(2));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_exists_is_a_count_limited_to_one() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo = seeded(&ctx).await?;

            let filters = vec![
                field("customer").eq("alice"),
                field("customer").eq("nobody"),
                all(),
            ];
            for filter in filters {
                let exists = repo.exists(filter.clone(), CountOptions::new().skip(3)).await?;
                let limited = repo.count(filter, CountOptions::new().limit(1)).await?;
                assert_eq!(exists, limited > 0);
            }

            let counts = ctx.recording().calls_of("count", Some("orders"));
            for call in counts.iter().step_by(2) {
                assert_eq!(call.get("limit"), Value::I64(1));
                assert_eq!(call.get("skip"), Value::Null);
            }
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_exists_stops_at_first_match() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo = seeded(&ctx).await?;

            let before = ctx.store().scanned_documents();
            assert!(repo.exists(None, CountOptions::new()).await?);
            assert_eq!(ctx.store().scanned_documents() - before, 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_distinct_values() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo = seeded(&ctx).await?;

            let mut names: Vec<String> = repo.distinct("customer", None).await?;
            names.sort();
            assert_eq!(names, vec!["alice", "bob", "carol"]);

            let ids: Vec<i64> = repo.distinct("id", field("customer").eq("alice")).await?;
            assert_eq!(ids.len(), 2);

            let distinct = &ctx.recording().calls_of("distinct", Some("orders"))[1];
            assert_eq!(distinct.get("key"), Value::from("_id"));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_read_preference_is_sent_with_finds() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            seeded(&ctx).await?;
            let repo: Repository<Order> = RepositoryBuilder::new()
                .database(TEST_DATABASE)
                .read_preference(ReadPreference::Secondary)
                .open_with(ctx.client())?;

            repo.get_list(None, FindOptions::new()).await?;
            repo.get_list(None, FindOptions::new().read_preference(ReadPreference::Primary))
                .await?;

            let finds = ctx.recording().calls_of("find", Some("orders"));
            let modes: Vec<Value> = finds
                .iter()
                .map(|call| {
                    call.get("$readPreference")
                        .as_document()
                        .and_then(|rp| rp.get_ref("mode").cloned())
                        .unwrap_or(Value::Null)
                })
                .collect();
            assert_eq!(modes, vec![Value::from("secondary"), Value::from("primary")]);
            Ok(())
        },
        cleanup,
    )
}
