use crate::repository::{seed_orders, CustomerTotal, Order};
use docrepo::aggregate::{Group, Pipeline};
use docrepo::common::{Document, SortOrder, Value};
use docrepo::filter::field;
use docrepo::query::{order_by, FindOptions, InsertOptions, SortSpec};
use docrepo::repository::Repository;
use docrepo_int_test::test_util::{cleanup, create_test_context, run_async_test};

fn per_customer() -> Group {
    Group::by("customer")
        .key_as("customer")
        .sum("total", "total")
        .count("orders")
}

fn row(customer: &str, total: f64, orders: i64) -> CustomerTotal {
    CustomerTotal {
        customer: customer.to_string(),
        total,
        orders,
    }
}

#[test]
fn test_aggregate_into_typed_rows() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo: Repository<Order> = ctx.repository()?;
            repo.insert_many(seed_orders(), InsertOptions::new()).await?;

            let totals: Vec<CustomerTotal> = repo.aggregate(None, per_customer(), FindOptions::new()).await?;
            assert_eq!(
                totals,
                vec![row("alice", 50.0, 2), row("bob", 25.0, 1), row("carol", 5.0, 1)]
            );
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_aggregate_stage_order() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo: Repository<Order> = ctx.repository()?;
            repo.insert_many(seed_orders(), InsertOptions::new()).await?;
            ctx.recording().reset();

            // sorted input decides the group order, then skip and limit apply
            let options = order_by("total", SortOrder::Ascending).skip(1).limit(1);
            let totals: Vec<CustomerTotal> = repo
                .aggregate(field("total").gt(6), per_customer(), options)
                .await?;
            assert_eq!(totals, vec![row("bob", 25.0, 1)]);

            let aggregate = &ctx.recording().calls_of("aggregate", Some("orders"))[0];
            let pipeline = aggregate.get("pipeline");
            let stages: Vec<String> = pipeline
                .as_array()
                .map(|stages| {
                    stages
                        .iter()
                        .filter_map(|stage| stage.as_document().and_then(|d| d.keys().next().cloned()))
                        .collect()
                })
                .unwrap_or_default();
            // the renamed key is moved out of `_id` right after the group
            assert_eq!(
                stages,
                vec!["$match", "$sort", "$group", "$addFields", "$unset", "$skip", "$limit"]
            );
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_aggregate_ignores_zero_skip_and_limit() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo: Repository<Order> = ctx.repository()?;
            repo.insert_many(seed_orders(), InsertOptions::new()).await?;

            let totals: Vec<CustomerTotal> = repo
                .aggregate(None, per_customer(), FindOptions::new().skip(0).limit(0))
                .await?;
            assert_eq!(totals.len(), 3);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_aggregate_over_identity_field() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo: Repository<Order> = ctx.repository()?;
            repo.insert_many(seed_orders(), InsertOptions::new()).await?;

            let rows: Vec<Document> = repo
                .aggregate(
                    field("customer").eq("alice"),
                    Group::all().max("latest", "id").push("ids", "id"),
                    FindOptions::new(),
                )
                .await?;
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].get("latest")?, Value::I64(3));
            assert_eq!(
                rows[0].get("ids")?,
                Value::Array(vec![Value::I64(1), Value::I64(3)])
            );
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_aggregate_pipeline_sorts_group_output() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo: Repository<Order> = ctx.repository()?;
            repo.insert_many(seed_orders(), InsertOptions::new()).await?;

            let pipeline = Pipeline::new()
                .group(per_customer())
                .sort(SortSpec::new().add("total", SortOrder::Descending))
                .limit(2);
            let totals: Vec<CustomerTotal> = repo.aggregate_pipeline(pipeline).await?;
            assert_eq!(totals, vec![row("alice", 50.0, 2), row("bob", 25.0, 1)]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_aggregate_on_empty_collection() {
    run_async_test(
        create_test_context,
        |ctx| async move {
            let repo: Repository<Order> = ctx.repository()?;
            let totals: Vec<CustomerTotal> = repo.aggregate(None, per_customer(), FindOptions::new()).await?;
            assert!(totals.is_empty());
            Ok(())
        },
        cleanup,
    )
}
