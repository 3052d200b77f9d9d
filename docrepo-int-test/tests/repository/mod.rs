mod aggregate_test;
mod builder_test;
mod entity_derive_test;
mod find_and_modify_test;
mod repository_modification_test;
mod repository_search_test;
mod sequence_allocation_test;

use chrono::{DateTime, Utc};
use docrepo::common::ObjectId;
use docrepo_derive::{Convertible, Entity};
use fake::faker::lorem::en::Word;
use fake::faker::name::en::FirstName;
use fake::Fake;

#[derive(Debug, Convertible, Entity, Default, Clone, PartialEq)]
#[entity(name = "orders", id(field = "id", auto_increment))]
#[converter(ignored = "cached_label")]
pub struct Order {
    pub id: i64,
    pub customer: String,
    pub total: f64,
    pub status: Option<String>,
    pub tags: Vec<String>,
    pub placed_at: Option<DateTime<Utc>>,
    pub cached_label: String,
}

#[derive(Debug, Convertible, Default, Clone, PartialEq)]
pub enum Tier {
    #[default]
    Basic,
    Gold {
        since: i32,
    },
    Custom(String),
}

#[derive(Debug, Convertible, Entity, Default, Clone, PartialEq)]
#[entity(name = "customers", id(field = "code"))]
pub struct Customer {
    pub code: String,
    pub name: String,
    pub tier: Tier,
    pub credit: i64,
}

#[derive(Debug, Convertible, Entity, Default, Clone, PartialEq)]
pub struct AuditEntry {
    pub id: Option<ObjectId>,
    pub action: String,
    pub order_id: i64,
}

/// A projection of [Order].
#[derive(Debug, Convertible, Default, Clone, PartialEq)]
pub struct OrderSummary {
    pub customer: String,
    pub total: f64,
}

/// One row of a per-customer aggregation.
#[derive(Debug, Convertible, Default, Clone, PartialEq)]
pub struct CustomerTotal {
    pub customer: String,
    pub total: f64,
    pub orders: i64,
}

pub fn order(customer: &str, total: f64) -> Order {
    Order {
        customer: customer.to_string(),
        total,
        ..Default::default()
    }
}

pub fn generate_order() -> Order {
    let tags = (0..(1..4).fake::<usize>()).map(|_| Word().fake::<String>()).collect();
    Order {
        id: 0,
        customer: FirstName().fake(),
        total: (1..500).fake::<i32>() as f64,
        status: Some("open".to_string()),
        tags,
        placed_at: Some(Utc::now()),
        cached_label: Word().fake(),
    }
}

pub fn generate_customer(code: &str) -> Customer {
    Customer {
        code: code.to_string(),
        name: FirstName().fake(),
        tier: Tier::Basic,
        credit: (0..1000).fake::<i64>(),
    }
}

/// alice 10, bob 25, alice 40, carol 5; ids 1 to 4 on a fresh store.
pub fn seed_orders() -> Vec<Order> {
    vec![
        order("alice", 10.0),
        order("bob", 25.0),
        order("alice", 40.0),
        order("carol", 5.0),
    ]
}
