#![cfg(feature = "sqlite")]

use shop_repo::{build_repo, Repo};
use shop_types::domain::order::{OrderStatus, PaymentMethod, ShippingAddress};
use shop_types::domain::placement::{LineItemDraft, OrderDraft};
use shop_types::ports::order_repository::OrderRepository;
use uuid::Uuid;

#[tokio::test]
async fn builds_sqlite_repo_from_url() {
    // Use a temp DB path for isolation.
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("orders-test.db");
    let url = format!("sqlite://{}", db_path.display());

    let repo: Repo = build_repo(Some(&url)).await.expect("build repo");
    assert!(repo.list(None).await.expect("list").is_empty());

    let order = shop_types::domain::order::Order::place(OrderDraft {
        buyer_id: Some(Uuid::new_v4().to_string()),
        items: vec![LineItemDraft {
            product_id: Uuid::new_v4().to_string(),
            name: "Widget".into(),
            price_cents: Some(500),
            quantity: 1,
            image: None,
        }],
        shipping_address: ShippingAddress {
            person_name: "Env".into(),
            mobile_number: "9000000000".into(),
            street_address: "9 Fort Road".into(),
            postal_code: "380001".into(),
            state: "Gujarat".into(),
        },
        payment_method: Some(PaymentMethod::CashOnDelivery.as_str().into()),
        total_cents: Some(500),
    })
    .unwrap();
    repo.create(order.clone()).await.unwrap();
    drop(repo);

    // A second handle on the same file sees the stored order.
    let reopened: Repo = build_repo(Some(&url)).await.expect("reopen repo");
    let stored = reopened.get(order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Pending);
}
