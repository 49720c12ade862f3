use shop_hex::application::order_service::OrderService;
use shop_hex::inbound::http::{HttpServer, HttpServerConfig};
use shop_repo::build_repo;
use shop_types::domain::order::{DeliveryOption, Order, OrderStatus};
use uuid::Uuid;

fn find_free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

async fn start() -> (String, tokio::task::JoinHandle<()>) {
    let port = find_free_port();
    let config = HttpServerConfig {
        port: port.to_string(),
    };
    let repo = build_repo(None).await.expect("build repo");
    let service = OrderService::new(repo);
    let server = HttpServer::new(service, config).await.unwrap();
    let handle = tokio::spawn(async move {
        server.run().await.expect("server run");
    });

    // Give the server a moment to start.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    (format!("http://127.0.0.1:{}", port), handle)
}

fn order_body(buyer_id: Uuid, product_id: Uuid) -> serde_json::Value {
    serde_json::json!({
        "buyer_id": buyer_id,
        "items": [{
            "product_id": product_id.to_string(),
            "name": "Widget",
            "price_cents": 250,
            "quantity": 2
        }],
        "shipping_address": {
            "person_name": "Http User",
            "mobile_number": "9876501234",
            "street_address": "3 Station Road",
            "postal_code": "700001",
            "state": "West Bengal"
        },
        "payment_method": "CashOnDelivery",
        "total_cents": 500
    })
}

#[tokio::test]
async fn order_lifecycle_over_http() {
    let (addr, handle) = start().await;
    let client = reqwest::Client::new();
    let buyer = Uuid::new_v4();
    let product = Uuid::new_v4();

    let res = client
        .post(format!("{}/orders", addr))
        .json(&order_body(buyer, product))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::CREATED);
    let created: Order = res.json().await.unwrap();
    assert_eq!(created.status, OrderStatus::Pending);
    assert_eq!(created.delivery_option, DeliveryOption::Stage1);

    let fetched: Order = client
        .get(format!("{}/orders/{}", addr, created.id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched.shipping_address.person_name, "Http User");

    let list: Vec<Order> = client
        .get(format!("{}/orders?buyer_id={}", addr, buyer))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].id, created.id);

    let res = client
        .patch(format!("{}/orders/{}", addr, created.id))
        .json(&serde_json::json!({ "status": "Shipped", "admin_message": "on the way" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let shipped: Order = res.json().await.unwrap();
    assert_eq!(shipped.status, OrderStatus::Shipped);
    assert_eq!(shipped.admin_message.as_deref(), Some("on the way"));

    let eligibility_url = format!(
        "{}/reviews/eligibility?user_id={}&product_id={}",
        addr, buyer, product
    );
    let before: serde_json::Value = client
        .get(&eligibility_url)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(before["eligible"], false);

    let res = client
        .post(format!("{}/orders/{}/confirm-received", addr, created.id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let delivered: Order = res.json().await.unwrap();
    assert_eq!(delivered.status, OrderStatus::DeliveredConfirmed);
    assert!(delivered.delivered_at.is_some());

    let after: serde_json::Value = client
        .get(&eligibility_url)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(after["eligible"], true);

    let res = client
        .post(format!("{}/orders/{}/confirm-received", addr, created.id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::CONFLICT);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["code"], "terminal_state");

    handle.abort();
}

#[tokio::test]
async fn cancellation_errors_are_distinct() {
    let (addr, handle) = start().await;
    let client = reqwest::Client::new();

    let late: Order = client
        .post(format!("{}/orders", addr))
        .json(&order_body(Uuid::new_v4(), Uuid::new_v4()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    client
        .patch(format!("{}/orders/{}", addr, late.id))
        .json(&serde_json::json!({ "status": "Processing", "delivery_option": "Stage3" }))
        .send()
        .await
        .unwrap()
        .error_for_status()
        .unwrap();
    let res = client
        .post(format!("{}/orders/{}/cancel", addr, late.id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::CONFLICT);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["code"], "cancellation_window_closed");

    let early: Order = client
        .post(format!("{}/orders", addr))
        .json(&order_body(Uuid::new_v4(), Uuid::new_v4()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let res = client
        .post(format!("{}/orders/{}/cancel", addr, early.id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let cancelled: Order = res.json().await.unwrap();
    assert!(cancelled.cancelled_at.is_some());

    let res = client
        .post(format!("{}/orders/{}/cancel", addr, early.id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::CONFLICT);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["code"], "terminal_state");

    handle.abort();
}

#[tokio::test]
async fn bad_request_and_not_found_paths() {
    let (addr, handle) = start().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/orders", addr))
        .json(&serde_json::json!({ "items": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["code"], "validation");
    assert!(body["details"].as_array().unwrap().len() >= 3);

    let res = client
        .get(format!("{}/orders/not-a-uuid", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);

    let missing_id = Uuid::new_v4();
    let res = client
        .get(format!("{}/orders/{}", addr, missing_id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::NOT_FOUND);

    let res = client
        .post(format!("{}/orders/{}/cancel", addr, missing_id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::NOT_FOUND);

    handle.abort();
}

#[tokio::test]
async fn malformed_fields_are_validation_errors() {
    let (addr, handle) = start().await;
    let client = reqwest::Client::new();

    let mut body = order_body(Uuid::new_v4(), Uuid::new_v4());
    body["payment_method"] = serde_json::json!("Bitcoin");
    body["buyer_id"] = serde_json::json!("nope");
    let res = client
        .post(format!("{}/orders", addr))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["code"], "validation");
    let details: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|d| d.as_str())
        .collect();
    assert!(details.iter().any(|d| d.starts_with("buyer_id:")));
    assert!(details.iter().any(|d| d.starts_with("payment_method:")));

    let mut body = order_body(Uuid::new_v4(), Uuid::new_v4());
    body["items"][0]["quantity"] = serde_json::json!("two");
    let res = client
        .post(format!("{}/orders", addr))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["code"], "validation");

    let created: Order = client
        .post(format!("{}/orders", addr))
        .json(&order_body(Uuid::new_v4(), Uuid::new_v4()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let res = client
        .patch(format!("{}/orders/{}", addr, created.id))
        .json(&serde_json::json!({ "status": "Lost" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["code"], "validation");

    let unchanged: Order = client
        .get(format!("{}/orders/{}", addr, created.id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(unchanged.status, OrderStatus::Pending);

    handle.abort();
}
