///  To run :
///  cargo r --example client_example
use shop_client::{ApiFailure, ShopClient};
use shop_hex::application::order_service::OrderService;
use shop_hex::inbound::http::{HttpServer, HttpServerConfig};
use shop_repo::build_repo;
use shop_types::domain::order::{
    AdminUpdate, DeliveryOption, OrderStatus, PaymentMethod, ShippingAddress,
};
use shop_types::domain::placement::{LineItemDraft, OrderDraft};
use tempfile::tempdir;
use uuid::Uuid;

fn find_free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

fn draft(buyer_id: Uuid, product_id: Uuid) -> OrderDraft {
    OrderDraft {
        buyer_id: Some(buyer_id.to_string()),
        items: vec![LineItemDraft {
            product_id: product_id.to_string(),
            name: "Widget".into(),
            price_cents: Some(500),
            quantity: 1,
            image: None,
        }],
        shipping_address: ShippingAddress {
            person_name: "Example".into(),
            mobile_number: "9123412345".into(),
            street_address: "1 Example Street".into(),
            postal_code: "500001".into(),
            state: "Telangana".into(),
        },
        payment_method: Some(PaymentMethod::DigitalWallet.as_str().into()),
        total_cents: Some(500),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let port = find_free_port();
    let addr = format!("http://127.0.0.1:{port}/");

    // Use a temp file-backed SQLite DB so multiple connections see the same data.
    let tmp = tempdir()?;
    let db_path = tmp.path().join("orders.db");
    let db_url = format!("sqlite://{}", db_path.display());

    let repo = build_repo(Some(&db_url)).await?;
    let service = OrderService::new(repo);
    let server = HttpServer::new(
        service,
        HttpServerConfig {
            port: port.to_string(),
        },
    )
    .await?;

    let handle = tokio::spawn(async move {
        server.run().await.expect("server run");
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let client = ShopClient::new(&addr)?;
    let buyer = Uuid::new_v4();
    let product = Uuid::new_v4();

    let placed = client.place_order(&draft(buyer, product)).await?;
    println!("Placed order id={} status={}", placed.id, placed.status);

    let shipped = client
        .update_order_admin(
            placed.id,
            &AdminUpdate {
                status: Some(OrderStatus::Shipped),
                delivery_option: Some(DeliveryOption::Stage3),
                admin_message: Some("dispatched".into()),
            },
        )
        .await?;
    println!(
        "Admin update: status={} delivery={}",
        shipped.status,
        shipped.delivery_option.label()
    );

    match client.cancel_order(placed.id).await {
        Ok(_) => println!("Unexpected: shipped order was cancelled"),
        Err(err) => match err.downcast_ref::<ApiFailure>() {
            Some(failure) => println!(
                "Cancel rejected ({}): {}",
                failure.body.code, failure.body.error
            ),
            None => return Err(err),
        },
    }

    let received = client.confirm_order_received(placed.id).await?;
    println!("Confirmed receipt at {:?}", received.delivered_at);

    let eligible = client.check_review_eligibility(buyer, product).await?;
    println!("Buyer may review product: {eligible}");

    handle.abort();
    Ok(())
}
