use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    serve, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::application::order_service::OrderService;
use crate::errors::AppError;
use shop_types::domain::order::{AdminUpdate, Order};
use shop_types::domain::placement::OrderDraft;
use shop_types::ports::order_repository::OrderRepository;
use shop_types::ports::review_eligibility::ReviewEligibility;

#[derive(Clone)]
pub struct HttpServerConfig {
    pub port: String,
}

#[derive(Clone)]
pub struct HttpServer<R>
where
    R: OrderRepository,
{
    pub service: Arc<OrderService<R>>,
    pub config: HttpServerConfig,
}

#[derive(Deserialize)]
pub struct ListOrdersQuery {
    pub buyer_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct EligibilityQuery {
    pub user_id: Uuid,
    pub product_id: Uuid,
}

#[derive(Serialize)]
pub struct EligibilityResponse {
    pub eligible: bool,
}

impl<R> HttpServer<R>
where
    R: OrderRepository + Send + Sync + 'static,
{
    pub async fn new(service: OrderService<R>, config: HttpServerConfig) -> anyhow::Result<Self> {
        Ok(Self {
            service: Arc::new(service),
            config,
        })
    }

    pub fn router(&self) -> Router {
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &axum::extract::Request<_>| {
                let uri = request.uri().to_string();
                let request_id = Uuid::new_v4();
                tracing::info_span!(
                    "http_request",
                    %request_id,
                    method = %request.method(),
                    uri
                )
            })
            .on_request(
                |request: &axum::extract::Request<_>, span: &tracing::Span| {
                    tracing::info!(
                        parent: span,
                        method = %request.method(),
                        uri = %request.uri(),
                        "request"
                    );
                },
            )
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &tracing::Span| {
                    tracing::info!(
                        parent: span,
                        status = %response.status(),
                        latency_ms = %latency.as_millis(),
                        "response"
                    );
                },
            );

        Router::new()
            .route("/health", get(health))
            .route("/orders", post(place_order::<R>).get(list_orders::<R>))
            .route("/orders/{id}", get(get_order::<R>).patch(update_order_admin::<R>))
            .route(
                "/orders/{id}/confirm-received",
                post(confirm_order_received::<R>),
            )
            .route("/orders/{id}/cancel", post(cancel_order::<R>))
            .route("/reviews/eligibility", get(check_review_eligibility::<R>))
            .layer(trace_layer)
            .with_state(self.service.clone())
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let app = self.router();
        let addr: SocketAddr = format!("0.0.0.0:{}", self.config.port).parse()?;
        tracing::info!("starting server on {}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        serve(listener, app.into_make_service()).await?;
        Ok(())
    }
}

fn parse_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|e| AppError::BadRequest(format!("invalid order id: {e}")))
}

async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn place_order<R>(
    State(service): State<Arc<OrderService<R>>>,
    draft: Result<Json<OrderDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>), AppError>
where
    R: OrderRepository + Send + Sync + 'static,
{
    let Json(draft) = draft?;
    let order = service.place_order(draft).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn get_order<R>(
    State(service): State<Arc<OrderService<R>>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, AppError>
where
    R: OrderRepository + Send + Sync + 'static,
{
    let order = service.get_order(parse_id(&id)?).await?;
    Ok(Json(order))
}

async fn list_orders<R>(
    State(service): State<Arc<OrderService<R>>>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<Order>>, AppError>
where
    R: OrderRepository + Send + Sync + 'static,
{
    let list = service.list_orders(query.buyer_id).await?;
    Ok(Json(list))
}

async fn update_order_admin<R>(
    State(service): State<Arc<OrderService<R>>>,
    Path(id): Path<String>,
    update: Result<Json<AdminUpdate>, JsonRejection>,
) -> Result<Json<Order>, AppError>
where
    R: OrderRepository + Send + Sync + 'static,
{
    let id = parse_id(&id)?;
    let Json(update) = update?;
    let updated = service.update_order_admin(id, update).await?;
    Ok(Json(updated))
}

async fn confirm_order_received<R>(
    State(service): State<Arc<OrderService<R>>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, AppError>
where
    R: OrderRepository + Send + Sync + 'static,
{
    let updated = service.confirm_order_received(parse_id(&id)?).await?;
    Ok(Json(updated))
}

async fn cancel_order<R>(
    State(service): State<Arc<OrderService<R>>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, AppError>
where
    R: OrderRepository + Send + Sync + 'static,
{
    let updated = service.cancel_order(parse_id(&id)?).await?;
    Ok(Json(updated))
}

async fn check_review_eligibility<R>(
    State(service): State<Arc<OrderService<R>>>,
    Query(query): Query<EligibilityQuery>,
) -> Result<Json<EligibilityResponse>, AppError>
where
    R: OrderRepository + Send + Sync + 'static,
{
    let eligible = service
        .is_eligible_for_review(query.user_id, query.product_id)
        .await?;
    Ok(Json(EligibilityResponse { eligible }))
}
