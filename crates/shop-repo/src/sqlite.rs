use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use shop_types::domain::order::{
    DeliveryOption, LineItem, Order, OrderStatus, PaymentMethod, ShippingAddress,
};
use shop_types::ports::order_repository::{OrderRepository, RepoError};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{FromRow, SqlitePool};
use std::str::FromStr;
use uuid::Uuid;

const SELECT_ORDER: &str = "SELECT id, buyer_id, items_json, shipping_json, payment_method, total_cents, status, delivery_option, admin_message, created_at, updated_at, delivered_at, cancelled_at, version FROM orders";

pub struct SqliteRepo {
    pool: SqlitePool,
}

#[derive(FromRow)]
struct DbOrder {
    id: String,
    buyer_id: String,
    items_json: String,
    shipping_json: String,
    payment_method: String,
    total_cents: i64,
    status: String,
    delivery_option: String,
    admin_message: Option<String>,
    created_at: String,
    updated_at: String,
    delivered_at: Option<String>,
    cancelled_at: Option<String>,
    version: i64,
}

fn db_err(e: impl ToString) -> RepoError {
    RepoError::DbError(e.to_string())
}

/// Fixed-width so that `ORDER BY created_at` sorts chronologically.
fn format_ts(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>, RepoError> {
    Ok(DateTime::parse_from_rfc3339(s)
        .map_err(db_err)?
        .with_timezone(&Utc))
}

impl DbOrder {
    fn into_order(self) -> Result<Order, RepoError> {
        let items: Vec<LineItem> = serde_json::from_str(&self.items_json).map_err(db_err)?;
        let shipping_address: ShippingAddress =
            serde_json::from_str(&self.shipping_json).map_err(db_err)?;
        let order = Order {
            id: Uuid::parse_str(&self.id).map_err(db_err)?,
            buyer_id: Uuid::parse_str(&self.buyer_id).map_err(db_err)?,
            items,
            shipping_address,
            payment_method: self.payment_method.parse::<PaymentMethod>().map_err(db_err)?,
            total_cents: self.total_cents,
            status: self.status.parse::<OrderStatus>().map_err(db_err)?,
            delivery_option: self.delivery_option.parse::<DeliveryOption>().map_err(db_err)?,
            admin_message: self.admin_message,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
            delivered_at: self.delivered_at.as_deref().map(parse_ts).transpose()?,
            cancelled_at: self.cancelled_at.as_deref().map(parse_ts).transpose()?,
            version: self.version,
        };
        if !order.timestamps_consistent() {
            return Err(RepoError::DbError(format!(
                "order {} has terminal timestamps that disagree with status {}",
                order.id, order.status
            )));
        }
        Ok(order)
    }
}

impl SqliteRepo {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        let ddl = include_str!("../migrations/0001_create_orders.sql");
        sqlx::query(ddl).execute(&pool).await?;

        Ok(Self { pool })
    }

    async fn current_version(&self, id: Uuid) -> Result<Option<i64>, RepoError> {
        sqlx::query_scalar::<_, i64>("SELECT version FROM orders WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }
}

#[async_trait]
impl OrderRepository for SqliteRepo {
    async fn create(&self, order: Order) -> Result<Order, RepoError> {
        let items_json = serde_json::to_string(&order.items).map_err(db_err)?;
        let shipping_json = serde_json::to_string(&order.shipping_address).map_err(db_err)?;
        sqlx::query(
            "INSERT INTO orders (id, buyer_id, items_json, shipping_json, payment_method, total_cents, status, delivery_option, admin_message, created_at, updated_at, delivered_at, cancelled_at, version)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(order.id.to_string())
        .bind(order.buyer_id.to_string())
        .bind(items_json)
        .bind(shipping_json)
        .bind(order.payment_method.as_str())
        .bind(order.total_cents)
        .bind(order.status.as_str())
        .bind(order.delivery_option.as_str())
        .bind(order.admin_message.as_deref())
        .bind(format_ts(order.created_at))
        .bind(format_ts(order.updated_at))
        .bind(order.delivered_at.map(format_ts))
        .bind(order.cancelled_at.map(format_ts))
        .bind(order.version)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(order)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Order>, RepoError> {
        let row: Option<DbOrder> =
            sqlx::query_as::<_, DbOrder>(&format!("{SELECT_ORDER} WHERE id = ?"))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        row.map(|r| r.into_order()).transpose()
    }

    async fn list(&self, buyer_id: Option<Uuid>) -> Result<Vec<Order>, RepoError> {
        let rows: Vec<DbOrder> = match buyer_id {
            Some(buyer) => {
                sqlx::query_as::<_, DbOrder>(&format!(
                    "{SELECT_ORDER} WHERE buyer_id = ? ORDER BY created_at DESC"
                ))
                .bind(buyer.to_string())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, DbOrder>(&format!("{SELECT_ORDER} ORDER BY created_at DESC"))
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(db_err)?;

        rows.into_iter()
            .map(|r| r.into_order())
            .collect::<Result<Vec<_>, _>>()
    }

    async fn save(&self, order: Order, expected_version: i64) -> Result<Order, RepoError> {
        let updated = sqlx::query(
            "UPDATE orders SET status = ?, delivery_option = ?, admin_message = ?, updated_at = ?, delivered_at = ?, cancelled_at = ?, version = ?
             WHERE id = ? AND version = ?",
        )
        .bind(order.status.as_str())
        .bind(order.delivery_option.as_str())
        .bind(order.admin_message.as_deref())
        .bind(format_ts(order.updated_at))
        .bind(order.delivered_at.map(format_ts))
        .bind(order.cancelled_at.map(format_ts))
        .bind(order.version)
        .bind(order.id.to_string())
        .bind(expected_version)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if updated.rows_affected() == 0 {
            return Err(match self.current_version(order.id).await? {
                Some(found) => RepoError::Conflict {
                    id: order.id,
                    expected: expected_version,
                    found,
                },
                None => RepoError::NotFound(order.id),
            });
        }
        Ok(order)
    }

    async fn exists_with_product(
        &self,
        buyer_id: Uuid,
        product_id: Uuid,
        status: OrderStatus,
    ) -> Result<bool, RepoError> {
        let found = sqlx::query_scalar::<_, i64>(
            "SELECT EXISTS (
                 SELECT 1 FROM orders, json_each(orders.items_json) AS item
                 WHERE orders.buyer_id = ? AND orders.status = ?
                   AND json_extract(item.value, '$.product_id') = ?
             )",
        )
        .bind(buyer_id.to_string())
        .bind(status.as_str())
        .bind(product_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(found != 0)
    }
}
