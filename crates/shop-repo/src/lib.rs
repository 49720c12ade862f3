#[cfg(not(any(feature = "memory", feature = "sqlite")))]
compile_error!("Enable a repo feature: `memory` or `sqlite`.");

use shop_types::domain::order::{Order, OrderStatus};
use shop_types::ports::order_repository::{OrderRepository, RepoError};
use uuid::Uuid;

#[cfg(feature = "memory")]
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(all(feature = "sqlite", not(feature = "memory")))]
const DEFAULT_DATABASE_URL: &str = "sqlite://orders.db";

enum Backend {
    #[cfg(feature = "memory")]
    Memory(memory::InMemoryRepo),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite::SqliteRepo),
}

/// Order store chosen at startup from the enabled features and `DATABASE_URL`.
pub struct Repo {
    backend: Backend,
}

pub async fn build_repo(url: Option<&str>) -> anyhow::Result<Repo> {
    Repo::build_repo(url).await
}

impl Repo {
    /// With a URL, sqlite wins when compiled in. Without one, memory wins when
    /// compiled in, else sqlite opens the default file.
    pub async fn build_repo(database_url: Option<&str>) -> anyhow::Result<Self> {
        #[cfg(feature = "sqlite")]
        if let Some(url) = database_url {
            return Self::open_sqlite(url).await;
        }
        Self::open_default(database_url).await
    }

    #[cfg(feature = "sqlite")]
    async fn open_sqlite(url: &str) -> anyhow::Result<Self> {
        tracing::info!(url, "using sqlite order store");
        let sqlite = sqlite::SqliteRepo::new(url).await?;
        Ok(Self {
            backend: Backend::Sqlite(sqlite),
        })
    }

    #[cfg(feature = "memory")]
    async fn open_default(database_url: Option<&str>) -> anyhow::Result<Self> {
        if database_url.is_some() && cfg!(not(feature = "sqlite")) {
            tracing::warn!("DATABASE_URL ignored: built without the `sqlite` feature");
        }
        tracing::info!("using in-memory order store");
        Ok(Self {
            backend: Backend::Memory(memory::InMemoryRepo::new()),
        })
    }

    #[cfg(not(feature = "memory"))]
    async fn open_default(_: Option<&str>) -> anyhow::Result<Self> {
        Self::open_sqlite(DEFAULT_DATABASE_URL).await
    }

    fn inner(&self) -> &dyn OrderRepository {
        match &self.backend {
            #[cfg(feature = "memory")]
            Backend::Memory(repo) => repo as &dyn OrderRepository,
            #[cfg(feature = "sqlite")]
            Backend::Sqlite(repo) => repo as &dyn OrderRepository,
        }
    }
}

#[async_trait::async_trait]
impl OrderRepository for Repo {
    async fn create(&self, order: Order) -> Result<Order, RepoError> {
        self.inner().create(order).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<Order>, RepoError> {
        self.inner().get(id).await
    }

    async fn list(&self, buyer_id: Option<Uuid>) -> Result<Vec<Order>, RepoError> {
        self.inner().list(buyer_id).await
    }

    async fn save(&self, order: Order, expected_version: i64) -> Result<Order, RepoError> {
        self.inner().save(order, expected_version).await
    }

    async fn exists_with_product(
        &self,
        buyer_id: Uuid,
        product_id: Uuid,
        status: OrderStatus,
    ) -> Result<bool, RepoError> {
        self.inner()
            .exists_with_product(buyer_id, product_id, status)
            .await
    }
}
