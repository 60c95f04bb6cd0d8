use async_trait::async_trait;
use common::{AddressId, OrderId, ProductId, SkuId, UserId};
use domain::{AddressInput, AddressSnapshot, Money, Order, OrderLine, OrderStatus};
use sqlx::{
    PgPool, Row,
    postgres::{PgPoolOptions, PgRow},
};

use crate::{
    Result, StoreError,
    store::{AddressStore, CancelOutcome, OrderStore, validate_order_for_write},
};

/// PostgreSQL-backed order store.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `database_url` with a pool of at most `max_connections`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let status: String = row.try_get("status")?;
        Ok(Order {
            id: OrderId::new(from_db(row.try_get("id")?)?),
            user_id: UserId::new(from_db(row.try_get("user_id")?)?),
            total: Money::from_cents(row.try_get("total_cents")?),
            product_count: count_from_db(row.try_get("product_count")?)?,
            status: status
                .parse::<OrderStatus>()
                .map_err(|e| StoreError::InvalidData(e.to_string()))?,
            address_id: AddressId::new(from_db(row.try_get("address_id")?)?),
            product_summary: row.try_get("product_summary")?,
            remarks: row.try_get("remarks")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            cancel_reason: row.try_get("cancel_reason")?,
        })
    }

    fn row_to_line(row: PgRow) -> Result<OrderLine> {
        Ok(OrderLine {
            order_id: OrderId::new(from_db(row.try_get("order_id")?)?),
            user_id: UserId::new(from_db(row.try_get("user_id")?)?),
            product_id: ProductId::new(from_db(row.try_get("product_id")?)?),
            sku_id: SkuId::new(from_db(row.try_get("sku_id")?)?),
            product_name: row.try_get("product_name")?,
            sku_name: row.try_get("sku_name")?,
            picture: row.try_get("picture")?,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
            quantity: count_from_db(row.try_get("quantity")?)?,
            line_total: Money::from_cents(row.try_get("line_total_cents")?),
            created_at: row.try_get("created_at")?,
        })
    }
}

fn to_db(value: u64) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| StoreError::InvalidData(format!("id {value} exceeds BIGINT range")))
}

fn from_db(value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| StoreError::InvalidData(format!("negative id {value}")))
}

fn count_to_db(value: u32) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| StoreError::InvalidData(format!("count {value} exceeds INTEGER range")))
}

fn count_from_db(value: i32) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::InvalidData(format!("negative count {value}")))
}

#[async_trait]
impl AddressStore for PostgresOrderStore {
    #[tracing::instrument(skip(self, address))]
    async fn save_address(&self, user_id: UserId, address: &AddressInput) -> Result<AddressId> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO order_address (user_id, receiver, mobile, province, city, area, detail, postal_code)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(to_db(user_id.value())?)
        .bind(&address.receiver)
        .bind(&address.mobile)
        .bind(&address.province)
        .bind(&address.city)
        .bind(&address.area)
        .bind(&address.detail)
        .bind(&address.postal_code)
        .fetch_one(&self.pool)
        .await?;

        Ok(AddressId::new(from_db(id)?))
    }

    async fn get_address(&self, address_id: AddressId) -> Result<Option<AddressSnapshot>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT id, user_id, receiver, mobile, province, city, area, detail, postal_code, created_at
            FROM order_address
            WHERE id = $1
            "#,
        )
        .bind(to_db(address_id.value())?)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(AddressSnapshot {
                id: AddressId::new(from_db(row.try_get("id")?)?),
                user_id: UserId::new(from_db(row.try_get("user_id")?)?),
                address: AddressInput {
                    receiver: row.try_get("receiver")?,
                    mobile: row.try_get("mobile")?,
                    province: row.try_get("province")?,
                    city: row.try_get("city")?,
                    area: row.try_get("area")?,
                    detail: row.try_get("detail")?,
                    postal_code: row.try_get("postal_code")?,
                },
                created_at: row.try_get("created_at")?,
            })),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    #[tracing::instrument(skip(self, order, lines), fields(order_id = %order.id, lines = lines.len()))]
    async fn write_order(&self, order: &Order, lines: &[OrderLine]) -> Result<()> {
        validate_order_for_write(order, lines)?;

        let order_id = to_db(order.id.value())?;

        // Header and lines commit together or not at all
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, total_cents, product_count, status, address_id,
                                product_summary, remarks, created_at, updated_at, cancel_reason)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(order_id)
        .bind(to_db(order.user_id.value())?)
        .bind(order.total.cents())
        .bind(count_to_db(order.product_count)?)
        .bind(order.status.as_str())
        .bind(to_db(order.address_id.value())?)
        .bind(&order.product_summary)
        .bind(&order.remarks)
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(&order.cancel_reason)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("orders_pkey")
            {
                return StoreError::Conflict(order.id);
            }
            StoreError::Database(e)
        })?;

        for (line_no, line) in lines.iter().enumerate() {
            let line_no = i32::try_from(line_no)
                .map_err(|_| StoreError::InvalidData("too many order lines".to_string()))?;

            sqlx::query(
                r#"
                INSERT INTO order_line (order_id, line_no, user_id, product_id, sku_id, product_name,
                                        sku_name, picture, unit_price_cents, quantity,
                                        line_total_cents, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                "#,
            )
            .bind(order_id)
            .bind(line_no)
            .bind(to_db(line.user_id.value())?)
            .bind(to_db(line.product_id.value())?)
            .bind(to_db(line.sku_id.value())?)
            .bind(&line.product_name)
            .bind(&line.sku_name)
            .bind(&line.picture)
            .bind(line.unit_price.cents())
            .bind(count_to_db(line.quantity)?)
            .bind(line.line_total.cents())
            .bind(line.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT id, user_id, total_cents, product_count, status, address_id,
                   product_summary, remarks, created_at, updated_at, cancel_reason
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(to_db(order_id.value())?)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn lines_for_order(&self, order_id: OrderId) -> Result<Vec<OrderLine>> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, user_id, product_id, sku_id, product_name, sku_name, picture,
                   unit_price_cents, quantity, line_total_cents, created_at
            FROM order_line
            WHERE order_id = $1
            ORDER BY line_no ASC
            "#,
        )
        .bind(to_db(order_id.value())?)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_line).collect()
    }

    #[tracing::instrument(skip(self))]
    async fn cancel_order(&self, order_id: OrderId, reason: &str) -> Result<CancelOutcome> {
        let id = to_db(order_id.value())?;

        let updated = sqlx::query(
            r#"
            UPDATE orders
            SET status = $2, cancel_reason = $3, updated_at = NOW()
            WHERE id = $1 AND status = $4
            "#,
        )
        .bind(id)
        .bind(OrderStatus::Cancelled.as_str())
        .bind(reason)
        .bind(OrderStatus::Unpaid.as_str())
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 1 {
            return Ok(CancelOutcome::Cancelled);
        }

        let status: Option<String> = sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match status {
            Some(status) => status
                .parse::<OrderStatus>()
                .map(CancelOutcome::Unchanged)
                .map_err(|e| StoreError::InvalidData(e.to_string())),
            None => Err(StoreError::NotFound(order_id)),
        }
    }
}
