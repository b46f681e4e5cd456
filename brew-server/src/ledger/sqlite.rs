use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::models::{
    CustomerIdentity, Customizations, Order, OrderLine, OrderQuery, OrderSort, OrderStatus, Paged,
    Size,
};
use shared::util::now_millis;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::str::FromStr;

use super::LedgerStore;
use crate::error::{CoreError, CoreResult};

const ORDER_COLUMNS: &str = "id, customer, created_at, total, payment_session_id, status";

/// Ledger store over the `orders` / `order_lines` tables.
///
/// Status writes are `UPDATE ... WHERE status = ?`, so the row itself is the
/// compare-and-set; this holds across processes sharing the database.
#[derive(Clone)]
pub struct SqliteLedgerStore {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i64,
    customer: String,
    created_at: i64,
    total: String,
    payment_session_id: Option<String>,
    status: String,
}

#[derive(sqlx::FromRow)]
struct LineRow {
    product_id: i64,
    product_name: String,
    size: String,
    ice_level: String,
    sugar_level: String,
    quantity: i64,
    unit_price: String,
}

fn parse_decimal(raw: &str, what: &str) -> CoreResult<Decimal> {
    Decimal::from_str(raw).map_err(|e| CoreError::Storage(format!("bad {what} {raw:?}: {e}")))
}

impl TryFrom<LineRow> for OrderLine {
    type Error = CoreError;

    fn try_from(row: LineRow) -> CoreResult<Self> {
        Ok(OrderLine {
            size: Size::from_str(&row.size).map_err(|e| CoreError::Storage(e.to_string()))?,
            unit_price: parse_decimal(&row.unit_price, "unit price")?,
            quantity: i32::try_from(row.quantity)
                .map_err(|_| CoreError::Storage(format!("bad quantity {}", row.quantity)))?,
            product_id: row.product_id,
            product_name: row.product_name,
            customizations: Customizations::new(row.ice_level, row.sugar_level),
        })
    }
}

fn order_by(sort: OrderSort) -> &'static str {
    match sort {
        OrderSort::Id => " ORDER BY id ASC",
        OrderSort::IdDesc => " ORDER BY id DESC",
        OrderSort::Time => " ORDER BY created_at ASC, rowid ASC",
        OrderSort::TimeDesc => " ORDER BY created_at DESC, rowid DESC",
        OrderSort::Total => " ORDER BY CAST(total AS REAL) ASC, id ASC",
        OrderSort::TotalDesc => " ORDER BY CAST(total AS REAL) DESC, id DESC",
    }
}

/// Search terms match literally, so LIKE metacharacters are escaped.
fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, query: &OrderQuery) {
    qb.push(" WHERE 1 = 1");
    if let Some(status) = query.status {
        qb.push(" AND status = ").push_bind(status.as_db());
    }
    if let Some(term) = query.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let pattern = format!("%{}%", escape_like(term));
        qb.push(" AND (customer LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR CAST(id AS TEXT) LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
}

impl SqliteLedgerStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn lines(&self, order_id: i64) -> CoreResult<Vec<OrderLine>> {
        let rows: Vec<LineRow> = sqlx::query_as(
            "SELECT product_id, product_name, size, ice_level, sugar_level, quantity, unit_price
             FROM order_lines WHERE order_id = ? ORDER BY line_no",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(OrderLine::try_from).collect()
    }

    async fn hydrate(&self, row: OrderRow) -> CoreResult<Order> {
        let status = OrderStatus::from_db(&row.status)
            .ok_or_else(|| CoreError::Storage(format!("bad order status {:?}", row.status)))?;
        Ok(Order {
            lines: self.lines(row.id).await?,
            total: parse_decimal(&row.total, "order total")?,
            id: row.id,
            customer: CustomerIdentity::new(row.customer),
            created_at: row.created_at,
            payment_session_id: row.payment_session_id,
            status,
        })
    }

    async fn hydrate_all(&self, rows: Vec<OrderRow>) -> CoreResult<Vec<Order>> {
        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            orders.push(self.hydrate(row).await?);
        }
        Ok(orders)
    }
}

#[async_trait]
impl LedgerStore for SqliteLedgerStore {
    async fn insert(&self, order: &Order) -> CoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO orders (id, customer, created_at, updated_at, total, payment_session_id, status)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(order.id)
        .bind(order.customer.as_str())
        .bind(order.created_at)
        .bind(order.created_at)
        .bind(order.total.to_string())
        .bind(order.payment_session_id.as_deref())
        .bind(order.status.as_db())
        .execute(&mut *tx)
        .await?;

        for (line_no, line) in order.lines.iter().enumerate() {
            sqlx::query(
                "INSERT INTO order_lines
                 (order_id, line_no, product_id, product_name, size, ice_level, sugar_level, quantity, unit_price)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(order.id)
            .bind(line_no as i64)
            .bind(line.product_id)
            .bind(&line.product_name)
            .bind(line.size.as_str())
            .bind(&line.customizations.ice_level)
            .bind(&line.customizations.sugar_level)
            .bind(line.quantity)
            .bind(line.unit_price.to_string())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, order_id: i64) -> CoreResult<Option<Order>> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"))
                .bind(order_id)
                .fetch_optional(&self.pool)
                .await?;
        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_session(&self, session_id: &str) -> CoreResult<Option<Order>> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE payment_session_id = ?"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn attach_session(&self, order_id: i64, session_id: &str) -> CoreResult<Option<String>> {
        sqlx::query(
            "UPDATE orders SET payment_session_id = ?, updated_at = ?
             WHERE id = ? AND payment_session_id IS NULL",
        )
        .bind(session_id)
        .bind(now_millis())
        .bind(order_id)
        .execute(&self.pool)
        .await?;

        let stored: Option<(Option<String>,)> =
            sqlx::query_as("SELECT payment_session_id FROM orders WHERE id = ?")
                .bind(order_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(stored.and_then(|(s,)| s))
    }

    async fn compare_and_set_status(
        &self,
        order_id: i64,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> CoreResult<bool> {
        let result = sqlx::query(
            "UPDATE orders SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(next.as_db())
        .bind(now_millis())
        .bind(order_id)
        .bind(expected.as_db())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_for_customer(&self, customer: &CustomerIdentity) -> CoreResult<Vec<Order>> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE customer = ?
             ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(customer.as_str())
        .fetch_all(&self.pool)
        .await?;
        self.hydrate_all(rows).await
    }

    async fn search(&self, query: &OrderQuery) -> CoreResult<Paged<Order>> {
        let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM orders");
        push_filters(&mut count_qb, query);
        let (total_items,): (i64,) = count_qb.build_query_as().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {ORDER_COLUMNS} FROM orders"));
        push_filters(&mut qb, query);
        qb.push(order_by(query.sort));
        qb.push(" LIMIT ")
            .push_bind(i64::from(query.page_size))
            .push(" OFFSET ")
            .push_bind(i64::try_from(query.offset()).unwrap_or(i64::MAX));
        let rows: Vec<OrderRow> = qb.build_query_as().fetch_all(&self.pool).await?;

        Ok(Paged {
            items: self.hydrate_all(rows).await?,
            total_items: total_items.max(0) as u64,
            page: query.page.max(1),
            page_size: query.page_size,
        })
    }

    async fn pending_without_session(&self, created_before: i64) -> CoreResult<Vec<Order>> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders
             WHERE status = 'pending' AND payment_session_id IS NULL AND created_at < ?
             ORDER BY created_at ASC, rowid ASC"
        ))
        .bind(created_before)
        .fetch_all(&self.pool)
        .await?;
        self.hydrate_all(rows).await
    }

    async fn count(&self) -> CoreResult<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}
