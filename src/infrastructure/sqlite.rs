//! SQLite schema and plain statement helpers.
//!
//! Every helper takes `&Connection` so it can run both inside a serialized
//! unit of work (`rusqlite::Transaction` derefs to `Connection`) and on the
//! concurrent read connection. Monetary values are stored as TEXT holding the
//! canonical decimal rendering and parsed back on read.

use crate::domain::order::{Order, OrderItem, OrderRequest, OrderStatus, PaymentMethod};
use crate::domain::product::{NewProduct, Product};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS products (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL,
  description TEXT NOT NULL DEFAULT '',
  price TEXT NOT NULL CHECK (CAST(price AS REAL) >= 0),
  stock INTEGER NOT NULL DEFAULT 0 CHECK (stock >= 0),
  image TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS orders (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  customer_name TEXT NOT NULL,
  phone TEXT NOT NULL,
  address TEXT NOT NULL,
  total TEXT NOT NULL CHECK (CAST(total AS REAL) >= 0),
  status TEXT NOT NULL DEFAULT 'pending',
  remark TEXT NOT NULL DEFAULT '',
  payment_method TEXT NOT NULL DEFAULT 'wechat',
  created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS order_items (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  order_id INTEGER NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
  product_id INTEGER NOT NULL REFERENCES products(id),
  quantity INTEGER NOT NULL CHECK (quantity > 0),
  unit_price TEXT NOT NULL CHECK (CAST(unit_price AS REAL) >= 0)
);
";

/// Opens a connection with WAL journaling, enforced foreign keys, and a
/// bounded lock wait so a stalled writer cannot hang readers forever.
pub fn open<P: AsRef<Path>>(path: P) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    // journal_mode returns the resulting mode as a row.
    conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(Duration::from_millis(5000))?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)
}

fn decimal_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    Decimal::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        price: decimal_column(row, 3)?,
        stock: row.get(4)?,
        image: row.get(5)?,
    })
}

fn order_from_row(row: &Row<'_>) -> rusqlite::Result<Order> {
    let status: String = row.get(5)?;
    let payment: String = row.get(7)?;
    Ok(Order {
        id: row.get(0)?,
        customer_name: row.get(1)?,
        phone: row.get(2)?,
        address: row.get(3)?,
        total: decimal_column(row, 4)?,
        status: OrderStatus::from_str(&status)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?,
        remark: row.get(6)?,
        payment_method: PaymentMethod::from_str(&payment)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?,
        created_at: row.get(8)?,
    })
}

const PRODUCT_COLUMNS: &str = "id, name, description, price, stock, image";
const ORDER_COLUMNS: &str =
    "id, customer_name, phone, address, total, status, remark, payment_method, created_at";

pub fn get_product(conn: &Connection, id: i64) -> rusqlite::Result<Option<Product>> {
    conn.query_row(
        &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"),
        params![id],
        product_from_row,
    )
    .optional()
}

pub fn list_products(conn: &Connection) -> rusqlite::Result<Vec<Product>> {
    let mut stmt =
        conn.prepare(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id DESC"))?;
    let rows = stmt.query_map([], product_from_row)?;
    rows.collect()
}

pub fn insert_product(conn: &Connection, new: &NewProduct) -> rusqlite::Result<Product> {
    conn.execute(
        "INSERT INTO products (name, description, price, stock, image) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            new.name,
            new.description,
            new.price.to_string(),
            new.stock,
            new.image
        ],
    )?;
    let id = conn.last_insert_rowid();
    get_product(conn, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

pub fn update_product(conn: &Connection, product: &Product) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE products SET name = ?1, description = ?2, price = ?3, stock = ?4, image = ?5
         WHERE id = ?6",
        params![
            product.name,
            product.description,
            product.price.to_string(),
            product.stock,
            product.image,
            product.id
        ],
    )
}

pub fn delete_product(conn: &Connection, id: i64) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM products WHERE id = ?1", params![id])
}

pub fn count_products(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))
}

pub fn insert_order(
    conn: &Connection,
    request: &OrderRequest,
    total: Decimal,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO orders (customer_name, phone, address, total, status, remark, payment_method)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            request.customer_name,
            request.phone,
            request.address,
            total.to_string(),
            OrderStatus::Pending.as_str(),
            request.remark,
            request.payment_method.as_str()
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_order_item(
    conn: &Connection,
    order_id: i64,
    product_id: i64,
    quantity: i64,
    unit_price: Decimal,
) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO order_items (order_id, product_id, quantity, unit_price)
         VALUES (?1, ?2, ?3, ?4)",
        params![order_id, product_id, quantity, unit_price.to_string()],
    )
}

/// Adds `delta` to a product's stock. A decrement below zero violates the
/// stock check constraint and fails the statement.
pub fn adjust_stock(conn: &Connection, product_id: i64, delta: i64) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE products SET stock = stock + ?1 WHERE id = ?2",
        params![delta, product_id],
    )
}

pub fn get_order(conn: &Connection, id: i64) -> rusqlite::Result<Option<Order>> {
    conn.query_row(
        &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"),
        params![id],
        order_from_row,
    )
    .optional()
}

pub fn list_orders(conn: &Connection) -> rusqlite::Result<Vec<Order>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, id DESC"
    ))?;
    let rows = stmt.query_map([], order_from_row)?;
    rows.collect()
}

pub fn order_items(conn: &Connection, order_id: i64) -> rusqlite::Result<Vec<OrderItem>> {
    let mut stmt = conn.prepare(
        "SELECT oi.id, oi.order_id, oi.product_id, oi.quantity, oi.unit_price, p.name
         FROM order_items oi
         LEFT JOIN products p ON oi.product_id = p.id
         WHERE oi.order_id = ?1
         ORDER BY oi.id",
    )?;
    let rows = stmt.query_map(params![order_id], |row| {
        Ok(OrderItem {
            id: row.get(0)?,
            order_id: row.get(1)?,
            product_id: row.get(2)?,
            quantity: row.get(3)?,
            unit_price: decimal_column(row, 4)?,
            product_name: row.get(5)?,
        })
    })?;
    rows.collect()
}

pub fn update_order_status(
    conn: &Connection,
    id: i64,
    status: OrderStatus,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE orders SET status = ?1 WHERE id = ?2",
        params![status.as_str(), id],
    )
}

/// Deletes the order row; items go with it via the cascade.
pub fn delete_order_row(conn: &Connection, id: i64) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM orders WHERE id = ?1", params![id])
}

/// Inserts a small demo catalog. Returns the number of rows inserted; no-op
/// when the products table already has rows.
pub fn seed_demo_products(conn: &Connection) -> rusqlite::Result<usize> {
    if count_products(conn)? > 0 {
        return Ok(0);
    }
    let samples: [(&str, &str, Decimal, i64); 4] = [
        (
            "iPhone 15 Pro Max screen assembly",
            "OLED replacement panel with frame, tools included.",
            dec!(1399.00),
            15,
        ),
        (
            "Mate 60 Pro screen assembly",
            "Scratch-resistant panel, mid-frame pre-installed.",
            dec!(1199.00),
            18,
        ),
        (
            "Xiaomi 14 screen assembly",
            "1.5K OLED panel with adhesive and tool kit.",
            dec!(899.00),
            25,
        ),
        (
            "Galaxy S23 screen assembly",
            "AMOLED panel with fingerprint support and earpiece mesh.",
            dec!(1299.00),
            10,
        ),
    ];
    for &(name, description, price, stock) in &samples {
        insert_product(
            conn,
            &NewProduct {
                name: name.into(),
                description: description.into(),
                price,
                stock,
                image: String::new(),
            },
        )?;
    }
    Ok(samples.len())
}
