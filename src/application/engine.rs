use crate::domain::order::{
    Order, OrderDetail, OrderReceipt, OrderRequest, OrderStatus,
};
use crate::domain::product::{NewProduct, Product, ProductPatch};
use crate::error::{OrderError, Result};
use crate::infrastructure::serializer::TxSerializer;
use crate::infrastructure::sqlite;
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

/// The order-placement engine.
///
/// Owns the serialized writer and a separate read connection. Every mutation
/// goes through the serializer as one unit of work; plain reads run
/// concurrently with the writer under WAL and the bounded busy timeout.
pub struct OrderEngine {
    writer: TxSerializer,
    reader: Arc<Mutex<Connection>>,
}

impl OrderEngine {
    /// Opens (or creates) the database at `path` and starts the writer.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let writer_conn = sqlite::open(path.as_ref())?;
        sqlite::init_schema(&writer_conn)?;
        let reader_conn = sqlite::open(path.as_ref())?;
        Ok(Self {
            writer: TxSerializer::spawn(writer_conn),
            reader: Arc::new(Mutex::new(reader_conn)),
        })
    }

    /// Closes the writer queue and waits for in-flight work.
    pub fn shutdown(self) {
        self.writer.shutdown();
    }

    /// Validates and commits a multi-line purchase as one unit of work.
    ///
    /// Request validation happens before the serializer is touched. Inside
    /// the transaction each line is checked against current stock and the
    /// unit price is locked at that read; only when every line passes are the
    /// order, its items, and the stock decrements written. Any failure leaves
    /// the store untouched.
    pub async fn place_order(&self, request: OrderRequest) -> Result<OrderReceipt> {
        request.validate()?;
        let receipt = self
            .writer
            .submit(move |tx| {
                let mut total = Decimal::ZERO;
                let mut lines = Vec::with_capacity(request.lines.len());
                for line in &request.lines {
                    let product = sqlite::get_product(tx, line.product_id)?
                        .ok_or(OrderError::ProductNotFound(line.product_id))?;
                    if product.stock < line.quantity {
                        return Err(OrderError::InsufficientStock {
                            name: product.name,
                            remaining: product.stock,
                        });
                    }
                    total += product.price * Decimal::from(line.quantity);
                    lines.push((product, line.quantity));
                }

                let order_id = sqlite::insert_order(tx, &request, total)?;
                for (product, quantity) in &lines {
                    sqlite::insert_order_item(tx, order_id, product.id, *quantity, product.price)?;
                    sqlite::adjust_stock(tx, product.id, -*quantity)?;
                }
                Ok(OrderReceipt { order_id, total })
            })
            .await?;
        info!(order_id = receipt.order_id, total = %receipt.total, "order placed");
        Ok(receipt)
    }

    /// Deletes an order, restoring each item's quantity to its product's
    /// stock unless the order was already cancelled (a cancelled order either
    /// never decremented stock or already had it restored).
    pub async fn delete_order(&self, order_id: i64) -> Result<()> {
        self.writer
            .submit(move |tx| {
                let order = sqlite::get_order(tx, order_id)?
                    .ok_or(OrderError::OrderNotFound(order_id))?;
                if order.status != OrderStatus::Cancelled {
                    for item in sqlite::order_items(tx, order_id)? {
                        sqlite::adjust_stock(tx, item.product_id, item.quantity)?;
                    }
                }
                sqlite::delete_order_row(tx, order_id)?;
                Ok(())
            })
            .await?;
        info!(order_id, "order deleted");
        Ok(())
    }

    pub async fn list_products(&self) -> Result<Vec<Product>> {
        self.read(|conn| Ok(sqlite::list_products(conn)?)).await
    }

    pub async fn get_product(&self, id: i64) -> Result<Product> {
        self.read(move |conn| {
            sqlite::get_product(conn, id)?.ok_or(OrderError::ProductNotFound(id))
        })
        .await
    }

    pub async fn create_product(&self, new: NewProduct) -> Result<Product> {
        new.validate()?;
        self.writer
            .submit(move |tx| Ok(sqlite::insert_product(tx, &new)?))
            .await
    }

    /// Partial update; fields absent from the patch keep their current
    /// values.
    pub async fn update_product(&self, id: i64, patch: ProductPatch) -> Result<Product> {
        patch.validate()?;
        self.writer
            .submit(move |tx| {
                let existing =
                    sqlite::get_product(tx, id)?.ok_or(OrderError::ProductNotFound(id))?;
                let updated = patch.apply(existing);
                sqlite::update_product(tx, &updated)?;
                Ok(updated)
            })
            .await
    }

    /// Removes a product. A product still referenced by order items fails
    /// with a store error from the foreign key constraint.
    pub async fn delete_product(&self, id: i64) -> Result<()> {
        self.writer
            .submit(move |tx| {
                if sqlite::delete_product(tx, id)? == 0 {
                    return Err(OrderError::ProductNotFound(id));
                }
                Ok(())
            })
            .await
    }

    pub async fn list_orders(&self) -> Result<Vec<Order>> {
        self.read(|conn| Ok(sqlite::list_orders(conn)?)).await
    }

    pub async fn get_order(&self, id: i64) -> Result<OrderDetail> {
        self.read(move |conn| {
            let order = sqlite::get_order(conn, id)?.ok_or(OrderError::OrderNotFound(id))?;
            let items = sqlite::order_items(conn, id)?;
            Ok(OrderDetail { order, items })
        })
        .await
    }

    /// Administrative status transition; no stock logic here.
    pub async fn set_order_status(&self, id: i64, status: OrderStatus) -> Result<()> {
        self.writer
            .submit(move |tx| {
                if sqlite::update_order_status(tx, id, status)? == 0 {
                    return Err(OrderError::OrderNotFound(id));
                }
                Ok(())
            })
            .await
    }

    /// Inserts the demo catalog when the products table is empty.
    pub async fn seed_demo_products(&self) -> Result<usize> {
        self.writer
            .submit(|tx| Ok(sqlite::seed_demo_products(tx)?))
            .await
    }

    async fn read<T, F>(&self, query: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let reader = Arc::clone(&self.reader);
        tokio::task::spawn_blocking(move || {
            let conn = reader.lock().map_err(|_| OrderError::Closed)?;
            query(&conn)
        })
        .await
        .map_err(|_| OrderError::Closed)?
    }
}
