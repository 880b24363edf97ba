use orderdesk::application::engine::OrderEngine;
use orderdesk::domain::order::{OrderLine, OrderRequest, OrderStatus, PaymentMethod};
use orderdesk::domain::product::NewProduct;
use orderdesk::error::OrderError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tempfile::TempDir;

fn open_engine() -> (OrderEngine, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let engine = OrderEngine::open(dir.path().join("shop.sqlite")).unwrap();
    (engine, dir)
}

fn product(name: &str, price: Decimal, stock: i64) -> NewProduct {
    NewProduct {
        name: name.into(),
        description: String::new(),
        price,
        stock,
        image: String::new(),
    }
}

fn request(customer: &str, lines: Vec<OrderLine>) -> OrderRequest {
    OrderRequest {
        customer_name: customer.into(),
        phone: "555-0100".into(),
        address: "1 Main St".into(),
        remark: String::new(),
        payment_method: PaymentMethod::Cod,
        lines,
    }
}

#[tokio::test]
async fn test_full_order_lifecycle() {
    let (engine, _dir) = open_engine();

    let screen = engine
        .create_product(product("Screen kit", dec!(120.50), 4))
        .await
        .unwrap();
    let battery = engine
        .create_product(product("Battery", dec!(35.00), 10))
        .await
        .unwrap();

    let receipt = engine
        .place_order(request(
            "Alice",
            vec![
                OrderLine {
                    product_id: screen.id,
                    quantity: 2,
                },
                OrderLine {
                    product_id: battery.id,
                    quantity: 1,
                },
            ],
        ))
        .await
        .unwrap();
    assert_eq!(receipt.total, dec!(276.00));

    let detail = engine.get_order(receipt.order_id).await.unwrap();
    assert_eq!(detail.order.status, OrderStatus::Pending);
    assert_eq!(detail.items.len(), 2);
    assert_eq!(detail.items[0].product_name.as_deref(), Some("Screen kit"));

    // Fulfil, then delete: a fulfilled order still restores stock.
    engine
        .set_order_status(receipt.order_id, OrderStatus::Fulfilled)
        .await
        .unwrap();
    engine.delete_order(receipt.order_id).await.unwrap();

    assert_eq!(engine.get_product(screen.id).await.unwrap().stock, 4);
    assert_eq!(engine.get_product(battery.id).await.unwrap().stock, 10);
    assert!(engine.list_orders().await.unwrap().is_empty());

    engine.shutdown();
}

#[tokio::test]
async fn test_concurrent_mixed_orders_keep_stock_consistent() {
    let (engine, _dir) = open_engine();

    let screen = engine
        .create_product(product("Screen kit", dec!(100.00), 6))
        .await
        .unwrap();
    let battery = engine
        .create_product(product("Battery", dec!(20.00), 6))
        .await
        .unwrap();

    let engine = Arc::new(engine);
    let mut handles = Vec::new();
    for i in 0..8 {
        let engine = Arc::clone(&engine);
        let (screen_id, battery_id) = (screen.id, battery.id);
        handles.push(tokio::spawn(async move {
            engine
                .place_order(request(
                    &format!("customer-{i}"),
                    vec![
                        OrderLine {
                            product_id: screen_id,
                            quantity: 1,
                        },
                        OrderLine {
                            product_id: battery_id,
                            quantity: 1,
                        },
                    ],
                ))
                .await
        }))
    }

    let mut committed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(receipt) => {
                assert_eq!(receipt.total, dec!(120.00));
                committed += 1;
            }
            Err(OrderError::InsufficientStock { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    // Both products start at 6, so exactly 6 of the 8 two-line orders fit.
    assert_eq!(committed, 6);
    assert_eq!(engine.get_product(screen.id).await.unwrap().stock, 0);
    assert_eq!(engine.get_product(battery.id).await.unwrap().stock, 0);

    let orders = engine.list_orders().await.unwrap();
    assert_eq!(orders.len(), 6);
    let grand_total: Decimal = orders.iter().map(|o| o.total).sum();
    assert_eq!(grand_total, dec!(720.00));
}

#[tokio::test]
async fn test_seeded_catalog_supports_orders() {
    let (engine, _dir) = open_engine();
    assert_eq!(engine.seed_demo_products().await.unwrap(), 4);

    let products = engine.list_products().await.unwrap();
    assert_eq!(products.len(), 4);

    let pick = &products[0];
    let receipt = engine
        .place_order(request(
            "Alice",
            vec![OrderLine {
                product_id: pick.id,
                quantity: 1,
            }],
        ))
        .await
        .unwrap();
    assert_eq!(receipt.total, pick.price);

    let after = engine.get_product(pick.id).await.unwrap();
    assert_eq!(after.stock, pick.stock - 1);
}
