use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use orderdesk::application::engine::OrderEngine;
use orderdesk::domain::order::{OrderLine, OrderRequest, OrderStatus, PaymentMethod};
use orderdesk::domain::product::{NewProduct, ProductPatch};
use rust_decimal::Decimal;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the SQLite database file
    #[arg(long, default_value = "orderdesk.sqlite")]
    db: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Insert a demo catalog if the products table is empty
    Seed,
    /// List products, newest first
    Products,
    /// Add a product
    AddProduct {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        price: Decimal,
        #[arg(long, default_value_t = 0)]
        stock: i64,
        #[arg(long, default_value = "")]
        image: String,
    },
    /// Update a product; omitted fields keep their current values
    UpdateProduct {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        price: Option<Decimal>,
        #[arg(long)]
        stock: Option<i64>,
        #[arg(long)]
        image: Option<String>,
    },
    /// Remove a product
    RemoveProduct { id: i64 },
    /// Place an order
    Place {
        #[arg(long)]
        customer: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        address: String,
        #[arg(long, default_value = "")]
        remark: String,
        /// One of: wechat, alipay, bank, cod
        #[arg(long, default_value = "wechat")]
        payment: String,
        /// Order line as product_id:quantity (repeatable)
        #[arg(long = "line", value_parser = parse_line, required = true)]
        lines: Vec<OrderLine>,
    },
    /// List orders, newest first
    Orders,
    /// Show one order with its items
    ShowOrder { id: i64 },
    /// Set an order's status (pending, fulfilled, cancelled)
    SetStatus { id: i64, status: String },
    /// Delete an order, restoring stock unless it was cancelled
    DeleteOrder { id: i64 },
}

fn parse_line(s: &str) -> std::result::Result<OrderLine, String> {
    let (product, quantity) = s
        .split_once(':')
        .ok_or_else(|| format!("expected product_id:quantity, got {s:?}"))?;
    Ok(OrderLine {
        product_id: product
            .trim()
            .parse()
            .map_err(|e| format!("bad product id: {e}"))?,
        quantity: quantity
            .trim()
            .parse()
            .map_err(|e| format!("bad quantity: {e}"))?,
    })
}

fn setup_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).into_diagnostic()?
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();
    let engine = OrderEngine::open(&cli.db).into_diagnostic()?;

    match cli.command {
        Command::Seed => {
            let inserted = engine.seed_demo_products().await.into_diagnostic()?;
            println!("seeded {inserted} products");
        }
        Command::Products => {
            print_json(&engine.list_products().await.into_diagnostic()?)?;
        }
        Command::AddProduct {
            name,
            description,
            price,
            stock,
            image,
        } => {
            let product = engine
                .create_product(NewProduct {
                    name,
                    description,
                    price,
                    stock,
                    image,
                })
                .await
                .into_diagnostic()?;
            print_json(&product)?;
        }
        Command::UpdateProduct {
            id,
            name,
            description,
            price,
            stock,
            image,
        } => {
            let product = engine
                .update_product(
                    id,
                    ProductPatch {
                        name,
                        description,
                        price,
                        stock,
                        image,
                    },
                )
                .await
                .into_diagnostic()?;
            print_json(&product)?;
        }
        Command::RemoveProduct { id } => {
            engine.delete_product(id).await.into_diagnostic()?;
            println!("product {id} removed");
        }
        Command::Place {
            customer,
            phone,
            address,
            remark,
            payment,
            lines,
        } => {
            let request = OrderRequest {
                customer_name: customer,
                phone,
                address,
                remark,
                payment_method: payment.parse::<PaymentMethod>().into_diagnostic()?,
                lines,
            };
            let receipt = engine.place_order(request).await.into_diagnostic()?;
            print_json(&receipt)?;
        }
        Command::Orders => {
            print_json(&engine.list_orders().await.into_diagnostic()?)?;
        }
        Command::ShowOrder { id } => {
            print_json(&engine.get_order(id).await.into_diagnostic()?)?;
        }
        Command::SetStatus { id, status } => {
            let status = status.parse::<OrderStatus>().into_diagnostic()?;
            engine.set_order_status(id, status).await.into_diagnostic()?;
            println!("order {id} is now {status}");
        }
        Command::DeleteOrder { id } => {
            engine.delete_order(id).await.into_diagnostic()?;
            println!("order {id} deleted");
        }
    }

    engine.shutdown();
    Ok(())
}
