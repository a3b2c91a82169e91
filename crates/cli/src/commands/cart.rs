//! Cart commands.
//!
//! # Usage
//!
//! ```bash
//! cartsync cart show
//! cartsync cart add --id 7 --name Mango --price 25 --qty 2 --category 3 --product 7
//! cartsync cart set 7 5
//! cartsync cart remove 7
//! cartsync cart clear
//! ```

use std::io::Write;

use clap::Subcommand;

use cartsync_client::Session;
use cartsync_core::{CartLineItem, CatalogId, CategoryId, LineCandidate, ProductId, display_amount};

use super::CliError;

#[derive(Subcommand)]
pub enum CartAction {
    /// List the cart lines and totals
    Show,
    /// Add units of a product
    Add {
        /// Catalog id of the product
        #[arg(long)]
        id: CatalogId,

        /// Product name shown in the cart
        #[arg(short, long)]
        name: String,

        /// Unit price; required when the line is synced
        #[arg(short, long)]
        price: Option<String>,

        /// Number of units
        #[arg(short, long, default_value_t = 1)]
        qty: u32,

        /// Remote category id
        #[arg(long, requires = "product")]
        category: Option<CategoryId>,

        /// Remote product id
        #[arg(long, requires = "category")]
        product: Option<ProductId>,

        /// Unit label, e.g. `kg`
        #[arg(long)]
        unit: Option<String>,

        /// Image URL
        #[arg(long)]
        image: Option<String>,
    },
    /// Remove a product's line
    Remove { id: CatalogId },
    /// Set a product's quantity; zero or less removes the line
    Set {
        id: CatalogId,
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Empty the cart on this device
    Clear,
}

pub async fn run(session: &Session, action: CartAction) -> Result<(), CliError> {
    let cart = session.cart();
    match action {
        CartAction::Show => {}
        CartAction::Add {
            id,
            name,
            price,
            qty,
            category,
            product,
            unit,
            image,
        } => {
            let mut candidate = LineCandidate::new(id, name).with_price(price);
            if let (Some(category), Some(product)) = (category, product) {
                candidate = candidate.with_remote_keys(category, product);
            }
            if let Some(unit) = unit {
                candidate = candidate.with_unit_label(unit);
            }
            if let Some(image) = image {
                candidate = candidate.with_image(image);
            }
            cart.add_line(candidate, qty).await?;
        }
        CartAction::Remove { id } => cart.remove_line(id).await,
        CartAction::Set { id, quantity } => cart.set_quantity(id, quantity).await,
        CartAction::Clear => cart.clear().await,
    }

    let items = cart.items().await;
    let mut out = std::io::stdout().lock();
    if items.is_empty() {
        writeln!(out, "Cart is empty")?;
        return Ok(());
    }
    for line in &items {
        writeln!(out, "{}", format_line(line))?;
    }
    writeln!(
        out,
        "{} item(s), total {}",
        cart.count().await,
        display_amount(cart.total().await)
    )?;
    Ok(())
}

fn format_line(line: &CartLineItem) -> String {
    let unit = line
        .unit_label
        .as_deref()
        .map_or_else(String::new, |u| format!("/{u}"));
    let synced = if line.remote_line_id.is_some() { "" } else { " (local)" };
    format!(
        "{:>6}  {:<24} {:>3} x {}{unit} = {}{synced}",
        line.catalog_id,
        line.display_name,
        line.quantity,
        display_amount(line.unit_price),
        display_amount(line.line_total()),
    )
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_format_line() {
        let line = CartLineItem {
            catalog_id: CatalogId::new(7),
            display_name: "Mango".to_string(),
            unit_price: Decimal::from(25),
            quantity: 3,
            image_ref: None,
            unit_label: Some("kg".to_string()),
            category_id: None,
            product_id: None,
            remote_line_id: None,
            delivery_charge: None,
            delivery_date: None,
        };
        let text = format_line(&line);
        assert!(text.contains("Mango"));
        assert!(text.contains("3 x ₹25.00/kg = ₹75.00 (local)"));
    }
}
