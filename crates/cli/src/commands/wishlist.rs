//! Wishlist commands.

use std::io::Write;

use clap::Subcommand;
use rust_decimal::Decimal;

use cartsync_client::Session;
use cartsync_core::{CatalogId, WishlistItem, display_amount};

use super::CliError;

#[derive(Subcommand)]
pub enum WishlistAction {
    /// List wishlist items
    Show,
    /// Add a product, or remove it if already present
    Toggle {
        #[arg(long)]
        id: CatalogId,

        #[arg(short, long)]
        name: String,

        #[arg(short, long, default_value = "0")]
        price: Decimal,

        #[arg(long)]
        image: Option<String>,
    },
    /// Remove a product
    Remove { id: CatalogId },
    /// Empty the wishlist
    Clear,
}

pub async fn run(session: &Session, action: WishlistAction) -> Result<(), CliError> {
    let wishlist = session.wishlist();
    let mut out = std::io::stdout().lock();
    match action {
        WishlistAction::Show => {}
        WishlistAction::Toggle {
            id,
            name,
            price,
            image,
        } => {
            let added = wishlist
                .toggle(WishlistItem {
                    catalog_id: id,
                    display_name: name,
                    unit_price: price,
                    image_ref: image,
                })
                .await;
            writeln!(out, "{} {id}", if added { "Added" } else { "Removed" })?;
        }
        WishlistAction::Remove { id } => {
            wishlist.remove(id).await;
        }
        WishlistAction::Clear => wishlist.clear().await,
    }

    let items = wishlist.items().await;
    if items.is_empty() {
        writeln!(out, "Wishlist is empty")?;
    }
    for item in &items {
        writeln!(
            out,
            "{:>6}  {:<24} {}",
            item.catalog_id.to_string(),
            item.display_name,
            display_amount(item.unit_price)
        )?;
    }
    Ok(())
}
