//! Address book commands.
//!
//! # Usage
//!
//! ```bash
//! cartsync address list
//! cartsync address add --name "Asha" --phone 9876543210 --street "12 MG Road" \
//!     --city Pune --state Maharashtra --pincode 411001 --type work --default
//! cartsync address default 3
//! cartsync address select 3
//! cartsync address remove 3
//! cartsync address clear
//! ```

use std::io::Write;

use clap::{Args, Subcommand};

use cartsync_client::Session;
use cartsync_core::{Address, AddressDraft, AddressId, AddressType};

use super::CliError;

#[derive(Subcommand)]
pub enum AddressAction {
    /// List saved addresses
    List,
    /// Add an address
    Add(DraftArgs),
    /// Replace the fields of an address
    Update {
        id: AddressId,
        #[command(flatten)]
        draft: DraftArgs,
    },
    /// Remove an address
    Remove { id: AddressId },
    /// Make an address the default one
    Default { id: AddressId },
    /// Select an address for delivery
    Select { id: AddressId },
    /// Forget all addresses on this device
    Clear,
}

#[derive(Args)]
pub struct DraftArgs {
    /// Recipient name
    #[arg(short, long)]
    name: String,

    /// Ten-digit phone number
    #[arg(short, long)]
    phone: String,

    /// Street address
    #[arg(long)]
    street: String,

    #[arg(long)]
    city: String,

    #[arg(long)]
    state: String,

    /// Six-digit pincode
    #[arg(long)]
    pincode: String,

    /// Address type (`home`, `work`, `other`)
    #[arg(long = "type", default_value = "home")]
    address_type: AddressType,

    /// Make this the default address
    #[arg(long)]
    default: bool,
}

impl From<DraftArgs> for AddressDraft {
    fn from(args: DraftArgs) -> Self {
        Self {
            full_name: args.name,
            phone: args.phone,
            address: args.street,
            city: args.city,
            state: args.state,
            pincode: args.pincode,
            address_type: args.address_type,
            is_default: args.default,
        }
    }
}

pub async fn run(session: &Session, action: AddressAction) -> Result<(), CliError> {
    let addresses = session.addresses();
    match action {
        AddressAction::List => {}
        AddressAction::Add(draft) => addresses.add_address(draft.into()).await?,
        AddressAction::Update { id, draft } => addresses.update_address(id, draft.into()).await?,
        AddressAction::Remove { id } => addresses.remove_address(id).await?,
        AddressAction::Default { id } => addresses.set_default(id).await?,
        AddressAction::Select { id } => addresses.select(id).await?,
        AddressAction::Clear => addresses.clear().await,
    }

    let all = addresses.addresses().await;
    let selected = addresses.selected_id().await;
    let mut out = std::io::stdout().lock();
    if all.is_empty() {
        writeln!(out, "No saved addresses")?;
    }
    for address in &all {
        writeln!(out, "{}", format_address(address, selected == Some(address.id)))?;
    }
    Ok(())
}

/// One-line summary. `>` marks the selection, `*` the default address.
fn format_address(address: &Address, selected: bool) -> String {
    format!(
        "{}{} {:>4}  {} ({}) {}, {}, {} {} [{}]",
        if selected { '>' } else { ' ' },
        if address.is_default { '*' } else { ' ' },
        address.id,
        address.full_name,
        address.phone,
        address.address,
        address.city,
        address.state,
        address.pincode,
        address.address_type,
    )
}
