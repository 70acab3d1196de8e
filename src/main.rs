use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, Instrument};

use grower_direct::app_system::{setup_tracing, OrderSystem};
use grower_direct::cli::{Args, Command, OrderFields};
use grower_direct::clients::SessionClient;
use grower_direct::config::ConfigLoader;
use grower_direct::domain::{Coordinate, DeliveryMethod, Product, Unit};
use grower_direct::pricing::{format_usd, parse_quantity, quote, PricingInput};
use grower_direct::session_actor::{SessionState, SessionView};

const DISTANCE_WAIT: Duration = Duration::from_secs(20);

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.with_file(path);
    }
    let config = loader.load()?;

    // Setup tracing once for the entire application
    setup_tracing(args.log_level.as_deref().unwrap_or(&config.logging.level));

    let command = match args.command {
        Command::Quote { product, quantity, unit, miles } => {
            print_quote(product, &quantity, unit, miles);
            return Ok(());
        }
        command => command,
    };

    execute(OrderSystem::from_config(&config)?, command).await
}

/// Runs one command against the system, then shuts the system down
/// whether or not the command succeeded.
async fn execute(system: OrderSystem, command: Command) -> Result<()> {
    let result = run(&system, command).await;

    // Shutdown system gracefully
    system.shutdown().await.map_err(anyhow::Error::msg)?;
    result
}

async fn run(system: &OrderSystem, command: Command) -> Result<()> {
    match command {
        Command::Quote { .. } => unreachable!("quotes are priced without starting the order system"),
        Command::Inventory => {
            let inventory = system.inventory().await;
            for product in Product::ALL {
                println!("{:<8} {}", product, inventory.label_for(product));
            }
            Ok(())
        }
        Command::Status { follow } => status(&system.session_client, follow).await,
        Command::Submit(fields) => {
            let span = tracing::info_span!("order_submission");
            submit(&system.session_client, fields).instrument(span).await
        }
        Command::NewOrder => {
            let view = system.session_client.start_new_order().await?;
            println!("Ready for a new order ({})", view.state.name());
            Ok(())
        }
    }
}

fn print_quote(product: Product, quantity: &str, unit: Unit, miles: Option<f64>) {
    let breakdown = quote(&PricingInput {
        product: Some(product),
        quantity: parse_quantity(quantity),
        unit,
        delivery_method: if miles.is_some() { DeliveryMethod::Delivered } else { DeliveryMethod::Pickup },
        distance_miles: miles,
    });
    println!("Product subtotal: {}", format_usd(breakdown.product_subtotal));
    println!("Delivery fee:     {}", format_usd(breakdown.delivery_fee));
    println!("Grand total:      {}", format_usd(breakdown.grand_total));
}

fn print_view(view: &SessionView) {
    let draft = &view.draft;
    println!("State: {}", view.state.name());
    if !draft.full_name().is_empty() {
        println!("Customer: {} <{}> {}", draft.full_name(), draft.email, draft.phone);
    }
    if let Some(product) = draft.product {
        let quantity = draft.quantity.map(|q| q.to_string()).unwrap_or_else(|| "?".to_string());
        println!("Order: {} x {} {} ({})", quantity, draft.unit, product, draft.delivery_method);
    }
    if let Some(miles) = view.distance.miles() {
        println!("Distance: {miles} mi");
    }
    println!("Estimated total: {}", format_usd(view.breakdown.grand_total));
    match &view.blocker {
        Some(blocker) => println!("Cannot submit: {blocker}"),
        None => {
            let missing = draft.missing_fields();
            if !missing.is_empty() {
                println!("Still needed: {}", missing.join(", "));
            }
        }
    }
}

async fn status(session: &SessionClient, follow: bool) -> Result<()> {
    let view = session.view().await?;
    if let SessionState::Cooldown { record, .. } = &view.state {
        println!(
            "Last order placed {} for {}",
            record.completed_at.format("%Y-%m-%d %H:%M:%S UTC"),
            format_usd(record.grand_total)
        );
    } else {
        print_view(&view);
    }

    let mut countdown = session.countdown();
    loop {
        let current = *countdown.borrow_and_update();
        let Some(current) = current else { break };
        if current.new_order_available {
            println!("A new order can be started now");
            break;
        }
        println!("New order available in {}s", current.remaining.as_secs());
        if !follow || countdown.changed().await.is_err() {
            break;
        }
    }
    Ok(())
}

async fn submit(session: &SessionClient, fields: OrderFields) -> Result<()> {
    for (field, value) in fields.edits() {
        session.update_field(field, value).await?;
    }

    let destination = fields.longitude.zip(fields.latitude).map(|(lon, lat)| Coordinate::new(lon, lat));
    match (&fields.address, destination) {
        (Some(address), _) => {
            session.select_place(address.clone(), destination).await?;
        }
        (None, Some(_)) => {
            session.set_destination(destination).await?;
        }
        (None, None) => {}
    }

    let view = tokio::time::timeout(DISTANCE_WAIT, wait_for_distance(session))
        .await
        .context("Timed out waiting for the delivery distance")??;
    print_view(&view);
    if let Some(blocker) = view.blocker {
        bail!("Order cannot be submitted: {blocker}");
    }

    info!("Submitting order");
    let confirmation = session.submit().await?;
    println!("Order received, total {}", format_usd(confirmation.record.grand_total));
    if let Some(warning) = confirmation.receipt.warning {
        println!("Note: {warning}");
    }
    Ok(())
}

async fn wait_for_distance(session: &SessionClient) -> Result<SessionView> {
    loop {
        let view = session.view().await?;
        if !view.distance.is_calculating() {
            return Ok(view);
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}
