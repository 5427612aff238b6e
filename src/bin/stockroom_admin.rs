//! Operator tooling: apply migrations, load the sample dataset, mint tokens.
//!
//! Reads the same configuration as the server (`config/`, `APP__*`).

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal_macros::dec;
use stockroom_api::{
    auth::{AuthConfig, AuthService},
    config::{self, AppConfig},
    db,
    events::{self, EventSender},
    services::{
        bom::{BomItemEdit, BomItemsBatch, BomService},
        catalogue::{CatalogueEntryFields, CatalogueService, NewCatalogueEntry, PartNumberResolver},
        locations::LocationService,
        stock::{AddStock, StockService},
    },
};
use tracing::info;

const SEED_USER: &str = "seed";

#[derive(Parser)]
#[command(name = "stockroom-admin", about = "Stockroom operator commands", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Load the sample locations, catalogue, BOMs and stock into an empty database
    Seed,
    /// Print a bearer token for USERNAME signed with the configured secret
    Token {
        username: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config().context("loading configuration")?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    match cli.command {
        Commands::Migrate => {
            let pool = db::establish_connection_from_app_config(&cfg).await?;
            db::run_migrations(&pool).await?;
            db::close_pool(pool).await?;
            println!("Migrations applied");
        }
        Commands::Seed => seed(&cfg).await?,
        Commands::Token { username } => {
            let auth = AuthService::new(AuthConfig::from(&cfg));
            let token = auth
                .issue_token(&username)
                .context("failed to issue token")?;
            println!("{}", token);
        }
    }

    Ok(())
}

async fn seed(cfg: &AppConfig) -> Result<()> {
    let pool = Arc::new(db::establish_connection_from_app_config(cfg).await?);
    db::run_migrations(&pool).await?;

    let (sender, rx) = events::channel(events::EVENT_CHANNEL_CAPACITY);
    let event_sender = Arc::new(sender);
    let consumer = tokio::spawn(events::process_events(rx));

    let seeded = seed_dataset(pool.clone(), event_sender.clone(), &cfg.barcode_prefix).await;

    drop(event_sender);
    consumer.await.context("event consumer panicked")?;

    match seeded? {
        true => println!("Sample data loaded"),
        false => println!("Catalogue already has brands; nothing seeded"),
    }
    Ok(())
}

/// Returns `false` when the database already holds data.
async fn seed_dataset(
    pool: Arc<db::DbPool>,
    event_sender: Arc<EventSender>,
    barcode_prefix: &str,
) -> Result<bool> {
    let parts = PartNumberResolver::new(barcode_prefix);
    let catalogue = CatalogueService::new(pool.clone(), parts.clone());
    let locations = LocationService::new(pool.clone());
    let stock = StockService::new(pool.clone(), event_sender.clone(), parts.clone());
    let boms = BomService::new(pool, event_sender, parts);

    if !catalogue.list_brands().await?.is_empty() {
        return Ok(false);
    }

    let mut location_ids = Vec::new();
    for name in ["Loc-01-01", "Loc-01-02", "Loc-01-03", "Loc-01-04"] {
        location_ids.push(locations.create_location(name).await?.id);
    }
    info!(count = location_ids.len(), "Seeded locations");

    let sick = catalogue.create_brand("Sick").await?;

    catalogue
        .create_entry(
            NewCatalogueEntry {
                part_number: "1042033".to_string(),
                fields: CatalogueEntryFields {
                    brand_id: sick.brand_id,
                    category: Some("Photoelectric sensors".to_string()),
                    description: Some("Photoelectric proximity sensor".to_string()),
                    vendor_description: Some(
                        "Photoelectric proximity sensor. Type: W4S-3. Sensing range 4mm - 180mm. \
                         PinPoint LED. PNP. M8, 4-pin. Adjustment: I/O Link with single \
                         teach-in button.\nWTB4SC-3P2262A00"
                            .to_string(),
                    ),
                    purchase_unit_cost_eur: Some(dec!(122.40)),
                    sale_unit_cost_eur: Some(dec!(174.86)),
                    notes: Some(
                        "Upgraded I/O Link version used for Teleflex Mexico & Limerick".to_string(),
                    ),
                    url: None,
                },
            },
            Some(SEED_USER.to_string()),
        )
        .await?;

    catalogue
        .create_entry(
            NewCatalogueEntry {
                part_number: "1050710".to_string(),
                fields: CatalogueEntryFields {
                    brand_id: sick.brand_id,
                    category: Some("Photoelectric sensors".to_string()),
                    description: Some("Photoelectric proximity sensor".to_string()),
                    vendor_description: Some(
                        "Photoelectric proximity sensor. Type: GTE6-P4211. Sensing range <250mm. \
                         PinPoint LED. PNP. M8, 4-pin. Adjustment: Mechanical spindle."
                            .to_string(),
                    ),
                    purchase_unit_cost_eur: Some(dec!(48.00)),
                    sale_unit_cost_eur: Some(dec!(69.00)),
                    notes: Some(
                        "Sensors used on original Pouch Detection. Sensitivity could be adjusted \
                         by operators and was therefore upgraded to I/O Link version."
                            .to_string(),
                    ),
                    url: None,
                },
            },
            Some(SEED_USER.to_string()),
        )
        .await?;
    info!("Seeded catalogue");

    for (name, part_number, quantity) in [
        ("Danone Filtration System", "1042033", 1),
        ("J&J Assembly Line", "1050710", 3),
    ] {
        let bom = boms.create_bom(name, Some(SEED_USER.to_string())).await?;
        boms.edit_items(
            bom.bom_id,
            BomItemsBatch {
                items: vec![BomItemEdit {
                    id: None,
                    part_number: part_number.to_string(),
                    quantity,
                    delete: false,
                }],
            },
            Some(SEED_USER.to_string()),
        )
        .await?;
    }
    info!("Seeded BOMs");

    stock
        .add_stock(
            AddStock {
                part_number: "1042033".to_string(),
                location_id: location_ids[0],
                quantity: 3,
                comment: Some("Ships out 2024-01-01".to_string()),
            },
            Some(SEED_USER.to_string()),
        )
        .await?;
    info!("Seeded stock");

    Ok(true)
}
