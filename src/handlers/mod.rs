pub mod bom;
pub mod catalogue;
pub mod common;
pub mod locations;
pub mod stock;

use crate::events::EventSender;
use crate::services::{
    bom::BomService,
    catalogue::{CatalogueService, PartNumberResolver},
    checklist::ChecklistService,
    locations::LocationService,
    stock::StockService,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalogue: Arc<CatalogueService>,
    pub locations: Arc<LocationService>,
    pub stock: Arc<StockService>,
    pub boms: Arc<BomService>,
    pub checklist: Arc<ChecklistService>,
}

impl AppServices {
    /// Wire every service onto one pool and event channel.
    ///
    /// `barcode_prefix` is the scanner prefix stripped from typed or scanned
    /// part numbers (see [`PartNumberResolver`]).
    pub fn new(
        db_pool: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        barcode_prefix: &str,
    ) -> Self {
        let parts = PartNumberResolver::new(barcode_prefix);

        Self {
            catalogue: Arc::new(CatalogueService::new(db_pool.clone(), parts.clone())),
            locations: Arc::new(LocationService::new(db_pool.clone())),
            stock: Arc::new(StockService::new(
                db_pool.clone(),
                event_sender.clone(),
                parts.clone(),
            )),
            boms: Arc::new(BomService::new(
                db_pool.clone(),
                event_sender.clone(),
                parts.clone(),
            )),
            checklist: Arc::new(ChecklistService::new(db_pool, event_sender, parts)),
        }
    }
}
