use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Default capacity of the in-process event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends after a committed change; a closed channel is logged, never surfaced.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("{}", e);
        }
    }
}

/// Creates a connected sender/receiver pair.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

/// Domain events emitted after a stockroom change commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    StockAdded {
        stock_id: i32,
        part_number: String,
        location_id: i32,
        quantity: i32,
        merged: bool,
    },
    StockCheckedOut {
        stock_id: i32,
        checked_out_id: i32,
        part_number: String,
        quantity: i32,
        remaining: i32,
    },
    StockRemoved {
        stock_id: i32,
        checked_out_id: i32,
        part_number: String,
        quantity: i32,
    },
    BomCreated {
        bom_id: i32,
        name: String,
    },
    BomDeleted(i32),
    BomItemsUpdated {
        bom_id: i32,
        item_count: usize,
    },
    ChecklistGenerated {
        bom_id: i32,
        entries: usize,
    },
    PartScanned {
        bom_id: i32,
        part_number: String,
        quantity_remaining: i32,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::StockAdded { .. } => "stock_added",
            Event::StockCheckedOut { .. } => "stock_checked_out",
            Event::StockRemoved { .. } => "stock_removed",
            Event::BomCreated { .. } => "bom_created",
            Event::BomDeleted(_) => "bom_deleted",
            Event::BomItemsUpdated { .. } => "bom_items_updated",
            Event::ChecklistGenerated { .. } => "checklist_generated",
            Event::PartScanned { .. } => "part_scanned",
        }
    }
}

/// Drains the channel, logging each event, until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::StockCheckedOut {
                part_number,
                quantity,
                remaining,
                ..
            } if *remaining == 0 => {
                info!(
                    event = event.name(),
                    part_number = %part_number,
                    quantity,
                    "stock row fully checked out"
                );
            }
            Event::PartScanned {
                bom_id,
                part_number,
                quantity_remaining: 0,
            } => {
                info!(
                    event = event.name(),
                    bom_id,
                    part_number = %part_number,
                    "all required units of part scanned"
                );
            }
            _ => {
                info!(event = event.name(), payload = ?event, "Received event");
            }
        }
    }

    info!("Event processing loop stopped");
}
