//! sea-orm entities for the stockroom schema.
//!
//! Table layout is owned by the `migrations` crate; keep the two in step.

pub mod bom;
pub mod bom_checklist;
pub mod bom_item;
pub mod brand;
pub mod catalogue;
pub mod checked_out_stock;
pub mod location;
pub mod stock;
