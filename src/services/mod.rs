pub mod bom;
pub mod catalogue;
pub mod checklist;
pub mod locations;
pub mod stock;
