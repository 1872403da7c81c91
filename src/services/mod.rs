pub mod analysis;
pub mod events;
