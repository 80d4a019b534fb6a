pub mod basket;
pub mod chart;
pub mod context;
pub mod events;
pub mod summary;
