pub mod artifacts;
pub mod slack;
