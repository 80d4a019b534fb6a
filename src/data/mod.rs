pub mod broker;
pub mod reader;
pub mod types;
