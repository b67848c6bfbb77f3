pub mod core;
pub mod events;
pub mod execution;
pub mod mapping;
pub mod records;
