pub mod table_sync;
pub mod writer;
