pub mod call_writer;
pub mod record_reader;
pub mod rows;
pub mod update_writer;
