pub mod call_reader;
