pub mod caller;
pub mod connection;
