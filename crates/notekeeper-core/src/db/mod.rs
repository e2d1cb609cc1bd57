//! Database layer backing the local record store

mod connection;
mod migrations;

pub use connection::Database;
