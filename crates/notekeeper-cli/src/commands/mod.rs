pub mod add;
pub mod common;
pub mod config;
pub mod delete;
pub mod edit;
pub mod list;
pub mod logout;
pub mod messages;
pub mod purge;
pub mod sync;
