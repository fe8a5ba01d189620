pub mod auth;
pub mod cart;
pub mod catalog;
pub mod dashboard;
pub mod imports;
pub mod liquidations;
pub mod orders;
pub mod suppliers;
pub mod users;
