// handlers/protected/inventory/mod.rs - Stock handlers

pub mod consume; // POST /inventory/consume

pub use consume::consume_post;
