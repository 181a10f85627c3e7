pub mod db;
pub mod reorder;
pub mod server;
pub mod services;
pub mod web;
