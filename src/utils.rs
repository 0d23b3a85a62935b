pub mod config;
pub mod websocket;
