pub mod error;
pub mod game_service;
pub mod room_service;
