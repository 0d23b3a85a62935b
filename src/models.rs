pub mod action;
pub mod player;
pub mod role;
pub mod room;
