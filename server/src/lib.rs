//! Arena game server: WebSocket lobby, per-room simulation tasks, and the
//! process plumbing (config, error types) around them.

pub mod config;
pub mod error;
pub mod game_controller;
pub mod listener;
pub mod room;
pub mod rooms_controller;
pub mod session;
