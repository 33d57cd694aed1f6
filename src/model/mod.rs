pub mod api;
pub mod client;
pub mod server;

pub use client::ClientCommand;
pub use server::ServerMessage;
