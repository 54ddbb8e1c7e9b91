pub mod auth;
pub mod dto;
pub mod editor;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod router;
pub mod state;
pub mod ws_handler;

// Re-export the router builder so the binary only needs one import
// to assemble the web server.
pub use router::build_router;
pub use ws_handler::ws_handler;
