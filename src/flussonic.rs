//! Flussonic API access.
//!
//! - [`StatSource`]: the three statistics fetches a scrape cycle needs
//! - [`FlussonicClient`]: HTTP implementation with basic auth and a
//!   per-request timeout
//! - payload types for the server, media and sessions endpoints

mod client;
mod source;
mod types;

pub use client::FlussonicClient;
pub use source::{ApiMethod, FetchError, StatSource};
pub use types::{
    ApiResponse, DVR_SESSION_MARKER, Media, MediaSessions, NOT_FOUND, ServerInfo, Sessions,
    Stream, StreamOptions, StreamStats,
};
