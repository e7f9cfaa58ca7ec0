// Wire protocol for the festa realtime chat backend.

pub mod chat;
pub mod topics;
pub mod ws;
