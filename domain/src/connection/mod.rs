//! Connection-level value objects: who the client is, which channels it
//! talks on, and how far its gateway has come.

pub mod channels;
pub mod identity;
pub mod state;
