//! Store-compatible document types and the tally logic over them.
//!
//! The types here are serialised in a MongoDB-friendly way: ids and
//! datetimes use the database's own formats.

pub mod auth;
pub mod candidate;
pub mod mongodb;
pub mod results;
pub mod user;
pub mod vote;
pub mod voter;
