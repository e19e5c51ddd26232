//! Persistence layer
//!
//! Plain sqlx queries grouped per aggregate. Every function takes the pool
//! explicitly; nothing in here reaches for ambient connection state.

pub mod documents;
pub mod projects;
pub mod users;
