//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Command handlers mutate through one scoped transaction; query handlers
//! read through the repository ports.

pub mod handlers;
