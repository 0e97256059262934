// Aggregates all former standalone integration tests as modules.
mod chat;
mod server;
