// Prompt document store: CRUD over Postgres plus in-text search.
// Documents are the inputs to the upgrade module; nothing here calls the provider.

pub mod handlers;
pub mod search;
pub mod store;
