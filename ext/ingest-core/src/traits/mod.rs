//! Read-only views over crate types

mod schema;

pub use schema::SchemaInspector;
