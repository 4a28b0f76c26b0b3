pub mod schema;

pub use schema::{InMemorySchemaProvider, SchemaError, SchemaProvider};
