//! Storage adapters: the SQLite schema and statement helpers, and the
//! serializer that admits one unit of work at a time against the writer
//! connection.

pub mod serializer;
pub mod sqlite;
