//! Schema migrations for the Postgres instance store.

mod runner;

pub use runner::{builtin_migrations, Migration, MigrationRunner};
