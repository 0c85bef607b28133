/*!
 * SQLite persistence for the translation cache.
 *
 * - `connection`: thread-safe connection wrapper with async access
 * - `schema`: table definitions and versioning
 * - `cache_store`: reads and first-writer-wins inserts of cache rows
 */

pub mod cache_store;
pub mod connection;
pub mod schema;

pub use cache_store::{CacheRecord, CacheStore};
pub use connection::DatabaseConnection;
