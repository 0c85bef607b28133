/*!
 * Translation layer between the document pipeline and the providers.
 *
 * - `chunker`: packs pending segments into provider-sized requests
 * - `cache`: content-addressed translation cache
 * - `rate_limit`: per-provider request budget shared across jobs
 * - `client`: retrying, caching provider client
 * - `prompts`: domain instructions and batch markers for LLM providers
 */

pub use self::cache::{CacheEntry, CacheKey, CacheStats, TranslationCache};
pub use self::chunker::{ChunkRequest, Chunker};
pub use self::client::{ChunkOutcome, RetryPolicy, RetryState, RetryingClient, SegmentOutcome};
pub use self::rate_limit::{ProviderProfile, RateLimiter};

pub mod cache;
pub mod chunker;
pub mod client;
pub mod prompts;
pub mod rate_limit;
