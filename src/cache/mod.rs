//! Cache de resultados do predicado.
//!
//! Este módulo memoiza o resultado assíncrono do predicado por
//! identidade de operando, garantindo no máximo uma invocação por
//! operando durante a vida do cache.

mod results;

pub use results::{CacheStats, ResultCache, SharedResult};
