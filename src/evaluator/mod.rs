//! Avaliação de expressões booleanas com predicado assíncrono.
//!
//! - [`ExpressionValidator`] confere a gramática antes da avaliação
//! - [`PredicateInvoker`] normaliza as convenções de chamada do predicado
//! - [`ConcurrencyLimiter`] limita o fan-out dos irmãos de `and`/`or`
//! - [`ExpressionEvaluator`] percorre a árvore com curto-circuito

mod engine;
mod invoker;
mod limiter;
mod validator;

pub use engine::ExpressionEvaluator;
pub use invoker::{CallingConvention, Completion, Predicate, PredicateFuture, PredicateInvoker};
pub use limiter::ConcurrencyLimiter;
pub use validator::ExpressionValidator;
