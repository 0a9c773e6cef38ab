//! # Predica
//!
//! Avaliador de expressões booleanas cujas folhas são julgadas por um
//! predicado assíncrono.
//!
//! Expressões combinam operandos com `and`, `or` e `not`. A avaliação chama
//! o predicado no máximo uma vez por operando distinto, interrompe um
//! combinador assim que o resultado dele está decidido e memoiza os
//! resultados entre chamadas.
//!
//! ```no_run
//! use predica::{Expression, ExpressionEvaluator, Operand, PredicateInvoker};
//!
//! # async fn run() -> predica::PredicaResult<()> {
//! let evaluator = ExpressionEvaluator::new(PredicateInvoker::direct(|op: Operand| async move {
//!     Ok::<_, std::io::Error>(op.as_f64().is_some_and(|n| n % 2.0 == 0.0))
//! }));
//!
//! let expression: Expression<Operand> = serde_json::from_str(r#"{"or": [1, 2, 3]}"#)?;
//! assert!(evaluator.execute(&expression).await?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Módulos
//!
//! - [`evaluator`] - Validação, invocação do predicado e avaliação
//! - [`cache`] - Cache de resultados por operando
//! - [`types`] - Expressões, configuração e erros
//! - `cli` - Interface de linha de comando (feature `cli`)

pub mod cache;
#[cfg(feature = "cli")]
pub mod cli;
pub mod evaluator;
pub mod types;

pub use cache::CacheStats;
pub use evaluator::{
    CallingConvention, Completion, ConcurrencyLimiter, ExpressionEvaluator, ExpressionValidator,
    Predicate, PredicateInvoker,
};
pub use types::config::Config;
pub use types::errors::{PredicaError, PredicaResult, PredicateError, ValidationError};
pub use types::expression::{Combinator, Expression, Operand, Scalar};
