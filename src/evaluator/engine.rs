//! Avaliador de expressões booleanas assíncronas.
//!
//! Percorre a árvore aplicando curto-circuito em `and`/`or`, negação em
//! `not` e resolvendo as folhas pelo cache de resultados.

use std::future::Future;
use std::hash::Hash;
use std::sync::{PoisonError, RwLock};

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use crate::cache::{CacheStats, ResultCache};
use crate::types::config::EvaluatorConfig;
use crate::types::errors::ValidationError;
use crate::types::expression::{Combinator, Expression, Operand};
use crate::{PredicaError, PredicaResult};

use super::invoker::PredicateInvoker;
use super::limiter::ConcurrencyLimiter;
use super::validator::ExpressionValidator;

/// Avaliador de expressões.
///
/// Estado compartilhado: o predicado (guardado junto do cache), o limite de
/// concorrência e o cache. Todos podem ser alterados com `&self`, então um
/// único avaliador pode ser usado por várias tarefas via `Arc`.
///
/// Trocar o predicado limpa o cache. Avaliações em andamento que ainda não
/// chegaram às folhas passam a usar o predicado novo.
pub struct ExpressionEvaluator<T> {
    cache: ResultCache<T>,
    limiter: RwLock<ConcurrencyLimiter>,
}

impl<T> ExpressionEvaluator<T>
where
    T: Clone + Eq + Hash + Send + Sync + 'static,
{
    /// Cria um avaliador com limite de concorrência 1.
    pub fn new(predicate: PredicateInvoker<T>) -> Self {
        Self {
            cache: ResultCache::new(predicate),
            limiter: RwLock::new(ConcurrencyLimiter::default()),
        }
    }

    /// Cria um avaliador a partir da configuração.
    pub fn from_config(config: &EvaluatorConfig, predicate: PredicateInvoker<T>) -> PredicaResult<Self> {
        let limiter = ConcurrencyLimiter::new(config.concurrency_limit)?;
        Ok(Self {
            cache: ResultCache::new(predicate),
            limiter: RwLock::new(limiter),
        })
    }

    /// Retorna o predicado atual.
    pub fn predicate(&self) -> PredicateInvoker<T> {
        self.cache.invoker()
    }

    /// Troca o predicado e limpa o cache.
    pub fn set_predicate(&self, predicate: PredicateInvoker<T>) {
        self.cache.reset(predicate);
    }

    /// Limite de concorrência por combinador.
    pub fn concurrency_limit(&self) -> usize {
        self.limiter().limit()
    }

    /// Altera o limite de concorrência.
    ///
    /// Falha com [`PredicaError::Config`] se o limite for zero.
    pub fn set_concurrency_limit(&self, limit: usize) -> PredicaResult<()> {
        let limiter = ConcurrencyLimiter::new(limit)?;
        *self.limiter.write().unwrap_or_else(PoisonError::into_inner) = limiter;
        tracing::debug!(limit, "Concurrency limit updated");
        Ok(())
    }

    fn limiter(&self) -> ConcurrencyLimiter {
        *self.limiter.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Limpa o cache sem alterar predicado nem limite.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Retorna estatísticas do cache.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Valida a estrutura da expressão.
    pub fn validate_expression(&self, expression: &Expression<T>) -> Result<bool, ValidationError> {
        ExpressionValidator::validate(expression)
    }

    /// Avalia a expressão sem validá-la antes.
    pub fn evaluate_expression<'a>(
        &'a self,
        expression: &'a Expression<T>,
    ) -> BoxFuture<'a, PredicaResult<bool>> {
        async move {
            match expression {
                Expression::Operand(operand) => self.cache.get_or_invoke(operand).await,
                Expression::Not(inner) => Ok(!self.evaluate_expression(inner).await?),
                Expression::And(children) => self.evaluate_siblings(Combinator::And, children).await,
                Expression::Or(children) => self.evaluate_siblings(Combinator::Or, children).await,
            }
        }
        .boxed()
    }

    async fn evaluate_siblings<'a>(
        &'a self,
        combinator: Combinator,
        children: &'a [Expression<T>],
    ) -> PredicaResult<bool> {
        let limiter = self.limiter();
        limiter
            .run(combinator, children, |child| self.evaluate_expression(child))
            .await
    }

    /// Valida e depois avalia a expressão.
    ///
    /// Uma expressão inválida falha antes de qualquer chamada ao predicado.
    /// O future é preguiçoso: o [`ValidationError`] só aparece no primeiro
    /// poll. Para falhar já na chamada, use [`execute_with`](Self::execute_with)
    /// ou [`validate_expression`](Self::validate_expression) antes.
    pub async fn execute(&self, expression: &Expression<T>) -> PredicaResult<bool> {
        self.validate_expression(expression)?;

        let execution_id = Uuid::new_v4();
        let span = tracing::debug_span!("execute", %execution_id);
        let result = self.evaluate_expression(expression).instrument(span.clone()).await;

        span.in_scope(|| match &result {
            Ok(value) => tracing::debug!(result = value, "Expression evaluated"),
            Err(e) => tracing::debug!(error = %e, "Expression failed"),
        });

        result
    }

    /// Versão com callback de [`execute`](Self::execute).
    ///
    /// A validação acontece na chamada: uma expressão inválida retorna
    /// `Err` antes de existir qualquer future. O callback recebe
    /// `(erro, resultado)`.
    pub fn execute_with<'a, C>(
        &'a self,
        expression: &'a Expression<T>,
        callback: C,
    ) -> Result<impl Future<Output = ()> + Send + 'a, ValidationError>
    where
        C: FnOnce(Option<PredicaError>, Option<bool>) + Send + 'a,
    {
        self.validate_expression(expression)?;
        Ok(self.evaluate_with(expression, callback))
    }

    /// Versão com callback de [`evaluate_expression`](Self::evaluate_expression).
    pub fn evaluate_with<'a, C>(
        &'a self,
        expression: &'a Expression<T>,
        callback: C,
    ) -> impl Future<Output = ()> + Send + 'a
    where
        C: FnOnce(Option<PredicaError>, Option<bool>) + Send + 'a,
    {
        let pending = self.evaluate_expression(expression);
        async move {
            match pending.await {
                Ok(value) => callback(None, Some(value)),
                Err(e) => callback(Some(e), None),
            }
        }
    }
}

impl ExpressionEvaluator<Operand> {
    /// Valida um nó na codificação JSON.
    pub fn validate_json(&self, value: &Value) -> Result<bool, ValidationError> {
        ExpressionValidator::validate_json(value)
    }

    /// Valida e avalia uma expressão na codificação JSON.
    ///
    /// Objetos e arrays usados como operandos ganham uma identidade nova a
    /// cada chamada; para compartilhar o cache entre chamadas, construa a
    /// árvore com [`Expression::from_json`] e reutilize os operandos.
    pub async fn execute_json(&self, value: &Value) -> PredicaResult<bool> {
        let expression = Expression::from_json(value)?;
        self.execute(&expression).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fmt;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Debug)]
    struct NotANumber;

    impl fmt::Display for NotANumber {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "Input must be castable to Number")
        }
    }

    impl std::error::Error for NotANumber {}

    type Calls = Arc<Mutex<HashMap<Operand, usize>>>;

    fn is_even(calls: Calls) -> PredicateInvoker<Operand> {
        PredicateInvoker::direct(move |operand: Operand| {
            *calls.lock().unwrap().entry(operand.clone()).or_default() += 1;
            async move {
                tokio::time::sleep(Duration::from_millis(1)).await;
                match operand.as_f64() {
                    Some(n) => Ok(n % 2.0 == 0.0),
                    None => Err(NotANumber),
                }
            }
        })
    }

    fn evaluator() -> (ExpressionEvaluator<Operand>, Calls) {
        let calls = Calls::default();
        (ExpressionEvaluator::new(is_even(Arc::clone(&calls))), calls)
    }

    fn count(calls: &Calls, operand: impl Into<Operand>) -> usize {
        calls.lock().unwrap().get(&operand.into()).copied().unwrap_or(0)
    }

    fn expr(value: Value) -> Expression<Operand> {
        Expression::from_json(&value).unwrap()
    }

    #[tokio::test]
    async fn test_single_operand() {
        let (evaluator, _) = evaluator();

        assert!(evaluator.execute(&expr(serde_json::json!(2))).await.unwrap());
        assert!(!evaluator.execute(&expr(serde_json::json!(1))).await.unwrap());
        assert!(evaluator.execute(&expr(serde_json::json!({"not": 1}))).await.unwrap());
    }

    #[tokio::test]
    async fn test_or_short_circuits() {
        let (evaluator, calls) = evaluator();

        assert!(evaluator
            .execute(&expr(serde_json::json!({"or": [1, 2, 3]})))
            .await
            .unwrap());
        assert_eq!(count(&calls, 3), 0);
    }

    #[tokio::test]
    async fn test_and_short_circuits() {
        let (evaluator, calls) = evaluator();

        assert!(!evaluator
            .execute(&expr(serde_json::json!({"and": [2, 3, 6]})))
            .await
            .unwrap());
        assert_eq!(count(&calls, 6), 0);
    }

    #[tokio::test]
    async fn test_repeated_operand_invoked_once() {
        let (evaluator, calls) = evaluator();

        let result = evaluator
            .execute(&expr(serde_json::json!({"and": [2, {"not": {"and": [2, 4]}}]})))
            .await
            .unwrap();

        assert!(!result);
        assert_eq!(count(&calls, 2), 1);
    }

    #[tokio::test]
    async fn test_predicate_error_propagates() {
        let (evaluator, _) = evaluator();

        let err = evaluator
            .execute(&expr(serde_json::json!({"and": [2, "a"]})))
            .await
            .unwrap_err();

        assert!(err.predicate_error::<NotANumber>().is_some());
    }

    #[tokio::test]
    async fn test_validation_happens_before_invocation() {
        let (evaluator, calls) = evaluator();
        let invalid = Expression::And(vec![Expression::operand(Operand::from(2))]);

        let err = evaluator.execute(&invalid).await.unwrap_err();

        assert!(matches!(err, PredicaError::Validation(_)));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_predicate_clears_cache() {
        let (evaluator, calls) = evaluator();
        let two = expr(serde_json::json!(2));

        assert!(evaluator.execute(&two).await.unwrap());
        assert_eq!(evaluator.cache_stats().size, 1);

        let new_calls = Calls::default();
        evaluator.set_predicate(is_even(Arc::clone(&new_calls)));

        assert_eq!(evaluator.cache_stats().size, 0);
        assert!(evaluator.execute(&two).await.unwrap());
        assert_eq!(count(&calls, 2), 1);
        assert_eq!(count(&new_calls, 2), 1);
    }

    #[tokio::test]
    async fn test_clear_cache_keeps_configuration() {
        let (evaluator, calls) = evaluator();
        evaluator.set_concurrency_limit(4).unwrap();
        let two = expr(serde_json::json!(2));

        evaluator.execute(&two).await.unwrap();
        evaluator.clear_cache();
        evaluator.execute(&two).await.unwrap();

        assert_eq!(count(&calls, 2), 2);
        assert_eq!(evaluator.concurrency_limit(), 4);
    }

    #[test]
    fn test_concurrency_limit_validation() {
        let (evaluator, _) = evaluator();

        assert_eq!(evaluator.concurrency_limit(), 1);
        assert!(matches!(
            evaluator.set_concurrency_limit(0),
            Err(PredicaError::Config(_))
        ));
        assert_eq!(evaluator.concurrency_limit(), 1);

        evaluator.set_concurrency_limit(5).unwrap();
        assert_eq!(evaluator.concurrency_limit(), 5);
    }

    #[test]
    fn test_from_config() {
        let calls = Calls::default();
        let evaluator =
            ExpressionEvaluator::from_config(&EvaluatorConfig::new(3), is_even(calls)).unwrap();
        assert_eq!(evaluator.concurrency_limit(), 3);

        let calls = Calls::default();
        assert!(ExpressionEvaluator::from_config(&EvaluatorConfig::new(0), is_even(calls)).is_err());
    }

    #[tokio::test]
    async fn test_execute_with_callback() {
        let (evaluator, _) = evaluator();
        let expression = expr(serde_json::json!({"or": [1, 2]}));
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);

        evaluator
            .execute_with(&expression, move |err, result| {
                *sink.lock().unwrap() = Some((err.is_none(), result));
            })
            .unwrap()
            .await;

        assert_eq!(*seen.lock().unwrap(), Some((true, Some(true))));
    }

    #[tokio::test]
    async fn test_execute_with_callback_failure() {
        let (evaluator, _) = evaluator();
        let expression = expr(serde_json::json!({"or": [1, "a"]}));
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);

        evaluator
            .execute_with(&expression, move |err, result| {
                let is_nan = err.map(|e| e.predicate_error::<NotANumber>().is_some());
                *sink.lock().unwrap() = Some((is_nan, result));
            })
            .unwrap()
            .await;

        assert_eq!(*seen.lock().unwrap(), Some((Some(true), None)));
    }

    #[tokio::test]
    async fn test_execute_validates_on_first_poll() {
        let (evaluator, calls) = evaluator();
        let invalid = Expression::Or(vec![Expression::operand(Operand::from(1))]);

        let pending = evaluator.execute(&invalid);
        assert!(evaluator.execute_with(&invalid, |_, _| {}).is_err());

        assert!(matches!(pending.await, Err(PredicaError::Validation(_))));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_execute_with_rejects_invalid_synchronously() {
        let (evaluator, _) = evaluator();
        let invalid = Expression::Or(vec![Expression::operand(Operand::from(1))]);

        let outcome = evaluator.execute_with(&invalid, |_, _| {});
        assert!(outcome.is_err());
    }

    #[tokio::test]
    async fn test_execute_json() {
        let (evaluator, _) = evaluator();

        assert!(evaluator
            .execute_json(&serde_json::json!({"and": [2, {"or": [3, 4]}]}))
            .await
            .unwrap());
        assert!(matches!(
            evaluator
                .execute_json(&serde_json::json!({"object": "one", "or": "something"}))
                .await,
            Err(PredicaError::Validation(ValidationError::OperandsNotSequence { .. }))
        ));
    }
}
