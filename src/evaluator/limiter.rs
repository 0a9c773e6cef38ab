//! Fan-out limitado dos irmãos de um nó `and`/`or`.

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};

use crate::types::config::validate_concurrency_limit;
use crate::types::expression::Combinator;
use crate::PredicaResult;

/// Limita quantos irmãos de um mesmo combinador são avaliados ao mesmo
/// tempo.
///
/// Os irmãos são iniciados da esquerda para a direita. Assim que um deles
/// decide o combinador (`false` num `and`, `true` num `or`), os que ainda
/// não começaram nunca começam e os que estão em andamento são
/// descartados; o resultado ou a falha deles não aparece mais.
///
/// Descartar um irmão em andamento não cancela a invocação do predicado
/// por trás dele: o future compartilhado segue no
/// [`ResultCache`](crate::cache::ResultCache), suspenso, e só é liberado
/// quando o cache é limpo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcurrencyLimiter {
    limit: usize,
}

impl ConcurrencyLimiter {
    /// Cria um limitador. O limite precisa ser positivo.
    pub fn new(limit: usize) -> PredicaResult<Self> {
        validate_concurrency_limit(limit)?;
        Ok(Self { limit })
    }

    /// Número máximo de irmãos em andamento.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Avalia `siblings` com `step`, respeitando o limite.
    ///
    /// A primeira falha observada antes de uma decisão encerra o nó com
    /// essa falha.
    pub async fn run<'a, S, F>(
        &self,
        combinator: Combinator,
        siblings: &'a [S],
        mut step: F,
    ) -> PredicaResult<bool>
    where
        F: FnMut(&'a S) -> BoxFuture<'a, PredicaResult<bool>>,
    {
        let decisive = combinator.decisive();
        let mut waiting = siblings.iter().enumerate();
        let mut in_flight = FuturesUnordered::new();

        for (index, sibling) in waiting.by_ref().take(self.limit) {
            tracing::trace!(%combinator, index, "Starting sibling");
            in_flight.push(step(sibling));
        }

        while let Some(outcome) = in_flight.next().await {
            if outcome? == decisive {
                tracing::debug!(
                    %combinator,
                    result = decisive,
                    abandoned = in_flight.len(),
                    never_started = waiting.len(),
                    "Short-circuit"
                );
                return Ok(decisive);
            }

            if let Some((index, sibling)) = waiting.next() {
                tracing::trace!(%combinator, index, "Starting sibling");
                in_flight.push(step(sibling));
            }
        }

        Ok(!decisive)
    }
}

impl Default for ConcurrencyLimiter {
    fn default() -> Self {
        Self { limit: 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PredicaError;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Irmão de teste: valor, latência e se falha.
    #[derive(Clone, Copy)]
    struct Sibling {
        value: bool,
        delay_ms: u64,
        fails: bool,
    }

    fn ok(value: bool, delay_ms: u64) -> Sibling {
        Sibling {
            value,
            delay_ms,
            fails: false,
        }
    }

    fn failing(delay_ms: u64) -> Sibling {
        Sibling {
            value: false,
            delay_ms,
            fails: true,
        }
    }

    #[derive(Default)]
    struct Probe {
        started: Mutex<Vec<usize>>,
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    async fn run_probe(
        limit: usize,
        combinator: Combinator,
        siblings: &[Sibling],
        probe: &Arc<Probe>,
    ) -> PredicaResult<bool> {
        let limiter = ConcurrencyLimiter::new(limit).unwrap();
        let index_of = |s: &Sibling| siblings.iter().position(|o| std::ptr::eq(o, s)).unwrap();

        limiter
            .run(combinator, siblings, |sibling| {
                let probe = Arc::clone(probe);
                let index = index_of(sibling);
                let sibling = *sibling;
                async move {
                    probe.started.lock().unwrap().push(index);
                    let now = probe.active.fetch_add(1, Ordering::SeqCst) + 1;
                    probe.max_active.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(sibling.delay_ms)).await;
                    probe.active.fetch_sub(1, Ordering::SeqCst);
                    if sibling.fails {
                        return Err(PredicaError::invocation(format!("sibling {} failed", index)));
                    }
                    Ok(sibling.value)
                }
                .boxed()
            })
            .await
    }

    #[test]
    fn test_zero_limit_is_rejected() {
        assert!(matches!(
            ConcurrencyLimiter::new(0),
            Err(PredicaError::Config(_))
        ));
        assert_eq!(ConcurrencyLimiter::default().limit(), 1);
    }

    #[tokio::test]
    async fn test_and_all_true() {
        let probe = Arc::new(Probe::default());
        let siblings = [ok(true, 1), ok(true, 1), ok(true, 1)];

        assert!(run_probe(1, Combinator::And, &siblings, &probe).await.unwrap());
        assert_eq!(*probe.started.lock().unwrap(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_and_stops_at_first_false() {
        let probe = Arc::new(Probe::default());
        let siblings = [ok(true, 1), ok(false, 1), ok(true, 1)];

        assert!(!run_probe(1, Combinator::And, &siblings, &probe).await.unwrap());
        assert_eq!(*probe.started.lock().unwrap(), vec![0, 1]);
    }

    #[tokio::test]
    async fn test_or_stops_at_first_true() {
        let probe = Arc::new(Probe::default());
        let siblings = [ok(false, 1), ok(true, 1), ok(false, 1)];

        assert!(run_probe(1, Combinator::Or, &siblings, &probe).await.unwrap());
        assert_eq!(*probe.started.lock().unwrap(), vec![0, 1]);
    }

    #[tokio::test]
    async fn test_or_all_false() {
        let probe = Arc::new(Probe::default());
        let siblings = [ok(false, 1), ok(false, 1)];

        assert!(!run_probe(3, Combinator::Or, &siblings, &probe).await.unwrap());
    }

    #[tokio::test]
    async fn test_limit_bounds_in_flight_siblings() {
        let probe = Arc::new(Probe::default());
        let siblings = [ok(true, 10); 8];

        assert!(run_probe(3, Combinator::And, &siblings, &probe).await.unwrap());
        assert_eq!(probe.max_active.load(Ordering::SeqCst), 3);
        assert_eq!(*probe.started.lock().unwrap(), (0..8).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_failure_propagates() {
        let probe = Arc::new(Probe::default());
        let siblings = [ok(true, 1), failing(1), ok(true, 1)];

        let err = run_probe(1, Combinator::And, &siblings, &probe)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Erro de invocação do predicado: sibling 1 failed");
        assert_eq!(*probe.started.lock().unwrap(), vec![0, 1]);
    }

    #[tokio::test]
    async fn test_late_failure_after_decision_is_ignored() {
        let probe = Arc::new(Probe::default());
        let siblings = [failing(50), ok(false, 5), ok(true, 1)];

        assert!(!run_probe(2, Combinator::And, &siblings, &probe).await.unwrap());
        assert_eq!(*probe.started.lock().unwrap(), vec![0, 1]);
    }

    #[tokio::test]
    async fn test_later_sibling_may_decide_first() {
        let probe = Arc::new(Probe::default());
        let siblings = [ok(false, 50), ok(true, 5)];

        assert!(run_probe(2, Combinator::Or, &siblings, &probe).await.unwrap());
    }
}
