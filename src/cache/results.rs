//! Cache de resultados do predicado por identidade de operando.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures::future::Shared;
use futures::FutureExt;

use crate::evaluator::{PredicateFuture, PredicateInvoker};

/// Resultado compartilhado de uma invocação, pendente ou concluído.
pub type SharedResult = Shared<PredicateFuture>;

/// Estatísticas do cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Número atual de entradas.
    pub size: usize,

    /// Número de acertos (cache hits).
    pub hits: u64,

    /// Número de erros (cache misses).
    pub misses: u64,
}

impl CacheStats {
    /// Calcula a taxa de acerto.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct CacheState<T> {
    invoker: PredicateInvoker<T>,
    entries: HashMap<T, SharedResult>,
}

/// Cache de resultados do predicado.
///
/// Garante no máximo uma invocação do predicado por operando enquanto a
/// entrada existir: a entrada é gravada antes de o resultado ficar pronto,
/// então pedidos concorrentes pelo mesmo operando aguardam o mesmo
/// future. Falhas também ficam em cache.
///
/// O cache guarda o invocador atual; trocar o predicado com
/// [`ResultCache::reset`] descarta as entradas na mesma seção crítica.
///
/// Uma entrada cuja avaliação foi abandonada no meio (um irmão cancelado
/// por curto-circuito) continua no cache, parada: ninguém a faz progredir
/// até que outra avaliação peça o mesmo operando. Os recursos presos ao
/// future do predicado, como um processo filho, só são liberados quando
/// essa entrada é concluída ou quando [`clear`](Self::clear),
/// [`reset`](Self::reset) ou o drop do cache a descartam.
pub struct ResultCache<T> {
    state: Mutex<CacheState<T>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<T> ResultCache<T>
where
    T: Clone + Eq + Hash + Send + 'static,
{
    /// Cria um cache vazio para o predicado dado.
    pub fn new(invoker: PredicateInvoker<T>) -> Self {
        Self {
            state: Mutex::new(CacheState {
                invoker,
                entries: HashMap::new(),
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Retorna o resultado em cache ou registra uma nova invocação.
    ///
    /// O predicado só é chamado quando o future retornado é aguardado pela
    /// primeira vez, fora da seção crítica.
    pub fn get_or_invoke(&self, operand: &T) -> SharedResult {
        let mut state = self.lock();

        if let Some(entry) = state.entries.get(operand) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Operand cache hit");
            return entry.clone();
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("Operand cache miss, scheduling predicate");

        let invoker = state.invoker.clone();
        let key = operand.clone();
        let pending = async move { invoker.invoke(key).await }.boxed().shared();
        state.entries.insert(operand.clone(), pending.clone());
        pending
    }

    /// Verifica se o operando tem uma entrada.
    pub fn contains(&self, operand: &T) -> bool {
        self.lock().entries.contains_key(operand)
    }

    /// Número de entradas.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Verifica se o cache está vazio.
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Limpa todo o cache.
    ///
    /// Resultados já entregues continuam válidos para quem os aguarda.
    pub fn clear(&self) {
        let mut state = self.lock();
        let dropped = state.entries.len();
        state.entries.clear();
        tracing::debug!(entries = dropped, "Operand cache cleared");
    }

    /// Troca o predicado e limpa o cache.
    pub fn reset(&self, invoker: PredicateInvoker<T>) {
        let mut state = self.lock();
        let dropped = state.entries.len();
        state.invoker = invoker;
        state.entries.clear();
        tracing::debug!(
            entries = dropped,
            convention = %state.invoker.convention(),
            "Predicate replaced, operand cache cleared"
        );
    }

    /// Retorna o predicado atual.
    pub fn invoker(&self) -> PredicateInvoker<T> {
        self.lock().invoker.clone()
    }

    /// Retorna estatísticas do cache.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
