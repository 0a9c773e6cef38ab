//! Normalização das convenções de chamada do predicado.
//!
//! O predicado pode ser escrito em dois estilos:
//!
//! - **direto**: recebe o operando e retorna um future com o resultado;
//! - **completion**: recebe o operando e um [`Completion`], que deve ser
//!   chamado com `(erro, resultado)` quando o teste terminar.
//!
//! O estilo é escolhido explicitamente na construção do
//! [`PredicateInvoker`]; o avaliador só enxerga um future uniforme.

use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::oneshot;

use crate::types::errors::PredicateError;
use crate::{PredicaError, PredicaResult};

/// Future uniforme produzido por uma invocação do predicado.
pub type PredicateFuture = BoxFuture<'static, PredicaResult<bool>>;

/// Trait para predicados assíncronos.
///
/// Implementações com estado próprio (clientes HTTP, conexões) podem
/// implementar este trait diretamente e usar
/// [`PredicateInvoker::from_predicate`].
#[async_trait]
pub trait Predicate<T>: Send + Sync {
    /// Decide se o operando é verdadeiro.
    async fn test(&self, operand: T) -> Result<bool, PredicateError>;
}

/// Convenção de chamada do predicado configurado.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallingConvention {
    /// Retorna um future com o resultado.
    Direct,
    /// Sinaliza o resultado por um [`Completion`].
    Completion,
    /// Implementa o trait [`Predicate`].
    Custom,
}

impl fmt::Display for CallingConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallingConvention::Direct => write!(f, "direct"),
            CallingConvention::Completion => write!(f, "completion"),
            CallingConvention::Custom => write!(f, "custom"),
        }
    }
}

/// Callback de conclusão para predicados no estilo completion.
///
/// Deve ser consumido exatamente uma vez. Se for descartado sem ser
/// chamado, a invocação falha com [`PredicaError::Invocation`].
#[derive(Debug)]
pub struct Completion {
    tx: oneshot::Sender<PredicaResult<bool>>,
}

impl Completion {
    /// Conclui com a assinatura `(erro, resultado)`.
    ///
    /// Um erro presente rejeita a invocação; sem erro, o resultado é usado.
    pub fn complete<E>(self, error: Option<E>, result: Option<bool>)
    where
        E: StdError + Send + Sync + 'static,
    {
        let outcome = match (error, result) {
            (Some(err), _) => Err(PredicaError::Predicate(PredicateError::new(err))),
            (None, Some(value)) => Ok(value),
            (None, None) => Err(PredicaError::invocation(
                "completion chamado sem erro e sem resultado",
            )),
        };
        self.send(outcome);
    }

    /// Conclui com sucesso.
    pub fn ok(self, value: bool) {
        self.send(Ok(value));
    }

    /// Conclui com o erro do predicado.
    pub fn fail<E>(self, err: E)
    where
        E: StdError + Send + Sync + 'static,
    {
        self.send(Err(PredicaError::Predicate(PredicateError::new(err))));
    }

    fn send(self, outcome: PredicaResult<bool>) {
        // O receptor some quando a avaliação foi descartada
        if self.tx.send(outcome).is_err() {
            tracing::trace!("Completion delivered after its evaluation was dropped");
        }
    }
}

type InvokeFn<T> = dyn Fn(T) -> PredicateFuture + Send + Sync;

/// Invocador uniforme do predicado.
pub struct PredicateInvoker<T> {
    call: Arc<InvokeFn<T>>,
    convention: CallingConvention,
}

impl<T> Clone for PredicateInvoker<T> {
    fn clone(&self) -> Self {
        Self {
            call: Arc::clone(&self.call),
            convention: self.convention,
        }
    }
}

impl<T> fmt::Debug for PredicateInvoker<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateInvoker")
            .field("convention", &self.convention)
            .finish_non_exhaustive()
    }
}

impl<T: Send + 'static> PredicateInvoker<T> {
    /// Predicado no estilo direto.
    ///
    /// `f` é chamado no momento da invocação e o future que ele retorna é
    /// usado como está.
    pub fn direct<F, Fut, E>(f: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool, E>> + Send + 'static,
        E: StdError + Send + Sync + 'static,
    {
        let call = move |operand: T| -> PredicateFuture {
            let pending = f(operand);
            async move {
                pending
                    .await
                    .map_err(|err| PredicaError::Predicate(PredicateError::new(err)))
            }
            .boxed()
        };

        Self {
            call: Arc::new(call),
            convention: CallingConvention::Direct,
        }
    }

    /// Predicado no estilo completion.
    ///
    /// `f` recebe o operando e um [`Completion`]; pode concluí-lo na hora ou
    /// movê-lo para outra tarefa e concluí-lo depois.
    pub fn completion<F>(f: F) -> Self
    where
        F: Fn(T, Completion) + Send + Sync + 'static,
    {
        let call = move |operand: T| -> PredicateFuture {
            let (tx, rx) = oneshot::channel();
            f(operand, Completion { tx });
            async move {
                match rx.await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        tracing::warn!("Predicate dropped its completion without calling it");
                        Err(PredicaError::invocation(
                            "o predicado descartou o completion sem chamá-lo",
                        ))
                    }
                }
            }
            .boxed()
        };

        Self {
            call: Arc::new(call),
            convention: CallingConvention::Completion,
        }
    }

    /// Predicado que implementa o trait [`Predicate`].
    pub fn from_predicate<P>(predicate: P) -> Self
    where
        P: Predicate<T> + 'static,
    {
        let predicate = Arc::new(predicate);
        let call = move |operand: T| -> PredicateFuture {
            let predicate = Arc::clone(&predicate);
            async move { predicate.test(operand).await.map_err(PredicaError::Predicate) }.boxed()
        };

        Self {
            call: Arc::new(call),
            convention: CallingConvention::Custom,
        }
    }

    /// Invoca o predicado sobre um operando.
    pub fn invoke(&self, operand: T) -> PredicateFuture {
        tracing::trace!(convention = %self.convention, "Invoking predicate");
        (self.call)(operand)
    }

    /// Convenção de chamada escolhida na construção.
    pub fn convention(&self) -> CallingConvention {
        self.convention
    }
}
