//! Tipos de erro do Predica.

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Tipo de resultado padrão do Predica.
pub type PredicaResult<T> = Result<T, PredicaError>;

/// Erros possíveis no Predica.
///
/// É `Clone` porque o resultado memoizado de um operando pode ser
/// observado por várias avaliações ao mesmo tempo.
#[derive(Error, Debug, Clone)]
pub enum PredicaError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Erro de invocação do predicado: {0}")]
    Invocation(String),

    #[error(transparent)]
    Predicate(#[from] PredicateError),

    #[error("Erro de configuração: {0}")]
    Config(String),

    #[error("Erro de IO: {0}")]
    Io(Arc<std::io::Error>),

    #[error("Erro ao parsear TOML: {0}")]
    TomlParse(Arc<toml::de::Error>),

    #[error("Erro ao serializar TOML: {0}")]
    TomlSerialize(Arc<toml::ser::Error>),

    #[error("Erro de JSON: {0}")]
    Json(Arc<serde_json::Error>),
}

impl PredicaError {
    /// Cria um erro de invocação.
    pub fn invocation<S: Into<String>>(msg: S) -> Self {
        Self::Invocation(msg.into())
    }

    /// Cria um erro de configuração.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Retorna o erro original do predicado, se for do tipo `E`.
    pub fn predicate_error<E: StdError + 'static>(&self) -> Option<&E> {
        match self {
            Self::Predicate(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PredicaError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl From<toml::de::Error> for PredicaError {
    fn from(err: toml::de::Error) -> Self {
        Self::TomlParse(Arc::new(err))
    }
}

impl From<toml::ser::Error> for PredicaError {
    fn from(err: toml::ser::Error) -> Self {
        Self::TomlSerialize(Arc::new(err))
    }
}

impl From<serde_json::Error> for PredicaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(Arc::new(err))
    }
}

/// Violações da gramática estrutural de uma expressão.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// `not` combinado com `and` ou `or` no mesmo nó.
    #[error("Um operador `not` não pode ter também um operador `and` ou `or`")]
    MixedNot,

    /// `and` e `or` no mesmo nó.
    #[error("A expressão não pode conter ao mesmo tempo um operador `and` e um `or`")]
    MixedAndOr,

    /// A lista de operandos não é uma sequência.
    #[error("Os operandos de `{operator}` devem ser um array")]
    OperandsNotSequence { operator: &'static str },

    /// Menos de dois operandos em `and`/`or`.
    #[error("`{operator}` exige pelo menos dois operandos, encontrado(s) {found}")]
    TooFewOperands { operator: &'static str, found: usize },
}

/// Falha produzida pelo próprio predicado.
///
/// Guarda o erro original sem alterá-lo; use [`PredicateError::downcast_ref`]
/// para recuperá-lo com o tipo concreto.
#[derive(Clone)]
pub struct PredicateError(Arc<dyn StdError + Send + Sync + 'static>);

impl PredicateError {
    /// Envolve o erro de um predicado.
    ///
    /// Um `PredicateError` passado aqui é devolvido como está, sem uma
    /// segunda camada.
    pub fn new<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        if let Some(existing) = (&err as &dyn Any).downcast_ref::<PredicateError>() {
            return existing.clone();
        }
        Self(Arc::new(err))
    }

    /// Cria um erro de predicado a partir de uma mensagem.
    pub fn msg<S: Into<String>>(msg: S) -> Self {
        Self(Arc::new(Message(msg.into())))
    }

    /// Tenta recuperar o erro original com o tipo concreto `E`.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref::<E>()
    }

    /// Verifica se o erro original é do tipo `E`.
    pub fn is<E: StdError + 'static>(&self) -> bool {
        self.0.is::<E>()
    }
}

impl fmt::Debug for PredicateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for PredicateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl StdError for PredicateError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

#[derive(Debug)]
struct Message(String);

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl StdError for Message {}
