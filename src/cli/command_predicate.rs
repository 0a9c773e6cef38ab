//! Predicado que delega a um comando externo.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

use crate::evaluator::Predicate;
use crate::types::errors::PredicateError;
use crate::types::expression::Operand;
use crate::{PredicaError, PredicaResult};

/// Falhas do comando externo.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Comando '{program}' falhou com status {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("Timeout ao executar '{0}'")]
    Timeout(String),

    #[error("Não foi possível executar '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
}

/// Executa um comando por operando.
///
/// O operando vai como último argumento: strings como estão, os demais
/// valores como JSON. Status 0 é verdadeiro, 1 é falso.
///
/// O processo é morto quando a invocação é descartada. Um irmão abandonado
/// por curto-circuito fica suspenso no cache, então o processo dele só
/// termina sozinho ou quando o avaliador limpa o cache ou é descartado.
#[derive(Debug, Clone)]
pub struct CommandPredicate {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandPredicate {
    /// Cria o predicado a partir de `[programa, args...]`.
    pub fn new(command: &[String]) -> PredicaResult<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| PredicaError::config("comando predicado vazio"))?;

        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            timeout: Duration::from_secs(30),
        })
    }

    /// Define o timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Argumento passado ao comando para um operando.
    pub fn argument(operand: &Operand) -> String {
        match operand.as_str() {
            Some(text) => text.to_string(),
            None => operand.to_value().to_string(),
        }
    }
}

#[async_trait]
impl Predicate<Operand> for CommandPredicate {
    async fn test(&self, operand: Operand) -> Result<bool, PredicateError> {
        let argument = Self::argument(&operand);
        tracing::debug!(program = %self.program, %argument, "Running predicate command");

        let result = tokio::time::timeout(
            self.timeout,
            Command::new(&self.program)
                .args(&self.args)
                .arg(&argument)
                .kill_on_drop(true)
                .output(),
        )
        .await;

        match result {
            Ok(Ok(output)) => match output.status.code() {
                Some(0) => Ok(true),
                Some(1) => Ok(false),
                _ => Err(PredicateError::new(CommandError::Failed {
                    program: self.program.clone(),
                    status: output.status.to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                })),
            },
            Ok(Err(e)) => Err(PredicateError::new(CommandError::Spawn {
                program: self.program.clone(),
                source: e,
            })),
            Err(_) => Err(PredicateError::new(CommandError::Timeout(
                self.program.clone(),
            ))),
        }
    }
}
