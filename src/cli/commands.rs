//! Implementação dos comandos CLI do Predica.

use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;

use crate::evaluator::{ExpressionEvaluator, ExpressionValidator, PredicateInvoker};
use crate::types::config::{Config, CONFIG_FILE};
use crate::types::expression::Expression;
use crate::PredicaResult;

use super::command_predicate::CommandPredicate;

/// Cria o predica.toml padrão no diretório indicado.
pub async fn init(path: Option<PathBuf>) -> PredicaResult<()> {
    let target_dir = path.unwrap_or_else(|| PathBuf::from("."));

    // Create directory if it doesn't exist
    if !target_dir.exists() {
        std::fs::create_dir_all(&target_dir)?;
        tracing::info!("Directory created: {}", target_dir.display());
    }

    let config_path = target_dir.join(CONFIG_FILE);

    if config_path.exists() {
        println!("Configuration already exists at: {}", config_path.display());
        return Ok(());
    }

    Config::default_config().save(&config_path)?;

    println!("Configuration created at: {}", config_path.display());

    Ok(())
}

/// Lê a expressão do argumento, ou de um arquivo se começar com @.
pub fn read_expression(input: &str) -> PredicaResult<Value> {
    let text = match input.strip_prefix('@') {
        Some(file_path) => std::fs::read_to_string(file_path)?,
        None => input.to_string(),
    };

    Ok(serde_json::from_str(&text)?)
}

/// Valida a estrutura de uma expressão.
pub fn validate(expression: &str) -> PredicaResult<()> {
    let value = read_expression(expression)?;
    ExpressionValidator::validate_json(&value)?;

    println!("valid");
    Ok(())
}

/// Avalia uma expressão com um comando externo como predicado.
pub async fn eval(
    expression: &str,
    limit: Option<usize>,
    timeout_secs: u64,
    command: &[String],
    config: &Config,
) -> PredicaResult<()> {
    let value = read_expression(expression)?;
    let expression = Expression::from_json(&value)?;

    let predicate = CommandPredicate::new(command)?.with_timeout(Duration::from_secs(timeout_secs));
    let evaluator =
        ExpressionEvaluator::from_config(&config.evaluator, PredicateInvoker::from_predicate(predicate))?;

    if let Some(limit) = limit {
        evaluator.set_concurrency_limit(limit)?;
    }

    tracing::debug!(
        expression = %expression,
        concurrency_limit = evaluator.concurrency_limit(),
        "Evaluating expression"
    );

    let result = evaluator.execute(&expression).await?;

    let stats = evaluator.cache_stats();
    tracing::debug!(
        operands = stats.size,
        hits = stats.hits,
        misses = stats.misses,
        "Evaluation finished"
    );

    println!("{}", result);
    Ok(())
}

/// Mostra versão.
pub fn version() {
    println!("predica {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Avaliador de expressões booleanas com predicado assíncrono");
}
