//! Interface de linha de comando do Predica.

pub mod command_predicate;
pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Predica - avaliador de expressões booleanas com predicado assíncrono.
#[derive(Parser, Debug)]
#[command(name = "predica")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Arquivo de configuração.
    #[arg(short, long, default_value = "predica.toml")]
    pub config: PathBuf,

    /// Modo verbose.
    #[arg(short, long)]
    pub verbose: bool,

    /// Modo silencioso.
    #[arg(short, long)]
    pub quiet: bool,

    /// Comando a executar.
    #[command(subcommand)]
    pub command: Commands,
}

/// Comandos disponíveis.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Cria um predica.toml com a configuração padrão.
    Init {
        /// Diretório de destino (padrão: diretório atual).
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Valida a estrutura de uma expressão JSON.
    Validate {
        /// Expressão JSON, ou @arquivo.
        expression: String,
    },

    /// Avalia uma expressão usando um comando externo como predicado.
    ///
    /// Cada operando é passado como último argumento do comando. Saída 0
    /// significa verdadeiro, 1 significa falso; qualquer outra é erro.
    Eval {
        /// Expressão JSON, ou @arquivo.
        expression: String,

        /// Sobrescreve evaluator.concurrency_limit.
        #[arg(short, long)]
        limit: Option<usize>,

        /// Timeout de cada chamada ao comando, em segundos.
        #[arg(short, long, default_value_t = 30)]
        timeout: u64,

        /// Comando predicado e seus argumentos (depois de `--`).
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },

    /// Mostra versão.
    Version,
}
