//! Tipos compartilhados do Predica.

pub mod config;
pub mod errors;
pub mod expression;
pub mod json;
