//! Validação estrutural de expressões.
//!
//! Nunca chama o predicado nem toca no cache.

use serde_json::Value;

use crate::types::errors::ValidationError;
use crate::types::expression::{Combinator, Expression};
use crate::types::json;

/// Validador de expressões.
pub struct ExpressionValidator;

impl ExpressionValidator {
    /// Valida uma árvore tipada.
    ///
    /// O próprio tipo já impede combinadores misturados; resta conferir que
    /// todo `and`/`or` tem pelo menos dois operandos.
    pub fn validate<T>(expression: &Expression<T>) -> Result<bool, ValidationError> {
        if let Some((combinator, children)) = expression.combinator() {
            return Self::validate_children(combinator, children);
        }

        match expression {
            Expression::Not(inner) => Self::validate(inner),
            Expression::Operand(_) | Expression::And(_) | Expression::Or(_) => Ok(true),
        }
    }

    fn validate_children<T>(
        combinator: Combinator,
        children: &[Expression<T>],
    ) -> Result<bool, ValidationError> {
        if children.len() < 2 {
            return Err(ValidationError::TooFewOperands {
                operator: combinator.key(),
                found: children.len(),
            });
        }

        for child in children {
            Self::validate(child)?;
        }

        Ok(true)
    }

    /// Valida um nó na codificação JSON.
    pub fn validate_json(value: &Value) -> Result<bool, ValidationError> {
        json::validate_value(value)
    }
}
