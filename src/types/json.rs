//! Codificação JSON de expressões.
//!
//! Um nó é um operando qualquer ou um objeto com exatamente uma das chaves
//! marcadoras `and`, `or` ou `not`. Objetos que carregam uma dessas chaves
//! são sempre tratados como combinadores: um operando como
//! `{"object": "one", "or": "something"}` é rejeitado, nunca desambiguado.

use serde::de::{self, Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::types::errors::ValidationError;
use crate::types::expression::{Combinator, Expression, Operand};

/// Forma de um nó JSON, decidida apenas pelas chaves marcadoras.
enum Node<'a> {
    Operand,
    Not(&'a Value),
    Combinator(Combinator, &'a Value),
}

fn classify(value: &Value) -> Result<Node<'_>, ValidationError> {
    let Some(object) = value.as_object() else {
        return Ok(Node::Operand);
    };

    let and = object.get("and");
    let or = object.get("or");
    let not = object.get("not");

    match (and, or, not) {
        (None, None, None) => Ok(Node::Operand),
        (Some(_), _, Some(_)) | (_, Some(_), Some(_)) => Err(ValidationError::MixedNot),
        (None, None, Some(inner)) => Ok(Node::Not(inner)),
        (Some(_), Some(_), None) => Err(ValidationError::MixedAndOr),
        (Some(operands), None, None) => Ok(Node::Combinator(Combinator::And, operands)),
        (None, Some(operands), None) => Ok(Node::Combinator(Combinator::Or, operands)),
    }
}

fn operand_list(combinator: Combinator, operands: &Value) -> Result<&Vec<Value>, ValidationError> {
    let list = operands
        .as_array()
        .ok_or(ValidationError::OperandsNotSequence {
            operator: combinator.key(),
        })?;

    if list.len() < 2 {
        return Err(ValidationError::TooFewOperands {
            operator: combinator.key(),
            found: list.len(),
        });
    }

    Ok(list)
}

/// Valida um nó JSON recursivamente, sem construir a árvore.
pub fn validate_value(value: &Value) -> Result<bool, ValidationError> {
    match classify(value)? {
        Node::Operand => Ok(true),
        Node::Not(inner) => validate_value(inner),
        Node::Combinator(combinator, operands) => {
            for operand in operand_list(combinator, operands)? {
                validate_value(operand)?;
            }
            Ok(true)
        }
    }
}

/// Constrói a árvore tipada a partir de um nó JSON.
///
/// Cada objeto ou array usado como operando recebe uma identidade própria.
pub fn parse_value(value: &Value) -> Result<Expression<Operand>, ValidationError> {
    match classify(value)? {
        Node::Operand => Ok(Expression::Operand(Operand::from_value(value.clone()))),
        Node::Not(inner) => Ok(Expression::Not(Box::new(parse_value(inner)?))),
        Node::Combinator(combinator, operands) => {
            let children = operand_list(combinator, operands)?
                .iter()
                .map(parse_value)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(match combinator {
                Combinator::And => Expression::And(children),
                Combinator::Or => Expression::Or(children),
            })
        }
    }
}

impl Expression<Operand> {
    /// Constrói uma expressão a partir da codificação JSON.
    pub fn from_json(value: &Value) -> Result<Self, ValidationError> {
        parse_value(value)
    }

    /// Converte a expressão de volta para a codificação JSON.
    pub fn to_json(&self) -> Value {
        if let Some((combinator, children)) = self.combinator() {
            let mut map = Map::new();
            map.insert(
                combinator.key().to_string(),
                Value::Array(children.iter().map(Expression::to_json).collect()),
            );
            return Value::Object(map);
        }

        match self {
            Expression::Operand(operand) => operand.to_value(),
            // tratados acima
            Expression::And(_) | Expression::Or(_) => Value::Null,
            Expression::Not(inner) => {
                let mut map = Map::new();
                map.insert("not".to_string(), inner.to_json());
                Value::Object(map)
            }
        }
    }
}

impl TryFrom<Value> for Expression<Operand> {
    type Error = ValidationError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        parse_value(&value)
    }
}

impl<'de> Deserialize<'de> for Expression<Operand> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        parse_value(&value).map_err(de::Error::custom)
    }
}
