//! Árvore de expressões booleanas e o tipo de operando da fronteira JSON.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde_json::{Number, Value};

/// Combinador de aridade variável.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combinator {
    /// Verdadeiro se todos os operandos forem verdadeiros.
    And,
    /// Verdadeiro se algum operando for verdadeiro.
    Or,
}

impl Combinator {
    /// Nome do marcador na codificação da fronteira.
    pub fn key(&self) -> &'static str {
        match self {
            Combinator::And => "and",
            Combinator::Or => "or",
        }
    }

    /// Valor de um operando que decide o resultado sozinho.
    ///
    /// `false` decide um `and`, `true` decide um `or`.
    pub fn decisive(&self) -> bool {
        matches!(self, Combinator::Or)
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Expressão booleana sobre operandos opacos do tipo `T`.
///
/// As folhas são julgadas por um predicado assíncrono; os nós internos
/// são `and`, `or` (dois ou mais filhos) e `not` (exatamente um filho).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression<T> {
    /// Folha testada pelo predicado.
    Operand(T),
    /// Conjunção.
    And(Vec<Expression<T>>),
    /// Disjunção.
    Or(Vec<Expression<T>>),
    /// Negação.
    Not(Box<Expression<T>>),
}

impl<T> Expression<T> {
    /// Cria uma folha.
    pub fn operand(value: T) -> Self {
        Self::Operand(value)
    }

    /// Cria uma conjunção.
    pub fn and<I>(operands: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Expression<T>>,
    {
        Self::And(operands.into_iter().map(Into::into).collect())
    }

    /// Cria uma disjunção.
    pub fn or<I>(operands: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Expression<T>>,
    {
        Self::Or(operands.into_iter().map(Into::into).collect())
    }

    /// Cria uma negação.
    #[allow(clippy::should_implement_trait)]
    pub fn not(operand: impl Into<Expression<T>>) -> Self {
        Self::Not(Box::new(operand.into()))
    }

    /// Retorna o combinador e os filhos, se for um nó `and`/`or`.
    pub fn combinator(&self) -> Option<(Combinator, &[Expression<T>])> {
        match self {
            Self::And(operands) => Some((Combinator::And, operands)),
            Self::Or(operands) => Some((Combinator::Or, operands)),
            _ => None,
        }
    }

    /// Itera sobre todas as folhas, da esquerda para a direita.
    pub fn operands(&self) -> Vec<&T> {
        let mut out = Vec::new();
        self.collect_operands(&mut out);
        out
    }

    fn collect_operands<'a>(&'a self, out: &mut Vec<&'a T>) {
        match self {
            Self::Operand(value) => out.push(value),
            Self::And(children) | Self::Or(children) => {
                for child in children {
                    child.collect_operands(out);
                }
            }
            Self::Not(inner) => inner.collect_operands(out),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Expression<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some((combinator, children)) = self.combinator() {
            write!(f, "{{{}:[", combinator.key())?;
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{}", child)?;
            }
            return f.write_str("]}");
        }

        match self {
            Self::Not(inner) => write!(f, "{{not:{}}}", inner),
            Self::Operand(value) => write!(f, "{}", value),
            // tratados acima
            Self::And(_) | Self::Or(_) => Ok(()),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Operandos da fronteira JSON
// ═══════════════════════════════════════════════════════════════════════════

/// Valor escalar comparado por valor.
#[derive(Debug, Clone)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
}

impl Scalar {
    fn number_key(n: &Number) -> NumberKey {
        if let Some(i) = n.as_i64() {
            return NumberKey::Int(i128::from(i));
        }
        if let Some(u) = n.as_u64() {
            return NumberKey::Int(i128::from(u));
        }
        let f = n.as_f64().unwrap_or(f64::NAN);
        // 2.0 e 2 são o mesmo operando, em qualquer magnitude que caiba em i128
        if f.is_finite() && f.fract() == 0.0 && f >= i128::MIN as f64 && f < i128::MAX as f64 {
            NumberKey::Int(f as i128)
        } else {
            NumberKey::Float(f.to_bits())
        }
    }
}

#[derive(PartialEq, Eq, Hash)]
enum NumberKey {
    Int(i128),
    Float(u64),
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Scalar::Null, Scalar::Null) => true,
            (Scalar::Bool(a), Scalar::Bool(b)) => a == b,
            (Scalar::Number(a), Scalar::Number(b)) => Self::number_key(a) == Self::number_key(b),
            (Scalar::String(a), Scalar::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Scalar {}

impl Hash for Scalar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Scalar::Null => {}
            Scalar::Bool(b) => b.hash(state),
            Scalar::Number(n) => Self::number_key(n).hash(state),
            Scalar::String(s) => s.hash(state),
        }
    }
}

/// Operando vindo da codificação JSON.
///
/// Escalares são comparados por valor. Objetos e arrays são comparados por
/// identidade: dois valores estruturalmente iguais, mas criados
/// separadamente, são operandos distintos. Clonar um `Operand` preserva a
/// identidade.
#[derive(Debug, Clone)]
pub enum Operand {
    Scalar(Scalar),
    Compound(Arc<Value>),
}

impl Operand {
    /// Converte um valor JSON em operando, criando uma nova identidade para
    /// objetos e arrays.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Null => Operand::Scalar(Scalar::Null),
            Value::Bool(b) => Operand::Scalar(Scalar::Bool(b)),
            Value::Number(n) => Operand::Scalar(Scalar::Number(n)),
            Value::String(s) => Operand::Scalar(Scalar::String(s)),
            compound => Operand::Compound(Arc::new(compound)),
        }
    }

    /// Retorna o valor JSON do operando.
    pub fn to_value(&self) -> Value {
        match self {
            Operand::Scalar(Scalar::Null) => Value::Null,
            Operand::Scalar(Scalar::Bool(b)) => Value::Bool(*b),
            Operand::Scalar(Scalar::Number(n)) => Value::Number(n.clone()),
            Operand::Scalar(Scalar::String(s)) => Value::String(s.clone()),
            Operand::Compound(value) => Value::clone(value),
        }
    }

    /// Número como `f64`, se o operando for numérico.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Operand::Scalar(Scalar::Number(n)) => n.as_f64(),
            _ => None,
        }
    }

    /// Texto, se o operando for uma string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Operand::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Valor composto, se o operando for um objeto ou array.
    pub fn as_compound(&self) -> Option<&Value> {
        match self {
            Operand::Compound(value) => Some(value),
            _ => None,
        }
    }
}

impl PartialEq for Operand {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Operand::Scalar(a), Operand::Scalar(b)) => a == b,
            (Operand::Compound(a), Operand::Compound(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Operand {}

impl Hash for Operand {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Operand::Scalar(scalar) => {
                0u8.hash(state);
                scalar.hash(state);
            }
            Operand::Compound(value) => {
                1u8.hash(state);
                std::ptr::hash(Arc::as_ptr(value), state);
            }
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}

impl From<i64> for Operand {
    fn from(n: i64) -> Self {
        Operand::Scalar(Scalar::Number(n.into()))
    }
}

impl From<i32> for Operand {
    fn from(n: i32) -> Self {
        Operand::Scalar(Scalar::Number(n.into()))
    }
}

impl From<&str> for Operand {
    fn from(s: &str) -> Self {
        Operand::Scalar(Scalar::String(s.to_string()))
    }
}

impl From<Operand> for Expression<Operand> {
    fn from(operand: Operand) -> Self {
        Expression::Operand(operand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_scalars_compare_by_value() {
        let a = Operand::from_value(json!(2));
        let b = Operand::from_value(json!(2));
        let c = Operand::from_value(json!(2.0));
        let d = Operand::from_value(json!("2"));

        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_ne!(a, d);

        let set: HashSet<Operand> = [a, b, c, d].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_large_integral_float_matches_integer() {
        let float = Operand::from_value(json!(1e18));
        let integer = Operand::from_value(json!(1_000_000_000_000_000_000_u64));
        let beyond_u64: Operand = serde_json::from_str::<Value>("1e20")
            .map(Operand::from_value)
            .unwrap();

        assert_eq!(float, integer);
        assert_eq!(beyond_u64, Operand::from_value(json!(1e20)));
        assert_ne!(Operand::from_value(json!(2.5)), Operand::from_value(json!(2)));

        let set: HashSet<Operand> = [float, integer].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_combinator_accessor() {
        let conjunction: Expression<i64> =
            Expression::and([Expression::Operand(1), Expression::Operand(2)]);
        let negation: Expression<i64> = Expression::not(Expression::Operand(1));

        let (combinator, children) = conjunction.combinator().unwrap();
        assert_eq!(combinator, Combinator::And);
        assert_eq!(children.len(), 2);
        assert!(negation.combinator().is_none());
        assert!(Expression::Operand(3).combinator().is_none());
    }

    #[test]
    fn test_compounds_compare_by_identity() {
        let one = Operand::from_value(json!({"object": "one"}));
        let same_shape = Operand::from_value(json!({"object": "one"}));
        let alias = one.clone();

        assert_ne!(one, same_shape);
        assert_eq!(one, alias);

        let set: HashSet<Operand> = [one, same_shape, alias].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_display_uses_marker_notation() {
        let expr: Expression<Operand> = Expression::and([
            Expression::operand(Operand::from(2)),
            Expression::not(Expression::or([Operand::from(3), Operand::from(5)])),
        ]);

        assert_eq!(expr.to_string(), "{and:[2,{not:{or:[3,5]}}]}");
    }

    #[test]
    fn test_operands_in_order() {
        let expr: Expression<i32> = Expression::Or(vec![
            Expression::Operand(1),
            Expression::And(vec![Expression::Operand(2), Expression::Operand(3)]),
            Expression::Not(Box::new(Expression::Operand(4))),
        ]);

        assert_eq!(expr.operands(), vec![&1, &2, &3, &4]);
    }

    #[test]
    fn test_combinator_decisive_value() {
        assert!(!Combinator::And.decisive());
        assert!(Combinator::Or.decisive());
        assert_eq!(Combinator::And.to_string(), "and");
    }
}
