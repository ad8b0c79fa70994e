//! Force compare
//!
//! One routine decides ordering and equality for every pair of values, so
//! keys of mixed types can live in the same map without failing a lookup.
//!
//! ## Coercion Table
//! ```text
//! left \ right   Numeric              Char / Text        other family
//! ------------   ------------------   ----------------   ------------
//! Numeric        widened compare      family rank        family rank
//! Char / Text    family rank          lexical (bytes)    family rank
//! ```
//!
//! Numeric = Byte, Short, Int, Long, Date, Float, Double. Integers widen to
//! i64; an integer against a float compares exactly (no precision loss from
//! casting large longs to f64). NaN sorts after every other number.
//!
//! Values of different families order by family rank:
//! `Null < Bool < Numeric < Text < Bytes < Reference < List < Map`.

use std::cmp::Ordering;

use super::Value;

/// Comparison family of a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Family {
    Null,
    Bool,
    Numeric,
    Text,
    Bytes,
    Reference,
    List,
    Map,
}

impl Family {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Family::Null,
            Value::Bool(_) => Family::Bool,
            Value::Byte(_)
            | Value::Short(_)
            | Value::Int(_)
            | Value::Long(_)
            | Value::Date(_)
            | Value::Float(_)
            | Value::Double(_) => Family::Numeric,
            Value::Char(_) | Value::Text(_) => Family::Text,
            Value::Bytes(_) => Family::Bytes,
            Value::Reference(_) => Family::Reference,
            Value::List(_) => Family::List,
            Value::Map(_) => Family::Map,
        }
    }
}

/// Relational operators evaluated on top of force compare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOperator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanEqual,
    LessThan,
    LessThanEqual,
}

impl CompareOperator {
    /// Whether `left.force_compare(right) == ordering` satisfies the operator
    pub fn matches(self, ordering: Ordering) -> bool {
        match self {
            CompareOperator::Equal => ordering == Ordering::Equal,
            CompareOperator::NotEqual => ordering != Ordering::Equal,
            CompareOperator::GreaterThan => ordering == Ordering::Greater,
            CompareOperator::GreaterThanEqual => ordering != Ordering::Less,
            CompareOperator::LessThan => ordering == Ordering::Less,
            CompareOperator::LessThanEqual => ordering != Ordering::Greater,
        }
    }

    /// Evaluate `left <op> right`
    pub fn evaluate(self, left: &Value, right: &Value) -> bool {
        self.matches(left.force_compare(right))
    }
}

enum Number {
    Int(i64),
    Float(f64),
}

fn as_number(value: &Value) -> Option<Number> {
    match value {
        Value::Float(v) => Some(Number::Float(*v as f64)),
        Value::Double(v) => Some(Number::Float(*v)),
        other => other.as_i64().map(Number::Int),
    }
}

fn compare_floats(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        // -0.0 == 0.0 here, total_cmp would split them
        (false, false) => a.partial_cmp(&b).unwrap_or_else(|| a.total_cmp(&b)),
    }
}

/// Exact comparison of an integer against a float
fn compare_int_float(i: i64, f: f64) -> Ordering {
    if f.is_nan() {
        return Ordering::Less;
    }
    // 2^63 is exactly representable; every i64 is below it
    if f >= 9_223_372_036_854_775_808.0 {
        return Ordering::Less;
    }
    if f < -9_223_372_036_854_775_808.0 {
        return Ordering::Greater;
    }
    let truncated = f.trunc();
    let whole = truncated as i64;
    match i.cmp(&whole) {
        Ordering::Equal => {
            let fraction = f - truncated;
            if fraction > 0.0 {
                Ordering::Less
            } else if fraction < 0.0 {
                Ordering::Greater
            } else {
                Ordering::Equal
            }
        }
        other => other,
    }
}

fn compare_numbers(a: Number, b: Number) -> Ordering {
    match (a, b) {
        (Number::Int(a), Number::Int(b)) => a.cmp(&b),
        (Number::Float(a), Number::Float(b)) => compare_floats(a, b),
        (Number::Int(a), Number::Float(b)) => compare_int_float(a, b),
        (Number::Float(a), Number::Int(b)) => compare_int_float(b, a).reverse(),
    }
}

fn text_bytes<'a>(value: &'a Value, scratch: &'a mut [u8; 4]) -> &'a [u8] {
    match value {
        Value::Text(s) => s.as_bytes(),
        Value::Char(c) => c.encode_utf8(scratch).as_bytes(),
        _ => &[],
    }
}

impl Value {
    /// Total order used for keys
    pub fn force_compare(&self, other: &Value) -> Ordering {
        let (left, right) = (Family::of(self), Family::of(other));
        if left != right {
            return left.cmp(&right);
        }

        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
            (Value::Reference(a), Value::Reference(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    let ord = x.force_compare(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (Value::Map(a), Value::Map(b)) => {
                for ((ka, va), (kb, vb)) in a.iter().zip(b.iter()) {
                    let ord = ka.cmp(kb).then_with(|| va.force_compare(vb));
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            _ => match left {
                Family::Numeric => match (as_number(self), as_number(other)) {
                    (Some(a), Some(b)) => compare_numbers(a, b),
                    _ => Ordering::Equal,
                },
                Family::Text => {
                    let (mut sa, mut sb) = ([0u8; 4], [0u8; 4]);
                    text_bytes(self, &mut sa).cmp(text_bytes(other, &mut sb))
                }
                _ => Ordering::Equal,
            },
        }
    }

    /// Key equality under force compare
    pub fn force_eq(&self, other: &Value) -> bool {
        self.force_compare(other) == Ordering::Equal
    }
}
