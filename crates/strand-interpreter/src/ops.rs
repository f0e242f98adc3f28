//! Primitive arithmetic, comparisons and conversions.

use strand_ir::{BinaryOp, Literal, OperandKind, Primitive, UnaryOp};

use crate::error::RuntimeFault;
use crate::value::Value;

/// Truncates and sign-extends `value` to the width of a signed primitive.
pub(crate) fn wrap_signed(value: i64, prim: Primitive) -> i64 {
    match prim {
        Primitive::I8 => value as i8 as i64,
        Primitive::I16 => value as i16 as i64,
        Primitive::I32 => value as i32 as i64,
        _ => value,
    }
}

/// Truncates `value` to the width of an unsigned primitive.
pub(crate) fn wrap_unsigned(value: u64, prim: Primitive) -> u64 {
    match prim {
        Primitive::U8 => value as u8 as u64,
        Primitive::U16 => value as u16 as u64,
        Primitive::U32 => value as u32 as u64,
        _ => value,
    }
}

fn round_float(value: f64, prim: Primitive) -> f64 {
    if prim == Primitive::F32 {
        value as f32 as f64
    } else {
        value
    }
}

/// Materializes a literal for a destination of primitive type `prim`.
pub(crate) fn literal(value: &Literal, prim: Option<Primitive>) -> Value {
    match (value, prim) {
        (Literal::Void, _) => Value::Void,
        (Literal::Bool(b), _) => Value::Bool(*b),
        (Literal::Int(v), Some(p)) if p.is_unsigned() => Value::UInt(wrap_unsigned(*v as u64, p)),
        (Literal::Int(v), Some(p)) if p.is_float() => Value::Float(round_float(*v as f64, p)),
        (Literal::Int(v), Some(p)) => Value::Int(wrap_signed(*v, p)),
        (Literal::Int(v), None) => Value::Int(*v),
        (Literal::UInt(v), Some(p)) if p.is_signed() => Value::Int(wrap_signed(*v as i64, p)),
        (Literal::UInt(v), Some(p)) if p.is_float() => Value::Float(round_float(*v as f64, p)),
        (Literal::UInt(v), Some(p)) => Value::UInt(wrap_unsigned(*v, p)),
        (Literal::UInt(v), None) => Value::UInt(*v),
        (Literal::Float(v), Some(p)) => Value::Float(round_float(*v, p)),
        (Literal::Float(v), None) => Value::Float(*v),
        (Literal::Char(c), _) => Value::Char(*c),
        (Literal::Str(s), _) => Value::str(s),
    }
}

fn compare<T: PartialOrd + ?Sized>(op: BinaryOp, a: &T, b: &T) -> Option<bool> {
    Some(match op {
        BinaryOp::Eq => a == b,
        BinaryOp::Ne => a != b,
        BinaryOp::Lt => a < b,
        BinaryOp::Le => a <= b,
        BinaryOp::Gt => a > b,
        BinaryOp::Ge => a >= b,
        _ => return None,
    })
}

/// Shift amounts are taken modulo the operand width.
fn shift_amount(value: &Value, prim: Primitive) -> Result<u32, RuntimeFault> {
    let raw = match value {
        Value::Int(v) => *v as u32,
        Value::UInt(v) => *v as u32,
        other => return Err(RuntimeFault::mismatch("shift", "an integer amount", other)),
    };
    Ok(raw % prim.bit_width().max(1))
}

pub(crate) fn binary(
    op: BinaryOp,
    operand: OperandKind,
    lhs: &Value,
    rhs: &Value,
) -> Result<Value, RuntimeFault> {
    let prim = match operand {
        OperandKind::Reference => {
            return match op {
                BinaryOp::Eq => Ok(Value::Bool(lhs == rhs)),
                BinaryOp::Ne => Ok(Value::Bool(lhs != rhs)),
                _ => Err(RuntimeFault::mismatch(op.name(), "an equality operator", lhs)),
            }
        }
        OperandKind::Primitive(prim) => prim,
    };
    match lhs {
        Value::Int(a) if matches!(op, BinaryOp::Shl | BinaryOp::Shr) => {
            let amount = shift_amount(rhs, prim)?;
            let shifted = match op {
                BinaryOp::Shl => a.wrapping_shl(amount),
                _ => a.wrapping_shr(amount),
            };
            Ok(Value::Int(wrap_signed(shifted, prim)))
        }
        Value::UInt(a) if matches!(op, BinaryOp::Shl | BinaryOp::Shr) => {
            let amount = shift_amount(rhs, prim)?;
            let shifted = match op {
                BinaryOp::Shl => a.wrapping_shl(amount),
                _ => a.wrapping_shr(amount),
            };
            Ok(Value::UInt(wrap_unsigned(shifted, prim)))
        }
        Value::Int(a) => {
            let Value::Int(b) = rhs else {
                return Err(RuntimeFault::mismatch(op.name(), "a signed integer", rhs));
            };
            let (a, b) = (*a, *b);
            if let Some(result) = compare(op, &a, &b) {
                return Ok(Value::Bool(result));
            }
            let value = match op {
                BinaryOp::Add => a.wrapping_add(b),
                BinaryOp::Sub => a.wrapping_sub(b),
                BinaryOp::Mul => a.wrapping_mul(b),
                BinaryOp::Div | BinaryOp::Rem if b == 0 => return Err(RuntimeFault::DivisionByZero),
                BinaryOp::Div => a.wrapping_div(b),
                BinaryOp::Rem => a.wrapping_rem(b),
                BinaryOp::BitAnd => a & b,
                BinaryOp::BitOr => a | b,
                BinaryOp::BitXor => a ^ b,
                _ => return Err(RuntimeFault::mismatch(op.name(), "an integer operator", lhs)),
            };
            Ok(Value::Int(wrap_signed(value, prim)))
        }
        Value::UInt(a) => {
            let Value::UInt(b) = rhs else {
                return Err(RuntimeFault::mismatch(op.name(), "an unsigned integer", rhs));
            };
            let (a, b) = (*a, *b);
            if let Some(result) = compare(op, &a, &b) {
                return Ok(Value::Bool(result));
            }
            let value = match op {
                BinaryOp::Add => a.wrapping_add(b),
                BinaryOp::Sub => a.wrapping_sub(b),
                BinaryOp::Mul => a.wrapping_mul(b),
                BinaryOp::Div | BinaryOp::Rem if b == 0 => return Err(RuntimeFault::DivisionByZero),
                BinaryOp::Div => a / b,
                BinaryOp::Rem => a % b,
                BinaryOp::BitAnd => a & b,
                BinaryOp::BitOr => a | b,
                BinaryOp::BitXor => a ^ b,
                _ => return Err(RuntimeFault::mismatch(op.name(), "an integer operator", lhs)),
            };
            Ok(Value::UInt(wrap_unsigned(value, prim)))
        }
        Value::Float(a) => {
            let Value::Float(b) = rhs else {
                return Err(RuntimeFault::mismatch(op.name(), "a float", rhs));
            };
            let (a, b) = (*a, *b);
            if let Some(result) = compare(op, &a, &b) {
                return Ok(Value::Bool(result));
            }
            let value = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                BinaryOp::Rem => a % b,
                _ => return Err(RuntimeFault::mismatch(op.name(), "an arithmetic operator", lhs)),
            };
            Ok(Value::Float(round_float(value, prim)))
        }
        Value::Bool(a) => {
            let Value::Bool(b) = rhs else {
                return Err(RuntimeFault::mismatch(op.name(), "a bool", rhs));
            };
            let (a, b) = (*a, *b);
            let value = match op {
                BinaryOp::Eq => a == b,
                BinaryOp::Ne => a != b,
                BinaryOp::BitAnd => a & b,
                BinaryOp::BitOr => a | b,
                BinaryOp::BitXor => a ^ b,
                _ => return Err(RuntimeFault::mismatch(op.name(), "a logical operator", lhs)),
            };
            Ok(Value::Bool(value))
        }
        Value::Str(a) => {
            let Value::Str(b) = rhs else {
                return Err(RuntimeFault::mismatch(op.name(), "a string", rhs));
            };
            if op == BinaryOp::Add {
                let mut joined = String::with_capacity(a.len() + b.len());
                joined.push_str(a);
                joined.push_str(b);
                return Ok(Value::str(joined));
            }
            compare(op, &**a, &**b)
                .map(Value::Bool)
                .ok_or_else(|| RuntimeFault::mismatch(op.name(), "a string operator", lhs))
        }
        Value::Char(a) => {
            let Value::Char(b) = rhs else {
                return Err(RuntimeFault::mismatch(op.name(), "a char", rhs));
            };
            compare(op, a, b)
                .map(Value::Bool)
                .ok_or_else(|| RuntimeFault::mismatch(op.name(), "a comparison", lhs))
        }
        other => Err(RuntimeFault::mismatch(op.name(), "a primitive value", other)),
    }
}

pub(crate) fn unary(op: UnaryOp, prim: Primitive, value: &Value) -> Result<Value, RuntimeFault> {
    match (op, value) {
        (UnaryOp::Neg, Value::Int(v)) => Ok(Value::Int(wrap_signed(v.wrapping_neg(), prim))),
        (UnaryOp::Neg, Value::UInt(v)) => Ok(Value::UInt(wrap_unsigned(v.wrapping_neg(), prim))),
        (UnaryOp::Neg, Value::Float(v)) => Ok(Value::Float(-v)),
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::BitNot, Value::Int(v)) => Ok(Value::Int(wrap_signed(!v, prim))),
        (UnaryOp::BitNot, Value::UInt(v)) => Ok(Value::UInt(wrap_unsigned(!v, prim))),
        (op, other) => Err(RuntimeFault::mismatch(op.name(), "a matching operand", other)),
    }
}

/// Numeric conversion, including `char` to and from integers.
pub(crate) fn convert(value: &Value, to: Primitive) -> Result<Value, RuntimeFault> {
    let invalid = || RuntimeFault::InvalidCast {
        from: value.kind_name().to_string(),
        to: to.name().to_string(),
    };
    let converted = match (value, to) {
        (Value::Int(v), p) if p.is_signed() => Value::Int(wrap_signed(*v, p)),
        (Value::UInt(v), p) if p.is_signed() => Value::Int(wrap_signed(*v as i64, p)),
        (Value::Float(v), p) if p.is_signed() => Value::Int(wrap_signed(*v as i64, p)),
        (Value::Char(c), p) if p.is_signed() => Value::Int(wrap_signed(*c as i64, p)),
        (Value::Int(v), p) if p.is_unsigned() => Value::UInt(wrap_unsigned(*v as u64, p)),
        (Value::UInt(v), p) if p.is_unsigned() => Value::UInt(wrap_unsigned(*v, p)),
        (Value::Float(v), p) if p.is_unsigned() => {
            let truncated = if *v < 0.0 { *v as i64 as u64 } else { *v as u64 };
            Value::UInt(wrap_unsigned(truncated, p))
        }
        (Value::Char(c), p) if p.is_unsigned() => Value::UInt(wrap_unsigned(*c as u64, p)),
        (Value::Int(v), p) if p.is_float() => Value::Float(round_float(*v as f64, p)),
        (Value::UInt(v), p) if p.is_float() => Value::Float(round_float(*v as f64, p)),
        (Value::Float(v), p) if p.is_float() => Value::Float(round_float(*v, p)),
        (Value::Int(v), Primitive::Char) => {
            Value::Char(u32::try_from(*v).ok().and_then(char::from_u32).ok_or_else(invalid)?)
        }
        (Value::UInt(v), Primitive::Char) => {
            Value::Char(u32::try_from(*v).ok().and_then(char::from_u32).ok_or_else(invalid)?)
        }
        (Value::Char(c), Primitive::Char) => Value::Char(*c),
        _ => return Err(invalid()),
    };
    Ok(converted)
}

/// The text `value as string` produces.
pub(crate) fn to_text(value: &Value) -> Result<String, RuntimeFault> {
    Ok(match value {
        Value::Bool(b) => b.to_string(),
        Value::Int(v) => v.to_string(),
        Value::UInt(v) => v.to_string(),
        Value::Float(v) => v.to_string(),
        Value::Char(c) => c.to_string(),
        Value::Str(s) => s.to_string(),
        other => {
            return Err(RuntimeFault::InvalidCast {
                from: other.kind_name().to_string(),
                to: "string".to_string(),
            })
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_arithmetic_wraps_to_width() {
        let sum = binary(
            BinaryOp::Add,
            OperandKind::Primitive(Primitive::I8),
            &Value::Int(120),
            &Value::Int(10),
        )
        .unwrap();
        assert_eq!(sum, Value::Int(-126));

        let product = binary(
            BinaryOp::Mul,
            OperandKind::Primitive(Primitive::U8),
            &Value::UInt(16),
            &Value::UInt(17),
        )
        .unwrap();
        assert_eq!(product, Value::UInt(16));
    }

    #[test]
    fn division_by_zero_faults() {
        let err = binary(
            BinaryOp::Rem,
            OperandKind::Primitive(Primitive::I32),
            &Value::Int(7),
            &Value::Int(0),
        )
        .unwrap_err();
        assert_eq!(err, RuntimeFault::DivisionByZero);
    }

    #[test]
    fn shifts_accept_any_integer_amount() {
        let shifted = binary(
            BinaryOp::Shl,
            OperandKind::Primitive(Primitive::I32),
            &Value::Int(1),
            &Value::UInt(4),
        )
        .unwrap();
        assert_eq!(shifted, Value::Int(16));

        let logical = binary(
            BinaryOp::Shr,
            OperandKind::Primitive(Primitive::U8),
            &Value::UInt(0x80),
            &Value::Int(7),
        )
        .unwrap();
        assert_eq!(logical, Value::UInt(1));
    }

    #[test]
    fn shift_amounts_wrap_at_operand_width() {
        let shl = |prim, lhs, amount| {
            binary(
                BinaryOp::Shl,
                OperandKind::Primitive(prim),
                &lhs,
                &Value::UInt(amount),
            )
            .unwrap()
        };
        assert_eq!(shl(Primitive::I32, Value::Int(1), 40), Value::Int(256));
        assert_eq!(shl(Primitive::U8, Value::UInt(1), 9), Value::UInt(2));
        assert_eq!(shl(Primitive::I64, Value::Int(1), 64), Value::Int(1));

        let sar = binary(
            BinaryOp::Shr,
            OperandKind::Primitive(Primitive::I8),
            &Value::Int(-128),
            &Value::Int(15),
        )
        .unwrap();
        assert_eq!(sar, Value::Int(-1));
    }

    #[test]
    fn strings_concatenate_and_compare() {
        let joined = binary(
            BinaryOp::Add,
            OperandKind::Primitive(Primitive::Str),
            &Value::str("hello "),
            &Value::str("world"),
        )
        .unwrap();
        assert_eq!(joined, Value::str("hello world"));

        let less = binary(
            BinaryOp::Lt,
            OperandKind::Primitive(Primitive::Str),
            &Value::str("abc"),
            &Value::str("abd"),
        )
        .unwrap();
        assert_eq!(less, Value::Bool(true));
    }

    #[test]
    fn numeric_conversions() {
        assert_eq!(convert(&Value::Int(300), Primitive::U8).unwrap(), Value::UInt(44));
        assert_eq!(convert(&Value::Int(-1), Primitive::U16).unwrap(), Value::UInt(0xffff));
        assert_eq!(convert(&Value::Float(2.9), Primitive::I32).unwrap(), Value::Int(2));
        assert_eq!(convert(&Value::Int(65), Primitive::Char).unwrap(), Value::Char('A'));
        assert_eq!(convert(&Value::Char('a'), Primitive::I32).unwrap(), Value::Int(97));
        assert!(matches!(
            convert(&Value::Int(-5), Primitive::Char),
            Err(RuntimeFault::InvalidCast { .. })
        ));
    }

    #[test]
    fn text_conversion() {
        assert_eq!(to_text(&Value::Int(-12)).unwrap(), "-12");
        assert_eq!(to_text(&Value::Float(1.5)).unwrap(), "1.5");
        assert_eq!(to_text(&Value::Bool(true)).unwrap(), "true");
        assert_eq!(to_text(&Value::Char('x')).unwrap(), "x");
    }

    #[test]
    fn literals_follow_destination_width() {
        assert_eq!(literal(&Literal::Int(7), Some(Primitive::U32)), Value::UInt(7));
        assert_eq!(
            literal(&Literal::Float(0.1), Some(Primitive::F32)),
            Value::Float(0.1f32 as f64)
        );
        assert_eq!(literal(&Literal::Str("hi".into()), None), Value::str("hi"));
    }
}
