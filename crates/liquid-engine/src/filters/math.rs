//! Math filters. Inputs and arguments coerce through [`Value::to_number`],
//! so numeric strings participate like numbers. Two integer operands
//! produce an integer; anything else produces a float.

use super::number_arg;
use super::number_input;
use super::FilterRegistry;
use crate::error::FilterError;
use crate::value::Number;
use crate::value::Value;

pub(super) fn register(registry: &mut FilterRegistry) {
    registry.insert_builtin("plus", plus);
    registry.insert_builtin("minus", minus);
    registry.insert_builtin("times", times);
    registry.insert_builtin("divided_by", divided_by);
    registry.insert_builtin("modulo", modulo);
    registry.insert_builtin("round", round);
    registry.insert_builtin("ceil", ceil);
    registry.insert_builtin("floor", floor);
    registry.insert_builtin("abs", abs);
}

fn binary(
    filter: &str,
    input: &Value,
    args: &[Value],
) -> Result<(Number, Number), FilterError> {
    let lhs = number_input(filter, input)?;
    let rhs = number_arg(filter, args, 0)?;
    Ok((lhs, rhs))
}

fn plus(input: &Value, args: &[Value]) -> Result<Value, FilterError> {
    Ok(match binary("plus", input, args)? {
        (Number::Int(a), Number::Int(b)) => Value::Int(a.wrapping_add(b)),
        (a, b) => Value::Float(a.as_f64() + b.as_f64()),
    })
}

fn minus(input: &Value, args: &[Value]) -> Result<Value, FilterError> {
    Ok(match binary("minus", input, args)? {
        (Number::Int(a), Number::Int(b)) => Value::Int(a.wrapping_sub(b)),
        (a, b) => Value::Float(a.as_f64() - b.as_f64()),
    })
}

fn times(input: &Value, args: &[Value]) -> Result<Value, FilterError> {
    Ok(match binary("times", input, args)? {
        (Number::Int(a), Number::Int(b)) => Value::Int(a.wrapping_mul(b)),
        (a, b) => Value::Float(a.as_f64() * b.as_f64()),
    })
}

/// Integer division floors toward negative infinity, matching Ruby.
fn divided_by(input: &Value, args: &[Value]) -> Result<Value, FilterError> {
    match binary("divided_by", input, args)? {
        (Number::Int(_), Number::Int(0)) => {
            Err(FilterError::invalid_argument("divided_by", "division by zero"))
        }
        (Number::Int(a), Number::Int(b)) => Ok(Value::Int(floor_div(a, b))),
        (a, b) => {
            let divisor = b.as_f64();
            if divisor == 0.0 {
                return Err(FilterError::invalid_argument(
                    "divided_by",
                    "division by zero",
                ));
            }
            Ok(Value::Float(a.as_f64() / divisor))
        }
    }
}

/// The result takes the sign of the divisor, matching Ruby's `%`.
fn modulo(input: &Value, args: &[Value]) -> Result<Value, FilterError> {
    match binary("modulo", input, args)? {
        (Number::Int(_), Number::Int(0)) => {
            Err(FilterError::invalid_argument("modulo", "division by zero"))
        }
        (Number::Int(a), Number::Int(b)) => Ok(Value::Int(a - b * floor_div(a, b))),
        (a, b) => {
            let divisor = b.as_f64();
            if divisor == 0.0 {
                return Err(FilterError::invalid_argument("modulo", "division by zero"));
            }
            let dividend = a.as_f64();
            Ok(Value::Float(dividend - divisor * (dividend / divisor).floor()))
        }
    }
}

/// Quotient rounded toward negative infinity. `b` must be non-zero.
fn floor_div(a: i64, b: i64) -> i64 {
    let q = a / b;
    if a % b != 0 && (a < 0) != (b < 0) {
        q - 1
    } else {
        q
    }
}

/// Round half away from zero, with an optional decimal precision.
fn round(input: &Value, args: &[Value]) -> Result<Value, FilterError> {
    let n = number_input("round", input)?;
    let precision = match args.first() {
        Some(_) => number_arg("round", args, 0)?.as_f64(),
        None => 0.0,
    };
    #[allow(clippy::cast_possible_truncation)]
    let precision = precision.clamp(0.0, 15.0) as i32;

    if precision == 0 {
        return Ok(match n {
            Number::Int(i) => Value::Int(i),
            #[allow(clippy::cast_possible_truncation)]
            Number::Float(f) => Value::Int(f.round() as i64),
        });
    }
    let factor = 10f64.powi(precision);
    Ok(Value::Float((n.as_f64() * factor).round() / factor))
}

fn ceil(input: &Value, _args: &[Value]) -> Result<Value, FilterError> {
    Ok(match number_input("ceil", input)? {
        Number::Int(i) => Value::Int(i),
        #[allow(clippy::cast_possible_truncation)]
        Number::Float(f) => Value::Int(f.ceil() as i64),
    })
}

fn floor(input: &Value, _args: &[Value]) -> Result<Value, FilterError> {
    Ok(match number_input("floor", input)? {
        Number::Int(i) => Value::Int(i),
        #[allow(clippy::cast_possible_truncation)]
        Number::Float(f) => Value::Int(f.floor() as i64),
    })
}

fn abs(input: &Value, _args: &[Value]) -> Result<Value, FilterError> {
    Ok(match number_input("abs", input)? {
        Number::Int(i) => Value::Int(i.wrapping_abs()),
        Number::Float(f) => Value::Float(f.abs()),
    })
}
