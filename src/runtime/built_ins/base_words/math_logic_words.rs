use crate::{
    add_native_word,
    lang::tokenizing::NumberType,
    runtime::{
        data_structures::value::{ToValue, Value},
        error::{self, script_error, ErrorKind},
        interpreter::{type_mismatch, Interpreter},
    },
};
use std::cmp::Ordering;

fn as_float(number: NumberType) -> f64 {
    match number {
        NumberType::Int(value) => value as f64,
        NumberType::Float(value) => value,
    }
}

fn is_zero(number: NumberType) -> bool {
    match number {
        NumberType::Int(value) => value == 0,
        NumberType::Float(value) => value == 0.0,
    }
}

fn to_number(interpreter: &dyn Interpreter, value: &Value) -> error::Result<NumberType> {
    match value.as_number() {
        Some(number) => Ok(number),
        None => type_mismatch(interpreter, "number", value),
    }
}

fn to_int(interpreter: &dyn Interpreter, value: &Value) -> error::Result<i64> {
    match value.as_int() {
        Some(number) => Ok(number),
        None => type_mismatch(interpreter, "integer", value),
    }
}

/// Pop the two operands of a binary word, second then top.  Both are checked for before either
/// is taken.
fn pop_pair(interpreter: &mut dyn Interpreter) -> error::Result<(Value, Value)> {
    interpreter.require(2)?;

    let b = interpreter.pop()?;
    let a = interpreter.pop()?;

    Ok((a, b))
}

fn pop_numbers(interpreter: &mut dyn Interpreter) -> error::Result<(NumberType, NumberType)> {
    let (a, b) = pop_pair(interpreter)?;

    Ok((to_number(interpreter, &a)?, to_number(interpreter, &b)?))
}

/// Integer division that rounds toward negative infinity, returning the quotient and remainder.
/// The remainder takes the sign of the divisor.
fn floored_div_mod(dividend: i128, divisor: i128) -> (i128, i128) {
    let quotient = dividend / divisor;
    let remainder = dividend % divisor;

    if remainder != 0 && ((remainder < 0) != (divisor < 0)) {
        (quotient - 1, remainder + divisor)
    } else {
        (quotient, remainder)
    }
}

fn float_mod(a: f64, b: f64) -> f64 {
    a - b * (a / b).floor()
}

/// Apply a binary operation, integers stay integers and anything else promotes to float.
fn combine(
    interpreter: &mut dyn Interpreter,
    a: &Value,
    b: &Value,
    int_op: fn(i64, i64) -> i64,
    float_op: fn(f64, f64) -> f64,
) -> error::Result<()> {
    let result = match (to_number(interpreter, a)?, to_number(interpreter, b)?) {
        (NumberType::Int(a), NumberType::Int(b)) => Value::Int(int_op(a, b)),
        (a, b) => Value::Float(float_op(as_float(a), as_float(b))),
    };

    interpreter.push(result);
    Ok(())
}

fn binary_math(
    interpreter: &mut dyn Interpreter,
    int_op: fn(i64, i64) -> i64,
    float_op: fn(f64, f64) -> f64,
) -> error::Result<()> {
    let (a, b) = pop_pair(interpreter)?;

    combine(interpreter, &a, &b, int_op, float_op)
}

fn unary_math(
    interpreter: &mut dyn Interpreter,
    int_op: fn(i64) -> i64,
    float_op: fn(f64) -> f64,
) -> error::Result<()> {
    let result = match interpreter.pop_as_number()? {
        NumberType::Int(value) => Value::Int(int_op(value)),
        NumberType::Float(value) => Value::Float(float_op(value)),
    };

    interpreter.push(result);
    Ok(())
}

/// Offsetting an address gives another address.
fn offset_address(
    interpreter: &mut dyn Interpreter,
    address: usize,
    offset: i64,
) -> error::Result<()> {
    let target = (address as i64).wrapping_add(offset);

    if target < 0 {
        return script_error(
            interpreter,
            ErrorKind::InvalidAddress {
                word: interpreter.current_word().to_string(),
                address: target,
            },
        );
    }

    interpreter.push(Value::Address(target as usize));
    Ok(())
}

/// Signature: `a b -- sum`
fn word_add(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let (a, b) = pop_pair(interpreter)?;

    match (&a, &b) {
        (Value::Address(address), Value::Int(offset))
        | (Value::Int(offset), Value::Address(address)) => {
            offset_address(interpreter, *address, *offset)
        }

        _ => combine(interpreter, &a, &b, i64::wrapping_add, |a, b| a + b),
    }
}

/// Signature: `a b -- difference`
fn word_subtract(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let (a, b) = pop_pair(interpreter)?;

    match (&a, &b) {
        (Value::Address(address), Value::Int(offset)) => {
            offset_address(interpreter, *address, offset.wrapping_neg())
        }

        _ => combine(interpreter, &a, &b, i64::wrapping_sub, |a, b| a - b),
    }
}

/// Signature: `a b -- product`
fn word_multiply(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    binary_math(interpreter, i64::wrapping_mul, |a, b| a * b)
}

fn division_by_zero<T>(interpreter: &dyn Interpreter, dividend: NumberType) -> error::Result<T> {
    script_error(
        interpreter,
        ErrorKind::DivisionByZero {
            dividend: dividend.to_value(),
        },
    )
}

/// Pop the operands of a division, failing before anything else if the divisor is zero.
fn pop_division(interpreter: &mut dyn Interpreter) -> error::Result<(NumberType, NumberType)> {
    let (a, b) = pop_numbers(interpreter)?;

    if is_zero(b) {
        return division_by_zero(interpreter, a);
    }

    Ok((a, b))
}

/// Floored division.
///
/// Signature: `a b -- quotient`
fn word_divide(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let result = match pop_division(interpreter)? {
        (NumberType::Int(a), NumberType::Int(b)) => {
            Value::Int(floored_div_mod(a as i128, b as i128).0 as i64)
        }
        (a, b) => Value::Float(as_float(a) / as_float(b)),
    };

    interpreter.push(result);
    Ok(())
}

/// The remainder takes the sign of the divisor.
///
/// Signature: `a b -- remainder`
fn word_mod(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let result = match pop_division(interpreter)? {
        (NumberType::Int(a), NumberType::Int(b)) => {
            Value::Int(floored_div_mod(a as i128, b as i128).1 as i64)
        }
        (a, b) => Value::Float(float_mod(as_float(a), as_float(b))),
    };

    interpreter.push(result);
    Ok(())
}

/// Signature: `a b -- remainder quotient`
fn word_div_mod(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let (remainder, quotient) = match pop_division(interpreter)? {
        (NumberType::Int(a), NumberType::Int(b)) => {
            let (quotient, remainder) = floored_div_mod(a as i128, b as i128);
            (Value::Int(remainder as i64), Value::Int(quotient as i64))
        }
        (a, b) => {
            let (a, b) = (as_float(a), as_float(b));
            (Value::Float(float_mod(a, b)), Value::Float((a / b).floor()))
        }
    };

    interpreter.push(remainder);
    interpreter.push(quotient);
    Ok(())
}

/// Multiply then divide, with the intermediate product kept at double width.
///
/// Signature: `a b c -- (a*b)/c`
fn word_star_slash(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    interpreter.require(3)?;

    let c = interpreter.pop_as_number()?;
    let (a, b) = pop_numbers(interpreter)?;

    let result = match (a, b, c) {
        (NumberType::Int(a), NumberType::Int(b), NumberType::Int(c)) => {
            let product = a as i128 * b as i128;

            if c == 0 {
                return division_by_zero(interpreter, NumberType::Int(product as i64));
            }

            Value::Int(floored_div_mod(product, c as i128).0 as i64)
        }
        (a, b, c) => {
            let product = as_float(a) * as_float(b);

            if is_zero(c) {
                return division_by_zero(interpreter, NumberType::Float(product));
            }

            Value::Float(product / as_float(c))
        }
    };

    interpreter.push(result);
    Ok(())
}

/// Signature: `a -- -a`
fn word_negate(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    unary_math(interpreter, i64::wrapping_neg, |value| -value)
}

/// Signature: `a -- |a|`
fn word_abs(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    unary_math(interpreter, i64::wrapping_abs, f64::abs)
}

fn pick_by_order(interpreter: &mut dyn Interpreter, keep: Ordering) -> error::Result<()> {
    let (a, b) = pop_numbers(interpreter)?;

    let result = match (a, b) {
        (NumberType::Int(x), NumberType::Int(y)) => {
            Value::Int(if x.cmp(&y) == keep { x } else { y })
        }
        (x, y) => {
            let (x, y) = (as_float(x), as_float(y));

            Value::Float(if keep == Ordering::Less { x.min(y) } else { x.max(y) })
        }
    };

    interpreter.push(result);
    Ok(())
}

/// Signature: `a b -- min`
fn word_min(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    pick_by_order(interpreter, Ordering::Less)
}

/// Signature: `a b -- max`
fn word_max(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    pick_by_order(interpreter, Ordering::Greater)
}

fn word_one_plus(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    unary_math(interpreter, |value| value.wrapping_add(1), |value| value + 1.0)
}

fn word_one_minus(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    unary_math(interpreter, |value| value.wrapping_sub(1), |value| value - 1.0)
}

fn word_two_plus(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    unary_math(interpreter, |value| value.wrapping_add(2), |value| value + 2.0)
}

fn word_two_minus(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    unary_math(interpreter, |value| value.wrapping_sub(2), |value| value - 2.0)
}

fn word_two_star(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    unary_math(interpreter, |value| value.wrapping_mul(2), |value| value * 2.0)
}

/// Halving rounds toward negative infinity, like `2 /`.
fn word_two_slash(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    unary_math(interpreter, |value| value >> 1, |value| value / 2.0)
}

/// Order two numbers.  NaN isn't ordered against anything.
fn compare(a: NumberType, b: NumberType) -> Option<Ordering> {
    match (a, b) {
        (NumberType::Int(a), NumberType::Int(b)) => Some(a.cmp(&b)),
        (a, b) => as_float(a).partial_cmp(&as_float(b)),
    }
}

fn comparison(interpreter: &mut dyn Interpreter, test: fn(Ordering) -> bool) -> error::Result<()> {
    let (a, b) = pop_numbers(interpreter)?;
    let flag = compare(a, b).map(test).unwrap_or(false);

    interpreter.push(Value::Flag(flag));
    Ok(())
}

fn zero_comparison(
    interpreter: &mut dyn Interpreter,
    test: fn(Ordering) -> bool,
) -> error::Result<()> {
    let a = interpreter.pop_as_number()?;
    let flag = compare(a, NumberType::Int(0)).map(test).unwrap_or(false);

    interpreter.push(Value::Flag(flag));
    Ok(())
}

/// Any two values can be tested for equality, numbers compare by value whatever their kind.
///
/// Signature: `a b -- flag`
fn word_equal(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let (a, b) = pop_pair(interpreter)?;

    interpreter.push(Value::Flag(a == b));
    Ok(())
}

/// Signature: `a b -- flag`
fn word_not_equal(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let (a, b) = pop_pair(interpreter)?;

    interpreter.push(Value::Flag(a != b));
    Ok(())
}

fn word_less(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    comparison(interpreter, Ordering::is_lt)
}

fn word_greater(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    comparison(interpreter, Ordering::is_gt)
}

fn word_less_equal(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    comparison(interpreter, Ordering::is_le)
}

fn word_greater_equal(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    comparison(interpreter, Ordering::is_ge)
}

fn word_zero_equal(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    zero_comparison(interpreter, Ordering::is_eq)
}

fn word_zero_less(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    zero_comparison(interpreter, Ordering::is_lt)
}

fn word_zero_greater(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    zero_comparison(interpreter, Ordering::is_gt)
}

fn word_zero_not_equal(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    zero_comparison(interpreter, Ordering::is_ne)
}

/// Bitwise logic.  Two flags give a flag back, since -1 and 0 are closed under every one of these
/// operations.
fn bitwise(interpreter: &mut dyn Interpreter, op: fn(i64, i64) -> i64) -> error::Result<()> {
    let (a, b) = pop_pair(interpreter)?;
    let both_flags = matches!((&a, &b), (Value::Flag(_), Value::Flag(_)));

    let result = op(to_int(interpreter, &a)?, to_int(interpreter, &b)?);

    interpreter.push(if both_flags {
        Value::Flag(result != 0)
    } else {
        Value::Int(result)
    });

    Ok(())
}

fn word_and(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    bitwise(interpreter, |a, b| a & b)
}

fn word_or(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    bitwise(interpreter, |a, b| a | b)
}

fn word_xor(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    bitwise(interpreter, |a, b| a ^ b)
}

/// Signature: `a -- ~a`
fn word_invert(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let value = interpreter.pop()?;

    let result = match value {
        Value::Flag(flag) => Value::Flag(!flag),
        other => Value::Int(!to_int(interpreter, &other)?),
    };

    interpreter.push(result);
    Ok(())
}

/// Shifts by 64 bits or more, or by a negative count, clear the value.
fn shift(interpreter: &mut dyn Interpreter, op: fn(u64, u32) -> u64) -> error::Result<()> {
    let (value, count) = pop_pair(interpreter)?;
    let value = to_int(interpreter, &value)?;
    let count = to_int(interpreter, &count)?;

    let result = if (0..64).contains(&count) {
        op(value as u64, count as u32) as i64
    } else {
        0
    };

    interpreter.push(Value::Int(result));
    Ok(())
}

/// Signature: `a count -- a<<count`
fn word_lshift(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    shift(interpreter, |value, count| value << count)
}

/// A logical shift, zeros come in from the top.
///
/// Signature: `a count -- a>>count`
fn word_rshift(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    shift(interpreter, |value, count| value >> count)
}

fn word_true(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    interpreter.push(Value::Flag(true));
    Ok(())
}

fn word_false(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    interpreter.push(Value::Flag(false));
    Ok(())
}

/// Logical not, unlike INVERT any non-zero value gives false.
///
/// Signature: `a -- flag`
fn word_not(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let flag = interpreter.pop_as_bool()?;

    interpreter.push(Value::Flag(!flag));
    Ok(())
}

pub fn register_math_logic_words(interpreter: &mut dyn Interpreter) {
    add_native_word!(interpreter, "+", word_add, "Add two numbers.", "a b -- sum");
    add_native_word!(
        interpreter,
        "-",
        word_subtract,
        "Subtract the top number from the second.",
        "a b -- difference"
    );
    add_native_word!(interpreter, "*", word_multiply, "Multiply two numbers.", "a b -- product");
    add_native_word!(
        interpreter,
        "/",
        word_divide,
        "Divide the second number by the top, rounding down.",
        "a b -- quotient"
    );
    add_native_word!(
        interpreter,
        "MOD",
        word_mod,
        "Remainder of a floored division.",
        "a b -- remainder"
    );
    add_native_word!(
        interpreter,
        "/MOD",
        word_div_mod,
        "Floored division giving both remainder and quotient.",
        "a b -- remainder quotient"
    );
    add_native_word!(
        interpreter,
        "*/",
        word_star_slash,
        "Multiply then divide without overflowing the intermediate product.",
        "a b c -- result"
    );
    add_native_word!(interpreter, "NEGATE", word_negate, "Negate a number.", "a -- -a");
    add_native_word!(interpreter, "ABS", word_abs, "Absolute value.", "a -- |a|");
    add_native_word!(interpreter, "MIN", word_min, "The smaller of two numbers.", "a b -- min");
    add_native_word!(interpreter, "MAX", word_max, "The larger of two numbers.", "a b -- max");
    add_native_word!(interpreter, "1+", word_one_plus, "Increment.", "a -- a+1");
    add_native_word!(interpreter, "1-", word_one_minus, "Decrement.", "a -- a-1");
    add_native_word!(interpreter, "2+", word_two_plus, "Add two.", "a -- a+2");
    add_native_word!(interpreter, "2-", word_two_minus, "Subtract two.", "a -- a-2");
    add_native_word!(interpreter, "2*", word_two_star, "Double.", "a -- a*2");
    add_native_word!(interpreter, "2/", word_two_slash, "Halve, rounding down.", "a -- a/2");

    add_native_word!(interpreter, "=", word_equal, "Are the values equal?", "a b -- flag");
    add_native_word!(interpreter, "<>", word_not_equal, "Are the values different?", "a b -- flag");
    add_native_word!(interpreter, "<", word_less, "Is a less than b?", "a b -- flag");
    add_native_word!(interpreter, ">", word_greater, "Is a greater than b?", "a b -- flag");
    add_native_word!(
        interpreter,
        "<=",
        word_less_equal,
        "Is a less than or equal to b?",
        "a b -- flag"
    );
    add_native_word!(
        interpreter,
        ">=",
        word_greater_equal,
        "Is a greater than or equal to b?",
        "a b -- flag"
    );
    add_native_word!(interpreter, "0=", word_zero_equal, "Is the value zero?", "a -- flag");
    add_native_word!(interpreter, "0<", word_zero_less, "Is the value negative?", "a -- flag");
    add_native_word!(interpreter, "0>", word_zero_greater, "Is the value positive?", "a -- flag");
    add_native_word!(
        interpreter,
        "0<>",
        word_zero_not_equal,
        "Is the value non-zero?",
        "a -- flag"
    );

    add_native_word!(interpreter, "AND", word_and, "Bitwise and.", "a b -- result");
    add_native_word!(interpreter, "OR", word_or, "Bitwise or.", "a b -- result");
    add_native_word!(interpreter, "XOR", word_xor, "Bitwise exclusive or.", "a b -- result");
    add_native_word!(interpreter, "INVERT", word_invert, "Flip every bit.", "a -- ~a");
    add_native_word!(interpreter, "LSHIFT", word_lshift, "Shift left.", "a count -- result");
    add_native_word!(
        interpreter,
        "RSHIFT",
        word_rshift,
        "Logical shift right.",
        "a count -- result"
    );
    add_native_word!(interpreter, "TRUE", word_true, "Push the true flag.", " -- -1");
    add_native_word!(interpreter, "FALSE", word_false, "Push the false flag.", " -- 0");
    add_native_word!(interpreter, "NOT", word_not, "Logical not.", "a -- flag");
}
