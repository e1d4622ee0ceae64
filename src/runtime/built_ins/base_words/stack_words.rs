use crate::{
    add_native_word,
    runtime::{
        data_structures::{return_stack::ReturnItem, value::Value},
        error::{self, script_error, ErrorKind},
        interpreter::Interpreter,
    },
};

/// Pop a stack position for PICK and ROLL.
fn pop_position(interpreter: &mut dyn Interpreter) -> error::Result<usize> {
    let position = interpreter.pop_as_int()?;

    if position < 0 {
        return script_error(
            interpreter,
            ErrorKind::TypeMismatch {
                word: interpreter.current_word().to_string(),
                expected: "a non-negative stack position".to_string(),
                found: position.to_string(),
            },
        );
    }

    Ok(position as usize)
}

fn return_stack_underflow<T>(interpreter: &dyn Interpreter) -> error::Result<T> {
    script_error(
        interpreter,
        ErrorKind::StackUnderflow {
            word: interpreter.current_word().to_string(),
            needed: 1,
            available: 0,
        },
    )
}

/// Duplicate the top value on the data stack.
///
/// Signature: `a -- a a`
fn word_dup(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let value = interpreter.pop()?;

    interpreter.push(value.clone());
    interpreter.push(value);

    Ok(())
}

/// Drop the top value on the data stack.
///
/// Signature: `a -- `
fn word_drop(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let _ = interpreter.pop()?;

    Ok(())
}

/// Swap the top 2 values on the data stack.
///
/// Signature: `a b -- b a`
fn word_swap(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    interpreter.require(2)?;

    let b = interpreter.pop()?;
    let a = interpreter.pop()?;

    interpreter.push(b);
    interpreter.push(a);

    Ok(())
}

/// Copy the second value to the top.
///
/// Signature: `a b -- a b a`
fn word_over(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    interpreter.require(2)?;

    let b = interpreter.pop()?;
    let a = interpreter.pop()?;

    interpreter.push(a.clone());
    interpreter.push(b);
    interpreter.push(a);

    Ok(())
}

/// Rotate the third value to the top.
///
/// Signature: `a b c -- b c a`
fn word_rot(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    interpreter.require(3)?;

    let c = interpreter.pop()?;
    let b = interpreter.pop()?;
    let a = interpreter.pop()?;

    interpreter.push(b);
    interpreter.push(c);
    interpreter.push(a);

    Ok(())
}

/// Rotate the top value down to third place.
///
/// Signature: `a b c -- c a b`
fn word_minus_rot(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    interpreter.require(3)?;

    let c = interpreter.pop()?;
    let b = interpreter.pop()?;
    let a = interpreter.pop()?;

    interpreter.push(c);
    interpreter.push(a);
    interpreter.push(b);

    Ok(())
}

/// Signature: `a b -- b`
fn word_nip(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    interpreter.require(2)?;

    let b = interpreter.pop()?;
    let _ = interpreter.pop()?;

    interpreter.push(b);

    Ok(())
}

/// Signature: `a b -- b a b`
fn word_tuck(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    interpreter.require(2)?;

    let b = interpreter.pop()?;
    let a = interpreter.pop()?;

    interpreter.push(b.clone());
    interpreter.push(a);
    interpreter.push(b);

    Ok(())
}

/// Signature: `a b -- a b a b`
fn word_two_dup(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    interpreter.require(2)?;

    let length = interpreter.stack().len();
    let pair = interpreter.stack()[length - 2..].to_vec();

    interpreter.stack_mut().extend(pair);

    Ok(())
}

/// Signature: `a b -- `
fn word_two_drop(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    interpreter.require(2)?;

    let length = interpreter.stack().len();
    interpreter.stack_mut().truncate(length - 2);

    Ok(())
}

/// Signature: `a b c d -- c d a b`
fn word_two_swap(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    interpreter.require(4)?;

    let length = interpreter.stack().len();
    interpreter.stack_mut()[length - 4..].rotate_left(2);

    Ok(())
}

/// Signature: `a b c d -- a b c d a b`
fn word_two_over(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    interpreter.require(4)?;

    let length = interpreter.stack().len();
    let pair = interpreter.stack()[length - 4..length - 2].to_vec();

    interpreter.stack_mut().extend(pair);

    Ok(())
}

/// Push the depth of the stack before this word was called.
///
/// Signature: ` -- depth`
fn word_depth(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let depth = interpreter.stack().len() as i64;

    interpreter.push(Value::Int(depth));

    Ok(())
}

/// Copy the value `n` places below the top, `0 PICK` is DUP.
///
/// Signature: `... n -- ... value`
fn word_pick(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let position = pop_position(interpreter)?;

    interpreter.require(position + 1)?;

    let length = interpreter.stack().len();
    let value = interpreter.stack()[length - 1 - position].clone();

    interpreter.push(value);

    Ok(())
}

/// Move the value `n` places below the top to the top, `1 ROLL` is SWAP.
///
/// Signature: `... n -- ... value`
fn word_roll(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let position = pop_position(interpreter)?;

    if position == 0 {
        return Ok(());
    }

    interpreter.require(position + 1)?;

    let length = interpreter.stack().len();
    let value = interpreter.stack_mut().remove(length - 1 - position);

    interpreter.push(value);

    Ok(())
}

/// Signature: `... -- `
fn word_clear(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    interpreter.stack_mut().clear();

    Ok(())
}

/// Duplicate the top value only if it's non-zero.
///
/// Signature: `a -- a a | 0`
fn word_query_dup(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    interpreter.require(1)?;

    let top = interpreter.stack()[interpreter.stack().len() - 1].clone();

    if top.as_flag() != Some(false) {
        interpreter.push(top);
    }

    Ok(())
}

/// Move the top value to the return stack.
///
/// Signature: `a -- ` `R: -- a`
fn word_to_r(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let value = interpreter.pop()?;

    interpreter.return_push(ReturnItem::Value(value))
}

/// Move a value from the return stack back to the data stack.
///
/// Signature: ` -- a` `R: a -- `
fn word_r_from(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    match interpreter.return_stack_mut().pop_value() {
        Some(value) => {
            interpreter.push(value);
            Ok(())
        }
        None => return_stack_underflow(interpreter),
    }
}

/// Copy the top of the return stack.
///
/// Signature: ` -- a` `R: a -- a`
fn word_r_fetch(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    match interpreter.return_stack().peek_value().cloned() {
        Some(value) => {
            interpreter.push(value);
            Ok(())
        }
        None => return_stack_underflow(interpreter),
    }
}

pub fn register_stack_words(interpreter: &mut dyn Interpreter) {
    add_native_word!(interpreter, "DUP", word_dup, "Duplicate the top of the stack.", "a -- a a");
    add_native_word!(interpreter, "DROP", word_drop, "Discard the top of the stack.", "a -- ");
    add_native_word!(interpreter, "SWAP", word_swap, "Exchange the top two values.", "a b -- b a");

    add_native_word!(
        interpreter,
        "OVER",
        word_over,
        "Copy the second value to the top.",
        "a b -- a b a"
    );

    add_native_word!(
        interpreter,
        "ROT",
        word_rot,
        "Rotate the third value to the top.",
        "a b c -- b c a"
    );

    add_native_word!(
        interpreter,
        "-ROT",
        word_minus_rot,
        "Rotate the top value to third place.",
        "a b c -- c a b"
    );

    add_native_word!(interpreter, "NIP", word_nip, "Drop the second value.", "a b -- b");

    add_native_word!(
        interpreter,
        "TUCK",
        word_tuck,
        "Copy the top value below the second.",
        "a b -- b a b"
    );

    add_native_word!(
        interpreter,
        "2DUP",
        word_two_dup,
        "Duplicate the top pair.",
        "a b -- a b a b"
    );

    add_native_word!(interpreter, "2DROP", word_two_drop, "Drop the top pair.", "a b -- ");

    add_native_word!(
        interpreter,
        "2SWAP",
        word_two_swap,
        "Exchange the top two pairs.",
        "a b c d -- c d a b"
    );

    add_native_word!(
        interpreter,
        "2OVER",
        word_two_over,
        "Copy the second pair to the top.",
        "a b c d -- a b c d a b"
    );

    add_native_word!(
        interpreter,
        "DEPTH",
        word_depth,
        "Push the number of values on the stack.",
        " -- depth"
    );

    add_native_word!(
        interpreter,
        "PICK",
        word_pick,
        "Copy the nth value to the top, 0 is the top itself.",
        "... n -- ... value"
    );

    add_native_word!(
        interpreter,
        "ROLL",
        word_roll,
        "Move the nth value to the top.",
        "... n -- ... value"
    );

    add_native_word!(interpreter, "CLEAR", word_clear, "Empty the data stack.", "... -- ");

    add_native_word!(
        interpreter,
        "?DUP",
        word_query_dup,
        "Duplicate the top value if it's non-zero.",
        "a -- a a | 0"
    );

    add_native_word!(
        interpreter,
        ">R",
        word_to_r,
        "Move the top value to the return stack.",
        "a -- R: -- a"
    );

    add_native_word!(
        interpreter,
        "R>",
        word_r_from,
        "Move the top of the return stack to the data stack.",
        " -- a R: a -- "
    );

    add_native_word!(
        interpreter,
        "R@",
        word_r_fetch,
        "Copy the top of the return stack to the data stack.",
        " -- a R: a -- a"
    );
}
