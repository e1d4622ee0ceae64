use crate::{
    add_native_word,
    lang::tokenizing::NumberType,
    runtime::{
        data_structures::value::Value,
        error::{self, script_error, ErrorKind},
        interpreter::{allot_cells, type_mismatch, Interpreter},
    },
};

fn invalid_address<T>(interpreter: &dyn Interpreter, address: usize) -> error::Result<T> {
    script_error(
        interpreter,
        ErrorKind::InvalidAddress {
            word: interpreter.current_word().to_string(),
            address: address as i64,
        },
    )
}

/// Fetch the value held in a cell.
///
/// Signature: `address -- value`
fn word_fetch(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let address = interpreter.pop_as_address()?;

    match interpreter.cells().fetch(address).cloned() {
        Some(value) => {
            interpreter.push(value);
            Ok(())
        }
        None => invalid_address(interpreter, address),
    }
}

/// Store a value into a cell.
///
/// Signature: `value address -- `
fn word_store(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    interpreter.require(2)?;

    let address = interpreter.pop_as_address()?;
    let value = interpreter.pop()?;

    if !interpreter.cells_mut().store(address, value) {
        return invalid_address(interpreter, address);
    }

    Ok(())
}

/// Add a number to the value held in a cell.
///
/// Signature: `n address -- `
fn word_plus_store(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    interpreter.require(2)?;

    let address = interpreter.pop_as_address()?;
    let increment = interpreter.pop_as_number()?;

    let Some(current) = interpreter.cells().fetch(address).cloned() else {
        return invalid_address(interpreter, address);
    };

    let sum = match (current.as_number(), increment) {
        (Some(NumberType::Int(a)), NumberType::Int(b)) => Value::Int(a.wrapping_add(b)),
        (Some(NumberType::Int(a)), NumberType::Float(b)) => Value::Float(a as f64 + b),
        (Some(NumberType::Float(a)), NumberType::Int(b)) => Value::Float(a + b as f64),
        (Some(NumberType::Float(a)), NumberType::Float(b)) => Value::Float(a + b),
        (None, _) => return type_mismatch(interpreter, "number", &current),
    };

    let _ = interpreter.cells_mut().store(address, sum);
    Ok(())
}

/// Every cell holds one value, so a count of cells is its own size.
///
/// Signature: `n -- n`
fn word_cells(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let count = interpreter.pop_as_int()?;

    interpreter.push(Value::Int(count));
    Ok(())
}

/// Reserve more cells at the end of memory.
///
/// Signature: `n -- `
fn word_allot(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let count = interpreter.pop_as_int()?;

    if count < 0 {
        return script_error(
            interpreter,
            ErrorKind::TypeMismatch {
                word: interpreter.current_word().to_string(),
                expected: "a non-negative cell count".to_string(),
                found: count.to_string(),
            },
        );
    }

    allot_cells(interpreter, count as usize)?;
    Ok(())
}

/// Signature: ` -- address`
fn word_here(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let here = interpreter.cells().here();

    interpreter.push(Value::Address(here));
    Ok(())
}

pub fn register_memory_words(interpreter: &mut dyn Interpreter) {
    add_native_word!(
        interpreter,
        "@",
        word_fetch,
        "Fetch the value stored at an address.",
        "address -- value"
    );

    add_native_word!(
        interpreter,
        "!",
        word_store,
        "Store a value at an address.",
        "value address -- "
    );

    add_native_word!(
        interpreter,
        "+!",
        word_plus_store,
        "Add to the value stored at an address.",
        "n address -- "
    );

    add_native_word!(
        interpreter,
        "CELLS",
        word_cells,
        "Convert a count of cells to a memory size.",
        "n -- size"
    );

    add_native_word!(
        interpreter,
        "ALLOT",
        word_allot,
        "Reserve n more cells of memory.",
        "n -- "
    );

    add_native_word!(
        interpreter,
        "HERE",
        word_here,
        "The address the next reserved cell will get.",
        " -- address"
    );
}
