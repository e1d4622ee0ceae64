use crate::{
    add_native_word,
    runtime::{
        data_structures::value::Value,
        error::{self, script_error, ErrorKind},
        interpreter::{type_mismatch, Interpreter},
    },
};

/// Print and remove the top of the stack.
///
/// Signature: `value -- `
fn word_dot(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let value = interpreter.pop()?;

    interpreter.output(&format!("{} ", value));
    Ok(())
}

/// Print the whole stack, bottom first, without changing it.
///
/// Signature: ` -- `
fn word_dot_s(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let text = if interpreter.stack().is_empty() {
        "<empty> ".to_string()
    } else {
        let items: Vec<String> = interpreter.stack().iter().map(Value::to_string).collect();

        format!("<{}> {} ", items.len(), items.join(" "))
    };

    interpreter.output(&text);
    Ok(())
}

fn word_cr(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    interpreter.output("\n");
    Ok(())
}

fn word_space(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    interpreter.output(" ");
    Ok(())
}

/// Negative counts print nothing.
///
/// Signature: `count -- `
fn word_spaces(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let count = interpreter.pop_as_int()?.max(0) as usize;

    interpreter.output(&" ".repeat(count));
    Ok(())
}

/// Print the character with the given code point.
///
/// Signature: `code -- `
fn word_emit(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let value = interpreter.pop()?;

    let character = value
        .as_int()
        .and_then(|code| u32::try_from(code).ok())
        .and_then(char::from_u32);

    match character {
        Some(character) => {
            interpreter.output(&character.to_string());
            Ok(())
        }
        None => type_mismatch(interpreter, "a character code", &value),
    }
}

/// Print the first `count` characters of a string, the pair `S"` leaves behind.
///
/// Signature: `string count -- `
fn word_type(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    interpreter.require(2)?;

    let count = interpreter.pop_as_int()?.max(0) as usize;
    let text = interpreter.pop_as_string()?;
    let text: String = text.chars().take(count).collect();

    interpreter.output(&text);
    Ok(())
}

/// List every visible word.
///
/// Signature: ` -- `
fn word_words(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let listing = interpreter.dictionary().to_string();

    interpreter.output(&listing);
    Ok(())
}

/// Print the definition of the word named next in the source.
///
/// Signature: ` -- `
fn word_see(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let (_, name) = interpreter.next_token_name()?;

    let listing = interpreter
        .dictionary()
        .try_get(&name)
        .map(|entry| entry.describe(interpreter.dictionary()));

    match listing {
        Some(listing) => {
            interpreter.output(&listing);
            Ok(())
        }
        None => {
            let suggestions = interpreter.dictionary().suggest_similar(&name);

            script_error(interpreter, ErrorKind::UnknownWord { name, suggestions })
        }
    }
}

pub fn register_io_words(interpreter: &mut dyn Interpreter) {
    add_native_word!(interpreter, ".", word_dot, "Print and remove the top value.", "value -- ");

    add_native_word!(
        interpreter,
        ".S",
        word_dot_s,
        "Print the stack without changing it.",
        " -- "
    );

    add_native_word!(interpreter, "CR", word_cr, "Print a new line.", " -- ");
    add_native_word!(interpreter, "SPACE", word_space, "Print a space.", " -- ");
    add_native_word!(interpreter, "SPACES", word_spaces, "Print n spaces.", "count -- ");

    add_native_word!(
        interpreter,
        "EMIT",
        word_emit,
        "Print the character with the given code.",
        "code -- "
    );

    add_native_word!(
        interpreter,
        "TYPE",
        word_type,
        "Print a string.",
        "string count -- "
    );

    add_native_word!(interpreter, "WORDS", word_words, "List every known word.", " -- ");

    add_native_word!(
        interpreter,
        "SEE",
        word_see,
        "Show the definition of the following word.",
        " -- "
    );
}
