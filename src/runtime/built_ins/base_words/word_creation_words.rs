use crate::{
    add_compile_only_word, add_native_immediate_word, add_native_word,
    lang::{
        code::{Instruction, Op},
        compilation::Construction,
        source_buffer::SourceLocation,
    },
    runtime::{
        data_structures::{
            dictionary::{WordBody, WordInfo, WordRuntime, WordSource, WordVisibility},
            value::Value,
        },
        error::{self, script_error, ErrorKind},
        interpreter::{allot_cells, Interpreter},
    },
};
use std::rc::Rc;

/// Add a word whose whole body pushes one value, the shape CONSTANT and VARIABLE create.
fn insert_value_word(
    interpreter: &mut dyn Interpreter,
    location: SourceLocation,
    name: &str,
    value: Value,
    signature: &str,
    source: WordSource,
) {
    let code = vec![
        Instruction::new(Some(location.clone()), Op::PushLiteral(value)),
        Instruction::new(None, Op::Exit),
    ];

    let mut word_info = WordInfo::new(location, name, WordBody::Compiled(Rc::new(code)));
    word_info.signature = signature.to_string();
    word_info.source = Some(source);

    let index = interpreter.dictionary_mut().insert(word_info);
    log::debug!("Defined {} as word {}.", name.to_uppercase(), index);
}

/// Start the creation of a new word.  The entry is reserved right away, hidden, so the body can
/// refer to its own index while older definitions of the name stay visible.
///
/// Signature: ` -- `
fn word_colon(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    if interpreter.is_compiling() {
        return script_error(
            interpreter,
            ErrorKind::ControlStructureMismatch {
                opener: ":".to_string(),
                expected: ";".to_string(),
            },
        );
    }

    let _ = interpreter.context()?;
    let (location, name) = interpreter.next_token_name()?;

    let mut word_info = WordInfo::new(
        location.clone(),
        &name,
        WordBody::Compiled(Rc::new(Vec::new())),
    );
    word_info.visibility = WordVisibility::Hidden;

    let name = word_info.name.clone();
    let index = interpreter.dictionary_mut().insert(word_info);

    interpreter.context_mut()?.construction = Some(Construction::new(index, &name, location));

    Ok(())
}

/// Close the definition, install its body and make it visible.
///
/// Signature: ` -- `
fn word_semicolon(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let code = match interpreter.construction_mut()?.finish() {
        Ok(code) => code,
        Err(kind) => return script_error(interpreter, kind),
    };

    let Some(construction) = interpreter.context_mut()?.construction.take() else {
        return script_error(
            interpreter,
            ErrorKind::CompileOnly {
                word: ";".to_string(),
            },
        );
    };

    if let Some(entry) = interpreter.dictionary_mut().entry_mut(construction.word) {
        entry.body = WordBody::Compiled(Rc::new(code));
        entry.visibility = WordVisibility::Visible;
        entry.source = Some(WordSource::Colon(construction.source_text()));
    }

    log::debug!(
        "Defined {} as word {}.",
        construction.name,
        construction.word
    );

    Ok(())
}

/// Signature: `value -- `
fn word_constant(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    interpreter.require(1)?;

    let (location, name) = interpreter.next_token_name()?;
    let value = interpreter.pop()?;

    insert_value_word(
        interpreter,
        location,
        &name,
        value.clone(),
        " -- value",
        WordSource::Constant(value),
    );
    Ok(())
}

/// Reserve a cell and define a word that pushes its address.
///
/// Signature: ` -- `
fn word_variable(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let (location, name) = interpreter.next_token_name()?;
    let address = allot_cells(interpreter, 1)?;

    insert_value_word(
        interpreter,
        location,
        &name,
        Value::Address(address),
        " -- address",
        WordSource::Variable(address),
    );
    Ok(())
}

/// Mark a word as immediate.  Inside a definition that's the word being defined, otherwise it's
/// the most recently defined user word.  Built-in words are never changed.
///
/// Signature: ` -- `
fn word_immediate(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let index = if interpreter.is_compiling() {
        interpreter.construction_mut()?.word
    } else {
        match interpreter.dictionary().latest_user_word() {
            Some(index) => index,
            None => {
                return script_error(
                    interpreter,
                    ErrorKind::TypeMismatch {
                        word: interpreter.current_word().to_string(),
                        expected: "a user defined word".to_string(),
                        found: "only built-in words".to_string(),
                    },
                );
            }
        }
    };

    if let Some(entry) = interpreter.dictionary_mut().entry_mut(index) {
        entry.runtime = WordRuntime::Immediate;
    }

    Ok(())
}

/// Remove a word along with every word defined after it.  Built in words can't be forgotten.
///
/// Signature: ` -- `
fn word_forget(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let (_, name) = interpreter.next_token_name()?;

    let Some((index, entry)) = interpreter.dictionary().find(&name) else {
        let suggestions = interpreter.dictionary().suggest_similar(&name);

        return script_error(interpreter, ErrorKind::UnknownWord { name, suggestions });
    };

    if entry.is_primitive() {
        let found = format!("built-in word {}", entry.name);

        return script_error(
            interpreter,
            ErrorKind::TypeMismatch {
                word: interpreter.current_word().to_string(),
                expected: "a user defined word".to_string(),
                found,
            },
        );
    }

    interpreter.dictionary_mut().forget_back_to(index);
    Ok(())
}

/// Clear the data stack and forget everything defined in this session.  The rest of the source
/// still runs.
///
/// Signature: `... -- `
fn word_reset(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    interpreter.reset_definitions();
    Ok(())
}

pub fn register_word_creation_words(interpreter: &mut dyn Interpreter) {
    add_native_immediate_word!(
        interpreter,
        ":",
        word_colon,
        "Start a new word definition.",
        " -- "
    );

    add_compile_only_word!(
        interpreter,
        ";",
        word_semicolon,
        "End the current word definition.",
        " -- "
    );

    add_native_word!(
        interpreter,
        "CONSTANT",
        word_constant,
        "Define a word that pushes the given value.",
        "value -- "
    );

    add_native_word!(
        interpreter,
        "VARIABLE",
        word_variable,
        "Reserve a cell and define a word that pushes its address.",
        " -- "
    );

    add_native_immediate_word!(
        interpreter,
        "IMMEDIATE",
        word_immediate,
        "Make the latest word run at compile time.",
        " -- "
    );

    add_native_word!(
        interpreter,
        "FORGET",
        word_forget,
        "Remove a word and everything defined after it.",
        " -- "
    );

    add_native_word!(
        interpreter,
        "RESET",
        word_reset,
        "Clear the stack and forget this session's definitions.",
        "... -- "
    );
}
