use crate::{
    add_compile_only_word,
    lang::{
        code::Op,
        compilation::{Construction, ControlResult},
        source_buffer::SourceLocation,
    },
    runtime::{
        error::{self, script_error},
        interpreter::Interpreter,
    },
};

/// Run one step of control structure compilation against the open definition, reporting any
/// mismatch at the control word's location.
fn compile_control(
    interpreter: &mut dyn Interpreter,
    compile: impl FnOnce(&mut Construction, Option<SourceLocation>) -> ControlResult<()>,
) -> error::Result<()> {
    let location = interpreter.current_location().clone();
    let result = compile(interpreter.construction_mut()?, location);

    match result {
        Ok(()) => Ok(()),
        Err(kind) => script_error(interpreter, kind),
    }
}

/// Signature: `flag -- `
fn word_if(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    compile_control(interpreter, |construction, location| {
        construction.compile_if(location);
        Ok(())
    })
}

fn word_else(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    compile_control(interpreter, Construction::compile_else)
}

fn word_then(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    compile_control(interpreter, |construction, _| construction.compile_then())
}

fn word_begin(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    compile_control(interpreter, |construction, _| {
        construction.compile_begin();
        Ok(())
    })
}

/// Signature: `flag -- `
fn word_until(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    compile_control(interpreter, Construction::compile_until)
}

fn word_again(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    compile_control(interpreter, Construction::compile_again)
}

/// Signature: `flag -- `
fn word_while(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    compile_control(interpreter, Construction::compile_while)
}

fn word_repeat(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    compile_control(interpreter, Construction::compile_repeat)
}

/// Signature: `limit start -- `
fn word_do(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    compile_control(interpreter, |construction, location| {
        construction.compile_do(location, false);
        Ok(())
    })
}

/// Like DO, but the body is skipped when the start equals the limit.
///
/// Signature: `limit start -- `
fn word_query_do(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    compile_control(interpreter, |construction, location| {
        construction.compile_do(location, true);
        Ok(())
    })
}

fn word_loop(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    compile_control(interpreter, |construction, location| {
        construction.compile_loop(location, false)
    })
}

/// Signature: `step -- `
fn word_plus_loop(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    compile_control(interpreter, |construction, location| {
        construction.compile_loop(location, true)
    })
}

/// Signature: ` -- index`
fn word_i(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    compile_control(interpreter, |construction, location| {
        construction.compile_loop_index(location, "I", 0)
    })
}

/// Signature: ` -- index`
fn word_j(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    compile_control(interpreter, |construction, location| {
        construction.compile_loop_index(location, "J", 1)
    })
}

fn word_leave(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    compile_control(interpreter, Construction::compile_leave)
}

fn word_unloop(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    compile_control(interpreter, Construction::compile_unloop)
}

fn word_exit(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let location = interpreter.current_location().clone();

    interpreter.insert_user_instruction(location, Op::Exit)
}

fn word_recurse(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let location = interpreter.current_location().clone();

    interpreter.insert_user_instruction(location, Op::Recurse)
}

pub fn register_control_words(interpreter: &mut dyn Interpreter) {
    add_compile_only_word!(
        interpreter,
        "IF",
        word_if,
        "Run the following code only if the flag is true.",
        "flag -- "
    );
    add_compile_only_word!(
        interpreter,
        "ELSE",
        word_else,
        "Code to run when the IF flag was false.",
        " -- "
    );
    add_compile_only_word!(interpreter, "THEN", word_then, "End an IF.", " -- ");

    add_compile_only_word!(
        interpreter,
        "BEGIN",
        word_begin,
        "Start an indefinite loop.",
        " -- "
    );
    add_compile_only_word!(
        interpreter,
        "UNTIL",
        word_until,
        "Loop back to BEGIN until the flag is true.",
        "flag -- "
    );
    add_compile_only_word!(
        interpreter,
        "AGAIN",
        word_again,
        "Loop back to BEGIN forever.",
        " -- "
    );
    add_compile_only_word!(
        interpreter,
        "WHILE",
        word_while,
        "Leave a BEGIN loop when the flag is false.",
        "flag -- "
    );
    add_compile_only_word!(
        interpreter,
        "REPEAT",
        word_repeat,
        "Loop back to BEGIN.",
        " -- "
    );

    add_compile_only_word!(
        interpreter,
        "DO",
        word_do,
        "Start a counted loop.",
        "limit start -- "
    );
    add_compile_only_word!(
        interpreter,
        "?DO",
        word_query_do,
        "Start a counted loop that may run zero times.",
        "limit start -- "
    );
    add_compile_only_word!(
        interpreter,
        "LOOP",
        word_loop,
        "Step the loop index by one.",
        " -- "
    );
    add_compile_only_word!(
        interpreter,
        "+LOOP",
        word_plus_loop,
        "Step the loop index by the given amount.",
        "step -- "
    );
    add_compile_only_word!(
        interpreter,
        "I",
        word_i,
        "The index of the innermost loop.",
        " -- index"
    );
    add_compile_only_word!(
        interpreter,
        "J",
        word_j,
        "The index of the next outer loop.",
        " -- index"
    );
    add_compile_only_word!(
        interpreter,
        "LEAVE",
        word_leave,
        "Leave the innermost loop right away.",
        " -- "
    );
    add_compile_only_word!(
        interpreter,
        "UNLOOP",
        word_unloop,
        "Drop the innermost loop's control frame.",
        " -- "
    );

    add_compile_only_word!(
        interpreter,
        "EXIT",
        word_exit,
        "Return from the current word.",
        " -- "
    );
    add_compile_only_word!(
        interpreter,
        "RECURSE",
        word_recurse,
        "Call the word being defined.",
        " -- "
    );
}
