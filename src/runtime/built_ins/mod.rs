/// The core words of the language.
pub mod base_words;

/// Words that print.
pub mod io_words;

use crate::runtime::{
    built_ins::{base_words::register_base_words, io_words::register_io_words},
    interpreter::Interpreter,
};

/// Register every built-in word with a new interpreter.
pub fn register_builtin_words(interpreter: &mut dyn Interpreter) {
    register_base_words(interpreter);
    register_io_words(interpreter);
}
