/// Words that manipulate the data and return stacks.
mod stack_words;

/// Arithmetic, comparison and bit manipulation.
mod math_logic_words;

/// Words that read and write cell memory.
mod memory_words;

/// Words that create new words.
mod word_creation_words;

/// The immediate words that compile control structures.
mod control_words;

use crate::runtime::{
    built_ins::base_words::{
        control_words::register_control_words, math_logic_words::register_math_logic_words,
        memory_words::register_memory_words, stack_words::register_stack_words,
        word_creation_words::register_word_creation_words,
    },
    interpreter::Interpreter,
};

/// Called to register all of the core words of the language.
pub fn register_base_words(interpreter: &mut dyn Interpreter) {
    register_stack_words(interpreter);
    register_math_logic_words(interpreter);
    register_memory_words(interpreter);
    register_word_creation_words(interpreter);
    register_control_words(interpreter);
}
