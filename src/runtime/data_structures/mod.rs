/// Module for the runtime values of the language.
pub mod value;

/// Module for the word dictionary.  Words are looked up by name and executed or compiled by the
/// interpreter.
pub mod dictionary;

/// The flat memory that backs VARIABLE, ALLOT, `@` and `!`.
pub mod cell_store;

/// Call frames, loop frames and `>R` values.
pub mod return_stack;
