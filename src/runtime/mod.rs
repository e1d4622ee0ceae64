/// The data structures the engine is built from: values, the dictionary, cell memory and the
/// return stack.
pub mod data_structures;

/// The built-in words every new session starts with.
pub mod built_ins;

/// Error reporting for scripts.
pub mod error;

/// The interpreter itself, along with the traits native words use to work with it.
pub mod interpreter;

/// Loading library files from disk into an interpreter.
pub mod library_loader;
