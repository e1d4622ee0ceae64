/// Module for managing the original source code.
pub mod source_buffer;

/// Module for managing the turning of the source code into a list of tokens for further processing.
pub mod tokenizing;

/// The byte-code operations executed by the inner interpreter.
pub mod code;

/// Module for compiling colon definitions into byte-code.  Control words run while a definition
/// is being compiled and use the construction here to emit and patch their branches.
pub mod compilation;
