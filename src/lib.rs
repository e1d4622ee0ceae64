//! A small Forth-like stack language.  Source is tokenized, definitions are compiled to byte-code
//! and everything runs on a step-wise inner interpreter that can be observed or paused between
//! any two operations.
//!
//! ```
//! use fable::runtime::interpreter::{ fable_interpreter::FableInterpreter, InterpreterStack };
//!
//! let mut interpreter = FableInterpreter::new();
//!
//! interpreter.evaluate(": SQUARE DUP * ; 5 SQUARE").unwrap();
//! assert_eq!(interpreter.pop_as_int().unwrap(), 25);
//! ```

/// Module for the managing source code and the generation of byte code.
#[macro_use]
pub mod lang;

/// Module for the runtime and the data structures used by the interpreter.  As well as the
/// interpreter itself.
#[macro_use]
pub mod runtime;
