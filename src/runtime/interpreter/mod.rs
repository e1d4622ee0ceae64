use crate::{
    lang::{
        code::Op,
        compilation::{CodeConstructor, Construction},
        source_buffer::SourceLocation,
        tokenizing::{NumberType, Token},
    },
    runtime::{
        data_structures::{
            cell_store::CellStore,
            dictionary::{Dictionary, WordHandler, WordRuntime},
            return_stack::{ReturnItem, ReturnStack},
            value::Value,
        },
        error::{self, ErrorKind},
    },
};
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

pub mod events;
pub mod fable_interpreter;

/// A call stack item is a record of the executing word's name and the location within the
/// original source code from which it was called.  These items are read-only and the fields are
/// accessed by member functions.
#[derive(Clone, Debug, PartialEq)]
pub struct CallItem {
    location: SourceLocation,
    word: String,
}

impl CallItem {
    /// Create a new call stack item.
    pub fn new(word: String, location: SourceLocation) -> CallItem {
        CallItem { location, word }
    }

    /// Where in the source code was the execution of this word found?
    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    // The name of the word being executed.
    pub fn word(&self) -> &String {
        &self.word
    }
}

/// Make sure that this word can be nicely displayed to the user in event of an error.
impl Display for CallItem {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.word)
    }
}

/// Type to represent a call stack.  This is a stack of call items currently being executed by the
/// interpreter.  This is used to help track errors and provide a scripts stack trace to the user.
pub type CallStack = Vec<CallItem>;

/// The data stack of values managed by the interpreter.
pub type ValueStack = Vec<Value>;

/// How much of an evaluation runs before control goes back to the caller.  The final state is the
/// same in every mode, only the granularity of observation differs.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum ExecutionMode {
    /// Run the whole evaluation in one go.
    #[default]
    Run,

    /// Run the whole evaluation, but wait for the event sink to acknowledge every completed word.
    Synchronized,

    /// `evaluate` only queues the source, each call to `step` then runs a single operation.
    Step,
}

impl Display for ExecutionMode {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            ExecutionMode::Run => write!(f, "run"),
            ExecutionMode::Synchronized => write!(f, "synchronized"),
            ExecutionMode::Step => write!(f, "step"),
        }
    }
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text.to_lowercase().as_str() {
            "run" => Ok(ExecutionMode::Run),
            "synchronized" | "sync" => Ok(ExecutionMode::Synchronized),
            "step" => Ok(ExecutionMode::Step),
            _ => Err(format!(
                "Unknown execution mode '{}', expected run, synchronized or step.",
                text
            )),
        }
    }
}

/// Knobs for a new interpreter session.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Starting execution mode.
    pub execution_mode: ExecutionMode,

    /// How many items the return stack may hold before the evaluation fails.  Bounds recursion.
    pub max_return_depth: usize,

    /// Bound of an EventQueue created for the session.
    pub event_capacity: usize,

    /// How many cells VARIABLE and ALLOT may reserve in total.
    pub max_cells: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            execution_mode: ExecutionMode::Run,
            max_return_depth: 4096,
            event_capacity: 1024,
            max_cells: 1 << 20,
        }
    }
}

/// Trait for managing the interpreter's data and return stacks.  Intended to be called by native
/// words.
pub trait InterpreterStack {
    /// Use to examine the full data stack when required.  One example is the stack dump word `.S`.
    fn stack(&self) -> &ValueStack;

    /// Direct access to the data stack for the stack shuffling words.
    fn stack_mut(&mut self) -> &mut ValueStack;

    /// Push a value onto the stack.  This is the primary way of sending values to words.
    fn push(&mut self, value: Value);

    /// Make sure that the stack holds at least `needed` values.  Words call this before popping
    /// anything, so a word that fails for lack of values leaves the stack untouched.
    fn require(&self, needed: usize) -> error::Result<()>;

    /// Pop a value from the stack.  If the stack is empty a stack underflow error is returned.
    fn pop(&mut self) -> error::Result<Value>;

    /// Pop the top value as an integer.  Flags and addresses convert, floats and strings are a
    /// type mismatch.
    fn pop_as_int(&mut self) -> error::Result<i64>;

    /// Pop the top value as a number of either kind.
    fn pop_as_number(&mut self) -> error::Result<NumberType>;

    /// Pop the top value and interpret it as a flag.
    fn pop_as_bool(&mut self) -> error::Result<bool>;

    /// Pop the top value as text.
    fn pop_as_string(&mut self) -> error::Result<String>;

    /// Pop a cell address.  Plain non-negative integers are accepted as addresses too.
    fn pop_as_address(&mut self) -> error::Result<usize>;

    /// The return stack, for `>R` and friends.
    fn return_stack(&self) -> &ReturnStack;

    fn return_stack_mut(&mut self) -> &mut ReturnStack;

    /// Push onto the return stack, failing if it's full.
    fn return_push(&mut self, item: ReturnItem) -> error::Result<()>;
}

/// Trait for managing the incoming source code token stream and the definition being compiled
/// from it.
///
/// These functions are only properly available during a script's "compile-time."  Thus they should
/// only be called from immediate words, or from defining words like `:` and `CONSTANT`.
pub trait CodeManagement {
    /// Get the next token from the current source code's token stream.
    fn next_token(&mut self) -> Option<Token>;

    /// Get the next token as a name for a defining word.  Fails if the source has run out, or
    /// the next token is a string literal.
    fn next_token_name(&mut self) -> error::Result<(SourceLocation, String)>;

    /// Are we in the middle of a colon definition?
    fn is_compiling(&self) -> bool;

    /// Access the current compilation context.
    fn context(&self) -> error::Result<&CodeConstructor>;

    /// Access the current compilation context as mutable.
    fn context_mut(&mut self) -> error::Result<&mut CodeConstructor>;

    /// The definition being built.  Using it outside of a definition is a compile-only error for
    /// the current word.
    fn construction_mut(&mut self) -> error::Result<&mut Construction>;

    /// Insert a byte-code instruction at the end of the definition being built.
    fn insert_user_instruction(
        &mut self,
        location: Option<SourceLocation>,
        op: Op,
    ) -> error::Result<()> {
        let _ = self.construction_mut()?.push_instruction(location, op);
        Ok(())
    }
}

/// Simplify registering a native regular word with the interpreter.
///
/// Required parameters are, the interpreter instance to register with.  The name of the word to
/// register.  The word function handler to execute for the word.  A simple description of the word.
/// As well as the word's stack signature.
#[macro_export]
macro_rules! add_native_word {
    (
        $interpreter:expr ,
        $name:expr ,
        $function:expr ,
        $description:expr ,
        $signature:expr
    ) => {{
        use $crate::runtime::data_structures::dictionary::WordRuntime;

        $interpreter.add_word(
            file!(),
            line!() as usize,
            column!() as usize,
            $name,
            $function,
            $description,
            $signature,
            WordRuntime::Normal,
            false,
        );
    }};
}

/// Simplify registering a native immediate word with the interpreter.  That is, this word is
/// intended to be executed at compile time.
#[macro_export]
macro_rules! add_native_immediate_word {
    (
        $interpreter:expr ,
        $name:expr ,
        $function:expr ,
        $description:expr ,
        $signature:expr
    ) => {{
        use $crate::runtime::data_structures::dictionary::WordRuntime;

        $interpreter.add_word(
            file!(),
            line!() as usize,
            column!() as usize,
            $name,
            $function,
            $description,
            $signature,
            WordRuntime::Immediate,
            false,
        );
    }};
}

/// Register an immediate word that is only legal inside a colon definition, like the control
/// words.
#[macro_export]
macro_rules! add_compile_only_word {
    (
        $interpreter:expr ,
        $name:expr ,
        $function:expr ,
        $description:expr ,
        $signature:expr
    ) => {{
        use $crate::runtime::data_structures::dictionary::WordRuntime;

        $interpreter.add_word(
            file!(),
            line!() as usize,
            column!() as usize,
            $name,
            $function,
            $description,
            $signature,
            WordRuntime::Immediate,
            true,
        );
    }};
}

/// Trait for managing and executing words known to the interpreter.
pub trait WordManagement {
    /// If currently set, this represents the current executing location in the original source.
    fn current_location(&self) -> &Option<SourceLocation>;

    /// The name of the word currently executing, used when reporting errors.
    fn current_word(&self) -> &str;

    /// Add a new native word to the interpreter's dictionary.  Returns its index.
    #[allow(clippy::too_many_arguments)]
    fn add_word(
        &mut self,
        file: &str,
        line: usize,
        column: usize,
        name: &str,
        handler: WordHandler,
        description: &str,
        signature: &str,
        runtime: WordRuntime,
        compile_only: bool,
    ) -> usize;

    /// The current word dictionary of words known to the interpreter.
    fn dictionary(&self) -> &Dictionary;

    fn dictionary_mut(&mut self) -> &mut Dictionary;

    /// The flat memory of variables.
    fn cells(&self) -> &CellStore;

    fn cells_mut(&mut self) -> &mut CellStore;

    /// The current script execution call stack.
    fn call_stack(&self) -> &CallStack;

    /// Send text to the output.  It's collected for `take_output` and passed on to the event
    /// sink.
    fn output(&mut self, text: &str);
}

/// Core interpreter trait.
///
/// This trait brings together the traits that define the functionality native words can rely
/// on.  Managing the stacks, the incoming source code, and the dictionary.
pub trait Interpreter: InterpreterStack + CodeManagement + WordManagement {
    /// Clear the data stack and forget every definition and variable made since the session mark.
    /// Whatever is executing carries on, so `1 2 RESET 5` leaves just the 5.
    fn reset_definitions(&mut self);

    /// Clear both stacks, forget back to the session mark and drop any evaluation in flight.
    fn reset(&mut self);
}

/// Build the type mismatch error for the current word.
pub fn type_mismatch<T>(
    interpreter: &dyn Interpreter,
    expected: &str,
    found: &Value,
) -> error::Result<T> {
    error::script_error(
        interpreter,
        ErrorKind::TypeMismatch {
            word: interpreter.current_word().to_string(),
            expected: expected.to_string(),
            found: found.type_name().to_string(),
        },
    )
}

/// Reserve cells for the current word, failing cleanly when the store is out of room.
pub fn allot_cells(interpreter: &mut dyn Interpreter, count: usize) -> error::Result<usize> {
    match interpreter.cells_mut().allot(count) {
        Some(address) => Ok(address),
        None => error::script_error(
            interpreter,
            ErrorKind::MemoryExhausted {
                word: interpreter.current_word().to_string(),
                requested: count,
                available: interpreter.cells().available(),
            },
        ),
    }
}
