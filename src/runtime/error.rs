
use std::{ collections::HashMap,
           process::Termination,
           fmt::{ self, Debug, Display, Formatter }, process::ExitCode };
use lazy_static::lazy_static;
use thiserror::Error;
use crate::{ runtime::{ interpreter::CallStack, data_structures::value::Value },
             lang::source_buffer::SourceLocation };

use super::interpreter::Interpreter;



pub type Result<T> = std::result::Result<T, ScriptError>;



/// The kinds of failure a script can run into.  Every kind carries the data needed to explain it,
/// so callers can render their own messages without picking apart strings.
#[derive(Error, Clone, Debug, PartialEq)]
pub enum ErrorKind
{
    #[error("Stack underflow: '{word}' needs {needed} value{}, but the stack only has {available}.",
            plural(.needed))]
    StackUnderflow { word: String, needed: usize, available: usize },

    #[error("Unknown word: '{name}'{}", did_you_mean(.suggestions))]
    UnknownWord { name: String, suggestions: Vec<String> },

    #[error("Division by zero: Cannot divide {dividend} by 0.")]
    DivisionByZero { dividend: Value },

    #[error("Type mismatch: '{word}' expects {expected}, but found {found}.")]
    TypeMismatch { word: String, expected: String, found: String },

    #[error("'{word}' is a compile-only word.")]
    CompileOnly { word: String },

    #[error("Unmatched '{opener}': missing '{expected}'.")]
    ControlStructureMismatch { opener: String, expected: String },

    #[error("Invalid address: '{word}' can't access cell {address}.")]
    InvalidAddress { word: String, address: i64 },

    #[error("Out of memory: '{word}' asked for {requested} cell{}, but only {available} are left.",
            plural(.requested))]
    MemoryExhausted { word: String, requested: usize, available: usize },

    #[error("'{word}' needs a name to follow it.")]
    MissingName { word: String },

    #[error("Return stack overflow: more than {depth} items.")]
    ReturnStackOverflow { depth: usize },

    #[error("Evaluation cancelled.")]
    Cancelled,

    #[error("I/O error: {message}")]
    Io { message: String }
}


fn plural(count: &usize) -> &'static str
{
    if *count == 1 { "" } else { "s" }
}


fn did_you_mean(suggestions: &[String]) -> String
{
    match suggestions
    {
        [] => String::new(),
        [only] => format!(". Did you mean '{}'?", only),
        many => format!(". Did you mean one of: {}?", many.join(", "))
    }
}



lazy_static!
{
    /// Word specific advice for the most common stack underflows.
    static ref UNDERFLOW_HINTS: HashMap<&'static str, &'static str> =
        HashMap::from([
            ( "+",    "The '+' word adds two numbers together. Try: 3 5 +" ),
            ( "-",    "The '-' word subtracts (second - top). Try: 10 3 -" ),
            ( "*",    "The '*' word multiplies two numbers. Try: 4 7 *" ),
            ( "/",    "The '/' word divides (second / top). Try: 20 4 /" ),
            ( "DUP",  "DUP duplicates the top value. Push a value first: 5 DUP" ),
            ( "DROP", "DROP removes the top value. Push a value first: 5 DROP" ),
            ( "SWAP", "SWAP exchanges top two values. Try: 1 2 SWAP" ),
            ( "OVER", "OVER copies the second value to top. Try: 1 2 OVER" ),
            ( "ROT",  "ROT rotates three values. Try: 1 2 3 ROT" ),
            ( ".",    "The '.' word prints and removes top value. Try: 42 ." )
        ]);
}



/// Any error that occurs during the evaluation of a script.
#[derive(Clone)]
pub struct ScriptError
{
    /// The location in the source code the error occurred, if available.
    location: Option<SourceLocation>,

    /// What went wrong.
    kind: ErrorKind,

    /// The script's call stack at the time of the error, if available.
    call_stack: Option<CallStack>
}


impl std::error::Error for ScriptError
{
}


/// When returned from main, convert the error result to an operating system exit code.
impl Termination for ScriptError
{
    /// Because this type represents an error, the exit code is always FAILURE.
    fn report(self) -> ExitCode
    {
        eprintln!("Error: {}", self);
        eprintln!("{}", self.hint());
        ExitCode::FAILURE
    }
}


/// Pretty print the error along with where it happened and how we got there.
impl Display for ScriptError
{
    fn fmt(&self, f: &mut Formatter) -> fmt::Result
    {
        match &self.location
        {
            Some(location) => write!(f, "{}: {}", location, self.kind)?,
            None => write!(f, "{}", self.kind)?
        }

        if let Some(call_stack) = &self.call_stack
            && !call_stack.is_empty()
        {
            write!(f, "\n\nCall stack\n")?;

            for item in call_stack.iter().rev()
            {
                writeln!(f, "  {}", item)?;
            }
        }

        Ok(())
    }
}


impl Debug for ScriptError
{
    fn fmt(&self, f: &mut Formatter) -> fmt::Result
    {
        write!(f, "{}", self)
    }
}


impl ScriptError
{
    /// Create a new ScriptError.
    pub fn new(location: Option<SourceLocation>,
               kind: ErrorKind,
               call_stack: Option<CallStack>) -> ScriptError
    {
        ScriptError
            {
                location,
                kind,
                call_stack
            }
    }

    /// Create a new Script Error and wrap it in a Result::Err.
    pub fn new_as_result<T>(location: Option<SourceLocation>,
                            kind: ErrorKind,
                            call_stack: Option<CallStack>) -> Result<T>
    {
        Err(ScriptError::new(location, kind, call_stack))
    }

    /// If available, the location in the source code the error occurred.
    pub fn location(&self) -> &Option<SourceLocation>
    {
        &self.location
    }

    /// The structured description of the error.
    pub fn kind(&self) -> &ErrorKind
    {
        &self.kind
    }

    /// If available, the script's call stack at the time of the error.
    pub fn call_stack(&self) -> &Option<CallStack>
    {
        &self.call_stack
    }

    /// Fill in the location if the error was raised somewhere that didn't know it.
    pub fn with_location(mut self, location: Option<SourceLocation>) -> ScriptError
    {
        if self.location.is_none()
        {
            self.location = location;
        }

        self
    }

    /// Advice for fixing the problem, aimed at someone learning the language.
    pub fn hint(&self) -> String
    {
        match &self.kind
        {
            ErrorKind::StackUnderflow { word, needed, available } =>
                match UNDERFLOW_HINTS.get(word.to_uppercase().as_str())
                {
                    Some(hint) => hint.to_string(),
                    None => format!("Try pushing {} more value(s) before using '{}'.",
                                    needed.saturating_sub(*available),
                                    word)
                },

            ErrorKind::UnknownWord { .. } =>
                "Forth words are case-insensitive. Use WORDS to list available words.".to_string(),

            ErrorKind::DivisionByZero { .. } =>
                "Check the value on top of the stack before dividing.".to_string(),

            ErrorKind::TypeMismatch { word, .. } =>
                format!("Use .S to look at the stack before calling '{}'.", word),

            ErrorKind::CompileOnly { .. } =>
                "It can only be used inside a colon definition (: word ... ;).".to_string(),

            ErrorKind::ControlStructureMismatch { opener, expected } =>
                format!("Every '{}' needs a matching '{}'. Check that your control structures \
                         are balanced.",
                        opener,
                        expected),

            ErrorKind::InvalidAddress { .. } =>
                "Only use addresses returned by VARIABLE, HERE or ALLOT.".to_string(),

            ErrorKind::MemoryExhausted { .. } =>
                "Allot fewer cells, or raise the cell limit of the session.".to_string(),

            ErrorKind::MissingName { word } =>
                format!("Write the new name right after '{}', for example: {} NAME", word, word),

            ErrorKind::ReturnStackOverflow { .. } =>
                "Check for recursion without a base case.".to_string(),

            ErrorKind::Cancelled =>
                "The evaluation was stopped before it finished.".to_string(),

            ErrorKind::Io { .. } =>
                "Check that the file exists and can be read.".to_string()
        }
    }

    /// Can the session carry on after this error?  Every script error leaves the engine in a
    /// usable state, broken internal invariants panic instead of becoming errors.
    pub fn is_recoverable(&self) -> bool
    {
        true
    }
}


/// Allow for the conversion of a std::io::Error into a ScriptError.
impl From<std::io::Error> for ScriptError
{
    fn from(error: std::io::Error) -> ScriptError
    {
        ScriptError::new(None, ErrorKind::Io { message: error.to_string() }, None)
    }
}



/// A convenience function for creating a ScriptError and wrapping in in a Result::Err using the
/// interpreter's current location and call stack.
pub fn script_error<T>(interpreter: &dyn Interpreter, kind: ErrorKind) -> Result<T>
{
    let location = interpreter.current_location().clone();
    let call_stack = interpreter.call_stack().clone();

    ScriptError::new_as_result(location, kind, Some(call_stack))
}



#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn underflow_message_and_hint()
    {
        let error = ScriptError::new(None,
                                     ErrorKind::StackUnderflow { word: "+".to_string(),
                                                                 needed: 2,
                                                                 available: 1 },
                                     None);

        assert_eq!(error.to_string(),
                   "Stack underflow: '+' needs 2 values, but the stack only has 1.");
        assert_eq!(error.hint(), "The '+' word adds two numbers together. Try: 3 5 +");

        let error = ScriptError::new(None,
                                     ErrorKind::StackUnderflow { word: "NIP".to_string(),
                                                                 needed: 2,
                                                                 available: 0 },
                                     None);

        assert_eq!(error.hint(), "Try pushing 2 more value(s) before using 'NIP'.");
    }

    #[test]
    fn singular_value()
    {
        let kind = ErrorKind::StackUnderflow { word: "DUP".to_string(), needed: 1, available: 0 };

        assert_eq!(kind.to_string(),
                   "Stack underflow: 'DUP' needs 1 value, but the stack only has 0.");
    }

    #[test]
    fn memory_exhausted_message()
    {
        let kind = ErrorKind::MemoryExhausted { word: "ALLOT".to_string(),
                                                requested: 1,
                                                available: 0 };

        assert_eq!(kind.to_string(), "Out of memory: 'ALLOT' asked for 1 cell, but only 0 are left.");
    }

    #[test]
    fn unknown_word_suggestions()
    {
        let none = ErrorKind::UnknownWord { name: "FOO".to_string(), suggestions: vec![] };
        let one = ErrorKind::UnknownWord { name: "DUPP".to_string(),
                                           suggestions: vec![ "DUP".to_string() ] };
        let many = ErrorKind::UnknownWord { name: "SWP".to_string(),
                                            suggestions: vec![ "SWAP".to_string(),
                                                               "2SWAP".to_string() ] };

        assert_eq!(none.to_string(), "Unknown word: 'FOO'");
        assert_eq!(one.to_string(), "Unknown word: 'DUPP'. Did you mean 'DUP'?");
        assert_eq!(many.to_string(), "Unknown word: 'SWP'. Did you mean one of: SWAP, 2SWAP?");
    }

    #[test]
    fn location_prefixes_the_message()
    {
        let location = SourceLocation::new_from_info("<test>", 2, 5);
        let error = ScriptError::new(None, ErrorKind::DivisionByZero { dividend: Value::Int(5) },
                                     None)
            .with_location(Some(location));

        assert_eq!(error.to_string(), "<test> (2, 5): Division by zero: Cannot divide 5 by 0.");
        assert!(error.is_recoverable());
    }

    #[test]
    fn control_structure_message()
    {
        let kind = ErrorKind::ControlStructureMismatch { opener: "IF".to_string(),
                                                         expected: "THEN".to_string() };

        assert_eq!(kind.to_string(), "Unmatched 'IF': missing 'THEN'.");
    }
}
