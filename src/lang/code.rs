use crate::{
    lang::source_buffer::SourceLocation,
    runtime::data_structures::{dictionary::Dictionary, value::Value},
};
use std::fmt::{self, Display, Formatter};

/// Placeholder target for a branch whose destination isn't known yet.  Every placeholder is
/// tracked on the compiler's control-flow stack until it's patched.
pub const UNRESOLVED: usize = usize::MAX;

/// Which way a counted loop is known to run.  The compiler fills this in for the `DO` marker when
/// it reaches the matching `LOOP` or `+LOOP`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LoopDirection {
    /// `LOOP`, or `+LOOP` right after a non-negative literal step.
    Ascending,

    /// `+LOOP` right after a negative literal step.
    Descending,

    /// The step is computed at runtime.  The loop is ordered like an ascending one.
    Unknown,
}

/// The loop bookkeeping operations.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LoopKind {
    /// Pop the start index and the limit and open a new loop-control frame.  The target is the
    /// instruction after the matching `LOOP`.
    Do(LoopDirection),

    /// Like `Do`, but skip the loop entirely when the start index equals the limit.
    QueryDo(LoopDirection),

    /// Step the index by one.  The target is the first instruction of the loop body.
    Loop,

    /// Step the index by the popped value.  The target is the first instruction of the loop body.
    PlusLoop,

    /// Drop the innermost loop-control frame and jump past the end of the loop.
    Leave,

    /// Drop the innermost loop-control frame and carry on.
    Unloop,
}

impl Display for LoopKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            LoopKind::Do(_) => write!(f, "DO"),
            LoopKind::QueryDo(_) => write!(f, "?DO"),
            LoopKind::Loop => write!(f, "LOOP"),
            LoopKind::PlusLoop => write!(f, "+LOOP"),
            LoopKind::Leave => write!(f, "LEAVE"),
            LoopKind::Unloop => write!(f, "UNLOOP"),
        }
    }
}

/// The operations understood by the inner interpreter.  Word references are indices into the
/// dictionary's entry list and branch targets are absolute indices into the same body.
#[derive(Clone, PartialEq, Debug)]
pub enum Op {
    /// Call a native word.
    CallPrimitive(usize),

    /// Call a compiled word, saving the return position on the return stack.
    CallWord(usize),

    /// Push a copy of the value onto the data stack.
    PushLiteral(Value),

    /// Jump unconditionally.
    Branch(usize),

    /// Pop a flag and jump if it's false.
    BranchIfFalse(usize),

    /// Counted loop bookkeeping, with the resolved target for the operation.
    LoopMarker(LoopKind, usize),

    /// Push the index of a loop-control frame.  Depth 0 is `I`, depth 1 is `J`.
    PushLoopIndex(usize),

    /// Return from the current word, dropping any loop-control frames it still has open.
    Exit,

    /// Call the word owning the current frame.
    Recurse,
}

impl Op {
    /// The branch target held by the operation, if it has one.
    pub fn target(&self) -> Option<usize> {
        match self {
            Op::Branch(target) | Op::BranchIfFalse(target) | Op::LoopMarker(_, target) => {
                Some(*target)
            }
            _ => None,
        }
    }

    /// Update the branch target of an operation.  Operations without a target are left as is.
    pub fn set_target(&mut self, new_target: usize) {
        match self {
            Op::Branch(target) | Op::BranchIfFalse(target) | Op::LoopMarker(_, target) => {
                *target = new_target
            }
            _ => {}
        }
    }
}

/// Represents a single instruction of a compiled word.
#[derive(Clone, PartialEq, Debug)]
pub struct Instruction {
    /// Location in the source code this instruction was generated from.  Instructions generated by
    /// the compiler itself, like the final exit, don't have a location.
    pub location: Option<SourceLocation>,

    /// The operation to perform.
    pub op: Op,
}

impl Instruction {
    /// Create a new instruction with a location and operation.
    pub fn new(location: Option<SourceLocation>, op: Op) -> Instruction {
        Instruction { location, op }
    }
}

/// Allow for pretty printing of the instruction and it's value.
impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        fn tg(target: usize) -> String {
            if target == UNRESOLVED {
                "?".to_string()
            } else {
                target.to_string()
            }
        }

        match &self.op {
            Op::CallPrimitive(index) => write!(f, "CallPrimitive     {}", index),
            Op::CallWord(index) => write!(f, "CallWord          {}", index),
            Op::PushLiteral(value) => write!(f, "PushLiteral       {:?}", value),
            Op::Branch(target) => write!(f, "Branch            {}", tg(*target)),
            Op::BranchIfFalse(target) => write!(f, "BranchIfFalse     {}", tg(*target)),
            Op::LoopMarker(kind, target) => write!(f, "LoopMarker {:6} {}", kind, tg(*target)),
            Op::PushLoopIndex(depth) => write!(f, "PushLoopIndex     {}", depth),
            Op::Exit => write!(f, "Exit"),
            Op::Recurse => write!(f, "Recurse"),
        }
    }
}

/// A collection of instructions that make up a compiled word.
pub type ByteCode = Vec<Instruction>;

/// Pretty print the byte code for debugging purposes.  When a dictionary is supplied word calls
/// show the called word's name.
pub fn pretty_print_code(dictionary: Option<&Dictionary>, code: &ByteCode) -> String {
    use std::fmt::Write;

    let mut result = String::with_capacity(code.len() * 20);

    for (index, instruction) in code.iter().enumerate() {
        let name = match (&instruction.op, dictionary) {
            (Op::CallPrimitive(word) | Op::CallWord(word), Some(dictionary)) => dictionary
                .entry(*word)
                .map(|entry| format!("  ( {} )", entry.name))
                .unwrap_or_default(),
            _ => String::new(),
        };

        let _ = writeln!(&mut result, "{:4}: {}{}", index, instruction, name);
    }

    result
}
