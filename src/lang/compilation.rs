use crate::{
    lang::{
        code::{ByteCode, Instruction, LoopDirection, LoopKind, Op, UNRESOLVED},
        source_buffer::SourceLocation,
        tokenizing::{Token, Tokenizer},
    },
    runtime::error::ErrorKind,
};
use std::iter::Peekable;

/// Result of the control-flow bookkeeping.  The errors are raw kinds, the word handlers attach the
/// location and call stack.
pub type ControlResult<T> = std::result::Result<T, ErrorKind>;

/// A construct that has been opened inside a definition and not closed yet.  Each entry remembers
/// the index of the instruction that will need patching, or for BEGIN the index to branch back to.
#[derive(Clone, PartialEq, Debug)]
enum ControlEntry {
    If(usize),
    Else(usize),
    Begin(usize),
    While(usize),
    Do { marker: usize, leaves: Vec<usize> },
}

impl ControlEntry {
    /// The word that opened the construct.
    fn opener(&self) -> &'static str {
        match self {
            ControlEntry::If(_) => "IF",
            ControlEntry::Else(_) => "ELSE",
            ControlEntry::Begin(_) => "BEGIN",
            ControlEntry::While(_) => "WHILE",
            ControlEntry::Do { .. } => "DO",
        }
    }

    /// The word that would close it.
    fn closer(&self) -> &'static str {
        match self {
            ControlEntry::If(_) | ControlEntry::Else(_) => "THEN",
            ControlEntry::Begin(_) => "UNTIL",
            ControlEntry::While(_) => "REPEAT",
            ControlEntry::Do { .. } => "LOOP",
        }
    }

    fn mismatch(&self) -> ErrorKind {
        mismatch(self.opener(), self.closer())
    }
}

fn mismatch(opener: &str, expected: &str) -> ErrorKind {
    ErrorKind::ControlStructureMismatch {
        opener: opener.to_string(),
        expected: expected.to_string(),
    }
}

/// A colon definition that is being built.  The dictionary entry for the word was reserved when
/// the definition was opened, so the word already has its final index.
pub struct Construction {
    /// Dictionary index of the reserved entry.
    pub word: usize,

    /// The name the definition will be installed under.
    pub name: String,

    /// Where the definition started.
    pub location: SourceLocation,

    code: ByteCode,
    control: Vec<ControlEntry>,
    source: Vec<String>,
}

impl Construction {
    pub fn new(word: usize, name: &str, location: SourceLocation) -> Construction {
        Construction {
            word,
            name: name.to_uppercase(),
            location,
            code: ByteCode::new(),
            control: Vec::new(),
            source: Vec::new(),
        }
    }

    /// The code compiled so far.
    pub fn code(&self) -> &ByteCode {
        &self.code
    }

    /// Remember a token of the body as it was written.
    pub fn record(&mut self, token: String) {
        self.source.push(token);
    }

    /// The recorded body tokens, space separated.
    pub fn source_text(&self) -> String {
        self.source.join(" ")
    }

    /// Index the next instruction will get.
    pub fn here(&self) -> usize {
        self.code.len()
    }

    /// Append an instruction, returning its index.
    pub fn push_instruction(&mut self, location: Option<SourceLocation>, op: Op) -> usize {
        self.code.push(Instruction::new(location, op));
        self.code.len() - 1
    }

    fn patch(&mut self, index: usize, target: usize) {
        self.code[index].op.set_target(target);
    }

    /// How many DO loops enclose the current position.
    pub fn loop_depth(&self) -> usize {
        self.control
            .iter()
            .filter(|entry| matches!(entry, ControlEntry::Do { .. }))
            .count()
    }

    /// Pop the innermost construct if `accept` takes it.  Otherwise the stack is left alone and
    /// the error names whatever is in the way.
    fn pop_matching(
        &mut self,
        closer: &str,
        wanted: &str,
        accept: impl Fn(&ControlEntry) -> bool,
    ) -> ControlResult<ControlEntry> {
        match self.control.last() {
            Some(entry) if accept(entry) => {}
            Some(entry) => return Err(entry.mismatch()),
            None => return Err(mismatch(closer, wanted)),
        }

        self.control.pop().ok_or_else(|| mismatch(closer, wanted))
    }

    pub fn compile_if(&mut self, location: Option<SourceLocation>) {
        let branch = self.push_instruction(location, Op::BranchIfFalse(UNRESOLVED));
        self.control.push(ControlEntry::If(branch));
    }

    pub fn compile_else(&mut self, location: Option<SourceLocation>) -> ControlResult<()> {
        let ControlEntry::If(if_branch) =
            self.pop_matching("ELSE", "IF", |e| matches!(e, ControlEntry::If(_)))?
        else {
            unreachable!()
        };

        let branch = self.push_instruction(location, Op::Branch(UNRESOLVED));

        self.patch(if_branch, branch + 1);
        self.control.push(ControlEntry::Else(branch));

        Ok(())
    }

    pub fn compile_then(&mut self) -> ControlResult<()> {
        let entry = self.pop_matching("THEN", "IF", |e| {
            matches!(e, ControlEntry::If(_) | ControlEntry::Else(_))
        })?;

        let here = self.here();

        match entry {
            ControlEntry::If(branch) | ControlEntry::Else(branch) => self.patch(branch, here),
            _ => unreachable!(),
        }

        Ok(())
    }

    pub fn compile_begin(&mut self) {
        let here = self.here();
        self.control.push(ControlEntry::Begin(here));
    }

    fn pop_begin(&mut self, closer: &str) -> ControlResult<usize> {
        match self.pop_matching(closer, "BEGIN", |e| matches!(e, ControlEntry::Begin(_)))? {
            ControlEntry::Begin(start) => Ok(start),
            _ => unreachable!(),
        }
    }

    pub fn compile_until(&mut self, location: Option<SourceLocation>) -> ControlResult<()> {
        let start = self.pop_begin("UNTIL")?;

        let _ = self.push_instruction(location, Op::BranchIfFalse(start));
        Ok(())
    }

    pub fn compile_again(&mut self, location: Option<SourceLocation>) -> ControlResult<()> {
        let start = self.pop_begin("AGAIN")?;

        let _ = self.push_instruction(location, Op::Branch(start));
        Ok(())
    }

    pub fn compile_while(&mut self, location: Option<SourceLocation>) -> ControlResult<()> {
        if !matches!(self.control.last(), Some(ControlEntry::Begin(_))) {
            return Err(self
                .control
                .last()
                .map(ControlEntry::mismatch)
                .unwrap_or_else(|| mismatch("WHILE", "BEGIN")));
        }

        let branch = self.push_instruction(location, Op::BranchIfFalse(UNRESOLVED));

        self.control.push(ControlEntry::While(branch));
        Ok(())
    }

    pub fn compile_repeat(&mut self, location: Option<SourceLocation>) -> ControlResult<()> {
        let ControlEntry::While(branch) =
            self.pop_matching("REPEAT", "WHILE", |e| matches!(e, ControlEntry::While(_)))?
        else {
            unreachable!()
        };

        let start = self.pop_begin("REPEAT")?;
        let back = self.push_instruction(location, Op::Branch(start));

        self.patch(branch, back + 1);
        Ok(())
    }

    /// Open a counted loop.  The marker's exit target and direction are filled in by the matching
    /// LOOP or +LOOP.
    pub fn compile_do(&mut self, location: Option<SourceLocation>, query: bool) {
        let kind = if query {
            LoopKind::QueryDo(LoopDirection::Unknown)
        } else {
            LoopKind::Do(LoopDirection::Unknown)
        };

        let marker = self.push_instruction(location, Op::LoopMarker(kind, UNRESOLVED));

        self.control.push(ControlEntry::Do {
            marker,
            leaves: Vec::new(),
        });
    }

    /// Close a counted loop.
    pub fn compile_loop(&mut self, location: Option<SourceLocation>, plus: bool) -> ControlResult<()> {
        let closer = if plus { "+LOOP" } else { "LOOP" };

        let ControlEntry::Do { marker, leaves } =
            self.pop_matching(closer, "DO", |e| matches!(e, ControlEntry::Do { .. }))?
        else {
            unreachable!()
        };

        let direction = if plus {
            self.literal_step_direction(marker)
        } else {
            LoopDirection::Ascending
        };

        let kind = if plus { LoopKind::PlusLoop } else { LoopKind::Loop };
        let end = self.push_instruction(location, Op::LoopMarker(kind, marker + 1));
        let exit = end + 1;

        self.code[marker].op = match self.code[marker].op {
            Op::LoopMarker(LoopKind::QueryDo(_), _) => {
                Op::LoopMarker(LoopKind::QueryDo(direction), exit)
            }
            _ => Op::LoopMarker(LoopKind::Do(direction), exit),
        };

        for leave in leaves {
            self.patch(leave, exit);
        }

        Ok(())
    }

    /// The direction of a `+LOOP` whose step is a literal compiled right in front of it.
    fn literal_step_direction(&self, marker: usize) -> LoopDirection {
        match self.code.last() {
            Some(Instruction {
                op: Op::PushLiteral(step),
                ..
            }) if self.code.len() - 1 > marker => match step.as_int() {
                Some(step) if step >= 0 => LoopDirection::Ascending,
                Some(_) => LoopDirection::Descending,
                None => LoopDirection::Unknown,
            },
            _ => LoopDirection::Unknown,
        }
    }

    pub fn compile_leave(&mut self, location: Option<SourceLocation>) -> ControlResult<()> {
        let position = self
            .control
            .iter()
            .rposition(|entry| matches!(entry, ControlEntry::Do { .. }))
            .ok_or_else(|| mismatch("LEAVE", "DO"))?;

        let leave = self.push_instruction(location, Op::LoopMarker(LoopKind::Leave, UNRESOLVED));

        if let ControlEntry::Do { leaves, .. } = &mut self.control[position] {
            leaves.push(leave);
        }

        Ok(())
    }

    pub fn compile_unloop(&mut self, location: Option<SourceLocation>) -> ControlResult<()> {
        if self.loop_depth() == 0 {
            return Err(mismatch("UNLOOP", "DO"));
        }

        let _ = self.push_instruction(location, Op::LoopMarker(LoopKind::Unloop, 0));
        Ok(())
    }

    /// `I` is depth 0 and `J` depth 1.  There have to be enough loops around us.
    pub fn compile_loop_index(
        &mut self,
        location: Option<SourceLocation>,
        word: &str,
        depth: usize,
    ) -> ControlResult<()> {
        if self.loop_depth() <= depth {
            return Err(mismatch(word, "DO"));
        }

        let _ = self.push_instruction(location, Op::PushLoopIndex(depth));
        Ok(())
    }

    /// Close the definition.  Every construct has to be closed, then the final Exit is appended
    /// and the finished code is handed over.
    pub fn finish(&mut self) -> ControlResult<ByteCode> {
        if let Some(entry) = self.control.last() {
            return Err(entry.mismatch());
        }

        let _ = self.push_instruction(None, Op::Exit);

        for (index, instruction) in self.code.iter().enumerate() {
            if let Some(target) = instruction.op.target() {
                assert!(
                    target < self.code.len(),
                    "{}: instruction {} of {} branches to {}, past the end of the body",
                    self.name,
                    index,
                    self.name,
                    target
                );
            }
        }

        Ok(std::mem::take(&mut self.code))
    }
}

/// The compilation context of one piece of source code: its token stream and the definition, if
/// any, that is being built from it.
pub struct CodeConstructor {
    tokens: Peekable<Tokenizer>,

    /// The colon definition currently open in this source.
    pub construction: Option<Construction>,
}

impl CodeConstructor {
    pub fn new(path: &str, source: &str) -> CodeConstructor {
        CodeConstructor {
            tokens: Tokenizer::new(path, source).peekable(),
            construction: None,
        }
    }

    /// Pull the next token out of the stream.
    pub fn next_token(&mut self) -> Option<Token> {
        self.tokens.next()
    }

    /// Has every token been consumed?
    pub fn is_exhausted(&mut self) -> bool {
        self.tokens.peek().is_none()
    }

    /// Check the source ended cleanly, that is without a definition left open.
    pub fn check_closed(&self) -> ControlResult<()> {
        match &self.construction {
            Some(construction) => Err(construction
                .control
                .last()
                .map(ControlEntry::mismatch)
                .unwrap_or_else(|| mismatch(":", ";"))),
            None => Ok(()),
        }
    }
}
