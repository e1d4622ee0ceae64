use std::{ fmt::{ self,
                  Display,
                  Formatter },
           hash::{ Hash,
                   Hasher } };



/// The location in the source code where a token was found.  Used all over the engine to tie
/// instructions and errors back to the text the user wrote.
///
/// This is a read-only structure.  Use the field accessor methods to get the values.
#[derive(Clone, Debug, PartialEq, PartialOrd, Eq)]
pub struct SourceLocation
{
    /// Either the path to the file or a description of the source code.  For example code entered
    /// at the prompt will have a tag of "\<input\>".
    path: String,

    /// The 1 based line number in the source code where the token was found.
    line: usize,

    /// The 1 based column number in the source code where the token was found.
    column: usize
}


impl Hash for SourceLocation
{
    fn hash<H: Hasher>(&self, state: &mut H)
    {
        self.path.hash(state);
        self.line.hash(state);
        self.column.hash(state);
    }
}


/// Used for error reporting to show where in the source code an error originated.
impl Display for SourceLocation
{
    fn fmt(&self, formatter: &mut Formatter<'_>) -> Result<(), fmt::Error>
    {
        write!(formatter, "{} ({}, {})", self.path, self.line, self.column)
    }
}


impl Default for SourceLocation
{
    fn default() -> Self
    {
        Self::new()
    }
}


impl SourceLocation
{
    /// Crate a new SourceLocation with default values.
    pub fn new() -> SourceLocation
    {
        SourceLocation { path: "unspecified".to_string(), line: 1, column: 1 }
    }

    /// Create a new SourceLocation with the path to the source code.
    pub fn new_from_path(path: &str) -> Self
    {
        SourceLocation { path: path.to_owned(), line: 1, column: 1 }
    }

    /// Create a new SourceLocation with all of the needed information.  This is useful in
    /// conjunction with the location_here! macro.
    pub fn new_from_info(path: &str, line: usize, column: usize) -> Self
    {
        SourceLocation { path: path.to_owned(), line, column }
    }

    /// The path to the source code or a meaningful description of the source code.
    pub fn path(&self) -> &String
    {
        &self.path
    }

    /// The 1 based line number in the source code.
    pub fn line(&self) -> usize
    {
        self.line
    }

    /// The 1 based column number in the source code.
    pub fn column(&self) -> usize
    {
        self.column
    }
}



/// Helper macro to get the location of the macro invocation.  Used when registering native words
/// so that their dictionary entries point back at the Rust code that defined them.
#[macro_export]
macro_rules! location_here
{
    () =>
    {
        $crate::lang::source_buffer::SourceLocation::new_from_info(file!(),
                                      line!() as usize,
                                      column!() as usize)
    };
}



/// A forward only cursor over a piece of source code.  As characters are consumed the location of
/// the cursor is maintained so the tokenizer can stamp every token with where it came from.
///
/// The buffer owns its text.  An evaluation can be suspended between tokens (step mode) and picked
/// up again later, so the cursor can't borrow from the caller's string.
pub struct SourceBuffer
{
    /// The full text being processed.
    source: String,

    /// Byte offset of the next unread character.
    offset: usize,

    /// The logical location of the cursor in the source code.
    location: SourceLocation
}


impl SourceBuffer
{
    /// Create a new SourceBuffer with the path to, or meaningful tag for the source code and the
    /// source code itself.
    pub fn new(path: &str, source: &str) -> Self
    {
        SourceBuffer
            {
                source: source.to_string(),
                offset: 0,
                location: SourceLocation::new_from_path(path)
            }
    }

    /// The location the cursor is at in the source code being processed.
    pub fn location(&self) -> &SourceLocation
    {
        &self.location
    }

    /// Have all the characters been consumed?
    pub fn is_at_end(&self) -> bool
    {
        self.offset >= self.source.len()
    }

    /// Take a peek at the next character in the source code without consuming it.
    pub fn peek_next(&self) -> Option<char>
    {
        self.source[self.offset..].chars().next()
    }

    /// Peek one character past the next one.
    pub fn peek_after_next(&self) -> Option<char>
    {
        self.source[self.offset..].chars().nth(1)
    }

    /// Get and consume the next character in the source code.
    pub fn next_char(&mut self) -> Option<char>
    {
        let next = self.peek_next();

        if let Some(next_char) = next
        {
            self.offset += next_char.len_utf8();
            self.increment_location(next_char);
        }

        next
    }

    /// Advance one column for regular characters.  Reset the column to 1 and increment the line for
    /// new line characters.
    fn increment_location(&mut self, next: char)
    {
        if next == '\n'
        {
            self.location.line += 1;
            self.location.column = 1;
        }
        else
        {
            self.location.column += 1;
        }
    }
}
