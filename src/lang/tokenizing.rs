use crate::lang::source_buffer::{SourceBuffer, SourceLocation};
use std::fmt::{self, Debug, Display, Formatter};

/// A number token can be either an integer or a floating point literal.
#[derive(Clone, Copy, PartialEq, PartialOrd)]
pub enum NumberType {
    /// We're holding an integer value.
    Int(i64),

    /// We're holding a floating point value.
    Float(f64),
}

/// Print the number the way it would be written in source.  Infinities come from literals too
/// big for a float, so they're written back as one.
impl Display for NumberType {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            NumberType::Int(num) => write!(f, "{}", num),
            NumberType::Float(num) if num.is_infinite() => {
                write!(f, "{}1e999", if *num < 0.0 { "-" } else { "" })
            }
            NumberType::Float(num) => write!(f, "{:?}", num),
        }
    }
}

/// Print the value of the held number as well as an indicator of which variant we're holding for
/// debugging purposes.
impl Debug for NumberType {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            NumberType::Int(num) => write!(f, "{} i", num),
            NumberType::Float(num) => write!(f, "{:?} f", num),
        }
    }
}

/// The prefix word that introduced a string literal.  The prefix decides what the outer
/// interpreter does with the text.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StringForm {
    /// `." text"`, print the text when executed.
    Print,

    /// `S" text"`, push the text and its length.
    Push,

    /// `.( text)`, print the text right away, even while compiling.
    Display,
}

impl StringForm {
    /// The prefix word as it's written in the source.
    pub fn prefix(&self) -> &'static str {
        match self {
            StringForm::Print => ".\"",
            StringForm::Push => "S\"",
            StringForm::Display => ".(",
        }
    }

    /// The character that closes the literal.
    fn terminator(&self) -> char {
        match self {
            StringForm::Print | StringForm::Push => '"',
            StringForm::Display => ')',
        }
    }

    /// Is the given word one of the string prefixes?
    fn from_word(word: &str) -> Option<StringForm> {
        match word.to_uppercase().as_str() {
            ".\"" => Some(StringForm::Print),
            "S\"" => Some(StringForm::Push),
            ".(" => Some(StringForm::Display),
            _ => None,
        }
    }
}

/// A token is a simple unit of the language.  Comments never make it this far, so we're left with
/// numbers, string literals and words.
///
/// The token also holds the location in the original source code where it was found.
#[derive(Clone, PartialEq)]
pub enum Token {
    /// Can be either an integer or a floating point value.
    Number(SourceLocation, NumberType),

    /// The text of a `."`, `S"` or `.(` literal.
    String(SourceLocation, StringForm, String),

    /// A word in the language to be executed or compiled.
    Word(SourceLocation, String),
}

/// A list of tokens found in the source code.
pub type TokenList = Vec<Token>;

/// Print the token as it would be written in source, so a definition can be written back out.
impl Display for Token {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Token::Number(_, num) => write!(f, "{}", num),
            Token::String(_, form, string) => {
                write!(f, "{} {}{}", form.prefix(), string, form.terminator())
            }
            Token::Word(_, string) => write!(f, "{}", string),
        }
    }
}

/// Include the original location when debugging.
impl Debug for Token {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Token::Number(location, num) => write!(f, "{}: {:?}", location, num),
            Token::String(location, form, string) => {
                write!(f, "{}: {} {:?}", location, form.prefix(), string)
            }
            Token::Word(location, string) => write!(f, "{}: {}", location, string),
        }
    }
}

impl Token {
    /// Get the token's location in the original source text.
    pub fn location(&self) -> &SourceLocation {
        match self {
            Token::Number(location, _) => location,
            Token::String(location, _, _) => location,
            Token::Word(location, _) => location,
        }
    }

    /// Check if the token is a word.
    pub fn is_word(&self) -> bool {
        matches!(self, Token::Word(_, _))
    }

    /// The text as it would appear when used as a name, for example after `:` or `CONSTANT`.
    /// String literals can't be used as names.
    pub fn name_text(&self) -> Option<String> {
        match self {
            Token::Word(_, word) => Some(word.clone()),
            Token::Number(_, number) => Some(number.to_string()),
            Token::String(_, _, _) => None,
        }
    }
}

/// Check if the given character is considered whitespace.
fn is_whitespace(next: &char) -> bool {
    *next == ' ' || *next == '\t' || *next == '\r' || *next == '\n'
}

/// Skip over whitespace in the text.  Stopping only at either the end of the buffer or the next
/// non-whitespace character.
fn skip_whitespace(buffer: &mut SourceBuffer) {
    while let Some(next) = buffer.peek_next() {
        if !is_whitespace(&next) {
            break;
        }

        let _ = buffer.next_char();
    }
}

/// Skip a `\` comment.  The new line itself is left for the whitespace skipper.
fn skip_line_comment(buffer: &mut SourceBuffer) {
    while let Some(next) = buffer.peek_next() {
        if next == '\n' {
            break;
        }

        let _ = buffer.next_char();
    }
}

/// Skip a `( ... )` comment, nested parenthesis included.  An unclosed comment runs to the end of
/// the source.
fn skip_paren_comment(buffer: &mut SourceBuffer) {
    let _ = buffer.next_char();
    let mut depth = 1;

    while let Some(next) = buffer.next_char() {
        match next {
            '(' => depth += 1,
            ')' => {
                depth -= 1;

                if depth == 0 {
                    break;
                }
            }
            _ => {}
        }
    }
}

/// Pull text out of the buffer until we hit a whitespace character.  Words can contain any
/// character except whitespace.
fn process_until_whitespace(buffer: &mut SourceBuffer) -> String {
    let mut text = String::new();

    while let Some(next) = buffer.peek_next() {
        if is_whitespace(&next) {
            break;
        }

        let _ = buffer.next_char();
        text.push(next);
    }

    text
}

/// Read the body of a string literal.  Exactly one separating space is dropped, then everything up
/// to the terminator is taken.  Without a terminator the rest of the source is the string.
fn process_string(buffer: &mut SourceBuffer, form: StringForm) -> String {
    if buffer.peek_next() == Some(' ') {
        let _ = buffer.next_char();
    }

    let terminator = form.terminator();
    let mut text = String::new();

    while let Some(next) = buffer.next_char() {
        if next == terminator {
            break;
        }

        text.push(next);
    }

    text
}

/// Attempt to convert the text into a numeric literal.  Decimal and hexadecimal integers, (with
/// either a `$` or a `0x` prefix,) and decimal floating point numbers are understood.  Anything
/// else is left for the dictionary to deal with.
pub fn to_numeric(text: &str) -> Option<NumberType> {
    if text.is_empty() {
        return None;
    }

    if let Some(stripped) = text.strip_prefix('$') {
        return i64::from_str_radix(stripped, 16).ok().map(NumberType::Int);
    }

    if text.len() > 2
        && let Some(prefix) = text.get(..2)
        && prefix.eq_ignore_ascii_case("0x")
    {
        return i64::from_str_radix(&text[2..], 16).ok().map(NumberType::Int);
    }

    if let Ok(value) = text.parse::<i64>() {
        return Some(NumberType::Int(value));
    }

    // Rust will happily parse "inf" and "NaN", but those are perfectly good word names.
    let looks_numeric = text.chars().any(|c| c.is_ascii_digit())
        && text
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'));

    if looks_numeric {
        return text.parse::<f64>().ok().map(NumberType::Float);
    }

    None
}

/// A lazy stream of tokens over a piece of source code.  Tokens are produced on demand so that
/// words like `:` and `CONSTANT` can pull the following token straight out of the stream.
pub struct Tokenizer {
    buffer: SourceBuffer,
}

impl Tokenizer {
    /// Create a token stream for the source, tagging every token with the given path.
    pub fn new(path: &str, source: &str) -> Tokenizer {
        Tokenizer {
            buffer: SourceBuffer::new(path, source),
        }
    }

    /// Where the stream currently is.  At the end of the stream this is the end of the source.
    pub fn location(&self) -> &SourceLocation {
        self.buffer.location()
    }
}

impl Iterator for Tokenizer {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let buffer = &mut self.buffer;

        loop {
            skip_whitespace(buffer);

            let next = buffer.peek_next()?;

            if next == '\\' {
                skip_line_comment(buffer);
                continue;
            }

            if next == '('
                && let Some(after) = buffer.peek_after_next()
                && is_whitespace(&after)
            {
                skip_paren_comment(buffer);
                continue;
            }

            let location = buffer.location().clone();
            let text = process_until_whitespace(buffer);

            if let Some(form) = StringForm::from_word(&text) {
                let string = process_string(buffer, form);
                return Some(Token::String(location, form, string));
            }

            return match to_numeric(&text) {
                Some(number) => Some(Token::Number(location, number)),
                None => Some(Token::Word(location, text)),
            };
        }
    }
}

/// Tokenize the source code from a string in one go.
pub fn tokenize_from_source(path: &str, source: &str) -> TokenList {
    Tokenizer::new(path, source).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(source: &str) -> Vec<String> {
        tokenize_from_source("<test>", source)
            .iter()
            .map(|token| token.to_string())
            .collect()
    }

    #[test]
    fn splits_on_whitespace() {
        assert_eq!(words("3 4\t+\n."), vec!["3", "4", "+", "."]);
    }

    #[test]
    fn parses_numbers() {
        assert!(matches!(to_numeric("42"), Some(NumberType::Int(42))));
        assert!(matches!(to_numeric("-17"), Some(NumberType::Int(-17))));
        assert!(matches!(to_numeric("$FF"), Some(NumberType::Int(255))));
        assert!(matches!(to_numeric("0x1a"), Some(NumberType::Int(26))));
        assert!(matches!(to_numeric("0XFF"), Some(NumberType::Int(255))));
        assert!(matches!(to_numeric("3.5"), Some(NumberType::Float(value)) if value == 3.5));
        assert!(to_numeric("$").is_none());
        assert!(to_numeric("0xZZ").is_none());
        assert!(to_numeric("inf").is_none());
        assert!(to_numeric("1+").is_none());
        assert!(to_numeric("DUP").is_none());
    }

    #[test]
    fn exponents_make_floats() {
        assert!(matches!(to_numeric("1e5"), Some(NumberType::Float(value)) if value == 100000.0));
        assert!(matches!(to_numeric("2.5E-1"), Some(NumberType::Float(value)) if value == 0.25));
        assert!(to_numeric("e5").is_none());
        assert!(to_numeric("1e").is_none());
    }

    #[test]
    fn tokens_print_as_source() {
        let source = "1.5 1e999 S\"  two\" .( now) .\" hi\" DUP";
        let printed: Vec<String> = tokenize_from_source("<test>", source)
            .iter()
            .map(Token::to_string)
            .collect();

        assert_eq!(
            printed,
            vec!["1.5", "1e999", "S\"  two\"", ".( now)", ".\" hi\"", "DUP"]
        );

        let reparsed: Vec<String> = tokenize_from_source("<test>", &printed.join(" "))
            .iter()
            .map(Token::to_string)
            .collect();

        assert_eq!(reparsed, printed);
    }

    #[test]
    fn strips_comments() {
        assert_eq!(words("1 \\ the rest is ignored\n2"), vec!["1", "2"]);
        assert_eq!(words("1 ( n -- n ) 2"), vec!["1", "2"]);
        assert_eq!(words("1 ( outer ( inner ) still ) 2"), vec!["1", "2"]);
    }

    #[test]
    fn paren_without_space_is_a_word() {
        let tokens = tokenize_from_source("<test>", "(foo)");

        assert_eq!(tokens.len(), 1);
        assert!(tokens[0].is_word());
    }

    #[test]
    fn reads_string_literals() {
        let tokens = tokenize_from_source("<test>", ".\" Hello, world\" s\"  two\" .( now)");

        assert_eq!(tokens.len(), 3);

        match &tokens[0] {
            Token::String(_, StringForm::Print, text) => assert_eq!(text, "Hello, world"),
            other => panic!("Unexpected token {:?}", other),
        }

        match &tokens[1] {
            Token::String(_, StringForm::Push, text) => assert_eq!(text, " two"),
            other => panic!("Unexpected token {:?}", other),
        }

        match &tokens[2] {
            Token::String(_, StringForm::Display, text) => assert_eq!(text, "now"),
            other => panic!("Unexpected token {:?}", other),
        }
    }

    #[test]
    fn unterminated_string_takes_the_rest() {
        let tokens = tokenize_from_source("<test>", ".\" open ended");

        match &tokens[0] {
            Token::String(_, StringForm::Print, text) => assert_eq!(text, "open ended"),
            other => panic!("Unexpected token {:?}", other),
        }
    }

    #[test]
    fn records_locations() {
        let tokens = tokenize_from_source("<test>", "1\n  dup");
        let location = tokens[1].location();

        assert_eq!(location.line(), 2);
        assert_eq!(location.column(), 3);
        assert_eq!(location.path(), "<test>");
    }

    #[test]
    fn stream_is_lazy() {
        let mut tokenizer = Tokenizer::new("<test>", ": square dup * ;");

        assert_eq!(tokenizer.next().map(|t| t.to_string()), Some(":".to_string()));
        assert_eq!(tokenizer.location().column(), 2);
        assert_eq!(tokenizer.next().map(|t| t.to_string()), Some("square".to_string()));
    }
}
