use crate::{
    lang::{
        code::{pretty_print_code, ByteCode},
        source_buffer::SourceLocation,
    },
    runtime::{data_structures::value::Value, error, interpreter::Interpreter},
};
use std::{
    collections::HashMap,
    fmt::{self, Debug, Display, Formatter},
    rc::Rc,
};

/// Definition of a native word handler.  Native words are plain functions that operate on the
/// interpreter they're given.
pub type WordHandler = fn(&mut dyn Interpreter) -> error::Result<()>;

/// The runtime of a word in the dictionary.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum WordRuntime {
    /// The word is executed immediately when found at compile time in the user script.
    Immediate,

    /// The word is compiled into the definition being built, or executed when interpreting.
    Normal,
}

/// Whether lookups can see the word.  A word being defined stays hidden until its `;` so that a
/// half-built body can never be called.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum WordVisibility {
    /// The word can be found by name.
    Visible,

    /// The word is still being built.
    Hidden,
}

/// What actually runs when the word is executed.
#[derive(Clone)]
pub enum WordBody {
    /// A native word written in Rust.
    Primitive(WordHandler),

    /// A word compiled from source.  The body is shared with any frame currently executing it.
    Compiled(Rc<ByteCode>),
}

impl Debug for WordBody {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            WordBody::Primitive(_) => write!(f, "Primitive"),
            WordBody::Compiled(code) => write!(f, "Compiled({} instructions)", code.len()),
        }
    }
}

/// How a word defined from source was made, kept so the definition can be written back out.
#[derive(Clone, Debug, PartialEq)]
pub enum WordSource {
    /// The body tokens of a colon definition, between the name and the `;`.
    Colon(String),

    /// A word made by CONSTANT.
    Constant(Value),

    /// A word made by VARIABLE, and the cell it reserved.
    Variable(usize),
}

/// The information stored in the dictionary for each word.
#[derive(Clone, Debug)]
pub struct WordInfo {
    /// The location in the source code where the word was defined.
    pub location: SourceLocation,

    /// The name of the word, always upper case.
    pub name: String,

    /// The code to run.
    pub body: WordBody,

    /// When should the word be executed?
    pub runtime: WordRuntime,

    /// Control words only make sense inside a definition.
    pub compile_only: bool,

    /// Can the word be found by name?
    pub visibility: WordVisibility,

    /// A simple description of the word.
    pub description: String,

    /// The stack signature of the word.  Documentation only.
    pub signature: String,

    /// Position of the entry in definition order.  Forgetting back to this mark removes the word.
    pub mark: usize,

    /// The source the word came from.  Native words have none.
    pub source: Option<WordSource>,
}

impl WordInfo {
    /// Create a new visible, normal word.
    pub fn new(location: SourceLocation, name: &str, body: WordBody) -> WordInfo {
        WordInfo {
            location,
            name: name.to_uppercase(),
            body,
            runtime: WordRuntime::Normal,
            compile_only: false,
            visibility: WordVisibility::Visible,
            description: String::new(),
            signature: String::new(),
            mark: 0,
            source: None,
        }
    }

    /// Is this one of the words written in Rust?
    pub fn is_primitive(&self) -> bool {
        matches!(self.body, WordBody::Primitive(_))
    }

    pub fn is_immediate(&self) -> bool {
        self.runtime == WordRuntime::Immediate
    }

    /// The definition as SEE shows it.  Compiled words are listed instruction by instruction,
    /// with calls resolved to names through the dictionary.
    pub fn describe(&self, dictionary: &Dictionary) -> String {
        let immediate = if self.is_immediate() { " IMMEDIATE" } else { "" };

        match &self.body {
            WordBody::Primitive(_) => {
                format!(": {} ( primitive ) ;{} {}\n", self.name, immediate, self.signature)
            }
            WordBody::Compiled(code) => format!(
                ": {}\n{};{}\n",
                self.name,
                pretty_print_code(Some(dictionary), code),
                immediate
            ),
        }
    }
}

/// The word dictionary.  Entries are appended in definition order and never rearranged.  Every
/// name maps to the list of entries defined with it, oldest first, so the last visible entry in
/// that list is the one lookups resolve to.
///
/// Entries are only ever removed in bulk, by forgetting back to an earlier mark.
pub struct Dictionary {
    entries: Vec<WordInfo>,
    by_name: HashMap<String, Vec<usize>>,
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::new()
    }
}

/// WORDS style listing.  Each name appears once, in the order its newest definition was made.
impl Display for Dictionary {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        const COLUMN_WIDTH: usize = 15;
        const COLUMNS: usize = 5;

        for (index, name) in self.names().iter().enumerate() {
            write!(formatter, "{:<width$}", name, width = COLUMN_WIDTH)?;

            if (index + 1) % COLUMNS == 0 {
                writeln!(formatter)?;
            }
        }

        writeln!(formatter)
    }
}

impl Dictionary {
    /// Create a new empty dictionary.
    pub fn new() -> Dictionary {
        Dictionary {
            entries: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// How many entries, hidden and shadowed ones included, the dictionary holds.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a new entry, shadowing any earlier entry with the same name.  Returns the entry's
    /// index, which compiled code uses to call the word.
    pub fn insert(&mut self, mut info: WordInfo) -> usize {
        let index = self.entries.len();

        info.name = info.name.to_uppercase();
        info.mark = index;

        let slots = self.by_name.entry(info.name.clone()).or_default();

        if !slots.is_empty() && info.visibility == WordVisibility::Visible {
            log::debug!("Redefining word {}, {} earlier definition(s) shadowed.",
                        info.name,
                        slots.len());
        }

        slots.push(index);
        self.entries.push(info);

        index
    }

    /// Find the most recent visible entry for the name, along with its index.
    pub fn find(&self, name: &str) -> Option<(usize, &WordInfo)> {
        let slots = self.by_name.get(&name.to_uppercase())?;

        slots
            .iter()
            .rev()
            .map(|index| (*index, &self.entries[*index]))
            .find(|(_, entry)| entry.visibility == WordVisibility::Visible)
    }

    /// Try to get the most recent visible entry for the name.
    pub fn try_get(&self, name: &str) -> Option<&WordInfo> {
        self.find(name).map(|(_, entry)| entry)
    }

    /// Is there a visible word by this name?
    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Get an entry by its index, whether or not it's visible.
    pub fn entry(&self, index: usize) -> Option<&WordInfo> {
        self.entries.get(index)
    }

    pub fn entry_mut(&mut self, index: usize) -> Option<&mut WordInfo> {
        self.entries.get_mut(index)
    }

    /// The position the next definition will get.  Pass it to `forget_back_to` to undo everything
    /// defined from now on.
    pub fn mark(&self) -> usize {
        self.entries.len()
    }

    /// Remove every entry defined at or after the mark.  Names that were shadowed by a removed
    /// entry become visible again.
    pub fn forget_back_to(&mut self, mark: usize) {
        if mark >= self.entries.len() {
            return;
        }

        log::debug!("Forgetting {} dictionary entries back to mark {}.",
                    self.entries.len() - mark,
                    mark);

        for removed in self.entries.drain(mark..) {
            if let Some(slots) = self.by_name.get_mut(&removed.name) {
                slots.retain(|index| *index < mark);

                if slots.is_empty() {
                    let _ = self.by_name.remove(&removed.name);
                }
            }
        }
    }

    /// The newest visible word that wasn't written in Rust.
    pub fn latest_user_word(&self) -> Option<usize> {
        self.entries
            .iter()
            .rposition(|entry| entry.visibility == WordVisibility::Visible && !entry.is_primitive())
    }

    /// Visible entries made at or after the mark, shadowed ones included, in definition order.
    pub fn visible_since(&self, mark: usize) -> impl Iterator<Item = &WordInfo> {
        self.entries
            .iter()
            .skip(mark)
            .filter(|entry| entry.visibility == WordVisibility::Visible)
    }

    /// The visible names in the order their newest definition was made, each name only once.
    pub fn names(&self) -> Vec<String> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(index, entry)| {
                matches!(self.find(&entry.name), Some((found, _)) if found == *index)
            })
            .map(|(_, entry)| entry.name.clone())
            .collect()
    }

    /// How many entries, shadowed ones included, carry the name.
    pub fn count_named(&self, name: &str) -> usize {
        self.by_name
            .get(&name.to_uppercase())
            .map(|slots| {
                slots
                    .iter()
                    .filter(|index| self.entries[**index].visibility == WordVisibility::Visible)
                    .count()
            })
            .unwrap_or(0)
    }

    /// Find known names that look like the given one, best match first.  A name qualifies if
    /// it's close by edit distance, or if it starts with the given text.
    pub fn suggest_similar(&self, name: &str) -> Vec<String> {
        const CUTOFF: f64 = 0.6;
        const MAX_SUGGESTIONS: usize = 3;

        let target = name.to_uppercase();

        if target.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(f64, String)> = self
            .names()
            .into_iter()
            .filter(|candidate| *candidate != target)
            .filter_map(|candidate| {
                let score = similarity(&target, &candidate);

                if score >= CUTOFF || candidate.starts_with(&target) {
                    Some((score, candidate))
                } else {
                    None
                }
            })
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        scored.truncate(MAX_SUGGESTIONS);

        scored.into_iter().map(|(_, candidate)| candidate).collect()
    }
}

/// Similarity ratio between two names in the range 0.0 to 1.0, derived from the Levenshtein
/// distance.
fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let longest = a.len().max(b.len());

    if longest == 0 {
        return 1.0;
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, a_char) in a.iter().enumerate() {
        current[0] = i + 1;

        for (j, b_char) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(a_char != b_char);

            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }

        std::mem::swap(&mut previous, &mut current);
    }

    1.0 - (previous[b.len()] as f64 / longest as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut dyn Interpreter) -> error::Result<()> {
        Ok(())
    }

    fn word(name: &str) -> WordInfo {
        WordInfo::new(SourceLocation::new(), name, WordBody::Primitive(noop))
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let mut dictionary = Dictionary::new();
        let index = dictionary.insert(word("dup"));

        assert_eq!(dictionary.find("DUP").map(|(i, _)| i), Some(index));
        assert_eq!(dictionary.try_get("Dup").map(|e| e.name.as_str()), Some("DUP"));
        assert!(dictionary.try_get("drop").is_none());
    }

    #[test]
    fn newest_definition_shadows() {
        let mut dictionary = Dictionary::new();

        let first = dictionary.insert(word("SQUARE"));
        let second = dictionary.insert(word("SQUARE"));

        assert_eq!(dictionary.find("square").map(|(i, _)| i), Some(second));
        assert_eq!(dictionary.count_named("SQUARE"), 2);

        dictionary.forget_back_to(second);

        assert_eq!(dictionary.find("square").map(|(i, _)| i), Some(first));
        assert_eq!(dictionary.count_named("SQUARE"), 1);
    }

    #[test]
    fn hidden_entries_are_not_found() {
        let mut dictionary = Dictionary::new();
        let mut hidden = word("FOO");

        hidden.visibility = WordVisibility::Hidden;

        let index = dictionary.insert(hidden);

        assert!(dictionary.try_get("FOO").is_none());
        assert!(dictionary.entry(index).is_some());

        if let Some(entry) = dictionary.entry_mut(index) {
            entry.visibility = WordVisibility::Visible;
        }

        assert!(dictionary.contains("foo"));
    }

    #[test]
    fn forget_removes_everything_after_the_mark() {
        let mut dictionary = Dictionary::new();

        let _ = dictionary.insert(word("A"));
        let mark = dictionary.mark();
        let _ = dictionary.insert(word("B"));
        let _ = dictionary.insert(word("C"));

        dictionary.forget_back_to(mark);

        assert_eq!(dictionary.len(), 1);
        assert_eq!(dictionary.names(), vec!["A".to_string()]);
        assert!(!dictionary.contains("C"));
    }

    #[test]
    fn names_lists_each_word_once() {
        let mut dictionary = Dictionary::new();

        let _ = dictionary.insert(word("A"));
        let _ = dictionary.insert(word("B"));
        let _ = dictionary.insert(word("A"));

        assert_eq!(dictionary.names(), vec!["B".to_string(), "A".to_string()]);
        assert!(dictionary.to_string().starts_with("B              A"));
    }

    #[test]
    fn suggests_close_names() {
        let mut dictionary = Dictionary::new();

        for name in ["DUP", "DROP", "SWAP", "OVER", "2DUP"] {
            let _ = dictionary.insert(word(name));
        }

        let suggestions = dictionary.suggest_similar("DUPP");

        assert_eq!(suggestions.first().map(String::as_str), Some("DUP"));
        assert!(suggestions.len() <= 3);
        assert!(dictionary.suggest_similar("XYZZY").is_empty());
        assert_eq!(dictionary.suggest_similar("SW"), vec!["SWAP".to_string()]);
    }

    #[test]
    fn latest_user_word_skips_natives_and_hidden_entries() {
        let mut dictionary = Dictionary::new();
        let _ = dictionary.insert(word("DUP"));

        assert_eq!(dictionary.latest_user_word(), None);

        let user = dictionary.insert(WordInfo::new(
            SourceLocation::new(),
            "SQUARE",
            WordBody::Compiled(Rc::new(Vec::new())),
        ));
        let _ = dictionary.insert(word("DROP"));

        let mut hidden = WordInfo::new(
            SourceLocation::new(),
            "CUBE",
            WordBody::Compiled(Rc::new(Vec::new())),
        );
        hidden.visibility = WordVisibility::Hidden;
        let _ = dictionary.insert(hidden);

        assert_eq!(dictionary.latest_user_word(), Some(user));

        let since: Vec<&str> = dictionary
            .visible_since(user)
            .map(|entry| entry.name.as_str())
            .collect();
        assert_eq!(since, vec!["SQUARE", "DROP"]);
    }

    #[test]
    fn similarity_ratio() {
        assert_eq!(similarity("ABC", "ABC"), 1.0);
        assert_eq!(similarity("ABCD", "ABCE"), 0.75);
        assert_eq!(similarity("", ""), 1.0);
    }
}
