//! `who/pattern/replacement[/flags]` corrections and the per-speaker memory
//! they rewrite.

use std::collections::HashMap;

use regex::RegexBuilder;

/// Last message seen from each speaker. Entries live for the process lifetime.
#[derive(Debug, Default, Clone)]
pub struct CorrectionMemory {
    last_messages: HashMap<String, String>,
}

impl CorrectionMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_message(&self, speaker: &str) -> Option<&str> {
        self.last_messages.get(speaker).map(String::as_str)
    }

    pub fn remember(&mut self, speaker: &str, text: &str) {
        self.last_messages
            .insert(speaker.to_string(), text.to_string());
    }

    pub fn len(&self) -> usize {
        self.last_messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_messages.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Parsed correction request. `who` is already resolved from `s` to the speaker.
pub struct Correction {
    pub who: String,
    pub pattern: String,
    pub replacement: String,
    pub case_insensitive: bool,
}

/// Parses `text` as a correction when it splits on `/` into exactly three
/// or four tokens.
pub fn parse_correction(text: &str, speaker: &str) -> Option<Correction> {
    let tokens = text.split('/').collect::<Vec<_>>();
    if !(3..=4).contains(&tokens.len()) {
        return None;
    }
    let who = if tokens[0] == "s" { speaker } else { tokens[0] };
    let flags = tokens.get(3).copied().unwrap_or_default();
    Some(Correction {
        who: who.to_string(),
        pattern: tokens[1].to_string(),
        replacement: tokens[2].to_string(),
        case_insensitive: flags.contains('i'),
    })
}

/// Replaces every match of the correction pattern in `previous`.
pub fn apply_correction(previous: &str, correction: &Correction) -> Result<String, regex::Error> {
    let pattern = RegexBuilder::new(&correction.pattern)
        .case_insensitive(correction.case_insensitive)
        .build()?;
    let replacement = translate_replacement(&correction.replacement);
    Ok(pattern
        .replace_all(previous, replacement.as_str())
        .into_owned())
}

// `\1` and `\g<name>` back-references become `${1}` / `${name}`, control
// escapes such as `\n` and `\t` become the character itself, and a bare `$`
// is literal.
fn translate_replacement(raw: &str) -> String {
    let mut translated = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '$' => translated.push_str("$$"),
            '\\' => match chars.peek().copied() {
                Some(digit) if digit.is_ascii_digit() => {
                    let mut group = String::new();
                    while let Some(next) = chars.peek().copied().filter(char::is_ascii_digit) {
                        group.push(next);
                        chars.next();
                    }
                    translated.push_str(&format!("${{{group}}}"));
                }
                Some('g') => {
                    chars.next();
                    if chars.peek() == Some(&'<') {
                        chars.next();
                        let name = chars.by_ref().take_while(|c| *c != '>').collect::<String>();
                        translated.push_str(&format!("${{{name}}}"));
                    } else {
                        translated.push_str("\\g");
                    }
                }
                Some('\\') => {
                    chars.next();
                    translated.push('\\');
                }
                Some(escape) => match control_escape(escape) {
                    Some(control) => {
                        chars.next();
                        translated.push(control);
                    }
                    None => translated.push('\\'),
                },
                None => translated.push('\\'),
            },
            other => translated.push(other),
        }
    }
    translated
}

fn control_escape(escape: char) -> Option<char> {
    match escape {
        'n' => Some('\n'),
        't' => Some('\t'),
        'r' => Some('\r'),
        'f' => Some('\x0c'),
        'v' => Some('\x0b'),
        'a' => Some('\x07'),
        _ => None,
    }
}
