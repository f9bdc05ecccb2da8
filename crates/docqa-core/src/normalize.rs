//! Drops lines that carry no word characters (rules, dot leaders, page furniture).

use regex::Regex;
use std::sync::OnceLock;

fn word_char() -> &'static Regex {
    static WORD: OnceLock<Regex> = OnceLock::new();
    WORD.get_or_init(|| Regex::new(r"\w").expect("static regex"))
}

/// True when `line` has at least one word character anywhere in it.
pub fn is_meaningful_line(line: &str) -> bool {
    word_char().is_match(line)
}

/// Keep only meaningful lines, preserving their order, joined by `\n`.
pub fn normalize(text: &str) -> String {
    text.split('\n').filter(|line| is_meaningful_line(line)).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_structural_lines() {
        let raw = "Title\n-----\n\n   \n* * *\nBody text, 42.\n....\n(a)";
        assert_eq!(normalize(raw), "Title\nBody text, 42.\n(a)");
    }

    #[test]
    fn single_character_anywhere_survives() {
        assert_eq!(normalize("--- x ---"), "--- x ---");
        assert_eq!(normalize("___"), "___");
    }

    #[test]
    fn unicode_letters_count_as_word_characters() {
        assert_eq!(normalize("Überblick\n…\n日本"), "Überblick\n日本");
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("\n\n--\n"), "");
    }
}
