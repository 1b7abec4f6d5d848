//! Direct lookup by section number
//!
//! The first standalone run of one to three digits in the query is taken to be
//! the section number. "section 303", "sec 303 theft", "IPC 303" and
//! "what is 303?" all resolve to `303`.
//!
//! Any other short number in the query (a year written as "'24", a page, a
//! house number) is indistinguishable from a section reference and will be
//! looked up as one.

use std::sync::OnceLock;

use regex::Regex;

use crate::corpus::{Corpus, Section};

fn section_number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b([0-9]{1,3})\b").expect("static regex"))
}

/// Extract the section number a free-text query refers to.
pub fn extract_section_number(query: &str) -> Option<&str> {
    section_number_pattern()
        .captures(query)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Resolve a free-text query to a section by number.
///
/// `None` when the query holds no section number or the corpus has no such
/// section.
pub fn search<'a>(query: &str, corpus: &'a Corpus) -> Option<&'a Section> {
    let id = extract_section_number(query)?;
    let found = corpus.get(id);
    tracing::debug!(query, id, found = found.is_some(), "exact lookup");
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Corpus {
        Corpus::from_sections(vec![
            Section::new(
                "303",
                "Murder",
                "Whoever commits murder shall be punished with death, or imprisonment for life, and fine.",
            ),
            Section::new("7", "Short", "x"),
        ])
        .unwrap()
    }

    #[test]
    fn test_extract_common_phrasings() {
        assert_eq!(extract_section_number("Section 303"), Some("303"));
        assert_eq!(extract_section_number("sec 303 theft"), Some("303"));
        assert_eq!(extract_section_number("IPC 303"), Some("303"));
        assert_eq!(extract_section_number("What is 303?"), Some("303"));
        assert_eq!(extract_section_number("s.7"), Some("7"));
    }

    #[test]
    fn test_extract_takes_first_run() {
        assert_eq!(extract_section_number("303 or 304"), Some("303"));
    }

    #[test]
    fn test_extract_ignores_long_numbers() {
        assert_eq!(extract_section_number("crimes in 2023"), None);
        assert_eq!(extract_section_number("crimes in 2023 under 303"), Some("303"));
    }

    #[test]
    fn test_no_digits_is_not_found() {
        assert_eq!(extract_section_number("what is theft"), None);
        assert!(search("what is theft", &corpus()).is_none());
    }

    #[test]
    fn test_search_hit() {
        let corpus = corpus();
        let section = search("tell me about section 303", &corpus).unwrap();
        assert_eq!(section.id, "303");
        assert_eq!(section.title, "Murder");
    }

    #[test]
    fn test_unknown_number_is_not_found() {
        assert!(search("section 999", &corpus()).is_none());
    }

    #[test]
    fn test_unrelated_number_false_positive() {
        // known limitation: any short number is read as a section
        let corpus = corpus();
        let section = search("what happened on day 7", &corpus).unwrap();
        assert_eq!(section.id, "7");
    }
}
