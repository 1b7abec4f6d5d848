//! Plain-language explanation of a single section
//!
//! A text heuristic, not a legal parse: comma-separated fragments of the body
//! stand in for the ingredients of the offence, and the punishment is whatever
//! follows "shall be punished with" up to the next full stop.

use std::sync::OnceLock;

use regex::Regex;

use crate::corpus::Section;

/// How many comma-delimited fragments are listed as ingredients.
pub const MAX_INGREDIENTS: usize = 4;

const CLOSING: &str = "This section aims to protect public order and legal rights.";

fn punishment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)shall be punished with (.+?)(?:\.|$)").expect("static regex")
    })
}

/// The first [`MAX_INGREDIENTS`] comma-delimited fragments of `text`.
///
/// Fragments keep their position, so `"a,, b"` yields an empty second
/// ingredient. Blank text has no ingredients at all.
pub fn ingredients(text: &str) -> Vec<&str> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    text.split(',')
        .take(MAX_INGREDIENTS)
        .map(|fragment| fragment.trim().trim_end_matches('.').trim_end())
        .collect()
}

/// The punishment clause, if the text states one.
pub fn punishment(text: &str) -> Option<&str> {
    punishment_pattern()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|clause| !clause.is_empty())
}

/// Render the templated explanation for a section.
///
/// Pure and infallible. The layout is fixed; a sparse section keeps the
/// ingredients heading with nothing listed under it.
pub fn explain(section: &Section) -> String {
    let mut lines = vec![format!(
        "Section {} deals with {}.",
        section.id,
        section.title.trim().to_lowercase()
    )];

    lines.push(String::new());
    lines.push("Essential ingredients of the offence include:".to_string());
    for (i, ingredient) in ingredients(&section.text).iter().enumerate() {
        lines.push(format!("{}. {}.", i + 1, ingredient));
    }

    if let Some(clause) = punishment(&section.text) {
        lines.push(String::new());
        lines.push(format!("Punishment: {clause}."));
    }

    lines.push(String::new());
    lines.push(CLOSING.to_string());

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn murder() -> Section {
        Section::new(
            "303",
            "Murder",
            "Whoever commits murder shall be punished with death, or imprisonment for life, and fine.",
        )
    }

    #[test]
    fn test_murder_explanation() {
        let text = explain(&murder());

        assert!(text.starts_with("Section 303 deals with murder."));
        assert!(text.contains("Punishment: death, or imprisonment for life, and fine."));
        assert!(text.contains("1. Whoever commits murder shall be punished with death."));
        assert!(text.contains("2. or imprisonment for life."));
        assert!(text.contains("3. and fine."));
        assert!(text.ends_with(CLOSING));
    }

    #[test]
    fn test_full_layout() {
        let expected = "\
Section 303 deals with murder.

Essential ingredients of the offence include:
1. Whoever commits murder shall be punished with death.
2. or imprisonment for life.
3. and fine.

Punishment: death, or imprisonment for life, and fine.

This section aims to protect public order and legal rights.";
        assert_eq!(explain(&murder()), expected);
    }

    #[test]
    fn test_pure() {
        assert_eq!(explain(&murder()), explain(&murder()));
    }

    #[test]
    fn test_at_most_four_ingredients() {
        let section = Section::new("1", "Many", "a, b, c, d, e, f");
        let text = explain(&section);
        assert!(text.contains("4. d."));
        assert!(!text.contains("5."));
    }

    #[test]
    fn test_punishment_case_insensitive() {
        assert_eq!(
            punishment("Such person SHALL BE PUNISHED WITH fine only. Further text."),
            Some("fine only")
        );
    }

    #[test]
    fn test_punishment_runs_to_end_without_full_stop() {
        assert_eq!(
            punishment("shall be punished with imprisonment for seven years"),
            Some("imprisonment for seven years")
        );
    }

    #[test]
    fn test_no_punishment_line() {
        let section = Section::new("2", "Definitions", "In this Sanhita, act denotes a series of acts");
        assert!(!explain(&section).contains("Punishment:"));
    }

    #[test]
    fn test_sparse_section_does_not_fail() {
        let section = Section::new("9", "", "");
        let text = explain(&section);

        assert_eq!(
            text,
            "Section 9 deals with .\n\nEssential ingredients of the offence include:\n\n".to_string() + CLOSING
        );
        assert!(ingredients("   ").is_empty());
    }

    #[test]
    fn test_empty_fragments_keep_their_place() {
        assert_eq!(
            ingredients("alpha,, beta, gamma, delta, epsilon."),
            vec!["alpha", "", "beta", "gamma"]
        );

        let section = Section::new("5", "X", "alpha,, beta, gamma, delta, epsilon.");
        let text = explain(&section);
        assert!(text.contains("1. alpha.\n2. .\n3. beta.\n4. gamma."));
        assert!(!text.contains("delta"));
    }
}
