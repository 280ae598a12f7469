//! Case text cleaning.

/// Characters stripped from case text before tokenization.
pub const MARKS: &str = "!()-[]{};?@#$%:'\"\\,|./^&;*_1234567890";

/// Boilerplate phrases removed after case folding, in removal order.
pub const BOILERPLATE: &[&str] = &[
    "url",
    "privacy policy",
    "disclaimers",
    "disclaimer",
    "copyright policy",
];

/// Lower-case `input`, drop every mark character, remove boilerplate phrases
/// in one ordered pass and collapse whitespace.
///
/// Phrases are matched against the text as it stands after mark removal, so a
/// phrase split by a line break or a double space is kept, and a phrase only
/// formed by removing another one survives. Text that is already lower-case,
/// mark-free and boilerplate-free comes back unchanged.
pub fn normalize(input: &str) -> String {
    let lowered = input.to_lowercase();
    let mut text: String = lowered.chars().filter(|c| !MARKS.contains(*c)).collect();
    for phrase in BOILERPLATE {
        text = text.replace(phrase, "");
    }
    collapse_whitespace(&text)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// True when the raw text carries a web link (`http://`, `https://` or `www.`).
pub fn contains_url(text: &str) -> bool {
    text.split_whitespace().any(|word| {
        let w = word.to_ascii_lowercase();
        w.starts_with("http://") || w.starts_with("https://") || w.starts_with("www.")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_boilerplate_and_marks() {
        assert_eq!(normalize("Privacy Policy: The Court ruled."), "the court ruled");
    }

    #[test]
    fn empty_stays_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \t\n"), "");
    }

    #[test]
    fn digits_are_marks() {
        assert_eq!(normalize("Section 42(b) of 1999"), "section b of");
    }

    #[test]
    fn longer_phrase_removed_before_shorter_would_split_it() {
        // "disclaimers" goes first, so no stray "s" is left behind.
        assert_eq!(normalize("see disclaimers here"), "see here");
    }

    #[test]
    fn phrases_are_matched_before_whitespace_collapses() {
        assert_eq!(normalize("privacy  policy applies"), "privacy policy applies");
        assert_eq!(normalize("Privacy\nPolicy applies"), "privacy policy applies");
        assert_eq!(normalize("Copyright Policy\tapplies"), "applies");
    }

    #[test]
    fn removal_is_a_single_ordered_pass() {
        // "privacy policy" only appears once "url" is gone, after its turn.
        assert_eq!(normalize("privacy url policy applies"), "privacy policy applies");
        assert_eq!(normalize("uurlrl kept"), "url kept");
        // "copyright policy" comes last, so it is still caught.
        assert_eq!(normalize("copyrightdisclaimer policy"), "");
    }

    #[test]
    fn url_inside_words_is_removed() {
        // Literal substring removal, same as the phrase list implies.
        assert_eq!(normalize("Plural"), "pl");
    }

    #[test]
    fn normalized_text_is_a_fixed_point() {
        for s in [
            "Privacy Policy: The Court ruled.",
            "A  B\tC",
            "Court held: appeal allowed.",
            "the appeal was dismissed with costs",
        ] {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "input: {s:?}");
        }
    }

    #[test]
    fn detects_links() {
        assert!(contains_url("see https://example.com for more"));
        assert!(contains_url("WWW.court.gov"));
        assert!(!contains_url("no links in this text"));
    }
}
