//! Trigger phrase matching.
//!
//! A message is a trigger match when any phrase occurs in its text, ignoring
//! case. Matching is plain substring containment; phrases are not patterns.

/// Returns true if any phrase, case-folded, is a substring of the trimmed,
/// case-folded text.
///
/// An empty phrase list matches nothing. Phrases are taken as given, so a
/// blank phrase matches every text; [`PhraseSet`] drops those up front.
pub fn matches<P: AsRef<str>>(text: &str, phrases: &[P]) -> bool {
    if phrases.is_empty() {
        return false;
    }
    let text = text.trim().to_lowercase();
    phrases
        .iter()
        .any(|phrase| text.contains(&phrase.as_ref().to_lowercase()))
}

/// An ordered set of trigger phrases.
///
/// Blank phrases are never stored, since an empty phrase is a substring of
/// every message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhraseSet {
    phrases: Vec<String>,
    folded: Vec<String>,
}

impl PhraseSet {
    /// Creates a phrase set, skipping blank entries.
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let phrases: Vec<String> = phrases
            .into_iter()
            .map(Into::into)
            .filter(|p| !p.trim().is_empty())
            .collect();
        let folded = phrases.iter().map(|p| p.to_lowercase()).collect();
        PhraseSet { phrases, folded }
    }

    /// Parses newline-delimited phrases.
    ///
    /// Each non-blank line is one phrase, kept verbatim apart from a trailing
    /// carriage return.
    pub fn from_lines(contents: &str) -> Self {
        Self::new(contents.lines().map(|line| line.trim_end_matches('\r')))
    }

    /// Returns true if the text contains any phrase, ignoring case.
    ///
    /// Agrees with the free [`matches`] on [`PhraseSet::as_slice`], not on the
    /// raw input: `matches("x", &[""])` is true, while a set built from `[""]`
    /// is empty and matches nothing.
    pub fn matches(&self, text: &str) -> bool {
        if self.folded.is_empty() {
            return false;
        }
        let text = text.trim().to_lowercase();
        self.folded.iter().any(|phrase| text.contains(phrase.as_str()))
    }

    /// Returns the phrases in file order.
    pub fn as_slice(&self) -> &[String] {
        &self.phrases
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn matches_case_insensitive_substring() {
        let phrases = PhraseSet::new(["need new music"]);
        assert!(phrases.matches("I NEED NEW MUSIC!!"));
        assert!(phrases.matches("honestly i need new music"));
        assert!(!phrases.matches("I need new shoes"));
    }

    #[test]
    fn empty_set_matches_nothing() {
        let phrases = PhraseSet::default();
        assert!(!phrases.matches("need new music"));
        assert!(!phrases.matches(""));
        assert!(!matches::<&str>("need new music", &[]));
    }

    #[test]
    fn any_phrase_is_enough() {
        let phrases = PhraseSet::new(["need new tunes", "send new music"]);
        assert!(phrases.matches("pls send new music my way"));
        assert!(phrases.matches("Need New Tunes"));
    }

    #[test]
    fn from_lines_skips_blank_lines() {
        let phrases = PhraseSet::from_lines("need new music\r\n\n   \nneed new tunes\n");
        assert_eq!(phrases.as_slice(), ["need new music", "need new tunes"]);
        assert!(!phrases.matches("nothing relevant here"));
    }

    #[test]
    fn blank_phrase_matches_only_outside_a_set() {
        assert!(matches("anything at all", &[""]));
        assert!(matches("anything at all", &[" "]));

        let set = PhraseSet::new(["", "  "]);
        assert!(set.is_empty());
        assert!(!set.matches("anything at all"));
        assert!(!set.matches(""));
    }

    #[test]
    fn from_lines_keeps_inner_whitespace() {
        let phrases = PhraseSet::from_lines(" new music ");
        assert!(phrases.matches("any new music recs?"));
        assert!(!phrases.matches("newmusic"));
    }

    proptest! {
        /// The set agrees with the free function on the same phrases.
        #[test]
        fn set_agrees_with_free_function(
            phrases in prop::collection::vec("[a-zA-Z ]{1,8}", 0..5),
            text in "[a-zA-Z !]{0,40}",
        ) {
            let set = PhraseSet::new(phrases.clone());
            prop_assert_eq!(set.matches(&text), matches(&text, set.as_slice()));
        }

        /// A phrase embedded in any text, in any case, is found.
        #[test]
        fn embedded_phrase_always_matches(
            prefix in "[a-z ]{0,10}",
            phrase in "[a-z]{1,10}",
            suffix in "[a-z ]{0,10}",
            upper in any::<bool>(),
        ) {
            let embedded = if upper { phrase.to_uppercase() } else { phrase.clone() };
            let text = format!("{}{}{}", prefix, embedded, suffix);
            prop_assert!(matches(&text, &[phrase]));
        }

        /// Matching is exactly case-folded substring containment.
        #[test]
        fn matches_iff_folded_substring(
            phrases in prop::collection::vec("[a-cA-C]{1,3}", 0..4),
            text in "[a-cA-C ]{0,12}",
        ) {
            let expected = phrases
                .iter()
                .any(|p| text.to_lowercase().contains(&p.to_lowercase()));
            prop_assert_eq!(matches(&text, &phrases), expected);
        }
    }
}
