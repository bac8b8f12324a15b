//! Hint engine — short alphabetic labels over on-screen targets, narrowed by
//! typed characters until exactly one target remains.
//!
//! Labels are bijective base-k over the hint alphabet: every index maps to a
//! unique minimum-length string with no skipped codes, so label length only
//! grows once the previous length's capacity (k, then k+k², …) is exhausted.

/// Default label alphabet: home row, lowest-first.
pub const DEFAULT_ALPHABET: &str = "asdfghjkl";

/// Result of feeding one character to a hint session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintOutcome<T> {
    /// Still more than one candidate; hints were narrowed (or the character
    /// matched nothing we track and was ignored).
    Narrowed,
    /// A label matched exactly; the session is over.
    Activated(T),
    /// No label survived; the session is over with no activation.
    Exhausted,
}

/// Generate hint labels for `count` targets over `alphabet`.
///
/// Index 0 maps to the first alphabet character; index k rolls over to a
/// two-character label ("aa" for the default alphabet), not to "a0".
pub fn hint_labels(count: usize, alphabet: &[char]) -> Vec<String> {
    let k = alphabet.len();
    debug_assert!(k > 0, "empty hint alphabet");
    let mut labels = Vec::with_capacity(count);

    for i in 0..count {
        let mut label = Vec::new();
        let mut n = i as i64;
        loop {
            label.push(alphabet[(n % k as i64) as usize]);
            n = n / k as i64 - 1;
            if n < 0 {
                break;
            }
        }
        label.reverse();
        labels.push(label.into_iter().collect());
    }

    labels
}

/// One hint-mode session: labeled targets plus the typed prefix.
///
/// Created on hint activation, consumed on activation, exhaustion, or cancel.
/// The caller owns activation side effects; the session only picks the target.
#[derive(Debug)]
pub struct HintSession<T> {
    /// Surviving (label, target) pairs; every label starts with `typed`.
    targets: Vec<(String, T)>,
    typed: String,
    new_tab: bool,
}

impl<T> HintSession<T> {
    /// Label the given targets in order. Returns None when there is nothing
    /// to hint, which the caller treats as an immediately exhausted session.
    pub fn new(targets: Vec<T>, alphabet: &[char], new_tab: bool) -> Option<Self> {
        if targets.is_empty() || alphabet.is_empty() {
            return None;
        }
        let labels = hint_labels(targets.len(), alphabet);
        let targets = labels.into_iter().zip(targets).collect();
        Some(Self {
            targets,
            typed: String::new(),
            new_tab,
        })
    }

    /// Feed one typed character (lowercased).
    ///
    /// An exact label match activates immediately even when longer labels
    /// share the prefix. Non-matching targets are evicted; an empty survivor
    /// set ends the session.
    pub fn feed_char(&mut self, c: char) -> HintOutcome<T>
    where
        T: Copy,
    {
        self.typed.push(c.to_ascii_lowercase());

        let mut activated = None;
        self.targets.retain(|(label, target)| {
            if activated.is_some() {
                return false;
            }
            if *label == self.typed {
                activated = Some(*target);
                return false;
            }
            label.starts_with(&self.typed)
        });

        if let Some(target) = activated {
            self.targets.clear();
            return HintOutcome::Activated(target);
        }
        if self.targets.is_empty() {
            return HintOutcome::Exhausted;
        }
        HintOutcome::Narrowed
    }

    /// Surviving hints for rendering: (label, target) in document order.
    pub fn visible(&self) -> impl Iterator<Item = (&str, &T)> {
        self.targets.iter().map(|(label, t)| (label.as_str(), t))
    }

    pub fn remaining(&self) -> usize {
        self.targets.len()
    }

    pub fn typed(&self) -> &str {
        &self.typed
    }

    pub fn new_tab(&self) -> bool {
        self.new_tab
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn alphabet() -> Vec<char> {
        DEFAULT_ALPHABET.chars().collect()
    }

    #[test]
    fn test_labels_single_char_range() {
        let labels = hint_labels(9, &alphabet());
        assert_eq!(
            labels,
            vec!["a", "s", "d", "f", "g", "h", "j", "k", "l"]
        );
    }

    #[test]
    fn test_labels_bijective_rollover() {
        // Index 9 rolls over to "aa", not "a" plus a zero digit.
        let labels = hint_labels(12, &alphabet());
        assert_eq!(labels[0], "a");
        assert_eq!(labels[8], "l");
        assert_eq!(labels[9], "aa");
        assert_eq!(labels[10], "as");
        assert_eq!(labels[11], "ad");
    }

    #[test]
    fn test_labels_empty_count() {
        assert!(hint_labels(0, &alphabet()).is_empty());
    }

    #[test]
    fn test_labels_tiny_alphabet() {
        let ab: Vec<char> = "ab".chars().collect();
        // Bijective base-2: a, b, aa, ab, ba, bb, aaa, ...
        let labels = hint_labels(7, &ab);
        assert_eq!(labels, vec!["a", "b", "aa", "ab", "ba", "bb", "aaa"]);
    }

    #[test]
    fn test_session_zero_targets_is_none() {
        let session: Option<HintSession<usize>> = HintSession::new(vec![], &alphabet(), false);
        assert!(session.is_none());
    }

    #[test]
    fn test_single_target_activates_on_first_char() {
        let mut session = HintSession::new(vec![7usize], &alphabet(), false).unwrap();
        assert_eq!(session.feed_char('a'), HintOutcome::Activated(7));
        assert_eq!(session.remaining(), 0);
    }

    #[test]
    fn test_narrowing_is_monotonic_then_activates() {
        // 12 targets: typing 'a' keeps a, aa, as, ad; exact "a" wins instantly.
        let targets: Vec<usize> = (0..12).collect();
        let mut session = HintSession::new(targets, &alphabet(), false).unwrap();
        assert_eq!(session.feed_char('a'), HintOutcome::Activated(0));
    }

    #[test]
    fn test_exact_match_wins_over_longer_labels() {
        // With 10 targets, labels are a..l plus "aa". Typing 'a' matches
        // label "a" exactly and must activate target 0 immediately even
        // though "aa" also starts with 'a'.
        let targets: Vec<usize> = (0..10).collect();
        let mut session = HintSession::new(targets, &alphabet(), false).unwrap();
        assert_eq!(session.feed_char('a'), HintOutcome::Activated(0));
    }

    #[test]
    fn test_every_first_keystroke_resolves_or_exhausts() {
        // With contiguous bijective labels, every alphabet character that
        // appears in any label also exists as a single-char label, so the
        // first keystroke either activates exactly or matches nothing.
        let ab: Vec<char> = "ab".chars().collect();
        let mut s = HintSession::new((0..6).collect::<Vec<usize>>(), &ab, false).unwrap();
        assert_eq!(s.feed_char('b'), HintOutcome::Activated(1));

        let mut s = HintSession::new(vec![0usize], &ab, false).unwrap();
        assert_eq!(s.feed_char('b'), HintOutcome::Exhausted);
    }

    #[test]
    fn test_unmatched_char_exhausts_session() {
        let targets: Vec<usize> = (0..3).collect(); // a, s, d
        let mut session = HintSession::new(targets, &alphabet(), false).unwrap();
        assert_eq!(session.feed_char('z'), HintOutcome::Exhausted);
        assert_eq!(session.remaining(), 0);

        // Further characters keep reporting exhaustion, never activation.
        assert_eq!(session.feed_char('a'), HintOutcome::Exhausted);
    }

    #[test]
    fn test_uppercase_input_is_folded() {
        let targets: Vec<usize> = (0..2).collect();
        let mut session = HintSession::new(targets, &alphabet(), false).unwrap();
        assert_eq!(session.feed_char('A'), HintOutcome::Activated(0));
    }

    #[test]
    fn test_new_tab_flag_carried() {
        let session = HintSession::new(vec![1usize], &alphabet(), true).unwrap();
        assert!(session.new_tab());
    }

    #[test]
    fn test_visible_exposes_labels_in_order() {
        let targets: Vec<usize> = (0..3).collect();
        let session = HintSession::new(targets, &alphabet(), false).unwrap();
        let labels: Vec<&str> = session.visible().map(|(l, _)| l).collect();
        assert_eq!(labels, vec!["a", "s", "d"]);
    }

    /// Minimal label length for index `i` over a k-character alphabet:
    /// length L covers indices [cap(L-1), cap(L)) where cap(L) = k + k² + … + k^L.
    fn expected_len(i: usize, k: usize) -> usize {
        let mut len = 1;
        let mut cap = k;
        let mut total = k;
        while i >= total {
            len += 1;
            cap *= k;
            total += cap;
        }
        len
    }

    proptest! {
        #[test]
        fn prop_labels_are_pairwise_distinct(count in 0usize..600) {
            let labels = hint_labels(count, &alphabet());
            let mut sorted = labels.clone();
            sorted.sort();
            sorted.dedup();
            prop_assert_eq!(sorted.len(), labels.len());
        }

        #[test]
        fn prop_labels_have_minimum_length(count in 1usize..600) {
            let k = alphabet().len();
            let labels = hint_labels(count, &alphabet());
            for (i, label) in labels.iter().enumerate() {
                prop_assert_eq!(label.chars().count(), expected_len(i, k));
            }
        }

        #[test]
        fn prop_labels_use_only_alphabet_chars(count in 0usize..300) {
            let ab = alphabet();
            for label in hint_labels(count, &ab) {
                prop_assert!(label.chars().all(|c| ab.contains(&c)));
            }
        }

        #[test]
        fn prop_narrowing_never_grows_survivor_set(count in 1usize..80, keys in proptest::collection::vec("[a-z]", 0..6)) {
            let targets: Vec<usize> = (0..count).collect();
            let mut session = match HintSession::new(targets, &alphabet(), false) {
                Some(s) => s,
                None => return Ok(()),
            };
            let mut last = session.remaining();
            for key in keys {
                let c = key.chars().next().unwrap();
                match session.feed_char(c) {
                    HintOutcome::Narrowed => {
                        prop_assert!(session.remaining() <= last);
                        prop_assert!(session.remaining() >= 1);
                        last = session.remaining();
                    }
                    HintOutcome::Activated(_) | HintOutcome::Exhausted => {
                        prop_assert_eq!(session.remaining(), 0);
                        break;
                    }
                }
            }
        }
    }
}
