const SHORT_MESSAGE_THRESHOLD: usize = 20;

const AFFIRMATIONS: &[&str] = &[
    "yes", "yeah", "yep", "ok", "okay", "confirm", "proceed", "go ahead", "approve", "do it", "sure",
];

const NEGATIONS: &[&str] = &["no", "cancel", "stop", "abort", "nevermind"];

/// Purely lexical classifier for short/affirmative follow-ups (C8,
/// §4.4). Consulted only when the state manager already has a live
/// entry for the customer.
pub fn is_continuation(last_user_message: &str) -> bool {
    let trimmed = last_user_message.trim().to_lowercase();

    if trimmed.chars().count() < SHORT_MESSAGE_THRESHOLD {
        return true;
    }
    if AFFIRMATIONS.iter().any(|word| contains_word(&trimmed, word)) {
        return true;
    }
    if NEGATIONS.iter().any(|word| contains_word(&trimmed, word)) {
        return true;
    }
    if matches_option_selection(&trimmed) {
        return true;
    }
    false
}

fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.contains(needle)
}

/// Matches patterns like `option 2` or `choice b`.
fn matches_option_selection(trimmed: &str) -> bool {
    for prefix in ["option ", "choice "] {
        if let Some(rest) = trimmed.split(prefix).nth(1) {
            if rest.chars().next().map(|c| c.is_alphanumeric()).unwrap_or(false) {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_messages_are_continuations() {
        assert!(is_continuation("yes"));
        assert!(is_continuation("Sure, go ahead"));
    }

    #[test]
    fn negations_are_continuations() {
        assert!(is_continuation("no, cancel that please now thanks"));
    }

    #[test]
    fn option_selection_is_a_continuation() {
        assert!(is_continuation("option 2, the second one please go"));
    }

    #[test]
    fn long_unrelated_messages_are_not_continuations() {
        assert!(!is_continuation("please help with my money situation overall"));
    }
}
