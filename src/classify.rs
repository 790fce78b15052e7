//! Query classification.
//!
//! Decides whether a message belongs to the banking domain. Kept behind a
//! trait so the keyword heuristic can later be swapped for a trained
//! classifier without touching the router.

/// Strategy interface for domain classification.
pub trait QueryClassifier: Send + Sync {
    fn is_domain_query(&self, text: &str) -> bool;
}

const BANKING_KEYWORDS: [&str; 23] = [
    "account",
    "balance",
    "loan",
    "credit",
    "debit",
    "transaction",
    "bank",
    "card",
    "atm",
    "deposit",
    "withdrawal",
    "transfer",
    "interest",
    "savings",
    "checking",
    "mortgage",
    "investment",
    "statement",
    "fee",
    "overdraft",
    "pin",
    "branch",
    "online banking",
];

/// Lowercased substring match over a fixed keyword list. Pure and
/// deterministic; paraphrased banking questions that avoid the keywords are
/// expected false negatives.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl QueryClassifier for KeywordClassifier {
    fn is_domain_query(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        BANKING_KEYWORDS
            .iter()
            .any(|keyword| lowered.contains(keyword))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banking_queries_are_positive() {
        let classifier = KeywordClassifier::new();
        assert!(classifier.is_domain_query("What is my account balance?"));
        assert!(classifier.is_domain_query("transfer money to my friend"));
        assert!(classifier.is_domain_query("HOW DO I RESET MY ATM PIN"));
    }

    #[test]
    fn general_chat_is_negative() {
        let classifier = KeywordClassifier::new();
        assert!(!classifier.is_domain_query("What's the weather today?"));
        assert!(!classifier.is_domain_query("hello, how are you"));
        assert!(!classifier.is_domain_query(""));
    }

    #[test]
    fn matching_is_substring_based() {
        let classifier = KeywordClassifier::new();
        // Known limitation of the heuristic: embedded keywords still match.
        assert!(classifier.is_domain_query("I left my cardigan at home"));
    }
}
