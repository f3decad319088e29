//! Keyword extraction from a job prompt.

const STOPWORDS: &[&str] = &["the", "this", "that", "with", "from", "for", "and", "or"];

const MAX_KEYWORDS: usize = 5;
const MIN_KEYWORD_LEN: usize = 4;

/// Lowercase tokens of length >= 4, excluding a small stopword list,
/// in order of first appearance, deduplicated, capped at 5.
pub fn extract_keywords(prompt: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut keywords = Vec::new();

    for raw in prompt.split(|c: char| !c.is_alphanumeric()) {
        if keywords.len() >= MAX_KEYWORDS {
            break;
        }
        let token = raw.to_lowercase();
        if token.len() < MIN_KEYWORD_LEN || STOPWORDS.contains(&token.as_str()) {
            continue;
        }
        if seen.insert(token.clone()) {
            keywords.push(token);
        }
    }

    keywords
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_lowercase_keywords_above_the_length_floor() {
        let keywords = extract_keywords("Fix the Login form validation bug");
        assert_eq!(keywords, vec!["login", "form", "validation"]);
    }

    #[test]
    fn drops_stopwords_and_short_tokens() {
        let keywords = extract_keywords("add a cache for the user session");
        assert_eq!(keywords, vec!["cache", "user", "session"]);
    }

    #[test]
    fn caps_at_five_and_dedupes() {
        let prompt = "alpha alpha beta gamma delta epsilon zeta eta";
        let keywords = extract_keywords(prompt);
        assert_eq!(keywords, vec!["alpha", "beta", "gamma", "delta", "epsilon"]);
    }
}
