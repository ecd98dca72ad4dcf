//! Text structuring: raw recognized text into [`StructuredFacts`].
//!
//! Pure and total. Empty or garbage input yields empty sequences and the
//! default title. The URL and email patterns are intentionally permissive and
//! keep trailing punctuation (`http://x.com.` stays as-is).

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::defaults::{
    DEFAULT_TITLE, KEYWORD_LIMIT, KEYWORD_MIN_LEN, SENTENCE_MIN_LEN, TITLE_ELLIPSIS,
    TITLE_MAX_CHARS,
};
use crate::models::StructuredFacts;

static URL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://\S+").expect("URL pattern compiles"));

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[a-zA-Z0-9._-]+@[a-zA-Z0-9._-]+\.[a-zA-Z0-9_-]+")
        .expect("email pattern compiles")
});

static SENTENCE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.\n]+").expect("sentence pattern compiles"));

/// Maximal runs of ASCII word characters. Non-ASCII text (CJK runs,
/// accented letters) separates tokens instead of forming them.
static WORD_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9_]+").expect("word pattern compiles"));

/// Extract structured facts from text.
///
/// # Examples
///
/// ```
/// use snapnote_core::structure;
///
/// let facts = structure("Contact me at a@b.com or visit http://x.com. Great news today.");
/// assert_eq!(facts.urls, vec!["http://x.com."]);
/// assert_eq!(facts.emails, vec!["a@b.com"]);
/// assert_eq!(facts.suggested_title, "Contact me at a@b");
/// ```
pub fn structure(text: &str) -> StructuredFacts {
    let urls = find_all(&URL_PATTERN, text);
    let emails = find_all(&EMAIL_PATTERN, text);
    let sentences = split_sentences(text);
    let keywords = rank_keywords(text);
    let suggested_title = suggest_title(&sentences, &keywords);

    StructuredFacts {
        urls,
        emails,
        keywords,
        sentences,
        suggested_title,
    }
}

fn find_all(pattern: &Regex, text: &str) -> Vec<String> {
    pattern
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Split on runs of periods or newlines and keep segments longer than
/// [`SENTENCE_MIN_LEN`] characters.
fn split_sentences(text: &str) -> Vec<String> {
    SENTENCE_BREAK
        .split(text)
        .map(str::trim)
        .filter(|s| s.chars().count() > SENTENCE_MIN_LEN)
        .map(str::to_string)
        .collect()
}

/// Frequency-ranked lowercase tokens of at least [`KEYWORD_MIN_LEN`]
/// characters. Ties keep first-encountered order.
fn rank_keywords(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut counts: Vec<(&str, usize)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for word in WORD_PATTERN.find_iter(&lowered).map(|m| m.as_str()) {
        if word.chars().count() < KEYWORD_MIN_LEN {
            continue;
        }
        match index.get(word) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(word, counts.len());
                counts.push((word, 1));
            }
        }
    }

    // sort_by is stable
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(KEYWORD_LIMIT)
        .map(|(word, _)| word.to_string())
        .collect()
}

fn suggest_title(sentences: &[String], keywords: &[String]) -> String {
    if let Some(first) = sentences.first() {
        if first.chars().count() > TITLE_MAX_CHARS {
            let mut title: String = first.chars().take(TITLE_MAX_CHARS).collect();
            title.push(TITLE_ELLIPSIS);
            return title;
        }
        return first.clone();
    }
    if !keywords.is_empty() {
        return format!("{} Note", keywords.join(", "));
    }
    DEFAULT_TITLE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        let facts = structure("");
        assert!(facts.urls.is_empty());
        assert!(facts.emails.is_empty());
        assert!(facts.keywords.is_empty());
        assert!(facts.sentences.is_empty());
        assert_eq!(facts.suggested_title, "New Note");
    }

    #[test]
    fn test_end_to_end_sample() {
        let facts = structure("Contact me at a@b.com or visit http://x.com. Great news today.");
        assert_eq!(facts.urls, vec!["http://x.com."]);
        assert_eq!(facts.emails, vec!["a@b.com"]);
        assert_eq!(
            facts.sentences,
            vec!["Contact me at a@b", "com or visit http://x", "Great news today"]
        );
        assert_eq!(facts.suggested_title, "Contact me at a@b");
    }

    #[test]
    fn test_keywords_ranked_by_frequency_then_first_seen() {
        let facts = structure("beta alpha alpha gamma beta alpha delta");
        assert_eq!(facts.keywords, vec!["alpha", "beta", "gamma", "delta"]);
    }

    #[test]
    fn test_keywords_capped_and_min_length() {
        let facts = structure("one two three four five seven eight eleven twelve fifteen");
        assert_eq!(facts.keywords.len(), 5);
        assert!(facts.keywords.iter().all(|k| k.chars().count() >= 4));
        assert!(!facts.keywords.contains(&"one".to_string()));
    }

    #[test]
    fn test_keywords_are_lowercase() {
        let facts = structure("Rust RUST rust");
        assert_eq!(facts.keywords, vec!["rust"]);
    }

    #[test]
    fn test_keywords_ignore_non_ascii_runs() {
        let facts = structure("今天的会议安排在下午三点 meeting");
        assert_eq!(facts.keywords, vec!["meeting"]);

        let facts = structure("会议meeting安排agenda café");
        assert_eq!(facts.keywords, vec!["meeting", "agenda"]);
    }

    #[test]
    fn test_title_truncation() {
        let sentence = "This sentence is definitely longer than thirty characters";
        let facts = structure(sentence);
        assert_eq!(facts.suggested_title.chars().count(), 31);
        assert!(facts.suggested_title.ends_with('…'));
        let prefix: String = facts.suggested_title.chars().take(30).collect();
        assert!(sentence.starts_with(&prefix));
    }

    #[test]
    fn test_title_from_keywords_when_no_sentence() {
        // "word" is only four characters so no sentence survives
        let facts = structure("word.word");
        assert!(facts.sentences.is_empty());
        assert_eq!(facts.suggested_title, "word Note");
    }

    #[test]
    fn test_duplicates_kept_for_urls_and_emails() {
        let facts = structure("https://a.io https://a.io me@x.org me@x.org");
        assert_eq!(facts.urls.len(), 2);
        assert_eq!(facts.emails.len(), 2);
    }

    #[test]
    fn test_newline_runs_split_sentences() {
        let facts = structure("First line here\n\n\nSecond line here");
        assert_eq!(facts.sentences, vec!["First line here", "Second line here"]);
    }
}
