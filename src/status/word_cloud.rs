//! Keyword frequency summary over a job's articles.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::models::{Article, WordCloudEntry};

/// Maximum entries returned.
pub const WORD_CLOUD_LIMIT: usize = 20;

/// Han runs of two to four characters, or Latin words of two or more letters.
static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\p{Han}{2,4}|[A-Za-z]{2,}").expect("valid token pattern"));

/// Split text into word-cloud tokens.
pub fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    TOKEN.find_iter(text).map(|m| m.as_str())
}

/// Count tokens from every article's title and digest.
///
/// Sorted by count descending, ties in first-seen order, capped at
/// [`WORD_CLOUD_LIMIT`].
pub fn word_cloud(articles: &[Article]) -> Vec<WordCloudEntry> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();

    let texts = articles
        .iter()
        .flat_map(|a| [a.title.as_str(), a.digest.as_str()]);
    for token in texts.flat_map(tokenize) {
        let next_rank = counts.len();
        counts.entry(token).or_insert((0, next_rank)).0 += 1;
    }

    let mut entries: Vec<_> = counts.into_iter().collect();
    entries.sort_by(|(_, (count_a, rank_a)), (_, (count_b, rank_b))| {
        count_b.cmp(count_a).then(rank_a.cmp(rank_b))
    });
    entries.truncate(WORD_CLOUD_LIMIT);

    entries
        .into_iter()
        .map(|(word, (count, _))| WordCloudEntry {
            word: word.to_string(),
            count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(title: &str, digest: &str) -> Article {
        let mut article = Article::draft(title, "");
        article.digest = digest.to_string();
        article
    }

    #[test]
    fn test_chinese_and_latin_tokens() {
        let cloud = word_cloud(&[article("AI写作工具测评", "AI工具测评分享")]);

        assert_eq!(
            cloud[0],
            WordCloudEntry {
                word: "AI".to_string(),
                count: 2
            }
        );
        let words: Vec<_> = cloud.iter().map(|e| e.word.as_str()).collect();
        assert_eq!(words, vec!["AI", "写作工具", "测评", "工具测评", "分享"]);
        assert!(cloud
            .iter()
            .all(|e| (2..=4).contains(&e.word.chars().count())));
        assert!(cloud.windows(2).all(|w| w[0].count >= w[1].count));
    }

    #[test]
    fn test_single_characters_are_ignored() {
        let tokens: Vec<_> = tokenize("a 的 b 了 ok").collect();
        assert_eq!(tokens, vec!["ok"]);
    }

    #[test]
    fn test_capped_at_limit() {
        let title: String = (0..30u8)
            .map(|i| format!("w{}{} ", (b'a' + i / 26) as char, (b'a' + i % 26) as char))
            .collect();

        let cloud = word_cloud(&[article(&title, "")]);
        assert_eq!(cloud.len(), WORD_CLOUD_LIMIT);
        assert_eq!(cloud[0].word, "waa");
    }

    #[test]
    fn test_frequency_order() {
        let cloud = word_cloud(&[
            article("Rust async", "tokio runtime"),
            article("Rust tokio", "Rust"),
        ]);
        assert_eq!(cloud[0].word, "Rust");
        assert_eq!(cloud[0].count, 3);
        assert_eq!(cloud[1].word, "tokio");
        assert_eq!(cloud[1].count, 2);
    }

    #[test]
    fn test_empty_articles() {
        assert!(word_cloud(&[]).is_empty());
    }
}
