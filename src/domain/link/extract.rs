use regex::Regex;

/// Characters stripped from the end of a matched URL (sentence punctuation, markdown emphasis)
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', '\'', '"', '*'];

/// One URL occurrence inside a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLink {
    /// URL as written, minus trailing punctuation
    pub url: String,
    /// 1-indexed line number
    pub line: usize,
    /// Preceding non-URL line, if any
    pub context: Option<String>,
}

/// Finds URL-shaped substrings in Markdown text.
pub struct LinkExtractor {
    url_pattern: Regex,
}

impl Default for LinkExtractor {
    fn default() -> Self {
        Self {
            url_pattern: Regex::new(r#"(?i)https?://[^\s<>\[\]()"'`]+"#)
                .expect("url pattern is a valid regex"),
        }
    }
}

impl LinkExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract every URL occurrence, in document order.
    /// YAML front matter is skipped.
    pub fn extract(&self, text: &str) -> Vec<ExtractedLink> {
        let lines: Vec<&str> = text.lines().collect();
        let start = front_matter_end(&lines);

        let mut links = Vec::new();
        for (idx, line) in lines.iter().enumerate().skip(start) {
            for found in self.url_pattern.find_iter(line) {
                let url = found.as_str().trim_end_matches(TRAILING_PUNCTUATION);
                if url.len() <= "https://".len() {
                    continue;
                }
                links.push(ExtractedLink {
                    url: url.to_string(),
                    line: idx + 1,
                    context: self.context_for(&lines, idx),
                });
            }
        }
        links
    }

    fn context_for(&self, lines: &[&str], idx: usize) -> Option<String> {
        let previous = lines.get(idx.checked_sub(1)?)?.trim();
        if previous.is_empty() || self.url_pattern.is_match(previous) {
            None
        } else {
            Some(previous.to_string())
        }
    }
}

/// Index of the first line after a leading `---` block, or 0.
fn front_matter_end(lines: &[&str]) -> usize {
    match lines.first() {
        Some(first) if first.trim_end() == "---" => lines
            .iter()
            .skip(1)
            .position(|l| l.trim_end() == "---")
            .map(|pos| pos + 2)
            .unwrap_or(0),
        _ => 0,
    }
}
