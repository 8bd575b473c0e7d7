//! Line-oriented list parser for curated markdown lists.
//!
//! Rules, in precedence order:
//! 1. Fenced code blocks (```` ``` ```` / `~~~`) are skipped entirely.
//! 2. ATX headings set the category for the items that follow.
//! 3. Blank lines and thematic breaks end the current item.
//! 4. A list line (`-`, `*`, `+`, `1.`, `1)` at any indent) starts an item.
//! 5. Any other non-blank line directly after an item continues it.
//!
//! Items whose links all point at in-page anchors are tables of contents and
//! are dropped.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use url::Url;

use marklist_core::CachedStars;

use crate::{DocItem, DocumentParser, FileContext, ParseError};

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}#{1,6}\s+(.*?)(?:\s+#+)?\s*$").unwrap());
static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)(?:[-*+]|\d{1,9}[.)])\s+(.*)$").unwrap());
static THEMATIC_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ {0,3}(?:(?:-\s*){3,}|(?:\*\s*){3,}|(?:_\s*){3,})$").unwrap()
});
static LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\[([^\]]*)\]\(\s*<?([^)\s>]+)>?(?:\s+"[^"]*")?\s*\)"#).unwrap()
});
static GITHUB_REPO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://github\.com/([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+)").unwrap()
});
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Default [`DocumentParser`] for awesome-list style documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct ListParser;

impl ListParser {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentParser for ListParser {
    fn parse(
        &self,
        body: &[u8],
        context: &FileContext,
        stars: &CachedStars,
    ) -> Result<Vec<DocItem>, ParseError> {
        let text = std::str::from_utf8(body).map_err(|e| ParseError::InvalidUtf8 {
            file: context.file.to_string(),
            source: e,
        })?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let mut collector = Collector {
            context,
            stars,
            category: String::new(),
            current: Vec::new(),
            items: Vec::new(),
        };
        let mut fence: Option<char> = None;

        for line in text.lines() {
            if let Some(marker) = fence {
                if fence_marker(line) == Some(marker) {
                    fence = None;
                }
                continue;
            }
            if let Some(marker) = fence_marker(line) {
                collector.flush();
                fence = Some(marker);
                continue;
            }
            if let Some(caps) = HEADING.captures(line) {
                collector.flush();
                collector.category = caps[1].trim().to_string();
                continue;
            }
            if line.trim().is_empty() || THEMATIC_BREAK.is_match(line) {
                collector.flush();
                continue;
            }
            if LIST_ITEM.is_match(line) {
                collector.flush();
                collector.current.push(line);
                continue;
            }
            if !collector.current.is_empty() {
                collector.current.push(line);
            }
        }
        collector.flush();

        Ok(collector.items)
    }
}

struct Collector<'a> {
    context: &'a FileContext,
    stars: &'a CachedStars,
    category: String,
    current: Vec<&'a str>,
    items: Vec<DocItem>,
}

impl<'a> Collector<'a> {
    fn flush(&mut self) {
        if self.current.is_empty() {
            return;
        }
        let lines = std::mem::take(&mut self.current);
        let Some(formatted) = format_item(&lines, self.context, self.stars) else {
            return;
        };
        self.items.push(DocItem {
            raw_markdown: lines.join("\n"),
            formatted_markdown: formatted,
            category: self.category.clone(),
        });
    }
}

fn fence_marker(line: &str) -> Option<char> {
    let trimmed = line.trim_start();
    if line.len() - trimmed.len() > 3 {
        return None;
    }
    if trimmed.starts_with("```") {
        Some('`')
    } else if trimmed.starts_with("~~~") {
        Some('~')
    } else {
        None
    }
}

fn format_item(lines: &[&str], context: &FileContext, stars: &CachedStars) -> Option<String> {
    let (first, rest) = lines.split_first()?;
    let head = LIST_ITEM.captures(first)?.get(2)?.as_str();

    let mut joined = String::from(head);
    for line in rest {
        joined.push(' ');
        joined.push_str(line.trim());
    }
    let text = WHITESPACE.replace_all(joined.trim(), " ").into_owned();
    if text.is_empty() || is_table_of_contents(&text) {
        return None;
    }

    let mut formatted = absolutize_links(&text, context);
    if let Some(count) = linked_repo_stars(&formatted, context, stars) {
        formatted.push_str(&format!(" ⭐ {count}"));
    }
    Some(formatted)
}

fn is_table_of_contents(text: &str) -> bool {
    let mut targets = LINK.captures_iter(text).map(|caps| caps[2].to_string());
    let Some(first) = targets.next() else {
        return false;
    };
    first.starts_with('#') && targets.all(|t| t.starts_with('#'))
}

fn is_relative(target: &str) -> bool {
    !(target.starts_with('#')
        || target.starts_with("//")
        || target.starts_with("mailto:")
        || target.contains("://"))
}

fn absolutize_links(text: &str, context: &FileContext) -> String {
    LINK.replace_all(text, |caps: &Captures| {
        let target = &caps[2];
        match is_relative(target)
            .then(|| resolve_link(target, context))
            .flatten()
        {
            Some(url) => format!("[{}]({url})", &caps[1]),
            None => caps[0].to_string(),
        }
    })
    .into_owned()
}

/// Resolve `target` the way GitHub does when rendering the document: paths
/// are relative to the document's blob URL, and a leading `/` means the
/// repository root on the same branch.
fn resolve_link(target: &str, context: &FileContext) -> Option<String> {
    let branch = context.default_branch.as_deref().unwrap_or("HEAD");
    let mut base = Url::parse("https://github.com/").ok()?;
    {
        let mut segments = base.path_segments_mut().ok()?;
        segments
            .pop_if_empty()
            .extend(context.file.source_identifier.split('/'))
            .push("blob")
            .extend(branch.split('/'));
        if target.starts_with('/') {
            segments.push("");
        } else {
            segments.extend(context.file.file.split('/'));
        }
    }
    let resolved = base.join(target.trim_start_matches('/')).ok()?;
    Some(resolved.into())
}

/// Star count of the first linked GitHub repository present in the cache,
/// ignoring links back into the document's own repository.
fn linked_repo_stars(text: &str, context: &FileContext, stars: &CachedStars) -> Option<u64> {
    let own = context.file.source_identifier.to_ascii_lowercase();
    GITHUB_REPO.captures_iter(text).find_map(|caps| {
        let repo = caps[2].trim_end_matches(".git");
        let key = format!("{}/{}", &caps[1], repo).to_ascii_lowercase();
        if key == own {
            return None;
        }
        stars.get(&key).map(|cached| cached.stars)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use marklist_core::{CachedRepo, FileRef};

    fn ctx(file: &str) -> FileContext {
        FileContext::new(FileRef::new("owner/list", file), Some("main".into()))
    }

    fn parse(doc: &str) -> Vec<DocItem> {
        ListParser::new()
            .parse(doc.as_bytes(), &ctx("README.md"), &CachedStars::default())
            .expect("parse")
    }

    #[test]
    fn headings_become_categories() {
        let items = parse("# Title\n\n## Tools\n\n- [a](https://a.dev) - A.\n\n## Books\n\n* [b](https://b.dev)\n");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].category, "Tools");
        assert_eq!(items[1].category, "Books");
        assert_eq!(items[1].formatted_markdown, "[b](https://b.dev)");
    }

    #[test]
    fn items_before_first_heading_have_empty_category() {
        let items = parse("- [a](https://a.dev)\n# Later\n");
        assert_eq!(items[0].category, "");
    }

    #[test]
    fn raw_keeps_indentation_and_continuation_lines() {
        let doc = "## X\n  - [a](https://a.dev)\n    spans two lines\n";
        let items = parse(doc);
        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0].raw_markdown,
            "  - [a](https://a.dev)\n    spans two lines"
        );
        assert_eq!(
            items[0].formatted_markdown,
            "[a](https://a.dev) spans two lines"
        );
    }

    #[test]
    fn nested_list_lines_are_separate_items() {
        let items = parse("- [a](https://a.dev)\n  - [b](https://b.dev)\n1. [c](https://c.dev)\n");
        let formatted: Vec<_> = items.iter().map(|i| i.formatted_markdown.as_str()).collect();
        assert_eq!(
            formatted,
            vec!["[a](https://a.dev)", "[b](https://b.dev)", "[c](https://c.dev)"]
        );
    }

    #[test]
    fn fenced_code_is_ignored() {
        let doc = "```\n- not an item\n```\n~~~md\n- still not\n~~~\n- [real](https://r.dev)\n";
        let items = parse(doc);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].formatted_markdown, "[real](https://r.dev)");
    }

    #[test]
    fn table_of_contents_is_dropped() {
        let doc = "## Contents\n- [Tools](#tools)\n- [Books](#books)\n## Tools\n- [a](https://a.dev)\n";
        let items = parse(doc);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].category, "Tools");
    }

    #[test]
    fn thematic_break_is_not_an_item() {
        let items = parse("- [a](https://a.dev)\n* * *\n---\n");
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn relative_links_resolve_against_document_directory() {
        let items = ListParser::new()
            .parse(
                b"- [guide](../guide.md) and [root](/LICENSE)\n",
                &ctx("docs/sub/list.md"),
                &CachedStars::default(),
            )
            .expect("parse");
        assert_eq!(
            items[0].formatted_markdown,
            "[guide](https://github.com/owner/list/blob/main/docs/guide.md) and \
             [root](https://github.com/owner/list/blob/main/LICENSE)"
        );
    }

    #[test]
    fn relative_link_keeps_fragment_and_escapes() {
        let items = ListParser::new()
            .parse(
                b"- [usage](./guide.md#usage) and [space](a%20b.md)\n",
                &ctx("docs/list.md"),
                &CachedStars::default(),
            )
            .expect("parse");
        assert_eq!(
            items[0].formatted_markdown,
            "[usage](https://github.com/owner/list/blob/main/docs/guide.md#usage) and \
             [space](https://github.com/owner/list/blob/main/docs/a%20b.md)"
        );
    }

    #[test]
    fn unknown_branch_falls_back_to_head() {
        let context = FileContext::new(FileRef::new("owner/list", "README.md"), None);
        let items = ListParser::new()
            .parse(b"- [x](x.md)\n", &context, &CachedStars::default())
            .expect("parse");
        assert_eq!(
            items[0].formatted_markdown,
            "[x](https://github.com/owner/list/blob/HEAD/x.md)"
        );
    }

    #[test]
    fn cached_stars_annotate_formatted_but_not_raw() {
        let mut stars = CachedStars::default();
        stars.insert(
            "tokio-rs/tokio",
            CachedRepo {
                stars: 25000,
                description: None,
                default_branch: None,
                checked_at: Utc::now(),
            },
        );
        let doc = "- [tokio](https://github.com/tokio-rs/tokio) - Runtime.\n";
        let with = ListParser::new()
            .parse(doc.as_bytes(), &ctx("README.md"), &stars)
            .expect("parse");
        let without = parse(doc);
        assert_eq!(with[0].raw_markdown, without[0].raw_markdown);
        assert!(with[0].formatted_markdown.ends_with(" ⭐ 25000"));
        assert!(!without[0].formatted_markdown.contains('⭐'));
    }

    #[test]
    fn own_repository_links_are_not_annotated() {
        let mut stars = CachedStars::default();
        stars.insert(
            "owner/list",
            CachedRepo {
                stars: 9,
                description: None,
                default_branch: None,
                checked_at: Utc::now(),
            },
        );
        let items = ListParser::new()
            .parse(b"- [contributing](CONTRIBUTING.md)\n", &ctx("README.md"), &stars)
            .expect("parse");
        assert!(!items[0].formatted_markdown.contains('⭐'));
    }

    #[test]
    fn invalid_utf8_is_an_error() {
        let err = ListParser::new()
            .parse(&[0x2d, 0x20, 0xff, 0xfe], &ctx("README.md"), &CachedStars::default())
            .unwrap_err();
        assert!(err.to_string().contains("owner/list/README.md"));
    }
}
