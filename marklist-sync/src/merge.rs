//! Item diff and merge.
//!
//! Identity is the fingerprint of an item's raw markdown. Items whose raw
//! text survives keep their history (`updated_at` and buckets); presentation
//! fields are always refreshed from the latest parse. Items missing from the
//! latest parse are dropped. When a document repeats an item, the last
//! occurrence wins.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use marklist_core::bucket::{day_number, week_number};
use marklist_core::hash::fingerprint;
use marklist_core::{FileRef, FileStatus, Item, ItemMap};
use marklist_parser::DocItem;
use marklist_renderer::MarkdownRender;

/// Result of merging one parse into the stored item map.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub items: ItemMap,
    /// Candidates whose fingerprint was not in the stored map, duplicates
    /// included.
    pub new_count: usize,
    /// Candidates produced by the parser, duplicates included.
    pub total_count: usize,
    /// Latest `updated_at` among the merged items, `None` when nothing parsed.
    pub updated_at: Option<DateTime<Utc>>,
}

impl MergeOutcome {
    /// Document status implied by this merge.
    pub fn status(&self) -> FileStatus {
        if self.total_count == 0 {
            FileStatus::ParseFailed
        } else {
            FileStatus::Ok
        }
    }
}

pub fn merge_items(
    file: &FileRef,
    doc_items: Vec<DocItem>,
    existing: &ItemMap,
    renderer: &dyn MarkdownRender,
    now: DateTime<Utc>,
) -> MergeOutcome {
    let mut items = ItemMap::new();
    let mut category_html: HashMap<String, String> = HashMap::new();
    let mut new_count = 0;
    let mut updated_at: Option<DateTime<Utc>> = None;
    let total_count = doc_items.len();

    for doc_item in doc_items {
        let key = fingerprint(doc_item.raw_markdown.as_bytes());
        let category_rendered = category_html
            .entry(doc_item.category.clone())
            .or_insert_with(|| renderer.render(&doc_item.category))
            .clone();
        let html = renderer.render(&doc_item.formatted_markdown);

        let item = match existing.get(&key) {
            Some(stored) => Item {
                markdown: doc_item.formatted_markdown,
                html,
                category: doc_item.category,
                category_html: category_rendered,
                checked_at: now,
                ..stored.clone()
            },
            None => {
                new_count += 1;
                Item {
                    source_identifier: file.source_identifier.clone(),
                    file: file.file.clone(),
                    fingerprint: key.clone(),
                    markdown: doc_item.formatted_markdown,
                    html,
                    category: doc_item.category,
                    category_html: category_rendered,
                    updated_at: now,
                    checked_at: now,
                    updated_day: day_number(now),
                    updated_week: week_number(now),
                }
            }
        };

        updated_at = Some(match updated_at {
            Some(latest) => latest.max(item.updated_at),
            None => item.updated_at,
        });
        items.insert(key, item);
    }

    MergeOutcome {
        items,
        new_count,
        total_count,
        updated_at,
    }
}
