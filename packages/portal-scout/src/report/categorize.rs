//! Keyword categories and status counts for the weekly digest.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::types::record::TicketRecord;

/// Weekly report category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    CustomerSupport,
    BugFixes,
    FeatureDevelopment,
    Meetings,
    Documentation,
    Other,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::CustomerSupport,
        Category::BugFixes,
        Category::FeatureDevelopment,
        Category::Meetings,
        Category::Documentation,
        Category::Other,
    ];

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            Category::CustomerSupport => &["客戶支援", "客服", "支援", "support", "customer"],
            Category::BugFixes => &["錯誤修復", "bug", "缺陷", "defect", "crash", "fix"],
            Category::FeatureDevelopment => &["功能開發", "新功能", "enhancement", "feature"],
            Category::Meetings => &["會議", "討論", "會議記錄", "meeting"],
            Category::Documentation => &["文件", "文檔", "documentation", "manual"],
            Category::Other => &[],
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Category::CustomerSupport => "Customer support",
            Category::BugFixes => "Bug fixes",
            Category::FeatureDevelopment => "Feature development",
            Category::Meetings => "Meetings",
            Category::Documentation => "Documentation",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// First category whose keywords appear in the title, content, or status.
pub fn categorize(record: &TicketRecord) -> Category {
    let haystack = format!("{} {} {}", record.title, record.content, record.status).to_lowercase();
    Category::ALL
        .into_iter()
        .find(|category| {
            category
                .keywords()
                .iter()
                .any(|keyword| haystack.contains(&keyword.to_lowercase()))
        })
        .unwrap_or(Category::Other)
}

/// Record count per category, every category present.
pub fn category_counts(records: &[TicketRecord]) -> BTreeMap<Category, usize> {
    let mut counts: BTreeMap<Category, usize> = Category::ALL.into_iter().map(|c| (c, 0)).collect();
    for record in records {
        *counts.entry(categorize(record)).or_default() += 1;
    }
    counts
}

/// Record count per raw status text; blank statuses count as "unknown".
pub fn status_counts(records: &[TicketRecord]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        let status = match record.status.trim() {
            "" => "unknown".to_string(),
            status => status.to_string(),
        };
        *counts.entry(status).or_default() += 1;
    }
    counts
}
