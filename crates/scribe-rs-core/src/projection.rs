//! Pure views over a record snapshot: ordering, counts, filtering and
//! dashboard summaries.

use scribe_rs_protocol::{Category, ParseCategoryError, Record, RecordStatus};
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Characters of an id shown in compact listings.
pub const SHORT_ID_LEN: usize = 6;

/// Display order: `created_at` descending, ties broken by id ascending.
pub fn sort_newest_first(records: &mut [Record]) {
    records.sort_by(|a, b| {
        Reverse(a.created_at)
            .cmp(&Reverse(b.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Record count per status, every status present.
pub fn counts_by_status(records: &[Record]) -> BTreeMap<RecordStatus, usize> {
    let mut counts: BTreeMap<RecordStatus, usize> =
        RecordStatus::ALL.iter().map(|status| (*status, 0)).collect();
    for record in records {
        *counts.entry(record.status).or_default() += 1;
    }
    counts
}

/// Record count per category, every category present.
pub fn counts_by_category(records: &[Record]) -> BTreeMap<Category, usize> {
    let mut counts: BTreeMap<Category, usize> =
        Category::ALL.iter().map(|category| (*category, 0)).collect();
    for record in records {
        *counts.entry(record.category).or_default() += 1;
    }
    counts
}

/// Category restriction applied by `filter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn matches(self, category: Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(wanted) => wanted == category,
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => f.write_str("all"),
            CategoryFilter::Only(category) => write!(f, "{category}"),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = ParseCategoryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.trim().eq_ignore_ascii_case("all") {
            return Ok(CategoryFilter::All);
        }
        value.parse().map(CategoryFilter::Only)
    }
}

/// Records whose owner id or id contains `search` (case-insensitive) and
/// whose category passes `category`. Input order is kept.
pub fn filter(records: &[Record], search: &str, category: CategoryFilter) -> Vec<Record> {
    let needle = search.to_lowercase();
    records
        .iter()
        .filter(|record| category.matches(record.category))
        .filter(|record| {
            needle.is_empty()
                || record.owner_id.to_lowercase().contains(&needle)
                || record.id.as_str().to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}

/// The first `n` records of an already ordered snapshot.
pub fn recent(records: &[Record], n: usize) -> &[Record] {
    &records[..n.min(records.len())]
}

/// Share of records in one status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusShare {
    pub status: RecordStatus,
    pub count: usize,
    /// 0.0 to 100.0; zero for an empty snapshot.
    pub percent: f64,
}

pub fn status_shares(records: &[Record]) -> Vec<StatusShare> {
    let total = records.len();
    counts_by_status(records)
        .into_iter()
        .map(|(status, count)| StatusShare {
            status,
            count,
            percent: if total == 0 {
                0.0
            } else {
                count as f64 * 100.0 / total as f64
            },
        })
        .collect()
}

/// Headline numbers for a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Dashboard {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
    pub failed: usize,
}

impl Dashboard {
    pub fn from_records(records: &[Record]) -> Self {
        let counts = counts_by_status(records);
        let count = |status| counts.get(&status).copied().unwrap_or_default();
        Self {
            total: records.len(),
            pending: count(RecordStatus::Pending),
            completed: count(RecordStatus::Completed),
            failed: count(RecordStatus::Failed),
        }
    }
}

/// Truncate a ciphertext token for display.
pub fn payload_preview(payload: &str, max_chars: usize) -> String {
    if payload.chars().count() <= max_chars {
        return payload.to_string();
    }
    let head: String = payload.chars().take(max_chars).collect();
    format!("{head}...")
}

/// Leading characters of an id for compact listings.
pub fn short_id(record: &Record) -> &str {
    let id = record.id.as_str();
    match id.char_indices().nth(SHORT_ID_LEN) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

/// Whether `account` may start analysis of `record`: it must be pending and
/// owned by the account (case-insensitive).
pub fn can_analyze(record: &Record, account: Option<&str>) -> bool {
    let Some(account) = account else {
        return false;
    };
    record.status == RecordStatus::Pending && record.owner_id.eq_ignore_ascii_case(account)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use scribe_rs_protocol::RecordId;

    fn record(id: &str, created_at: i64, owner: &str, category: Category) -> Record {
        Record::pending(RecordId::new(id), "FHE-WRITING-x", created_at, owner, category)
    }

    fn ids(records: &[Record]) -> Vec<&str> {
        records.iter().map(|record| record.id.as_str()).collect()
    }

    #[test]
    fn newest_first_with_id_tiebreak() {
        let mut records = vec![
            record("a", 100, "x", Category::Low),
            record("b", 300, "x", Category::Low),
            record("d", 200, "x", Category::Low),
            record("c", 200, "x", Category::Low),
        ];
        sort_newest_first(&mut records);
        assert_eq!(ids(&records), vec!["b", "c", "d", "a"]);
    }

    #[test]
    fn filters_by_search_and_category() {
        let records = vec![
            record("1", 3, "alice", Category::Low),
            record("2", 2, "bob", Category::High),
            record("3", 1, "ALIson", Category::High),
        ];
        assert_eq!(ids(&filter(&records, "ali", CategoryFilter::All)), vec!["1", "3"]);
        assert_eq!(
            ids(&filter(&records, "", CategoryFilter::Only(Category::High))),
            vec!["2", "3"]
        );
        assert_eq!(
            ids(&filter(&records, "ali", CategoryFilter::Only(Category::High))),
            vec!["3"]
        );
        assert_eq!(ids(&filter(&records, "2", CategoryFilter::All)), vec!["2"]);
    }

    #[test]
    fn category_filter_parses_all_and_names() {
        assert_eq!("ALL".parse::<CategoryFilter>(), Ok(CategoryFilter::All));
        assert_eq!(
            "hard".parse::<CategoryFilter>(),
            Ok(CategoryFilter::Only(Category::High))
        );
        assert!("nope".parse::<CategoryFilter>().is_err());
    }

    #[test]
    fn counts_include_empty_buckets() {
        let mut done = record("1", 1, "a", Category::Medium);
        done.status = RecordStatus::Completed;
        done.result = Some("r".to_string());
        let records = vec![done, record("2", 2, "a", Category::Medium)];

        let by_status = counts_by_status(&records);
        assert_eq!(by_status[&RecordStatus::Pending], 1);
        assert_eq!(by_status[&RecordStatus::Completed], 1);
        assert_eq!(by_status[&RecordStatus::Failed], 0);

        let by_category = counts_by_category(&records);
        assert_eq!(by_category[&Category::Medium], 2);
        assert_eq!(by_category[&Category::Low], 0);

        assert_eq!(
            Dashboard::from_records(&records),
            Dashboard {
                total: 2,
                pending: 1,
                completed: 1,
                failed: 0
            }
        );
    }

    #[test]
    fn shares_are_zero_on_empty_snapshot() {
        let shares = status_shares(&[]);
        assert_eq!(shares.len(), 3);
        assert!(shares.iter().all(|share| share.percent == 0.0));

        let records = vec![
            record("1", 1, "a", Category::Low),
            record("2", 1, "a", Category::Low),
        ];
        let pending = status_shares(&records)
            .into_iter()
            .find(|share| share.status == RecordStatus::Pending)
            .expect("pending share");
        assert_eq!(pending.percent, 100.0);
    }

    #[test]
    fn previews_and_short_ids_truncate() {
        assert_eq!(payload_preview("FHE-WRITING-abcdef", 12), "FHE-WRITING-...");
        assert_eq!(payload_preview("short", 12), "short");
        assert_eq!(short_id(&record("1700000000000-abc", 1, "a", Category::Low)), "170000");
        assert_eq!(short_id(&record("abc", 1, "a", Category::Low)), "abc");
    }

    #[test]
    fn recent_caps_at_snapshot_length() {
        let records = vec![record("1", 1, "a", Category::Low)];
        assert_eq!(recent(&records, 5).len(), 1);
        assert_eq!(recent(&records, 0).len(), 0);
    }

    #[test]
    fn only_the_pending_owner_can_analyze() {
        let mine = record("1", 1, "0xAbC", Category::Low);
        assert!(can_analyze(&mine, Some("0xabc")));
        assert!(!can_analyze(&mine, Some("0xdef")));
        assert!(!can_analyze(&mine, None));
        let mut done = mine.clone();
        done.status = RecordStatus::Failed;
        assert!(!can_analyze(&done, Some("0xabc")));
    }
}
