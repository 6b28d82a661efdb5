//! Derived views over the event list: calendar-quarter grouping, markdown
//! image extraction, preview text and the expand/carousel view state.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

static IMAGE_MARKDOWN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)]*)\)").expect("valid image regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    /// Maps a 1-based month to its quarter. Months past 12 clamp to Q4.
    pub fn from_month(month: u32) -> Self {
        match month {
            0..=3 => Quarter::Q1,
            4..=6 => Quarter::Q2,
            7..=9 => Quarter::Q3,
            _ => Quarter::Q4,
        }
    }

    pub fn number(self) -> u32 {
        self as u32 + 1
    }
}

pub fn quarter_of(date: NaiveDate) -> Quarter {
    Quarter::from_month(date.month())
}

/// Grouping key for the timeline. Orders by year, then quarter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuarterKey {
    pub year: i32,
    pub quarter: Quarter,
}

impl QuarterKey {
    pub fn of(date: NaiveDate) -> Self {
        QuarterKey {
            year: date.year(),
            quarter: quarter_of(date),
        }
    }

    /// Parses the `2024-Q3` form produced by `Display`.
    pub fn parse(label: &str) -> Option<Self> {
        let (year, quarter) = label.trim().split_once("-Q")?;
        let quarter = match quarter {
            "1" => Quarter::Q1,
            "2" => Quarter::Q2,
            "3" => Quarter::Q3,
            "4" => Quarter::Q4,
            _ => return None,
        };
        Some(QuarterKey {
            year: year.parse().ok()?,
            quarter,
        })
    }
}

impl fmt::Display for QuarterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-Q{}", self.year, self.quarter.number())
    }
}

impl Serialize for QuarterKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuarterBucket<T> {
    pub key: QuarterKey,
    pub items: Vec<T>,
}

/// Partitions `items` into quarter buckets, most recent quarter first.
/// Items keep their caller-supplied order inside a bucket.
pub fn group_by_quarter<T, I, F>(items: I, date_of: F) -> Vec<QuarterBucket<T>>
where
    I: IntoIterator<Item = T>,
    F: Fn(&T) -> NaiveDate,
{
    let mut buckets: BTreeMap<QuarterKey, Vec<T>> = BTreeMap::new();
    for item in items {
        let key = QuarterKey::of(date_of(&item));
        buckets.entry(key).or_default().push(item);
    }
    buckets
        .into_iter()
        .rev()
        .map(|(key, items)| QuarterBucket { key, items })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRef {
    pub alt: String,
    pub url: String,
}

/// All `![alt](url)` references in document order.
pub fn extract_images(markdown: &str) -> Vec<ImageRef> {
    IMAGE_MARKDOWN
        .captures_iter(markdown)
        .map(|caps| ImageRef {
            alt: caps[1].to_string(),
            url: caps[2].trim().to_string(),
        })
        .collect()
}

pub fn first_image(markdown: &str) -> Option<ImageRef> {
    IMAGE_MARKDOWN.captures(markdown).map(|caps| ImageRef {
        alt: caps[1].to_string(),
        url: caps[2].trim().to_string(),
    })
}

/// Removes every image reference and trims the result.
pub fn strip_images(markdown: &str) -> String {
    IMAGE_MARKDOWN.replace_all(markdown, "").trim().to_string()
}

/// Short preview of a description with images removed, cut to `max_chars`
/// characters. Returns `None` when nothing but images (or whitespace) remains.
pub fn preview_text(markdown: &str, max_chars: usize) -> Option<String> {
    let stripped = strip_images(markdown);
    if stripped.is_empty() {
        return None;
    }
    if stripped.chars().count() <= max_chars {
        return Some(stripped);
    }
    let cut: String = stripped.chars().take(max_chars).collect();
    Some(format!("{}…", cut.trim_end()))
}

/// Expand/collapse state for the timeline. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimelineView {
    expanded_events: HashSet<String>,
    expanded_quarters: HashSet<QuarterKey>,
}

impl TimelineView {
    /// Default state: the most recent quarter open, every event collapsed.
    pub fn new<'a, K>(keys: K) -> Self
    where
        K: IntoIterator<Item = &'a QuarterKey>,
    {
        let mut view = TimelineView::default();
        if let Some(latest) = keys.into_iter().max() {
            view.expanded_quarters.insert(*latest);
        }
        view
    }

    pub fn toggle_event(&mut self, id: &str) -> bool {
        if !self.expanded_events.remove(id) {
            self.expanded_events.insert(id.to_string());
            return true;
        }
        false
    }

    pub fn toggle_quarter(&mut self, key: QuarterKey) -> bool {
        if !self.expanded_quarters.remove(&key) {
            self.expanded_quarters.insert(key);
            return true;
        }
        false
    }

    pub fn is_event_expanded(&self, id: &str) -> bool {
        self.expanded_events.contains(id)
    }

    pub fn is_quarter_expanded(&self, key: &QuarterKey) -> bool {
        self.expanded_quarters.contains(key)
    }
}

/// Circular image carousel. Only built for a non-empty image list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Carousel {
    len: usize,
    index: usize,
}

impl Carousel {
    pub fn for_images<T>(images: &[T]) -> Option<Self> {
        if images.is_empty() {
            return None;
        }
        Some(Carousel {
            len: images.len(),
            index: 0,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn next(&mut self) -> usize {
        self.index = (self.index + 1) % self.len;
        self.index
    }

    pub fn previous(&mut self) -> usize {
        self.index = (self.index + self.len - 1) % self.len;
        self.index
    }

    /// Indicator selection. Out-of-range indices are ignored.
    pub fn jump_to(&mut self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        self.index = index;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn quarter_depends_only_on_month() {
        let expected = [
            Quarter::Q1,
            Quarter::Q1,
            Quarter::Q1,
            Quarter::Q2,
            Quarter::Q2,
            Quarter::Q2,
            Quarter::Q3,
            Quarter::Q3,
            Quarter::Q3,
            Quarter::Q4,
            Quarter::Q4,
            Quarter::Q4,
        ];
        for (i, q) in expected.iter().enumerate() {
            let month = i as u32 + 1;
            assert_eq!(quarter_of(date(2021, month, 1)), *q);
            assert_eq!(quarter_of(date(2030, month, 28)), *q);
        }
    }

    #[test]
    fn buckets_sorted_most_recent_first() {
        let dates = vec![
            date(2024, 2, 10),
            date(2024, 11, 1),
            date(2023, 12, 31),
            date(2024, 12, 5),
            date(2024, 1, 3),
        ];
        let buckets = group_by_quarter(dates, |d| *d);
        let keys: Vec<String> = buckets.iter().map(|b| b.key.to_string()).collect();
        assert_eq!(keys, vec!["2024-Q4", "2024-Q1", "2023-Q4"]);
        assert_eq!(buckets[0].items, vec![date(2024, 11, 1), date(2024, 12, 5)]);
        assert_eq!(buckets[1].items, vec![date(2024, 2, 10), date(2024, 1, 3)]);
        for pair in buckets.windows(2) {
            assert!(pair[0].key > pair[1].key);
        }
    }

    #[test]
    fn empty_input_has_no_buckets() {
        let buckets = group_by_quarter(Vec::<NaiveDate>::new(), |d| *d);
        assert!(buckets.is_empty());
    }

    #[test]
    fn quarter_key_label_parses_back() {
        let key = QuarterKey::of(date(2025, 8, 1));
        assert_eq!(QuarterKey::parse(&key.to_string()), Some(key));
        assert_eq!(QuarterKey::parse("2025-Q5"), None);
        assert_eq!(QuarterKey::parse("nope"), None);
    }

    #[test]
    fn plain_text_has_no_images() {
        assert!(extract_images("plain text").is_empty());
        assert!(first_image("plain text").is_none());
        assert_eq!(strip_images("  plain text \n"), "plain text");
    }

    #[test]
    fn extracts_images_in_order() {
        let md = "Intro ![one](https://img/1.jpg) middle\n\n![](https://img/2.png) end";
        let images = extract_images(md);
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].alt, "one");
        assert_eq!(images[0].url, "https://img/1.jpg");
        assert_eq!(images[1].url, "https://img/2.png");
        assert_eq!(first_image(md), Some(images[0].clone()));
    }

    #[test]
    fn strip_keeps_surrounding_text() {
        let md = "Before the trip.\n\n![bus](https://img/bus.jpg)\n\nAfter the trip.";
        let stripped = strip_images(md);
        assert!(!stripped.contains("!["));
        assert!(extract_images(&stripped).is_empty());
        let before = stripped.find("Before the trip.").unwrap();
        let after = stripped.find("After the trip.").unwrap();
        assert!(before < after);
    }

    #[test]
    fn preview_of_image_only_description_is_none() {
        assert_eq!(preview_text("\n![a](https://img/a.jpg)\n", 80), None);
        assert_eq!(preview_text("", 80), None);
    }

    #[test]
    fn preview_truncates_by_characters() {
        assert_eq!(preview_text("短文本", 10).as_deref(), Some("短文本"));
        assert_eq!(preview_text("abcdefghij", 4).as_deref(), Some("abcd…"));
    }

    #[test]
    fn view_defaults_to_latest_quarter_open() {
        let older = QuarterKey::of(date(2023, 5, 1));
        let latest = QuarterKey::of(date(2024, 7, 1));
        let mut view = TimelineView::new(&[older, latest]);
        assert!(view.is_quarter_expanded(&latest));
        assert!(!view.is_quarter_expanded(&older));
        assert!(!view.is_event_expanded("1"));

        assert!(view.toggle_event("1"));
        assert!(view.is_event_expanded("1"));
        assert!(!view.toggle_event("1"));
        assert!(!view.is_event_expanded("1"));

        assert!(!view.toggle_quarter(latest));
        assert!(view.toggle_quarter(older));
        assert!(view.is_quarter_expanded(&older));
    }

    #[test]
    fn carousel_wraps_both_ways() {
        let images = ["a", "b", "c"];
        let mut carousel = Carousel::for_images(&images).unwrap();
        assert_eq!(carousel.index(), 0);
        for _ in 0..images.len() {
            carousel.next();
        }
        assert_eq!(carousel.index(), 0);
        assert_eq!(carousel.previous(), 2);
        assert!(carousel.jump_to(1));
        assert_eq!(carousel.index(), 1);
        assert!(!carousel.jump_to(3));
        assert_eq!(carousel.index(), 1);
    }

    #[test]
    fn carousel_needs_images() {
        assert!(Carousel::for_images::<String>(&[]).is_none());
        let mut single = Carousel::for_images(&["only"]).unwrap();
        assert_eq!(single.next(), 0);
        assert_eq!(single.previous(), 0);
    }
}
