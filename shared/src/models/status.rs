use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a donation campaign, in the order campaigns usually progress.
///
/// Nothing enforces that order: an administrator may move an event to any
/// status at any time. Records written by the legacy site stored the
/// localised label instead of the code, so both spellings are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    #[serde(alias = "发布募集")]
    Announced,
    #[serde(alias = "收集中")]
    Collecting,
    #[serde(alias = "已发货")]
    Shipped,
    #[serde(alias = "学校已签收")]
    Received,
    #[serde(alias = "反馈已发布")]
    Completed,
}

/// Icon and colour used to render a status marker on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBadge {
    pub code: EventStatus,
    pub label: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
    pub completed_style: bool,
}

impl EventStatus {
    pub const ALL: [EventStatus; 5] = [
        EventStatus::Announced,
        EventStatus::Collecting,
        EventStatus::Shipped,
        EventStatus::Received,
        EventStatus::Completed,
    ];

    /// True only while a donation-intake campaign is open. This is the sole
    /// predicate that decides whether a donate action is shown.
    pub fn is_collecting(self) -> bool {
        self == EventStatus::Collecting
    }

    pub fn label(self) -> &'static str {
        match self {
            EventStatus::Announced => "Announced",
            EventStatus::Collecting => "Collecting donations",
            EventStatus::Shipped => "Shipped",
            EventStatus::Received => "Received by school",
            EventStatus::Completed => "Feedback published",
        }
    }

    pub fn badge(self) -> StatusBadge {
        let (icon, color) = match self {
            EventStatus::Announced => ("calendar", "blue"),
            EventStatus::Collecting => ("package", "orange"),
            EventStatus::Shipped => ("truck", "indigo"),
            EventStatus::Received => ("check-circle", "green"),
            EventStatus::Completed => ("camera", "primary"),
        };
        StatusBadge {
            code: self,
            label: self.label(),
            icon,
            color,
            completed_style: self == EventStatus::Completed,
        }
    }

    /// Position in the usual campaign progression, starting at 0.
    pub fn stage(self) -> usize {
        self as usize
    }

    /// Whether moving to `next` goes back in the usual progression. Such a
    /// move is still allowed; callers only log it.
    pub fn is_regression_to(self, next: EventStatus) -> bool {
        next.stage() < self.stage()
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
