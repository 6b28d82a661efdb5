use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::models::{PostcardStatus, Subscriber};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostcardFilter {
    #[default]
    All,
    Pending,
    Sent,
}

impl PostcardFilter {
    pub fn matches(self, subscriber: &Subscriber) -> bool {
        if !subscriber.wants_postcard {
            return false;
        }
        match self {
            PostcardFilter::All => true,
            PostcardFilter::Pending => {
                subscriber.effective_postcard_status() == PostcardStatus::Pending
            }
            PostcardFilter::Sent => subscriber.effective_postcard_status() == PostcardStatus::Sent,
        }
    }
}

impl FromStr for PostcardFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ALL" => Ok(PostcardFilter::All),
            "PENDING" => Ok(PostcardFilter::Pending),
            "SENT" => Ok(PostcardFilter::Sent),
            other => Err(format!("Unknown postcard filter: {}", other)),
        }
    }
}

/// A subscriber in the postcard queue together with its position in the
/// full subscriber list, which is how status updates address it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostcardQueueEntry<'a> {
    pub index: usize,
    pub postcard_status: PostcardStatus,
    pub subscriber: &'a Subscriber,
}

pub fn filter_for_postcard_queue(
    subscribers: &[Subscriber],
    filter: PostcardFilter,
) -> Vec<PostcardQueueEntry<'_>> {
    subscribers
        .iter()
        .enumerate()
        .filter(|(_, s)| filter.matches(s))
        .map(|(index, subscriber)| PostcardQueueEntry {
            index,
            postcard_status: subscriber.effective_postcard_status(),
            subscriber,
        })
        .collect()
}
