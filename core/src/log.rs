//! Append-only, in-memory record of every accepted message.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::types::{Candidate, Message};

/// Ordered message store. Unbounded by default; with a capacity set it
/// behaves as a ring buffer that drops the oldest entries first.
#[derive(Debug, Default)]
pub struct MessageLog {
    messages: VecDeque<Message>,
    capacity: Option<usize>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` keeps every message for the lifetime of the process.
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        MessageLog {
            capacity: capacity.filter(|cap| *cap > 0),
            ..Self::default()
        }
    }

    /// Finalizes `candidate` with a fresh id and timestamp and stores it.
    pub fn append(&mut self, candidate: Candidate) -> Message {
        self.append_at(candidate, Utc::now())
    }

    fn append_at(&mut self, candidate: Candidate, now: DateTime<Utc>) -> Message {
        // wall clocks can step backwards; the log never does
        let timestamp = match self.last_timestamp {
            Some(last) if now < last => last,
            _ => now,
        };
        self.last_timestamp = Some(timestamp);

        let message = Message {
            id: Uuid::new_v4(),
            content: candidate.content,
            kind: candidate.kind,
            sender: candidate.sender,
            timestamp,
            file_name: candidate.file_name,
            file_size: candidate.file_size,
        };

        if let Some(cap) = self.capacity {
            while self.messages.len() >= cap {
                self.messages.pop_front();
            }
        }
        self.messages.push_back(message.clone());
        message
    }

    /// All stored messages, oldest first. Ties keep insertion order.
    pub fn snapshot(&self) -> Vec<Message> {
        let mut out: Vec<Message> = self.messages.iter().cloned().collect();
        out.sort_by_key(|m| m.timestamp);
        out
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
