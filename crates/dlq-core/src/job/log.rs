//! Bounded per-job output log.

use std::collections::VecDeque;

/// Maximum number of output lines kept per job.
pub const MAX_LOG_LINES: usize = 500;

/// Ring of the most recent output lines; the oldest line is evicted first.
#[derive(Debug, Clone, Default)]
pub struct LogBuffer {
    lines: VecDeque<String>,
}

impl LogBuffer {
    pub fn push(&mut self, line: impl Into<String>) {
        if self.lines.len() == MAX_LOG_LINES {
            self.lines.pop_front();
        }
        self.lines.push_back(line.into());
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_first_and_keeps_order() {
        let mut log = LogBuffer::default();
        for i in 0..MAX_LOG_LINES + 25 {
            log.push(format!("line {i}"));
        }
        assert_eq!(log.len(), MAX_LOG_LINES);
        let lines = log.to_vec();
        assert_eq!(lines.first().map(String::as_str), Some("line 25"));
        assert_eq!(lines.last().map(String::as_str), Some("line 524"));
        assert!(lines.windows(2).all(|w| {
            let a: usize = w[0][5..].parse().unwrap();
            let b: usize = w[1][5..].parse().unwrap();
            b == a + 1
        }));
    }

    #[test]
    fn clear_empties() {
        let mut log = LogBuffer::default();
        log.push("a");
        log.clear();
        assert!(log.is_empty());
    }
}
