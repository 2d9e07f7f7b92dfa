//! Order-preserving log of recorded requests.

use crate::error::{Error, Result};
use crate::request::RecordedRequest;
use std::collections::VecDeque;
use std::fmt;

/// Query against the request log. `Shift` and `Pop` are the only mutating ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogQuery {
    First,
    Last,
    At(usize),
    Shift,
    Pop,
}

impl LogQuery {
    pub fn mutates(&self) -> bool {
        matches!(self, LogQuery::Shift | LogQuery::Pop)
    }
}

impl fmt::Display for LogQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogQuery::First => write!(f, "first"),
            LogQuery::Last => write!(f, "last"),
            LogQuery::At(index) => write!(f, "at({index})"),
            LogQuery::Shift => write!(f, "shift"),
            LogQuery::Pop => write!(f, "pop"),
        }
    }
}

#[derive(Debug, Default)]
pub struct RequestLog {
    entries: VecDeque<RecordedRequest>,
    /// Never reset, so sequence numbers stay unique for the life of the server.
    next_sequence: u64,
}

impl RequestLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `request`, stamping it with the next sequence number.
    pub fn append(&mut self, mut request: RecordedRequest) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        request.sequence = sequence;
        self.entries.push_back(request);
        sequence
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecordedRequest> {
        self.entries.iter()
    }

    fn out_of_range(&self, query: LogQuery) -> Error {
        Error::OutOfRange {
            query: query.to_string(),
            len: self.entries.len(),
        }
    }

    pub fn first(&self) -> Result<&RecordedRequest> {
        self.entries
            .front()
            .ok_or_else(|| self.out_of_range(LogQuery::First))
    }

    pub fn last(&self) -> Result<&RecordedRequest> {
        self.entries
            .back()
            .ok_or_else(|| self.out_of_range(LogQuery::Last))
    }

    pub fn at(&self, index: usize) -> Result<&RecordedRequest> {
        self.entries
            .get(index)
            .ok_or_else(|| self.out_of_range(LogQuery::At(index)))
    }

    pub fn shift(&mut self) -> Result<RecordedRequest> {
        match self.entries.pop_front() {
            Some(request) => Ok(request),
            None => Err(self.out_of_range(LogQuery::Shift)),
        }
    }

    pub fn pop(&mut self) -> Result<RecordedRequest> {
        match self.entries.pop_back() {
            Some(request) => Ok(request),
            None => Err(self.out_of_range(LogQuery::Pop)),
        }
    }

    pub fn query(&mut self, query: LogQuery) -> Result<RecordedRequest> {
        match query {
            LogQuery::First => self.first().cloned(),
            LogQuery::Last => self.last().cloned(),
            LogQuery::At(index) => self.at(index).cloned(),
            LogQuery::Shift => self.shift(),
            LogQuery::Pop => self.pop(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::sample_request;

    fn log_of(paths: &[&str]) -> RequestLog {
        let mut log = RequestLog::new();
        for path in paths {
            log.append(sample_request("GET", path, ""));
        }
        log
    }

    #[test]
    fn test_at_returns_receipt_order() {
        let paths = ["/a", "/b", "/c", "/d"];
        let log = log_of(&paths);
        for (i, path) in paths.iter().enumerate() {
            assert_eq!(log.at(i).unwrap().path, *path);
        }
        assert!(log.at(paths.len()).unwrap_err().is_out_of_range());
    }

    #[test]
    fn test_sequence_numbers_strictly_increase() {
        let mut log = log_of(&["/a", "/b"]);
        log.clear();
        log.append(sample_request("GET", "/c", ""));
        log.append(sample_request("GET", "/d", ""));
        let sequences: Vec<_> = log.iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![2, 3]);
    }

    #[test]
    fn test_peeks_do_not_mutate() {
        let mut log = log_of(&["/a", "/b", "/c"]);
        assert_eq!(log.query(LogQuery::First).unwrap().path, "/a");
        assert_eq!(log.query(LogQuery::Last).unwrap().path, "/c");
        assert_eq!(log.query(LogQuery::At(1)).unwrap().path, "/b");
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_shift_until_empty() {
        let mut log = log_of(&["/a", "/b", "/c"]);
        assert_eq!(log.shift().unwrap().path, "/a");
        assert_eq!(log.first().unwrap().path, "/b");
        log.shift().unwrap();
        log.shift().unwrap();
        assert!(log.is_empty());
        assert!(log.first().unwrap_err().is_out_of_range());
        assert!(log.shift().unwrap_err().is_out_of_range());
    }

    #[test]
    fn test_pop_is_symmetric_to_shift() {
        let mut log = log_of(&["/a", "/b", "/c"]);
        assert_eq!(log.pop().unwrap().path, "/c");
        assert_eq!(log.last().unwrap().path, "/b");
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_empty_log_errors_name_the_query() {
        let mut log = RequestLog::new();
        match log.query(LogQuery::At(0)) {
            Err(Error::OutOfRange { query, len }) => {
                assert_eq!(query, "at(0)");
                assert_eq!(len, 0);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(log.pop().unwrap_err().is_out_of_range());
        assert!(LogQuery::Pop.mutates());
        assert!(!LogQuery::Last.mutates());
    }
}
