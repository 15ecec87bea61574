use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use clap::ValueEnum;
use serde_json::{Map, Value};

use crate::error::SourceError;

/// One independent upstream record feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum Feed {
    Payments,
    Enrollments,
    Students,
    Teachers,
    Classes,
    Attendance,
    Exams,
    ExamMarks,
    Materials,
    Recordings,
}

impl Feed {
    pub const ALL: [Feed; 10] = [
        Feed::Payments,
        Feed::Enrollments,
        Feed::Students,
        Feed::Teachers,
        Feed::Classes,
        Feed::Attendance,
        Feed::Exams,
        Feed::ExamMarks,
        Feed::Materials,
        Feed::Recordings,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Feed::Payments => "payments",
            Feed::Enrollments => "enrollments",
            Feed::Students => "students",
            Feed::Teachers => "teachers",
            Feed::Classes => "classes",
            Feed::Attendance => "attendance",
            Feed::Exams => "exams",
            Feed::ExamMarks => "exam_marks",
            Feed::Materials => "materials",
            Feed::Recordings => "recordings",
        }
    }
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch(&self, feed: Feed) -> Result<Vec<Value>, SourceError>;
}

/// Reads `<dir>/<feed>.json` or, failing that, `<dir>/<feed>.csv`.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl RecordSource for DirectorySource {
    async fn fetch(&self, feed: Feed) -> Result<Vec<Value>, SourceError> {
        let json_path = self.dir.join(format!("{feed}.json"));
        if json_path.exists() {
            let content = read(&json_path).await?;
            return parse_json_records(feed, &content);
        }

        let csv_path = self.dir.join(format!("{feed}.csv"));
        if csv_path.exists() {
            let content = read(&csv_path).await?;
            return Ok(parse_csv_records(&content)?);
        }

        Err(SourceError::MissingFeed {
            feed: feed.to_string(),
            dir: self.dir.clone(),
        })
    }
}

async fn read(path: &Path) -> Result<String, SourceError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Accepts a bare array or an API envelope of the form `{"data": [...]}`.
pub fn parse_json_records(feed: Feed, content: &str) -> Result<Vec<Value>, SourceError> {
    match serde_json::from_str::<Value>(content)? {
        Value::Array(records) => Ok(records),
        Value::Object(mut envelope) => match envelope.remove("data") {
            Some(Value::Array(records)) => Ok(records),
            _ => Err(SourceError::NotAList {
                feed: feed.to_string(),
            }),
        },
        _ => Err(SourceError::NotAList {
            feed: feed.to_string(),
        }),
    }
}

pub fn parse_csv_records(content: &str) -> Result<Vec<Value>, csv::Error> {
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    let headers = reader.headers()?.clone();
    let mut records = Vec::new();

    for row in reader.records() {
        let row = row?;
        let object: Map<String, Value> = headers
            .iter()
            .zip(row.iter())
            .map(|(key, cell)| {
                let value = if cell.trim().is_empty() {
                    Value::Null
                } else {
                    Value::String(cell.to_string())
                };
                (key.trim().to_string(), value)
            })
            .collect();
        records.push(Value::Object(object));
    }

    Ok(records)
}

#[cfg(test)]
pub mod testing {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::*;

    #[derive(Default)]
    pub struct StaticSource {
        feeds: HashMap<Feed, Vec<Value>>,
        failing: Vec<Feed>,
        delays: HashMap<Feed, Duration>,
    }

    impl StaticSource {
        pub fn with(mut self, feed: Feed, records: Vec<Value>) -> Self {
            self.feeds.insert(feed, records);
            self
        }

        pub fn failing(mut self, feed: Feed) -> Self {
            self.failing.push(feed);
            self
        }

        pub fn delayed(mut self, feed: Feed, delay: Duration) -> Self {
            self.delays.insert(feed, delay);
            self
        }
    }

    #[async_trait]
    impl RecordSource for StaticSource {
        async fn fetch(&self, feed: Feed) -> Result<Vec<Value>, SourceError> {
            if let Some(delay) = self.delays.get(&feed) {
                tokio::time::sleep(*delay).await;
            }
            if self.failing.contains(&feed) {
                return Err(SourceError::NotAList {
                    feed: feed.to_string(),
                });
            }
            Ok(self.feeds.get(&feed).cloned().unwrap_or_default())
        }
    }
}
