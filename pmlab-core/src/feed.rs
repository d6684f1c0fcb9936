//! Feed: the abstract historical-data source the engine pulls from.
//!
//! Grounded in the teacher's `data::provider::DataProvider` trait and its
//! `DataError` enum, adapted from OHLCV bar fetches to a trade-tape read.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::domain::{Market, TradeEvent};

/// Structured error types for feed operations.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("I/O error reading feed: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed record at line {line}: {detail}")]
    MalformedRecord { line: usize, detail: String },

    #[error("timestamp at line {line} ({timestamp}) is not monotone nondecreasing")]
    NonMonotonicTimestamp { line: usize, timestamp: i64 },

    #[error("unknown platform tag: {tag}")]
    UnknownPlatform { tag: String },
}

/// Abstract feed: markets are read once at startup, trades are a lazy,
/// timestamp-sorted, non-restartable sequence.
pub trait Feed {
    fn markets(&mut self) -> Result<Vec<Market>, FeedError>;

    fn trades(&mut self) -> Result<Box<dyn Iterator<Item = Result<TradeEvent, FeedError>> + '_>, FeedError>;

    /// Count of trades, for progress reporting; may be approximate.
    fn trade_count(&self) -> Option<usize>;
}

/// One newline-delimited JSON record. `kind` tags which variant follows,
/// mirroring the teacher's `DataSource::CsvImport` as the file-import
/// analog (not a production market-data pipeline).
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum JsonlRecord {
    Market(Market),
    Trade(TradeEvent),
}

/// Reads a newline-delimited JSON file of tagged market/trade records.
pub struct JsonlFeed {
    path: std::path::PathBuf,
    trade_count_hint: Option<usize>,
}

impl JsonlFeed {
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            trade_count_hint: None,
        }
    }

    fn open_reader(&self) -> Result<BufReader<File>, FeedError> {
        Ok(BufReader::new(File::open(&self.path)?))
    }
}

impl Feed for JsonlFeed {
    fn markets(&mut self) -> Result<Vec<Market>, FeedError> {
        let reader = self.open_reader()?;
        let mut markets = Vec::new();
        let mut trade_count = 0usize;
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: JsonlRecord =
                serde_json::from_str(&line).map_err(|e| FeedError::MalformedRecord {
                    line: idx + 1,
                    detail: e.to_string(),
                })?;
            match record {
                JsonlRecord::Market(m) => markets.push(m),
                JsonlRecord::Trade(_) => trade_count += 1,
            }
        }
        self.trade_count_hint = Some(trade_count);
        Ok(markets)
    }

    fn trades(&mut self) -> Result<Box<dyn Iterator<Item = Result<TradeEvent, FeedError>> + '_>, FeedError> {
        let reader = self.open_reader()?;
        let mut last_ts = i64::MIN;
        let iter = reader.lines().enumerate().filter_map(move |(idx, line)| {
            let line = match line {
                Ok(l) => l,
                Err(e) => return Some(Err(FeedError::from(e))),
            };
            if line.trim().is_empty() {
                return None;
            }
            let record: JsonlRecord = match serde_json::from_str(&line) {
                Ok(r) => r,
                Err(e) => {
                    return Some(Err(FeedError::MalformedRecord {
                        line: idx + 1,
                        detail: e.to_string(),
                    }))
                }
            };
            match record {
                JsonlRecord::Trade(t) => {
                    if t.timestamp < last_ts {
                        return Some(Err(FeedError::NonMonotonicTimestamp {
                            line: idx + 1,
                            timestamp: t.timestamp,
                        }));
                    }
                    last_ts = t.timestamp;
                    Some(Ok(t))
                }
                JsonlRecord::Market(_) => None,
            }
        });
        Ok(Box::new(iter))
    }

    fn trade_count(&self) -> Option<usize> {
        self.trade_count_hint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_fixture(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "{contents}").unwrap();
        f
    }

    #[test]
    fn reads_markets_and_trades() {
        let fixture = write_fixture(
            "{\"kind\":\"market\",\"id\":\"M1\",\"platform\":\"Kalshi\",\"open_ts\":0,\"close_ts\":100,\"resolution\":\"Unresolved\",\"tick_size\":0.01}\n\
             {\"kind\":\"trade\",\"market_id\":\"M1\",\"timestamp\":1,\"price\":0.2,\"size\":5.0,\"taker_side\":\"TakerBoughtYes\"}\n",
        );
        let mut feed = JsonlFeed::open(fixture.path());
        let markets = feed.markets().unwrap();
        assert_eq!(markets.len(), 1);
        assert_eq!(feed.trade_count(), Some(1));

        let trades: Vec<_> = feed.trades().unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].market_id, "M1");
    }

    #[test]
    fn rejects_non_monotonic_trades() {
        let fixture = write_fixture(
            "{\"kind\":\"trade\",\"market_id\":\"M1\",\"timestamp\":5,\"price\":0.2,\"size\":5.0,\"taker_side\":\"TakerBoughtYes\"}\n\
             {\"kind\":\"trade\",\"market_id\":\"M1\",\"timestamp\":3,\"price\":0.2,\"size\":5.0,\"taker_side\":\"TakerBoughtYes\"}\n",
        );
        let mut feed = JsonlFeed::open(fixture.path());
        let result: Result<Vec<_>, _> = feed.trades().unwrap().collect();
        assert!(matches!(result, Err(FeedError::NonMonotonicTimestamp { .. })));
    }

    #[test]
    fn malformed_line_reports_line_number() {
        let fixture = write_fixture("not json\n");
        let mut feed = JsonlFeed::open(fixture.path());
        let err = feed.markets();
        assert!(matches!(err, Err(FeedError::MalformedRecord { line: 1, .. })));
    }
}
