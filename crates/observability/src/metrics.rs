//! Stock movement metrics.
//!
//! The inventory ledger reports every committed sale or restock here, tagged
//! with the book's genre and author. Recording is fire-and-forget: sinks never
//! return errors and must not block on IO.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// The two distributions tracked per (genre, author).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum StockMetric {
    Sold,
    Restocked,
}

impl StockMetric {
    pub fn name(&self) -> &'static str {
        match self {
            StockMetric::Sold => "library.books.sold",
            StockMetric::Restocked => "library.books.restocked",
        }
    }
}

/// Sink for stock movement events.
pub trait StockMetrics: Send + Sync {
    fn record_sold(&self, genre: &str, author: &str, quantity: u64);
    fn record_restocked(&self, genre: &str, author: &str, quantity: u64);
}

impl<S> StockMetrics for Arc<S>
where
    S: StockMetrics + ?Sized,
{
    fn record_sold(&self, genre: &str, author: &str, quantity: u64) {
        (**self).record_sold(genre, author, quantity)
    }

    fn record_restocked(&self, genre: &str, author: &str, quantity: u64) {
        (**self).record_restocked(genre, author, quantity)
    }
}

/// Emits one structured `tracing` event per movement on target `shelfkeep::metrics`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingStockMetrics;

impl StockMetrics for TracingStockMetrics {
    fn record_sold(&self, genre: &str, author: &str, quantity: u64) {
        ::tracing::info!(
            target: "shelfkeep::metrics",
            metric = StockMetric::Sold.name(),
            genre,
            author,
            quantity,
            "books sold"
        );
    }

    fn record_restocked(&self, genre: &str, author: &str, quantity: u64) {
        ::tracing::info!(
            target: "shelfkeep::metrics",
            metric = StockMetric::Restocked.name(),
            genre,
            author,
            quantity,
            "books restocked"
        );
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStockMetrics;

impl StockMetrics for NoopStockMetrics {
    fn record_sold(&self, _genre: &str, _author: &str, _quantity: u64) {}

    fn record_restocked(&self, _genre: &str, _author: &str, _quantity: u64) {}
}

/// Distribution summary of recorded quantities.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Summary {
    pub count: u64,
    pub total: u64,
    pub max: u64,
}

impl Summary {
    fn record(&mut self, quantity: u64) {
        self.count += 1;
        self.total = self.total.saturating_add(quantity);
        self.max = self.max.max(quantity);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SeriesKey {
    metric: StockMetric,
    genre: String,
    author: String,
}

/// In-memory per-(metric, genre, author) summaries for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryStockMetrics {
    series: RwLock<HashMap<SeriesKey, Summary>>,
}

impl InMemoryStockMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(&self, metric: StockMetric, genre: &str, author: &str) -> Option<Summary> {
        let series = self.series.read().ok()?;
        series
            .get(&SeriesKey {
                metric,
                genre: genre.to_string(),
                author: author.to_string(),
            })
            .copied()
    }

    /// Sum over every (genre, author) series of one metric.
    pub fn total(&self, metric: StockMetric) -> Summary {
        let series = match self.series.read() {
            Ok(s) => s,
            Err(_) => return Summary::default(),
        };
        series
            .iter()
            .filter(|(k, _)| k.metric == metric)
            .fold(Summary::default(), |acc, (_, s)| Summary {
                count: acc.count + s.count,
                total: acc.total.saturating_add(s.total),
                max: acc.max.max(s.max),
            })
    }

    fn record(&self, metric: StockMetric, genre: &str, author: &str, quantity: u64) {
        if let Ok(mut series) = self.series.write() {
            series
                .entry(SeriesKey {
                    metric,
                    genre: genre.to_string(),
                    author: author.to_string(),
                })
                .or_default()
                .record(quantity);
        }
    }
}

impl StockMetrics for InMemoryStockMetrics {
    fn record_sold(&self, genre: &str, author: &str, quantity: u64) {
        self.record(StockMetric::Sold, genre, author, quantity);
    }

    fn record_restocked(&self, genre: &str, author: &str, quantity: u64) {
        self.record(StockMetric::Restocked, genre, author, quantity);
    }
}
