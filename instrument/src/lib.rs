//! Event capture for exchange runs.
//!
//! A `tracing` subscriber that turns every info-level event into one row of a
//! table named after the event's target (`order`, `trade`, `turn`, ...).
//! Columns appear the first time a field is seen; rows without that field
//! hold null.
//!
//! ```ignore
//! let (stats, events) = instrument::capture(|| simulation.run());
//! let trades = events.table("trade").map_or(0, |t| t.rows());
//! assert_eq!(trades as u64, stats.transactions);
//! ```

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Record};
use tracing::{Event, Id, Metadata, Subscriber};

// === COLUMNS ===

#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    U64(Vec<Option<u64>>),
    I64(Vec<Option<i64>>),
    F64(Vec<Option<f64>>),
    Bool(Vec<Option<bool>>),
    Str(Vec<Option<String>>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::U64(v) => v.len(),
            Column::I64(v) => v.len(),
            Column::F64(v) => v.len(),
            Column::Bool(v) => v.len(),
            Column::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push_null(&mut self) {
        match self {
            Column::U64(v) => v.push(None),
            Column::I64(v) => v.push(None),
            Column::F64(v) => v.push(None),
            Column::Bool(v) => v.push(None),
            Column::Str(v) => v.push(None),
        }
    }
}

/// Rows recorded under one target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventTable {
    columns: BTreeMap<String, Column>,
    rows: usize,
}

impl EventTable {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Non-null values of an unsigned column. Signed values that fit are
    /// included, since tracing picks the width from the emitting type.
    pub fn u64s(&self, name: &str) -> Vec<u64> {
        match self.columns.get(name) {
            Some(Column::U64(v)) => v.iter().flatten().copied().collect(),
            Some(Column::I64(v)) => v
                .iter()
                .flatten()
                .filter_map(|&x| u64::try_from(x).ok())
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn i64s(&self, name: &str) -> Vec<i64> {
        match self.columns.get(name) {
            Some(Column::I64(v)) => v.iter().flatten().copied().collect(),
            Some(Column::U64(v)) => v
                .iter()
                .flatten()
                .filter_map(|&x| i64::try_from(x).ok())
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn strs(&self, name: &str) -> Vec<&str> {
        match self.columns.get(name) {
            Some(Column::Str(v)) => v.iter().flatten().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Column slot for the row being written, created null-filled if new.
    fn slot(&mut self, name: &str, empty: impl FnOnce(usize) -> Column) -> &mut Column {
        let rows = self.rows;
        self.columns
            .entry(name.to_string())
            .or_insert_with(|| empty(rows))
    }

    /// Close the current row: any column that got no value gets a null.
    fn finish_row(&mut self) {
        self.rows += 1;
        for column in self.columns.values_mut() {
            while column.len() < self.rows {
                column.push_null();
            }
        }
    }
}

/// All tables captured so far, keyed by target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recorder {
    pub tables: HashMap<String, EventTable>,
}

impl Recorder {
    pub fn table(&self, target: &str) -> Option<&EventTable> {
        self.tables.get(target)
    }

    /// Row count of a target, zero when nothing was emitted under it.
    pub fn count(&self, target: &str) -> usize {
        self.table(target).map_or(0, EventTable::rows)
    }
}

thread_local! {
    static RECORDER: RefCell<Recorder> = RefCell::default();
}

// === SUBSCRIBER ===

struct RowVisitor<'a> {
    table: &'a mut EventTable,
}

impl Visit for RowVisitor<'_> {
    fn record_u64(&mut self, field: &Field, value: u64) {
        match self.table.slot(field.name(), |n| Column::U64(vec![None; n])) {
            Column::U64(v) => v.push(Some(value)),
            Column::I64(v) => v.push(i64::try_from(value).ok()),
            other => other.push_null(),
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        match self.table.slot(field.name(), |n| Column::I64(vec![None; n])) {
            Column::I64(v) => v.push(Some(value)),
            Column::U64(v) => v.push(u64::try_from(value).ok()),
            other => other.push_null(),
        }
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        match self.table.slot(field.name(), |n| Column::F64(vec![None; n])) {
            Column::F64(v) => v.push(Some(value)),
            other => other.push_null(),
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        match self.table.slot(field.name(), |n| Column::Bool(vec![None; n])) {
            Column::Bool(v) => v.push(Some(value)),
            other => other.push_null(),
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        match self.table.slot(field.name(), |n| Column::Str(vec![None; n])) {
            Column::Str(v) => v.push(Some(value.to_string())),
            other => other.push_null(),
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.record_str(field, &format!("{value:?}"));
    }
}

/// Collects info-level events into the thread-local [`Recorder`].
pub struct EventCollector;

impl Subscriber for EventCollector {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.is_event() && *metadata.level() <= tracing::Level::INFO
    }

    fn new_span(&self, _span: &Attributes<'_>) -> Id {
        Id::from_u64(1)
    }

    fn record(&self, _span: &Id, _values: &Record<'_>) {}

    fn record_follows_from(&self, _span: &Id, _follows: &Id) {}

    fn event(&self, event: &Event<'_>) {
        RECORDER.with(|r| {
            let mut recorder = r.borrow_mut();
            let table = recorder
                .tables
                .entry(event.metadata().target().to_string())
                .or_default();
            event.record(&mut RowVisitor { table: &mut *table });
            table.finish_row();
        });
    }

    fn enter(&self, _span: &Id) {}

    fn exit(&self, _span: &Id) {}
}

/// Install the collector process-wide. Later calls are ignored.
pub fn install_subscriber() {
    let _ = tracing::subscriber::set_global_default(EventCollector);
}

/// Take everything recorded on this thread.
pub fn drain() -> Recorder {
    RECORDER.with(|r| std::mem::take(&mut *r.borrow_mut()))
}

pub fn clear() {
    RECORDER.with(|r| *r.borrow_mut() = Recorder::default());
}

/// Run `f` with the collector as this thread's subscriber and return its
/// result together with the events it emitted.
pub fn capture<T>(f: impl FnOnce() -> T) -> (T, Recorder) {
    clear();
    let out = tracing::subscriber::with_default(EventCollector, f);
    (out, drain())
}

// === POLARS ===

use polars::prelude::*;

impl EventTable {
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let columns = self
            .columns
            .iter()
            .map(|(name, column)| match column {
                Column::U64(v) => polars::prelude::Column::new(name.as_str().into(), v),
                Column::I64(v) => polars::prelude::Column::new(name.as_str().into(), v),
                Column::F64(v) => polars::prelude::Column::new(name.as_str().into(), v),
                Column::Bool(v) => polars::prelude::Column::new(name.as_str().into(), v),
                Column::Str(v) => polars::prelude::Column::new(name.as_str().into(), v),
            })
            .collect();
        DataFrame::new(columns)
    }
}

impl Recorder {
    pub fn to_dataframes(&self) -> PolarsResult<HashMap<String, DataFrame>> {
        self.tables
            .iter()
            .map(|(name, table)| Ok((name.clone(), table.to_dataframe()?)))
            .collect()
    }

    /// Write every table to `{dir}/{target}.parquet`.
    pub fn write_parquet(&self, dir: &Path) -> PolarsResult<()> {
        std::fs::create_dir_all(dir)?;
        for (name, mut df) in self.to_dataframes()? {
            let file = std::fs::File::create(dir.join(format!("{name}.parquet")))?;
            ParquetWriter::new(file).finish(&mut df)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_become_rows_per_target() {
        let ((), recorder) = capture(|| {
            tracing::info!(target: "trade", turn = 1u32, price = 50i64, quantity = 3i64);
            tracing::info!(target: "trade", turn = 2u32, price = 55i64, quantity = 1i64);
            tracing::info!(target: "turn", turn = 2u32, symbol = "APL");
        });

        assert_eq!(recorder.count("trade"), 2);
        assert_eq!(recorder.count("turn"), 1);
        assert_eq!(recorder.count("order"), 0);

        let trades = recorder.table("trade").unwrap();
        assert_eq!(trades.u64s("turn"), vec![1, 2]);
        assert_eq!(trades.i64s("price"), vec![50, 55]);
        assert_eq!(recorder.table("turn").unwrap().strs("symbol"), vec!["APL"]);
    }

    #[test]
    fn missing_fields_are_null() {
        let ((), recorder) = capture(|| {
            tracing::info!(target: "cancel", order_id = 1u64);
            tracing::info!(target: "cancel", order_id = 2u64, released = 4i64);
            tracing::info!(target: "cancel", order_id = 3u64);
        });

        let table = recorder.table("cancel").unwrap();
        assert_eq!(table.rows(), 3);
        assert_eq!(
            table.column("released"),
            Some(&Column::I64(vec![None, Some(4), None]))
        );
        assert_eq!(table.column_names().collect::<Vec<_>>(), vec!["order_id", "released"]);
    }

    #[test]
    fn debug_events_are_ignored() {
        let ((), recorder) = capture(|| {
            tracing::debug!(target: "order", turn = 0u32, "order refused");
        });
        assert_eq!(recorder.count("order"), 0);
    }

    #[test]
    fn tables_convert_to_dataframes() {
        let ((), recorder) = capture(|| {
            tracing::info!(target: "reject", turn = 3u32, reason = %"buyer needs 100 but holds 10");
            tracing::info!(target: "reject", turn = 4u32);
        });

        let dfs = recorder.to_dataframes().unwrap();
        let df = &dfs["reject"];
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 2);
        assert_eq!(df.column("reason").unwrap().null_count(), 1);
    }
}
