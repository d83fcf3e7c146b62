use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::ValuationRecord;
use super::duration::{compute_durations, ElapsedBreakdown};
use super::status::ValuationStatus;

/// Conjunctive equality filters. An unset field is no constraint; a record
/// whose raw status failed normalization never matches a concrete status
/// filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordFilters {
    pub status: Option<ValuationStatus>,
    pub city: Option<String>,
    pub bank_name: Option<String>,
    pub engineer_name: Option<String>,
}

impl RecordFilters {
    pub fn matches(&self, record: &ValuationRecord) -> bool {
        if let Some(status) = self.status {
            if record.status != Some(status) {
                return false;
            }
        }

        constraint_matches(self.city.as_deref(), record.city.as_deref())
            && constraint_matches(self.bank_name.as_deref(), record.bank_name.as_deref())
            && constraint_matches(self.engineer_name.as_deref(), record.engineer_name.as_deref())
    }
}

fn constraint_matches(wanted: Option<&str>, actual: Option<&str>) -> bool {
    match wanted {
        None => true,
        Some(wanted) => actual.map(str::trim) == Some(wanted.trim()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Duration,
    CreatedAt,
    DateTime,
    ClientName,
    City,
    BankName,
    EngineerName,
    Payment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub const fn flipped(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

/// One active sort field at a time. Re-selecting the active field flips the
/// order; selecting a new field resets to ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SortState {
    pub field: SortField,
    pub order: SortOrder,
}

impl Default for SortState {
    fn default() -> Self {
        SortState {
            field: SortField::CreatedAt,
            order: SortOrder::Desc,
        }
    }
}

impl SortState {
    pub fn toggle(&mut self, field: SortField) {
        if self.field == field {
            self.order = self.order.flipped();
        } else {
            self.field = field;
            self.order = SortOrder::Asc;
        }
    }
}

/// Per-status tallies over the full, unfiltered merged set. Records with an
/// unknown status land in no bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub pending: usize,
    pub on_progress: usize,
    pub approved: usize,
    pub rejected: usize,
    pub rework: usize,
}

impl StatusCounts {
    pub fn tally(records: &[ValuationRecord]) -> Self {
        let mut counts = StatusCounts::default();
        for record in records {
            match record.status {
                Some(ValuationStatus::Pending) => counts.pending += 1,
                Some(ValuationStatus::OnProgress) => counts.on_progress += 1,
                Some(ValuationStatus::Approved) => counts.approved += 1,
                Some(ValuationStatus::Rejected) => counts.rejected += 1,
                Some(ValuationStatus::Rework) => counts.rework += 1,
                None => {}
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.pending + self.on_progress + self.approved + self.rejected + self.rework
    }
}

/// One page of the merged, filtered, sorted view, plus the full-set counts
/// and duration map the header widgets need.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardPage {
    pub records: Vec<ValuationRecord>,
    pub total_matches: usize,
    pub page: usize,
    pub page_count: usize,
    pub page_size: usize,
    pub sort: SortState,
    pub counts: StatusCounts,
    pub durations: HashMap<String, ElapsedBreakdown>,
}

#[derive(Debug)]
struct DashboardInner {
    records: Arc<Vec<ValuationRecord>>,
    durations: Arc<HashMap<String, ElapsedBreakdown>>,
    filters: RecordFilters,
    sort: SortState,
    page: usize,
}

impl Default for DashboardInner {
    fn default() -> Self {
        DashboardInner {
            records: Arc::new(Vec::new()),
            durations: Arc::new(HashMap::new()),
            filters: RecordFilters::default(),
            sort: SortState::default(),
            page: 1,
        }
    }
}

/// Session-scoped container for the merged record set and its presentation
/// state. The record list and duration map are immutable snapshots swapped
/// wholesale on every recomputation, so concurrent readers never observe a
/// partially updated set.
#[derive(Debug)]
pub struct DashboardState {
    page_size: usize,
    inner: Mutex<DashboardInner>,
}

impl DashboardState {
    pub fn new(page_size: usize) -> Self {
        DashboardState {
            page_size: page_size.max(1),
            inner: Mutex::new(DashboardInner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DashboardInner> {
        self.inner.lock().expect("dashboard mutex poisoned")
    }

    /// Replaces the merged working set. A refresh that completes later than
    /// a newer one simply wins by swapping the snapshot again.
    pub fn replace_records(&self, records: Vec<ValuationRecord>, now: DateTime<Utc>) {
        let durations = compute_durations(&records, now);
        let mut inner = self.lock();
        inner.records = Arc::new(records);
        inner.durations = Arc::new(durations);
    }

    /// Changing any filter resets the view to the first page.
    pub fn set_filters(&self, filters: RecordFilters) {
        let mut inner = self.lock();
        if inner.filters != filters {
            inner.filters = filters;
            inner.page = 1;
        }
    }

    pub fn toggle_sort(&self, field: SortField) {
        self.lock().sort.toggle(field);
    }

    pub fn set_sort(&self, field: SortField, order: SortOrder) {
        self.lock().sort = SortState { field, order };
    }

    pub fn set_page(&self, page: usize) {
        self.lock().page = page.max(1);
    }

    pub fn refresh_durations(&self, now: DateTime<Utc>) {
        let mut inner = self.lock();
        let records = Arc::clone(&inner.records);
        inner.durations = Arc::new(compute_durations(&records, now));
    }

    /// The full merged set, unfiltered.
    pub fn records(&self) -> Arc<Vec<ValuationRecord>> {
        Arc::clone(&self.lock().records)
    }

    pub fn durations(&self) -> Arc<HashMap<String, ElapsedBreakdown>> {
        Arc::clone(&self.lock().durations)
    }

    pub fn counts(&self) -> StatusCounts {
        StatusCounts::tally(&self.lock().records)
    }

    /// Freshest known state of one record; the mutation path reads this
    /// immediately before writing so stale display input never gates a
    /// transition.
    pub fn find_record(&self, id: &str) -> Option<ValuationRecord> {
        let wanted = id.trim();
        if wanted.is_empty() {
            return None;
        }
        self.lock()
            .records
            .iter()
            .find(|record| record.dedup_key() == Some(wanted))
            .cloned()
    }

    /// Swaps a server-returned record into a fresh snapshot.
    pub fn adopt_record(&self, updated: ValuationRecord, now: DateTime<Utc>) {
        let Some(key) = updated.dedup_key().map(str::to_owned) else {
            return;
        };

        let mut inner = self.lock();
        let mut next: Vec<ValuationRecord> = inner.records.as_ref().clone();
        match next
            .iter_mut()
            .find(|record| record.dedup_key() == Some(key.as_str()))
        {
            Some(slot) => *slot = updated,
            None => next.push(updated),
        }
        inner.durations = Arc::new(compute_durations(&next, now));
        inner.records = Arc::new(next);
    }

    /// Filters, sorts, clamps the page into range, and slices the current
    /// view. The stable sort keeps merge order on ties.
    pub fn view(&self) -> DashboardPage {
        let inner = self.lock();
        let counts = StatusCounts::tally(&inner.records);

        let mut matches: Vec<&ValuationRecord> = inner
            .records
            .iter()
            .filter(|record| inner.filters.matches(record))
            .collect();
        matches.sort_by(|a, b| compare_records(a, b, inner.sort, &inner.durations));

        let total_matches = matches.len();
        let page_count = total_matches.div_ceil(self.page_size).max(1);
        let page = inner.page.clamp(1, page_count);
        let start = (page - 1) * self.page_size;

        DashboardPage {
            records: matches
                .into_iter()
                .skip(start)
                .take(self.page_size)
                .cloned()
                .collect(),
            total_matches,
            page,
            page_count,
            page_size: self.page_size,
            sort: inner.sort,
            counts,
            durations: inner.durations.as_ref().clone(),
        }
    }
}

/// Comparator for the single active sort field. Missing and unparsable
/// values sort last in both directions; durations are the exception and
/// compare as zero when absent.
fn compare_records(
    a: &ValuationRecord,
    b: &ValuationRecord,
    sort: SortState,
    durations: &HashMap<String, ElapsedBreakdown>,
) -> Ordering {
    match sort.field {
        SortField::Duration => directed(
            duration_seconds(a, durations).cmp(&duration_seconds(b, durations)),
            sort.order,
        ),
        SortField::CreatedAt => compare_missing_last(a.created_at, b.created_at, sort.order),
        SortField::DateTime => compare_missing_last(a.date_time, b.date_time, sort.order),
        SortField::ClientName => {
            compare_text(a.client_name.as_deref(), b.client_name.as_deref(), sort.order)
        }
        SortField::City => compare_text(a.city.as_deref(), b.city.as_deref(), sort.order),
        SortField::BankName => {
            compare_text(a.bank_name.as_deref(), b.bank_name.as_deref(), sort.order)
        }
        SortField::EngineerName => compare_text(
            a.engineer_name.as_deref(),
            b.engineer_name.as_deref(),
            sort.order,
        ),
        SortField::Payment => compare_payment(a.payment, b.payment, sort.order),
    }
}

fn duration_seconds(
    record: &ValuationRecord,
    durations: &HashMap<String, ElapsedBreakdown>,
) -> i64 {
    record
        .dedup_key()
        .and_then(|key| durations.get(key))
        .map(ElapsedBreakdown::total_seconds)
        .unwrap_or(0)
}

fn compare_missing_last<T: Ord>(a: Option<T>, b: Option<T>, order: SortOrder) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => directed(a.cmp(&b), order),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_text(a: Option<&str>, b: Option<&str>, order: SortOrder) -> Ordering {
    compare_missing_last(
        a.map(str::to_lowercase),
        b.map(str::to_lowercase),
        order,
    )
}

fn compare_payment(a: Option<f64>, b: Option<f64>, order: SortOrder) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => directed(a.partial_cmp(&b).unwrap_or(Ordering::Equal), order),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn directed(ordering: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}
