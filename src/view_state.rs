use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::trace;

use crate::domain::TVError;
use crate::record::{Field, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterField {
    EntityType,
    LegalName,
    DbaName,
    LegalNameContains,
}

impl FilterField {
    pub const ALL: [FilterField; 4] = [
        FilterField::EntityType,
        FilterField::LegalName,
        FilterField::DbaName,
        FilterField::LegalNameContains,
    ];

    pub fn field(&self) -> Field {
        match self {
            FilterField::EntityType => Field::EntityType,
            FilterField::LegalName | FilterField::LegalNameContains => Field::LegalName,
            FilterField::DbaName => Field::DbaName,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FilterField::EntityType => "Entity",
            FilterField::LegalName => "Legal name",
            FilterField::DbaName => "DBA name",
            FilterField::LegalNameContains => "Legal name ~",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortField {
    CreatedDt,
    ModifiedDt,
    LegalName,
}

impl SortField {
    pub fn field(&self) -> Field {
        match self {
            SortField::CreatedDt => Field::CreatedDt,
            SortField::ModifiedDt => Field::DataSourceModifiedDt,
            SortField::LegalName => Field::LegalName,
        }
    }

    pub fn from_field(field: Field) -> Option<SortField> {
        match field {
            Field::CreatedDt => Some(SortField::CreatedDt),
            Field::DataSourceModifiedDt => Some(SortField::ModifiedDt),
            Field::LegalName => Some(SortField::LegalName),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "▲",
            SortDirection::Descending => "▼",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        SortSpec {
            field: SortField::CreatedDt,
            direction: SortDirection::Ascending,
        }
    }
}

/// Rows per page. Only the sizes offered by the pager are representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageSize {
    Five,
    #[default]
    Ten,
    Fifteen,
}

impl PageSize {
    pub const ALL: [PageSize; 3] = [PageSize::Five, PageSize::Ten, PageSize::Fifteen];

    pub fn rows(&self) -> usize {
        match self {
            PageSize::Five => 5,
            PageSize::Ten => 10,
            PageSize::Fifteen => 15,
        }
    }

    pub fn next(&self) -> PageSize {
        match self {
            PageSize::Five => PageSize::Ten,
            PageSize::Ten => PageSize::Fifteen,
            PageSize::Fifteen => PageSize::Five,
        }
    }
}

impl TryFrom<usize> for PageSize {
    type Error = TVError;

    fn try_from(rows: usize) -> Result<Self, Self::Error> {
        PageSize::ALL
            .into_iter()
            .find(|size| size.rows() == rows)
            .ok_or(TVError::InvalidPageSize(rows))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    entity_type: String,
    legal_name: String,
    dba_name: String,
    legal_name_contains: String,
}

impl Filters {
    pub fn get(&self, field: FilterField) -> &str {
        match field {
            FilterField::EntityType => &self.entity_type,
            FilterField::LegalName => &self.legal_name,
            FilterField::DbaName => &self.dba_name,
            FilterField::LegalNameContains => &self.legal_name_contains,
        }
    }

    fn get_mut(&mut self, field: FilterField) -> &mut String {
        match field {
            FilterField::EntityType => &mut self.entity_type,
            FilterField::LegalName => &mut self.legal_name,
            FilterField::DbaName => &mut self.dba_name,
            FilterField::LegalNameContains => &mut self.legal_name_contains,
        }
    }

    /// Active filters as `(field, value)` pairs.
    pub fn active(&self) -> Vec<(FilterField, &str)> {
        FilterField::ALL
            .iter()
            .map(|&f| (f, self.get(f)))
            .filter(|(_, v)| !v.is_empty())
            .collect()
    }

    fn predicate(&self) -> Predicate<'_> {
        Predicate {
            entity_type: &self.entity_type,
            legal_name: &self.legal_name,
            dba_name: &self.dba_name,
            contains: self.legal_name_contains.to_lowercase(),
        }
    }
}

// Conjunction of all active filters, with the substring term lowered once.
struct Predicate<'a> {
    entity_type: &'a str,
    legal_name: &'a str,
    dba_name: &'a str,
    contains: String,
}

impl Predicate<'_> {
    fn matches(&self, record: &Record) -> bool {
        (self.entity_type.is_empty() || record.entity_type == self.entity_type)
            && (self.legal_name.is_empty() || record.legal_name == self.legal_name)
            && (self.dba_name.is_empty() || record.dba_name == self.dba_name)
            && (self.contains.is_empty()
                || record.legal_name.to_lowercase().contains(&self.contains))
    }
}

/// Pagination metadata for the pager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub total: usize,
    pub page: usize,
    pub page_size: PageSize,
}

impl Pagination {
    pub fn page_count(&self) -> usize {
        self.total.div_ceil(self.page_size.rows())
    }

    pub fn last_page(&self) -> usize {
        self.page_count().saturating_sub(1)
    }

    /// 1-based number of the first row on the page, 0 when the page is empty.
    pub fn first_row(&self) -> usize {
        let start = self.page.saturating_mul(self.page_size.rows());
        if start < self.total { start + 1 } else { 0 }
    }

    /// 1-based number of the last row on the page, 0 when the page is empty.
    pub fn last_row(&self) -> usize {
        match self.first_row() {
            0 => 0,
            first => std::cmp::min(first - 1 + self.page_size.rows(), self.total),
        }
    }
}

/// Text ordering used for sorting: case-insensitive first, lowercase before
/// uppercase when two values differ only in case.
pub fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}

/// Filter, sort and page state over an immutable record set.
///
/// The derived row mapping holds indices into the record set in filtered and
/// sorted order. It is rebuilt on every mutation so reads are plain slices.
/// Until the first `set_sort` rows stay in dataset order.
#[derive(Debug, Clone)]
pub struct ViewState {
    records: Arc<Vec<Record>>,
    filters: Filters,
    sort: Option<SortSpec>,
    page: usize,
    page_size: PageSize,
    rows: Vec<usize>,
}

impl ViewState {
    pub fn new(records: Arc<Vec<Record>>, page_size: PageSize) -> Self {
        let mut state = ViewState {
            records,
            filters: Filters::default(),
            sort: None,
            page: 0,
            page_size,
            rows: Vec::new(),
        };
        state.recompute();
        state
    }

    pub fn set_filter(&mut self, field: FilterField, value: impl Into<String>) {
        let value = value.into();
        let current = self.filters.get_mut(field);
        if *current == value {
            return;
        }
        trace!("Filter {:?}: {:?} -> {:?}", field, current, value);
        *current = value;
        self.page = 0;
        self.recompute();
    }

    pub fn clear_filters(&mut self) {
        self.filters = Filters::default();
        self.page = 0;
        self.recompute();
    }

    pub fn set_sort(&mut self, field: SortField) {
        let sort = match self.sort {
            Some(current) if current.field == field => SortSpec {
                field,
                direction: current.direction.toggled(),
            },
            _ => SortSpec {
                field,
                direction: SortDirection::Ascending,
            },
        };
        self.sort = Some(sort);
        trace!("Sort: {:?}", self.sort);
        self.page = 0;
        self.recompute();
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page;
    }

    pub fn set_page_size(&mut self, page_size: PageSize) {
        self.page_size = page_size;
        self.page = 0;
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    /// Sort shown in the header. Before any `set_sort` this is the default
    /// created date ascending indicator over rows in dataset order.
    pub fn sort(&self) -> SortSpec {
        self.sort.unwrap_or_default()
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    pub fn pagination(&self) -> Pagination {
        Pagination {
            total: self.rows.len(),
            page: self.page,
            page_size: self.page_size,
        }
    }

    /// All records passing the filters, in sort order.
    pub fn filtered(&self) -> impl Iterator<Item = &Record> {
        self.rows.iter().map(|&idx| &self.records[idx])
    }

    /// Records on the current page. Empty when the page is out of range.
    pub fn visible(&self) -> Vec<&Record> {
        let size = self.page_size.rows();
        let begin = std::cmp::min(self.page.saturating_mul(size), self.rows.len());
        let end = std::cmp::min(begin + size, self.rows.len());
        self.rows[begin..end]
            .iter()
            .map(|&idx| &self.records[idx])
            .collect()
    }

    /// Distinct values of `field` over the whole record set with their counts,
    /// most frequent first.
    pub fn distinct_values(&self, field: Field) -> Vec<(String, usize)> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for record in self.records.iter() {
            *counts.entry(record.get(field)).or_insert(0) += 1;
        }
        let mut values: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(value, count)| (value.to_string(), count))
            .collect();
        values.sort_by(|(va, ca), (vb, cb)| cb.cmp(ca).then_with(|| compare_text(va, vb)));
        values
    }

    fn recompute(&mut self) {
        let predicate = self.filters.predicate();
        let records = &self.records;
        let mut rows: Vec<usize> = (0..records.len())
            .into_par_iter()
            .filter(|&idx| predicate.matches(&records[idx]))
            .collect();

        if let Some(sort) = self.sort {
            let field = sort.field.field();
            let descending = sort.direction == SortDirection::Descending;
            rows.par_sort_by(|&a, &b| {
                let ord = compare_text(records[a].get(field), records[b].get(field));
                if descending { ord.reverse() } else { ord }
            });
        }

        trace!("Recomputed view: {} of {} rows", rows.len(), records.len());
        self.rows = rows;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(legal_name: &str, created_dt: &str, entity_type: &str) -> Record {
        Record {
            legal_name: legal_name.to_string(),
            created_dt: created_dt.to_string(),
            entity_type: entity_type.to_string(),
            ..Default::default()
        }
    }

    fn names(records: &[&Record]) -> Vec<String> {
        records.iter().map(|r| r.legal_name.clone()).collect()
    }

    fn scenario() -> ViewState {
        ViewState::new(
            Arc::new(vec![
                record("Best Freight", "2023-01-01T00:00:00Z", "Broker"),
                record("Acme Trucking", "2022-01-01T00:00:00Z", "Carrier"),
            ]),
            PageSize::Ten,
        )
    }

    fn fleet(n: usize) -> ViewState {
        let records = (0..n)
            .map(|i| {
                let mut r = record(
                    &format!("Carrier {i:03}"),
                    &format!("2020-01-{:02}T00:00:00Z", (i % 28) + 1),
                    if i % 3 == 0 { "Broker" } else { "Carrier" },
                );
                r.dba_name = format!("DBA {}", i % 4);
                r.data_source_modified_dt = format!("2024-02-{:02}T00:00:00Z", 28 - (i % 28));
                r
            })
            .collect();
        ViewState::new(Arc::new(records), PageSize::Five)
    }

    #[test]
    fn initial_view_keeps_dataset_order() {
        let view = scenario();
        assert_eq!(view.sort(), SortSpec::default());
        assert_eq!(names(&view.visible()), ["Best Freight", "Acme Trucking"]);
    }

    #[test]
    fn entity_filter_selects_carrier() {
        let mut view = scenario();
        view.set_filter(FilterField::EntityType, "Carrier");
        assert_eq!(names(&view.visible()), ["Acme Trucking"]);

        view.set_filter(FilterField::EntityType, "");
        assert_eq!(view.visible().len(), 2);
    }

    #[test]
    fn sorting_same_field_twice_reverses() {
        let mut view = scenario();
        view.set_sort(SortField::CreatedDt);
        assert_eq!(view.sort().direction, SortDirection::Ascending);
        let first = names(&view.visible());
        assert_eq!(first, ["Acme Trucking", "Best Freight"]);

        view.set_sort(SortField::CreatedDt);
        assert_eq!(view.sort().direction, SortDirection::Descending);
        let mut second = names(&view.visible());
        assert_eq!(second, ["Best Freight", "Acme Trucking"]);
        second.reverse();
        assert_eq!(first, second);
    }

    #[test]
    fn new_sort_field_starts_ascending() {
        let mut view = scenario();
        view.set_sort(SortField::CreatedDt);
        view.set_sort(SortField::LegalName);
        assert_eq!(
            view.sort(),
            SortSpec {
                field: SortField::LegalName,
                direction: SortDirection::Ascending
            }
        );
        assert_eq!(names(&view.visible()), ["Acme Trucking", "Best Freight"]);
    }

    #[test]
    fn contains_filter_is_case_insensitive() {
        let mut view = ViewState::new(
            Arc::new(vec![
                record("ACME", "1", "Carrier"),
                record("Best Freight", "2", "Carrier"),
                record("Grace Lines", "3", "Carrier"),
            ]),
            PageSize::Ten,
        );
        view.set_filter(FilterField::LegalNameContains, "acm");
        assert_eq!(names(&view.visible()), ["ACME"]);

        view.set_filter(FilterField::LegalNameContains, "ace");
        assert_eq!(names(&view.visible()), ["Grace Lines"]);

        view.set_filter(FilterField::LegalNameContains, "AC");
        assert_eq!(names(&view.visible()), ["ACME", "Grace Lines"]);
    }

    #[test]
    fn filters_are_combined_with_and() {
        let mut view = fleet(40);
        view.set_filter(FilterField::EntityType, "Broker");
        view.set_filter(FilterField::DbaName, "DBA 0");
        view.set_filter(FilterField::LegalNameContains, "carrier 0");

        let filtered: Vec<&Record> = view.filtered().collect();
        assert!(!filtered.is_empty());
        for r in &filtered {
            assert_eq!(r.entity_type, "Broker");
            assert_eq!(r.dba_name, "DBA 0");
            assert!(r.legal_name.to_lowercase().contains("carrier 0"));
        }
        let expected = view
            .records()
            .iter()
            .filter(|r| {
                r.entity_type == "Broker"
                    && r.dba_name == "DBA 0"
                    && r.legal_name.to_lowercase().contains("carrier 0")
            })
            .count();
        assert_eq!(filtered.len(), expected);
    }

    #[test]
    fn exact_legal_name_filter() {
        let mut view = fleet(12);
        view.set_filter(FilterField::LegalName, "Carrier 007");
        assert_eq!(names(&view.visible()), ["Carrier 007"]);
        view.set_filter(FilterField::LegalName, "Carrier 7");
        assert!(view.visible().is_empty());
    }

    #[test]
    fn pages_reconstruct_filtered_set() {
        let mut view = fleet(23);
        view.set_sort(SortField::ModifiedDt);
        let filtered: Vec<Record> = view.filtered().cloned().collect();
        let pages = view.pagination().page_count();
        assert_eq!(pages, 5);

        let mut collected = Vec::new();
        for page in 0..pages {
            view.set_page(page);
            let visible = view.visible();
            assert!(visible.len() <= view.page_size().rows());
            collected.extend(visible.into_iter().cloned());
        }
        assert_eq!(collected, filtered);
    }

    #[test]
    fn page_beyond_last_is_empty() {
        let mut view = fleet(7);
        view.set_page(1);
        assert_eq!(view.visible().len(), 2);
        view.set_page(2);
        assert!(view.visible().is_empty());
        view.set_page(usize::MAX);
        assert!(view.visible().is_empty());
        assert_eq!(view.pagination().first_row(), 0);
    }

    #[test]
    fn page_size_change_resets_page() {
        let mut view = fleet(30);
        view.set_page(3);
        view.set_page_size(PageSize::Fifteen);
        assert_eq!(view.page(), 0);
        assert_eq!(view.visible().len(), 15);
    }

    #[test]
    fn filter_and_sort_changes_reset_page() {
        let mut view = fleet(30);
        view.set_page(4);
        view.set_filter(FilterField::EntityType, "Carrier");
        assert_eq!(view.page(), 0);

        view.set_page(2);
        view.set_sort(SortField::LegalName);
        assert_eq!(view.page(), 0);

        view.set_page(2);
        view.clear_filters();
        assert_eq!(view.page(), 0);
    }

    #[test]
    fn unchanged_filter_keeps_page() {
        let mut view = fleet(30);
        view.set_filter(FilterField::EntityType, "Carrier");
        view.set_page(1);
        view.set_filter(FilterField::EntityType, "Carrier");
        assert_eq!(view.page(), 1);
    }

    #[test]
    fn sorting_does_not_touch_records() {
        let mut view = fleet(10);
        let before: Vec<Record> = view.records().to_vec();
        view.set_sort(SortField::LegalName);
        view.set_sort(SortField::LegalName);
        view.set_filter(FilterField::EntityType, "Broker");
        assert_eq!(view.records(), before.as_slice());

        view.clear_filters();
        view.set_sort(SortField::CreatedDt);
        let again: Vec<Record> = view.filtered().cloned().collect();
        view.set_sort(SortField::LegalName);
        view.set_sort(SortField::CreatedDt);
        let third: Vec<Record> = view.filtered().cloned().collect();
        assert_eq!(again, third);
    }

    #[test]
    fn text_ordering_ignores_case_first() {
        assert_eq!(compare_text("apple", "Banana"), Ordering::Less);
        assert_eq!(compare_text("a", "A"), Ordering::Less);
        assert_eq!(compare_text("same", "same"), Ordering::Equal);
        assert_eq!(
            compare_text("2022-01-01T00:00:00Z", "2023-01-01T00:00:00Z"),
            Ordering::Less
        );
    }

    #[test]
    fn pagination_metadata() {
        let mut view = fleet(23);
        let p = view.pagination();
        assert_eq!((p.total, p.first_row(), p.last_row()), (23, 1, 5));
        view.set_page(4);
        let p = view.pagination();
        assert_eq!((p.first_row(), p.last_row(), p.last_page()), (21, 23, 4));
    }

    #[test]
    fn page_size_only_accepts_offered_sizes() {
        assert_eq!(PageSize::try_from(15).unwrap(), PageSize::Fifteen);
        assert!(matches!(
            PageSize::try_from(7),
            Err(TVError::InvalidPageSize(7))
        ));
        assert_eq!(PageSize::Fifteen.next(), PageSize::Five);
    }

    #[test]
    fn distinct_values_most_frequent_first() {
        let view = fleet(9);
        let values = view.distinct_values(Field::EntityType);
        assert_eq!(
            values,
            vec![("Carrier".to_string(), 6), ("Broker".to_string(), 3)]
        );
    }

    #[test]
    fn empty_dataset_has_no_pages() {
        let view = ViewState::new(Arc::new(Vec::new()), PageSize::Ten);
        assert!(view.visible().is_empty());
        assert_eq!(view.pagination().page_count(), 0);
        assert_eq!(view.pagination().last_page(), 0);
    }
}
