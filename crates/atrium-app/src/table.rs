// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::Hash;
use time::OffsetDateTime;

use crate::SortDirection;
use crate::model::format_timestamp;

pub const DEFAULT_PAGE_SIZE: PageSize = PageSize::Rows(5);
pub const AVAILABLE_PAGE_SIZES: [PageSize; 4] = [
    PageSize::Rows(5),
    PageSize::Rows(10),
    PageSize::Rows(20),
    PageSize::All,
];

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Integer(i64),
    Timestamp(OffsetDateTime),
}

impl CellValue {
    pub fn display(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(value) => value.clone(),
            Self::Integer(value) => value.to_string(),
            Self::Timestamp(value) => format_timestamp(*value),
        }
    }

    fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    fn cmp_value(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Integer(left), Self::Integer(right)) => left.cmp(right),
            (Self::Timestamp(left), Self::Timestamp(right)) => left.cmp(right),
            (Self::Text(left), Self::Text(right)) => left
                .to_lowercase()
                .cmp(&right.to_lowercase())
                .then_with(|| left.cmp(right)),
            _ => self
                .display()
                .to_lowercase()
                .cmp(&other.display().to_lowercase()),
        }
    }
}

pub trait TableRow {
    type Key: Clone + Eq + Ord + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static;

    fn row_key(&self) -> Self::Key;

    fn cell(&self, accessor: &str) -> CellValue;
}

/// Declarative column description. Display-only columns (selection
/// checkbox, row actions) carry no accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub id: &'static str,
    pub header: &'static str,
    pub accessor: Option<&'static str>,
    pub sortable: bool,
    pub hidable: bool,
}

impl ColumnDef {
    pub const fn data(id: &'static str, header: &'static str) -> Self {
        Self {
            id,
            header,
            accessor: Some(id),
            sortable: true,
            hidable: true,
        }
    }

    pub const fn display(id: &'static str, header: &'static str) -> Self {
        Self {
            id,
            header,
            accessor: None,
            sortable: false,
            hidable: false,
        }
    }
}

pub const SELECT_COLUMN: &str = "select";
pub const ACTION_COLUMN: &str = "action";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnFilter {
    pub column: String,
    pub value: String,
}

pub type ColumnFilters = Vec<ColumnFilter>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub column: String,
    pub direction: SortDirection,
}

pub type SortingState = Vec<SortSpec>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSize {
    Rows(usize),
    All,
}

impl PageSize {
    pub fn label(self) -> String {
        match self {
            Self::Rows(rows) => rows.to_string(),
            Self::All => "All".to_owned(),
        }
    }

    pub fn next(self) -> Self {
        let index = AVAILABLE_PAGE_SIZES
            .iter()
            .position(|size| *size == self)
            .map_or(0, |index| (index + 1) % AVAILABLE_PAGE_SIZES.len());
        AVAILABLE_PAGE_SIZES[index]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationState {
    pub page_index: usize,
    pub page_size: PageSize,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self {
            page_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Columns absent from the map are visible.
pub type ColumnVisibility = BTreeMap<String, bool>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    Checked,
    Indeterminate,
    Unchecked,
}

/// Raw text input event from a filter box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextInputEvent {
    value: String,
}

impl TextInputEvent {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

pub fn page_count(row_count: usize, page_size: PageSize) -> usize {
    match page_size {
        PageSize::All => 1,
        PageSize::Rows(0) => 0,
        PageSize::Rows(size) => row_count.div_ceil(size),
    }
}

pub fn filter_rows<'a, R: TableRow>(
    rows: impl IntoIterator<Item = &'a R>,
    columns: &[ColumnDef],
    filters: &[ColumnFilter],
) -> Vec<&'a R>
where
    R: 'a,
{
    let active = filters
        .iter()
        .filter(|filter| !filter.value.is_empty())
        .filter_map(|filter| {
            let accessor = columns
                .iter()
                .find(|column| column.id == filter.column)
                .and_then(|column| column.accessor)?;
            Some((accessor, filter.value.to_lowercase()))
        })
        .collect::<Vec<_>>();

    rows.into_iter()
        .filter(|row| {
            active.iter().all(|(accessor, needle)| {
                row.cell(accessor)
                    .display()
                    .to_lowercase()
                    .contains(needle.as_str())
            })
        })
        .collect()
}

pub fn sort_rows<R: TableRow>(rows: &mut [&R], columns: &[ColumnDef], sorting: &[SortSpec]) {
    let specs = sorting
        .iter()
        .filter_map(|sort| {
            let column = columns.iter().find(|column| column.id == sort.column)?;
            if !column.sortable {
                return None;
            }
            Some((column.accessor?, sort.direction))
        })
        .collect::<Vec<_>>();
    if specs.is_empty() {
        return;
    }

    // slice::sort_by is stable, so ties keep source order.
    rows.sort_by(|left, right| {
        for (accessor, direction) in &specs {
            let left_value = left.cell(accessor);
            let right_value = right.cell(accessor);
            let order = match (left_value.is_empty(), right_value.is_empty()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => match direction {
                    SortDirection::Asc => left_value.cmp_value(&right_value),
                    SortDirection::Desc => left_value.cmp_value(&right_value).reverse(),
                },
            };
            if order != Ordering::Equal {
                return order;
            }
        }
        Ordering::Equal
    });
}

pub fn paginate<T>(rows: &[T], pagination: PaginationState) -> &[T] {
    match pagination.page_size {
        PageSize::All => rows,
        PageSize::Rows(size) => {
            let start = pagination.page_index.saturating_mul(size).min(rows.len());
            let end = start.saturating_add(size).min(rows.len());
            &rows[start..end]
        }
    }
}

/// Filtered, sorted and paginated projection of the table's data.
#[derive(Debug)]
pub struct TableView<'a, R: TableRow> {
    pub rows: Vec<&'a R>,
    pub page: Vec<&'a R>,
    pub page_index: usize,
    pub page_count: usize,
}

impl<R: TableRow> TableView<'_, R> {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Generic client-side table state over a snapshot of rows.
#[derive(Debug, Clone)]
pub struct TableEngine<R: TableRow> {
    columns: Vec<ColumnDef>,
    data: Vec<R>,
    filters: ColumnFilters,
    sorting: SortingState,
    pagination: PaginationState,
    visibility: ColumnVisibility,
    selection: BTreeSet<R::Key>,
}

impl<R: TableRow> TableEngine<R> {
    pub fn new(columns: Vec<ColumnDef>) -> Self {
        Self {
            columns,
            data: Vec::new(),
            filters: Vec::new(),
            sorting: Vec::new(),
            pagination: PaginationState::default(),
            visibility: BTreeMap::new(),
            selection: BTreeSet::new(),
        }
    }

    pub fn with_page_size(mut self, page_size: PageSize) -> Self {
        self.pagination.page_size = page_size;
        self
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn column(&self, id: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|column| column.id == id)
    }

    pub fn data(&self) -> &[R] {
        &self.data
    }

    pub fn set_data(&mut self, data: Vec<R>) {
        let keys = data.iter().map(|row| row.row_key()).collect::<BTreeSet<_>>();
        self.selection.retain(|key| keys.contains(key));
        self.data = data;
        self.clamp_page_index();
    }

    pub fn filters(&self) -> &ColumnFilters {
        &self.filters
    }

    pub fn sorting(&self) -> &SortingState {
        &self.sorting
    }

    pub fn pagination(&self) -> PaginationState {
        self.pagination
    }

    pub fn visibility(&self) -> &ColumnVisibility {
        &self.visibility
    }

    pub fn update_filters(&mut self, update: impl FnOnce(&ColumnFilters) -> ColumnFilters) {
        self.filters = update(&self.filters);
        self.clamp_page_index();
    }

    pub fn set_filters(&mut self, filters: ColumnFilters) {
        self.update_filters(move |_| filters);
    }

    pub fn update_sorting(&mut self, update: impl FnOnce(&SortingState) -> SortingState) {
        self.sorting = update(&self.sorting);
    }

    pub fn set_sorting(&mut self, sorting: SortingState) {
        self.update_sorting(move |_| sorting);
    }

    pub fn update_pagination(
        &mut self,
        update: impl FnOnce(&PaginationState) -> PaginationState,
    ) {
        let next = update(&self.pagination);
        let page_size = match next.page_size {
            PageSize::Rows(0) => self.pagination.page_size,
            size => size,
        };
        self.pagination = PaginationState {
            page_index: next.page_index,
            page_size,
        };
        self.clamp_page_index();
    }

    pub fn set_pagination(&mut self, pagination: PaginationState) {
        self.update_pagination(move |_| pagination);
    }

    pub fn update_visibility(
        &mut self,
        update: impl FnOnce(&ColumnVisibility) -> ColumnVisibility,
    ) {
        self.visibility = update(&self.visibility);
    }

    pub fn set_visibility(&mut self, visibility: ColumnVisibility) {
        self.update_visibility(move |_| visibility);
    }

    pub fn filter_value(&self, column: &str) -> &str {
        self.filters
            .iter()
            .find(|filter| filter.column == column)
            .map_or("", |filter| filter.value.as_str())
    }

    /// Sets a column filter verbatim; an empty value removes it.
    pub fn set_filter_value(&mut self, column: &str, value: &str) {
        let column = column.to_owned();
        let value = value.to_owned();
        self.update_filters(move |filters| {
            let mut next = filters
                .iter()
                .filter(|filter| filter.column != column)
                .cloned()
                .collect::<Vec<_>>();
            if !value.is_empty() {
                let position = filters
                    .iter()
                    .position(|filter| filter.column == column)
                    .unwrap_or(next.len())
                    .min(next.len());
                next.insert(position, ColumnFilter { column, value });
            }
            next
        });
    }

    pub fn filter_changed(&mut self, event: &TextInputEvent, column: &str) {
        if self.column(column).is_none() {
            return;
        }
        self.set_filter_value(column, event.value());
    }

    pub fn sort_direction(&self, column: &str) -> Option<SortDirection> {
        self.sorting
            .iter()
            .find(|sort| sort.column == column)
            .map(|sort| sort.direction)
    }

    /// Cycles a column through none, asc, desc. Without `multi` the other
    /// sorts are dropped.
    pub fn cycle_sort(&mut self, column: &str, multi: bool) -> Option<SortDirection> {
        if !self.column(column).is_some_and(|def| def.sortable) {
            return None;
        }
        let next = match self.sort_direction(column) {
            None => Some(SortDirection::Asc),
            Some(SortDirection::Asc) => Some(SortDirection::Desc),
            Some(SortDirection::Desc) => None,
        };
        let column = column.to_owned();
        self.update_sorting(|sorting| {
            let mut kept = if multi {
                sorting.clone()
            } else {
                sorting
                    .iter()
                    .filter(|sort| sort.column == column)
                    .cloned()
                    .collect()
            };
            match next {
                Some(direction) => {
                    if let Some(existing) = kept.iter_mut().find(|sort| sort.column == column) {
                        existing.direction = direction;
                    } else {
                        kept.push(SortSpec { column, direction });
                    }
                }
                None => kept.retain(|sort| sort.column != column),
            }
            kept
        });
        next
    }

    pub fn clear_sorting(&mut self) {
        self.set_sorting(Vec::new());
    }

    pub fn view(&self) -> TableView<'_, R> {
        let mut rows = filter_rows(&self.data, &self.columns, &self.filters);
        sort_rows(&mut rows, &self.columns, &self.sorting);
        let page_count = page_count(rows.len(), self.pagination.page_size);
        let page_index = self
            .pagination
            .page_index
            .min(page_count.saturating_sub(1));
        let page = paginate(
            &rows,
            PaginationState {
                page_index,
                page_size: self.pagination.page_size,
            },
        )
        .to_vec();
        TableView {
            rows,
            page,
            page_index,
            page_count,
        }
    }

    pub fn row_count(&self) -> usize {
        filter_rows(&self.data, &self.columns, &self.filters).len()
    }

    pub fn page_count(&self) -> usize {
        page_count(self.row_count(), self.pagination.page_size)
    }

    pub fn set_page_index(&mut self, page_index: usize) {
        self.update_pagination(|pagination| PaginationState {
            page_index,
            ..*pagination
        });
    }

    pub fn set_page_size(&mut self, page_size: PageSize) {
        self.update_pagination(|_| PaginationState {
            page_index: 0,
            page_size,
        });
    }

    pub fn can_previous_page(&self) -> bool {
        self.pagination.page_index > 0
    }

    pub fn can_next_page(&self) -> bool {
        self.pagination.page_index + 1 < self.page_count()
    }

    pub fn first_page(&mut self) {
        self.set_page_index(0);
    }

    pub fn previous_page(&mut self) {
        self.set_page_index(self.pagination.page_index.saturating_sub(1));
    }

    pub fn next_page(&mut self) {
        if self.can_next_page() {
            self.set_page_index(self.pagination.page_index + 1);
        }
    }

    pub fn last_page(&mut self) {
        self.set_page_index(self.page_count().saturating_sub(1));
    }

    fn clamp_page_index(&mut self) {
        let last = self.page_count().saturating_sub(1);
        if self.pagination.page_index > last {
            self.pagination.page_index = last;
        }
    }

    pub fn is_column_visible(&self, id: &str) -> bool {
        self.visibility.get(id).copied().unwrap_or(true)
    }

    pub fn hidable_columns(&self) -> Vec<&ColumnDef> {
        self.columns.iter().filter(|column| column.hidable).collect()
    }

    pub fn visible_columns(&self) -> Vec<&ColumnDef> {
        self.columns
            .iter()
            .filter(|column| self.is_column_visible(column.id))
            .collect()
    }

    /// Returns the new visibility, or `None` when the column may not be hidden.
    pub fn toggle_column_visibility(&mut self, id: &str) -> Option<bool> {
        if !self.column(id).is_some_and(|column| column.hidable) {
            return None;
        }
        let visible = !self.is_column_visible(id);
        let id = id.to_owned();
        self.update_visibility(|current| {
            let mut next = current.clone();
            next.insert(id, visible);
            next
        });
        Some(visible)
    }

    pub fn selection(&self) -> &BTreeSet<R::Key> {
        &self.selection
    }

    pub fn is_selected(&self, key: &R::Key) -> bool {
        self.selection.contains(key)
    }

    pub fn toggle_row_selected(&mut self, key: &R::Key) -> bool {
        if self.selection.remove(key) {
            return false;
        }
        if self.data.iter().any(|row| row.row_key() == *key) {
            self.selection.insert(key.clone());
            return true;
        }
        false
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn selected_count(&self) -> usize {
        self.selection.len()
    }

    pub fn selected_rows(&self) -> Vec<&R> {
        self.data
            .iter()
            .filter(|row| self.selection.contains(&row.row_key()))
            .collect()
    }

    pub fn header_selection(&self) -> CheckState {
        let rows = filter_rows(&self.data, &self.columns, &self.filters);
        let selected = rows
            .iter()
            .filter(|row| self.selection.contains(&row.row_key()))
            .count();
        if selected == 0 {
            CheckState::Unchecked
        } else if selected == rows.len() {
            CheckState::Checked
        } else {
            CheckState::Indeterminate
        }
    }

    /// Acts on every row passing the current filters, not only the visible page.
    pub fn toggle_all_rows_selected(&mut self) {
        let keys = filter_rows(&self.data, &self.columns, &self.filters)
            .into_iter()
            .map(|row| row.row_key())
            .collect::<Vec<_>>();
        if self.header_selection() == CheckState::Checked {
            for key in &keys {
                self.selection.remove(key);
            }
        } else {
            self.selection.extend(keys);
        }
    }
}
