// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Paginated, selectable table state shared by every resource screen.
//!
//! The table owns pagination and selection only. Rows are rebuilt from the
//! resource cache after each fetch and handed over through
//! [`TableState::replace_rows`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use std::ops::Range;

pub const DEFAULT_PAGE_SIZE: usize = 5;
pub const NO_DATA_LABEL: &str = "No data available";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Plain,
    Image,
    Progress,
    ActionIcon,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    /// Fixed vocabulary (status, role, priority) that renderers translate.
    Label(&'static str),
    Image(Option<String>),
    Progress(u8),
    Icon {
        icon: &'static str,
        tooltip: String,
    },
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn progress(percentage: u8) -> Self {
        Self::Progress(percentage.min(100))
    }

    pub fn display(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(value) => value.clone(),
            Self::Label(label) => (*label).to_owned(),
            Self::Image(Some(url)) => url.clone(),
            Self::Image(None) => String::new(),
            Self::Progress(percentage) => format!("{percentage}%"),
            Self::Icon { icon, .. } => (*icon).to_owned(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty | Self::Image(None) => true,
            Self::Text(value) => value.is_empty(),
            _ => false,
        }
    }

    fn searchable_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            Self::Label(label) => Some(label),
            Self::Icon { tooltip, .. } => Some(tooltip),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub key: &'static str,
    pub label: &'static str,
    pub render: RenderMode,
}

/// A column bound to an entity type; `value` projects one field.
pub struct Column<T> {
    pub key: &'static str,
    pub label: &'static str,
    pub render: RenderMode,
    pub value: fn(&T) -> CellValue,
}

impl<T> Clone for Column<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Column<T> {}

impl<T> Column<T> {
    pub const fn plain(key: &'static str, label: &'static str, value: fn(&T) -> CellValue) -> Self {
        Self {
            key,
            label,
            render: RenderMode::Plain,
            value,
        }
    }

    pub const fn image(key: &'static str, label: &'static str, value: fn(&T) -> CellValue) -> Self {
        Self {
            key,
            label,
            render: RenderMode::Image,
            value,
        }
    }

    pub const fn progress(
        key: &'static str,
        label: &'static str,
        value: fn(&T) -> CellValue,
    ) -> Self {
        Self {
            key,
            label,
            render: RenderMode::Progress,
            value,
        }
    }

    pub const fn action_icon(
        key: &'static str,
        label: &'static str,
        value: fn(&T) -> CellValue,
    ) -> Self {
        Self {
            key,
            label,
            render: RenderMode::ActionIcon,
            value,
        }
    }

    pub const fn descriptor(&self) -> ColumnDescriptor {
        ColumnDescriptor {
            key: self.key,
            label: self.label,
            render: self.render,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row<Id> {
    pub id: Id,
    cells: BTreeMap<&'static str, CellValue>,
}

static EMPTY_CELL: CellValue = CellValue::Empty;

impl<Id> Row<Id> {
    pub fn new(id: Id) -> Self {
        Self {
            id,
            cells: BTreeMap::new(),
        }
    }

    pub fn with_cell(mut self, key: &'static str, value: CellValue) -> Self {
        self.cells.insert(key, value);
        self
    }

    pub fn project<T>(id: Id, entity: &T, columns: &[Column<T>]) -> Self {
        let cells = columns
            .iter()
            .map(|column| (column.key, (column.value)(entity)))
            .collect();
        Self { id, cells }
    }

    /// Missing keys read as [`CellValue::Empty`].
    pub fn cell(&self, key: &str) -> &CellValue {
        self.cells.get(key).unwrap_or(&EMPTY_CELL)
    }

    fn matches_query(&self, query: &str) -> bool {
        self.cells.values().any(|cell| {
            cell.searchable_text()
                .is_some_and(|text| text.to_lowercase().contains(query))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStyle {
    Primary,
    Secondary,
    Danger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowAction {
    pub key: &'static str,
    pub label: &'static str,
    pub icon: &'static str,
    pub style: ActionStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkAction {
    pub key: &'static str,
    pub label: &'static str,
    pub icon: &'static str,
    pub style: ActionStyle,
}

pub const EDIT_ACTION: RowAction = RowAction {
    key: "edit",
    label: "Edit",
    icon: "✎",
    style: ActionStyle::Primary,
};

pub const DELETE_ACTION: RowAction = RowAction {
    key: "delete",
    label: "Delete",
    icon: "✖",
    style: ActionStyle::Danger,
};

pub const BULK_DELETE_ACTION: BulkAction = BulkAction {
    key: "delete",
    label: "Delete Selected",
    icon: "✖",
    style: ActionStyle::Danger,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: usize,
    page_size: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Pagination {
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
        }
    }

    pub const fn page(&self) -> usize {
        self.page
    }

    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    pub const fn total_pages(&self, row_count: usize) -> usize {
        row_count.div_ceil(self.page_size)
    }

    /// Returns false and leaves the page alone when `page` is out of range.
    pub fn set_page(&mut self, page: usize, row_count: usize) -> bool {
        if page < 1 || page > self.total_pages(row_count) {
            return false;
        }
        self.page = page;
        true
    }

    pub fn clamp(&mut self, row_count: usize) {
        let last = self.total_pages(row_count).max(1);
        self.page = self.page.clamp(1, last);
    }

    pub fn range(&self, row_count: usize) -> Range<usize> {
        let start = (self.page - 1).saturating_mul(self.page_size).min(row_count);
        let end = start.saturating_add(self.page_size).min(row_count);
        start..end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    pub page: usize,
    pub total_pages: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewRow {
    NoData,
    Data {
        id: String,
        selected: bool,
        focused: bool,
        cells: Vec<CellValue>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableView {
    pub heading: String,
    pub columns: Vec<ColumnDescriptor>,
    pub row_actions: Vec<RowAction>,
    pub bulk_actions: Vec<BulkAction>,
    pub selected_count: usize,
    pub rows: Vec<ViewRow>,
    pub pager: Option<Pager>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowInvocation<Id> {
    pub action: &'static str,
    pub id: Id,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkInvocation<Id> {
    pub action: &'static str,
    pub ids: Vec<Id>,
}

#[derive(Debug, Clone)]
pub struct TableState<Id> {
    heading: String,
    columns: Vec<ColumnDescriptor>,
    row_actions: Vec<RowAction>,
    bulk_actions: Vec<BulkAction>,
    rows: Vec<Row<Id>>,
    query: String,
    pagination: Pagination,
    selection: BTreeSet<Id>,
    cursor: usize,
}

impl<Id: Copy + Ord + Display> TableState<Id> {
    pub fn new(
        heading: impl Into<String>,
        columns: Vec<ColumnDescriptor>,
        page_size: usize,
    ) -> Self {
        Self {
            heading: heading.into(),
            columns,
            row_actions: Vec::new(),
            bulk_actions: Vec::new(),
            rows: Vec::new(),
            query: String::new(),
            pagination: Pagination::new(page_size),
            selection: BTreeSet::new(),
            cursor: 0,
        }
    }

    pub fn with_row_actions(mut self, actions: Vec<RowAction>) -> Self {
        self.row_actions = actions;
        self
    }

    pub fn with_bulk_actions(mut self, actions: Vec<BulkAction>) -> Self {
        self.bulk_actions = actions;
        self
    }

    pub fn heading(&self) -> &str {
        &self.heading
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn row_actions(&self) -> &[RowAction] {
        &self.row_actions
    }

    pub fn bulk_actions(&self) -> &[BulkAction] {
        &self.bulk_actions
    }

    /// Swaps in a freshly fetched row set. Selection is pruned to ids that
    /// still exist and the page is clamped into range.
    pub fn replace_rows(&mut self, rows: Vec<Row<Id>>) {
        self.rows = rows;
        let present: BTreeSet<Id> = self.rows.iter().map(|row| row.id).collect();
        self.selection.retain(|id| present.contains(id));
        let visible = self.visible_count();
        self.pagination.clamp(visible);
        self.clamp_cursor();
    }

    pub fn rows(&self) -> &[Row<Id>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Client-side filter over text cells; resets to the first page.
    pub fn set_query(&mut self, query: &str) {
        self.query = query.trim().to_lowercase();
        self.pagination = Pagination::new(self.pagination.page_size());
        self.cursor = 0;
    }

    fn visible_rows(&self) -> Vec<&Row<Id>> {
        if self.query.is_empty() {
            return self.rows.iter().collect();
        }
        self.rows
            .iter()
            .filter(|row| row.matches_query(&self.query))
            .collect()
    }

    fn visible_count(&self) -> usize {
        if self.query.is_empty() {
            self.rows.len()
        } else {
            self.visible_rows().len()
        }
    }

    pub fn page(&self) -> usize {
        self.pagination.page()
    }

    pub fn page_size(&self) -> usize {
        self.pagination.page_size()
    }

    pub fn total_pages(&self) -> usize {
        self.pagination.total_pages(self.visible_count())
    }

    pub fn set_page(&mut self, page: usize) -> bool {
        let changed = self.pagination.set_page(page, self.visible_count());
        if changed {
            self.cursor = 0;
        }
        changed
    }

    pub fn next_page(&mut self) -> bool {
        self.set_page(self.page() + 1)
    }

    pub fn prev_page(&mut self) -> bool {
        match self.page().checked_sub(1) {
            Some(page) => self.set_page(page),
            None => false,
        }
    }

    pub fn page_rows(&self) -> Vec<&Row<Id>> {
        let visible = self.visible_rows();
        let range = self.pagination.range(visible.len());
        visible[range].to_vec()
    }

    fn page_ids(&self) -> Vec<Id> {
        self.page_rows().iter().map(|row| row.id).collect()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let len = self.page_rows().len();
        if len == 0 {
            self.cursor = 0;
            return;
        }
        let next = (self.cursor as isize + delta).clamp(0, len as isize - 1);
        self.cursor = next as usize;
    }

    fn clamp_cursor(&mut self) {
        let len = self.page_rows().len();
        self.cursor = self.cursor.min(len.saturating_sub(1));
    }

    pub fn focused_id(&self) -> Option<Id> {
        self.page_rows().get(self.cursor).map(|row| row.id)
    }

    pub fn focused_row(&self) -> Option<&Row<Id>> {
        self.page_rows().get(self.cursor).copied()
    }

    /// All ids on the current page, or none when they are all selected already.
    pub fn toggle_select_all(&mut self) {
        let page_ids = self.page_ids();
        let all_selected =
            !page_ids.is_empty() && page_ids.iter().all(|id| self.selection.contains(id));
        self.selection.clear();
        if !all_selected {
            self.selection.extend(page_ids);
        }
    }

    pub fn toggle_row(&mut self, id: Id) {
        if !self.selection.remove(&id) {
            self.selection.insert(id);
        }
    }

    pub fn is_selected(&self, id: Id) -> bool {
        self.selection.contains(&id)
    }

    pub fn selected_ids(&self) -> Vec<Id> {
        self.selection.iter().copied().collect()
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn invoke_row_action(&self, key: &str, id: Id) -> Option<RowInvocation<Id>> {
        let action = self.row_actions.iter().find(|action| action.key == key)?;
        Some(RowInvocation {
            action: action.key,
            id,
        })
    }

    /// Bulk actions receive whatever is selected, including nothing.
    pub fn invoke_bulk_action(&self, key: &str) -> Option<BulkInvocation<Id>> {
        let action = self.bulk_actions.iter().find(|action| action.key == key)?;
        Some(BulkInvocation {
            action: action.key,
            ids: self.selected_ids(),
        })
    }

    pub fn view(&self) -> TableView {
        let visible = self.visible_rows();
        let (rows, pager) = if visible.is_empty() {
            (vec![ViewRow::NoData], None)
        } else {
            let range = self.pagination.range(visible.len());
            let rows = visible[range]
                .iter()
                .enumerate()
                .map(|(index, row)| ViewRow::Data {
                    id: row.id.to_string(),
                    selected: self.selection.contains(&row.id),
                    focused: index == self.cursor,
                    cells: self
                        .columns
                        .iter()
                        .map(|column| row.cell(column.key).clone())
                        .collect(),
                })
                .collect();
            let pager = Pager {
                page: self.page(),
                total_pages: self.pagination.total_pages(visible.len()),
            };
            (rows, Some(pager))
        };

        TableView {
            heading: self.heading.clone(),
            columns: self.columns.clone(),
            row_actions: self.row_actions.clone(),
            bulk_actions: self.bulk_actions.clone(),
            selected_count: self.selection.len(),
            rows,
            pager,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        BULK_DELETE_ACTION, CellValue, Column, ColumnDescriptor, DELETE_ACTION, Pagination,
        RenderMode, Row, TableState, ViewRow,
    };

    fn columns() -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor {
                key: "name",
                label: "Name",
                render: RenderMode::Plain,
            },
            ColumnDescriptor {
                key: "progress",
                label: "Progress",
                render: RenderMode::Progress,
            },
        ]
    }

    fn rows(count: i64) -> Vec<Row<i64>> {
        (1..=count)
            .map(|id| Row::new(id).with_cell("name", CellValue::text(format!("row {id}"))))
            .collect()
    }

    fn table(count: i64) -> TableState<i64> {
        let mut table = TableState::new("Sectors", columns(), 5)
            .with_row_actions(vec![DELETE_ACTION])
            .with_bulk_actions(vec![BULK_DELETE_ACTION]);
        table.replace_rows(rows(count));
        table
    }

    fn page_ids(table: &TableState<i64>) -> Vec<i64> {
        table.page_rows().iter().map(|row| row.id).collect()
    }

    #[test]
    fn total_pages_is_ceiling_of_rows_over_page_size() {
        for page_size in 1..=7 {
            for rows in 0..=30 {
                let pagination = Pagination::new(page_size);
                assert_eq!(pagination.total_pages(rows), rows.div_ceil(page_size));
            }
        }
    }

    #[test]
    fn twelve_rows_split_into_three_pages() {
        let mut table = table(12);
        assert_eq!(table.total_pages(), 3);
        assert_eq!(page_ids(&table), vec![1, 2, 3, 4, 5]);

        assert!(table.set_page(3));
        assert_eq!(page_ids(&table), vec![11, 12]);
    }

    #[test]
    fn out_of_range_page_requests_are_ignored() {
        let mut table = table(12);
        assert!(!table.set_page(0));
        assert!(!table.set_page(4));
        assert_eq!(table.page(), 1);

        assert!(table.set_page(3));
        assert!(!table.next_page());
        assert_eq!(table.page(), 3);

        assert!(table.set_page(1));
        assert!(!table.prev_page());
        assert_eq!(table.page(), 1);
    }

    #[test]
    fn select_all_twice_yields_empty_selection() {
        let mut table = table(12);
        table.toggle_select_all();
        assert_eq!(table.selected_ids(), vec![1, 2, 3, 4, 5]);

        table.toggle_select_all();
        assert!(table.selected_ids().is_empty());
    }

    #[test]
    fn select_all_replaces_partial_selection_with_page() {
        let mut table = table(12);
        table.toggle_row(2);
        table.toggle_row(11);
        table.toggle_select_all();
        assert_eq!(table.selected_ids(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn toggle_row_flips_membership() {
        let mut table = table(3);
        table.toggle_row(2);
        assert!(table.is_selected(2));
        table.toggle_row(2);
        assert!(!table.is_selected(2));
    }

    #[test]
    fn empty_rows_render_single_no_data_row_without_pager() {
        let table = table(0);
        let view = table.view();
        assert_eq!(view.rows, vec![ViewRow::NoData]);
        assert!(view.pager.is_none());
        assert_eq!(table.total_pages(), 0);
        assert_eq!(table.page(), 1);
    }

    #[test]
    fn missing_keys_render_blank_cells() {
        let table = table(1);
        let view = table.view();
        let ViewRow::Data { cells, .. } = &view.rows[0] else {
            panic!("expected a data row");
        };
        assert_eq!(cells[0], CellValue::text("row 1"));
        assert_eq!(cells[1], CellValue::Empty);
        assert_eq!(view.pager.map(|pager| pager.total_pages), Some(1));
    }

    #[test]
    fn reload_prunes_selection_and_clamps_page() {
        let mut table = table(12);
        assert!(table.set_page(3));
        table.toggle_row(11);
        table.toggle_row(4);

        table.replace_rows(rows(6));
        assert_eq!(table.page(), 2);
        assert_eq!(table.selected_ids(), vec![4]);

        table.replace_rows(Vec::new());
        assert_eq!(table.page(), 1);
        assert!(table.selected_ids().is_empty());
    }

    #[test]
    fn bulk_invocation_carries_selection_even_when_empty() {
        let mut table = table(4);
        let empty = table
            .invoke_bulk_action("delete")
            .expect("bulk delete registered");
        assert!(empty.ids.is_empty());

        table.toggle_row(3);
        let invocation = table
            .invoke_bulk_action("delete")
            .expect("bulk delete registered");
        assert_eq!(invocation.ids, vec![3]);
        assert!(table.invoke_bulk_action("archive").is_none());
    }

    #[test]
    fn row_invocation_requires_registered_action() {
        let table = table(2);
        let invocation = table
            .invoke_row_action("delete", 2)
            .expect("delete registered");
        assert_eq!(invocation.id, 2);
        assert!(table.invoke_row_action("edit", 2).is_none());
    }

    #[test]
    fn query_filters_rows_and_resets_page() {
        let mut table = table(12);
        assert!(table.set_page(2));
        table.set_query("ROW 1");
        assert_eq!(table.page(), 1);
        assert_eq!(page_ids(&table), vec![1, 10, 11, 12]);
        assert_eq!(table.total_pages(), 1);
    }

    #[test]
    fn typed_columns_project_entity_fields() {
        struct Sample {
            name: &'static str,
            done: u8,
        }
        let columns = [
            Column::plain("name", "Name", |sample: &Sample| CellValue::text(sample.name)),
            Column::progress("progress", "Progress", |sample: &Sample| {
                CellValue::progress(sample.done)
            }),
        ];
        let row = Row::project(
            7,
            &Sample {
                name: "meter",
                done: 140,
            },
            &columns,
        );
        assert_eq!(row.cell("name"), &CellValue::text("meter"));
        assert_eq!(row.cell("progress"), &CellValue::Progress(100));
        assert_eq!(row.cell("missing"), &CellValue::Empty);
        assert_eq!(columns[1].descriptor().render, RenderMode::Progress);
    }

    #[test]
    fn cursor_stays_inside_current_page() {
        let mut table = table(7);
        table.move_cursor(10);
        assert_eq!(table.focused_id(), Some(5));
        assert!(table.next_page());
        assert_eq!(table.focused_id(), Some(6));
        table.move_cursor(10);
        assert_eq!(table.focused_id(), Some(7));
    }
}
