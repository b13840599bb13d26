use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, trace, warn};

use crate::domain::{CMDMode, HELP_TEXT, Message, TVConfig};
use crate::inputter::{InputResult, Inputter};
use crate::record::{Field, Record};
use crate::source::Dataset;
use crate::ui::{CMDLINE_HEIGH, COLUMN_WIDTH_MARGIN, FOOTER_HEIGHT, TABLE_HEADER_HEIGHT, TITLE_HEIGHT};
use crate::view_state::{FilterField, Pagination, SortDirection, SortField, ViewState};

const ALL_VALUES: &str = "(All)";

#[derive(Debug, PartialEq)]
pub enum Status {
    EMPTY,
    READY,
    QUITTING,
}

#[derive(Clone, Debug, Default)]
pub struct ColumnView {
    pub name: String,
    pub width: usize,
    pub data: Vec<String>,
    pub sortable: bool,
    pub sorted: Option<SortDirection>,
}

impl ColumnView {
    fn plain(name: &str, width: usize, data: Vec<String>) -> Self {
        ColumnView {
            name: name.to_string(),
            width,
            data,
            sortable: false,
            sorted: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    RECORD,
    PICKER,
    POPUP,
    CMDINPUT,
}

#[derive(Default)]
struct RecordView {
    record_idx: usize, // Position in the filtered and sorted rows
    header_data: Vec<String>,
    row_data: Vec<String>,
    curser_row: usize,
    curser_offset: usize,
    header_view: ColumnView,
    row_view: ColumnView,
}

#[derive(Default)]
struct PickerView {
    field: Option<FilterField>,
    values: Vec<(String, usize)>, // First entry clears the filter
    curser_row: usize,
    curser_offset: usize,
    count_view: ColumnView,
    value_view: ColumnView,
}

pub struct UIData {
    pub name: String,
    pub table: Vec<ColumnView>,
    pub nrows: usize, // Rows in the shown table
    pub selected_row: usize,
    pub pagination: Option<Pagination>,
    pub filters: Vec<(FilterField, String)>,
    pub show_popup: bool,
    pub popup_message: String,
    pub cmdinput: InputResult,
    pub cmd_mode: Option<CMDMode>,
    pub active_cmdinput: bool,
    pub status_message: String,
    pub last_update: Instant,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            table: Vec::new(),
            nrows: 0,
            selected_row: 0,
            pagination: None,
            filters: Vec::new(),
            show_popup: false,
            popup_message: String::new(),
            cmdinput: InputResult::default(),
            cmd_mode: None,
            active_cmdinput: false,
            status_message: String::new(),
            last_update: Instant::now(),
        }
    }
}

#[derive(Default, Clone, Debug)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub table_height: usize, // Rows available below the table header
}

impl UILayout {
    pub fn from_values(ui_width: usize, ui_height: usize) -> Self {
        // Two lines for the table border
        let chrome = TITLE_HEIGHT + TABLE_HEADER_HEIGHT + FOOTER_HEIGHT + CMDLINE_HEIGH + 2;
        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            table_height: std::cmp::max(ui_height.saturating_sub(chrome), 1),
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

pub struct Model {
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    name: String,
    view: ViewState,
    column_widths: Vec<usize>, // One per Field::TABLE column
    curser_row: usize,
    record_view: RecordView,
    picker_view: PickerView,
    uilayout: UILayout,
    uidata: UIData,
    clipboard: Option<Clipboard>,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    last_input: InputResult,
    active_cmdinput: bool,
    status_message: String,
}

impl Model {
    pub fn init(config: &TVConfig, dataset: Dataset, ui_width: usize, ui_height: usize) -> Self {
        let records = Arc::new(dataset.records);
        let column_widths = Field::TABLE
            .iter()
            .map(|&f| Self::calculate_column_width(&records, f, config.max_column_width))
            .collect();
        let status = if records.is_empty() {
            Status::EMPTY
        } else {
            Status::READY
        };
        let clipboard = match Clipboard::new() {
            Ok(c) => Some(c),
            Err(e) => {
                warn!("No clipboard available: {e}");
                None
            }
        };
        let nrecords = records.len();

        let mut model = Self {
            status,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            name: dataset.name,
            view: ViewState::new(records, config.page_size),
            column_widths,
            curser_row: 0,
            record_view: RecordView::default(),
            picker_view: PickerView::default(),
            uilayout: UILayout::from_values(ui_width, ui_height),
            uidata: UIData::empty(),
            clipboard,
            input: Inputter::default(),
            cmd_mode: None,
            last_input: InputResult::default(),
            active_cmdinput: false,
            status_message: String::new(),
        };
        model.update_table_data();
        model.set_status_message(format!("Loaded {nrecords} records"));
        model
    }

    #[cfg(test)]
    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn raw_keyevents(&self) -> bool {
        self.active_cmdinput
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    fn calculate_column_width(records: &[Record], field: Field, max_column_width: usize) -> usize {
        let max_width = records
            .iter()
            .map(|r| r.display(field).chars().count())
            .max()
            .unwrap_or(0);
        // Header needs room for the sort indicator
        let width = std::cmp::max(field.label().chars().count() + 2, max_width) + COLUMN_WIDTH_MARGIN;
        std::cmp::min(width, max_column_width)
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.uidata.status_message = self.status_message.clone();
        self.uidata.last_update = Instant::now();
    }

    fn selected_record_idx(&self) -> usize {
        self.view.page() * self.view.page_size().rows() + self.curser_row
    }

    fn selected_record(&self) -> Option<&Record> {
        self.view.visible().get(self.curser_row).copied()
    }

    fn update_table_data(&mut self) {
        let visible = self.view.visible();
        self.curser_row = std::cmp::min(self.curser_row, visible.len().saturating_sub(1));

        let sort = self.view.sort();
        let table = Field::TABLE
            .iter()
            .zip(self.column_widths.iter())
            .map(|(&field, &width)| {
                let sortable = SortField::from_field(field);
                ColumnView {
                    name: field.label().to_string(),
                    width,
                    data: visible.iter().map(|r| r.display(field)).collect(),
                    sortable: sortable.is_some(),
                    sorted: sortable
                        .filter(|&s| s == sort.field)
                        .map(|_| sort.direction),
                }
            })
            .collect::<Vec<ColumnView>>();

        trace!(
            "Table: page {}, Cr {}, {} visible of {}",
            self.view.page(),
            self.curser_row,
            visible.len(),
            self.view.pagination().total
        );

        self.uidata = UIData {
            name: self.name.clone(),
            nrows: visible.len(),
            table,
            selected_row: self.curser_row,
            pagination: Some(self.view.pagination()),
            filters: self.active_filters(),
            show_popup: false,
            popup_message: String::new(),
            cmdinput: self.last_input.clone(),
            cmd_mode: self.cmd_mode,
            active_cmdinput: self.active_cmdinput,
            status_message: self.status_message.clone(),
            last_update: Instant::now(),
        };
    }

    fn active_filters(&self) -> Vec<(FilterField, String)> {
        self.view
            .filters()
            .active()
            .into_iter()
            .map(|(f, v)| (f, v.to_string()))
            .collect()
    }

    fn build_record_view(&mut self, record_idx: usize) {
        trace!("Building record view for {record_idx} ...");
        let record = &mut self.record_view;
        record.header_data = Field::ALL.iter().map(|f| f.label().to_string()).collect();
        record.record_idx = record_idx;
        record.curser_row = 0;
        record.curser_offset = 0;
        self.update_record_data();
    }

    fn update_record_data(&mut self) {
        let record = &mut self.record_view;
        record.row_data = match self.view.filtered().nth(record.record_idx) {
            Some(r) => Field::ALL.iter().map(|&f| r.display(f)).collect(),
            None => vec![String::new(); Field::ALL.len()],
        };

        let height = self.uilayout.table_height;
        let rbegin = record.curser_offset;
        let rend = std::cmp::min(rbegin + height, record.row_data.len());
        let header_width = record
            .header_data
            .iter()
            .map(|h| h.chars().count())
            .max()
            .unwrap_or(0)
            + COLUMN_WIDTH_MARGIN;

        record.header_view =
            ColumnView::plain("Field", header_width, record.header_data[rbegin..rend].to_vec());
        record.row_view = ColumnView::plain(
            "Value",
            self.uilayout.width.saturating_sub(header_width),
            record.row_data[rbegin..rend].to_vec(),
        );

        let total = self.view.pagination().total;
        self.uidata.name = format!("R[{}] {}/{}", self.name, record.record_idx + 1, total);
        self.uidata.table = vec![record.header_view.clone(), record.row_view.clone()];
        self.uidata.nrows = rend - rbegin;
        self.uidata.selected_row = record.curser_row;
        self.uidata.pagination = None;
        self.uidata.last_update = Instant::now();
    }

    fn build_picker_view(&mut self, field: FilterField) {
        let total = self.view.records().len();
        let mut values = vec![(ALL_VALUES.to_string(), total)];
        // Blank values are left out, an empty filter value means no filter
        values.extend(
            self.view
                .distinct_values(field.field())
                .into_iter()
                .filter(|(v, _)| !v.is_empty()),
        );

        let active = self.view.filters().get(field);
        let selected = if active.is_empty() {
            0
        } else {
            values
                .iter()
                .skip(1)
                .position(|(v, _)| v == active)
                .map(|p| p + 1)
                .unwrap_or(0)
        };

        let height = self.uilayout.table_height;
        let picker = &mut self.picker_view;
        picker.field = Some(field);
        picker.values = values;
        picker.curser_offset = selected.saturating_sub(height.saturating_sub(1));
        picker.curser_row = selected - picker.curser_offset;
        self.modus = Modus::PICKER;
        self.update_picker_view();
    }

    fn update_picker_view(&mut self) {
        let height = self.uilayout.table_height;
        let picker = &mut self.picker_view;
        let rbegin = picker.curser_offset;
        let rend = std::cmp::min(rbegin + height, picker.values.len());
        let total = self.view.records().len();

        let counts: Vec<String> = picker.values[rbegin..rend]
            .iter()
            .map(|(_, c)| match total {
                0 => format!("{c}"),
                _ => format!("{:.0}% {}", *c as f64 * 100.0 / total as f64, c),
            })
            .collect();
        let count_width = counts.iter().map(|c| c.len()).max().unwrap_or(0) + COLUMN_WIDTH_MARGIN;
        picker.count_view = ColumnView::plain("Counts", count_width, counts);
        picker.value_view = ColumnView::plain(
            "Values",
            self.uilayout.width.saturating_sub(count_width),
            picker.values[rbegin..rend]
                .iter()
                .map(|(v, _)| v.clone())
                .collect(),
        );

        let label = picker.field.map(|f| f.label()).unwrap_or_default();
        self.uidata.name = format!("Pick {label} [{}]", self.name);
        self.uidata.table = vec![picker.count_view.clone(), picker.value_view.clone()];
        self.uidata.nrows = rend - rbegin;
        self.uidata.selected_row = picker.curser_row;
        self.uidata.pagination = None;
        self.uidata.last_update = Instant::now();
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout = UILayout::from_values(width, height);
        match self.modus {
            Modus::TABLE => self.update_table_data(),
            Modus::RECORD => {
                self.record_view.curser_row = 0;
                self.record_view.curser_offset = 0;
                self.update_record_data()
            }
            Modus::PICKER => {
                self.picker_view.curser_row = 0;
                self.picker_view.curser_offset = 0;
                self.update_picker_view()
            }
            Modus::POPUP => {}
            Modus::CMDINPUT => {}
        }
    }

    pub fn update(&mut self, msg: Message) {
        trace!("Update: Modus {:?}, Message {:?}", self.modus, msg);
        match self.modus {
            Modus::TABLE => match msg {
                Message::Quit => self.quit(),
                Message::MoveDown => self.move_table_selection_down(),
                Message::MoveUp => self.move_table_selection_up(),
                Message::NextPage => self.next_page(),
                Message::PrevPage => self.previous_page(),
                Message::FirstPage => self.goto_page(0),
                Message::LastPage => self.goto_page(self.view.pagination().last_page()),
                Message::CyclePageSize => self.cycle_page_size(),
                Message::Sort(field) => self.sort(field),
                Message::Pick(FilterField::LegalNameContains) | Message::FilterContains => {
                    self.enter_cmd_mode(CMDMode::FilterContains)
                }
                Message::Pick(field) => self.build_picker_view(field),
                Message::GotoPage => self.enter_cmd_mode(CMDMode::GotoPage),
                Message::ClearFilters => self.clear_filters(),
                Message::Enter => self.enter(),
                Message::CopyRow => self.copy_table_row(),
                Message::Help => self.show_help(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
            Modus::RECORD => match msg {
                Message::Quit => self.quit(),
                Message::MoveDown => self.move_record_selection_down(1),
                Message::MoveUp => self.move_record_selection_up(1),
                Message::NextPage => self.next_record(),
                Message::PrevPage => self.previous_record(),
                Message::CopyRow => self.copy_record(),
                Message::Help => self.show_help(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                Message::Enter | Message::Exit => self.exit(),
                _ => (),
            },
            Modus::PICKER => match msg {
                Message::Quit => self.quit(),
                Message::MoveDown => self.move_picker_selection_down(1),
                Message::MoveUp => self.move_picker_selection_up(1),
                Message::NextPage => self.move_picker_selection_down(self.uilayout.table_height),
                Message::PrevPage => self.move_picker_selection_up(self.uilayout.table_height),
                Message::Help => self.show_help(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                Message::Enter => self.enter(),
                Message::Exit => self.exit(),
                _ => (),
            },
            Modus::POPUP => match msg {
                Message::Quit => self.quit(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                Message::Enter | Message::Exit => self.exit(),
                _ => (),
            },
            Modus::CMDINPUT => {
                if let Message::RawKey(key) = msg {
                    self.raw_input(key)
                }
            }
        }
    }

    // -------------------- Control handling functions ---------------------- //

    fn enter(&mut self) {
        match self.modus {
            Modus::TABLE => {
                if self.selected_record().is_some() {
                    self.build_record_view(self.selected_record_idx());
                    self.previous_modus = Modus::TABLE;
                    self.modus = Modus::RECORD;
                }
            }
            Modus::PICKER => {
                let picker = &self.picker_view;
                let idx = picker.curser_offset + picker.curser_row;
                let value = match idx {
                    0 => String::new(),
                    _ => picker.values[idx].0.clone(),
                };
                if let Some(field) = picker.field {
                    info!("Filter {:?} = {:?}", field, value);
                    self.view.set_filter(field, value);
                    self.curser_row = 0;
                }
                self.previous_modus = Modus::PICKER;
                self.modus = Modus::TABLE;
                self.update_table_data();
                self.set_status_message(format!(
                    "{} matching records",
                    self.view.pagination().total
                ));
            }
            Modus::RECORD => {}
            Modus::POPUP => {}
            Modus::CMDINPUT => {}
        }
    }

    fn exit(&mut self) {
        match self.modus {
            Modus::TABLE => {}
            Modus::RECORD => {
                // Return to the page that holds the record
                let size = self.view.page_size().rows();
                let idx = self.record_view.record_idx;
                self.view.set_page(idx / size);
                self.curser_row = idx % size;
                self.previous_modus = Modus::RECORD;
                self.modus = Modus::TABLE;
                self.update_table_data();
            }
            Modus::PICKER => {
                self.previous_modus = Modus::PICKER;
                self.modus = Modus::TABLE;
                self.update_table_data();
            }
            Modus::POPUP => {
                trace!("Close popup ...");
                self.modus = self.previous_modus;
                self.previous_modus = Modus::POPUP;
                self.uidata.show_popup = false;
                self.uidata.last_update = Instant::now();
            }
            Modus::CMDINPUT => {}
        }
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.uidata.popup_message = HELP_TEXT.to_string();
        self.uidata.show_popup = true;
        self.uidata.last_update = Instant::now();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        if self.active_cmdinput {
            self.last_input = self.input.read(key);
            if self.last_input.finished {
                self.handle_cmd_input();
            }
            self.uidata.cmdinput = self.last_input.clone();
            self.uidata.cmd_mode = self.cmd_mode;
            self.uidata.active_cmdinput = self.active_cmdinput;
            self.uidata.last_update = Instant::now();
        }
    }

    fn enter_cmd_mode(&mut self, mode: CMDMode) {
        trace!("Entering command mode {mode:?} ...");
        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.cmd_mode = Some(mode);

        self.active_cmdinput = true;
        self.input.clear();
        if mode == CMDMode::FilterContains {
            self.input
                .set(self.view.filters().get(FilterField::LegalNameContains));
        }
        self.last_input = self.input.get();

        self.uidata.cmdinput = self.last_input.clone();
        self.uidata.active_cmdinput = self.active_cmdinput;
        self.uidata.cmd_mode = self.cmd_mode;
        self.uidata.last_update = Instant::now();
    }

    fn handle_cmd_input(&mut self) {
        trace!("Handle cmd input {:?}", self.last_input);

        self.active_cmdinput = false;
        self.modus = self.previous_modus;
        self.previous_modus = Modus::CMDINPUT;

        let canceled = self.last_input.canceled;
        let cmd_input = self.last_input.input.clone();
        let cmd_mode = self.cmd_mode.take();
        self.last_input = InputResult::default();

        match cmd_mode {
            _ if canceled => self.update_table_data(),
            Some(CMDMode::FilterContains) => {
                self.view
                    .set_filter(FilterField::LegalNameContains, cmd_input.trim());
                self.curser_row = 0;
                self.update_table_data();
                self.set_status_message(format!(
                    "{} matching records",
                    self.view.pagination().total
                ));
            }
            Some(CMDMode::GotoPage) => match cmd_input.trim().parse::<usize>() {
                Ok(page) if page > 0 => self.goto_page(page - 1),
                _ => {
                    self.update_table_data();
                    self.set_status_message(format!("Not a page number: {cmd_input}"));
                }
            },
            None => {
                info!("Cmd mode is none!")
            }
        }
    }

    fn sort(&mut self, field: SortField) {
        self.view.set_sort(field);
        self.curser_row = 0;
        self.update_table_data();
        let sort = self.view.sort();
        self.set_status_message(format!(
            "Sorted by {} {}",
            sort.field.field().label(),
            sort.direction.symbol()
        ));
    }

    fn clear_filters(&mut self) {
        self.view.clear_filters();
        self.curser_row = 0;
        self.update_table_data();
        self.set_status_message("Filters cleared");
    }

    fn cycle_page_size(&mut self) {
        let size = self.view.page_size().next();
        self.view.set_page_size(size);
        self.curser_row = 0;
        self.update_table_data();
        self.set_status_message(format!("{} rows per page", size.rows()));
    }

    fn goto_page(&mut self, page: usize) {
        self.view.set_page(page);
        self.curser_row = 0;
        self.update_table_data();
        if self.view.visible().is_empty() && self.view.pagination().total > 0 {
            self.set_status_message(format!("Page {} is empty", page + 1));
        }
    }

    fn next_page(&mut self) {
        let pagination = self.view.pagination();
        if pagination.page < pagination.last_page() {
            self.goto_page(pagination.page + 1);
        }
    }

    fn previous_page(&mut self) {
        let pagination = self.view.pagination();
        let page = std::cmp::min(pagination.page.saturating_sub(1), pagination.last_page());
        if page != pagination.page {
            self.goto_page(page);
        }
    }

    fn move_table_selection_down(&mut self) {
        let nrows = self.view.visible().len();
        if self.curser_row + 1 < nrows {
            self.curser_row += 1;
            self.update_table_data();
        } else {
            // At the bottom of the page, continue on the next one
            self.next_page();
        }
    }

    fn move_table_selection_up(&mut self) {
        if self.curser_row > 0 {
            self.curser_row -= 1;
            self.update_table_data();
        } else if self.view.page() > 0 {
            self.previous_page();
            self.curser_row = self.view.page_size().rows() - 1;
            self.update_table_data();
        }
    }

    fn copy_to_clipboard(&mut self, content: String) {
        trace!("Clipboard content: {}", content);
        let result = self.clipboard.as_mut().map(|c| c.set_text(content));
        match result {
            Some(Ok(_)) => self.set_status_message("Copied record to clipboard"),
            Some(Err(e)) => {
                warn!("Error copying to clipboard: {:?}", e);
                self.set_status_message("Copy failed");
            }
            None => self.set_status_message("No clipboard available"),
        }
    }

    fn copy_table_row(&mut self) {
        let line = self.selected_record().map(|r| r.to_csv_line());
        if let Some(line) = line {
            self.copy_to_clipboard(line);
        }
    }

    fn copy_record(&mut self) {
        let line = self
            .view
            .filtered()
            .nth(self.record_view.record_idx)
            .map(|r| r.to_csv_line());
        if let Some(line) = line {
            self.copy_to_clipboard(line);
        }
    }

    fn move_record_selection_up(&mut self, size: usize) {
        let record = &mut self.record_view;
        if record.curser_row > 0 {
            record.curser_row = record.curser_row.saturating_sub(size);
        } else if record.curser_offset > 0 {
            // Curser at the top, shift fields up
            record.curser_offset = record.curser_offset.saturating_sub(size);
        }
        self.update_record_data();
    }

    fn move_record_selection_down(&mut self, size: usize) {
        let height = self.uilayout.table_height;
        let record = &mut self.record_view;
        let last = record.row_data.len().saturating_sub(1);
        if record.curser_row + record.curser_offset < last {
            if record.curser_row + 1 < height {
                record.curser_row = std::cmp::min(record.curser_row + size, last - record.curser_offset);
            } else {
                // At the bottom, shift fields down
                record.curser_offset = std::cmp::min(record.curser_offset + size, last);
                record.curser_row = std::cmp::min(height - 1, last - record.curser_offset);
            }
            self.update_record_data();
        }
    }

    fn previous_record(&mut self) {
        let record = &mut self.record_view;
        if record.record_idx > 0 {
            record.record_idx -= 1;
            self.update_record_data();
        }
    }

    fn next_record(&mut self) {
        let total = self.view.pagination().total;
        let record = &mut self.record_view;
        if record.record_idx + 1 < total {
            record.record_idx += 1;
            self.update_record_data();
        }
    }

    fn move_picker_selection_up(&mut self, size: usize) {
        let picker = &mut self.picker_view;
        let selected = (picker.curser_offset + picker.curser_row).saturating_sub(size);
        if selected < picker.curser_offset {
            picker.curser_offset = selected;
        }
        picker.curser_row = selected - picker.curser_offset;
        self.update_picker_view();
    }

    fn move_picker_selection_down(&mut self, size: usize) {
        let height = self.uilayout.table_height;
        let picker = &mut self.picker_view;
        let last = picker.values.len().saturating_sub(1);
        let selected = std::cmp::min(picker.curser_offset + picker.curser_row + size, last);
        if selected >= picker.curser_offset + height {
            picker.curser_offset = selected + 1 - height;
        }
        picker.curser_row = selected - picker.curser_offset;
        self.update_picker_view();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view_state::PageSize;
    use ratatui::crossterm::event::{KeyCode, KeyModifiers};

    fn dataset(n: usize) -> Dataset {
        let records = (0..n)
            .map(|i| Record {
                legal_name: format!("Carrier {i:02}"),
                created_dt: format!("2020-01-01T00:00:{:02}Z", i),
                entity_type: if i % 2 == 0 { "CARRIER" } else { "BROKER" }.to_string(),
                ..Default::default()
            })
            .collect();
        Dataset {
            name: "test".to_string(),
            records,
        }
    }

    fn model(n: usize) -> Model {
        Model::init(&TVConfig::default(), dataset(n), 120, 40)
    }

    fn type_cmd(model: &mut Model, text: &str) {
        for c in text.chars() {
            model.update(Message::RawKey(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)));
        }
        model.update(Message::RawKey(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)));
    }

    fn legal_names(model: &Model) -> Vec<String> {
        model.get_uidata().table[3].data.clone()
    }

    #[test]
    fn init_shows_first_page() {
        let model = model(23);
        assert_eq!(model.status, Status::READY);
        let ui = model.get_uidata();
        assert_eq!(ui.table.len(), Field::TABLE.len());
        assert_eq!(ui.nrows, 10);
        assert_eq!(ui.table[0].sorted, Some(SortDirection::Ascending));
        assert!(ui.table[2].sorted.is_none() && !ui.table[2].sortable);
        assert_eq!(ui.pagination.map(|p| p.page_count()), Some(3));
    }

    #[test]
    fn empty_dataset_is_empty_status() {
        let model = model(0);
        assert_eq!(model.status, Status::EMPTY);
        assert_eq!(model.get_uidata().nrows, 0);
    }

    #[test]
    fn sort_message_toggles_direction() {
        let mut model = model(12);
        model.update(Message::Sort(SortField::LegalName));
        assert_eq!(legal_names(&model)[0], "Carrier 00");
        model.update(Message::Sort(SortField::LegalName));
        assert_eq!(legal_names(&model)[0], "Carrier 11");
        assert_eq!(model.get_uidata().table[3].sorted, Some(SortDirection::Descending));
        assert!(model.get_uidata().table[0].sorted.is_none());
    }

    #[test]
    fn moving_down_past_page_end_turns_page() {
        let mut model = model(12);
        for _ in 0..10 {
            model.update(Message::MoveDown);
        }
        assert_eq!(model.view().page(), 1);
        assert_eq!(model.get_uidata().selected_row, 0);
        model.update(Message::MoveUp);
        assert_eq!(model.view().page(), 0);
        assert_eq!(model.get_uidata().selected_row, 9);
    }

    #[test]
    fn next_page_stops_at_last_page() {
        let mut model = model(12);
        model.update(Message::NextPage);
        model.update(Message::NextPage);
        assert_eq!(model.view().page(), 1);
        model.update(Message::FirstPage);
        assert_eq!(model.view().page(), 0);
        model.update(Message::LastPage);
        assert_eq!(model.get_uidata().nrows, 2);
    }

    #[test]
    fn picker_applies_exact_filter() {
        let mut model = model(12);
        model.update(Message::Pick(FilterField::EntityType));
        assert_eq!(model.get_uidata().table[1].data[0], ALL_VALUES);
        model.update(Message::MoveDown);
        model.update(Message::Enter);

        let filters = &model.get_uidata().filters;
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].0, FilterField::EntityType);
        assert_eq!(model.view().pagination().total, 6);

        // Picking "(All)" clears it again
        model.update(Message::Pick(FilterField::EntityType));
        model.update(Message::MoveUp);
        model.update(Message::Enter);
        assert!(model.get_uidata().filters.is_empty());
        assert_eq!(model.view().pagination().total, 12);
    }

    #[test]
    fn picker_skips_blank_values() {
        let mut data = dataset(6);
        for (i, r) in data.records.iter_mut().enumerate() {
            if i < 4 {
                r.dba_name = format!("DBA {}", i % 2);
            }
        }
        let mut model = Model::init(&TVConfig::default(), data, 120, 40);
        model.update(Message::Pick(FilterField::DbaName));
        assert_eq!(model.get_uidata().table[1].data, [ALL_VALUES, "DBA 0", "DBA 1"]);

        model.update(Message::MoveDown);
        model.update(Message::Enter);
        assert_eq!(model.view().pagination().total, 2);
        assert!(model.view().filtered().all(|r| r.dba_name == "DBA 0"));
    }

    #[test]
    fn contains_filter_from_command_line() {
        let mut model = model(12);
        model.update(Message::FilterContains);
        assert!(model.raw_keyevents());
        type_cmd(&mut model, "rier 1");
        assert!(!model.raw_keyevents());
        assert_eq!(legal_names(&model), ["Carrier 10", "Carrier 11"]);
    }

    #[test]
    fn canceled_command_changes_nothing() {
        let mut model = model(12);
        model.update(Message::FilterContains);
        model.update(Message::RawKey(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE)));
        model.update(Message::RawKey(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)));
        assert!(!model.raw_keyevents());
        assert_eq!(model.view().pagination().total, 12);
    }

    #[test]
    fn goto_page_from_command_line() {
        let mut model = model(25);
        model.update(Message::GotoPage);
        type_cmd(&mut model, "3");
        assert_eq!(model.view().page(), 2);
        assert_eq!(model.get_uidata().nrows, 5);

        model.update(Message::GotoPage);
        type_cmd(&mut model, "abc");
        assert_eq!(model.view().page(), 2);
        assert!(model.get_uidata().status_message.contains("abc"));

        model.update(Message::GotoPage);
        type_cmd(&mut model, "9");
        assert_eq!(model.get_uidata().nrows, 0);
    }

    #[test]
    fn cycle_page_size_resets_page() {
        let mut model = model(40);
        model.update(Message::NextPage);
        model.update(Message::CyclePageSize);
        assert_eq!(model.view().page_size(), PageSize::Fifteen);
        assert_eq!(model.view().page(), 0);
        assert_eq!(model.get_uidata().nrows, 15);
    }

    #[test]
    fn record_view_walks_filtered_rows() {
        let mut model = model(12);
        model.update(Message::MoveDown);
        model.update(Message::Enter);
        let ui = model.get_uidata();
        assert_eq!(ui.table.len(), 2);
        assert!(ui.table[1].data.contains(&"Carrier 01".to_string()));

        for _ in 0..9 {
            model.update(Message::NextPage);
        }
        model.update(Message::Exit);
        assert_eq!(model.view().page(), 1);
        assert_eq!(model.get_uidata().selected_row, 0);
        assert_eq!(legal_names(&model)[0], "Carrier 10");
    }

    #[test]
    fn help_popup_closes_back_to_table() {
        let mut model = model(3);
        model.update(Message::Help);
        assert!(model.get_uidata().show_popup);
        model.update(Message::MoveDown);
        model.update(Message::Exit);
        assert!(!model.get_uidata().show_popup);
        model.update(Message::Quit);
        assert_eq!(model.status, Status::QUITTING);
    }
}
