use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span, Text},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
};

use crate::domain::TVConfig;
use crate::model::{ColumnView, Model, UIData};
use crate::view_state::Pagination;

pub const TITLE_HEIGHT: usize = 1;
pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const FOOTER_HEIGHT: usize = 1;
pub const CMDLINE_HEIGH: usize = 1;
pub const COLUMN_WIDTH_MARGIN: usize = 1;

const POPUP_WIDTH: u16 = 56;

#[derive(Debug)]
pub struct TableUI {
    table_state: TableState,
}

impl TableUI {
    pub fn new(_cfg: &TVConfig) -> Self {
        Self {
            table_state: TableState::default(),
        }
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let [title_area, table_area, footer_area, cmd_area] = Layout::vertical([
            Constraint::Length(TITLE_HEIGHT as u16),
            Constraint::Min(3),
            Constraint::Length(FOOTER_HEIGHT as u16),
            Constraint::Length(CMDLINE_HEIGH as u16),
        ])
        .areas(frame.area());

        frame.render_widget(Self::title(uidata), title_area);
        self.render_table(uidata, frame, table_area);
        frame.render_widget(Self::footer(uidata.pagination), footer_area);
        Self::render_cmdline(uidata, frame, cmd_area);

        if uidata.show_popup {
            Self::render_popup(&uidata.popup_message, frame);
        }
    }

    fn title(uidata: &UIData) -> Line<'_> {
        let mut spans = vec![" carrierview ".bold().reversed(), " ".into()];
        if uidata.filters.is_empty() {
            spans.push("no filters".dark_gray());
        } else {
            for (field, value) in uidata.filters.iter() {
                let op = if field.label().ends_with('~') { " " } else { " = " };
                spans.push(Span::from(format!("{}{}", field.label(), op)).dark_gray());
                spans.push(value.as_str().yellow());
                spans.push("  ".into());
            }
        }
        Line::from(spans)
    }

    fn header_cell(column: &ColumnView) -> Cell<'_> {
        match (column.sorted, column.sortable) {
            (Some(direction), _) => Cell::from(format!("{} {}", column.name, direction.symbol()))
                .style(Style::new().bold().yellow()),
            (None, true) => Cell::from(column.name.as_str())
                .style(Style::new().bold().add_modifier(Modifier::UNDERLINED)),
            (None, false) => Cell::from(column.name.as_str()).style(Style::new().bold()),
        }
    }

    fn render_table(&mut self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let header = Row::new(uidata.table.iter().map(Self::header_cell));
        let rows = (0..uidata.nrows).map(|ridx| {
            Row::new(uidata.table.iter().map(|column| {
                let value = column.data.get(ridx).map(String::as_str).unwrap_or("");
                Cell::from(fit_to_width(value, column.width))
            }))
        });
        let widths = uidata
            .table
            .iter()
            .map(|c| Constraint::Length(c.width as u16));

        let block = Block::bordered()
            .title(Line::from(format!(" {} ", uidata.name)).bold())
            .border_set(border::PLAIN);

        let table = Table::new(rows, widths)
            .header(header)
            .block(block)
            .column_spacing(1)
            .row_highlight_style(Style::new().reversed());

        if uidata.nrows == 0 {
            self.table_state.select(None);
        } else {
            self.table_state.select(Some(uidata.selected_row));
        }
        frame.render_stateful_widget(table, area, &mut self.table_state);
    }

    fn footer(pagination: Option<Pagination>) -> Line<'static> {
        match pagination {
            Some(p) => Line::from(vec![
                "Rows per page: ".dark_gray(),
                Span::from(p.page_size.rows().to_string()).bold(),
                "   ".into(),
                Span::from(format!("{}-{} of {}", p.first_row(), p.last_row(), p.total)),
                "   ".into(),
                Span::from(format!(
                    "(page {}/{})",
                    p.page + 1,
                    std::cmp::max(p.page_count(), 1)
                ))
                .dark_gray(),
                " ".into(),
            ])
            .right_aligned(),
            None => Line::from("Esc: back ".dark_gray()).right_aligned(),
        }
    }

    fn render_cmdline(uidata: &UIData, frame: &mut Frame, area: Rect) {
        if uidata.active_cmdinput {
            let prompt = uidata.cmd_mode.map(|m| m.prompt()).unwrap_or("> ");
            let line = Line::from(vec![prompt.bold(), uidata.cmdinput.input.as_str().into()]);
            frame.render_widget(Paragraph::new(line), area);
            let x = area.x + (prompt.chars().count() + uidata.cmdinput.curser_pos) as u16;
            frame.set_cursor_position((std::cmp::min(x, area.right().saturating_sub(1)), area.y));
        } else {
            let line = Line::from(vec![
                uidata.status_message.as_str().into(),
                "  ? help  q quit".dark_gray(),
            ]);
            frame.render_widget(Paragraph::new(line), area);
        }
    }

    fn render_popup(message: &str, frame: &mut Frame) {
        let text = Text::from(message);
        let height = text.height() as u16 + 2;
        let area = centered(frame.area(), POPUP_WIDTH, height);
        let block = Block::bordered()
            .title(Line::from(" Help ").bold().centered())
            .title_bottom(Line::from(" Esc to close ").centered())
            .border_set(border::THICK);
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(text).block(block).wrap(Wrap { trim: false }),
            area,
        );
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = std::cmp::min(width, area.width);
    let height = std::cmp::min(height, area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// Cuts `value` to `width` characters, marking cut values with `…`.
pub fn fit_to_width(value: &str, width: usize) -> String {
    let value = value.replace("\r\n", " ↵ ").replace('\n', " ↵ ");
    if value.chars().count() <= width {
        return value;
    }
    if width == 0 {
        return String::new();
    }
    let mut out: String = value.chars().take(width - 1).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_cuts_long_values() {
        assert_eq!(fit_to_width("ACME TRUCKING", 20), "ACME TRUCKING");
        assert_eq!(fit_to_width("ACME TRUCKING", 5), "ACME…");
        assert_eq!(fit_to_width("line\nbreak", 40), "line ↵ break");
        assert_eq!(fit_to_width("abc", 0), "");
    }

    #[test]
    fn centered_fits_inside() {
        let area = Rect::new(0, 0, 40, 10);
        let popup = centered(area, 56, 4);
        assert_eq!(popup, Rect::new(0, 3, 40, 4));
    }
}
