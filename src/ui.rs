use crate::events::{Event, Events};
use gridsweep::{Board, Coordinate, Reveal, Status, Tile};
use num_traits::ToPrimitive;
use ratatui::{
    backend::TermionBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Span,
    widgets::{Block, BorderType, Borders, Clear, Gauge, List, ListItem, Paragraph},
    Frame, Terminal,
};
use std::{fmt, io, sync::mpsc};
use termion::{event::Key, input::MouseTerminal, raw::IntoRawMode, screen::IntoAlternateScreen};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error("board operation failed")]
    Board(#[from] gridsweep::Error),

    #[error("failed to draw to terminal")]
    DrawToTerminal(#[source] io::Error),

    #[error("failed to get input event")]
    GetEvent(#[source] mpsc::RecvError),

    #[error("failed to set ctrlc handler")]
    SetHandler(#[source] ctrlc::Error),

    #[error("failed to get stdout in raw mode")]
    GetStdoutInRawMode(#[source] io::Error),

    #[error("failed to get alternate screen for mouse terminal")]
    GetAlternateScreenForMouseTerminal(#[source] io::Error),

    #[error("failed to create terminal object")]
    CreateTerminal(#[source] io::Error),

    #[error("failed to convert usize to u16")]
    ConvertUsizeToU16(#[source] std::num::TryFromIntError),
}

const BOMB: &str = "💣";
const FLAG: &str = "⛳";

const HELP: [&str; 5] = [
    "movement: hjkl / ← ↓ ↑ →",
    "reveal tile: spacebar",
    "flag tile: f",
    "restart: r",
    "quit: q",
];

fn centered_rect(width: u16, height: u16, r: Rect) -> Rect {
    let vertical_pad = r.height.saturating_sub(height) / 2;
    let horizontal_pad = r.width.saturating_sub(width) / 2;

    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(vertical_pad),
            Constraint::Length(height),
            Constraint::Length(vertical_pad),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(horizontal_pad),
            Constraint::Length(width),
            Constraint::Length(horizontal_pad),
        ])
        .split(popup_layout[1])[1]
}

fn align_strings_to_char(strings: &[&str], c: char) -> Vec<String> {
    let (firsts, rests): (Vec<_>, Vec<_>) = strings
        .iter()
        .map(|&s| s.split_at(s.find(c).unwrap_or(s.len())))
        .unzip();
    let max_firsts = firsts.iter().map(|f| f.chars().count()).max().unwrap_or(0);
    let max_rests = rests.iter().map(|r| r.chars().count()).max().unwrap_or(0);
    firsts
        .into_iter()
        .zip(rests)
        .map(|(first, rest)| format!("{first:>max_firsts$}{rest:<max_rests$}"))
        .collect()
}

#[derive(typed_builder::TypedBuilder)]
pub(crate) struct Ui {
    board: Board,
    cell_width: usize,
    cell_height: usize,
}

struct App {
    board: Board,
    active: Coordinate,
}

struct Cell<'app> {
    app: &'app App,
    coord: Coordinate,
    tile: Tile,
}

impl<'app> Cell<'app> {
    fn new(app: &'app App, coord: Coordinate, tile: Tile) -> Self {
        Self { app, coord, tile }
    }

    fn is_active(&self) -> bool {
        self.app.active == self.coord
    }

    fn is_lost(&self) -> bool {
        self.app.board.status() == Status::Lost
    }

    fn is_detonated(&self) -> bool {
        self.app.board.detonated() == Some(self.coord)
    }

    fn block(&self) -> Block<'static> {
        Block::default()
            .borders(Borders::ALL)
            .style(
                Style::default()
                    .bg(Color::Black)
                    .fg(if self.is_active() {
                        Color::Cyan
                    } else if self.is_lost() && self.tile.is_mine() {
                        Color::LightRed
                    } else {
                        Color::White
                    })
                    .add_modifier(if self.is_active() || self.is_detonated() {
                        Modifier::BOLD
                    } else {
                        Modifier::empty()
                    }),
            )
            .border_type(if self.is_detonated() {
                BorderType::Thick
            } else {
                BorderType::Rounded
            })
    }

    fn text_style(&self) -> Style {
        let exposed = self.tile.is_revealed() || (self.is_lost() && self.tile.is_mine());
        Style::default()
            .fg(if exposed && self.tile.is_mine() {
                Color::LightYellow
            } else if exposed {
                Color::White
            } else {
                Color::Black
            })
            .bg(if exposed {
                Color::Black
            } else if self.is_active() {
                Color::Cyan
            } else {
                Color::White
            })
    }
}

impl fmt::Display for Cell<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tile = self.tile;
        if tile.is_flagged() {
            f.write_str(FLAG)
        } else if tile.is_mine() && (tile.is_revealed() || self.is_lost()) {
            f.write_str(BOMB)
        } else if tile.is_revealed() && tile.adjacent_mines() > 0 {
            write!(f, "{}", tile.adjacent_mines())
        } else {
            f.write_str(" ")
        }
    }
}

impl App {
    fn new(board: Board) -> Self {
        Self {
            board,
            active: (0, 0),
        }
    }

    fn up(&mut self) {
        self.active.0 = self.active.0.saturating_sub(1);
    }

    fn down(&mut self) {
        self.active.0 += usize::from(self.active.0 + 1 < self.board.rows());
    }

    fn left(&mut self) {
        self.active.1 = self.active.1.saturating_sub(1);
    }

    fn right(&mut self) {
        self.active.1 += usize::from(self.active.1 + 1 < self.board.columns());
    }

    fn cells(&self) -> impl Iterator<Item = Cell<'_>> {
        self.board
            .tiles()
            .map(move |(coord, tile)| Cell::new(self, coord, tile))
    }

    fn reveal_active(&mut self) -> Result<(), Error> {
        let outcome = self.board.reveal(self.active)?;
        if outcome != Reveal::Unchanged {
            debug!(coord = ?self.active, ?outcome, status = ?self.board.status(), "reveal");
        }
        Ok(())
    }

    fn flag_active(&mut self) -> Result<(), Error> {
        if self.board.tile(self.active)?.is_revealed() {
            return Ok(());
        }
        let flagged = self.board.toggle_flag(self.active)?;
        debug!(coord = ?self.active, flagged, "flag");
        Ok(())
    }

    fn restart(&mut self) {
        self.board.reset();
        debug!("restarted");
    }
}

/// Precomputed sizes of the grid area, in terminal cells.
struct Geometry {
    cell_width: usize,
    cell_height: usize,
    grid_width: u16,
    grid_height: u16,
    row_constraints: Vec<Constraint>,
    col_constraints: Vec<Constraint>,
}

impl Geometry {
    fn new(
        rows: usize,
        columns: usize,
        cell_width: usize,
        cell_height: usize,
    ) -> Result<Self, Error> {
        let padding = 1;
        let to_u16 = |value: usize| u16::try_from(value).map_err(Error::ConvertUsizeToU16);

        Ok(Self {
            cell_width,
            cell_height,
            grid_width: to_u16(cell_width.saturating_mul(columns).saturating_add(2 * padding))?,
            grid_height: to_u16(cell_height.saturating_mul(rows).saturating_add(2 * padding))?,
            row_constraints: vec![Constraint::Length(to_u16(cell_height)?); rows],
            col_constraints: vec![Constraint::Length(to_u16(cell_width)?); columns],
        })
    }
}

fn draw_status(frame: &mut Frame, app: &App, area: Rect) {
    let flags = app.board.flag_count();
    let mines = app.board.mines();

    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let ratio = match (flags.to_f64(), mines.to_f64()) {
        (Some(flags), Some(mines)) if mines > 0.0 => (flags / mines).min(1.0),
        _ => 0.0,
    };
    let flags_gauge = Gauge::default()
        .block(
            Block::default().borders(Borders::ALL).title(Span::styled(
                FLAG,
                Style::default()
                    .fg(Color::LightMagenta)
                    .add_modifier(Modifier::BOLD),
            )),
        )
        .gauge_style(
            Style::default()
                .fg(Color::White)
                .bg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .label(format!("{flags} / {mines}"))
        .ratio(ratio);
    frame.render_widget(flags_gauge, halves[0]);

    let mines_text = Paragraph::new(mines.to_string())
        .block(
            Block::default().borders(Borders::ALL).title(Span::styled(
                BOMB,
                Style::default()
                    .fg(Color::LightYellow)
                    .add_modifier(Modifier::BOLD),
            )),
        )
        .alignment(Alignment::Center);
    frame.render_widget(mines_text, halves[1]);
}

fn draw_grid(frame: &mut Frame, app: &App, geometry: &Geometry, area: Rect) {
    frame.render_widget(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded),
        area,
    );

    let row_rects = Layout::default()
        .direction(Direction::Vertical)
        .vertical_margin(1)
        .constraints(geometry.row_constraints.clone())
        .split(area);

    let col_layout = Layout::default()
        .direction(Direction::Horizontal)
        .horizontal_margin(1)
        .constraints(geometry.col_constraints.clone());

    // the top and bottom borders plus the text line are never padding
    let pad_lines = (geometry.cell_height - 3) / 2;
    let pad_line = " ".repeat(geometry.cell_width);

    let rows = row_rects
        .iter()
        .map(|row_rect| col_layout.split(*row_rect))
        .collect::<Vec<_>>();

    for cell in app.cells() {
        let (r, c) = cell.coord;
        let Some(cell_rect) = rows.get(r).and_then(|cols| cols.get(c)) else {
            continue;
        };

        let text_line = format!(
            "{:^length$}",
            cell.to_string(),
            length = geometry.cell_width - 2
        );
        let text = std::iter::repeat(pad_line.as_str())
            .take(pad_lines)
            .chain(std::iter::once(text_line.as_str()))
            .chain(std::iter::repeat(pad_line.as_str()).take(pad_lines))
            .collect::<Vec<_>>()
            .join("\n");

        frame.render_widget(
            Paragraph::new(text)
                .block(cell.block())
                .style(cell.text_style()),
            *cell_rect,
        );
    }
}

fn draw_banner(frame: &mut Frame, status: Status, area: Rect) {
    let (message, color) = match status {
        Status::Playing => return,
        Status::Lost => ("You lose!", Color::Magenta),
        Status::Won => ("You won!", Color::LightGreen),
    };

    let area = centered_rect(24, 4, area);
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(format!("{message}\nr: restart  q: quit"))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Thick)
                    .border_style(Style::default().fg(color).add_modifier(Modifier::BOLD))
                    .style(Style::default().add_modifier(Modifier::BOLD)),
            )
            .alignment(Alignment::Center),
        area,
    );
}

fn draw(frame: &mut Frame, app: &App, geometry: &Geometry) {
    let terminal_rect = frame.size();

    frame.render_widget(
        Block::default()
            .borders(Borders::ALL)
            .title(Span::styled(
                "Minesweeper",
                Style::default()
                    .fg(Color::LightYellow)
                    .add_modifier(Modifier::BOLD),
            ))
            .border_type(BorderType::Rounded),
        terminal_rect,
    );

    let inner = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Min(geometry.grid_height)])
        .split(terminal_rect)[0];

    let horizontal_pad = inner.width.saturating_sub(geometry.grid_width) / 2;
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(horizontal_pad),
            Constraint::Length(geometry.grid_width),
            Constraint::Min(horizontal_pad.saturating_sub(1)),
        ])
        .split(inner);

    let vertical_pad = inner.height.saturating_sub(geometry.grid_height) / 2;
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(vertical_pad),
            Constraint::Length(geometry.grid_height),
            Constraint::Min(vertical_pad),
        ])
        .split(columns[1]);

    let status_rect = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(vertical_pad.saturating_sub(3)),
            Constraint::Length(3),
        ])
        .split(sections[0])[1];
    draw_status(frame, app, status_rect);

    draw_grid(frame, app, geometry, sections[1]);

    let help = List::new(
        align_strings_to_char(&HELP, ':')
            .into_iter()
            .map(|line| {
                format!(
                    "{:^width$}",
                    line,
                    width = usize::from(geometry.grid_width)
                )
            })
            .map(ListItem::new)
            .collect::<Vec<_>>(),
    )
    .block(Block::default().borders(Borders::NONE));
    frame.render_widget(help, sections[2]);

    draw_banner(frame, app.board.status(), sections[1]);
}

impl Ui {
    pub(crate) fn run(self) -> Result<(), Error> {
        let events = Events::new().map_err(Error::SetHandler)?;
        let geometry = Geometry::new(
            self.board.rows(),
            self.board.columns(),
            self.cell_width,
            self.cell_height,
        )?;
        let mut app = App::new(self.board);

        let stdout = io::stdout()
            .into_raw_mode()
            .map_err(Error::GetStdoutInRawMode)?
            .into_alternate_screen()
            .map_err(Error::GetAlternateScreenForMouseTerminal)?;
        let backend = TermionBackend::new(MouseTerminal::from(stdout));
        let mut terminal = Terminal::new(backend).map_err(Error::CreateTerminal)?;

        loop {
            terminal
                .draw(|frame| draw(frame, &app, &geometry))
                .map_err(Error::DrawToTerminal)?;

            let key = match events.next().map_err(Error::GetEvent)? {
                Event::Interrupt => break,
                Event::Input(key) => key,
            };

            let playing = !app.board.status().is_over();
            match key {
                // movement using arrow keys or vim movement keys
                Key::Up | Key::Char('k') => app.up(),
                Key::Down | Key::Char('j') => app.down(),
                Key::Left | Key::Char('h') => app.left(),
                Key::Right | Key::Char('l') => app.right(),
                Key::Char('f') if playing => app.flag_active()?,
                Key::Char(' ') if playing => app.reveal_active()?,
                Key::Char('r') => app.restart(),
                Key::Char('q') | Key::Ctrl('c') => break,
                _ => {}
            }
        }

        Ok(())
    }
}
