use crate::{Cell, TermInt, TermCoords};
use std::{io::{Stdout, Write, stdout}, time::Duration};

use crossterm::{cursor, execute, queue, style, terminal};
use crossterm::style::Color;
use crossterm::terminal::{ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::event::{Event, KeyCode, KeyEvent, read, poll};
use log::debug;
use rand::Rng;

use crate::app::{GameOverSummary, Presentation};
use crate::board::Board;
use crate::entities::{Palette, PowerUpKind};
use crate::error::{Error, Result};
use crate::game::Frame;
use crate::input::{command_for, is_ctrl_c, Command};

const SNAKE_BODY_CHAR: char = '█';
const STAR_COUNT: usize = 60;
const NAME_INPUT_CAP: usize = 24;

type Glyph = (char, Color);
const BLANK: Glyph = (' ', Color::Reset);

/// crossterm-backed screen. Keeps a copy of everything drawn so message boxes
/// can be hidden without redrawing the board.
pub struct TermManager {
    width: TermInt,
    height: TermInt,
    stdout: Stdout,
    screen: Vec<Glyph>,
    current_msg: Option<Message>,
    board_origin: TermCoords,
    board_cols: TermInt,
    board_rows: TermInt,
    borders_drawn: bool,
}

struct Message {
    top_left: TermCoords,
    width: TermInt,
    height: TermInt,
}

impl TermManager {
    pub fn new(board: &Board) -> Result<Self> {
        let (width, height) = terminal::size().map_err(Error::terminal)?;
        let board_cols = board.columns() as TermInt;
        let board_rows = board.rows() as TermInt;

        // Two columns per cell, a border all round and a status line below.
        let need_w = board_cols * 2 + 2;
        let need_h = board_rows + 3;
        if width < need_w || height < need_h {
            return Err(Error::TerminalTooSmall { have_w: width, have_h: height, need_w, need_h });
        }

        let board_origin = ((width - need_w) / 2, (height - need_h) / 2);
        let screen = vec![BLANK; width as usize * height as usize];
        Ok(TermManager {
            width,
            height,
            stdout: stdout(),
            screen,
            current_msg: None,
            board_origin,
            board_cols,
            board_rows,
            borders_drawn: false,
        })
    }

    pub fn setup(&mut self) -> Result<()> {
        execute!(self.stdout, EnterAlternateScreen).map_err(Error::terminal)?;
        terminal::enable_raw_mode().map_err(Error::terminal)?;
        execute!(self.stdout, cursor::Hide, cursor::DisableBlinking).map_err(Error::terminal)?;
        Ok(())
    }

    pub fn restore(&mut self) -> Result<()> {
        terminal::disable_raw_mode().map_err(Error::terminal)?;
        execute!(self.stdout, style::ResetColor, cursor::Show, cursor::EnableBlinking, LeaveAlternateScreen)
            .map_err(Error::terminal)?;
        Ok(())
    }

    pub fn read_key_blocking(&self) -> Result<KeyEvent> {
        loop {
            if let Event::Key(ev) = read().map_err(Error::terminal)? {
                return Ok(ev);
            }
        }
    }

    /// Waits up to `timeout` for the first key, then drains whatever else is queued.
    pub fn read_key_events_queue(&self, timeout: Duration) -> Result<Vec<KeyEvent>> {
        let mut events = vec![];
        let mut wait = timeout;

        while poll(wait).map_err(Error::terminal)? {
            if let Event::Key(ev) = read().map_err(Error::terminal)? {
                events.push(ev);
            }
            wait = Duration::from_millis(0);
        }

        Ok(events)
    }

    pub fn draw_borders(&mut self) -> Result<()> {
        let (ox, oy) = self.board_origin;
        let end_x = ox + self.board_cols * 2 + 1;
        let end_y = oy + self.board_rows + 1;

        for x in ox..=end_x {
            let ch = if x == ox || x == end_x {'+'} else {'-'};
            self.print_at((x, oy), (ch, Color::DarkGrey))?;
            self.print_at((x, end_y), (ch, Color::DarkGrey))?;
        }

        for y in oy + 1..end_y {
            self.print_at((ox, y), ('|', Color::DarkGrey))?;
            self.print_at((end_x, y), ('|', Color::DarkGrey))?;
        }

        self.borders_drawn = true;
        self.flush()
    }

    pub fn show_message(&mut self, lines: &[&str]) -> Result<()> {
        if self.has_message() {
            self.hide_message()?;
        }

        let msg_height = (lines.len() + 2) as TermInt;
        let longest = lines.iter().map(|x| x.chars().count()).max().unwrap_or(0);
        let msg_width = ((longest + 2) as TermInt).min(self.width);
        let center = (self.width / 2, self.height / 2);
        let top_left = (center.0.saturating_sub(msg_width / 2), center.1.saturating_sub(msg_height / 2));

        // Print the top and bottom empty lines
        for y in [top_left.1, top_left.1 + msg_height - 1].iter() {
            for x_diff in 0..msg_width {
                self.print_at_no_save((top_left.0 + x_diff, *y), ' ')?;
            }
        }

        // Print the message lines
        for (i, line) in lines.iter().enumerate() {
            let padded_line = format!("{line: ^width$}", line = line, width = msg_width as usize);
            let y = top_left.1 + i as TermInt + 1;
            for (x_diff, ch) in padded_line.chars().take(msg_width as usize).enumerate() {
                self.print_at_no_save((top_left.0 + x_diff as TermInt, y), ch)?;
            }
        }

        self.current_msg = Some(Message::new(msg_width, msg_height, top_left));
        self.flush()
    }

    pub fn hide_message(&mut self) -> Result<()> {
        let msg = match self.current_msg.take() {
            Some(msg) => msg,
            None => return Ok(()),
        };
        let top_left = msg.top_left();

        // Restore the content from the screen buffer
        for y_diff in 0..msg.height() {
            for x_diff in 0..msg.width() {
                let (x, y) = (top_left.0 + x_diff, top_left.1 + y_diff);
                if x >= self.width || y >= self.height {
                    continue;
                }
                let glyph = self.screen[self.index((x, y))];
                self.queue_glyph((x, y), glyph)?;
            }
        }

        self.flush()
    }

    pub fn print_at(&mut self, pos: TermCoords, glyph: Glyph) -> Result<()> {
        self.queue_glyph(pos, glyph)?;
        let idx = self.index(pos);
        self.screen[idx] = glyph;
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        execute!(self.stdout, terminal::Clear(ClearType::All)).map_err(Error::terminal)?;
        self.screen = vec![BLANK; self.width as usize * self.height as usize];
        self.current_msg = None;
        self.borders_drawn = false;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.stdout.flush()?;
        Ok(())
    }

    pub fn has_message(&self) -> bool {
        self.current_msg.is_some()
    }

    ///////////////////////////////////////////////////////////////////////////

    /// Only writes when the glyph differs from what is already on screen.
    fn put(&mut self, pos: TermCoords, glyph: Glyph) -> Result<()> {
        if self.screen[self.index(pos)] == glyph {
            return Ok(());
        }
        self.print_at(pos, glyph)
    }

    fn print_at_no_save(&mut self, pos: TermCoords, ch: char) -> Result<()> {
        // Message boxes bypass the buffer so hide_message can restore what was under them.
        self.queue_glyph(pos, (ch, Color::White))
    }

    fn queue_glyph(&mut self, pos: TermCoords, glyph: Glyph) -> Result<()> {
        queue!(self.stdout, cursor::MoveTo(pos.0, pos.1), style::SetForegroundColor(glyph.1), style::Print(glyph.0))
            .map_err(Error::terminal)
    }

    fn index(&self, pos: TermCoords) -> usize {
        self.width as usize * pos.1 as usize + pos.0 as usize
    }

    fn cell_to_term(&self, board: &Board, cell: Cell) -> Option<TermCoords> {
        if board.is_out_of_bounds(cell) {
            return None;
        }
        let (col, row) = board.to_grid(cell);
        let (ox, oy) = self.board_origin;
        Some((ox + 1 + col as TermInt * 2, oy + 1 + row as TermInt))
    }

    fn draw_stars(&mut self) -> Result<()> {
        let mut rng = rand::thread_rng();
        for _ in 0..STAR_COUNT {
            let pos = (rng.gen_range(0..self.width), rng.gen_range(0..self.height));
            let glyph = if rng.gen_bool(0.2) {('*', Color::White)} else {('.', Color::DarkGrey)};
            self.print_at(pos, glyph)?;
        }
        self.flush()
    }

    fn draw_status(&mut self, status: &str) -> Result<()> {
        let (ox, oy) = self.board_origin;
        let y = oy + self.board_rows + 2;
        let width = (self.board_cols * 2 + 2) as usize;
        let line = format!("{:<width$}", status, width = width);

        for (i, ch) in line.chars().take(width).enumerate() {
            self.put((ox + i as TermInt, y), (ch, Color::White))?;
        }
        Ok(())
    }
}

impl Presentation for TermManager {
    fn show_title(&mut self) -> Result<()> {
        self.clear()?;
        self.draw_stars()?;
        self.show_message(&[
            "S P A C E   S N A K E",
            "",
            "Arrow keys or WASD to move",
            "Space or Esc to pause",
            "",
            "Enter to start, q to quit",
        ])
    }

    fn redraw(&mut self, frame: &Frame<'_>) -> Result<()> {
        if self.current_msg.is_some() {
            self.hide_message()?;
        }
        if !self.borders_drawn {
            self.clear()?;
            self.draw_borders()?;
        }

        let snake_color = match frame.effect {
            Some(PowerUpKind::Invincible) => Color::Yellow,
            Some(PowerUpKind::Speed) => Color::Cyan,
            _ => Color::Green,
        };

        let mut cells = vec![[BLANK; 2]; self.board_cols as usize * self.board_rows as usize];
        let slot = |board: &Board, cell: Cell| -> Option<usize> {
            if board.is_out_of_bounds(cell) {
                return None;
            }
            let (col, row) = board.to_grid(cell);
            Some(row as usize * board.columns() as usize + col as usize)
        };

        let apple_color = match frame.apple.style.palette {
            Palette::Ocean => Color::Blue,
            Palette::Rust => Color::DarkYellow,
            Palette::Rock => Color::Grey,
            Palette::Magma => Color::Red,
        };
        if let Some(i) = slot(frame.board, frame.apple.position) {
            cells[i] = [('(', apple_color), (')', apple_color)];
        }

        if let Some(power_up) = frame.power_up {
            let color = match power_up.kind {
                PowerUpKind::Invincible => Color::Yellow,
                PowerUpKind::Speed => Color::Cyan,
                PowerUpKind::BonusPoints => Color::Magenta,
            };
            if let Some(i) = slot(frame.board, power_up.position) {
                cells[i] = [(power_up.kind.symbol(), color), (power_up.kind.symbol(), color)];
            }
        }

        let body = frame.snake.body();
        for (n, cell) in body.iter().enumerate() {
            if let Some(i) = slot(frame.board, *cell) {
                cells[i] = if n == body.len() - 1 {
                    let head = frame.snake.head_char();
                    [(head, snake_color), (head, snake_color)]
                } else {
                    [(SNAKE_BODY_CHAR, snake_color); 2]
                };
            }
        }

        for cell in frame.board.cells() {
            if let (Some(i), Some(pos)) = (slot(frame.board, cell), self.cell_to_term(frame.board, cell)) {
                let [left, right] = cells[i];
                self.put(pos, left)?;
                self.put((pos.0 + 1, pos.1), right)?;
            }
        }

        self.draw_status(&frame.status)?;
        self.flush()
    }

    fn show_paused(&mut self, paused: bool, status: &str) -> Result<()> {
        if paused {
            self.show_message(&["Paused", status, "", "Space or Esc to resume", "q to quit"])
        } else {
            self.hide_message()
        }
    }

    fn poll_commands(&mut self, timeout: Duration) -> Result<Vec<Command>> {
        let events = self.read_key_events_queue(timeout)?;
        Ok(events.iter().filter_map(command_for).collect())
    }

    fn wait_command(&mut self) -> Result<Command> {
        loop {
            if let Some(command) = command_for(&self.read_key_blocking()?) {
                return Ok(command);
            }
        }
    }

    fn prompt_name(&mut self, prompt: &str) -> Result<Option<String>> {
        let mut input = String::new();

        loop {
            let field = format!("> {}_", input);
            self.show_message(&[prompt, "", &field, "", "Enter to confirm, Esc to skip"])?;

            let ev = self.read_key_blocking()?;
            if is_ctrl_c(&ev) {
                self.hide_message()?;
                return Ok(None);
            }

            match ev.code {
                KeyCode::Enter => {
                    self.hide_message()?;
                    debug!("Name entered: {:?}", input);
                    return Ok(Some(input));
                }
                KeyCode::Esc => {
                    self.hide_message()?;
                    return Ok(None);
                }
                KeyCode::Backspace => {
                    input.pop();
                }
                KeyCode::Char(c) if input.chars().count() < NAME_INPUT_CAP => input.push(c),
                _ => {}
            }
        }
    }

    fn show_notice(&mut self, message: &str) -> Result<()> {
        self.show_message(&[message, "", "Press any key"])?;
        self.read_key_blocking()?;
        self.hide_message()
    }

    fn show_game_over(&mut self, summary: &GameOverSummary) -> Result<()> {
        let title = if summary.won {"You won!"} else {"Game over!"};
        let mut lines = vec![
            title.to_string(),
            format!("Final score: {}", summary.score),
            format!("Apples eaten: {}", summary.apples_eaten),
        ];
        if summary.new_record {
            lines.push("NEW RECORD!".to_string());
        }

        lines.push(String::new());
        lines.push("Top 3 Scores:".to_string());
        if summary.table.is_empty() {
            lines.push("No records yet".to_string());
        }
        for (i, entry) in summary.table.iter().enumerate() {
            lines.push(format!("{}. {}: {}", i + 1, entry.name, entry.score));
        }

        lines.push(String::new());
        lines.push("r to play again, q to quit".to_string());

        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        self.show_message(&refs)
    }
}

impl Message {
    pub fn new(width: TermInt, height: TermInt, top_left: TermCoords) -> Self {
        Message { width, height, top_left }
    }

    pub fn width(&self) -> TermInt {
        self.width
    }

    pub fn height(&self) -> TermInt {
        self.height
    }

    pub fn top_left(&self) -> TermCoords {
        self.top_left
    }
}
