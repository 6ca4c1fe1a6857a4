//! Full-screen error view for fatal startup problems.
//!
//! Used for configuration errors and unknown model ids, before the live
//! screen can take over the terminal.

use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Paragraph, Wrap},
};
use std::io::{self, Stdout};

const ERROR_BG: Color = Color::Rgb(120, 20, 20);
const ERROR_FG: Color = Color::Rgb(255, 240, 240);

/// Full-screen error view, dismissed by any key press.
pub struct ErrorScreen {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl ErrorScreen {
    /// Creates the error view and enters alternate screen mode.
    ///
    /// # Errors
    /// - If terminal cannot be initialized
    /// - If raw mode cannot be enabled
    /// - If alternate screen cannot be entered
    pub fn new() -> anyhow::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(ErrorScreen { terminal })
    }

    /// Displays an error message until the user presses any key.
    ///
    /// # Errors
    /// - If terminal rendering fails
    pub fn show_error(&mut self, error_message: &str) -> anyhow::Result<()> {
        loop {
            self.terminal.draw(|frame| {
                let area = frame.area();

                frame.render_widget(
                    Block::default().style(Style::default().bg(ERROR_BG)),
                    area,
                );

                let [_, title_area, message_area, hint_area, _] = Layout::vertical([
                    Constraint::Fill(1),
                    Constraint::Length(2),
                    Constraint::Fill(2),
                    Constraint::Length(1),
                    Constraint::Length(1),
                ])
                .areas(area);

                let title = Paragraph::new(" s o t t o ")
                    .alignment(Alignment::Center)
                    .style(
                        Style::default()
                            .fg(ERROR_FG)
                            .bg(ERROR_BG)
                            .add_modifier(Modifier::BOLD),
                    );
                frame.render_widget(title, title_area);

                let padding_x = message_area.width / 10;
                let message_rect = Rect {
                    x: message_area.x + padding_x,
                    y: message_area.y,
                    width: message_area.width.saturating_sub(padding_x * 2),
                    height: message_area.height,
                };

                let message = Paragraph::new(error_message)
                    .alignment(Alignment::Center)
                    .wrap(Wrap { trim: true })
                    .style(Style::default().fg(ERROR_FG).bg(ERROR_BG));
                frame.render_widget(message, message_rect);

                let hint = Paragraph::new("press any key to dismiss")
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(Color::Rgb(220, 160, 160)).bg(ERROR_BG));
                frame.render_widget(hint, hint_area);
            })?;

            if event::poll(std::time::Duration::from_millis(100))? {
                if let Event::Key(_) = event::read()? {
                    break;
                }
            }
        }

        Ok(())
    }

    /// Cleans up terminal state and exits alternate screen mode.
    ///
    /// # Errors
    /// - If terminal mode cannot be disabled
    /// - If cursor cannot be shown
    pub fn cleanup(&mut self) -> anyhow::Result<()> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for ErrorScreen {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}
