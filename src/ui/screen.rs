//! The live dictation screen.
//!
//! Renders one of two mutually exclusive layouts driven by engine readiness:
//! a model-loading view with a progress bar and rounded percentage, or the
//! interactive view with the pulsing microphone indicator, a live input
//! visualization, and the committed/tentative transcript panel.

use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::{Gauge, Paragraph, Sparkline, Wrap},
};
use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};

use super::viz::{level_percent, LevelHistory, SpectrumAnalyzer};
use crate::config::VisualizationType;
use crate::session::RecordingState;

/// User input command on the live screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenCommand {
    /// Keep going (no key pressed)
    Continue,
    /// Toggle recording (Space or Enter)
    Toggle,
    /// Clear the transcript ('c')
    Clear,
    /// Copy the transcript to the clipboard ('y')
    CopyTranscript,
    /// Exit the screen (Escape, 'q', or Ctrl+C)
    Quit,
}

/// Everything the screen needs to draw one frame.
pub struct ViewModel<'a> {
    pub ready: bool,
    pub progress: f32,
    pub failure: Option<&'a str>,
    pub state: RecordingState,
    pub pulse_scale: f32,
    pub level: f32,
    pub latest_chunk: &'a [f32],
    pub recording_elapsed: Option<Duration>,
    pub committed: &'a str,
    pub tentative: &'a str,
}

/// Terminal UI for the live dictation screen.
pub struct LiveScreen {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    history: LevelHistory,
    spectrum: SpectrumAnalyzer,
    visualization: VisualizationType,
    reference_level_db: i8,
    sample_rate: u32,
    terminal_width: usize,
    last_sample_time: Instant,
    sample_interval: Duration,
}

impl LiveScreen {
    /// Creates the screen and enters alternate screen mode.
    ///
    /// # Errors
    /// - If terminal cannot be initialized
    /// - If raw mode cannot be enabled
    /// - If alternate screen cannot be entered
    pub fn new(
        visualization: VisualizationType,
        reference_level_db: i8,
        sample_rate: u32,
    ) -> anyhow::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        let size = terminal.size()?;
        let terminal_width = size.width as usize;

        Ok(LiveScreen {
            terminal,
            history: LevelHistory::new(terminal_width),
            spectrum: SpectrumAnalyzer::new(terminal_width),
            visualization,
            reference_level_db,
            sample_rate,
            terminal_width,
            last_sample_time: Instant::now(),
            sample_interval: Duration::from_millis(50),
        })
    }

    /// Processes user input and returns the appropriate screen command.
    ///
    /// # Errors
    /// - If event polling fails
    pub fn handle_input(&mut self) -> anyhow::Result<ScreenCommand> {
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                return Ok(match key.code {
                    KeyCode::Char(' ') | KeyCode::Enter => {
                        tracing::debug!("Toggle key pressed");
                        ScreenCommand::Toggle
                    }
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        tracing::debug!("Ctrl+C pressed: exiting");
                        ScreenCommand::Quit
                    }
                    KeyCode::Char('c') => {
                        tracing::debug!("Clear key pressed");
                        ScreenCommand::Clear
                    }
                    KeyCode::Char('y') => {
                        tracing::debug!("Copy key pressed");
                        ScreenCommand::CopyTranscript
                    }
                    KeyCode::Char('q') | KeyCode::Esc => {
                        tracing::debug!("Quit key pressed");
                        ScreenCommand::Quit
                    }
                    _ => ScreenCommand::Continue,
                });
            }
        }
        Ok(ScreenCommand::Continue)
    }

    /// Renders one frame.
    ///
    /// # Errors
    /// - If terminal rendering fails
    pub fn render(&mut self, view: &ViewModel) -> anyhow::Result<()> {
        let size = self.terminal.size()?;
        let current_width = size.width as usize;
        if current_width != self.terminal_width {
            self.terminal_width = current_width;
            self.history.resize(current_width);
            self.spectrum.resize(current_width);
        }

        if !view.ready {
            self.render_loading(view)?;
        } else {
            self.update_visualization(view);
            self.render_interactive(view)?;
        }
        Ok(())
    }

    fn update_visualization(&mut self, view: &ViewModel) {
        match self.visualization {
            VisualizationType::Waveform => {
                if self.last_sample_time.elapsed() >= self.sample_interval {
                    let level = if view.state == RecordingState::Recording {
                        level_percent(view.level, self.reference_level_db)
                    } else {
                        0
                    };
                    self.history.push(level);
                    self.last_sample_time = Instant::now();
                }
            }
            VisualizationType::Spectrum => {
                if view.state == RecordingState::Recording {
                    self.spectrum
                        .update(view.latest_chunk, self.sample_rate, self.reference_level_db);
                } else {
                    self.spectrum.update(&[], self.sample_rate, self.reference_level_db);
                }
            }
        }
    }

    fn render_loading(&mut self, view: &ViewModel) -> anyhow::Result<()> {
        let label = progress_label(view.progress);
        let ratio = view.progress.clamp(0.0, 1.0) as f64;
        let failure = view.failure.map(str::to_string);

        self.terminal.draw(|frame| {
            let area = frame.area();

            let [_, title_area, gauge_area, percent_area, hint_area, _] = Layout::vertical([
                Constraint::Fill(1),
                Constraint::Length(2),
                Constraint::Length(1),
                Constraint::Length(2),
                Constraint::Length(2),
                Constraint::Fill(1),
            ])
            .areas(area);

            let title = Paragraph::new("Loading speech model…")
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::Rgb(206, 224, 220)));
            frame.render_widget(title, title_area);

            let gauge_width = (area.width * 60) / 100;
            let gauge_x = area.x + (area.width.saturating_sub(gauge_width)) / 2;
            let gauge_rect = Rect {
                x: gauge_x,
                y: gauge_area.y,
                width: gauge_width.max(10),
                height: 1,
            };
            let gauge = Gauge::default()
                .ratio(ratio)
                .label(label.clone())
                .gauge_style(Style::default().fg(Color::Rgb(185, 207, 212)).bg(Color::Rgb(40, 40, 40)));
            frame.render_widget(gauge, gauge_rect);

            let percent = Paragraph::new(label.clone())
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::Rgb(185, 207, 212)));
            frame.render_widget(percent, percent_area);

            if let Some(message) = &failure {
                let hint = Paragraph::new(format!(
                    "Model preparation failed — see 'sotto logs'\n{message}"
                ))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .style(Style::default().fg(Color::Red));
                frame.render_widget(hint, hint_area);
            }
        })?;

        Ok(())
    }

    fn render_interactive(&mut self, view: &ViewModel) -> anyhow::Result<()> {
        let viz_data: Vec<u64> = match self.visualization {
            VisualizationType::Waveform => self.history.data().to_vec(),
            VisualizationType::Spectrum => self.spectrum.data().to_vec(),
        };
        let level = level_percent(view.level, self.reference_level_db);

        self.terminal.draw(|frame| {
            let area = frame.area();

            let viz_height = (area.height / 4).max(2);
            let [viz_area, mic_area, transcript_area, footer_area] = Layout::vertical([
                Constraint::Length(viz_height),
                Constraint::Length(2),
                Constraint::Min(3),
                Constraint::Length(1),
            ])
            .areas(area);

            let sparkline = Sparkline::default().data(&viz_data).max(100).style(
                Style::default()
                    .bg(Color::Rgb(0, 0, 0))
                    .fg(Color::Rgb(206, 224, 220)),
            );
            frame.render_widget(sparkline, viz_area);

            let mic = Paragraph::new(mic_indicator(view.state, view.pulse_scale))
                .alignment(Alignment::Center);
            frame.render_widget(mic, mic_area);

            let transcript = transcript_lines(view.committed, view.tentative);
            let text_height: usize = transcript
                .iter()
                .map(|line| {
                    let len = line.width();
                    len.div_ceil(transcript_area.width.max(1) as usize).max(1)
                })
                .sum();
            let scroll = text_height.saturating_sub(transcript_area.height as usize) as u16;
            let panel = Paragraph::new(transcript)
                .wrap(Wrap { trim: false })
                .scroll((scroll, 0));
            frame.render_widget(panel, transcript_area);

            let footer = footer_line(view, level);
            let footer_widget = Paragraph::new(footer).style(
                Style::default()
                    .fg(Color::Rgb(185, 207, 212))
                    .bg(Color::Rgb(0, 0, 0)),
            );
            frame.render_widget(footer_widget, footer_area);
        })?;

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

/// Percentage label for the loading view: progress 0.42 renders as "42%".
pub(crate) fn progress_label(progress: f32) -> String {
    format!("{}%", (progress * 100.0).round() as u32)
}

/// Breathing room around the indicator dot, derived from the pulse scale.
fn pulse_pad(scale: f32) -> usize {
    (((scale - 0.9) / 0.2) * 4.0).round().clamp(0.0, 4.0) as usize
}

fn mic_indicator(state: RecordingState, pulse_scale: f32) -> Vec<Line<'static>> {
    match state {
        RecordingState::Recording => {
            let pad = " ".repeat(pulse_pad(pulse_scale));
            vec![
                Line::from(Span::styled(
                    format!("({pad}●{pad})"),
                    Style::default()
                        .fg(Color::Rgb(255, 68, 68))
                        .add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    "recording — press space to stop",
                    Style::default().fg(Color::Rgb(255, 120, 120)),
                )),
            ]
        }
        RecordingState::Idle => vec![
            Line::from(Span::styled(
                "( ○ )",
                Style::default().fg(Color::Rgb(150, 150, 150)),
            )),
            Line::from(Span::styled(
                "press space to dictate",
                Style::default().fg(Color::Rgb(120, 120, 120)),
            )),
        ],
    }
}

fn transcript_lines(committed: &str, tentative: &str) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    if committed.is_empty() && tentative.is_empty() {
        lines.push(Line::from(Span::styled(
            "transcript will appear here",
            Style::default().fg(Color::Rgb(90, 90, 90)),
        )));
        return lines;
    }

    if !committed.is_empty() {
        lines.push(Line::from(Span::styled(
            "Committed",
            Style::default()
                .fg(Color::Rgb(76, 175, 80))
                .add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(Span::styled(
            committed.to_string(),
            Style::default().fg(Color::Rgb(230, 230, 230)),
        )));
    }

    if !tentative.is_empty() {
        if !committed.is_empty() {
            lines.push(Line::from(""));
        }
        lines.push(Line::from(Span::styled(
            "Speaking",
            Style::default()
                .fg(Color::Rgb(255, 152, 0))
                .add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(Span::styled(
            tentative.to_string(),
            Style::default()
                .fg(Color::Rgb(200, 200, 200))
                .add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

fn footer_line(view: &ViewModel, level: u8) -> Line<'static> {
    let indicator = match view.state {
        RecordingState::Recording => Span::styled("● ", Style::default().fg(Color::Red)),
        RecordingState::Idle => Span::styled("○ ", Style::default().fg(Color::DarkGray)),
    };

    let duration = view
        .recording_elapsed
        .map(|d| {
            let secs = d.as_secs();
            format!("{}:{:02}", secs / 60, secs % 60)
        })
        .unwrap_or_else(|| "-:--".to_string());

    Line::from(vec![
        indicator,
        Span::raw(duration),
        Span::raw(" / "),
        Span::raw(format!("{level}%")),
        Span::raw("  ·  space toggle · c clear · y copy · q quit"),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_label_rounds_to_whole_percent() {
        assert_eq!(progress_label(0.42), "42%");
        assert_eq!(progress_label(0.0), "0%");
        assert_eq!(progress_label(1.0), "100%");
        assert_eq!(progress_label(0.999), "100%");
        assert_eq!(progress_label(0.054), "5%");
    }

    #[test]
    fn pulse_pad_tracks_scale_band() {
        assert_eq!(pulse_pad(0.9), 0);
        assert_eq!(pulse_pad(1.0), 2);
        assert_eq!(pulse_pad(1.1), 4);
    }

    #[test]
    fn transcript_shows_placeholder_when_empty() {
        let lines = transcript_lines("", "");
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn transcript_sections_present_when_populated() {
        let lines = transcript_lines("Hello world. ", "how are");
        let text: Vec<String> = lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.clone()).collect())
            .collect();
        assert!(text.iter().any(|l| l.contains("Committed")));
        assert!(text.iter().any(|l| l.contains("Speaking")));
        assert!(text.iter().any(|l| l.contains("Hello world.")));
    }
}
