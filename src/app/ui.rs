// Handles the rendering of widgets to the terminal frame.

use super::model::{Focus, FolderBrowser, Form, Notice};
use crate::config::Mode;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};

/// Main render function called every frame.
pub fn render(
    f: &mut Frame,
    unit_name: &str,
    form: &Form,
    status: &str,
    notice: Option<&Notice>,
    browser: Option<&mut FolderBrowser>,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(9),
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.area());

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            "Hello Pi Background System Service",
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("  ({})", unit_name), Style::default().fg(Color::Gray)),
    ]));
    f.render_widget(header, chunks[0]);

    render_form(f, chunks[1], form);
    f.render_widget(Paragraph::new(status.to_string()), chunks[2]);
    render_footer(f, chunks[4], browser.is_some());

    if let Some(browser) = browser {
        render_browser(f, browser);
    }

    if let Some(notice) = notice {
        render_notice(f, notice);
    }
}

fn field_style(form: &Form, focus: Focus) -> Style {
    if form.focus == focus {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    }
}

fn render_form(f: &mut Frame, area: Rect, form: &Form) {
    let cursor = |focus: Focus| if form.focus == focus { "_" } else { "" };

    let radios: Vec<Span> = Mode::ALL
        .iter()
        .flat_map(|mode| {
            let mark = if form.selected_mode() == Some(*mode) { "(•)" } else { "( )" };
            [
                Span::styled(
                    format!("{} {}", mark, mode.label()),
                    field_style(form, Focus::Mode),
                ),
                Span::raw("   "),
            ]
        })
        .collect();

    let mut mode_line = vec![Span::raw("Mode:   ")];
    mode_line.extend(radios);
    if form.selected_mode().is_none() {
        mode_line.push(Span::styled(
            format!("[{}]", form.mode),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let update_label = if form.focus == Focus::Update { "[ Update ]" } else { "  Update  " };

    let lines = vec![
        Line::from(vec![
            Span::raw("Folder: "),
            Span::styled(
                format!("{}{}", form.folder, cursor(Focus::Folder)),
                field_style(form, Focus::Folder),
            ),
            Span::styled("  (Enter: Browse…)", Style::default().fg(Color::DarkGray)),
        ]),
        Line::from(""),
        Line::from(mode_line),
        Line::from(""),
        Line::from(vec![
            Span::raw("Note:   "),
            Span::styled(
                format!("{}{}", form.note, cursor(Focus::Note)),
                field_style(form, Focus::Note),
            ),
        ]),
        Line::from(""),
        Line::from(Span::styled(update_label, field_style(form, Focus::Update))),
    ];

    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Service Config "));

    f.render_widget(paragraph, area);
}

fn render_footer(f: &mut Frame, area: Rect, browsing: bool) {
    let help_text = if browsing {
        Line::from(vec![
            Span::raw("Nav: "),
            Span::styled("j/k ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("| Open/Up: "),
            Span::styled("l/h ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("| Select: "),
            Span::styled("s ", Style::default().fg(Color::Cyan)),
            Span::raw("| Close: "),
            Span::styled("Esc", Style::default().fg(Color::Red)),
        ])
    } else {
        Line::from(vec![
            Span::raw("Fields: "),
            Span::styled("Tab ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("| Mode: "),
            Span::styled("←/→ ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("| Service: "),
            Span::styled(
                "^S(start) ^X(stop) ^R(restart) ",
                Style::default().fg(Color::Cyan),
            ),
            Span::raw("| Quit: "),
            Span::styled("Esc/^Q", Style::default().fg(Color::Red)),
        ])
    };

    let paragraph =
        Paragraph::new(help_text).block(Block::default().borders(Borders::ALL).title(" Controls "));

    f.render_widget(paragraph, area);
}

fn render_browser(f: &mut Frame, browser: &mut FolderBrowser) {
    let area = centered_rect(70, 70, f.area());

    f.render_widget(Clear, area);

    let items: Vec<ListItem> = browser
        .entries
        .iter()
        .map(|name| ListItem::new(format!("{}/", name)))
        .collect();

    let title = format!(" {} ", browser.dir.display());
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .bg(Color::DarkGray),
        )
        .highlight_symbol(">> ");

    f.render_stateful_widget(list, area, &mut browser.list_state);
}

fn render_notice(f: &mut Frame, notice: &Notice) {
    let area = centered_rect(60, 40, f.area());

    f.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(format!(" {} ", notice.title));

    let content = vec![
        Line::from(notice.message.as_str()),
        Line::from(""),
        Line::from(Span::styled("Enter/Esc to dismiss", Style::default().fg(Color::DarkGray))),
    ];

    let paragraph = Paragraph::new(content)
        .block(block)
        .wrap(Wrap { trim: false });

    f.render_widget(paragraph, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;
    use ratatui::{Terminal, backend::TestBackend};

    fn screen(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        buffer
            .content()
            .chunks(width)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn renders_form_and_status() {
        let mut terminal = Terminal::new(TestBackend::new(100, 24)).unwrap();
        let form = Form::from_config(&Configuration {
            folder: "/data".into(),
            mode: "mode_b".into(),
            note: "hi".into(),
        });

        terminal
            .draw(|f| render(f, "hello-pi.service", &form, "Status: active", None, None))
            .unwrap();

        let text = screen(&terminal);
        assert!(text.contains("Hello Pi Background System Service"));
        assert!(text.contains("Folder: /data_"));
        assert!(text.contains("(•) Mode B"));
        assert!(text.contains("( ) Mode A"));
        assert!(text.contains("Note:   hi"));
        assert!(text.contains("Status: active"));
    }

    #[test]
    fn unknown_mode_is_shown_verbatim() {
        let mut terminal = Terminal::new(TestBackend::new(100, 24)).unwrap();
        let form = Form::from_config(&Configuration {
            mode: "turbo".into(),
            ..Configuration::default()
        });

        terminal
            .draw(|f| render(f, "hello-pi.service", &form, "", None, None))
            .unwrap();

        assert!(screen(&terminal).contains("[turbo]"));
    }

    #[test]
    fn renders_notice_popup() {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        let form = Form::from_config(&Configuration::default());
        let notice = Notice {
            title: "Restart failed".into(),
            message: "Access denied".into(),
        };

        terminal
            .draw(|f| render(f, "hello-pi.service", &form, "", Some(&notice), None))
            .unwrap();

        let text = screen(&terminal);
        assert!(text.contains(" Restart failed "));
        assert!(text.contains("Access denied"));
    }
}
