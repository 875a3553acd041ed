use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use crate::app::{sender_label, App, InputMode, Screen};
use crate::chat::{ChatState, Sender};

pub const PROJECT_URL: &str = "https://github.com/NT1906/Talk2DAU.git";

const SPINNER: [&str; 3] = ["◐", "◓", "◑"];
const TYPING: [&str; 3] = ["●∙∙", "∙●∙", "∙∙●"];

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.screen {
        Screen::Landing => render_landing(frame, body_area),
        Screen::Chat => render_chat(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let mut spans = vec![
        Span::styled(" Talk 2 DAU ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ];

    if app.screen == Screen::Chat {
        spans.push(Span::styled(
            format!("  {}", app.backend_url),
            Style::default().fg(Color::Gray),
        ));
        if app.chat.is_reprocessing() {
            let frame_idx = app.animation_frame as usize % SPINNER.len();
            spans.push(Span::styled(
                format!("  {} Reprocessing documents", SPINNER[frame_idx]),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ));
        }
    }

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match (app.screen, app.input_mode) {
        (Screen::Landing, _) => (" HOME ", Style::default().bg(Color::Blue).fg(Color::White)),
        (Screen::Chat, InputMode::Normal) => {
            (" CHAT ", Style::default().bg(Color::Blue).fg(Color::White))
        }
        (Screen::Chat, InputMode::Editing) => {
            (" TYPE ", Style::default().bg(Color::Yellow).fg(Color::Black))
        }
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let reprocess_label = if app.chat.is_reprocessing() {
        " reprocessing… "
    } else {
        " reprocess "
    };

    let hints = match (app.screen, app.input_mode) {
        (Screen::Landing, _) => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" start chatting ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
        (Screen::Chat, InputMode::Editing) => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(if app.chat.can_send() { " send " } else { " (send) " }, label_style),
            Span::styled(" ^R ", key_style),
            Span::styled(reprocess_label, label_style),
            Span::styled(" PgUp/PgDn ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" done ", label_style),
        ],
        (Screen::Chat, InputMode::Normal) => vec![
            Span::styled(" i ", key_style),
            Span::styled(" type ", label_style),
            Span::styled(" r ", key_style),
            Span::styled(reprocess_label, label_style),
            Span::styled(" j/k ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" g/G ", key_style),
            Span::styled(" top/bottom ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" home ", label_style),
        ],
    };

    let mut spans = vec![Span::styled(mode_text, mode_style)];
    spans.extend(hints);

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_landing(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let text = Text::from(vec![
        Line::default(),
        Line::from(Span::styled(
            "Everything You Need.",
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "Before You Ask.",
            Style::default().fg(Color::LightRed).add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from(
            "Talk 2 DAU is your AI assistant for Dhirubhai Ambani University. \
             Get instant answers about courses, campus life, and more, in real time.",
        ),
        Line::default(),
        Line::from(Span::styled(
            "[ Start Chatting ]  press Enter",
            Style::default().fg(Color::Black).bg(Color::LightRed).add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from(Span::styled(PROJECT_URL, Style::default().fg(Color::DarkGray))),
    ]);

    // Vertically centre the hero block
    let content_height = text.height() as u16 + 4;
    let [_, hero_area, _] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(content_height),
        Constraint::Fill(1),
    ])
    .areas(area);

    let hero = Paragraph::new(text)
        .block(block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(hero, hero_area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);
    app.sync_scroll();

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if app.input_mode == InputMode::Normal {
            Color::Cyan
        } else {
            Color::DarkGray
        }))
        .title(" Conversation ");

    let chat = conversation(&app.chat, app.animation_frame)
        .block(chat_block)
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, chat_area);

    render_input(app, frame, input_area);
}

/// The conversation as rendered, without its border.
///
/// `App` measures this same paragraph with `line_count` to find the bottom.
pub fn conversation(chat: &ChatState, animation_frame: u8) -> Paragraph<'static> {
    let text = if chat.messages().is_empty() && !chat.is_loading() {
        Text::from(Span::styled(
            "Ask anything about admissions, courses or campus life...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line<'static>> = Vec::new();

        for msg in chat.messages() {
            let (alignment, label_style, text_style) = match msg.sender {
                Sender::User => (
                    Alignment::Right,
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    Style::default().fg(Color::Cyan),
                ),
                Sender::Ai => (
                    Alignment::Left,
                    Style::default().fg(Color::LightBlue).add_modifier(Modifier::BOLD),
                    Style::default(),
                ),
            };

            let label = Span::styled(sender_label(msg.sender), label_style);
            lines.push(Line::from(label).alignment(alignment));
            if msg.text.is_empty() {
                lines.push(Line::default());
            }
            for line in msg.text.lines() {
                let span = Span::styled(line.to_string(), text_style);
                lines.push(Line::from(span).alignment(alignment));
            }
            lines.push(Line::default());
        }

        if chat.is_loading() {
            lines.push(Line::from(Span::styled(
                sender_label(Sender::Ai),
                Style::default().fg(Color::LightBlue).add_modifier(Modifier::BOLD),
            )));
            let frame_idx = animation_frame as usize % TYPING.len();
            lines.push(Line::from(Span::styled(
                TYPING[frame_idx],
                Style::default().fg(Color::LightBlue),
            )));
        }

        Text::from(lines)
    };

    Paragraph::new(text).wrap(Wrap { trim: false })
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let busy = app.chat.is_loading();

    let border_color = if busy {
        Color::DarkGray
    } else if editing {
        Color::Yellow
    } else {
        Color::Gray
    };
    let title = if busy { " Waiting for reply... " } else { " Type your message... " };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.chat.cursor();

    // Calculate scroll offset to keep cursor visible
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app.chat
        .input()
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let text_style = if busy {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Cyan)
    };
    let input = Paragraph::new(visible_text)
        .style(text_style)
        .block(input_block);

    frame.render_widget(input, area);

    // Show cursor only while the field accepts input and has room for it
    if editing && !busy && inner_width > 0 {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::tests::FakeBackend;
    use ratatui::{backend::TestBackend, layout::Position, Terminal};
    use std::sync::Arc;
    use std::time::Duration;

    fn screen_text(app: &mut App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        let mut out = String::new();
        for row in buffer.content.chunks(width as usize) {
            for cell in row {
                out.push_str(cell.symbol());
            }
            out.push('\n');
        }
        out
    }

    fn app() -> App {
        App::new(Arc::new(FakeBackend::replying("")), "http://localhost:8000")
    }

    #[test]
    fn test_landing_shows_hero() {
        let mut app = app();
        let text = screen_text(&mut app, 100, 24);
        assert!(text.contains("Everything You Need."));
        assert!(text.contains("Before You Ask."));
        assert!(text.contains("Start Chatting"));
    }

    #[test]
    fn test_chat_renders_messages_and_typing_indicator() {
        let mut app = app();
        app.open_chat();
        app.chat.set_input("When is the next admission deadline?");
        app.chat.begin_send();
        app.chat.finish_send(Ok("Admissions close March 1.".to_string()));
        app.chat.set_input("And fees?");
        app.chat.begin_send();

        let text = screen_text(&mut app, 80, 20);
        assert!(text.contains("When is the next admission deadline?"));
        assert!(text.contains("Admissions close March 1."));
        assert!(text.contains("Waiting for reply"));
        assert!(TYPING.iter().any(|dots| text.contains(dots)));
    }

    #[test]
    fn test_header_shows_reprocess_indicator() {
        let mut app = app();
        app.open_chat();
        app.chat.begin_reprocess();
        let text = screen_text(&mut app, 100, 10);
        assert!(text.contains("Reprocessing documents"));
    }

    #[test]
    fn test_long_conversation_follows_bottom() {
        let mut app = app();
        app.open_chat();
        for i in 0..15 {
            app.chat.set_input(format!("question number {}", i));
            app.chat.begin_send();
            app.chat.finish_send(Ok(format!("answer number {}", i)));
        }
        app.scroll_to_bottom();
        let text = screen_text(&mut app, 60, 16);
        assert!(text.contains("answer number 14"));
        assert!(!text.contains("answer number 0 "));
    }

    /// Five finished exchanges, then one more sent through the backend.
    async fn converse_then_send(reply: impl Fn(usize) -> String) -> App {
        let mut app = App::new(Arc::new(FakeBackend::replying(&reply(5))), "http://localhost:8000");
        app.open_chat();
        for i in 0..5 {
            app.chat.set_input(format!("q{}", i));
            app.chat.begin_send();
            app.chat.finish_send(Ok(reply(i)));
        }

        app.chat.set_input("q5");
        app.submit();
        for _ in 0..200 {
            app.poll_tasks().await;
            if !app.has_pending_tasks() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(!app.chat.is_loading());
        app.scroll_to_bottom();
        app
    }

    #[tokio::test]
    async fn test_word_wrapped_reply_tail_is_visible() {
        let reply = |i: usize| format!("aaaaaa bbbbbb cccccc dddddd eeeeee ffffff gg END{}", i);
        let mut app = converse_then_send(reply).await;
        let text = screen_text(&mut app, 14, 16);
        assert!(text.contains("END5"), "last reply cut off:\n{}", text);
    }

    #[tokio::test]
    async fn test_wide_character_reply_tail_is_visible() {
        let reply = |i: usize| format!("入学 締切 は 三月 一日 です END{}", i);
        let mut app = converse_then_send(reply).await;
        let text = screen_text(&mut app, 14, 16);
        assert!(text.contains("END5"), "last reply cut off:\n{}", text);
    }

    #[test]
    fn test_cursor_stays_inside_input_box() {
        let mut app = app();
        app.open_chat();
        app.chat.set_input("hi");

        let mut terminal = Terminal::new(TestBackend::new(40, 12)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        // Input box spans rows 8..11 above the footer; the cursor follows "hi"
        assert_eq!(terminal.get_cursor_position().unwrap(), Position::new(3, 9));

        // Too narrow for any text: the cursor is left where it was
        let mut terminal = Terminal::new(TestBackend::new(2, 12)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        assert_eq!(terminal.get_cursor_position().unwrap(), Position::new(0, 0));
    }
}
