//! UI rendering with ratatui.
//!
//! Auth screen, documents + chat layout, image studio, and the modal
//! dialogs. Pure rendering; every state read comes from [`App`].

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style, Stylize};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{
    Block, Borders, Clear, List, ListItem, ListState, Paragraph, Scrollbar, ScrollbarOrientation,
    ScrollbarState, Wrap,
};
use ratatui::Frame;

use crate::app::{App, AuthField, AuthMode, Focus, InputMode, Screen};
use crate::ws::ConnectionState;

/// Horizontal padding for chat content.
const CHAT_PADDING: u16 = 2;

/// Render the UI.
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    if !app.authenticated {
        render_auth_screen(frame, app, area);
        return;
    }

    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header bar
            Constraint::Min(5),    // Main content
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    render_header_bar(frame, app, main_layout[0]);

    match app.screen {
        Screen::Chat => {
            let content_layout = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([
                    Constraint::Percentage(30), // Left: Documents
                    Constraint::Percentage(70), // Right: Chat + Input
                ])
                .split(main_layout[1]);

            render_documents_panel(frame, app, content_layout[0]);
            render_chat_column(frame, app, content_layout[1]);
        }
        Screen::Images => render_image_studio(frame, app, main_layout[1]),
    }

    render_status_bar(frame, app, main_layout[2]);

    // Modal dialogs over everything else.
    if app.input_mode == InputMode::UploadingDocument {
        render_upload_dialog(frame, app, area);
    } else if app.input_mode == InputMode::ConfirmingDelete {
        render_confirm_delete_dialog(frame, app, area);
    }

    // Connection error takes over with a manual-reconnect affordance.
    if let Some(error) = app.socket_error() {
        render_connection_error(frame, &error, area);
    }
}

/// Truncate a string in the middle with ellipsis if it exceeds max_len.
fn truncate_middle(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    if max_len < 5 {
        return s[..max_len].to_string();
    }
    let keep = (max_len - 3) / 2;
    let start = &s[..keep];
    let end = &s[s.len() - keep..];
    format!("{start}...{end}")
}

/// Render the header bar with the app name and connection status.
fn render_header_bar(frame: &mut Frame, app: &App, area: Rect) {
    let state = app.connection_state();
    let status_text = state.as_str();
    let status_style = match state {
        ConnectionState::Connected => Style::default().fg(Color::Green),
        ConnectionState::Connecting => Style::default().fg(Color::Yellow),
        ConnectionState::Disconnected => Style::default().fg(Color::Red),
    };

    let title = "RAGCHAT";
    let max_url_width = (area.width as usize / 2).saturating_sub(15);
    let display_url = truncate_middle(app.backend_url(), max_url_width);
    let right_text = format!("{display_url} [{status_text}]");

    let line = Line::from(vec![
        Span::styled(
            title,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw(
            " ".repeat(
                area.width
                    .saturating_sub(title.len() as u16 + right_text.len() as u16)
                    as usize,
            ),
        ),
        Span::raw(display_url),
        Span::raw(" ["),
        Span::styled(status_text, status_style),
        Span::raw("]"),
    ]);

    let header = Paragraph::new(line).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

/// Render the documents panel.
fn render_documents_panel(frame: &mut Frame, app: &App, area: Rect) {
    let is_focused = app.focus == Focus::Documents;

    let block = Block::default()
        .title(" Documents ")
        .borders(Borders::ALL)
        .border_style(if is_focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::Gray)
        });

    let items: Vec<ListItem> = app
        .documents
        .iter()
        .map(|doc| {
            let chunks = format!(" {} chunks", doc.chunk_count);
            ListItem::new(Line::from(vec![
                Span::raw(doc.filename.clone()),
                Span::styled(chunks, Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(app.selected_document);

    frame.render_stateful_widget(list, area, &mut state);

    if is_focused && app.input_mode == InputMode::Normal && area.height > 4 {
        let help_area = Rect::new(
            area.x + 1,
            area.y + area.height.saturating_sub(2),
            area.width.saturating_sub(2),
            1,
        );
        let help = Paragraph::new(Line::from(vec![
            Span::styled("[u]", Style::default().fg(Color::Yellow)),
            Span::raw("pload "),
            Span::styled("[d]", Style::default().fg(Color::Yellow)),
            Span::raw("el "),
            Span::styled("[g]", Style::default().fg(Color::Yellow)),
            Span::raw(" refresh"),
        ]))
        .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, help_area);
    }
}

/// Render the right column containing chat and input as one unit.
fn render_chat_column(frame: &mut Frame, app: &App, area: Rect) {
    let is_focused = app.focus == Focus::Chat;

    let title = match app.connection_state() {
        ConnectionState::Connected => " Chat (connected) ".to_string(),
        ConnectionState::Connecting => format!(" Chat ({} connecting...) ", app.spinner_char()),
        ConnectionState::Disconnected => " Chat (disconnected) ".to_string(),
    };

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(if is_focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::Gray)
        });

    let inner_area = block.inner(area);
    frame.render_widget(block, area);

    let inner_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),    // Chat messages
            Constraint::Length(1), // Separator line
            Constraint::Length(1), // Input line
        ])
        .split(inner_area);

    let chat_area_full = inner_layout[0];
    let separator_area = inner_layout[1];
    let input_area = inner_layout[2];

    let chat_area = Rect::new(
        chat_area_full.x + CHAT_PADDING,
        chat_area_full.y,
        chat_area_full.width.saturating_sub(CHAT_PADDING * 2 + 1),
        chat_area_full.height,
    );

    let content_width = chat_area.width as usize;

    if app.messages.is_empty() && !app.is_loading {
        let help = if app.connection_state() == ConnectionState::Connected {
            "Ask a question about your documents"
        } else {
            "Waiting for connection..."
        };
        let text = Paragraph::new(help)
            .style(Style::default().fg(Color::DarkGray))
            .wrap(Wrap { trim: true });
        frame.render_widget(text, chat_area);
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in &app.messages {
            if msg.is_user() {
                lines.push(Line::from(vec![
                    Span::styled(
                        "[You] ",
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(msg.content.clone(), Style::default().fg(Color::White)),
                ]));
            } else {
                let mut header = vec![Span::styled(
                    "[Bot] ",
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                )];
                if msg.is_streaming {
                    header.push(Span::styled(
                        app.spinner_char(),
                        Style::default().fg(Color::Yellow),
                    ));
                }
                lines.push(Line::from(header));
                for content_line in msg.content.lines() {
                    lines.push(Line::from(Span::raw(content_line.to_string())));
                }
            }
            lines.push(Line::from(""));
        }

        // Animated indicator between the send and the first chunk.
        if app.is_awaiting_first_chunk() {
            lines.push(Line::from(vec![
                Span::styled(app.spinner_char(), Style::default().fg(Color::Yellow)),
                Span::styled(" thinking...", Style::default().fg(Color::DarkGray)),
            ]));
        }

        let text = Text::from(lines);
        let visible_lines = chat_area.height as usize;
        let total_wrapped_lines = wrapped_line_count(&text, content_width);
        let max_scroll = total_wrapped_lines.saturating_sub(visible_lines);
        let effective_scroll = app.chat_scroll.min(max_scroll);
        let scroll_offset = max_scroll.saturating_sub(effective_scroll);

        let paragraph = Paragraph::new(text)
            .wrap(Wrap { trim: true })
            .scroll((scroll_offset as u16, 0));
        frame.render_widget(paragraph, chat_area);

        if total_wrapped_lines > visible_lines {
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("▲"))
                .end_symbol(Some("▼"));
            let mut scrollbar_state = ScrollbarState::new(total_wrapped_lines)
                .position(scroll_offset)
                .viewport_content_length(visible_lines);
            frame.render_stateful_widget(scrollbar, chat_area_full, &mut scrollbar_state);
        }
    }

    render_input_line(frame, app, separator_area, input_area, is_focused);
}

/// Estimate the rendered line count after wrapping.
fn wrapped_line_count(text: &Text, width: usize) -> usize {
    if width == 0 {
        return 0;
    }
    text.lines
        .iter()
        .map(|line| {
            let len: usize = line.spans.iter().map(|s| s.content.chars().count()).sum();
            len.div_ceil(width).max(1)
        })
        .sum()
}

/// Render the input line at the bottom of the chat column.
fn render_input_line(
    frame: &mut Frame,
    app: &App,
    separator_area: Rect,
    input_area: Rect,
    is_focused: bool,
) {
    let separator = Paragraph::new("─".repeat(separator_area.width as usize))
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(separator, separator_area);

    let in_modal = app.input_mode != InputMode::Normal;

    let prompt = if !is_focused {
        "│ "
    } else if app.command_mode {
        ": "
    } else {
        "> "
    };

    let input_text = if in_modal { "" } else { app.input.as_str() };

    let input_line = Line::from(vec![
        Span::styled(
            prompt,
            Style::default().fg(if is_focused && !app.command_mode {
                Color::Cyan
            } else {
                Color::DarkGray
            }),
        ),
        Span::styled(input_text, Style::default().fg(Color::White)),
    ]);
    frame.render_widget(Paragraph::new(input_line), input_area);

    if is_focused && !in_modal && !app.command_mode && !app.is_loading {
        frame.set_cursor_position((
            input_area.x + prompt.len() as u16 + app.cursor_position as u16,
            input_area.y,
        ));
    }
}

/// Render the image-generation studio.
fn render_image_studio(frame: &mut Frame, app: &App, area: Rect) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Prompt input
            Constraint::Length(2), // Settings line + templates hint
            Constraint::Min(3),    // History gallery
        ])
        .split(area);

    // Prompt input box.
    let prompt_block = Block::default()
        .title(" Image Prompt ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let prompt_inner = prompt_block.inner(layout[0]);
    frame.render_widget(prompt_block, layout[0]);
    frame.render_widget(
        Paragraph::new(app.input.as_str()).style(Style::default().fg(Color::White)),
        prompt_inner,
    );
    if app.input_mode == InputMode::Normal && !app.command_mode {
        frame.set_cursor_position((
            prompt_inner.x + app.cursor_position as u16,
            prompt_inner.y,
        ));
    }

    // Settings line.
    let settings = Line::from(vec![
        Span::styled("model ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.image_model(), Style::default().fg(Color::White)),
        Span::styled("  aspect ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.image_aspect_ratio(), Style::default().fg(Color::White)),
        Span::raw("  "),
        Span::styled("Esc", Style::default().fg(Color::Yellow)),
        Span::raw(" then "),
        Span::styled("m", Style::default().fg(Color::Yellow)),
        Span::raw(":model "),
        Span::styled("a", Style::default().fg(Color::Yellow)),
        Span::raw(":aspect "),
        Span::styled("t", Style::default().fg(Color::Yellow)),
        Span::raw(":template "),
        Span::styled("Enter", Style::default().fg(Color::Yellow)),
        Span::raw(":generate"),
    ]);
    frame.render_widget(Paragraph::new(settings), layout[1]);

    // History gallery.
    let history_block = Block::default()
        .title(" History ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));
    let history_inner = history_block.inner(layout[2]);
    frame.render_widget(history_block, layout[2]);

    if app.image_loading {
        let busy = Paragraph::new(Line::from(vec![
            Span::styled(app.spinner_char(), Style::default().fg(Color::Yellow)),
            Span::styled(" generating...", Style::default().fg(Color::DarkGray)),
        ]));
        frame.render_widget(busy, history_inner);
        return;
    }

    if app.image_history.is_empty() {
        let empty = Paragraph::new("No images yet. Write a prompt and press Enter.")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, history_inner);
        return;
    }

    let mut lines: Vec<Line> = Vec::new();
    for item in &app.image_history {
        lines.push(Line::from(vec![
            Span::styled(
                item.created_at.format("%H:%M ").to_string(),
                Style::default().fg(Color::DarkGray),
            ),
            Span::styled(
                item.prompt.clone(),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  [{} {} #{}]", item.model_name, item.aspect_ratio, item.id),
                Style::default().fg(Color::DarkGray),
            ),
        ]));
        if !item.text_response.is_empty() {
            lines.push(Line::from(Span::styled(
                item.text_response.clone(),
                Style::default().fg(Color::Gray),
            )));
        }
        lines.push(Line::from(Span::styled(
            item.url.clone(),
            Style::default().fg(Color::Blue),
        )));
        lines.push(Line::from(""));
    }
    frame.render_widget(
        Paragraph::new(Text::from(lines)).wrap(Wrap { trim: true }),
        history_inner,
    );
}

/// Render the status bar.
fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let mode_indicator = if app.command_mode {
        Span::styled(" CMD ", Style::default().fg(Color::Black).bg(Color::Blue))
    } else {
        match app.screen {
            Screen::Chat => {
                Span::styled(" CHAT ", Style::default().fg(Color::Black).bg(Color::Green))
            }
            Screen::Images => Span::styled(
                " IMAGES ",
                Style::default().fg(Color::Black).bg(Color::Magenta),
            ),
        }
    };

    let status = if let Some(ref error) = app.error_message {
        Line::from(vec![
            mode_indicator,
            Span::styled(" ERROR: ", Style::default().fg(Color::Red).bold()),
            Span::styled(error.clone(), Style::default().fg(Color::Red)),
        ])
    } else if let Some(ref status) = app.status_message {
        Line::from(vec![
            mode_indicator,
            Span::styled(format!(" {status}"), Style::default().fg(Color::Green)),
        ])
    } else if app.command_mode {
        Line::from(vec![
            mode_indicator,
            Span::raw(" "),
            Span::styled("q", Style::default().fg(Color::Yellow)),
            Span::raw(":quit "),
            Span::styled("i", Style::default().fg(Color::Yellow)),
            Span::raw(":images "),
            Span::styled("r", Style::default().fg(Color::Yellow)),
            Span::raw(":reconnect "),
            Span::styled("o", Style::default().fg(Color::Yellow)),
            Span::raw(":sign out "),
            Span::styled("j/k", Style::default().fg(Color::Yellow)),
            Span::raw(":scroll"),
        ])
    } else {
        Line::from(vec![
            mode_indicator,
            Span::raw(" "),
            Span::styled("Enter", Style::default().fg(Color::Yellow)),
            Span::raw(":send "),
            Span::styled("Esc", Style::default().fg(Color::Yellow)),
            Span::raw(":commands "),
            Span::styled("Tab", Style::default().fg(Color::Yellow)),
            Span::raw(":switch panel"),
        ])
    };

    frame.render_widget(Paragraph::new(status), area);
}

/// Render the auth screen (login or register).
fn render_auth_screen(frame: &mut Frame, app: &App, area: Rect) {
    let dialog = centered_rect(50, 40, area);
    frame.render_widget(Clear, dialog);

    let title = match app.auth_mode {
        AuthMode::Login => " Sign In ",
        AuthMode::Register => " Create Account ",
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(dialog);
    frame.render_widget(block, dialog);

    let mut lines: Vec<Line> = Vec::new();
    lines.push(auth_field_line(
        "Email",
        &app.auth_email,
        app.auth_field == AuthField::Email,
        false,
    ));
    if app.auth_mode == AuthMode::Register {
        lines.push(auth_field_line(
            "Name",
            &app.auth_name,
            app.auth_field == AuthField::Name,
            false,
        ));
        lines.push(auth_field_line(
            "Last name",
            &app.auth_last_name,
            app.auth_field == AuthField::LastName,
            false,
        ));
    }
    lines.push(auth_field_line(
        "Password",
        &app.auth_password,
        app.auth_field == AuthField::Password,
        true,
    ));
    lines.push(Line::from(""));
    if let Some(ref notice) = app.auth_notice {
        lines.push(Line::from(Span::styled(
            notice.clone(),
            Style::default().fg(Color::Yellow),
        )));
        lines.push(Line::from(""));
    }
    lines.push(Line::from(vec![
        Span::styled("Tab", Style::default().fg(Color::Yellow)),
        Span::raw(":next field "),
        Span::styled("Enter", Style::default().fg(Color::Yellow)),
        Span::raw(":submit "),
        Span::styled("Ctrl+R", Style::default().fg(Color::Yellow)),
        Span::raw(match app.auth_mode {
            AuthMode::Login => ":register ",
            AuthMode::Register => ":sign in ",
        }),
        Span::styled("Ctrl+F", Style::default().fg(Color::Yellow)),
        Span::raw(":forgot password"),
    ]));

    frame.render_widget(Paragraph::new(Text::from(lines)).wrap(Wrap { trim: true }), inner);
}

/// One labelled field line on the auth screen.
fn auth_field_line<'a>(label: &'a str, value: &str, focused: bool, mask: bool) -> Line<'a> {
    let display = if mask {
        "*".repeat(value.chars().count())
    } else {
        value.to_string()
    };
    let marker = if focused { "> " } else { "  " };
    Line::from(vec![
        Span::styled(marker, Style::default().fg(Color::Cyan)),
        Span::styled(format!("{label:>10}: "), Style::default().fg(Color::DarkGray)),
        Span::styled(display, Style::default().fg(Color::White)),
    ])
}

/// Render the upload dialog.
fn render_upload_dialog(frame: &mut Frame, app: &App, area: Rect) {
    let dialog = centered_rect(60, 20, area);
    frame.render_widget(Clear, dialog);

    let block = Block::default()
        .title(" Upload Documents ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(dialog);
    frame.render_widget(block, dialog);

    let lines = vec![
        Line::from("File paths (space separated):"),
        Line::from(Span::styled(
            app.input.clone(),
            Style::default().fg(Color::White),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Enter", Style::default().fg(Color::Yellow)),
            Span::raw(":upload "),
            Span::styled("Esc", Style::default().fg(Color::Yellow)),
            Span::raw(":cancel"),
        ]),
    ];
    frame.render_widget(Paragraph::new(Text::from(lines)).wrap(Wrap { trim: true }), inner);
}

/// Render the delete confirmation dialog.
fn render_confirm_delete_dialog(frame: &mut Frame, app: &App, area: Rect) {
    let dialog = centered_rect(50, 20, area);
    frame.render_widget(Clear, dialog);

    let block = Block::default()
        .title(" Delete Document ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));
    let inner = block.inner(dialog);
    frame.render_widget(block, dialog);

    let name = app
        .selected_document()
        .map_or_else(|| "this document".to_string(), |d| d.filename.clone());
    let lines = vec![
        Line::from(format!("Delete {name} from the corpus?")),
        Line::from(""),
        Line::from(vec![
            Span::styled("y", Style::default().fg(Color::Yellow)),
            Span::raw(":delete "),
            Span::styled("n", Style::default().fg(Color::Yellow)),
            Span::raw("/"),
            Span::styled("Esc", Style::default().fg(Color::Yellow)),
            Span::raw(":cancel"),
        ]),
    ];
    frame.render_widget(Paragraph::new(Text::from(lines)).wrap(Wrap { trim: true }), inner);
}

/// Render the connection error overlay with the try-again affordance.
fn render_connection_error(frame: &mut Frame, error: &str, area: Rect) {
    let dialog = centered_rect(60, 25, area);
    frame.render_widget(Clear, dialog);

    let block = Block::default()
        .title(" Connection Error ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));
    let inner = block.inner(dialog);
    frame.render_widget(block, dialog);

    let lines = vec![
        Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(Color::Red),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("r", Style::default().fg(Color::Yellow)),
            Span::raw(":try again "),
            Span::styled("Esc", Style::default().fg(Color::Yellow)),
            Span::raw(":dismiss"),
        ]),
    ];
    frame.render_widget(Paragraph::new(Text::from(lines)).wrap(Wrap { trim: true }), inner);
}

/// Centered sub-rectangle of `area`, sized by percentage.
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
