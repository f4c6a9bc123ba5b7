//! RagChat CLI - Terminal UI for the ragchat backend.
//!
//! This is the entry point for the `ragchat` binary.

mod app;
mod client;
mod types;
mod ui;
mod ws;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::mpsc;

use ragchat_auth::{ApiTokenProvider, AuthClient, AuthConfig};

use app::{App, Focus, InputMode, Screen};
use client::BackendClient;
use ws::{SocketConfig, SocketEvent};

/// RagChat CLI - chat with your document corpus.
#[derive(Parser, Debug)]
#[command(name = "ragchat")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Backend API base URL.
    #[arg(
        long,
        env = "RAGCHAT_API_URL",
        default_value = "http://localhost:8000"
    )]
    api_url: String,

    /// Chat socket URL override; derived from the API URL when unset.
    #[arg(long, env = "RAGCHAT_WS_URL")]
    ws_url: Option<String>,

    /// Fetch a bearer token before opening the socket.
    #[arg(long, env = "RAGCHAT_TOKEN_AUTH", default_value = "false")]
    token_auth: bool,

    /// Enable debug logging.
    #[arg(long, default_value = "false")]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.debug {
        tracing_subscriber::fmt()
            .with_env_filter("ragchat=debug,ragchat_cli=debug,warn")
            .with_writer(std::io::stderr)
            .init();
    }

    // Clients share one cookie store so the socket token and the
    // document endpoints see the same session.
    let auth = AuthClient::new(AuthConfig::new(&args.api_url));
    let client = BackendClient::new(&args.api_url, auth.http_client());

    let socket_url = args.ws_url.clone().unwrap_or_else(|| client.ws_url());
    let mut socket_config = SocketConfig::new(socket_url);
    if args.token_auth {
        socket_config = socket_config.with_token_provider(Arc::new(ApiTokenProvider::new(
            auth.clone(),
        )));
    }

    // Setup terminal with mouse capture enabled
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (ws_tx, ws_rx) = mpsc::channel::<SocketEvent>(128);
    let mut app = App::new(auth, client, socket_config, ws_tx);

    // A cookie from a previous run never survives the process, but a
    // reverse proxy may authenticate us transparently.
    app.check_session().await;

    let result = run_event_loop(&mut terminal, &mut app, ws_rx).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

/// Main event loop with real-time streaming support.
///
/// Socket events trigger an immediate redraw so chunks appear as they
/// arrive; the response deadline is checked on every iteration.
async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    mut ws_rx: mpsc::Receiver<SocketEvent>,
) -> anyhow::Result<()> {
    loop {
        app.tick_animation();

        terminal.draw(|f| ui::render(f, app))?;

        // Shorter tick during streaming keeps the spinner smooth.
        let tick_rate = if app.is_loading {
            Duration::from_millis(80)
        } else {
            Duration::from_millis(100)
        };

        tokio::select! {
            () = tokio::time::sleep(tick_rate) => {
                while event::poll(Duration::from_millis(0)).unwrap_or(false) {
                    if let Ok(evt) = event::read() {
                        handle_input(app, evt).await;
                    }
                }
            }

            Some(event) = ws_rx.recv() => {
                if app.handle_socket_event(event) {
                    terminal.draw(|f| ui::render(f, app))?;
                }
            }
        }

        app.check_response_timeout();

        if app.should_quit {
            break;
        }
    }

    app.shutdown_socket();

    Ok(())
}

/// Handle input events.
async fn handle_input(app: &mut App, event: Event) {
    match event {
        Event::Key(key) => {
            if key.kind != KeyEventKind::Press {
                return;
            }

            if !app.authenticated {
                handle_auth_input(app, key.code, key.modifiers).await;
                return;
            }

            // The connection error overlay captures input until resolved.
            if app.socket_error().is_some() {
                match key.code {
                    KeyCode::Char('r') => app.reconnect(),
                    KeyCode::Esc => app.clear_error(),
                    _ => {}
                }
                return;
            }

            match app.input_mode {
                InputMode::Normal => handle_normal_mode(app, key.code, key.modifiers).await,
                InputMode::UploadingDocument => handle_upload_mode(app, key.code).await,
                InputMode::ConfirmingDelete => handle_confirm_delete_mode(app, key.code).await,
            }
        }
        Event::Mouse(mouse) => match mouse.kind {
            MouseEventKind::ScrollUp => app.scroll_chat_up(3),
            MouseEventKind::ScrollDown => app.scroll_chat_down(3),
            _ => {}
        },
        _ => {}
    }
}

/// Handle input on the auth screen.
async fn handle_auth_input(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    if modifiers.contains(KeyModifiers::CONTROL) {
        match code {
            KeyCode::Char('c') | KeyCode::Char('q') => app.should_quit = true,
            KeyCode::Char('r') => app.toggle_auth_mode(),
            KeyCode::Char('f') => app.forgot_password().await,
            _ => {}
        }
        return;
    }

    match code {
        KeyCode::Tab => app.auth_next_field(),
        KeyCode::Enter => app.submit_auth().await,
        KeyCode::Backspace => {
            app.auth_field_mut().pop();
        }
        KeyCode::Char(c) => app.auth_field_mut().push(c),
        _ => {}
    }
}

/// Handle input in normal mode.
///
/// ESC toggles command mode; typing goes to the input buffer otherwise.
async fn handle_normal_mode(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    if code == KeyCode::Esc {
        if app.command_mode {
            app.command_mode = false;
        } else if app.error_message.is_some() {
            app.clear_error();
        } else {
            app.command_mode = true;
        }
        return;
    }

    match code {
        KeyCode::PageUp => {
            app.scroll_chat_up(10);
            return;
        }
        KeyCode::PageDown => {
            app.scroll_chat_down(10);
            return;
        }
        KeyCode::Up => {
            app.select_prev_document();
            return;
        }
        KeyCode::Down => {
            app.select_next_document();
            return;
        }
        _ => {}
    }

    if app.command_mode {
        handle_command_mode(app, code).await;
    } else {
        handle_typing_mode(app, code, modifiers).await;
    }
}

/// Handle input in command mode (ESC was pressed).
async fn handle_command_mode(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Char('q') => {
            app.should_quit = true;
        }
        KeyCode::Char('i') => {
            app.screen = match app.screen {
                Screen::Chat => Screen::Images,
                Screen::Images => Screen::Chat,
            };
            app.command_mode = false;
        }
        KeyCode::Char('u') => {
            if app.screen == Screen::Chat {
                app.enter_dialog_mode(InputMode::UploadingDocument);
                app.command_mode = false;
            }
        }
        KeyCode::Char('d') => {
            if app.screen == Screen::Chat && app.selected_document().is_some() {
                app.enter_dialog_mode(InputMode::ConfirmingDelete);
                app.command_mode = false;
            }
        }
        KeyCode::Char('g') => {
            if let Err(e) = app.refresh_documents().await {
                app.set_error(format!("Failed to refresh documents: {e}"));
            }
        }
        KeyCode::Char('r') => {
            app.reconnect();
        }
        KeyCode::Char('o') => {
            app.sign_out().await;
            app.command_mode = false;
        }
        KeyCode::Char('m') => {
            if app.screen == Screen::Images {
                app.toggle_image_model();
            }
        }
        KeyCode::Char('a') => {
            if app.screen == Screen::Images {
                app.cycle_aspect_ratio();
            }
        }
        KeyCode::Char('t') => {
            if app.screen == Screen::Images {
                app.apply_next_template();
                app.command_mode = false;
            }
        }
        KeyCode::Char('x') => {
            if app.screen == Screen::Images {
                app.clear_image_history();
            }
        }
        KeyCode::Char('j') => {
            app.scroll_chat_down(1);
        }
        KeyCode::Char('k') => {
            app.scroll_chat_up(1);
        }
        KeyCode::Tab => {
            app.focus = match app.focus {
                Focus::Documents => Focus::Chat,
                Focus::Chat => Focus::Documents,
            };
        }
        KeyCode::Enter => {
            app.command_mode = false;
        }
        _ => {}
    }
}

/// Handle input in typing mode (keys go to the input buffer).
async fn handle_typing_mode(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    match code {
        KeyCode::Enter => match app.screen {
            Screen::Chat => app.send_message().await,
            Screen::Images => app.generate_image().await,
        },
        KeyCode::Tab => {
            app.focus = match app.focus {
                Focus::Documents => Focus::Chat,
                Focus::Chat => Focus::Documents,
            };
        }
        KeyCode::Char(c) => {
            if modifiers.contains(KeyModifiers::CONTROL) && c == 'a' {
                app.move_cursor_start();
            } else if modifiers.contains(KeyModifiers::CONTROL) && c == 'e' {
                app.move_cursor_end();
            } else if modifiers.contains(KeyModifiers::CONTROL) && c == 'u' {
                app.clear_input();
            } else if modifiers.contains(KeyModifiers::CONTROL) && c == 'w' {
                while app.cursor_position > 0 {
                    app.delete_char();
                    if app.cursor_position > 0 {
                        let prev_char = app.input.chars().nth(app.cursor_position - 1);
                        if prev_char == Some(' ') {
                            break;
                        }
                    }
                }
            } else {
                app.insert_char(c);
            }
        }
        KeyCode::Backspace => app.delete_char(),
        KeyCode::Delete => app.delete_char_forward(),
        KeyCode::Left => app.move_cursor_left(),
        KeyCode::Right => app.move_cursor_right(),
        KeyCode::Home => app.move_cursor_start(),
        KeyCode::End => app.move_cursor_end(),
        _ => {}
    }
}

/// Handle input in the upload dialog.
async fn handle_upload_mode(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Esc => {
            app.exit_dialog_mode();
        }
        KeyCode::Enter => {
            if !app.input.is_empty() {
                app.upload_documents().await;
            }
            app.exit_dialog_mode();
        }
        KeyCode::Char(c) => {
            app.insert_char(c);
        }
        KeyCode::Backspace => {
            app.delete_char();
        }
        _ => {}
    }
}

/// Handle input in the delete confirmation dialog.
async fn handle_confirm_delete_mode(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Char('y') | KeyCode::Char('Y') => {
            app.delete_selected_document().await;
            app.exit_dialog_mode();
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            app.exit_dialog_mode();
        }
        _ => {}
    }
}
