//! Application state and operations.
//!
//! Coordinates the auth screen, the document panel, the chat view with
//! its send gate and response timeout, and the image-generation studio.
//! Socket events are handed in by the main event loop; all message-list
//! mutation happens here, on that single task.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;

use ragchat_auth::{AuthClient, RegisterRequest};
use ragchat_core::{Applied, ChatMessage, OutboundRequest, StreamAssembler};

use crate::client::{BackendClient, ClientError};
use crate::types::{
    DocumentInfo, GenerateImageRequest, ImageHistoryItem, ADVANCED_IMAGE_MODEL, ASPECT_RATIOS,
    BASE_IMAGE_MODEL,
};
use crate::ws::{ChatSocket, ConnectionState, SocketConfig, SocketEvent};

/// How long to wait for a response before force-sealing and clearing the
/// loading indicator.
pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);

/// Prompt templates offered in the image studio.
pub const PROMPT_TEMPLATES: &[&str] = &[
    "A cyberpunk cityscape at sunset with neon lights",
    "A floating crystal metropolis surrounded by bioluminescent forests that glow under a turquoise moon",
    "An ancient library intertwined with living vines, where each book's pages emit a gentle, magical light",
    "A waterfall pouring from the sky into a mirrored lake, with gravity-defying rocks and endless reflections",
    "A neon desert oasis where towering sandstone cliffs are carved into geometric fractal patterns",
];

/// Which screen is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    /// Documents panel + chat column.
    #[default]
    Chat,
    /// Image-generation studio.
    Images,
}

/// Which column has focus on the chat screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    /// Left column: documents panel.
    Documents,
    /// Right column: chat area with input.
    #[default]
    Chat,
}

/// Input mode for special operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Normal operation mode.
    #[default]
    Normal,
    /// Entering file paths to upload.
    UploadingDocument,
    /// Confirming document deletion.
    ConfirmingDelete,
}

/// Auth screen variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// Email + password sign-in.
    #[default]
    Login,
    /// Account creation.
    Register,
}

/// Focused field on the auth screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthField {
    /// Email address.
    #[default]
    Email,
    /// Password.
    Password,
    /// Given name (register only).
    Name,
    /// Family name (register only).
    LastName,
}

impl AuthField {
    /// Next field in tab order for the given mode.
    #[must_use]
    pub const fn next(self, mode: AuthMode) -> Self {
        match mode {
            AuthMode::Login => match self {
                Self::Email => Self::Password,
                _ => Self::Email,
            },
            AuthMode::Register => match self {
                Self::Email => Self::Name,
                Self::Name => Self::LastName,
                Self::LastName => Self::Password,
                Self::Password => Self::Email,
            },
        }
    }
}

/// Application state.
pub struct App {
    /// Session client (owns the cookie store).
    auth: AuthClient,
    /// Documents + images client, sharing the session cookies.
    client: BackendClient,
    /// Chat socket manager.
    socket: ChatSocket,
    /// Config for rebuilding the socket after sign-out.
    socket_config: SocketConfig,
    /// Event channel handed to rebuilt sockets.
    socket_events: tokio::sync::mpsc::Sender<SocketEvent>,

    // =========================================================================
    // Auth Screen
    // =========================================================================
    /// Whether a backend session is established.
    pub authenticated: bool,
    /// Login vs register.
    pub auth_mode: AuthMode,
    /// Focused field.
    pub auth_field: AuthField,
    /// Email field contents.
    pub auth_email: String,
    /// Password field contents.
    pub auth_password: String,
    /// Given-name field contents (register).
    pub auth_name: String,
    /// Family-name field contents (register).
    pub auth_last_name: String,
    /// Feedback line on the auth screen.
    pub auth_notice: Option<String>,

    // =========================================================================
    // Chat
    // =========================================================================
    /// Conversation, insertion order = display order.
    pub messages: Vec<ChatMessage>,
    /// Folds inbound frames into bot messages.
    assembler: StreamAssembler,
    /// Whether a response is outstanding.
    pub is_loading: bool,
    /// Wall-clock deadline for the outstanding response.
    response_deadline: Option<Instant>,

    // =========================================================================
    // Documents
    // =========================================================================
    /// Indexed documents.
    pub documents: Vec<DocumentInfo>,
    /// Selected row in the documents panel.
    pub selected_document: Option<usize>,

    // =========================================================================
    // Image Studio
    // =========================================================================
    /// Generation history, newest first.
    pub image_history: Vec<ImageHistoryItem>,
    /// Whether to use the higher-quality model.
    pub image_advanced_model: bool,
    /// Index into [`ASPECT_RATIOS`].
    pub image_aspect_idx: usize,
    /// Whether a generation request is in flight.
    pub image_loading: bool,
    /// Last applied template, for cycling.
    image_template_idx: Option<usize>,

    // =========================================================================
    // Shell
    // =========================================================================
    /// Active screen.
    pub screen: Screen,
    /// Focused column on the chat screen.
    pub focus: Focus,
    /// Input mode.
    pub input_mode: InputMode,
    /// Whether single-key commands are active instead of typing.
    pub command_mode: bool,
    /// Current input buffer.
    pub input: String,
    /// Cursor position in input.
    pub cursor_position: usize,
    /// Saved input while a dialog is open.
    saved_input: Option<(String, usize)>,
    /// Chat scroll position (0 = bottom).
    pub chat_scroll: usize,
    /// Status message to display.
    pub status_message: Option<String>,
    /// Error message to display.
    pub error_message: Option<String>,
    /// Whether the app should quit.
    pub should_quit: bool,
    /// Animation frame counter for spinners.
    pub animation_frame: usize,
}

impl App {
    /// Create a new application. The socket does not connect until
    /// [`Self::connect_socket`] is called (normally after sign-in).
    #[must_use]
    pub fn new(
        auth: AuthClient,
        client: BackendClient,
        socket_config: SocketConfig,
        socket_events: tokio::sync::mpsc::Sender<SocketEvent>,
    ) -> Self {
        let socket = ChatSocket::new(socket_config.clone(), socket_events.clone());
        Self {
            auth,
            client,
            socket,
            socket_config,
            socket_events,
            authenticated: false,
            auth_mode: AuthMode::Login,
            auth_field: AuthField::Email,
            auth_email: String::new(),
            auth_password: String::new(),
            auth_name: String::new(),
            auth_last_name: String::new(),
            auth_notice: None,
            messages: Vec::new(),
            assembler: StreamAssembler::new(),
            is_loading: false,
            response_deadline: None,
            documents: Vec::new(),
            selected_document: None,
            image_history: Vec::new(),
            image_advanced_model: false,
            image_aspect_idx: 0,
            image_loading: false,
            image_template_idx: None,
            screen: Screen::Chat,
            focus: Focus::Chat,
            input_mode: InputMode::Normal,
            command_mode: false,
            input: String::new(),
            cursor_position: 0,
            saved_input: None,
            chat_scroll: 0,
            status_message: None,
            error_message: None,
            should_quit: false,
            animation_frame: 0,
        }
    }

    // =========================================================================
    // Shell Helpers
    // =========================================================================

    /// Set the status message (also clears any error).
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
        self.error_message = None;
    }

    /// Set the error message.
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error_message = Some(message.into());
    }

    /// Clear the error message, including the socket's error slot.
    pub fn clear_error(&mut self) {
        self.error_message = None;
        self.socket.clear_error();
    }

    /// Tick the animation frame (call on each render).
    pub fn tick_animation(&mut self) {
        self.animation_frame = self.animation_frame.wrapping_add(1);
    }

    /// Current spinner character for loading animation.
    #[must_use]
    pub fn spinner_char(&self) -> &'static str {
        const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
        SPINNER[self.animation_frame % SPINNER.len()]
    }

    /// The backend base URL for display.
    #[must_use]
    pub fn backend_url(&self) -> &str {
        self.client.base_url()
    }

    /// Enter a dialog mode, saving the current input.
    pub fn enter_dialog_mode(&mut self, mode: InputMode) {
        self.saved_input = Some((std::mem::take(&mut self.input), self.cursor_position));
        self.cursor_position = 0;
        self.input_mode = mode;
    }

    /// Exit dialog mode, restoring the saved input.
    pub fn exit_dialog_mode(&mut self) {
        self.input_mode = InputMode::Normal;
        if let Some((input, cursor)) = self.saved_input.take() {
            self.input = input;
            self.cursor_position = cursor;
        } else {
            self.clear_input();
        }
    }

    // =========================================================================
    // Input Handling
    // =========================================================================

    /// Insert a character at the cursor position.
    pub fn insert_char(&mut self, c: char) {
        self.input.insert(self.cursor_position, c);
        self.cursor_position += c.len_utf8();
    }

    /// Delete the character before the cursor.
    pub fn delete_char(&mut self) {
        if self.cursor_position > 0 {
            let prev = self.input[..self.cursor_position]
                .chars()
                .next_back()
                .map_or(0, char::len_utf8);
            self.cursor_position -= prev;
            self.input.remove(self.cursor_position);
        }
    }

    /// Delete the character at the cursor.
    pub fn delete_char_forward(&mut self) {
        if self.cursor_position < self.input.len() {
            self.input.remove(self.cursor_position);
        }
    }

    /// Move cursor left.
    pub fn move_cursor_left(&mut self) {
        let prev = self.input[..self.cursor_position]
            .chars()
            .next_back()
            .map_or(0, char::len_utf8);
        self.cursor_position -= prev;
    }

    /// Move cursor right.
    pub fn move_cursor_right(&mut self) {
        let next = self.input[self.cursor_position..]
            .chars()
            .next()
            .map_or(0, char::len_utf8);
        self.cursor_position += next;
    }

    /// Move cursor to the start.
    pub fn move_cursor_start(&mut self) {
        self.cursor_position = 0;
    }

    /// Move cursor to the end.
    pub fn move_cursor_end(&mut self) {
        self.cursor_position = self.input.len();
    }

    /// Clear the input.
    pub fn clear_input(&mut self) {
        self.input.clear();
        self.cursor_position = 0;
    }

    /// Take the current input (clears it).
    pub fn take_input(&mut self) -> String {
        let input = std::mem::take(&mut self.input);
        self.cursor_position = 0;
        input
    }

    // =========================================================================
    // Chat Scrolling
    // =========================================================================

    /// Scroll chat up (view older messages).
    pub fn scroll_chat_up(&mut self, amount: usize) {
        self.chat_scroll = self.chat_scroll.saturating_add(amount);
    }

    /// Scroll chat down (view newer messages).
    pub fn scroll_chat_down(&mut self, amount: usize) {
        self.chat_scroll = self.chat_scroll.saturating_sub(amount);
    }

    // =========================================================================
    // Auth Screen
    // =========================================================================

    /// The string behind the focused auth field.
    pub fn auth_field_mut(&mut self) -> &mut String {
        match self.auth_field {
            AuthField::Email => &mut self.auth_email,
            AuthField::Password => &mut self.auth_password,
            AuthField::Name => &mut self.auth_name,
            AuthField::LastName => &mut self.auth_last_name,
        }
    }

    /// Move focus to the next auth field.
    pub fn auth_next_field(&mut self) {
        self.auth_field = self.auth_field.next(self.auth_mode);
    }

    /// Toggle between login and register.
    pub fn toggle_auth_mode(&mut self) {
        self.auth_mode = match self.auth_mode {
            AuthMode::Login => AuthMode::Register,
            AuthMode::Register => AuthMode::Login,
        };
        self.auth_field = AuthField::Email;
        self.auth_notice = None;
    }

    /// Probe for an existing session; on success the app goes straight
    /// to the chat screen.
    pub async fn check_session(&mut self) {
        if let Ok(profile) = self.auth.me().await {
            self.authenticated = true;
            self.set_status(format!("Signed in as {}", profile.email));
            self.after_sign_in().await;
        }
    }

    /// Submit the auth form.
    pub async fn submit_auth(&mut self) {
        match self.auth_mode {
            AuthMode::Login => self.sign_in().await,
            AuthMode::Register => self.register().await,
        }
    }

    async fn sign_in(&mut self) {
        if self.auth_email.trim().is_empty() || self.auth_password.is_empty() {
            self.auth_notice = Some("Email and password are required".to_string());
            return;
        }

        match self.auth.login(&self.auth_email, &self.auth_password).await {
            Ok(profile) => {
                self.authenticated = true;
                self.auth_password.clear();
                self.auth_notice = None;
                self.set_status(format!("Signed in as {}", profile.email));
                self.after_sign_in().await;
            }
            Err(e) => self.auth_notice = Some(e.to_string()),
        }
    }

    async fn register(&mut self) {
        if self.auth_email.trim().is_empty() || self.auth_password.is_empty() {
            self.auth_notice = Some("Email and password are required".to_string());
            return;
        }

        let request = RegisterRequest {
            email: self.auth_email.clone(),
            name: self.auth_name.clone(),
            last_name: self.auth_last_name.clone(),
            password: self.auth_password.clone(),
        };
        match self.auth.register(&request).await {
            Ok(_) => {
                self.auth_mode = AuthMode::Login;
                self.auth_field = AuthField::Password;
                self.auth_notice = Some("Account created, sign in to continue".to_string());
            }
            Err(e) => self.auth_notice = Some(e.to_string()),
        }
    }

    /// Request a password-recovery email for the address in the email
    /// field.
    pub async fn forgot_password(&mut self) {
        if self.auth_email.trim().is_empty() {
            self.auth_notice = Some("Enter your email first".to_string());
            return;
        }
        match self.auth.forgot_password(&self.auth_email).await {
            Ok(()) => self.auth_notice = Some("Recovery email sent".to_string()),
            Err(e) => self.auth_notice = Some(e.to_string()),
        }
    }

    async fn after_sign_in(&mut self) {
        if let Err(e) = self.refresh_documents().await {
            self.set_error(format!("Failed to load documents: {e}"));
        }
        self.socket.connect();
    }

    /// End the session and return to the auth screen. The socket is torn
    /// down and a fresh manager is built for the next sign-in.
    pub async fn sign_out(&mut self) {
        if let Err(e) = self.auth.logout().await {
            tracing::warn!(err = %e, "logout request failed");
        }
        self.socket.shutdown();
        self.socket = ChatSocket::new(self.socket_config.clone(), self.socket_events.clone());
        self.authenticated = false;
        self.messages.clear();
        self.documents.clear();
        self.selected_document = None;
        self.assembler.begin_response();
        self.is_loading = false;
        self.response_deadline = None;
        self.set_status("Signed out");
    }

    // =========================================================================
    // Socket
    // =========================================================================

    /// Current connection state.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.socket.state()
    }

    /// Current socket error, if any.
    #[must_use]
    pub fn socket_error(&self) -> Option<String> {
        self.socket.last_error()
    }

    /// Manual reconnect affordance: clear the error and try again.
    pub fn reconnect(&mut self) {
        self.clear_error();
        self.socket.connect();
    }

    /// Tear the socket down (owner teardown on quit).
    pub fn shutdown_socket(&self) {
        self.socket.shutdown();
    }

    /// Handle one socket event. Returns `true` if the UI should redraw
    /// immediately.
    pub fn handle_socket_event(&mut self, event: SocketEvent) -> bool {
        match event {
            SocketEvent::Opened => {
                self.set_status("Connected");
            }
            SocketEvent::Closed => {
                self.set_status("Connection lost");
            }
            SocketEvent::Frame(frame) => {
                if self.assembler.apply(frame, &mut self.messages) == Applied::Completed {
                    self.is_loading = false;
                    self.response_deadline = None;
                }
                self.chat_scroll = 0;
            }
        }
        true
    }

    // =========================================================================
    // Send Gate
    // =========================================================================

    /// Whether a send would be accepted right now.
    #[must_use]
    pub fn can_send(&self) -> bool {
        !self.input.trim().is_empty()
            && !self.is_loading
            && self.socket.state() == ConnectionState::Connected
    }

    /// Send the input buffer as a chat message. Rejected silently unless
    /// the input is non-empty, no response is outstanding, and the
    /// socket is connected.
    pub async fn send_message(&mut self) {
        if !self.can_send() {
            return;
        }

        let text = self.take_input();
        // History carries the turns before this one; the new text
        // travels in the message field.
        let request = OutboundRequest::new(&text, &self.messages);
        self.messages.push(ChatMessage::user(&text));
        self.begin_response_cycle();

        let socket = self.socket.clone();
        if !socket.send(&request).await {
            // The socket recorded the error; stop waiting for a reply.
            self.is_loading = false;
            self.response_deadline = None;
        }
    }

    /// Arm the loading indicator, the response deadline, and a fresh
    /// assembly cycle.
    fn begin_response_cycle(&mut self) {
        self.assembler.begin_response();
        self.is_loading = true;
        self.response_deadline = Some(Instant::now() + RESPONSE_TIMEOUT);
        self.chat_scroll = 0;
    }

    /// Whether the response is outstanding but no chunk has arrived yet
    /// (drives the "thinking" indicator).
    #[must_use]
    pub fn is_awaiting_first_chunk(&self) -> bool {
        self.is_loading && !self.assembler.is_accumulating()
    }

    /// Enforce the response deadline: seal any in-flight message and
    /// clear the loading indicator. Silent; a timeout is not an error.
    pub fn check_response_timeout(&mut self) {
        let Some(deadline) = self.response_deadline else {
            return;
        };
        if Instant::now() < deadline {
            return;
        }
        tracing::debug!("response timed out, sealing in-flight message");
        self.assembler.force_seal(&mut self.messages);
        self.is_loading = false;
        self.response_deadline = None;
    }

    // =========================================================================
    // Documents
    // =========================================================================

    /// Refresh the document list from the API.
    pub async fn refresh_documents(&mut self) -> Result<(), ClientError> {
        self.documents = self.client.list_documents().await?;

        if let Some(i) = self.selected_document {
            if i >= self.documents.len() {
                self.selected_document = if self.documents.is_empty() {
                    None
                } else {
                    Some(self.documents.len() - 1)
                };
            }
        }

        Ok(())
    }

    /// Move selection up in the documents panel.
    pub fn select_prev_document(&mut self) {
        if self.documents.is_empty() {
            return;
        }
        self.selected_document = Some(match self.selected_document {
            Some(0) | None => self.documents.len() - 1,
            Some(i) => i - 1,
        });
    }

    /// Move selection down in the documents panel.
    pub fn select_next_document(&mut self) {
        if self.documents.is_empty() {
            return;
        }
        self.selected_document = Some(match self.selected_document {
            Some(i) if i + 1 < self.documents.len() => i + 1,
            _ => 0,
        });
    }

    /// The currently selected document.
    #[must_use]
    pub fn selected_document(&self) -> Option<&DocumentInfo> {
        self.selected_document.and_then(|i| self.documents.get(i))
    }

    /// Upload the whitespace-separated file paths in the input buffer,
    /// then refresh the list.
    pub async fn upload_documents(&mut self) {
        let line = self.take_input();
        let paths: Vec<PathBuf> = line.split_whitespace().map(PathBuf::from).collect();
        if paths.is_empty() {
            return;
        }

        self.set_status(format!("Uploading {} file(s)...", paths.len()));
        match self.client.upload_documents(&paths).await {
            Ok(()) => {
                self.set_status(format!("Uploaded {} file(s)", paths.len()));
                if let Err(e) = self.refresh_documents().await {
                    self.set_error(format!("Failed to refresh documents: {e}"));
                }
            }
            Err(e) => self.set_error(format!("Upload failed: {e}")),
        }
    }

    /// Delete the selected document.
    pub async fn delete_selected_document(&mut self) {
        let Some(doc) = self.selected_document() else {
            return;
        };
        let doc_id = doc.doc_id.clone();
        let filename = doc.filename.clone();

        match self.client.delete_document(&doc_id).await {
            Ok(()) => {
                self.set_status(format!("Deleted {filename}"));
                if let Err(e) = self.refresh_documents().await {
                    self.set_error(format!("Failed to refresh documents: {e}"));
                }
            }
            Err(e) => self.set_error(format!("Delete failed: {e}")),
        }
    }

    // =========================================================================
    // Image Studio
    // =========================================================================

    /// Model name for the current model toggle.
    #[must_use]
    pub fn image_model(&self) -> &'static str {
        if self.image_advanced_model {
            ADVANCED_IMAGE_MODEL
        } else {
            BASE_IMAGE_MODEL
        }
    }

    /// Aspect ratio for the current selection.
    #[must_use]
    pub fn image_aspect_ratio(&self) -> &'static str {
        ASPECT_RATIOS[self.image_aspect_idx % ASPECT_RATIOS.len()]
    }

    /// Cycle to the next aspect ratio.
    pub fn cycle_aspect_ratio(&mut self) {
        self.image_aspect_idx = (self.image_aspect_idx + 1) % ASPECT_RATIOS.len();
    }

    /// Toggle between the fast and the higher-quality model.
    pub fn toggle_image_model(&mut self) {
        self.image_advanced_model = !self.image_advanced_model;
    }

    /// Copy the next prompt template into the input buffer.
    pub fn apply_next_template(&mut self) {
        let next = self
            .image_template_idx
            .map_or(0, |i| (i + 1) % PROMPT_TEMPLATES.len());
        self.image_template_idx = Some(next);
        self.input = PROMPT_TEMPLATES[next].to_string();
        self.cursor_position = self.input.len();
    }

    /// Generate an image from the input buffer and record it in the
    /// history gallery.
    pub async fn generate_image(&mut self) {
        let prompt = self.input.trim().to_string();
        if prompt.is_empty() || self.image_loading {
            return;
        }

        self.image_loading = true;
        self.set_status("Generating image...");

        let request = GenerateImageRequest {
            prompt: prompt.clone(),
            style: "default".to_string(),
            model_name: self.image_model().to_string(),
            aspect_ratio: self.image_aspect_ratio().to_string(),
        };

        match self.client.generate_image(&request).await {
            Ok(resp) => {
                let url = self.client.image_view_url(&resp.image_id);
                self.image_history.insert(
                    0,
                    ImageHistoryItem {
                        id: resp.image_id,
                        prompt,
                        model_name: request.model_name,
                        aspect_ratio: request.aspect_ratio,
                        url,
                        text_response: resp.text_response,
                        created_at: Utc::now(),
                    },
                );
                self.clear_input();
                self.set_status(format!("Image generated ({})", resp.content_type));
            }
            Err(e) => self.set_error(format!("Failed to generate image: {e}")),
        }
        self.image_loading = false;
    }

    /// Clear the history gallery.
    pub fn clear_image_history(&mut self) {
        self.image_history.clear();
    }
}
