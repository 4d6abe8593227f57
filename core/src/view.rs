/// View models and the rendering boundary
///
/// The controller never touches a widget tree directly. It hands structured
/// view models to a [`ChatView`], which rebuilds whatever it displays from them.
use crate::types::Direction;

/// One row of the contact list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactEntry {
    pub conversation_id: String,
    pub display_name: String,
    pub last_message: String,
    pub platform: String,
    /// Formatted `HH:MM` of the last message
    pub time: String,
    pub active: bool,
}

/// One message in the thread view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBubble {
    pub text: String,
    pub time: String,
    pub direction: Direction,
}

/// Header name/status pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatHeader {
    pub name: String,
    pub status: String,
}

/// Rendering boundary driven by the controller
pub trait ChatView {
    /// Replace the whole contact list
    fn render_contacts(&mut self, entries: Vec<ContactEntry>);

    fn clear_thread(&mut self);

    fn append_message(&mut self, bubble: MessageBubble);

    fn scroll_to_bottom(&mut self);

    fn set_header(&mut self, header: ChatHeader);

    /// Enable or disable the message input and the send control together
    fn set_composer_enabled(&mut self, enabled: bool);

    /// Current contents of the message input
    fn input_text(&self) -> &str;

    fn clear_input(&mut self);

    /// Insert the menu toggle that shows/hides the contact sidebar
    fn show_sidebar_toggle(&mut self);

    fn set_sidebar_visible(&mut self, visible: bool);
}

/// Retained view state: what a front-end draws from
#[derive(Debug, Clone)]
pub struct ViewState {
    pub contacts: Vec<ContactEntry>,
    pub thread: Vec<MessageBubble>,
    pub header: Option<ChatHeader>,
    pub composer_enabled: bool,
    pub input: String,
    pub sidebar_toggle: bool,
    pub sidebar_visible: bool,
    /// Lines scrolled up from the newest message (0 = pinned to bottom)
    pub scroll_back: usize,
    /// Number of full contact-list rebuilds
    pub contact_renders: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            contacts: Vec::new(),
            thread: Vec::new(),
            header: None,
            composer_enabled: false,
            input: String::new(),
            sidebar_toggle: false,
            sidebar_visible: true,
            scroll_back: 0,
            contact_renders: 0,
        }
    }
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Scroll the thread up by `lines`, bounded by its length
    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_back = (self.scroll_back + lines).min(self.thread.len().saturating_sub(1));
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_back = self.scroll_back.saturating_sub(lines);
    }

    pub fn active_contact(&self) -> Option<&ContactEntry> {
        self.contacts.iter().find(|c| c.active)
    }
}

impl ChatView for ViewState {
    fn render_contacts(&mut self, entries: Vec<ContactEntry>) {
        self.contacts = entries;
        self.contact_renders += 1;
    }

    fn clear_thread(&mut self) {
        self.thread.clear();
        self.scroll_back = 0;
    }

    fn append_message(&mut self, bubble: MessageBubble) {
        self.thread.push(bubble);
    }

    fn scroll_to_bottom(&mut self) {
        self.scroll_back = 0;
    }

    fn set_header(&mut self, header: ChatHeader) {
        self.header = Some(header);
    }

    fn set_composer_enabled(&mut self, enabled: bool) {
        self.composer_enabled = enabled;
    }

    fn input_text(&self) -> &str {
        &self.input
    }

    fn clear_input(&mut self) {
        self.input.clear();
    }

    fn show_sidebar_toggle(&mut self) {
        self.sidebar_toggle = true;
    }

    fn set_sidebar_visible(&mut self, visible: bool) {
        self.sidebar_visible = visible;
    }
}
