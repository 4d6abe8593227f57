/// Chat view controller
///
/// Owns the conversation map, the selection and the layout mode, and pushes
/// view models into a [`ChatView`]. All I/O happens outside: callers feed in
/// fetched history and push events, and emit whatever [`ChatController::send_message`]
/// returns.
use crate::config::COMPACT_BREAKPOINT;
use crate::conversations::ConversationBook;
use crate::timefmt::{format_clock, now_iso, parse_timestamp};
use crate::types::{ChatMessage, Direction, OutgoingMessage};
use crate::view::{ChatHeader, ChatView, ContactEntry, MessageBubble};
use tracing::{debug, error, info};

/// Currently open conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub conversation_id: String,
    pub display_name: String,
    pub platform: String,
}

/// Handle for one thread fetch. Only the ticket of the latest selection
/// is accepted by [`ChatController::apply_thread`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadTicket {
    pub generation: u64,
    pub conversation_id: String,
}

/// Layout decided once at initialization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Sidebar always shown next to the thread
    Wide,
    /// Sidebar behind a menu toggle, hidden after each selection
    Compact,
}

impl Layout {
    pub fn for_viewport(width: u32) -> Self {
        if width <= COMPACT_BREAKPOINT {
            Layout::Compact
        } else {
            Layout::Wide
        }
    }
}

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub default_platform: String,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            default_platform: "WhatsApp".to_string(),
        }
    }
}

pub struct ChatController<V: ChatView> {
    view: V,
    conversations: ConversationBook,
    selection: Option<Selection>,
    thread_generation: u64,
    layout: Layout,
    sidebar_visible: bool,
    options: ControllerOptions,
}

impl<V: ChatView> ChatController<V> {
    pub fn new(view: V, options: ControllerOptions) -> Self {
        Self {
            view,
            conversations: ConversationBook::new(),
            selection: None,
            thread_generation: 0,
            layout: Layout::Wide,
            sidebar_visible: true,
            options,
        }
    }

    /// Decide the layout for this session. Runs once; later resizes are ignored.
    pub fn initialize(&mut self, viewport_width: u32) {
        self.layout = Layout::for_viewport(viewport_width);
        info!(
            "Initializing chat view (viewport {}px, {:?} layout)",
            viewport_width, self.layout
        );
        self.view.set_composer_enabled(false);
        if self.layout == Layout::Compact {
            self.view.show_sidebar_toggle();
            self.set_sidebar(false);
        }
    }

    /// Populate the conversation map from a full-history response and render.
    /// On failure the error is logged and the view is left as it is.
    pub fn apply_history(&mut self, history: crate::Result<Vec<ChatMessage>>) {
        match history {
            Ok(messages) => {
                for msg in &messages {
                    self.conversations
                        .record(msg, &self.options.default_platform);
                }
                info!(
                    "Loaded {} messages across {} conversations",
                    messages.len(),
                    self.conversations.len()
                );
                self.render_contacts();
            }
            Err(e) => error!("Error loading messages: {}", e),
        }
    }

    /// Handle a `new_message` push event
    pub fn receive_push(&mut self, msg: ChatMessage) {
        let created = self
            .conversations
            .record(&msg, &self.options.default_platform);
        if created {
            debug!("New conversation {} from push", msg.conversation_id);
        }
        self.render_contacts();

        if self.is_selected(&msg.conversation_id) {
            self.append(bubble_for(&msg));
        }
    }

    /// Open a conversation. The returned ticket must accompany the thread
    /// fetch result passed to [`apply_thread`](Self::apply_thread).
    pub fn select_conversation(
        &mut self,
        conversation_id: &str,
        display_name: &str,
        platform: &str,
    ) -> ThreadTicket {
        self.selection = Some(Selection {
            conversation_id: conversation_id.to_string(),
            display_name: display_name.to_string(),
            platform: platform.to_string(),
        });

        self.view.set_header(ChatHeader {
            name: display_name.to_string(),
            status: format!("{} chat", platform),
        });
        self.view.set_composer_enabled(true);
        self.render_contacts();
        if self.layout == Layout::Compact {
            self.set_sidebar(false);
        }

        self.thread_generation += 1;
        debug!(
            "Selected conversation {} (generation {})",
            conversation_id, self.thread_generation
        );
        ThreadTicket {
            generation: self.thread_generation,
            conversation_id: conversation_id.to_string(),
        }
    }

    /// Select the `index`-th entry of the contact list as currently ordered
    pub fn select_contact_at(&mut self, index: usize) -> Option<ThreadTicket> {
        let (id, name, platform) = {
            let c = self.conversations.sorted().into_iter().nth(index)?;
            (
                c.conversation_id.clone(),
                c.display_name.clone(),
                c.platform_label.clone(),
            )
        };
        Some(self.select_conversation(&id, &name, &platform))
    }

    /// Render the thread for `ticket` from a full-history response.
    ///
    /// Returns `false` when the ticket is stale (a newer selection was made
    /// while this fetch was in flight) or the fetch failed.
    pub fn apply_thread(
        &mut self,
        ticket: &ThreadTicket,
        history: crate::Result<Vec<ChatMessage>>,
    ) -> bool {
        if ticket.generation != self.thread_generation {
            debug!(
                "Dropping stale thread for {} (generation {} < {})",
                ticket.conversation_id, ticket.generation, self.thread_generation
            );
            return false;
        }

        let messages = match history {
            Ok(messages) => messages,
            Err(e) => {
                error!("Error loading chat {}: {}", ticket.conversation_id, e);
                return false;
            }
        };

        let mut thread: Vec<ChatMessage> = messages
            .into_iter()
            .filter(|m| m.conversation_id == ticket.conversation_id)
            .collect();
        thread.sort_by_cached_key(|m| parse_timestamp(&m.timestamp));
        self.render_thread(&thread);
        true
    }

    /// Send the input text to the selected conversation.
    ///
    /// No-op (returns `None`) when the trimmed input is empty or nothing is
    /// selected. Otherwise the input is cleared, the message is shown at once
    /// as outbound, and the event to emit is returned. Nothing is rolled back
    /// if the emit later fails.
    pub fn send_message(&mut self) -> Option<OutgoingMessage> {
        let text = self.view.input_text().trim().to_string();
        if text.is_empty() {
            return None;
        }
        let selection = self.selection.clone()?;

        let outgoing = OutgoingMessage {
            platform: selection.platform.clone(),
            conversation_id: selection.conversation_id.clone(),
            text: text.clone(),
        };
        self.view.clear_input();

        let timestamp = now_iso();
        self.append(MessageBubble {
            text: text.clone(),
            time: format_clock(&timestamp),
            direction: Direction::Outbound,
        });

        let sender = self
            .conversations
            .get(&selection.conversation_id)
            .map(|c| c.display_name.clone())
            .unwrap_or_else(|| selection.display_name.clone());
        self.conversations.record(
            &ChatMessage {
                conversation_id: selection.conversation_id,
                sender,
                text,
                timestamp,
                inbound: false,
                platform: Some(selection.platform),
            },
            &self.options.default_platform,
        );
        self.render_contacts();

        Some(outgoing)
    }

    /// Rebuild the contact list from the conversation map
    pub fn render_contacts(&mut self) {
        let selected = self.selection.as_ref().map(|s| s.conversation_id.as_str());
        let entries: Vec<ContactEntry> = self
            .conversations
            .sorted()
            .into_iter()
            .map(|c| ContactEntry {
                conversation_id: c.conversation_id.clone(),
                display_name: c.display_name.clone(),
                last_message: c.last_message_text.clone(),
                platform: c.platform_label.clone(),
                time: format_clock(&c.last_message_timestamp),
                active: selected == Some(c.conversation_id.as_str()),
            })
            .collect();
        self.view.render_contacts(entries);
    }

    /// Clear the thread view and rebuild it from `messages` in the given order
    pub fn render_thread(&mut self, messages: &[ChatMessage]) {
        self.view.clear_thread();
        for msg in messages {
            self.append(bubble_for(msg));
        }
        self.view.scroll_to_bottom();
    }

    /// Menu toggle: show/hide the sidebar. Only meaningful in the compact layout.
    pub fn toggle_sidebar(&mut self) {
        if self.layout == Layout::Compact {
            let visible = !self.sidebar_visible;
            self.set_sidebar(visible);
        }
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn conversations(&self) -> &ConversationBook {
        &self.conversations
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn sidebar_visible(&self) -> bool {
        self.sidebar_visible
    }

    fn is_selected(&self, conversation_id: &str) -> bool {
        self.selection
            .as_ref()
            .is_some_and(|s| s.conversation_id == conversation_id)
    }

    fn append(&mut self, bubble: MessageBubble) {
        self.view.append_message(bubble);
        self.view.scroll_to_bottom();
    }

    fn set_sidebar(&mut self, visible: bool) {
        self.sidebar_visible = visible;
        self.view.set_sidebar_visible(visible);
    }
}

fn bubble_for(msg: &ChatMessage) -> MessageBubble {
    MessageBubble {
        text: msg.text.clone(),
        time: format_clock(&msg.timestamp),
        direction: msg.direction(),
    }
}
