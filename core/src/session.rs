/// Event loop glue between the controller and its collaborators
use crate::controller::{ChatController, ThreadTicket};
use crate::error::Result;
use crate::history::HistorySource;
use crate::push::PushSink;
use crate::types::{ChatMessage, OutgoingMessage};
use crate::view::ChatView;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Everything the UI loop reacts to besides user input
#[derive(Debug)]
pub enum AppEvent {
    /// Startup history fetch finished
    History(Result<Vec<ChatMessage>>),
    /// Thread fetch for a selection finished
    Thread(ThreadTicket, Result<Vec<ChatMessage>>),
    /// `new_message` arrived on the push channel
    Push(ChatMessage),
    /// Push channel connection ended
    ChannelClosed,
}

/// Runs the controller on one logical task. Fetches are spawned and report
/// back through [`AppEvent`]s, which are handled one at a time. Outgoing
/// messages go through a single emitter task, so they reach the push
/// channel in send order.
pub struct ChatSession<V: ChatView, H: HistorySource> {
    controller: ChatController<V>,
    history: H,
    outgoing: mpsc::UnboundedSender<OutgoingMessage>,
    events: mpsc::UnboundedSender<AppEvent>,
}

impl<V: ChatView, H: HistorySource> ChatSession<V, H> {
    /// Must be called inside a tokio runtime: spawns the emitter task
    pub fn new<S: PushSink>(
        controller: ChatController<V>,
        history: H,
        sink: S,
        events: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        let (outgoing, queue) = mpsc::unbounded_channel();
        tokio::spawn(run_emitter(sink, queue));
        Self {
            controller,
            history,
            outgoing,
            events,
        }
    }

    /// Initialize the view and request the full history
    pub fn start(&mut self, viewport_width: u32) {
        self.controller.initialize(viewport_width);
        let history = self.history.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = history.fetch_all().await;
            let _ = events.send(AppEvent::History(result));
        });
    }

    pub fn handle(&mut self, event: AppEvent) {
        match event {
            AppEvent::History(result) => self.controller.apply_history(result),
            AppEvent::Thread(ticket, result) => {
                self.controller.apply_thread(&ticket, result);
            }
            AppEvent::Push(msg) => self.controller.receive_push(msg),
            AppEvent::ChannelClosed => info!("Push channel closed; live updates stopped"),
        }
    }

    /// Select a conversation and fetch its thread
    pub fn select(&mut self, conversation_id: &str, display_name: &str, platform: &str) {
        let ticket = self
            .controller
            .select_conversation(conversation_id, display_name, platform);
        self.fetch_thread(ticket);
    }

    /// Select the `index`-th contact list entry, if any
    pub fn select_at(&mut self, index: usize) -> bool {
        match self.controller.select_contact_at(index) {
            Some(ticket) => {
                self.fetch_thread(ticket);
                true
            }
            None => false,
        }
    }

    /// Send the input text. Emit failures are logged and otherwise ignored.
    pub fn send_message(&mut self) -> bool {
        let Some(outgoing) = self.controller.send_message() else {
            return false;
        };
        if self.outgoing.send(outgoing).is_err() {
            debug!("Emitter task gone, send_message dropped");
        }
        true
    }

    pub fn toggle_sidebar(&mut self) {
        self.controller.toggle_sidebar();
    }

    pub fn controller(&self) -> &ChatController<V> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut ChatController<V> {
        &mut self.controller
    }

    pub fn view(&self) -> &V {
        self.controller.view()
    }

    pub fn view_mut(&mut self) -> &mut V {
        self.controller.view_mut()
    }

    pub fn event_sender(&self) -> mpsc::UnboundedSender<AppEvent> {
        self.events.clone()
    }

    fn fetch_thread(&self, ticket: ThreadTicket) {
        let history = self.history.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = history.fetch_all().await;
            let _ = events.send(AppEvent::Thread(ticket, result));
        });
    }
}

/// Emit queued messages one at a time, in order
async fn run_emitter<S: PushSink>(
    sink: S,
    mut queue: mpsc::UnboundedReceiver<OutgoingMessage>,
) {
    while let Some(msg) = queue.recv().await {
        if let Err(e) = sink.emit(msg).await {
            debug!("send_message not delivered: {}", e);
        }
    }
}
