//! Room-view state machine.
//!
//! Owns what the UI shell renders: the room list, the selected room and
//! its transcript, and the desktop/mobile presentation split. State
//! changes flow out as [`ControllerEvent`]s over an unbounded channel;
//! the shell never reaches into the state directly.
//!
//! Two guards keep overlapping async work coherent:
//! - a generation counter stamped at selection time discards fetch
//!   responses that arrive after the user has moved on to another room;
//! - a send-in-flight flag rejects a second send while one is running.

use tokio::sync::{mpsc, Mutex};

use tsunagu_shared::constants::MOBILE_BREAKPOINT_PX;
use tsunagu_shared::protocol::{MessageRecord, RoomSummary};
use tsunagu_shared::types::{Role, RoomId};

use crate::api::{MessagingApi, OutgoingFile};
use crate::composer::compose_and_send;
use crate::error::ClientError;
use crate::filter::{visible_rooms, RoomFilters};

/// Which pane layout the shell should render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presentation {
    /// List and detail side by side.
    Desktop,
    /// Narrow viewport, room list visible.
    MobileList,
    /// Narrow viewport, transcript visible.
    MobileDetail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    None,
    Loading { room: RoomId },
    Loaded { room: RoomId },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    /// The visible, filtered room list changed.
    RoomsUpdated(Vec<RoomSummary>),
    LoadingStarted(RoomId),
    MessagesLoaded {
        room: RoomId,
        messages: Vec<MessageRecord>,
    },
    /// The read pass for the room succeeded; the badge may be cleared.
    UnreadCleared(RoomId),
    PresentationChanged(Presentation),
    /// A user-facing notice, typically an error the shell should toast.
    Notice(String),
}

struct ControllerState {
    rooms: Vec<RoomSummary>,
    selection: Selection,
    transcript: Vec<MessageRecord>,
    presentation: Presentation,
    viewport_width: u32,
    generation: u64,
    send_in_flight: bool,
    filters: RoomFilters,
}

pub struct ViewController<A: MessagingApi> {
    api: A,
    role: Role,
    state: Mutex<ControllerState>,
    events: mpsc::UnboundedSender<ControllerEvent>,
}

impl<A: MessagingApi> ViewController<A> {
    pub fn new(
        api: A,
        role: Role,
        viewport_width: u32,
    ) -> (Self, mpsc::UnboundedReceiver<ControllerEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let presentation = if viewport_width > MOBILE_BREAKPOINT_PX {
            Presentation::Desktop
        } else {
            Presentation::MobileList
        };
        let controller = Self {
            api,
            role,
            state: Mutex::new(ControllerState {
                rooms: Vec::new(),
                selection: Selection::None,
                transcript: Vec::new(),
                presentation,
                viewport_width,
                generation: 0,
                send_in_flight: false,
                filters: RoomFilters::default(),
            }),
            events,
        };
        (controller, receiver)
    }

    /// Re-pull the room list from the server and re-derive the visible
    /// subset.
    pub async fn refresh_rooms(&self) -> Result<(), ClientError> {
        let rooms = self.api.list_rooms().await?;
        let mut state = self.state.lock().await;
        state.rooms = rooms;
        self.emit_rooms(&state);
        Ok(())
    }

    /// Select a room: load its transcript and run the read pass.
    ///
    /// The fetch and the read pass run concurrently. If another selection
    /// happens before this one resolves, the late response is discarded.
    /// A failed read pass never blocks the transcript; the badge simply
    /// stays until a later pass succeeds.
    pub async fn select_room(&self, room: RoomId) -> Result<(), ClientError> {
        let generation = {
            let mut state = self.state.lock().await;
            state.generation += 1;
            state.selection = Selection::Loading { room };
            state.generation
        };
        self.emit(ControllerEvent::LoadingStarted(room));

        let (messages, reconcile) =
            tokio::join!(self.api.fetch_messages(room), self.api.mark_read(room));

        let mut state = self.state.lock().await;
        if state.generation != generation {
            tracing::debug!(%room, "discarding stale room load");
            return Ok(());
        }

        let messages = match messages {
            Ok(messages) => messages,
            Err(e) => {
                state.selection = Selection::None;
                self.emit(ControllerEvent::Notice(e.to_string()));
                return Err(e);
            }
        };
        state.transcript = messages.clone();
        state.selection = Selection::Loaded { room };
        self.emit(ControllerEvent::MessagesLoaded { room, messages });

        match reconcile {
            Ok(_) => {
                if let Some(summary) = state.rooms.iter_mut().find(|r| r.id == room) {
                    summary.unread_count = 0;
                    summary.is_unread = false;
                }
                self.emit(ControllerEvent::UnreadCleared(room));
                self.emit_rooms(&state);
            }
            Err(e) => {
                // Unconfirmed read: keep the badge rather than lie.
                tracing::warn!(%room, error = %e, "read pass failed, keeping unread badge");
            }
        }

        if state.viewport_width <= MOBILE_BREAKPOINT_PX {
            self.set_presentation(&mut state, Presentation::MobileDetail);
        }
        Ok(())
    }

    /// Send a message into the selected room.
    ///
    /// The transcript is never updated optimistically: on success the
    /// messages and room list are re-fetched so the UI only ever shows
    /// server-committed state.
    pub async fn send(
        &self,
        content: &str,
        subject: Option<String>,
        files: &[OutgoingFile],
    ) -> Result<(), ClientError> {
        let room = {
            let mut state = self.state.lock().await;
            let room = match state.selection {
                Selection::Loaded { room } => room,
                _ => return Err(ClientError::NoRoomSelected),
            };
            if state.send_in_flight {
                return Err(ClientError::SendInFlight);
            }
            state.send_in_flight = true;
            room
        };

        let result = compose_and_send(&self.api, room, content, subject, files).await;
        self.state.lock().await.send_in_flight = false;

        if let Err(e) = result {
            self.emit(ControllerEvent::Notice(e.to_string()));
            return Err(e);
        }

        // The send is committed server-side from here on; a failed refetch
        // is reported as a notice, never as a send failure (which would
        // invite a duplicate retry).
        let refetched = async {
            let messages = self.api.fetch_messages(room).await?;
            let rooms = self.api.list_rooms().await?;
            Ok::<_, ClientError>((messages, rooms))
        }
        .await;
        match refetched {
            Ok((messages, rooms)) => {
                let mut state = self.state.lock().await;
                state.rooms = rooms;
                if state.selection == (Selection::Loaded { room }) {
                    state.transcript = messages.clone();
                    self.emit(ControllerEvent::MessagesLoaded { room, messages });
                }
                self.emit_rooms(&state);
            }
            Err(e) => {
                tracing::warn!(%room, error = %e, "refresh after send failed");
                self.emit(ControllerEvent::Notice(e.to_string()));
            }
        }
        Ok(())
    }

    /// Mobile back navigation: detail pane back to the list.
    pub async fn back(&self) {
        let mut state = self.state.lock().await;
        if state.presentation == Presentation::MobileDetail {
            state.selection = Selection::None;
            state.transcript.clear();
            self.set_presentation(&mut state, Presentation::MobileList);
        }
    }

    /// React to a viewport resize. Selection survives the transition in
    /// both directions.
    pub async fn set_viewport_width(&self, width: u32) {
        let mut state = self.state.lock().await;
        state.viewport_width = width;
        let next = if width > MOBILE_BREAKPOINT_PX {
            Presentation::Desktop
        } else if matches!(state.selection, Selection::Loaded { .. }) {
            Presentation::MobileDetail
        } else {
            Presentation::MobileList
        };
        self.set_presentation(&mut state, next);
    }

    pub async fn set_filters(&self, filters: RoomFilters) {
        let mut state = self.state.lock().await;
        state.filters = filters;
        self.emit_rooms(&state);
    }

    /// The filtered, ordered room list as the shell should display it.
    pub async fn visible_rooms(&self) -> Vec<RoomSummary> {
        let state = self.state.lock().await;
        visible_rooms(&state.rooms, self.role, &state.filters)
    }

    pub async fn selection(&self) -> Selection {
        self.state.lock().await.selection
    }

    pub async fn presentation(&self) -> Presentation {
        self.state.lock().await.presentation
    }

    pub async fn transcript(&self) -> Vec<MessageRecord> {
        self.state.lock().await.transcript.clone()
    }

    pub async fn rooms(&self) -> Vec<RoomSummary> {
        self.state.lock().await.rooms.clone()
    }

    fn set_presentation(&self, state: &mut ControllerState, next: Presentation) {
        if state.presentation != next {
            state.presentation = next;
            self.emit(ControllerEvent::PresentationChanged(next));
        }
    }

    fn emit_rooms(&self, state: &ControllerState) {
        self.emit(ControllerEvent::RoomsUpdated(visible_rooms(
            &state.rooms,
            self.role,
            &state.filters,
        )));
    }

    // A dropped receiver just means the shell went away; nothing to do.
    fn emit(&self, event: ControllerEvent) {
        let _ = self.events.send(event);
    }
}
