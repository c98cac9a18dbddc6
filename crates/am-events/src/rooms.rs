use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;

/// Process-wide registry of chat-room membership.
///
/// Membership is ephemeral: populated when a connected client joins a room,
/// purged when the client disconnects. It does not survive a restart; the
/// message table is the durable record of a conversation.
#[derive(Clone)]
pub struct Rooms {
    inner: Arc<Mutex<HashMap<String, HashMap<String, UnboundedSender<String>>>>>,
}

impl Rooms {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn join(&self, room_id: &str, client_id: &str, sender: UnboundedSender<String>) {
        let mut guard = self.inner.lock().await;
        guard
            .entry(room_id.to_string())
            .or_default()
            .insert(client_id.to_string(), sender);
    }

    /// Removes the client from every room it joined.
    pub async fn disconnect(&self, client_id: &str) {
        let mut guard = self.inner.lock().await;
        for members in guard.values_mut() {
            members.remove(client_id);
        }
        guard.retain(|_, members| !members.is_empty());
    }

    /// Sends `payload` to every current member of the room, dropping senders
    /// whose receiving half is gone. Returns how many members were reached;
    /// zero is not an error.
    pub async fn broadcast(&self, room_id: &str, payload: &str) -> usize {
        let mut guard = self.inner.lock().await;
        let Some(members) = guard.get_mut(room_id) else {
            return 0;
        };
        let mut delivered = 0;
        members.retain(|_, sender| match sender.send(payload.to_string()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(_) => false,
        });
        delivered
    }
}

impl Default for Rooms {
    fn default() -> Self {
        Self::new()
    }
}
