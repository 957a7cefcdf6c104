//! Session Management
//!
//! Process-lifetime registry of conversations. The store hands out
//! `Arc<tokio::sync::Mutex<Session>>` handles; holding the lock for the
//! whole turn is what serializes appends within one session.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{AgentError, Result};
use crate::message::{Conversation, Message};

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(format!("session_{}", &Uuid::new_v4().to_string()[..8]))
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A chat session owning its conversation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier
    pub id: SessionId,

    /// User-supplied title
    pub title: String,

    /// Conversation history
    pub conversation: Conversation,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last activity timestamp, refreshed on every appended message
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a new session seeded with a greeting message
    pub fn new(title: impl Into<String>, greeting: Message) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            title: title.into(),
            conversation: Conversation::with_greeting(greeting),
            created_at: now,
            updated_at: now,
        }
    }

    /// Update the activity timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Append a message and refresh `updated_at`
    pub fn append(&mut self, message: Message) -> Result<()> {
        self.conversation.push(message)?;
        self.touch();
        Ok(())
    }

    /// Reset the conversation to a single fresh greeting
    pub fn clear(&mut self, greeting: Message) {
        self.conversation.reset(greeting);
        self.touch();
    }

    /// Message count
    pub fn message_count(&self) -> usize {
        self.conversation.len()
    }

    /// Human-readable "time ago" label for the last activity
    pub fn last_activity(&self) -> String {
        let elapsed = Utc::now() - self.updated_at;

        if elapsed.num_days() > 0 {
            let days = elapsed.num_days();
            format!("{} day{} ago", days, if days > 1 { "s" } else { "" })
        } else if elapsed.num_hours() > 0 {
            let hours = elapsed.num_hours();
            format!("{} hour{} ago", hours, if hours > 1 { "s" } else { "" })
        } else if elapsed.num_minutes() > 0 {
            format!("{} min ago", elapsed.num_minutes())
        } else {
            "Just now".into()
        }
    }
}

/// Shared handle to a session; lock it for the duration of a turn
pub type SessionHandle = Arc<Mutex<Session>>;

/// In-memory session store
///
/// The map lock guards insert/lookup/remove only; per-session mutation
/// happens under each session's own async mutex. Sessions live until the
/// process exits; there is no automatic expiry.
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
    greeting: String,
}

impl SessionStore {
    /// Create a store; `greeting` seeds new and cleared conversations
    pub fn new(greeting: impl Into<String>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            greeting: greeting.into(),
        }
    }

    fn greeting_message(&self, content: &str) -> Message {
        Message::assistant(content).with_name("Support AI")
    }

    /// Create a session, returning a snapshot of its initial state
    pub fn create(&self, title: impl Into<String>) -> Session {
        let session = Session::new(title, self.greeting_message(&self.greeting));
        let snapshot = session.clone();

        let mut sessions = self.sessions.write().unwrap();
        sessions.insert(session.id.clone(), Arc::new(Mutex::new(session)));

        snapshot
    }

    /// Look up a session handle
    pub fn get(&self, id: &SessionId) -> Result<SessionHandle> {
        let sessions = self.sessions.read().unwrap();
        sessions
            .get(id)
            .cloned()
            .ok_or_else(|| AgentError::SessionNotFound(id.to_string()))
    }

    /// Snapshots of all sessions, most recently active first
    pub async fn list(&self) -> Vec<Session> {
        let handles: Vec<SessionHandle> = {
            let sessions = self.sessions.read().unwrap();
            sessions.values().cloned().collect()
        };

        let mut result = Vec::with_capacity(handles.len());
        for handle in handles {
            result.push(handle.lock().await.clone());
        }
        result.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        result
    }

    /// Reset a session's conversation to a single greeting message
    pub async fn clear(&self, id: &SessionId) -> Result<Session> {
        let handle = self.get(id)?;
        let mut session = handle.lock().await;
        session.clear(self.greeting_message("Chat cleared. How can I help you today?"));
        Ok(session.clone())
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.sessions.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;

    const GREETING: &str = "Hello! How can I help you today?";

    #[test]
    fn test_create_seeds_greeting() {
        let store = SessionStore::new(GREETING);
        let session = store.create("Order help");

        assert_eq!(session.message_count(), 1);
        assert_eq!(session.conversation.last().unwrap().role, Role::Assistant);
        assert_eq!(session.conversation.last().unwrap().content, GREETING);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_lookup_and_append() {
        let store = SessionStore::new(GREETING);
        let created = store.create("test");

        let handle = store.get(&created.id).unwrap();
        {
            let mut session = handle.lock().await;
            session.append(Message::user("hi")).unwrap();
        }

        let handle = store.get(&created.id).unwrap();
        assert_eq!(handle.lock().await.message_count(), 2);
    }

    #[test]
    fn test_unknown_session() {
        let store = SessionStore::new(GREETING);
        let err = store.get(&SessionId::from_string("session_missing")).unwrap_err();
        assert!(matches!(err, AgentError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn test_clear_resets_to_single_greeting() {
        let store = SessionStore::new(GREETING);
        let created = store.create("test");

        let handle = store.get(&created.id).unwrap();
        {
            let mut session = handle.lock().await;
            session.append(Message::user("one")).unwrap();
            session.append(Message::assistant("two")).unwrap();
        }

        let cleared = store.clear(&created.id).await.unwrap();
        assert_eq!(cleared.message_count(), 1);
        assert_eq!(cleared.conversation.last().unwrap().role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_list_sorted_by_activity() {
        let store = SessionStore::new(GREETING);
        let first = store.create("first");
        let second = store.create("second");

        // Touch the first session so it becomes the most recent
        let handle = store.get(&first.id).unwrap();
        handle.lock().await.append(Message::user("bump")).unwrap();

        let listed = store.list().await;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, first.id);
        assert_eq!(listed[1].id, second.id);
    }

    #[tokio::test]
    async fn test_serialized_appends_lose_nothing() {
        let store = Arc::new(SessionStore::new(GREETING));
        let created = store.create("busy");

        let mut tasks = Vec::new();
        for i in 0..10 {
            let store = store.clone();
            let id = created.id.clone();
            tasks.push(tokio::spawn(async move {
                let handle = store.get(&id).unwrap();
                let mut session = handle.lock().await;
                session.append(Message::user(format!("msg {}", i))).unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let handle = store.get(&created.id).unwrap();
        // greeting + 10 appends, none lost or duplicated
        assert_eq!(handle.lock().await.message_count(), 11);
    }
}
