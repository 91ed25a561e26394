#[cfg(test)]
#[path = "messages_test.rs"]
mod tests;

/// Who authored a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    User,
    Responder,
}

/// A single conversation message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// Ordered conversation log.
///
/// Append-only, except that the most recent message may be edited in place
/// when it is a responder message. Nothing is ever removed short of
/// [`MessageStore::clear`], which starts a new conversation.
#[derive(Clone, Debug, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
}

impl MessageStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a user message and return its index.
    pub fn push_user(&mut self, content: impl Into<String>) -> usize {
        self.push(Role::User, content.into())
    }

    /// Append a responder message and return its index.
    pub fn push_responder(&mut self, content: impl Into<String>) -> usize {
        self.push(Role::Responder, content.into())
    }

    /// Extend the trailing responder message. `None` if the last message is not one.
    pub fn append_to_responder(&mut self, text: &str) -> Option<usize> {
        let index = self.responder_tail()?;
        self.messages[index].content.push_str(text);
        Some(index)
    }

    /// Overwrite the trailing responder message. `None` if the last message is not one.
    pub fn set_responder(&mut self, content: impl Into<String>) -> Option<usize> {
        let index = self.responder_tail()?;
        self.messages[index].content = content.into();
        Some(index)
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    fn push(&mut self, role: Role, content: String) -> usize {
        self.messages.push(Message { role, content });
        self.messages.len() - 1
    }

    fn responder_tail(&self) -> Option<usize> {
        match self.messages.last() {
            Some(m) if m.role == Role::Responder => Some(self.messages.len() - 1),
            _ => None,
        }
    }
}
