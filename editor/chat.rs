use indexmap::IndexMap;
use thiserror::Error;
use uuid::Uuid;

use super::api::{EditRequest, ImageBlob};
use super::upload::ImageFile;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("Attach an image before generating a background.")]
    MissingImage,

    #[error("Describe the background you want.")]
    MissingPrompt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatStatus {
    Pending,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    /// Name of the image attached to (user) or produced by (assistant) this message.
    pub attachment: Option<String>,
    pub status: ChatStatus,
}

/// The AI background conversation. An image and a prompt are gathered
/// separately; only with both present can a request go out.
#[derive(Debug, Default, Clone)]
pub struct ChatState {
    pub image: Option<ImageFile>,
    pub prompt: String,
    pub messages: IndexMap<Uuid, ChatMessage>,
    pub selected_message: Option<usize>,
    pending: Option<Uuid>,
}

impl ChatState {
    /// Shows the image as the user's turn and asks for a prompt.
    pub fn attach(&mut self, image: ImageFile) {
        self.add_message(ChatMessage {
            role: ChatRole::User,
            content: String::new(),
            attachment: Some(image.name.clone()),
            status: ChatStatus::Succeeded,
        });
        self.image = Some(image);
        self.say("Great! Now describe the background you want.", ChatStatus::Succeeded);
    }

    /// Answers an upload that could not be used.
    pub fn reject(&mut self, reason: impl Into<String>) {
        self.image = None;
        self.say(reason, ChatStatus::Failed);
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn is_waiting(&self) -> bool {
        self.pending.is_some()
    }

    pub fn can_submit(&self) -> bool {
        self.image.is_some() && !self.prompt.trim().is_empty() && !self.is_waiting()
    }

    /// Records the user's turn plus a pending reply and hands back the upload.
    pub fn submit(&mut self) -> Result<EditRequest, ChatError> {
        let image = self.image.clone().ok_or(ChatError::MissingImage)?;
        let prompt = self.prompt.trim().to_string();
        if prompt.is_empty() {
            return Err(ChatError::MissingPrompt);
        }

        self.add_message(ChatMessage {
            role: ChatRole::User,
            content: prompt.clone(),
            attachment: None,
            status: ChatStatus::Succeeded,
        });

        let reply_id = self.add_message(ChatMessage {
            role: ChatRole::Assistant,
            content: "Generating background...".to_string(),
            attachment: None,
            status: ChatStatus::Pending,
        });
        self.pending = Some(reply_id);
        self.prompt.clear();

        Ok(EditRequest::AiBackground { image, prompt })
    }

    /// Resolves the pending reply. The attached image is only let go once a
    /// round-trip succeeds, so a failed attempt can be retried as is.
    pub fn receive(&mut self, outcome: Result<&ImageBlob, String>, saved_as: Option<String>) {
        let succeeded = outcome.is_ok();
        let message = match outcome {
            Ok(blob) => {
                self.image = None;
                ChatMessage {
                    role: ChatRole::Assistant,
                    content: format!(
                        "Here is your image with the new background! ({})",
                        blob.summary()
                    ),
                    attachment: saved_as,
                    status: ChatStatus::Succeeded,
                }
            }
            Err(error) => ChatMessage {
                role: ChatRole::Assistant,
                content: error,
                attachment: None,
                status: ChatStatus::Failed,
            },
        };

        match self.pending.take() {
            Some(id) => {
                if let Some(existing) = self.messages.get_mut(&id) {
                    *existing = message;
                }
            }
            None => {
                self.add_message(message);
            }
        }
        if succeeded {
            self.say("Upload another image to try again!", ChatStatus::Succeeded);
        }
    }

    /// Drops a pending reply without an answer, e.g. after cancelling.
    pub fn abandon(&mut self) {
        if let Some(id) = self.pending.take() {
            self.messages.shift_remove(&id);
            self.select_last_message();
        }
    }

    pub fn clear(&mut self) {
        *self = ChatState::default();
    }

    fn say(&mut self, content: impl Into<String>, status: ChatStatus) {
        self.add_message(ChatMessage {
            role: ChatRole::Assistant,
            content: content.into(),
            attachment: None,
            status,
        });
    }

    fn add_message(&mut self, message: ChatMessage) -> Uuid {
        let id = Uuid::now_v7();
        self.messages.insert(id, message);
        self.select_last_message();
        id
    }

    pub fn select_last_message(&mut self) {
        self.selected_message = self.messages.len().checked_sub(1);
    }

    pub fn select_next_message(&mut self) {
        match self.selected_message {
            Some(current) if current + 1 < self.messages.len() => {
                self.selected_message = Some(current + 1)
            }
            None if !self.messages.is_empty() => self.selected_message = Some(0),
            _ => {}
        }
    }

    pub fn select_prev_message(&mut self) {
        match self.selected_message {
            Some(current) if current > 0 => self.selected_message = Some(current - 1),
            None if !self.messages.is_empty() => self.selected_message = Some(0),
            _ => {}
        }
    }

    pub fn get_selected_message(&self) -> Option<&ChatMessage> {
        self.selected_message
            .and_then(|index| self.messages.get_index(index))
            .map(|(_, message)| message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::upload::tests::{png, PNG_HEADER};
    use pretty_assertions::assert_eq;

    fn result() -> ImageBlob {
        ImageBlob::new(PNG_HEADER.to_vec(), "image/png")
    }

    #[test]
    fn needs_both_image_and_prompt() {
        let mut chat = ChatState::default();
        assert!(!chat.can_submit());

        chat.set_prompt("a neon city");
        assert!(!chat.can_submit());
        assert_eq!(chat.submit(), Err(ChatError::MissingImage));

        chat.set_prompt("   ");
        chat.attach(png("me.png"));
        assert!(!chat.can_submit());
        assert_eq!(chat.submit(), Err(ChatError::MissingPrompt));

        chat.set_prompt("a neon city");
        assert!(chat.can_submit());
    }

    #[test]
    fn submit_records_turns_and_clears_prompt() {
        let mut chat = ChatState::default();
        chat.attach(png("me.png"));
        chat.set_prompt("  mountains  ");

        let request = chat.submit().unwrap();
        assert_eq!(
            request,
            EditRequest::AiBackground {
                image: png("me.png"),
                prompt: "mountains".to_string()
            }
        );
        assert_eq!(chat.prompt, "");
        assert_eq!(chat.messages.len(), 4);
        assert!(chat.is_waiting());
        assert!(!chat.can_submit());
    }

    #[test]
    fn success_clears_attached_image() {
        let mut chat = ChatState::default();
        chat.attach(png("me.png"));
        chat.set_prompt("beach");
        chat.submit().unwrap();

        chat.receive(Ok(&result()), Some("me-ai-background.png".to_string()));

        assert!(chat.image.is_none());
        assert!(!chat.is_waiting());
        let replies: Vec<_> = chat.messages.values().skip(3).collect();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].status, ChatStatus::Succeeded);
        assert_eq!(replies[0].attachment.as_deref(), Some("me-ai-background.png"));
        assert_eq!(replies[1].content, "Upload another image to try again!");
        assert_eq!(chat.selected_message, Some(4));
    }

    #[test]
    fn attaching_shows_image_and_asks_for_prompt() {
        let mut chat = ChatState::default();
        chat.attach(png("me.png"));

        let turns: Vec<_> = chat.messages.values().collect();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, ChatRole::User);
        assert_eq!(turns[0].attachment.as_deref(), Some("me.png"));
        assert_eq!(turns[1].role, ChatRole::Assistant);
        assert_eq!(turns[1].content, "Great! Now describe the background you want.");
    }

    #[test]
    fn rejected_upload_is_answered_and_detached() {
        let mut chat = ChatState::default();
        chat.attach(png("me.png"));

        chat.reject("Please select a valid image file (JPG or PNG).");

        assert!(chat.image.is_none());
        let reply = chat.get_selected_message().unwrap();
        assert_eq!(reply.status, ChatStatus::Failed);
        assert_eq!(reply.content, "Please select a valid image file (JPG or PNG).");
    }

    #[test]
    fn failure_keeps_image_for_retry() {
        let mut chat = ChatState::default();
        chat.attach(png("me.png"));
        chat.set_prompt("beach");
        chat.submit().unwrap();

        chat.receive(Err("Server error (500): boom".to_string()), None);

        assert!(chat.image.is_some());
        let reply = chat.messages.values().last().unwrap();
        assert_eq!(reply.status, ChatStatus::Failed);
        assert_eq!(reply.content, "Server error (500): boom");
        assert_eq!(chat.messages.len(), 4);
    }

    #[test]
    fn abandon_drops_pending_reply() {
        let mut chat = ChatState::default();
        chat.attach(png("me.png"));
        chat.set_prompt("beach");
        chat.submit().unwrap();

        chat.abandon();
        assert_eq!(chat.messages.len(), 3);
        assert_eq!(chat.selected_message, Some(2));
        assert!(!chat.is_waiting());
    }

    #[test]
    fn selection_stays_in_bounds() {
        let mut chat = ChatState::default();
        chat.select_next_message();
        assert_eq!(chat.selected_message, None);

        chat.attach(png("me.png"));
        chat.set_prompt("beach");
        chat.submit().unwrap();
        chat.select_next_message();
        assert_eq!(chat.selected_message, Some(3));
        for _ in 0..5 {
            chat.select_prev_message();
        }
        assert_eq!(chat.selected_message, Some(0));
    }
}
