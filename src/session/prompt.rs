use tokio::sync::oneshot;

/// Single-use handle the UI answers the prompt through.
///
/// Call [`PromptReply::submit`] once with the user's text. Dropping the reply
/// without submitting cancels the interaction.
#[derive(Debug)]
pub struct PromptReply {
    sender: oneshot::Sender<String>,
}

impl PromptReply {
    pub fn submit(self, prompt: impl Into<String>) {
        // the driver may already have moved on; nothing to report then
        let _ = self.sender.send(prompt.into());
    }

    pub fn cancel(self) {}
}

#[derive(Debug)]
pub(crate) struct PromptReceiver {
    receiver: oneshot::Receiver<String>,
}

impl PromptReceiver {
    /// Wait for the prompt. `None` when the user cancelled or sent only
    /// whitespace.
    pub(crate) async fn recv(self) -> Option<String> {
        let prompt = self.receiver.await.ok()?;
        if prompt.trim().is_empty() {
            None
        } else {
            Some(prompt)
        }
    }
}

pub(crate) fn prompt_channel() -> (PromptReply, PromptReceiver) {
    let (sender, receiver) = oneshot::channel();
    (PromptReply { sender }, PromptReceiver { receiver })
}
