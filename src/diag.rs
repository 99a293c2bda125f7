//! Non-fatal build and load messages, accumulated for the host UI.
//! Anomalies degrade to defaults and a message; they never abort a build.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Information,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub severity: Severity,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct Diagnostics {
    pub messages: Vec<Message>,
}

impl Diagnostics {
    pub fn new() -> Diagnostics {
        Diagnostics { messages: Vec::new() }
    }

    pub fn information(&mut self, text: String) {
        info!("{}", text);
        self.messages.push(Message { severity: Severity::Information, text: text });
    }

    pub fn warning(&mut self, text: String) {
        warn!("{}", text);
        self.messages.push(Message { severity: Severity::Warning, text: text });
    }

    pub fn error(&mut self, text: String) {
        error!("{}", text);
        self.messages.push(Message { severity: Severity::Error, text: text });
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.severity == Severity::Warning)
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.messages.extend(other.messages);
    }
}
