//! Inbox suggestions derived from message subjects.
//!
//! A message whose subject mentions "urgent" or "action required" is
//! important: it is listed with a short summary and gets a review step.
//! A meeting subject gets a step asking to confirm attendance. Two general
//! steps close the list. Matching is case-insensitive and purely lexical.
//!
//! ```
//! use mailboard_core::assistant::{Attention, classify};
//!
//! assert_eq!(classify("URGENT: renew certificate"), Attention::Important);
//! assert_eq!(classify("Team meeting moved"), Attention::Meeting);
//! assert_eq!(classify("Lunch?"), Attention::None);
//! ```

use serde::{Deserialize, Serialize};

use crate::model::MailMessage;

/// Subject keywords marking a message as important.
pub const IMPORTANT_KEYWORDS: &[&str] = &["urgent", "action required"];
/// Subject keyword marking a meeting.
pub const MEETING_KEYWORD: &str = "meeting";

/// Step added when nothing important was found.
pub const NOTHING_URGENT_STEP: &str = "No urgent emails found. Consider reviewing unread messages.";
/// Step that always closes the list.
pub const ORGANIZE_STEP: &str = "Organize your inbox by archiving old emails.";

/// How much attention a subject asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Attention {
    /// Needs a review and a reply.
    Important,
    /// An invitation or meeting notice.
    Meeting,
    /// Nothing to suggest.
    #[default]
    None,
}

/// Classifies a subject. Important keywords win over the meeting keyword.
#[must_use]
pub fn classify(subject: &str) -> Attention {
    let subject = subject.to_lowercase();
    if IMPORTANT_KEYWORDS.iter().any(|k| subject.contains(k)) {
        Attention::Important
    } else if subject.contains(MEETING_KEYWORD) {
        Attention::Meeting
    } else {
        Attention::None
    }
}

/// A message that needs attention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportantEmail {
    /// Message id.
    pub id: String,
    /// Message subject.
    pub subject: String,
    /// One-line explanation.
    pub summary: String,
}

/// Something the user could do next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedNextStep {
    /// What to do.
    pub description: String,
    /// Message the step is about, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_email_id: Option<String>,
}

impl SuggestedNextStep {
    fn general(description: &str) -> Self {
        Self {
            description: description.to_string(),
            related_email_id: None,
        }
    }

    fn about(message: &MailMessage, description: String) -> Self {
        Self {
            description,
            related_email_id: Some(message.id.clone()),
        }
    }
}

/// Important messages and next steps for a list of messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestions {
    /// Messages needing attention, in input order.
    pub important_emails: Vec<ImportantEmail>,
    /// Per-message steps in input order, then the general ones.
    pub suggested_next_steps: Vec<SuggestedNextStep>,
}

/// Builds suggestions for `messages`.
#[must_use]
pub fn suggestions(messages: &[MailMessage]) -> Suggestions {
    let mut result = Suggestions::default();

    for message in messages {
        match classify(&message.subject) {
            Attention::Important => {
                result.important_emails.push(ImportantEmail {
                    id: message.id.clone(),
                    subject: message.subject.clone(),
                    summary: format!(
                        "This email is marked as important and requires your attention. Subject: {}",
                        message.subject
                    ),
                });
                result.suggested_next_steps.push(SuggestedNextStep::about(
                    message,
                    format!("Review and respond to \"{}\"", message.subject),
                ));
            }
            Attention::Meeting => {
                result.suggested_next_steps.push(SuggestedNextStep::about(
                    message,
                    format!("Confirm attendance for \"{}\"", message.subject),
                ));
            }
            Attention::None => {}
        }
    }

    if result.important_emails.is_empty() {
        result
            .suggested_next_steps
            .push(SuggestedNextStep::general(NOTHING_URGENT_STEP));
    }
    result
        .suggested_next_steps
        .push(SuggestedNextStep::general(ORGANIZE_STEP));

    tracing::debug!(
        messages = messages.len(),
        important = result.important_emails.len(),
        steps = result.suggested_next_steps.len(),
        "suggestions built"
    );
    result
}
