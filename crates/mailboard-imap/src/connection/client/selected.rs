use tokio::io::{AsyncRead, AsyncWrite};

use super::states::Selected;
use super::{Client, OpenError};
use crate::command::{Command, FetchAttribute, SearchCriteria, StoreAction};
use crate::parser::{FetchItem, UntaggedResponse};
use crate::types::{Flags, ListResponse, SeqNum, Uid, UidSet};
use crate::Result;

/// What came back for one message of a UID FETCH.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The FETCH parsed.
    Parsed {
        /// Message sequence number.
        seq: SeqNum,
        /// Returned data items.
        items: Vec<FetchItem>,
    },
    /// The FETCH for this message could not be parsed; the others are fine.
    Malformed {
        /// Message sequence number.
        seq: SeqNum,
        /// Parser message.
        error: String,
    },
}

impl FetchOutcome {
    /// Sequence number of the message.
    #[must_use]
    pub const fn seq(&self) -> SeqNum {
        match self {
            Self::Parsed { seq, .. } | Self::Malformed { seq, .. } => *seq,
        }
    }

    /// UID reported in the items, if any.
    #[must_use]
    pub fn uid(&self) -> Option<Uid> {
        self.items()?.iter().find_map(|item| match item {
            FetchItem::Uid(uid) => Some(*uid),
            _ => None,
        })
    }

    /// Flags reported in the items, if any.
    #[must_use]
    pub fn flags(&self) -> Option<&Flags> {
        self.items()?.iter().find_map(|item| match item {
            FetchItem::Flags(flags) => Some(flags),
            _ => None,
        })
    }

    /// Parsed items, `None` for a malformed message.
    #[must_use]
    pub fn items(&self) -> Option<&[FetchItem]> {
        match self {
            Self::Parsed { items, .. } => Some(items),
            Self::Malformed { .. } => None,
        }
    }
}

impl<S> Client<S, Selected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// The open mailbox.
    #[must_use]
    pub const fn selected(&self) -> &Selected {
        &self.state
    }

    /// Opens another mailbox read-write.
    pub async fn select(self, mailbox: &str) -> std::result::Result<Self, OpenError<S>> {
        self.open_mailbox(mailbox, false).await
    }

    /// Opens another mailbox read-only.
    pub async fn examine(self, mailbox: &str) -> std::result::Result<Self, OpenError<S>> {
        self.open_mailbox(mailbox, true).await
    }

    /// Lists mailboxes without leaving the open one.
    pub async fn list(&mut self, reference: &str, pattern: &str) -> Result<Vec<ListResponse>> {
        self.list_mailboxes(reference, pattern).await
    }

    /// Runs UID SEARCH and returns the matching UIDs in server order.
    pub async fn uid_search(&mut self, criteria: SearchCriteria) -> Result<Vec<Uid>> {
        let reply = self.run(&Command::UidSearch { criteria }).await?;

        Ok(reply
            .untagged
            .into_iter()
            .filter_map(|response| match response {
                UntaggedResponse::Search(numbers) => Some(numbers),
                _ => None,
            })
            .flatten()
            .filter_map(Uid::new)
            .collect())
    }

    /// Runs UID FETCH.
    ///
    /// Every FETCH response is returned, including unsolicited ones for
    /// messages outside `uids`; callers match on [`FetchOutcome::uid`].
    pub async fn uid_fetch(
        &mut self,
        uids: &UidSet,
        items: Vec<FetchAttribute>,
    ) -> Result<Vec<FetchOutcome>> {
        if uids.is_empty() {
            return Ok(Vec::new());
        }

        let reply = self
            .run(&Command::UidFetch {
                uids: uids.clone(),
                items,
            })
            .await?;

        Ok(collect_fetches(reply.untagged))
    }

    /// Runs UID STORE and returns the `(uid, flags)` pairs the server echoed.
    ///
    /// Some servers echo only the messages whose flags actually changed, so
    /// an empty result does not prove the UIDs are missing.
    pub async fn uid_store(&mut self, uids: &UidSet, action: StoreAction) -> Result<Vec<(Uid, Flags)>> {
        if uids.is_empty() {
            return Ok(Vec::new());
        }

        let reply = self
            .run(&Command::UidStore {
                uids: uids.clone(),
                action,
            })
            .await?;

        Ok(collect_fetches(reply.untagged)
            .iter()
            .filter_map(|outcome| Some((outcome.uid()?, outcome.flags()?.clone())))
            .filter(|(uid, _)| uids.contains(*uid))
            .collect())
    }
}

fn collect_fetches(untagged: Vec<UntaggedResponse>) -> Vec<FetchOutcome> {
    untagged
        .into_iter()
        .filter_map(|response| match response {
            UntaggedResponse::Fetch { seq, items } => Some(FetchOutcome::Parsed { seq, items }),
            UntaggedResponse::MalformedFetch { seq, message } => {
                tracing::warn!(seq = seq.get(), error = %message, "malformed FETCH response");
                Some(FetchOutcome::Malformed { seq, error: message })
            }
            _ => None,
        })
        .collect()
}
