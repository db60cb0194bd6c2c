//! The mailbox client: one lazily opened IMAP session shared by every
//! operation.
//!
//! All operations serialize on the session lock. Whoever finds no session
//! opens one while holding the lock, so concurrent callers wait for that
//! attempt and reuse its result. An I/O error, timeout or BYE during an
//! operation drops the session; the next call reconnects.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::Duration;

use mailboard_imap::{
    Authenticated, Client, Error as ImapError, FetchAttribute, FetchItem, FetchOutcome, Flag,
    OpenError, SearchCriteria, Selected, StoreAction, Uid, UidSet,
};
use tokio::sync::Mutex;

use crate::config::MailConfig;
use crate::connector::Connect;
use crate::error::{MailError, ParseError, Result};
use crate::folders::flatten_folders;
use crate::model::{ConnectionState, DEFAULT_FOLDER, FetchOptions, MailFolder, MailMessage, ServerInfo};
use crate::parser::{RawMessage, parse_message, placeholder};

enum Session<S> {
    Idle(Client<S, Authenticated>),
    Open(Client<S, Selected>),
}

struct Inner<S> {
    session: Option<Session<S>>,
    /// Folder flag changes apply to: the one last opened by a fetch.
    folder: String,
}

/// A SELECT/EXAMINE that did not succeed, with whatever session survived.
struct OpenFailure<S> {
    session: Option<Session<S>>,
    error: ImapError,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Access {
    ReadOnly,
    ReadWrite,
}

/// Mailbox operations over a single lazily opened session.
pub struct MailboxClient<C: Connect> {
    connector: C,
    server: ServerInfo,
    password: String,
    connect_timeout: Duration,
    auth_timeout: Duration,
    io_timeout: Duration,
    inner: Mutex<Inner<C::Stream>>,
    state: AtomicU8,
    attempts: AtomicU64,
}

impl<C: Connect> std::fmt::Debug for MailboxClient<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailboxClient")
            .field("server", &self.server)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl<C: Connect> MailboxClient<C> {
    /// Creates a disconnected client. Nothing is opened until the first
    /// operation or [`connect`](Self::connect).
    pub fn new(connector: C, config: &MailConfig) -> Self {
        Self {
            connector,
            server: config.server_info(),
            password: config.password.clone(),
            connect_timeout: config.connect_timeout,
            auth_timeout: config.auth_timeout,
            io_timeout: config.io_timeout,
            inner: Mutex::new(Inner {
                session: None,
                folder: DEFAULT_FOLDER.to_string(),
            }),
            state: AtomicU8::new(encode_state(ConnectionState::Disconnected)),
            attempts: AtomicU64::new(0),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        decode_state(self.state.load(Ordering::SeqCst))
    }

    /// True once login has completed and the session has not been lost.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Host, port and username. Never the password.
    pub fn server_info(&self) -> ServerInfo {
        self.server.clone()
    }

    /// Number of connection attempts made so far.
    pub fn connection_attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Folder that flag changes currently apply to.
    pub async fn current_folder(&self) -> String {
        self.inner.lock().await.folder.clone()
    }

    /// Opens and authenticates the session unless one exists.
    ///
    /// # Errors
    ///
    /// [`MailError::Connection`] on transport, TLS, greeting or login
    /// failure, including timeouts.
    pub async fn connect(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let session = self.checkout(&mut inner).await?;
        inner.session = Some(session);
        Ok(())
    }

    /// Logs out and releases the session. Does nothing when disconnected
    /// and never fails.
    pub async fn disconnect(&self) {
        let mut inner = self.inner.lock().await;
        let Some(session) = inner.session.take() else {
            self.set_state(ConnectionState::Disconnected);
            return;
        };

        let result = match session {
            Session::Idle(client) => client.logout().await,
            Session::Open(client) => client.logout().await,
        };
        if let Err(e) = result {
            tracing::debug!(error = %e, "logout failed, dropping connection");
        }

        self.set_state(ConnectionState::Disconnected);
        tracing::info!(host = %self.server.host, "disconnected");
    }

    /// Lists every folder, parents before children.
    ///
    /// A malformed or rejected LIST is logged and yields an empty list.
    ///
    /// # Errors
    ///
    /// [`MailError::Connection`] if no session can be opened or it is lost
    /// during the call.
    pub async fn list_folders(&self) -> Result<Vec<MailFolder>> {
        let mut inner = self.inner.lock().await;
        let mut session = self.checkout(&mut inner).await?;

        let listed = match &mut session {
            Session::Idle(client) => client.list("", "*").await,
            Session::Open(client) => client.list("", "*").await,
        };

        match listed {
            Ok(entries) => {
                inner.session = Some(session);
                if entries.is_empty() {
                    tracing::warn!("server listed no folders");
                }
                let folders = flatten_folders(entries);
                tracing::debug!(count = folders.len(), "folders listed");
                Ok(folders)
            }
            Err(e) if e.is_connection_lost() => {
                self.settle(&mut inner, None, &e);
                Err(MailError::Connection(format!("connection lost while listing folders: {e}")))
            }
            Err(e) => {
                inner.session = Some(session);
                let error = MailError::Protocol(e.to_string());
                tracing::warn!(error = %error, "folder listing failed, returning no folders");
                Ok(Vec::new())
            }
        }
    }

    /// Searches a folder and returns the matching messages, newest first,
    /// sliced by `offset` and `limit`.
    ///
    /// Messages that fail to parse are replaced by placeholder records.
    ///
    /// # Errors
    ///
    /// [`MailError::Connection`] if no session can be opened,
    /// [`MailError::Fetch`] if opening, searching or fetching fails.
    pub async fn fetch_emails(&self, options: &FetchOptions) -> Result<Vec<MailMessage>> {
        let mut inner = self.inner.lock().await;
        let session = self.checkout(&mut inner).await?;
        let folder = options.folder.as_str();

        let mut mailbox = match open_folder(session, folder, Access::ReadOnly).await {
            Ok(mailbox) => mailbox,
            Err(failure) => {
                self.settle(&mut inner, failure.session, &failure.error);
                return Err(MailError::Fetch(format!(
                    "cannot open folder {folder}: {}",
                    failure.error
                )));
            }
        };
        inner.folder = folder.to_string();

        match search_and_fetch(&mut mailbox, options).await {
            Ok(messages) => {
                inner.session = Some(Session::Open(mailbox));
                Ok(messages)
            }
            Err(e) => {
                self.settle(&mut inner, Some(Session::Open(mailbox)), &e);
                Err(MailError::Fetch(format!("fetching from {folder} failed: {e}")))
            }
        }
    }

    /// Adds `\Seen`.
    ///
    /// # Errors
    ///
    /// [`MailError::Connection`] if no session can be opened,
    /// [`MailError::FlagMutation`] if the UID is unknown or the server
    /// refuses.
    pub async fn mark_as_read(&self, uid: u32) -> Result<()> {
        self.store(uid, StoreAction::Add(vec![Flag::Seen])).await
    }

    /// Removes `\Seen`.
    ///
    /// # Errors
    ///
    /// Same as [`mark_as_read`](Self::mark_as_read).
    pub async fn mark_as_unread(&self, uid: u32) -> Result<()> {
        self.store(uid, StoreAction::Remove(vec![Flag::Seen])).await
    }

    /// Adds `\Deleted`. The message stays until the mailbox is expunged,
    /// which this client never does.
    ///
    /// # Errors
    ///
    /// Same as [`mark_as_read`](Self::mark_as_read).
    pub async fn delete_email(&self, uid: u32) -> Result<()> {
        self.store(uid, StoreAction::Add(vec![Flag::Deleted])).await
    }

    async fn store(&self, uid: u32, action: StoreAction) -> Result<()> {
        let uid = Uid::new(uid)
            .ok_or_else(|| MailError::FlagMutation("UID 0 does not name a message".into()))?;

        let mut inner = self.inner.lock().await;
        let session = self.checkout(&mut inner).await?;
        let folder = inner.folder.clone();

        let mut mailbox = match open_folder(session, &folder, Access::ReadWrite).await {
            Ok(mailbox) => mailbox,
            Err(failure) => {
                self.settle(&mut inner, failure.session, &failure.error);
                return Err(MailError::FlagMutation(format!(
                    "cannot open folder {folder} for writing: {}",
                    failure.error
                )));
            }
        };

        let set = UidSet::single(uid);
        let result = match mailbox.uid_store(&set, action.clone()).await {
            Ok(echoed) if echoed.is_empty() => message_exists(&mut mailbox, &set, uid).await,
            Ok(_) => Ok(true),
            Err(e) => Err(e),
        };
        match result {
            Ok(true) => {
                inner.session = Some(Session::Open(mailbox));
                tracing::debug!(uid = uid.get(), folder = %folder, ?action, "flags updated");
                Ok(())
            }
            Ok(false) => {
                inner.session = Some(Session::Open(mailbox));
                Err(MailError::FlagMutation(format!(
                    "message {uid} not found in {folder}"
                )))
            }
            Err(e) => {
                self.settle(&mut inner, Some(Session::Open(mailbox)), &e);
                Err(MailError::FlagMutation(format!(
                    "updating flags of message {uid} failed: {e}"
                )))
            }
        }
    }

    /// Takes the live session out of `inner`, opening one if needed.
    async fn checkout(&self, inner: &mut Inner<C::Stream>) -> Result<Session<C::Stream>> {
        if let Some(session) = inner.session.take() {
            return Ok(session);
        }
        self.establish().await.map(Session::Idle)
    }

    async fn establish(&self) -> Result<Client<C::Stream, Authenticated>> {
        self.set_state(ConnectionState::Connecting);
        self.attempts.fetch_add(1, Ordering::SeqCst);
        tracing::info!(host = %self.server.host, port = self.server.port, "connecting");

        let result = self.open_and_login().await;
        match &result {
            Ok(_) => {
                self.set_state(ConnectionState::Connected);
                tracing::info!(
                    host = %self.server.host,
                    username = %self.server.username,
                    "connected"
                );
            }
            Err(e) => {
                self.set_state(ConnectionState::Disconnected);
                tracing::warn!(host = %self.server.host, error = %e, "connection failed");
            }
        }
        result
    }

    async fn open_and_login(&self) -> Result<Client<C::Stream, Authenticated>> {
        let greeted = tokio::time::timeout(self.connect_timeout, async {
            let stream = self.connector.connect().await?;
            Client::from_stream(stream).await
        })
        .await;

        let client = match greeted {
            Ok(Ok(client)) => client.with_timeout(self.io_timeout),
            Ok(Err(e)) => {
                return Err(MailError::Connection(format!(
                    "cannot reach {}:{}: {e}",
                    self.server.host, self.server.port
                )));
            }
            Err(_) => {
                return Err(MailError::Connection(format!(
                    "connecting to {}:{} timed out after {}s",
                    self.server.host,
                    self.server.port,
                    self.connect_timeout.as_secs()
                )));
            }
        };

        let login = client.login(&self.server.username, &self.password);
        match tokio::time::timeout(self.auth_timeout, login).await {
            Ok(Ok(client)) => Ok(client),
            Ok(Err(ImapError::Auth(text))) => Err(MailError::Connection(format!(
                "authentication failed: {text}"
            ))),
            Ok(Err(e)) => Err(MailError::Connection(format!("login failed: {e}"))),
            Err(_) => Err(MailError::Connection(format!(
                "authentication timed out after {}s",
                self.auth_timeout.as_secs()
            ))),
        }
    }

    /// Puts back a session that survived `error`, or records its loss.
    fn settle(&self, inner: &mut Inner<C::Stream>, session: Option<Session<C::Stream>>, error: &ImapError) {
        match session {
            Some(session) if !error.is_connection_lost() => inner.session = Some(session),
            _ => {
                inner.session = None;
                self.set_state(ConnectionState::Disconnected);
                tracing::warn!(host = %self.server.host, error = %error, "session lost");
            }
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(encode_state(state), Ordering::SeqCst);
    }
}

const fn encode_state(state: ConnectionState) -> u8 {
    match state {
        ConnectionState::Disconnected => 0,
        ConnectionState::Connecting => 1,
        ConnectionState::Connected => 2,
    }
}

const fn decode_state(value: u8) -> ConnectionState {
    match value {
        1 => ConnectionState::Connecting,
        2 => ConnectionState::Connected,
        _ => ConnectionState::Disconnected,
    }
}

/// Opens `folder`, reusing the session's open mailbox when it already is
/// that folder with sufficient access.
async fn open_folder<S>(
    session: Session<S>,
    folder: &str,
    access: Access,
) -> std::result::Result<Client<S, Selected>, OpenFailure<S>>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let read_only = access == Access::ReadOnly;
    let opened = match session {
        Session::Open(client)
            if client.selected().mailbox() == folder
                && (read_only || !client.selected().is_read_only()) =>
        {
            return Ok(client);
        }
        Session::Open(client) if read_only => client.examine(folder).await,
        Session::Open(client) => client.select(folder).await,
        Session::Idle(client) if read_only => client.examine(folder).await,
        Session::Idle(client) => client.select(folder).await,
    };

    opened.map_err(|e| match e {
        OpenError::Rejected { client, error } => OpenFailure {
            session: Some(Session::Idle(client)),
            error,
        },
        OpenError::Failed(error) => OpenFailure {
            session: None,
            error,
        },
    })
}

/// Whether `uid` is in the open mailbox. Used when a STORE came back
/// without an echo, which servers may do when the flags were already set.
async fn message_exists<S>(
    mailbox: &mut Client<S, Selected>,
    set: &UidSet,
    uid: Uid,
) -> mailboard_imap::Result<bool>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let found = mailbox.uid_fetch(set, vec![FetchAttribute::Uid]).await?;
    Ok(found.iter().any(|outcome| outcome.uid() == Some(uid)))
}

/// `ALL`, narrowed by UNSEEN, SINCE and an OR over SUBJECT/FROM/TO.
fn search_criteria(options: &FetchOptions) -> SearchCriteria {
    let mut keys = vec![SearchCriteria::All];
    if options.unread_only {
        keys.push(SearchCriteria::Unseen);
    }
    if let Some(since) = options.since {
        keys.push(SearchCriteria::Since(since));
    }
    if let Some(text) = options.search_text() {
        keys.extend(SearchCriteria::any_of(vec![
            SearchCriteria::Subject(text.to_string()),
            SearchCriteria::From(text.to_string()),
            SearchCriteria::To(text.to_string()),
        ]));
    }
    SearchCriteria::And(keys)
}

fn fetch_attributes() -> Vec<FetchAttribute> {
    vec![
        FetchAttribute::Uid,
        FetchAttribute::Flags,
        FetchAttribute::InternalDate,
        FetchAttribute::Rfc822Size,
        FetchAttribute::Envelope,
        FetchAttribute::full_message(),
    ]
}

async fn search_and_fetch<S>(
    mailbox: &mut Client<S, Selected>,
    options: &FetchOptions,
) -> mailboard_imap::Result<Vec<MailMessage>>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let uids = mailbox.uid_search(search_criteria(options)).await?;
    tracing::debug!(folder = %options.folder, matches = uids.len(), "search complete");
    if uids.is_empty() {
        return Ok(Vec::new());
    }

    let requested = UidSet::from_uids(uids);
    let outcomes = mailbox.uid_fetch(&requested, fetch_attributes()).await?;

    let mut messages = to_messages(&outcomes, &requested);
    messages.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(options.paginate(messages))
}

/// One record per requested message. Unsolicited FETCH responses (flag
/// updates for other messages, or a duplicate without a body) are skipped.
fn to_messages(outcomes: &[FetchOutcome], requested: &UidSet) -> Vec<MailMessage> {
    fn has_body(outcome: &FetchOutcome) -> bool {
        outcome.items().is_some_and(|items| {
            items
                .iter()
                .any(|item| matches!(item, FetchItem::Body { section: None, .. }))
        })
    }

    let with_body: HashSet<Uid> = outcomes
        .iter()
        .filter(|outcome| has_body(outcome))
        .filter_map(FetchOutcome::uid)
        .collect();

    outcomes
        .iter()
        .filter_map(|outcome| match outcome {
            FetchOutcome::Parsed { seq, items } => {
                let uid = outcome.uid()?;
                if !requested.contains(uid) || (!has_body(outcome) && with_body.contains(&uid)) {
                    return None;
                }
                let raw = RawMessage::from_items(seq.get(), items);
                Some(parse_message(&raw).unwrap_or_else(|e| {
                    tracing::warn!(seq = raw.seq, uid = raw.uid, error = %e, "substituting placeholder for unparseable message");
                    placeholder(raw.seq, raw.uid)
                }))
            }
            FetchOutcome::Malformed { seq, error } => {
                let error = ParseError::MalformedResponse(error.clone());
                tracing::warn!(seq = seq.get(), error = %error, "substituting placeholder for malformed FETCH");
                Some(placeholder(seq.get(), None))
            }
        })
        .collect()
}
