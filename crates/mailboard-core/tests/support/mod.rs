//! A scripted in-process IMAP server for exercising the client end to end.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use mailboard_core::{Connect, MailConfig, MailService, MailboxClient};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};

pub const USERNAME: &str = "jane";
pub const PASSWORD: &str = "secret";

/// One message in the fake INBOX.
#[derive(Debug, Clone)]
pub struct FakeMessage {
    pub uid: u32,
    pub flags: BTreeSet<String>,
    pub body: String,
    /// Answer the FETCH for this message with a line the parser rejects.
    pub malformed_fetch: bool,
}

impl FakeMessage {
    /// A well-formed message whose Date header grows with `n`.
    pub fn numbered(n: u32) -> Self {
        let body = format!(
            "From: Alice Example <alice@example.com>\r\n\
             To: jane@example.com\r\n\
             Subject: Message {n}\r\n\
             Date: {n} Jan 2024 10:00:00 +0000\r\n\
             Message-ID: <m{n}@example.com>\r\n\
             Content-Type: text/plain; charset=utf-8\r\n\
             \r\n\
             Body of message {n}.\r\n"
        );
        Self {
            uid: n,
            flags: BTreeSet::new(),
            body,
            malformed_fetch: false,
        }
    }

    /// A payload with no header section, which the MIME parser rejects.
    pub fn unparseable(uid: u32) -> Self {
        Self {
            uid,
            flags: BTreeSet::new(),
            body: "this is not a message\r\n".to_string(),
            malformed_fetch: false,
        }
    }

    pub fn seen(mut self) -> Self {
        self.flags.insert("\\Seen".to_string());
        self
    }
}

#[derive(Debug, Default)]
struct State {
    inbox: Vec<FakeMessage>,
    folders: Vec<String>,
    logins: usize,
    fetches: usize,
    offline: bool,
    reject_login: bool,
    bye_next: bool,
    echo_changes_only: bool,
    stall_greeting: bool,
    stall_login: bool,
    commands: Vec<String>,
}

/// Cloneable handle to the fake server; each `connect` spawns a session.
#[derive(Debug, Clone, Default)]
pub struct FakeServer {
    state: Arc<Mutex<State>>,
}

impl FakeServer {
    /// INBOX holding messages 1 to `count`, plus a small folder tree.
    pub fn with_messages(count: u32) -> Self {
        let server = Self::default();
        {
            let mut state = server.lock();
            state.inbox = (1..=count).map(FakeMessage::numbered).collect();
            state.folders = vec![
                r#"* LIST (\HasChildren) "/" INBOX"#.to_string(),
                r#"* LIST (\HasNoChildren) "/" INBOX/Receipts"#.to_string(),
                r#"* LIST (\HasNoChildren \Sent) "/" Sent"#.to_string(),
                r#"* LIST (\HasNoChildren) "/" Projects/Alpha"#.to_string(),
            ];
        }
        server
    }

    pub fn set_message(&self, message: FakeMessage) {
        let mut state = self.lock();
        if let Some(slot) = state.inbox.iter_mut().find(|m| m.uid == message.uid) {
            *slot = message;
        } else {
            state.inbox.push(message);
        }
    }

    pub fn flags(&self, uid: u32) -> BTreeSet<String> {
        self.lock()
            .inbox
            .iter()
            .find(|m| m.uid == uid)
            .map(|m| m.flags.clone())
            .unwrap_or_default()
    }

    pub fn logins(&self) -> usize {
        self.lock().logins
    }

    pub fn fetches(&self) -> usize {
        self.lock().fetches
    }

    /// New connections fail at the transport level.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    pub fn reject_login(&self) {
        self.lock().reject_login = true;
    }

    /// The next connection is accepted but never greeted.
    pub fn stall_next_greeting(&self) {
        self.lock().stall_greeting = true;
    }

    /// The next LOGIN is never answered.
    pub fn stall_next_login(&self) {
        self.lock().stall_login = true;
    }

    /// STORE answers carry a FETCH only for messages whose flags changed.
    pub fn echo_changes_only(&self) {
        self.lock().echo_changes_only = true;
    }

    /// Every command line received so far, tags included.
    pub fn commands(&self) -> Vec<String> {
        self.lock().commands.clone()
    }

    /// The next command is answered with BYE and the connection closes.
    pub fn bye_next(&self) {
        self.lock().bye_next = true;
    }

    pub fn config() -> MailConfig {
        MailConfig::new("imap.test", USERNAME, PASSWORD)
    }

    pub fn client(&self) -> MailboxClient<Self> {
        MailboxClient::new(self.clone(), &Self::config())
    }

    pub fn service(&self) -> MailService<Self> {
        MailService::new(self.client())
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }
}

impl Connect for FakeServer {
    type Stream = DuplexStream;

    async fn connect(&self) -> mailboard_imap::Result<DuplexStream> {
        if self.lock().offline {
            return Err(mailboard_imap::Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )));
        }
        let (client, server) = tokio::io::duplex(256 * 1024);
        tokio::spawn(serve(server, Arc::clone(&self.state)));
        Ok(client)
    }
}

enum Reply {
    Continue(String),
    Close(String),
    Stall,
}

async fn serve(stream: DuplexStream, state: Arc<Mutex<State>>) {
    let stall = std::mem::take(&mut state.lock().unwrap().stall_greeting);
    if stall {
        let _held = stream;
        std::future::pending::<()>().await;
        return;
    }

    let (read, mut write) = tokio::io::split(stream);
    let mut lines = BufReader::new(read);
    if write
        .write_all(b"* OK [CAPABILITY IMAP4rev1] fake server ready\r\n")
        .await
        .is_err()
    {
        return;
    }

    let mut selected: Option<String> = None;
    let mut line = String::new();
    loop {
        line.clear();
        match lines.read_line(&mut line).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        let command = line.trim_end().to_string();
        let Some((tag, rest)) = command.split_once(' ') else {
            continue;
        };

        if rest.starts_with("LOGIN ") {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        let reply = {
            let mut state = state.lock().unwrap();
            handle(&mut state, &mut selected, tag, rest)
        };
        let (text, close) = match reply {
            Reply::Continue(text) => (text, false),
            Reply::Close(text) => (text, true),
            Reply::Stall => {
                let _held = (lines, write);
                std::future::pending::<()>().await;
                return;
            }
        };
        if write.write_all(text.as_bytes()).await.is_err() || close {
            let _ = write.shutdown().await;
            return;
        }
    }
}

fn handle(state: &mut State, selected: &mut Option<String>, tag: &str, rest: &str) -> Reply {
    state.commands.push(format!("{tag} {rest}"));
    if std::mem::take(&mut state.bye_next) {
        return Reply::Close("* BYE server going down\r\n".to_string());
    }

    let (verb, args) = rest.split_once(' ').unwrap_or((rest, ""));
    match verb {
        "LOGIN" if std::mem::take(&mut state.stall_login) => Reply::Stall,
        "LOGIN" => {
            let expected = format!("{USERNAME} {PASSWORD}");
            if state.reject_login || args != expected {
                Reply::Continue(format!(
                    "{tag} NO [AUTHENTICATIONFAILED] Invalid credentials\r\n"
                ))
            } else {
                state.logins += 1;
                Reply::Continue(format!("{tag} OK Logged in\r\n"))
            }
        }
        "LIST" => {
            let mut out = String::new();
            for folder in &state.folders {
                let _ = write!(out, "{folder}\r\n");
            }
            let _ = write!(out, "{tag} OK LIST completed\r\n");
            Reply::Continue(out)
        }
        "SELECT" | "EXAMINE" => {
            let known = args == "INBOX"
                || state
                    .folders
                    .iter()
                    .any(|f| f.ends_with(&format!(" {args}")));
            if !known {
                *selected = None;
                return Reply::Continue(format!("{tag} NO Mailbox does not exist\r\n"));
            }
            *selected = Some(args.to_string());
            let exists = if args == "INBOX" { state.inbox.len() } else { 0 };
            let access = if verb == "SELECT" { "READ-WRITE" } else { "READ-ONLY" };
            Reply::Continue(format!(
                "* {exists} EXISTS\r\n* 0 RECENT\r\n* OK [UIDVALIDITY 1] UIDs valid\r\n\
                 * FLAGS (\\Seen \\Deleted \\Flagged \\Answered)\r\n{tag} OK [{access}] done\r\n"
            ))
        }
        "UID" => {
            if selected.as_deref().is_none() {
                return Reply::Continue(format!("{tag} BAD No mailbox selected\r\n"));
            }
            let in_inbox = selected.as_deref() == Some("INBOX");
            let (sub, sub_args) = args.split_once(' ').unwrap_or((args, ""));
            match sub {
                "SEARCH" => Reply::Continue(search(state, in_inbox, tag, sub_args)),
                "FETCH" => Reply::Continue(fetch(state, in_inbox, tag, sub_args)),
                "STORE" => Reply::Continue(store(state, in_inbox, tag, sub_args)),
                _ => Reply::Continue(format!("{tag} BAD Unknown UID command\r\n")),
            }
        }
        "NOOP" => Reply::Continue(format!("{tag} OK NOOP completed\r\n")),
        "LOGOUT" => Reply::Close(format!("* BYE Logging out\r\n{tag} OK LOGOUT completed\r\n")),
        _ => Reply::Continue(format!("{tag} BAD Unknown command\r\n")),
    }
}

fn search(state: &State, in_inbox: bool, tag: &str, args: &str) -> String {
    let unseen_only = args.split_whitespace().any(|key| key == "UNSEEN");
    let mut out = String::from("* SEARCH");
    if in_inbox {
        for message in &state.inbox {
            if unseen_only && message.flags.contains("\\Seen") {
                continue;
            }
            let _ = write!(out, " {}", message.uid);
        }
    }
    let _ = write!(out, "\r\n{tag} OK SEARCH completed\r\n");
    out
}

fn fetch(state: &mut State, in_inbox: bool, tag: &str, args: &str) -> String {
    let (set, items) = args.split_once(' ').unwrap_or((args, ""));
    let with_body = items.contains("BODY");
    if with_body {
        state.fetches += 1;
    }
    let mut out = String::new();
    if in_inbox {
        for (index, message) in state.inbox.iter().enumerate() {
            if !uid_in_set(message.uid, set) {
                continue;
            }
            let seq = index + 1;
            if !with_body {
                let _ = write!(out, "* {seq} FETCH (UID {})\r\n", message.uid);
                continue;
            }
            if message.malformed_fetch {
                let _ = write!(out, "* {seq} FETCH (UID {} BODY[] oops)\r\n", message.uid);
                continue;
            }
            let flags = message.flags.iter().cloned().collect::<Vec<_>>().join(" ");
            let size = message.body.len();
            let _ = write!(
                out,
                "* {seq} FETCH (UID {uid} FLAGS ({flags}) INTERNALDATE \"01-Feb-2024 08:00:00 +0000\" \
                 RFC822.SIZE {size} BODY[] {{{size}}}\r\n{body})\r\n",
                uid = message.uid,
                body = message.body,
            );
        }
    }
    let _ = write!(out, "{tag} OK FETCH completed\r\n");
    out
}

fn store(state: &mut State, in_inbox: bool, tag: &str, args: &str) -> String {
    let mut parts = args.splitn(3, ' ');
    let set = parts.next().unwrap_or_default();
    let item = parts.next().unwrap_or_default();
    let flags: Vec<String> = parts
        .next()
        .unwrap_or_default()
        .trim_matches(|c| c == '(' || c == ')')
        .split_whitespace()
        .map(str::to_string)
        .collect();

    let quiet = state.echo_changes_only;
    let mut out = String::new();
    if in_inbox {
        for (index, message) in state.inbox.iter_mut().enumerate() {
            if !uid_in_set(message.uid, set) {
                continue;
            }
            let before = message.flags.clone();
            match item {
                "+FLAGS" => message.flags.extend(flags.iter().cloned()),
                "-FLAGS" => message.flags.retain(|f| !flags.contains(f)),
                _ => message.flags = flags.iter().cloned().collect(),
            }
            if quiet && before == message.flags {
                continue;
            }
            let current = message.flags.iter().cloned().collect::<Vec<_>>().join(" ");
            let _ = write!(
                out,
                "* {} FETCH (UID {} FLAGS ({current}))\r\n",
                index + 1,
                message.uid
            );
        }
    }
    let _ = write!(out, "{tag} OK STORE completed\r\n");
    out
}

fn uid_in_set(uid: u32, set: &str) -> bool {
    set.split(',').any(|part| match part.split_once(':') {
        Some((start, end)) => {
            let start: u32 = start.parse().unwrap_or(u32::MAX);
            let end: u32 = end.parse().unwrap_or(0);
            (start.min(end)..=start.max(end)).contains(&uid)
        }
        None => part.parse() == Ok(uid),
    })
}
