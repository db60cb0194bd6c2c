//! Command-line arguments.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use mailboard_core::{FetchOptions, MailConfig, MailError};

#[derive(Debug, Parser)]
#[command(name = "mailboard", version, about = "Read and triage an IMAP mailbox")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Bypass the local cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Cache directory [default: the platform cache dir]
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Overrides for the `MAILBOARD_*` environment variables.
#[derive(Debug, Default, Args)]
pub struct ConnectionArgs {
    /// IMAP server host
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// IMAP server port
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Login name
    #[arg(long, global = true)]
    pub username: Option<String>,

    /// Login secret (prefer `MAILBOARD_PASSWORD`)
    #[arg(long, global = true)]
    pub password: Option<String>,

    /// Connect without TLS
    #[arg(long, global = true)]
    pub no_tls: bool,

    /// Skip certificate validation
    #[arg(long, global = true)]
    pub accept_invalid_certs: bool,
}

impl ConnectionArgs {
    fn lookup(&self, name: &str) -> Option<String> {
        match name {
            "MAILBOARD_IMAP_HOST" => self.host.clone(),
            "MAILBOARD_IMAP_PORT" => self.port.map(|p| p.to_string()),
            "MAILBOARD_USERNAME" => self.username.clone(),
            "MAILBOARD_PASSWORD" => self.password.clone(),
            "MAILBOARD_TLS" if self.no_tls => Some("false".into()),
            "MAILBOARD_ACCEPT_INVALID_CERTS" if self.accept_invalid_certs => Some("true".into()),
            _ => None,
        }
    }

    /// Flags first, then the environment through `env`.
    pub fn mail_config<F>(&self, env: F) -> Result<MailConfig, MailError>
    where
        F: Fn(&str) -> Option<String>,
    {
        MailConfig::from_lookup(|name| self.lookup(name).or_else(|| env(name)))
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List folders
    Folders,
    /// List messages of a folder
    Emails(EmailsArgs),
    /// Important messages and suggested next steps for a folder
    Suggest(EmailsArgs),
    /// Mark an INBOX message as read
    Read { uid: u32 },
    /// Mark an INBOX message as unread
    Unread { uid: u32 },
    /// Flag an INBOX message as deleted (no expunge)
    Delete { uid: u32 },
    /// Connect and show the resulting connection status
    Status,
    /// Check that the server accepts the credentials
    Test,
}

#[derive(Debug, Args)]
pub struct EmailsArgs {
    /// Folder path
    #[arg(short, long, default_value = mailboard_core::model::DEFAULT_FOLDER)]
    pub folder: String,

    /// Maximum number of messages
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Messages to skip
    #[arg(long, default_value_t = 0)]
    pub offset: usize,

    /// Only unread messages
    #[arg(short, long)]
    pub unread: bool,

    /// Match subject, sender or recipients
    #[arg(short, long)]
    pub search: Option<String>,

    /// Only messages on or after this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub since: Option<NaiveDate>,
}

impl From<EmailsArgs> for FetchOptions {
    fn from(args: EmailsArgs) -> Self {
        Self {
            folder: args.folder,
            limit: args.limit,
            offset: args.offset,
            unread_only: args.unread,
            search: args.search,
            since: args.since,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("mailboard").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_emails_arguments() {
        let cli = parse(&[
            "emails", "--folder", "Work", "--limit", "10", "--offset", "5", "--unread", "--since",
            "2024-01-10",
        ]);
        let Command::Emails(args) = cli.command else {
            panic!("expected emails");
        };
        let options = FetchOptions::from(args);
        assert_eq!(options.folder, "Work");
        assert_eq!(options.limit, Some(10));
        assert_eq!(options.offset, 5);
        assert!(options.unread_only);
        assert_eq!(options.since, NaiveDate::from_ymd_opt(2024, 1, 10));
    }

    #[test]
    fn test_emails_defaults() {
        let cli = parse(&["emails"]);
        let Command::Emails(args) = cli.command else {
            panic!("expected emails");
        };
        assert_eq!(FetchOptions::from(args), FetchOptions::default());
    }

    #[test]
    fn test_suggest_takes_fetch_options() {
        let Command::Suggest(args) = parse(&["suggest", "--unread"]).command else {
            panic!("expected suggest");
        };
        assert!(FetchOptions::from(args).unread_only);
    }

    #[test]
    fn test_flag_commands_take_uid() {
        assert!(matches!(parse(&["read", "42"]).command, Command::Read { uid: 42 }));
        assert!(matches!(parse(&["delete", "7"]).command, Command::Delete { uid: 7 }));
        assert!(Cli::try_parse_from(["mailboard", "unread", "x"]).is_err());
    }

    #[test]
    fn test_flags_override_environment() {
        let cli = parse(&["--host", "imap.example.com", "--no-tls", "status"]);
        let env = |name: &str| match name {
            "MAILBOARD_IMAP_HOST" => Some("ignored.example.com".to_string()),
            "MAILBOARD_USERNAME" => Some("jane".to_string()),
            "MAILBOARD_PASSWORD" => Some("secret".to_string()),
            _ => None,
        };
        let config = cli.connection.mail_config(env).unwrap();
        assert_eq!(config.host, "imap.example.com");
        assert!(!config.tls);
        assert_eq!(config.port, 143);
        assert_eq!(config.username, "jane");
    }

    #[test]
    fn test_missing_credentials_is_config_error() {
        let cli = parse(&["test"]);
        let err = cli.connection.mail_config(|_| None).unwrap_err();
        assert!(matches!(err, MailError::Config(_)));
    }
}
