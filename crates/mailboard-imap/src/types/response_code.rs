//! Response status and bracketed response codes.

use super::{Flag, Uid, UidValidity};

/// Status keyword of a tagged or untagged status response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// OK
    Ok,
    /// NO
    No,
    /// BAD
    Bad,
    /// PREAUTH
    PreAuth,
    /// BYE
    Bye,
}

/// Bracketed response code, e.g. `[UIDVALIDITY 3857529045]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseCode {
    /// `[ALERT]`
    Alert,
    /// `[AUTHENTICATIONFAILED]` (RFC 5530)
    AuthenticationFailed,
    /// `[CAPABILITY ...]`
    Capability(Vec<String>),
    /// `[PERMANENTFLAGS (...)]`
    PermanentFlags(Vec<Flag>),
    /// `[READ-ONLY]`
    ReadOnly,
    /// `[READ-WRITE]`
    ReadWrite,
    /// `[TRYCREATE]`
    TryCreate,
    /// `[UIDNEXT n]`
    UidNext(Uid),
    /// `[UIDVALIDITY n]`
    UidValidity(UidValidity),
    /// `[UNSEEN n]`
    Unseen(u32),
    /// Any other code, by name.
    Other(String),
}
