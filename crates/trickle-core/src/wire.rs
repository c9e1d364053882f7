//! Trickle wire format — the tokenized text protocol spoken between peers
//! and the tracker, and between peers during a transfer.
//!
//! These types ARE the protocol. Every keyword below is part of the wire
//! format; changing one is a breaking change for every deployed peer.
//!
//! Tracker traffic is one UDP datagram per request and (at most) one per
//! response: space-separated tokens, first token is the command keyword.
//! File transfer is one TCP connection per download: a single `DOWNLOAD`
//! request line terminated by `\n`, then raw file bytes until the serving
//! peer closes the connection.

use std::fmt;
use std::net::IpAddr;

/// Largest datagram either side will send or accept.
pub const MAX_DATAGRAM: usize = 1024;

/// Separator for name lists inside a single response datagram.
/// Filenames and usernames are whitespace-free tokens, so `", "` is
/// unambiguous.
const LIST_SEP: &str = ", ";

// ── Errors ────────────────────────────────────────────────────────────────────

/// Command keyword of a request, used to map a malformed request to the
/// failure response of the command it was trying to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Auth,
    Heartbeat,
    ActivePeers,
    Publish,
    Unpublish,
    ListFiles,
    SearchFiles,
    QueryFile,
}

impl Command {
    /// The generic failure response for this command, or `None` for
    /// fire-and-forget commands that never get a reply.
    pub fn failure_response(self) -> Option<Response> {
        match self {
            Command::Auth => Some(Response::AuthFailed),
            Command::Heartbeat => None,
            Command::ActivePeers => Some(Response::ActivePeersFail),
            Command::Publish => Some(Response::PubFail),
            Command::Unpublish => Some(Response::UnpubFail),
            Command::ListFiles => Some(Response::FailPublishedFiles),
            Command::SearchFiles => Some(Response::FailFoundFiles),
            Command::QueryFile => Some(Response::QueryFail),
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Command::Auth => "AUTH",
            Command::Heartbeat => "HEARTBEAT",
            Command::ActivePeers => "ACTIVE_PEERS",
            Command::Publish => "PUBLISH",
            Command::Unpublish => "UNPUBLISH",
            Command::ListFiles => "LIST_FILES",
            Command::SearchFiles => "SEARCH_FILES",
            Command::QueryFile => "QUERY_FILE",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WireError {
    /// First token is not a command keyword we know. The tracker drops
    /// these silently.
    #[error("unrecognized command keyword: {0:?}")]
    Unrecognized(String),

    /// Known command with the wrong shape (field count, bad port, empty
    /// field). The tracker answers with the command's failure response.
    #[error("malformed {command} request: {reason}")]
    Malformed {
        command: Command,
        reason: &'static str,
    },

    /// A response datagram the peer side could not interpret.
    #[error("malformed response: {0}")]
    BadResponse(&'static str),
}

fn malformed(command: Command, reason: &'static str) -> WireError {
    WireError::Malformed { command, reason }
}

// ── Requests ──────────────────────────────────────────────────────────────────

/// One tracker request, decoded from a single datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Auth { username: String, password: String },
    Heartbeat { username: String },
    ActivePeers { username: String },
    Publish { username: String, filename: String, port: u16 },
    Unpublish { username: String, filename: String, port: u16 },
    ListFiles { username: String },
    SearchFiles { substring: String, username: String },
    QueryFile { filename: String, username: String },
}

impl Request {
    /// Decode one datagram. Distinguishes an unknown keyword (silently
    /// droppable) from a known command with the wrong shape (answerable
    /// with that command's failure response).
    pub fn parse(text: &str) -> Result<Self, WireError> {
        let text = text.trim_end_matches(['\r', '\n']);
        let (keyword, rest) = match text.split_once(' ') {
            Some((k, r)) => (k, r),
            None => (text, ""),
        };

        match keyword {
            "AUTH" => {
                // Password is the remainder of the line and may contain
                // any byte except a newline.
                let (username, password) = rest
                    .split_once(' ')
                    .ok_or(malformed(Command::Auth, "expected <username> <password>"))?;
                if username.is_empty() || password.is_empty() {
                    return Err(malformed(Command::Auth, "empty username or password"));
                }
                Ok(Request::Auth {
                    username: username.to_string(),
                    password: password.to_string(),
                })
            }
            "HEARTBEAT" => {
                let username = single_field(rest, Command::Heartbeat)?;
                Ok(Request::Heartbeat { username })
            }
            "ACTIVE_PEERS" => {
                let username = single_field(rest, Command::ActivePeers)?;
                Ok(Request::ActivePeers { username })
            }
            "PUBLISH" => {
                let (username, filename, port) = publish_fields(rest, Command::Publish)?;
                Ok(Request::Publish { username, filename, port })
            }
            "UNPUBLISH" => {
                let (username, filename, port) = publish_fields(rest, Command::Unpublish)?;
                Ok(Request::Unpublish { username, filename, port })
            }
            "LIST_FILES" => {
                let username = single_field(rest, Command::ListFiles)?;
                Ok(Request::ListFiles { username })
            }
            "SEARCH_FILES" => {
                let (substring, username) = rest.split_once(' ').ok_or(malformed(
                    Command::SearchFiles,
                    "expected <substring> <username>",
                ))?;
                if substring.is_empty() || username.is_empty() || username.contains(' ') {
                    return Err(malformed(Command::SearchFiles, "empty or extra field"));
                }
                Ok(Request::SearchFiles {
                    substring: substring.to_string(),
                    username: username.to_string(),
                })
            }
            "QUERY_FILE" => {
                let (filename, username) = rest.split_once(' ').ok_or(malformed(
                    Command::QueryFile,
                    "expected <filename> <username>",
                ))?;
                if filename.is_empty() || username.is_empty() || username.contains(' ') {
                    return Err(malformed(Command::QueryFile, "empty or extra field"));
                }
                Ok(Request::QueryFile {
                    filename: filename.to_string(),
                    username: username.to_string(),
                })
            }
            other => Err(WireError::Unrecognized(other.to_string())),
        }
    }

    /// Encode for sending. Inverse of [`Request::parse`].
    pub fn encode(&self) -> String {
        match self {
            Request::Auth { username, password } => format!("AUTH {username} {password}"),
            Request::Heartbeat { username } => format!("HEARTBEAT {username}"),
            Request::ActivePeers { username } => format!("ACTIVE_PEERS {username}"),
            Request::Publish { username, filename, port } => {
                format!("PUBLISH {username} {filename} {port}")
            }
            Request::Unpublish { username, filename, port } => {
                format!("UNPUBLISH {username} {filename} {port}")
            }
            Request::ListFiles { username } => format!("LIST_FILES {username}"),
            Request::SearchFiles { substring, username } => {
                format!("SEARCH_FILES {substring} {username}")
            }
            Request::QueryFile { filename, username } => {
                format!("QUERY_FILE {filename} {username}")
            }
        }
    }

    /// The command this request belongs to.
    pub fn command(&self) -> Command {
        match self {
            Request::Auth { .. } => Command::Auth,
            Request::Heartbeat { .. } => Command::Heartbeat,
            Request::ActivePeers { .. } => Command::ActivePeers,
            Request::Publish { .. } => Command::Publish,
            Request::Unpublish { .. } => Command::Unpublish,
            Request::ListFiles { .. } => Command::ListFiles,
            Request::SearchFiles { .. } => Command::SearchFiles,
            Request::QueryFile { .. } => Command::QueryFile,
        }
    }
}

fn single_field(rest: &str, command: Command) -> Result<String, WireError> {
    if rest.is_empty() || rest.contains(' ') {
        return Err(malformed(command, "expected exactly one field"));
    }
    Ok(rest.to_string())
}

fn publish_fields(rest: &str, command: Command) -> Result<(String, String, u16), WireError> {
    let mut fields = rest.split(' ');
    let username = fields.next().filter(|f| !f.is_empty());
    let filename = fields.next().filter(|f| !f.is_empty());
    let port = fields.next().filter(|f| !f.is_empty());
    let (Some(username), Some(filename), Some(port)) = (username, filename, port) else {
        return Err(malformed(command, "expected <username> <filename> <port>"));
    };
    if fields.next().is_some() {
        return Err(malformed(command, "too many fields"));
    }
    let port: u16 = port
        .parse()
        .map_err(|_| malformed(command, "port is not a number in 0..=65535"))?;
    Ok((username.to_string(), filename.to_string(), port))
}

// ── Responses ─────────────────────────────────────────────────────────────────

/// One tracker response, encoded into a single datagram.
///
/// The file-list variants pair with explicit FAIL markers for the empty
/// case; `ActivePeers` may legitimately be empty and encodes as the bare
/// keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    AuthSuccess,
    AuthAlreadyActive,
    AuthFailed,
    ActivePeers(Vec<String>),
    ActivePeersFail,
    PubSuccess,
    PubFail,
    UnpubSuccess,
    UnpubFail,
    PublishedFiles(Vec<String>),
    FailPublishedFiles,
    FoundFiles(Vec<String>),
    FailFoundFiles,
    QuerySuccess { host: IpAddr, port: u16 },
    QueryFail,
}

impl Response {
    pub fn encode(&self) -> String {
        match self {
            Response::AuthSuccess => "AUTH_SUCCESS".to_string(),
            Response::AuthAlreadyActive => "AUTH_ALREADY_ACTIVE".to_string(),
            Response::AuthFailed => "AUTH_FAILED".to_string(),
            Response::ActivePeers(names) => keyword_list("ACTIVE_PEERS", names),
            Response::ActivePeersFail => "ACTIVE_PEERS_FAIL".to_string(),
            Response::PubSuccess => "PUB_SUCCESS".to_string(),
            Response::PubFail => "PUB_FAIL".to_string(),
            Response::UnpubSuccess => "UNPUB_SUCCESS".to_string(),
            Response::UnpubFail => "UNPUB_FAIL".to_string(),
            Response::PublishedFiles(names) => keyword_list("PUBLISHED_FILES", names),
            Response::FailPublishedFiles => "FAIL_PUBLISHED_FILES".to_string(),
            Response::FoundFiles(names) => keyword_list("FOUND_FILES", names),
            Response::FailFoundFiles => "FAIL_FOUND_FILES".to_string(),
            Response::QuerySuccess { host, port } => format!("QUERY_SUCCESS {host} {port}"),
            Response::QueryFail => "QUERY_FAIL".to_string(),
        }
    }

    /// Decode a response datagram on the peer side.
    pub fn parse(text: &str) -> Result<Self, WireError> {
        let text = text.trim_end_matches(['\r', '\n']);
        let (keyword, rest) = match text.split_once(' ') {
            Some((k, r)) => (k, r),
            None => (text, ""),
        };
        match keyword {
            "AUTH_SUCCESS" => Ok(Response::AuthSuccess),
            "AUTH_ALREADY_ACTIVE" => Ok(Response::AuthAlreadyActive),
            "AUTH_FAILED" => Ok(Response::AuthFailed),
            "ACTIVE_PEERS" => Ok(Response::ActivePeers(parse_list(rest))),
            "ACTIVE_PEERS_FAIL" => Ok(Response::ActivePeersFail),
            "PUB_SUCCESS" => Ok(Response::PubSuccess),
            "PUB_FAIL" => Ok(Response::PubFail),
            "UNPUB_SUCCESS" => Ok(Response::UnpubSuccess),
            "UNPUB_FAIL" => Ok(Response::UnpubFail),
            "PUBLISHED_FILES" => Ok(Response::PublishedFiles(parse_list(rest))),
            "FAIL_PUBLISHED_FILES" => Ok(Response::FailPublishedFiles),
            "FOUND_FILES" => Ok(Response::FoundFiles(parse_list(rest))),
            "FAIL_FOUND_FILES" => Ok(Response::FailFoundFiles),
            "QUERY_SUCCESS" => {
                let (host, port) = rest
                    .split_once(' ')
                    .ok_or(WireError::BadResponse("QUERY_SUCCESS needs <host> <port>"))?;
                let host: IpAddr = host
                    .parse()
                    .map_err(|_| WireError::BadResponse("bad host in QUERY_SUCCESS"))?;
                let port: u16 = port
                    .parse()
                    .map_err(|_| WireError::BadResponse("bad port in QUERY_SUCCESS"))?;
                Ok(Response::QuerySuccess { host, port })
            }
            "QUERY_FAIL" => Ok(Response::QueryFail),
            _ => Err(WireError::BadResponse("unknown response keyword")),
        }
    }
}

fn keyword_list(keyword: &str, names: &[String]) -> String {
    if names.is_empty() {
        keyword.to_string()
    } else {
        format!("{keyword} {}", names.join(LIST_SEP))
    }
}

fn parse_list(rest: &str) -> Vec<String> {
    if rest.is_empty() {
        Vec::new()
    } else {
        rest.split(LIST_SEP).map(str::to_string).collect()
    }
}

// ── File transfer request line ────────────────────────────────────────────────

/// Build the one request line a downloading peer sends after connecting.
pub fn download_request(filename: &str) -> String {
    format!("DOWNLOAD {filename}\n")
}

/// Decode the request line on the serving side. Returns the filename.
pub fn parse_download(line: &str) -> Option<&str> {
    let line = line.trim_end_matches(['\r', '\n']);
    let filename = line.strip_prefix("DOWNLOAD ")?;
    if filename.is_empty() || filename.contains(' ') {
        return None;
    }
    Some(filename)
}
