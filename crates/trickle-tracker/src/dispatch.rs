//! Request dispatch — decodes one datagram, applies it to the registry
//! and catalog, and produces at most one response datagram.
//!
//! The tracker holds no per-connection state: every request is complete
//! in itself, and handling is a pure function of (request, registry,
//! catalog) plus the state mutation it performs. A bad datagram can
//! never take the dispatcher down — malformed known commands get that
//! command's failure response, unrecognized ones are logged and dropped.

use std::net::SocketAddr;
use std::sync::Arc;

use trickle_core::wire::{Request, Response, WireError};

use crate::catalog::{FileCatalog, PublishOutcome, UnpublishOutcome};
use crate::credentials::CredentialStore;
use crate::registry::{AuthOutcome, PeerRegistry};

/// The tracker's request-handling core. Cheap to clone; all clones share
/// the same registry and catalog.
#[derive(Clone)]
pub struct Tracker {
    registry: PeerRegistry,
    catalog: FileCatalog,
    credentials: Arc<dyn CredentialStore>,
}

impl Tracker {
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            registry: PeerRegistry::new(),
            catalog: FileCatalog::new(),
            credentials,
        }
    }

    /// The registry handle, shared with the liveness sweep.
    pub fn registry(&self) -> PeerRegistry {
        self.registry.clone()
    }

    /// Handle one inbound datagram. `None` means no reply is sent —
    /// heartbeats and unrecognized commands.
    pub async fn handle_datagram(&self, datagram: &[u8], source: SocketAddr) -> Option<Response> {
        let text = match std::str::from_utf8(datagram) {
            Ok(text) => text,
            Err(_) => {
                tracing::warn!(%source, "non-UTF-8 datagram, dropped");
                return None;
            }
        };
        match Request::parse(text) {
            Ok(request) => self.handle_request(request, source).await,
            Err(WireError::Malformed { command, reason }) => {
                tracing::warn!(%source, %command, reason, "malformed request");
                command.failure_response()
            }
            Err(e) => {
                tracing::warn!(%source, error = %e, "unrecognized datagram, dropped");
                None
            }
        }
    }

    async fn handle_request(&self, request: Request, source: SocketAddr) -> Option<Response> {
        match request {
            Request::Auth { username, password } => {
                let outcome = self
                    .registry
                    .authenticate(&username, &password, &*self.credentials, source)
                    .await;
                tracing::info!(user = %username, %source, ?outcome, "auth request");
                Some(match outcome {
                    AuthOutcome::Success => Response::AuthSuccess,
                    AuthOutcome::AlreadyActive => Response::AuthAlreadyActive,
                    AuthOutcome::InvalidCredentials => Response::AuthFailed,
                })
            }

            Request::Heartbeat { username } => {
                // Fire-and-forget: never answered, even for unknown users.
                self.registry.record_heartbeat(&username, source).await;
                None
            }

            Request::ActivePeers { username } => {
                let mut names = self.registry.list_active().await;
                names.retain(|name| name != &username);
                tracing::debug!(user = %username, count = names.len(), "active peers request");
                Some(Response::ActivePeers(names))
            }

            Request::Publish { username, filename, port } => {
                // The advertised host is the datagram's source address:
                // the tracker never takes a peer's word for where it is.
                let outcome = self
                    .catalog
                    .publish(&filename, &username, source.ip(), port)
                    .await;
                tracing::info!(user = %username, file = %filename, port, ?outcome, "publish");
                Some(match outcome {
                    PublishOutcome::Published => Response::PubSuccess,
                    PublishOutcome::Malformed => Response::PubFail,
                })
            }

            Request::Unpublish { username, filename, port } => {
                let outcome = self
                    .catalog
                    .unpublish(&filename, &username, source.ip(), port)
                    .await;
                tracing::info!(user = %username, file = %filename, port, ?outcome, "unpublish");
                Some(match outcome {
                    UnpublishOutcome::Removed => Response::UnpubSuccess,
                    UnpublishOutcome::NotFound => Response::UnpubFail,
                })
            }

            Request::ListFiles { username } => {
                let files = self.catalog.list_published_by(&username).await;
                tracing::debug!(user = %username, count = files.len(), "list files request");
                Some(if files.is_empty() {
                    Response::FailPublishedFiles
                } else {
                    Response::PublishedFiles(files)
                })
            }

            Request::SearchFiles { substring, username } => {
                let live = self.live_set().await;
                let found = self
                    .catalog
                    .search(&substring, &username, |user| live.contains(user))
                    .await;
                tracing::debug!(user = %username, needle = %substring, count = found.len(), "search");
                Some(if found.is_empty() {
                    Response::FailFoundFiles
                } else {
                    Response::FoundFiles(found)
                })
            }

            Request::QueryFile { filename, username } => {
                let live = self.live_set().await;
                let resolved = self
                    .catalog
                    .resolve(&filename, |user| live.contains(user))
                    .await;
                match resolved {
                    Some(adv) => {
                        tracing::info!(
                            user = %username,
                            file = %filename,
                            publisher = %adv.publisher,
                            host = %adv.host,
                            port = adv.port,
                            "query resolved"
                        );
                        Some(Response::QuerySuccess {
                            host: adv.host,
                            port: adv.port,
                        })
                    }
                    None => {
                        tracing::info!(user = %username, file = %filename, "query failed");
                        Some(Response::QueryFail)
                    }
                }
            }
        }
    }

    /// Snapshot the live usernames so catalog queries can filter without
    /// holding both locks at once.
    async fn live_set(&self) -> std::collections::HashSet<String> {
        self.registry.list_active().await.into_iter().collect()
    }
}
