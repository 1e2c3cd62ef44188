//! Scoped inventory session.

use crate::provider::{ConnectOptions, ProbeResult, SessionProvider};
use std::ops::Deref;
use tracing::{debug, info, warn};
use vcevidence_common::{Error, Result};

/// An open session. Released exactly once, on [`Session::close`] or on drop.
pub struct Session<P: SessionProvider> {
    provider: P,
    target: String,
    released: bool,
}

impl<P: SessionProvider> Session<P> {
    fn new(provider: P, target: &str) -> Self {
        Self {
            provider,
            target: target.to_string(),
            released: false,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Release the session and report the outcome.
    pub fn close(mut self) -> ProbeResult<()> {
        self.release_once()
    }

    fn release_once(&mut self) -> ProbeResult<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        debug!("Releasing session to {}", self.target);
        self.provider.release()
    }
}

impl<P: SessionProvider> Deref for Session<P> {
    type Target = P;

    fn deref(&self) -> &P {
        &self.provider
    }
}

impl<P: SessionProvider> Drop for Session<P> {
    fn drop(&mut self) {
        if let Err(e) = self.release_once() {
            warn!("Session release for {} failed: {}", self.target, e);
        }
    }
}

/// Open and verify a session.
///
/// A session that opens but fails its handshake is released before the
/// connection error is returned.
pub fn connect<P: SessionProvider>(options: &ConnectOptions) -> Result<Session<P>> {
    match &options.credentials {
        Some(credentials) => info!("Connecting to {} as {}", options.target, credentials.user),
        None => info!("Connecting to {}", options.target),
    }

    let provider = P::open(options).map_err(|e| Error::Connection {
        target: options.target.clone(),
        reason: e.to_string(),
    })?;
    let session = Session::new(provider, &options.target);

    session
        .handshake(options)
        .map_err(|e| Error::Connection {
            target: options.target.clone(),
            reason: e.to_string(),
        })?;

    info!("Session established with {}", options.target);
    Ok(session)
}
