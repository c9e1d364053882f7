//! Derived-port strategy — every username maps to a fixed TCP port for
//! its transfer listener, so publishing the same file from the same
//! account always advertises the same address on a given host.
//!
//! The mapping is the sum of the ASCII values of the username's last two
//! characters, folded into [55000, 60000). Two usernames can collide on
//! one host; the second peer's bind then fails and is reported. That
//! collision is a known limitation of the scheme, deliberately left
//! unresolved rather than papered over by widening the range.

/// First port of the derived range.
pub const BASE_PORT: u16 = 55000;

/// Size of the derived range.
pub const PORT_RANGE: u16 = 5000;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PortError {
    #[error("username must have at least 2 characters")]
    UsernameTooShort,
}

/// Transfer-listener port for `username`.
pub fn derive_port(username: &str) -> Result<u16, PortError> {
    let chars: Vec<char> = username.chars().collect();
    if chars.len() < 2 {
        return Err(PortError::UsernameTooShort);
    }
    let sum: u32 = chars[chars.len() - 2..].iter().map(|&c| c as u32).sum();
    Ok(BASE_PORT + (sum % PORT_RANGE as u32) as u16)
}
