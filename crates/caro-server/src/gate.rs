use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

/// Password gate a connection must clear before the room sees it.
#[derive(Clone)]
pub struct Gate {
    password: Option<String>,
}

impl Gate {
    pub fn new(password: Option<String>) -> Self {
        Self { password }
    }

    /// An open gate has no password configured and admits everyone.
    pub fn is_open(&self) -> bool {
        self.password.is_none()
    }

    /// Check a submitted password in constant time.
    pub fn verify(&self, provided: &str) -> bool {
        match &self.password {
            None => true,
            Some(expected) => constant_time_eq(provided.as_bytes(), expected.as_bytes()),
        }
    }
}

/// Constant-time equality via the double-HMAC pattern: both inputs are
/// MAC'd under an ephemeral random key and the tags compared.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    type HmacSha256 = Hmac<Sha256>;

    let mut key = [0u8; 32];
    rand::rng().fill_bytes(&mut key);

    let Ok(mut mac) = HmacSha256::new_from_slice(&key) else {
        return false;
    };
    mac.update(a);
    let tag = mac.finalize().into_bytes();

    let Ok(mut mac) = HmacSha256::new_from_slice(&key) else {
        return false;
    };
    mac.update(b);
    mac.verify_slice(&tag).is_ok()
}
