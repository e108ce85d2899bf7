//! Confirmation codes derived from the user row instead of being stored.
//!
//! A code looks like `<issued_at in base36>-<20 hex chars>`. The hex part is
//! a truncated HMAC-SHA256 over the issue timestamp and every mutable user
//! field, keyed with the server secret. Checking a code recomputes the MAC
//! from the *current* row, so any profile change, role change or login
//! (which stamps `last_login`) makes earlier codes useless.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::models::User;

type HmacSha256 = Hmac<Sha256>;

const MAC_HEX_LEN: usize = 20;

pub fn make_code(user: &User, secret: &[u8], now: DateTime<Utc>) -> String {
    let issued_at = now.timestamp().max(0) as u64;
    let mac = user_mac(user, secret, issued_at);
    format!(
        "{}-{}",
        to_base36(issued_at),
        hex::encode(&mac[..MAC_HEX_LEN / 2])
    )
}

/// True when `code` was issued for the user's current state no longer than
/// `max_age_seconds` ago.
pub fn check_code(
    user: &User,
    code: &str,
    secret: &[u8],
    max_age_seconds: i64,
    now: DateTime<Utc>,
) -> bool {
    let Some((ts, mac_hex)) = code.split_once('-') else {
        return false;
    };
    let Some(issued_at) = from_base36(ts) else {
        return false;
    };
    if mac_hex.len() != MAC_HEX_LEN {
        return false;
    }
    let Ok(expected_prefix) = hex::decode(mac_hex) else {
        return false;
    };

    // Timestamps beyond i64 cannot come from make_code
    let Ok(issued_secs) = i64::try_from(issued_at) else {
        return false;
    };
    match now.timestamp().checked_sub(issued_secs) {
        Some(age) if (0..=max_age_seconds).contains(&age) => {}
        _ => return false,
    }

    let mut mac = keyed(secret);
    feed_state(&mut mac, user, issued_at);
    // Constant-time comparison of the truncated tag
    mac.verify_truncated_left(&expected_prefix).is_ok()
}

fn keyed(secret: &[u8]) -> HmacSha256 {
    // HMAC accepts keys of any length
    match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC key length is unrestricted"),
    }
}

fn user_mac(user: &User, secret: &[u8], issued_at: u64) -> Vec<u8> {
    let mut mac = keyed(secret);
    feed_state(&mut mac, user, issued_at);
    mac.finalize().into_bytes().to_vec()
}

fn feed_state(mac: &mut HmacSha256, user: &User, issued_at: u64) {
    let last_login = user
        .last_login
        .map(|t| t.timestamp_micros().to_string())
        .unwrap_or_default();
    let state = format!(
        "{}|{}|{}|{}|{}|{}|{}|{}|{}|{}",
        user.id,
        user.username,
        user.email,
        user.role.to_str(),
        user.first_name,
        user.last_name,
        user.bio,
        last_login,
        user.updated_at.timestamp_micros(),
        issued_at,
    );
    mac.update(state.as_bytes());
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

fn from_base36(s: &str) -> Option<u64> {
    if s.is_empty() || s.len() > 13 {
        return None;
    }
    u64::from_str_radix(s, 36).ok()
}
