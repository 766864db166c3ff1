//! Fractional order keys
//!
//! A key is a base-26 fraction written with the symbols `a..=z` (`a` = 0), so
//! `"n"` is 13/26 and `"an"` is 13/676. Plain lexicographic comparison of
//! keys matches numeric comparison of the fractions they spell. Keys are never
//! renumbered; new keys are always minted between two existing ones.
//!
//! Everything here is pure and deterministic: concurrent parse workers call
//! it without coordination.

use crate::error::OrderKeyError;
use serde::{Deserialize, Serialize};
use std::fmt;

const BASE: u32 = 26;
const ZERO: u8 = b'a';
const MIDPOINT: u8 = b'n';

/// A lexicographically ordered position key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderKey(String);

impl OrderKey {
    /// Validate and wrap a key string
    pub fn parse(key: &str) -> Result<Self, OrderKeyError> {
        if key.is_empty() || !key.bytes().all(|b| b.is_ascii_lowercase()) {
            return Err(OrderKeyError::InvalidSymbol(key.to_string()));
        }
        Ok(Self(key.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Number of symbols used for an initial run of `count` keys
pub fn initial_width(count: usize) -> usize {
    let mut width = 1;
    let mut capacity = BASE as u128;
    while (count as u128) > capacity {
        width += 1;
        capacity *= BASE as u128;
    }
    width
}

/// Produce `count` strictly increasing keys spread evenly over the key space.
///
/// Up to 26 keys use one symbol, up to 676 use two, and so on, so keys from
/// one run are all the same width and never collide.
pub fn generate_initial(count: usize) -> Vec<OrderKey> {
    if count == 0 {
        return Vec::new();
    }
    let width = initial_width(count);
    let space = (BASE as u128).pow(width as u32);
    let slots = count as u128 + 1;

    (1..=count as u128)
        .map(|slot| {
            let value = slot * space / slots;
            // slot <= count <= space keeps value strictly increasing and < space
            OrderKey(encode_fixed(value, width))
        })
        .collect()
}

/// Mint a key strictly between `before` and `after`.
///
/// `None` for `before` means "no lower bound" (0), `None` for `after` means
/// "no upper bound" (1). The arithmetic midpoint is used when it lands inside
/// the open interval, otherwise `before` is extended by one midpoint symbol.
pub fn between(
    before: Option<&OrderKey>,
    after: Option<&OrderKey>,
) -> Result<OrderKey, OrderKeyError> {
    let low = before.map(|k| k.as_str()).unwrap_or("");
    let high = after.map(|k| k.as_str());

    if let Some(high) = high {
        if low >= high {
            return Err(OrderKeyError::InvalidOrder {
                before: low.to_string(),
                after: high.to_string(),
            });
        }
    }

    let in_range = |candidate: &str| {
        !candidate.is_empty() && candidate > low && high.map_or(true, |h| candidate < h)
    };

    let midpoint = midpoint(low, high);
    if in_range(&midpoint) {
        return Ok(OrderKey(midpoint));
    }

    let mut extended = low.to_string();
    extended.push(MIDPOINT as char);
    if in_range(&extended) {
        return Ok(OrderKey(extended));
    }

    Err(OrderKeyError::NoRoom {
        before: low.to_string(),
        after: high.unwrap_or("").to_string(),
    })
}

/// Base-26 midpoint of two fractions; `None` for `high` is 1.0.
fn midpoint(low: &str, high: Option<&str>) -> String {
    let width = low.len().max(high.map_or(0, str::len)).max(1);
    let low_digits = digits(low, width);
    let (high_digits, high_whole) = match high {
        Some(high) => (digits(high, width), 0),
        None => (vec![0; width], 1),
    };

    // low + high, least significant digit first
    let mut sum = vec![0u32; width];
    let mut carry = 0;
    for i in (0..width).rev() {
        let total = low_digits[i] + high_digits[i] + carry;
        sum[i] = total % BASE;
        carry = total / BASE;
    }
    let whole = carry + high_whole;

    // halve, most significant first, remainder carried into the next digit
    let mut remainder = whole % 2;
    let mut result = Vec::with_capacity(width + 1);
    for digit in sum {
        let current = remainder * BASE + digit;
        result.push(current / 2);
        remainder = current % 2;
    }
    if remainder == 1 {
        result.push(BASE / 2);
    }

    while result.last() == Some(&0) {
        result.pop();
    }
    result
        .into_iter()
        .map(|d| (ZERO + d as u8) as char)
        .collect()
}

fn digits(key: &str, width: usize) -> Vec<u32> {
    let mut out: Vec<u32> = key.bytes().map(|b| (b - ZERO) as u32).collect();
    out.resize(width, 0);
    out
}

fn encode_fixed(mut value: u128, width: usize) -> String {
    let mut symbols = vec![ZERO; width];
    for slot in symbols.iter_mut().rev() {
        *slot = ZERO + (value % BASE as u128) as u8;
        value /= BASE as u128;
    }
    String::from_utf8(symbols).unwrap_or_default()
}
