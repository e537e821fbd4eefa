//! Buffer growth without stray copies, and password strength scoring.
//!
//! Long-lived secrets use `Zeroizing` / `ZeroizeOnDrop` directly. A
//! zeroizing `Vec` only wipes its final allocation, so buffers that grow
//! while holding plaintext go through `reserve_wiping`.

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

/// Ensure room for `additional` more bytes.
///
/// When the buffer has to grow, its contents move to a new allocation of
/// at least twice the capacity and the old allocation is zeroized before
/// it is freed.
pub fn reserve_wiping(buf: &mut Zeroizing<Vec<u8>>, additional: usize) {
    let needed = buf.len().saturating_add(additional);
    if needed <= buf.capacity() {
        return;
    }

    let mut grown = Vec::with_capacity(needed.max(buf.capacity().saturating_mul(2)));
    grown.extend_from_slice(buf);
    let mut old = std::mem::replace(&mut **buf, grown);
    old.zeroize();
}

/// Coarse strength estimate for UI feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasswordStrength {
    /// Estimated entropy in bits.
    pub entropy_bits: f64,
    /// 0 (very weak) to 4 (very strong).
    pub score: u8,
    pub label: String,
}

const LABELS: [&str; 5] = ["Very Weak", "Weak", "Fair", "Strong", "Very Strong"];

/// Score a password by character-pool entropy, discounted for repeats.
///
/// This is a heuristic: it does not know about dictionaries, so a long
/// English phrase scores higher than it deserves.
pub fn estimate_strength(password: &str) -> PasswordStrength {
    let len = password.chars().count();
    if len == 0 {
        return PasswordStrength {
            entropy_bits: 0.0,
            score: 0,
            label: LABELS[0].to_string(),
        };
    }

    let mut pool = 0u32;
    if password.chars().any(|c| c.is_ascii_lowercase()) {
        pool += 26;
    }
    if password.chars().any(|c| c.is_ascii_uppercase()) {
        pool += 26;
    }
    if password.chars().any(|c| c.is_ascii_digit()) {
        pool += 10;
    }
    if password
        .chars()
        .any(|c| c.is_ascii_punctuation() || c == ' ')
    {
        pool += 33;
    }
    if password.chars().any(|c| !c.is_ascii()) {
        pool += 100;
    }

    // Each character repeating its predecessor adds almost nothing.
    let chars: Vec<char> = password.chars().collect();
    let repeats = chars.windows(2).filter(|w| w[0] == w[1]).count();
    let effective_len = (len - repeats) as f64 + repeats as f64 * 0.25;

    let entropy_bits = effective_len * f64::from(pool.max(1)).log2();
    let score = match entropy_bits {
        e if e < 28.0 => 0,
        e if e < 36.0 => 1,
        e if e < 60.0 => 2,
        e if e < 128.0 => 3,
        _ => 4,
    };

    PasswordStrength {
        entropy_bits,
        score,
        label: LABELS[score as usize].to_string(),
    }
}
