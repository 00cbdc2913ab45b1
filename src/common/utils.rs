use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::time::Instant;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// 安全地比较两个字节序列，防止时序攻击
///
/// 无论输入如何，此函数总是比较所有字节，但只有所有字节都匹配才返回true
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0;
    for (byte_a, byte_b) in a.iter().zip(b.iter()) {
        result |= byte_a ^ byte_b;
    }

    result == 0
}

/// 自动清零的字节向量，用于私钥等敏感数据
#[derive(Clone, PartialEq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct ZeroizingVec(#[serde(with = "serde_bytes")] pub Vec<u8>);

impl fmt::Debug for ZeroizingVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ZeroizingVec([REDACTED; {}])", self.0.len())
    }
}

impl std::ops::Deref for ZeroizingVec {
    type Target = [u8];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<[u8]> for ZeroizingVec {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Truncates `text` to `max_chars` characters, appending `...` when something was cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Milliseconds elapsed since `start`.
pub fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Renders a duration the way the console displays it, e.g. `12.34 ms`.
pub fn format_ms(ms: f64) -> String {
    format!("{ms:.2} ms")
}

/// Serde helper writing a millisecond value with [`format_ms`].
pub fn serialize_ms<S: Serializer>(ms: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_ms(*ms))
}
