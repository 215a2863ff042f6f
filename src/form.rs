//! Form body for the ask endpoint.

use serde::{Deserialize, Serialize};

/// How user-supplied values are written into the form body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyEncoding {
    /// Values are written verbatim. A question containing `&`, `=` or `%`
    /// corrupts the body; kept as the default because the endpoint has
    /// always been fed raw text.
    #[default]
    Raw,
    /// Values are percent-encoded.
    UrlEncoded,
}

/// `userId=<user>&question=<question>&type=0&platform=custom`
pub fn build_body(user_id: &str, question: &str, encoding: BodyEncoding) -> String {
    let (user_id, question) = match encoding {
        BodyEncoding::Raw => (user_id.to_string(), question.to_string()),
        BodyEncoding::UrlEncoded => (urlencoded(user_id), urlencoded(question)),
    };
    format!("userId={user_id}&question={question}&type=0&platform=custom")
}

/// Percent-encode everything outside the unreserved set.
fn urlencoded(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char);
            }
            _ => {
                out.push_str(&format!("%{:02X}", b));
            }
        }
    }
    out
}
