//! HMAC-SHA1 request signing.
//!
//! Every request carries an `Authorization` header of the form
//!
//! ```text
//! OAuth  surv_consumer_key="..", surv_nonce="..", surv_signature="..", surv_signature_method="HMAC-SHA1", surv_timestamp=".."
//! ```
//!
//! where the signature is `base64(HMAC-SHA1(private_key, url ++ method ++ nonce ++ timestamp))`.

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Signature method advertised in the header.
pub const SIGNATURE_METHOD: &str = "HMAC-SHA1";

const AUTH_SCHEME: &str = "OAuth  ";

/// Output of one signing call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedAuthHeader {
    /// Value for the `Authorization` header.
    pub header: String,
    /// Base64 signature embedded in the header.
    pub signature: String,
    pub nonce: String,
    pub timestamp: i64,
}

/// Request signer holding the API key pair.
#[derive(Clone)]
pub struct Signer {
    key_pub: String,
    key_priv: String,
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("key_pub", &self.key_pub)
            .field("key_priv", &"***")
            .finish()
    }
}

impl Signer {
    pub fn new(key_pub: impl Into<String>, key_priv: impl Into<String>) -> Self {
        Self {
            key_pub: key_pub.into(),
            key_priv: key_priv.into(),
        }
    }

    pub fn key_pub(&self) -> &str {
        &self.key_pub
    }

    /// Sign a request with a fresh nonce and the current time.
    pub fn make(&self, url: &str, method: &str) -> SignedAuthHeader {
        let timestamp = chrono::Utc::now().timestamp();
        let nonce = generate_nonce(timestamp);
        self.make_with(url, method, &nonce, timestamp)
    }

    /// Sign a request with the given nonce and timestamp.
    pub fn make_with(&self, url: &str, method: &str, nonce: &str, timestamp: i64) -> SignedAuthHeader {
        let base = format!("{}{}{}{}", url, method, nonce, timestamp);
        let signature = compute_signature(&self.key_priv, &base);
        let timestamp_text = timestamp.to_string();

        let fields = [
            ("surv_consumer_key", self.key_pub.as_str()),
            ("surv_nonce", nonce),
            ("surv_signature", signature.as_str()),
            ("surv_signature_method", SIGNATURE_METHOD),
            ("surv_timestamp", timestamp_text.as_str()),
        ];
        let pairs = fields
            .iter()
            .map(|(key, value)| format!("{}=\"{}\"", escape(key), escape(value)))
            .collect::<Vec<_>>()
            .join(", ");

        SignedAuthHeader {
            header: format!("{}{}", AUTH_SCHEME, pairs),
            signature,
            nonce: nonce.to_string(),
            timestamp,
        }
    }
}

/// Percent-encode everything outside `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
pub fn escape(value: &str) -> String {
    // urlencoding also encodes the five sub-delimiters kept here. `%` itself
    // becomes `%25`, so the reverse replacements cannot touch input text.
    let mut encoded = urlencoding::encode(value).into_owned();
    for (escaped, raw) in [("%21", "!"), ("%2A", "*"), ("%27", "'"), ("%28", "("), ("%29", ")")] {
        if encoded.contains(escaped) {
            encoded = encoded.replace(escaped, raw);
        }
    }
    encoded
}

/// Hex MD5 of a random float offset by the timestamp.
pub fn generate_nonce(timestamp: i64) -> String {
    let seed = rand::random::<f64>() + timestamp as f64;
    format!("{:x}", md5::compute(seed.to_string()))
}

/// Base64 HMAC-SHA1 of `data` keyed with `secret`.
pub fn compute_signature(secret: &str, data: &str) -> String {
    // HMAC takes keys of any length, including empty ones.
    let mut mac = HmacSha1::new_from_slice(secret.as_bytes()).expect("HMAC can take any size");
    mac.update(data.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const URL: &str = "http://api.survarium.com/getclans?amount=10&offset=0";

    #[test]
    fn test_signature_reproducible_from_hmac() {
        let signer = Signer::new("test", "secret");
        let signed = signer.make_with(URL, "GET", "abc", 1451037600);

        let mut mac = HmacSha1::new_from_slice(b"secret").unwrap();
        mac.update(format!("{}GET{}{}", URL, "abc", 1451037600).as_bytes());
        let expected = BASE64.encode(mac.finalize().into_bytes());

        assert_eq!(signed.signature, expected);
        assert_eq!(signed, signer.make_with(URL, "GET", "abc", 1451037600));
    }

    #[test]
    fn test_known_vector() {
        // RFC 2202 test case 2
        assert_eq!(
            compute_signature("Jefe", "what do ya want for nothing?"),
            "7/zfauXrL6LSdBbV8YTfnCWafHk="
        );
    }

    #[test]
    fn test_header_layout() {
        let signer = Signer::new("pub key", "priv");
        let signed = signer.make_with(URL, "GET", "n0nce", 42);
        let escaped_signature = escape(&signed.signature);

        assert_eq!(
            signed.header,
            format!(
                "OAuth  surv_consumer_key=\"pub%20key\", surv_nonce=\"n0nce\", surv_signature=\"{}\", surv_signature_method=\"HMAC-SHA1\", surv_timestamp=\"42\"",
                escaped_signature
            )
        );
    }

    #[test]
    fn test_escape_keeps_unreserved_set() {
        assert_eq!(escape("AZaz09-_.!~*'()"), "AZaz09-_.!~*'()");
        assert_eq!(escape("a b+c/d=e"), "a%20b%2Bc%2Fd%3De");
        assert_eq!(escape("%21"), "%2521");
    }

    #[test]
    fn test_fresh_nonce_changes_signature() {
        let signer = Signer::new("test", "test");
        let signatures: HashSet<String> = (0..50).map(|_| signer.make(URL, "GET").signature).collect();
        assert_eq!(signatures.len(), 50);
    }

    #[test]
    fn test_nonce_and_timestamp_consistent_in_header() {
        let signer = Signer::new("test", "test");
        let signed = signer.make(URL, "GET");

        assert_eq!(signed.nonce.len(), 32);
        assert!(signed.nonce.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(signed.header.contains(&format!("surv_nonce=\"{}\"", signed.nonce)));
        assert!(signed
            .header
            .contains(&format!("surv_timestamp=\"{}\"", signed.timestamp)));
        assert_eq!(
            signed.signature,
            signer.make_with(URL, "GET", &signed.nonce, signed.timestamp).signature
        );
    }

    #[test]
    fn test_empty_secret_still_signs() {
        let signer = Signer::new("test", "");
        let signed = signer.make_with(URL, "GET", "abc", 1);
        assert!(!signed.signature.is_empty());
    }
}
