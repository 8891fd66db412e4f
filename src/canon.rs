// src/canon.rs
use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::collections::HashMap;

type HmacSha1 = Hmac<Sha1>;

/// Request or response parameters, one value per key.
pub type Params = HashMap<String, String>;

pub fn sorted_keys(params: &Params) -> Vec<&str> {
    let mut keys: Vec<&str> = params.keys().map(String::as_str).collect();
    keys.sort_unstable();
    keys
}

/// `k1=v1&k2=v2...` with keys in byte order and values left unescaped.
/// Servers sign the raw values, so percent-encoding here breaks `h`.
pub fn canonical_string(params: &Params) -> String {
    sorted_keys(params)
        .into_iter()
        .map(|k| format!("{k}={}", params[k]))
        .collect::<Vec<_>>()
        .join("&")
}

/// HMAC-SHA1 over the canonical form of `params`.
pub fn sign(params: &Params, secret_key: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha1::new_from_slice(secret_key).expect("HMAC can take key of any size");
    mac.update(canonical_string(params).as_bytes());
    mac.finalize().into_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD as B64, Engine};

    const FAKE_SECRET_KEY: &str = "mG5be6ZJU1qBGz24yPh/ESM3UdU=";

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn published_test_vector() {
        let p = params(&[
            ("id", "1"),
            ("otp", "vvungrrdhvtklknvrtvuvbbkeidikkvgglrvdgrfcdft"),
            ("nonce", "jrFwbaYFhn0HoxZIsd9LQ6w2ceU"),
        ]);
        let key = B64.decode(FAKE_SECRET_KEY).unwrap();

        assert_eq!(
            canonical_string(&p),
            "id=1&nonce=jrFwbaYFhn0HoxZIsd9LQ6w2ceU&otp=vvungrrdhvtklknvrtvuvbbkeidikkvgglrvdgrfcdft"
        );
        assert_eq!(B64.encode(sign(&p, &key)), "+ja8S3IjbX593/LAgTBixwPNGX4=");
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let key = b"secret";
        let a = params(&[("otp", "x"), ("nonce", "n"), ("timeout", "10"), ("id", "7")]);
        let b = params(&[("id", "7"), ("timeout", "10"), ("nonce", "n"), ("otp", "x")]);
        assert_eq!(sign(&a, key), sign(&b, key));
    }

    #[test]
    fn values_are_not_escaped() {
        let p = params(&[("h", "a+b/c="), ("sl", "100")]);
        assert_eq!(canonical_string(&p), "h=a+b/c=&sl=100");
    }

    #[test]
    fn keys_sort_bytewise() {
        let p = params(&[("b", "2"), ("B", "1"), ("a", "3")]);
        assert_eq!(sorted_keys(&p), vec!["B", "a", "b"]);
    }
}
