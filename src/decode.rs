// src/decode.rs
use aes::cipher::{generic_array::GenericArray, BlockDecrypt, KeyInit};
use aes::{Aes128, Aes192, Aes256};
use thiserror::Error;
use tracing::debug;

/// Length of an OTP that carries a 6 byte public ID.
pub const OTP_LEN: usize = 44;

const MODHEX: &[u8; 16] = b"cbdefghijklnrtuv";
const HEX: &[u8; 16] = b"0123456789abcdef";

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("not a 44-character long OTP")]
    WrongLength,

    #[error("invalid modhex character {0:?}")]
    ModHex(char),

    #[error("invalid AES key: {0}")]
    Key(#[from] hex::FromHexError),

    #[error("invalid AES key length {0}")]
    KeyLength(usize),
}

/// Identifiers recovered from a token's OTP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Info {
    pub public_id: Vec<u8>,
    /// Only known when the token's AES key was supplied.
    pub private_id: Option<Vec<u8>>,
}

impl Info {
    pub fn public_id_modhex(&self) -> String {
        modhex_encode(&self.public_id)
    }

    pub fn public_id_hex(&self) -> String {
        hex::encode(&self.public_id)
    }

    pub fn public_id_dec(&self) -> u64 {
        to_u64(&self.public_id)
    }

    pub fn private_id_modhex(&self) -> Option<String> {
        self.private_id.as_deref().map(modhex_encode)
    }

    pub fn private_id_hex(&self) -> Option<String> {
        self.private_id.as_deref().map(hex::encode)
    }

    pub fn private_id_dec(&self) -> Option<u64> {
        self.private_id.as_deref().map(to_u64)
    }
}

fn to_u64(b: &[u8]) -> u64 {
    b.iter().fold(0, |acc, &x| acc << 8 | u64::from(x))
}

pub fn modhex_encode(b: &[u8]) -> String {
    hex::encode(b)
        .bytes()
        .map(|c| {
            let i = HEX.iter().position(|&h| h == c).unwrap_or_default();
            MODHEX[i] as char
        })
        .collect()
}

pub fn modhex_decode(s: &str) -> Result<Vec<u8>, DecodeError> {
    let hex: String = s
        .chars()
        .map(|c| {
            let i = MODHEX
                .iter()
                .position(|&m| char::from(m) == c.to_ascii_lowercase())
                .ok_or(DecodeError::ModHex(c))?;
            Ok(HEX[i] as char)
        })
        .collect::<Result<_, DecodeError>>()?;
    hex::decode(hex).map_err(|_| DecodeError::WrongLength)
}

/// Splits a 44-character OTP into its public ID and, given the token's
/// hex AES key, the private ID from the encrypted block. An empty key
/// skips decryption.
pub fn decode(otp: &str, aes_key_hex: &str) -> Result<Info, DecodeError> {
    if otp.chars().count() != OTP_LEN {
        return Err(DecodeError::WrongLength);
    }

    let otp = modhex_decode(otp)?;
    let mut info = Info {
        public_id: otp[..6].to_vec(),
        private_id: None,
    };

    if aes_key_hex.is_empty() {
        return Ok(info);
    }

    let key = hex::decode(aes_key_hex)?;
    let mut block = GenericArray::clone_from_slice(&otp[6..]);
    match key.len() {
        16 => Aes128::new_from_slice(&key).map(|c| c.decrypt_block(&mut block)),
        24 => Aes192::new_from_slice(&key).map(|c| c.decrypt_block(&mut block)),
        32 => Aes256::new_from_slice(&key).map(|c| c.decrypt_block(&mut block)),
        n => return Err(DecodeError::KeyLength(n)),
    }
    .map_err(|_| DecodeError::KeyLength(key.len()))?;

    debug!("decrypted OTP block: {}", hex::encode(block));
    info.private_id = Some(block[..6].to_vec());
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    const OTP: &str = "jikdunvudhrrlgcjdgkbutunghduebllufucluhrjguh";
    const AES_KEY: &str = "ecde18dbe76fbd0c33330f1c354871db";

    #[test]
    fn decodes_public_and_private_id() {
        let info = decode(OTP, AES_KEY).unwrap();
        assert_eq!(info.public_id_modhex(), "jikdunvudhrr");
        assert_eq!(info.public_id_hex(), "8792ebfe26cc");
        assert_eq!(info.public_id_dec(), 149_065_094_276_812);
        assert_eq!(info.private_id_hex().as_deref(), Some("0123456789ab"));
        assert_eq!(info.private_id_modhex().as_deref(), Some("cbdefghijkln"));
        assert_eq!(info.private_id_dec(), Some(1_250_999_896_491));
    }

    #[test]
    fn public_id_only_without_key() {
        let info = decode(OTP, "").unwrap();
        assert_eq!(info.public_id_modhex(), "jikdunvudhrr");
        assert_eq!(info.private_id, None);
        assert_eq!(info.private_id_hex(), None);
    }

    #[test]
    fn uppercase_modhex() {
        let info = decode(&OTP.to_uppercase(), AES_KEY).unwrap();
        assert_eq!(info.private_id_hex().as_deref(), Some("0123456789ab"));
    }

    #[test]
    fn wrong_key_gives_other_private_id() {
        let info = decode(OTP, "00000000000000000000000000000000").unwrap();
        assert_ne!(info.private_id_hex().as_deref(), Some("0123456789ab"));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(decode(&OTP[..43], ""), Err(DecodeError::WrongLength)));
        assert!(matches!(decode(&OTP[12..], ""), Err(DecodeError::WrongLength)));
        let bad = format!("{}a", &OTP[..43]);
        assert!(matches!(decode(&bad, ""), Err(DecodeError::ModHex('a'))));
        assert!(matches!(decode(OTP, "xyz"), Err(DecodeError::Key(_))));
        assert!(matches!(decode(OTP, "0011"), Err(DecodeError::KeyLength(2))));
    }

    #[test]
    fn modhex_alphabet() {
        assert_eq!(modhex_encode(&[0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef]), "cbdefghijklnrtuv");
        assert_eq!(modhex_decode("cbdefghijklnrtuv").unwrap(), hex::decode("0123456789abcdef").unwrap());
    }
}
