//! OpenPGP backend implementation.
//!
//! Encrypts to every usable encryption key of each recipient (SEIPD v1) and
//! decrypts by trying each key of a [`KeyRing`] that the message is addressed
//! to. Embedded signatures are checked against the configured verifiers.

use std::io::{BufReader, Cursor, Read};

use pgp::armor::{Dearmor, DearmorOptions};
use pgp::composed::{Deserializable, Message, MessageBuilder};
use pgp::crypto::hash::HashAlgorithm;
use pgp::packet::{Packet, PacketParser, PublicKeyEncryptedSessionKey};
use rand::thread_rng;
use tracing::{debug, trace};
use zeroize::Zeroizing;

use super::key::{EncryptionKey, KeyRing, PublicKey, SecretKey};
use super::profile::Profile;
use super::{Cipher, Decrypted, SignatureStatus};
use crate::core::constants::ARMOR_MESSAGE_HEADER;
use crate::error::{CipherError, Result};

/// Key id used by anonymous recipients.
const WILDCARD_KEY_ID: &str = "0000000000000000";

/// OpenPGP cipher backend.
pub struct Pgp<'a> {
    profile: Profile,
    signer: Option<&'a SecretKey>,
    verifiers: &'a [PublicKey],
}

impl<'a> Pgp<'a> {
    pub fn new(profile: Profile) -> Self {
        Self {
            profile,
            signer: None,
            verifiers: &[],
        }
    }

    /// Sign encrypted messages with `signer`.
    pub fn sign_with(mut self, signer: &'a SecretKey) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Check embedded signatures against `verifiers` when decrypting.
    pub fn verify_with(mut self, verifiers: &'a [PublicKey]) -> Self {
        self.verifiers = verifiers;
        self
    }

    fn decrypt_with_key(&self, ciphertext: &[u8], key: &SecretKey) -> Result<Decrypted> {
        let password = key.password();

        let message = match parse_message(ciphertext)?.decrypt(&password, &key.key) {
            Ok(message) => message,
            Err(err) if self.profile.allow_legacy => {
                trace!(error = %err, "retrying as legacy message");
                parse_message(ciphertext)?
                    .decrypt_legacy(&password, &key.key)
                    .map_err(|e| CipherError::DecryptionFailed(e.to_string()))?
            }
            Err(err) => return Err(CipherError::DecryptionFailed(err.to_string()).into()),
        };

        let mut message = if message.is_compressed() {
            message
                .decompress()
                .map_err(|e| CipherError::DecryptionFailed(e.to_string()))?
        } else {
            message
        };

        let plaintext = Zeroizing::new(
            message
                .as_data_vec()
                .map_err(|e| CipherError::DecryptionFailed(e.to_string()))?,
        );

        let signature = self.check_signature(&mut message)?;
        Ok(Decrypted {
            plaintext,
            signature,
        })
    }

    /// Signature status of a fully read message.
    fn check_signature(&self, message: &mut Message<'_>) -> Result<SignatureStatus> {
        if !message.is_signed() {
            return Ok(SignatureStatus::Unsigned);
        }
        if self.verifiers.is_empty() {
            return Ok(SignatureStatus::Unverified);
        }

        for verifier in self.verifiers {
            let mut verified = message.verify(&verifier.key.primary_key).is_ok();
            for subkey in &verifier.key.public_subkeys {
                if verified {
                    break;
                }
                verified = message.verify(&subkey.key).is_ok();
            }
            if verified {
                return Ok(SignatureStatus::Valid {
                    fingerprint: verifier.fingerprint(),
                });
            }
        }

        Err(CipherError::SignatureInvalid.into())
    }
}

impl Cipher for Pgp<'_> {
    type Recipient = PublicKey;
    type Identity = KeyRing;

    fn name(&self) -> &'static str {
        "openpgp"
    }

    fn encrypt(&self, plaintext: &[u8], recipients: &[PublicKey]) -> Result<Vec<u8>> {
        trace!(
            recipients = recipients.len(),
            plaintext_len = plaintext.len(),
            "encrypting"
        );

        if recipients.is_empty() {
            return Err(CipherError::EncryptionFailed("no recipients provided".to_string()).into());
        }

        let mut keys = Vec::new();
        for recipient in recipients {
            keys.extend(recipient.encryption_keys()?);
        }

        let mut rng = thread_rng();
        let mut builder = MessageBuilder::from_bytes("", plaintext.to_vec())
            .seipd_v1(&mut rng, self.profile.cipher.algorithm());

        for key in keys {
            let added = match key {
                EncryptionKey::Primary(key) => builder.encrypt_to_key(&mut rng, key),
                EncryptionKey::Subkey(key) => builder.encrypt_to_key(&mut rng, key),
            };
            added.map_err(|e| CipherError::EncryptionFailed(e.to_string()))?;
        }

        if let Some(signer) = self.signer {
            builder.sign(&signer.key.primary_key, signer.password(), HashAlgorithm::Sha256);
        }

        let encrypted = if self.profile.armor {
            builder
                .to_armored_string(&mut rng, None.into())
                .map(String::into_bytes)
        } else {
            builder.to_vec(&mut rng)
        }
        .map_err(|e| CipherError::EncryptionFailed(e.to_string()))?;

        trace!(ciphertext_len = encrypted.len(), "encrypted");
        Ok(encrypted)
    }

    fn decrypt(&self, ciphertext: &[u8], identity: &KeyRing) -> Result<Decrypted> {
        trace!(ciphertext_len = ciphertext.len(), keys = identity.len(), "decrypting");

        let addressed = recipient_ids(ciphertext)?;
        let candidates: Vec<&SecretKey> = identity
            .keys
            .iter()
            .filter(|key| match &addressed {
                Some(ids) => key.key_ids().iter().any(|id| ids.contains(id)),
                None => true,
            })
            .collect();

        if candidates.is_empty() {
            return Err(CipherError::NotForRecipient.into());
        }

        let mut last_err = None;
        for key in candidates {
            match self.decrypt_with_key(ciphertext, key) {
                Ok(decrypted) => {
                    trace!(plaintext_len = decrypted.plaintext.len(), "decrypted");
                    return self.enforce_signature(decrypted);
                }
                Err(err @ crate::error::Error::Cipher(CipherError::SignatureInvalid)) => {
                    return Err(err)
                }
                Err(err) => {
                    debug!(fingerprint = %key.fingerprint(), error = %err, "key did not decrypt");
                    last_err = Some(err);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| CipherError::NotForRecipient.into()))
    }
}

impl Pgp<'_> {
    fn enforce_signature(&self, decrypted: Decrypted) -> Result<Decrypted> {
        if self.profile.require_signature
            && !matches!(decrypted.signature, SignatureStatus::Valid { .. })
        {
            return Err(CipherError::SignatureRequired.into());
        }
        Ok(decrypted)
    }
}

/// Armor reading options; the CRC24 footer is checked when present.
fn dearmor_options() -> DearmorOptions {
    DearmorOptions::new().enable_crc24_check()
}

/// Parse an armored or binary message.
fn parse_message(ciphertext: &[u8]) -> Result<Message<'_>> {
    if is_armored(ciphertext) {
        let (message, _headers) =
            Message::from_armor_with_options(Cursor::new(ciphertext), dearmor_options())
            .map_err(|e| CipherError::MalformedMessage(e.to_string()))?;
        Ok(message)
    } else {
        Message::from_bytes(ciphertext).map_err(|e| CipherError::MalformedMessage(e.to_string()).into())
    }
}

fn is_armored(data: &[u8]) -> bool {
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    data[start..].starts_with(ARMOR_MESSAGE_HEADER.as_bytes())
}

/// Key ids the message is encrypted to.
///
/// `None` means the message does not say (anonymous or newer recipients), so
/// every key has to be tried. Armored input is read to the end here, so a
/// checksum mismatch fails before any key is tried.
fn recipient_ids(ciphertext: &[u8]) -> Result<Option<Vec<String>>> {
    let data = if is_armored(ciphertext) {
        let mut buf = Vec::new();
        BufReader::new(Dearmor::with_options(Cursor::new(ciphertext), dearmor_options()))
            .read_to_end(&mut buf)
            .map_err(|e| CipherError::MalformedMessage(e.to_string()))?;
        buf
    } else {
        ciphertext.to_vec()
    };

    let mut ids = Vec::new();
    let mut parsed_any = false;
    for packet in PacketParser::new(Cursor::new(&data)) {
        let Ok(packet) = packet else {
            break;
        };
        parsed_any = true;
        match packet {
            Packet::PublicKeyEncryptedSessionKey(PublicKeyEncryptedSessionKey::V3 { id, .. }) => {
                let id = id.to_string();
                if id == WILDCARD_KEY_ID {
                    return Ok(None);
                }
                ids.push(id);
            }
            Packet::PublicKeyEncryptedSessionKey(_) => return Ok(None),
            _ => break,
        }
    }

    if !parsed_any {
        return Err(CipherError::MalformedMessage("no OpenPGP packets found".to_string()).into());
    }
    if ids.is_empty() {
        return Ok(None);
    }
    Ok(Some(ids))
}
