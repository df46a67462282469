//! OpenPGP key loading and generation.
//!
//! Keys are read from disk on every call and never cached. Secret keys are
//! unlocked once at load time so that a wrong passphrase is reported as such
//! instead of surfacing later as a generic decryption failure.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use pgp::composed::{
    Deserializable, KeyType, SecretKeyParamsBuilder, SignedPublicKey, SignedPublicSubKey,
    SignedSecretKey, SubkeyParamsBuilder,
};
use pgp::crypto::ecc_curve::ECCCurve;
use pgp::packet::{self, Signature, SignatureType};
use pgp::types::{KeyDetails, Password};
use rand::thread_rng;
use tracing::{debug, trace};
use zeroize::Zeroizing;

use crate::core::constants::SECRET_KEY_ARMOR_HEADER;
use crate::core::types::Fingerprint;
use crate::error::{KeyError, Result};

/// A parsed public key, used as an encryption recipient or signature verifier.
#[derive(Debug, Clone)]
pub struct PublicKey {
    pub(crate) key: SignedPublicKey,
    pub(crate) path: PathBuf,
}

impl PublicKey {
    /// Uppercase hex fingerprint of the primary key.
    pub fn fingerprint(&self) -> Fingerprint {
        fingerprint_hex(&self.key.primary_key)
    }

    /// Keys a message to this certificate may be encrypted to.
    ///
    /// Revoked and expired keys are skipped; a revoked or expired primary key
    /// disables the whole certificate. The primary key itself is used when its
    /// self-signature allows encryption.
    pub(crate) fn encryption_keys(&self) -> Result<Vec<EncryptionKey<'_>>> {
        let now = Utc::now();
        let mut keys = Vec::new();

        if self.primary_usable(now) {
            if self.primary_can_encrypt() {
                keys.push(EncryptionKey::Primary(&self.key.primary_key));
            }
            keys.extend(
                self.key
                    .public_subkeys
                    .iter()
                    .filter(|subkey| subkey.key.algorithm().can_encrypt())
                    .filter(|subkey| subkey.signatures.iter().any(allows_encryption))
                    .filter(|subkey| subkey_usable(subkey, now))
                    .map(EncryptionKey::Subkey),
            );
        }

        if keys.is_empty() {
            return Err(KeyError::NoEncryptionKey {
                path: self.path.clone(),
            }
            .into());
        }
        Ok(keys)
    }

    fn self_signatures(&self) -> impl Iterator<Item = &Signature> {
        self.key
            .details
            .users
            .iter()
            .flat_map(|user| &user.signatures)
            .chain(&self.key.details.direct_signatures)
    }

    fn primary_usable(&self, now: DateTime<Utc>) -> bool {
        if !self.key.details.revocation_signatures.is_empty() {
            return false;
        }
        let created = self.key.primary_key.created_at();
        !self
            .self_signatures()
            .find_map(|sig| sig.key_expiration_time())
            .is_some_and(|validity| expired(created, validity, now))
    }

    fn primary_can_encrypt(&self) -> bool {
        self.key.primary_key.algorithm().can_encrypt()
            && self.self_signatures().any(allows_encryption)
    }
}

/// A key packet that a session key can be encrypted to.
pub(crate) enum EncryptionKey<'a> {
    Primary(&'a packet::PublicKey),
    Subkey(&'a SignedPublicSubKey),
}

fn allows_encryption(sig: &Signature) -> bool {
    let flags = sig.key_flags();
    flags.encrypt_comms() || flags.encrypt_storage()
}

/// Not revoked, and not expired per its latest binding signature.
fn subkey_usable(subkey: &SignedPublicSubKey, now: DateTime<Utc>) -> bool {
    let revoked = subkey
        .signatures
        .iter()
        .any(|sig| sig.typ() == Some(SignatureType::SubkeyRevocation));
    let lapsed = subkey
        .signatures
        .last()
        .and_then(|sig| sig.key_expiration_time())
        .is_some_and(|validity| expired(subkey.key.created_at(), validity, now));
    !revoked && !lapsed
}

/// A zero validity never expires.
fn expired(created: &DateTime<Utc>, validity: &Duration, now: DateTime<Utc>) -> bool {
    *validity > Duration::zero()
        && created
            .checked_add_signed(*validity)
            .is_some_and(|end| end <= now)
}

/// An unlocked secret key together with the passphrase that unlocked it.
pub struct SecretKey {
    pub(crate) key: SignedSecretKey,
    passphrase: Zeroizing<String>,
}

impl SecretKey {
    pub(crate) fn password(&self) -> Password {
        Password::from(self.passphrase.as_str())
    }

    /// Uppercase hex fingerprint of the primary key.
    pub fn fingerprint(&self) -> Fingerprint {
        fingerprint_hex(&self.key.primary_key)
    }

    /// Legacy key ids of the primary key and every subkey.
    pub(crate) fn key_ids(&self) -> Vec<String> {
        std::iter::once(self.key.primary_key.legacy_key_id().to_string())
            .chain(
                self.key
                    .secret_subkeys
                    .iter()
                    .map(|subkey| subkey.key.legacy_key_id().to_string()),
            )
            .collect()
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKey")
            .field("fingerprint", &self.fingerprint())
            .finish_non_exhaustive()
    }
}

/// One or more secret keys tried in order when decrypting.
#[derive(Debug, Default)]
pub struct KeyRing {
    pub(crate) keys: Vec<SecretKey>,
}

impl KeyRing {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Append every key of `other`; earlier keys are tried first.
    pub fn merge(&mut self, other: KeyRing) {
        self.keys.extend(other.keys);
    }
}

impl From<SecretKey> for KeyRing {
    fn from(key: SecretKey) -> Self {
        Self { keys: vec![key] }
    }
}

/// Armored key pair produced by [`generate`].
pub struct GeneratedKey {
    pub public_armored: String,
    pub secret_armored: Zeroizing<String>,
    pub fingerprint: Fingerprint,
}

fn read_key_file(path: &Path) -> Result<Zeroizing<Vec<u8>>> {
    debug!(path = %path.display(), "reading key file");
    let data = fs::read(path).map_err(|source| KeyError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Zeroizing::new(data))
}

fn parse_error(path: &Path, reason: impl ToString) -> KeyError {
    KeyError::Parse {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Load a public key (armored or binary).
///
/// A secret key file is accepted too; its public half is used.
pub fn load_public_key(path: impl AsRef<Path>) -> Result<PublicKey> {
    let path = path.as_ref();
    let data = read_key_file(path)?;

    let key = match SignedPublicKey::from_armor_single(Cursor::new(&data[..])) {
        Ok((key, _headers)) => key,
        Err(armor_err) => match SignedPublicKey::from_bytes(Cursor::new(&data[..])) {
            Ok(key) => key,
            Err(_) => match SignedSecretKey::from_armor_single(Cursor::new(&data[..])) {
                Ok((secret, _headers)) => secret.to_public_key(),
                Err(_) => return Err(parse_error(path, armor_err).into()),
            },
        },
    };

    trace!(fingerprint = %fingerprint_hex(&key.primary_key), "public key loaded");
    Ok(PublicKey {
        key,
        path: path.to_path_buf(),
    })
}

/// Load a secret key and unlock it with `passphrase`.
///
/// # Errors
///
/// Returns `KeyError::WrongPassphrase` when the passphrase does not unlock
/// the key, and `KeyError::Parse` when the file holds no secret key.
pub fn load_secret_key(path: impl AsRef<Path>, passphrase: &str) -> Result<SecretKey> {
    let path = path.as_ref();
    let data = read_key_file(path)?;

    let key = match SignedSecretKey::from_armor_single(Cursor::new(&data[..])) {
        Ok((key, _headers)) => key,
        Err(armor_err) => SignedSecretKey::from_bytes(Cursor::new(&data[..]))
            .map_err(|_| parse_error(path, armor_err))?,
    };

    unlock(path, key, passphrase)
}

/// Load every secret key in `path` and unlock each with `passphrase`.
///
/// Unprotected keys ignore the passphrase. Keys the passphrase does not
/// unlock are left out of the ring.
///
/// # Errors
///
/// Returns `KeyError::WrongPassphrase` when the file holds keys but none of
/// them unlocks, and `KeyError::EmptyKeyRing` when it holds no keys at all.
pub fn load_keyring(path: impl AsRef<Path>, passphrase: Option<&str>) -> Result<KeyRing> {
    let path = path.as_ref();
    let data = read_key_file(path)?;

    let mut ring = KeyRing::default();
    let mut locked = 0;
    for block in armor_blocks(&data) {
        let (keys, _headers) = SignedSecretKey::from_reader_many(Cursor::new(block))
            .map_err(|e| parse_error(path, e))?;
        for key in keys {
            let key = key.map_err(|e| parse_error(path, e))?;
            let fingerprint = fingerprint_hex(&key.primary_key);
            match unlock(path, key, passphrase.unwrap_or("")) {
                Ok(key) => ring.keys.push(key),
                Err(crate::error::Error::Key(KeyError::WrongPassphrase { .. })) => {
                    debug!(fingerprint = %fingerprint, "skipping key the passphrase does not unlock");
                    locked += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    if ring.is_empty() {
        let path = path.to_path_buf();
        return Err(if locked > 0 {
            KeyError::WrongPassphrase { path }
        } else {
            KeyError::EmptyKeyRing { path }
        }
        .into());
    }

    debug!(path = %path.display(), keys = ring.len(), skipped = locked, "key ring loaded");
    Ok(ring)
}

/// Split concatenated armored secret key blocks.
///
/// Binary input and single blocks come back whole.
fn armor_blocks(data: &[u8]) -> Vec<&[u8]> {
    let marker = SECRET_KEY_ARMOR_HEADER.as_bytes();
    let starts: Vec<usize> = data
        .windows(marker.len())
        .enumerate()
        .filter(|(_, window)| *window == marker)
        .map(|(i, _)| i)
        .collect();

    if starts.len() <= 1 {
        return vec![data];
    }
    starts
        .iter()
        .enumerate()
        .map(|(n, &start)| {
            let end = starts.get(n + 1).copied().unwrap_or(data.len());
            &data[start..end]
        })
        .collect()
}

/// Check that `passphrase` unlocks the primary key and every secret subkey.
fn unlock(path: &Path, key: SignedSecretKey, passphrase: &str) -> Result<SecretKey> {
    let password = Password::from(passphrase);
    let wrong = || KeyError::WrongPassphrase {
        path: path.to_path_buf(),
    };

    key.primary_key
        .unlock(&password, |_, _| Ok(()))
        .map_err(|_| wrong())?
        .map_err(|_| wrong())?;
    for subkey in &key.secret_subkeys {
        subkey
            .key
            .unlock(&password, |_, _| Ok(()))
            .map_err(|_| wrong())?
            .map_err(|_| wrong())?;
    }

    trace!(fingerprint = %fingerprint_hex(&key.primary_key), "secret key unlocked");
    Ok(SecretKey {
        key,
        passphrase: Zeroizing::new(passphrase.to_string()),
    })
}

/// Generate an Ed25519 key with a Curve25519 encryption subkey.
///
/// An empty passphrase leaves the secret key unprotected.
pub fn generate(user_id: &str, passphrase: &str) -> Result<GeneratedKey> {
    let failed = |e: &dyn std::fmt::Display| KeyError::Generate(e.to_string());
    let mut rng = thread_rng();

    let mut subkey = SubkeyParamsBuilder::default();
    subkey
        .key_type(KeyType::ECDH(ECCCurve::Curve25519))
        .can_encrypt(true)
        .can_sign(false)
        .can_authenticate(false);
    if !passphrase.is_empty() {
        subkey.passphrase(Some(passphrase.to_string()));
    }
    let subkey = subkey.build().map_err(|e| failed(&e))?;

    let mut params = SecretKeyParamsBuilder::default();
    params
        .key_type(KeyType::Ed25519Legacy)
        .can_certify(true)
        .can_sign(true)
        .can_encrypt(false)
        .primary_user_id(user_id.to_string())
        .subkeys(vec![subkey]);
    if !passphrase.is_empty() {
        params.passphrase(Some(passphrase.to_string()));
    }

    let secret = params
        .build()
        .map_err(|e| failed(&e))?
        .generate(&mut rng)
        .map_err(|e| failed(&e))?;
    let public = secret.to_public_key();

    let public_armored = public
        .to_armored_string(None.into())
        .map_err(|e| failed(&e))?;
    let secret_armored = secret
        .to_armored_string(None.into())
        .map_err(|e| failed(&e))?;
    let fingerprint = fingerprint_hex(&public.primary_key);

    debug!(fingerprint = %fingerprint, "generated key");
    Ok(GeneratedKey {
        public_armored,
        secret_armored: Zeroizing::new(secret_armored),
        fingerprint,
    })
}

pub(crate) fn fingerprint_hex(key: &impl KeyDetails) -> Fingerprint {
    key.fingerprint()
        .as_bytes()
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect()
}
