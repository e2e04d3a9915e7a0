// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-record envelope encryption.
//!
//! Every record is sealed under a fresh random DEK, and the DEK is sealed
//! under the caller's master key. The four outputs (ciphertext, data nonce,
//! wrapped DEK, DEK nonce) travel together; losing any one of them renders
//! the record unrecoverable.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngCore;
use zeroize::Zeroizing;

use super::{CryptoError, KEY_LEN, NONCE_LEN};

/// The output of [`encrypt_user_data`] and the input to [`decrypt_user_data`].
///
/// Field names follow the persisted columns one-for-one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    /// Payload sealed under the DEK.
    pub ciphertext: Vec<u8>,
    /// Nonce used for the payload seal.
    pub data_nonce: Vec<u8>,
    /// DEK sealed under the master key.
    pub wrapped_dek: Vec<u8>,
    /// Nonce used for the DEK seal.
    pub dek_nonce: Vec<u8>,
}

/// AEAD-seal `plaintext` under `key` with the given nonce.
pub(crate) fn seal(key: &[u8], nonce: &[u8; NONCE_LEN], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength)?;
    cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|_| CryptoError::SealFailed)
}

/// AEAD-open `ciphertext` under `key` with the given nonce.
pub(crate) fn open(key: &[u8], nonce: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if nonce.len() != NONCE_LEN {
        return Err(CryptoError::OpenFailed);
    }
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength)?;
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::OpenFailed)
}

/// Encrypt a payload under a fresh per-record DEK, wrapping the DEK under
/// the caller's master key.
///
/// The DEK is scoped to this call and zeroized on return; it is never part
/// of the output.
pub fn encrypt_user_data(master_key: &[u8], plaintext: &[u8]) -> Result<EncryptedPayload, CryptoError> {
    let mut dek = Zeroizing::new([0u8; KEY_LEN]);
    OsRng.fill_bytes(&mut *dek);

    let mut data_nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut data_nonce);
    let ciphertext = seal(&*dek, &data_nonce, plaintext)?;

    let mut dek_nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut dek_nonce);
    let wrapped_dek = seal(master_key, &dek_nonce, &*dek)?;

    Ok(EncryptedPayload {
        ciphertext,
        data_nonce: data_nonce.to_vec(),
        wrapped_dek,
        dek_nonce: dek_nonce.to_vec(),
    })
}

/// Decrypt a record payload: unwrap the DEK under the master key, then open
/// the ciphertext under the DEK.
///
/// Any AEAD failure in either layer yields [`CryptoError::OpenFailed`] with
/// no partial output.
pub fn decrypt_user_data(record: &EncryptedPayload, master_key: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let dek = Zeroizing::new(open(master_key, &record.dek_nonce, &record.wrapped_dek)?);
    if dek.len() != KEY_LEN {
        return Err(CryptoError::OpenFailed);
    }
    open(&dek, &record.data_nonce, &record.ciphertext)
}
