//! Integration tests for the PocketVault crypto module.

use pocketvault::crypto::{
    decrypt, derive_key, encrypt, generate_random_bytes, generate_salt, SymmetricKey, NONCE_LEN,
    TAG_LEN,
};
use pocketvault::VaultError;

fn key(byte: u8) -> SymmetricKey {
    SymmetricKey::new([byte; 32])
}

// ---------------------------------------------------------------------------
// Encryption round-trip
// ---------------------------------------------------------------------------

#[test]
fn encrypt_decrypt_roundtrip() {
    let key = key(0xAB);
    let plaintext = b"{\"title\":\"Mail\",\"password\":\"hunter2\"}";

    let payload = encrypt(plaintext, &key).expect("encrypt should succeed");

    // Ciphertext carries the 16-byte tag on top of the plaintext.
    assert_eq!(payload.ciphertext.len(), plaintext.len() + TAG_LEN);

    let recovered = decrypt(&payload.ciphertext, &payload.nonce, &key).expect("decrypt");
    assert_eq!(recovered, plaintext);
}

#[test]
fn roundtrip_holds_for_awkward_sizes() {
    let key = key(0x42);
    for len in [1usize, 15, 16, 17, 4096] {
        let plaintext = generate_random_bytes(len).unwrap();
        let payload = encrypt(&plaintext, &key).unwrap();
        assert_eq!(
            decrypt(&payload.ciphertext, &payload.nonce, &key).unwrap(),
            plaintext,
            "length {len}"
        );
    }
}

#[test]
fn encrypt_produces_fresh_nonce_and_ciphertext_each_time() {
    let key = key(0xCD);
    let plaintext = b"same input";

    let first = encrypt(plaintext, &key).expect("encrypt 1");
    let second = encrypt(plaintext, &key).expect("encrypt 2");

    assert_ne!(first.nonce, second.nonce, "nonces must never repeat");
    assert_ne!(first.ciphertext, second.ciphertext);
    assert_ne!(first.nonce, [0u8; NONCE_LEN]);
}

// ---------------------------------------------------------------------------
// Authentication failures
// ---------------------------------------------------------------------------

#[test]
fn decrypt_with_wrong_key_fails() {
    let payload = encrypt(b"TOP_SECRET=42", &key(0x11)).expect("encrypt");
    let result = decrypt(&payload.ciphertext, &payload.nonce, &key(0x22));
    assert!(matches!(result, Err(VaultError::DecryptionFailed)));
}

#[test]
fn single_bit_flip_anywhere_is_detected() {
    let key = key(0xBB);
    let payload = encrypt(b"VALUE=abc", &key).expect("encrypt");

    for index in 0..payload.ciphertext.len() {
        let mut tampered = payload.ciphertext.clone();
        tampered[index] ^= 0x01;
        let result = decrypt(&tampered, &payload.nonce, &key);
        assert!(
            matches!(result, Err(VaultError::DecryptionFailed)),
            "flip at byte {index} must fail authentication"
        );
    }
}

#[test]
fn wrong_nonce_is_indistinguishable_from_wrong_key() {
    let key = key(0x33);
    let payload = encrypt(b"payload", &key).unwrap();

    let mut nonce = payload.nonce;
    nonce[0] ^= 0x80;
    let err = decrypt(&payload.ciphertext, &nonce, &key).unwrap_err();
    assert!(matches!(err, VaultError::DecryptionFailed));
}

#[test]
fn ciphertext_shorter_than_tag_is_invalid_ciphertext() {
    let key = key(0xAA);
    for len in 0..TAG_LEN {
        let result = decrypt(&vec![0u8; len], &[7u8; NONCE_LEN], &key);
        assert!(
            matches!(result, Err(VaultError::InvalidCiphertext)),
            "length {len}"
        );
    }
}

#[test]
fn empty_plaintext_is_invalid_input() {
    assert!(matches!(
        encrypt(b"", &key(1)),
        Err(VaultError::InvalidInput(_))
    ));
}

// ---------------------------------------------------------------------------
// Key derivation
// ---------------------------------------------------------------------------

#[test]
fn derive_key_same_inputs_same_output() {
    let salt = generate_salt().unwrap();

    let key1 = derive_key("correct horse battery staple", &salt).expect("derive 1");
    let key2 = derive_key("correct horse battery staple", &salt).expect("derive 2");

    assert_eq!(key1.as_bytes(), key2.as_bytes());
    assert_eq!(key1.as_bytes().len(), 32);
}

#[test]
fn derive_key_different_salts_different_keys() {
    let key1 = derive_key("same-password", &generate_salt().unwrap()).unwrap();
    let key2 = derive_key("same-password", &generate_salt().unwrap()).unwrap();
    assert_ne!(key1.as_bytes(), key2.as_bytes());
}

#[test]
fn derive_key_different_passwords_different_keys() {
    let salt = generate_salt().unwrap();
    let key1 = derive_key("password-one", &salt).unwrap();
    let key2 = derive_key("password-two", &salt).unwrap();
    assert_ne!(key1.as_bytes(), key2.as_bytes());
}

#[test]
fn derive_key_rejects_empty_password() {
    let salt = generate_salt().unwrap();
    assert!(matches!(
        derive_key("", &salt),
        Err(VaultError::InvalidInput(_))
    ));
}

#[test]
fn derived_key_decrypts_what_it_encrypted() {
    let salt = generate_salt().unwrap();
    let key = derive_key("pw", &salt).unwrap();
    let payload = encrypt(b"hello", &key).unwrap();

    let again = derive_key("pw", &salt).unwrap();
    assert_eq!(
        decrypt(&payload.ciphertext, &payload.nonce, &again).unwrap(),
        b"hello"
    );
}
