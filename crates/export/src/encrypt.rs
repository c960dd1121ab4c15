//! Standard security handler, RC4-128 (V2/R3)
//!
//! Applies password protection to a finished document: owner and user
//! passwords are both set to the caller's password, and the permission
//! bits allow printing (including high resolution) while denying
//! modification, copying, annotation, form filling, accessibility
//! extraction, and assembly.
//!
//! Key derivation and the O/U values follow the standard handler's
//! algorithms 2, 3, and 5; each string and stream is encrypted with a
//! per-object RC4 key.

use lopdf::{dictionary, Document, Object, StringFormat};
use md5::{Digest, Md5};

/// Standard padding applied to short passwords
const PADDING: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01,
    0x08, 0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53,
    0x69, 0x7A,
];

const KEY_LENGTH: usize = 16;

/// Permission bits: print and high-resolution print only
///
/// Bits 3 and 12 set, reserved bits 7-8 and 13-32 set, everything else
/// (modify, copy, annotate, fill, extract, assemble) clear.
pub const PERMISSIONS: i32 = 0xFFFF_F8C4u32 as i32;

#[derive(Debug, thiserror::Error)]
pub enum EncryptError {
    #[error("password must not be empty")]
    EmptyPassword,
}

fn rc4(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut s: [u8; 256] = [0; 256];
    for (i, v) in s.iter_mut().enumerate() {
        *v = i as u8;
    }
    let mut j = 0u8;
    for i in 0..256 {
        j = j.wrapping_add(s[i]).wrapping_add(key[i % key.len()]);
        s.swap(i, j as usize);
    }

    let mut out = data.to_vec();
    let (mut i, mut j) = (0u8, 0u8);
    for byte in &mut out {
        i = i.wrapping_add(1);
        j = j.wrapping_add(s[i as usize]);
        s.swap(i as usize, j as usize);
        let k = s[i as usize].wrapping_add(s[j as usize]);
        *byte ^= s[k as usize];
    }
    out
}

fn pad_password(password: &[u8]) -> [u8; 32] {
    let mut padded = [0u8; 32];
    let len = password.len().min(32);
    padded[..len].copy_from_slice(&password[..len]);
    padded[len..].copy_from_slice(&PADDING[..32 - len]);
    padded
}

/// Owner value (algorithm 3, R3): 50-fold MD5 of the padded owner
/// password keys an RC4 cascade over the padded user password
pub fn compute_owner_value(owner_password: &[u8], user_password: &[u8]) -> Vec<u8> {
    let mut hash = Md5::digest(pad_password(owner_password)).to_vec();
    for _ in 0..50 {
        hash = Md5::digest(&hash[..KEY_LENGTH]).to_vec();
    }
    let rc4_key = &hash[..KEY_LENGTH];

    let mut value = rc4(rc4_key, &pad_password(user_password));
    for i in 1..=19u8 {
        let stage_key: Vec<u8> = rc4_key.iter().map(|b| b ^ i).collect();
        value = rc4(&stage_key, &value);
    }
    value
}

/// File encryption key (algorithm 2, R3)
pub fn compute_encryption_key(
    user_password: &[u8],
    owner_value: &[u8],
    permissions: i32,
    file_id: &[u8],
) -> Vec<u8> {
    let mut hasher = Md5::new();
    hasher.update(pad_password(user_password));
    hasher.update(owner_value);
    hasher.update(permissions.to_le_bytes());
    hasher.update(file_id);
    let mut hash = hasher.finalize().to_vec();
    for _ in 0..50 {
        hash = Md5::digest(&hash[..KEY_LENGTH]).to_vec();
    }
    hash.truncate(KEY_LENGTH);
    hash
}

/// User value (algorithm 5, R3): 16 significant bytes plus 16 bytes of
/// padding
pub fn compute_user_value(encryption_key: &[u8], file_id: &[u8]) -> Vec<u8> {
    let mut hasher = Md5::new();
    hasher.update(PADDING);
    hasher.update(file_id);
    let mut value = hasher.finalize().to_vec();

    for i in 0..20u8 {
        let stage_key: Vec<u8> = encryption_key.iter().map(|b| b ^ i).collect();
        value = rc4(&stage_key, &value);
    }
    value.extend_from_slice(&[0u8; 16]);
    value
}

fn object_key(encryption_key: &[u8], id: lopdf::ObjectId) -> Vec<u8> {
    let (num, gen) = id;
    let mut hasher = Md5::new();
    hasher.update(encryption_key);
    hasher.update(&num.to_le_bytes()[..3]);
    hasher.update(gen.to_le_bytes());
    let mut key = hasher.finalize().to_vec();
    key.truncate((encryption_key.len() + 5).min(16));
    key
}

fn encrypt_object_tree(object: &mut Object, key: &[u8]) {
    match object {
        Object::String(bytes, format) => {
            *bytes = rc4(key, bytes);
            *format = StringFormat::Hexadecimal;
        }
        Object::Array(items) => {
            for item in items {
                encrypt_object_tree(item, key);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter_mut() {
                encrypt_object_tree(value, key);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter_mut() {
                encrypt_object_tree(value, key);
            }
            let encrypted = rc4(key, &stream.content);
            stream.set_content(encrypted);
        }
        _ => {}
    }
}

/// Encrypt every string and stream in `document` and install the
/// /Encrypt dictionary and file /ID
pub fn encrypt_document(document: &mut Document, password: &str) -> Result<(), EncryptError> {
    if password.is_empty() {
        return Err(EncryptError::EmptyPassword);
    }
    let password = password.as_bytes();

    // Derive a file id; any stable 16 bytes will do
    let mut hasher = Md5::new();
    hasher.update(password);
    hasher.update(document.max_id.to_le_bytes());
    hasher.update(b"annotation-export");
    let file_id = hasher.finalize().to_vec();

    let owner_value = compute_owner_value(password, password);
    let encryption_key = compute_encryption_key(password, &owner_value, PERMISSIONS, &file_id);
    let user_value = compute_user_value(&encryption_key, &file_id);

    // Rewrite the existing objects before the encrypt dictionary exists,
    // so it is never itself encrypted
    for (&id, object) in document.objects.iter_mut() {
        let key = object_key(&encryption_key, id);
        encrypt_object_tree(object, &key);
    }

    let encrypt_id = document.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 2,
        "R" => 3,
        "Length" => 128,
        "P" => PERMISSIONS as i64,
        "O" => Object::String(owner_value, StringFormat::Hexadecimal),
        "U" => Object::String(user_value, StringFormat::Hexadecimal),
    });
    document.trailer.set("Encrypt", encrypt_id);
    document.trailer.set(
        "ID",
        vec![
            Object::String(file_id.clone(), StringFormat::Hexadecimal),
            Object::String(file_id, StringFormat::Hexadecimal),
        ],
    );
    Ok(())
}
