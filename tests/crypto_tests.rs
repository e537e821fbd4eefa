//! Integration tests for the cipherstack key tree and layer ciphers.

use std::mem::ManuallyDrop;

use cipherstack::crypto::kdf::SALT_LEN;
use cipherstack::crypto::{
    derive_root_secret, generate_salt, Algorithm, Argon2Params, CryptoEngine, Mode, NoProgress,
    RootSecret, SubKey,
};
use cipherstack::errors::CipherStackError;
use rand::rngs::StdRng;
use rand::SeedableRng;
use zeroize::{ZeroizeOnDrop, Zeroizing};

fn light() -> Argon2Params {
    Argon2Params {
        memory_kib: 8_192,
        iterations: 1,
        parallelism: 1,
    }
}

// ---------------------------------------------------------------------------
// Root secret (Argon2id)
// ---------------------------------------------------------------------------

#[test]
fn same_password_and_salt_give_same_root() {
    let salt = [7u8; SALT_LEN];
    let a = derive_root_secret(b"BlueHorse", &salt, &light()).unwrap();
    let b = derive_root_secret(b"BlueHorse", &salt, &light()).unwrap();
    assert_eq!(a.as_bytes(), b.as_bytes());
}

#[test]
fn salt_and_password_both_change_the_root() {
    let base = derive_root_secret(b"BlueHorse", &[1u8; SALT_LEN], &light()).unwrap();
    let other_salt = derive_root_secret(b"BlueHorse", &[2u8; SALT_LEN], &light()).unwrap();
    let other_pw = derive_root_secret(b"BlueHorsf", &[1u8; SALT_LEN], &light()).unwrap();

    assert_ne!(base.as_bytes(), other_salt.as_bytes());
    assert_ne!(base.as_bytes(), other_pw.as_bytes());
}

#[test]
fn weak_argon2_params_are_rejected() {
    let params = Argon2Params {
        memory_kib: 1_024,
        ..light()
    };
    let result = derive_root_secret(b"pw", &[0u8; SALT_LEN], &params);
    assert!(matches!(
        result,
        Err(CipherStackError::KeyDerivationFailed(_))
    ));
}

#[test]
fn generated_salts_differ() {
    let mut rng = StdRng::seed_from_u64(1);
    assert_ne!(generate_salt(&mut rng), generate_salt(&mut rng));
}

// ---------------------------------------------------------------------------
// Sub-keys (HKDF)
// ---------------------------------------------------------------------------

#[test]
fn sub_keys_are_independent_per_context() {
    let root = RootSecret::new([0x42; 32]);
    let header = root.header_key().unwrap();
    let mac = root.mac_key().unwrap();
    let layer0 = root.layer_key(0).unwrap();
    let layer1 = root.layer_key(1).unwrap();

    let keys = [
        header.as_slice(),
        mac.as_slice(),
        layer0.as_slice(),
        layer1.as_slice(),
    ];
    for (i, a) in keys.iter().enumerate() {
        assert_eq!(a.len(), 32);
        for b in &keys[i + 1..] {
            assert_ne!(a, b);
        }
    }
}

#[test]
fn sub_keys_are_deterministic() {
    let root = RootSecret::new([9; 32]);
    assert_eq!(
        root.layer_key(3).unwrap().as_slice(),
        root.derive_sub_key("LAYER_4").unwrap().as_slice()
    );
}

// ---------------------------------------------------------------------------
// Layer ciphers
// ---------------------------------------------------------------------------

#[test]
fn every_layer_cipher_round_trips() {
    let key = [0x5Au8; 32];
    let plaintext = b"Meeting at 9 PM, bring the blue folder.";

    for algorithm in Algorithm::all() {
        let cipher = algorithm.cipher();
        let iv = vec![0x11u8; cipher.iv_size()];
        let ct = cipher.encrypt(plaintext, &key, &iv).unwrap();
        assert_ne!(&ct[..], &plaintext[..], "{}", algorithm.id());
        let pt = cipher.decrypt(&ct, &key, &iv).unwrap();
        assert_eq!(pt, plaintext, "{}", algorithm.id());
    }
}

#[test]
fn cbc_layers_pad_to_whole_blocks() {
    let key = [1u8; 32];
    for algorithm in Algorithm::all().filter(|a| a.mode() == Mode::Cbc) {
        let cipher = algorithm.cipher();
        let iv = vec![0u8; cipher.iv_size()];
        let ct = cipher.encrypt(b"", &key, &iv).unwrap();
        assert!(!ct.is_empty(), "{}", algorithm.id());
        assert_eq!(ct.len() % 8, 0, "{}", algorithm.id());
    }
}

#[test]
fn wrong_key_is_rejected_by_aead_layer() {
    let cipher = Algorithm::AesGcm.cipher();
    let iv = [0u8; 12];
    let ct = cipher.encrypt(b"secret", &[1u8; 32], &iv).unwrap();
    assert!(cipher.decrypt(&ct, &[2u8; 32], &iv).is_none());
}

#[test]
fn identifiers_round_trip_through_the_registry() {
    for algorithm in Algorithm::all() {
        assert_eq!(Algorithm::from_id(algorithm.id()), Some(algorithm));
    }
    assert_eq!(Algorithm::from_id("aes_gcm"), None);
    assert_eq!(
        Algorithm::parse_list("aes_gcm, Twofish_CBC").unwrap(),
        vec![Algorithm::AesGcm, Algorithm::TwofishCbc]
    );
    assert!(Algorithm::parse_list("AES_GCM,ROT13").is_err());
}

// ---------------------------------------------------------------------------
// Memory hygiene
// ---------------------------------------------------------------------------

fn assert_zeroize_on_drop<T: ZeroizeOnDrop>() {}

#[test]
fn key_material_types_wipe_on_drop() {
    // Fails to compile if any of these stops zeroizing itself.
    assert_zeroize_on_drop::<RootSecret>();
    assert_zeroize_on_drop::<SubKey>();
    assert_zeroize_on_drop::<Zeroizing<Vec<u8>>>();
    assert_zeroize_on_drop::<Zeroizing<String>>();
}

/// Run `value`'s drop glue in place, then read the `N` bytes at `ptr`.
///
/// `ptr` must point into `value`'s own inline storage, which stays
/// readable after the drop.
fn bytes_after_drop<T, const N: usize>(value: &mut ManuallyDrop<T>, ptr: *const u8) -> [u8; N] {
    unsafe {
        ManuallyDrop::drop(value);
        std::ptr::read_volatile(ptr.cast::<[u8; N]>())
    }
}

#[test]
fn caller_password_is_wiped_after_a_failed_decrypt() {
    let engine = CryptoEngine::new(light()).unwrap();
    let mut password = ManuallyDrop::new(Zeroizing::new(*b"BlueHorse-7f3a"));
    let text = std::str::from_utf8(password.as_slice()).unwrap();

    let token = engine
        .encrypt(b"secret", text, &[Algorithm::AesGcm], false, &mut NoProgress)
        .unwrap();
    assert!(matches!(
        engine.decrypt(&token, "wrong", &mut NoProgress),
        Err(CipherStackError::IntegrityFailure)
    ));

    let ptr = password.as_ptr();
    let left: [u8; 14] = bytes_after_drop(&mut password, ptr);
    assert_eq!(left, [0u8; 14]);
}

#[test]
fn derived_root_secret_is_wiped_on_drop() {
    let engine = CryptoEngine::new(light()).unwrap();
    let mut root = ManuallyDrop::new(engine.derive_key("BlueHorse", &[9u8; SALT_LEN]).unwrap());
    assert_ne!(root.as_bytes(), &[0u8; 32]);

    let ptr = root.as_bytes().as_ptr();
    let left: [u8; 32] = bytes_after_drop(&mut root, ptr);
    assert_eq!(left, [0u8; 32]);
}
