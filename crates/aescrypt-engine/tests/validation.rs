use aescrypt_engine::format::{MAX_KDF_ITERATIONS, RECOMMENDED_KDF_ITERATIONS};
use aescrypt_engine::{DecryptError, Decryptor, EncryptError, EncryptOptions, Encryptor};

fn options_with_iterations(iterations: u32) -> EncryptOptions {
    EncryptOptions {
        iterations,
        ..Default::default()
    }
}

#[test]
fn default_options_use_the_recommended_iteration_count() {
    let options = EncryptOptions::default();
    assert_eq!(options.iterations, RECOMMENDED_KDF_ITERATIONS);
    assert!(options.extensions.is_empty());
    assert_eq!(options.progress_interval, 0);
}

#[test]
fn empty_password_is_rejected_on_both_sides() {
    let encryptor = Encryptor::new("validation");
    let mut out = Vec::new();
    let err = encryptor
        .encrypt("", &mut &b"data"[..], &mut out, &options_with_iterations(10), None)
        .expect_err("expected failure");
    assert!(matches!(err, EncryptError::InvalidPassword));
    assert!(out.is_empty(), "nothing may be written for a rejected password");

    let decryptor = Decryptor::new("validation");
    let mut plain = Vec::new();
    let err = decryptor
        .decrypt("", &mut &b"AES\x03"[..], &mut plain, None, 0)
        .expect_err("expected failure");
    assert!(matches!(err, DecryptError::InvalidPassword));
}

#[test]
fn zero_iterations_are_rejected() {
    let encryptor = Encryptor::new("validation");
    let mut out = Vec::new();
    let err = encryptor
        .encrypt("pw", &mut &b"data"[..], &mut out, &options_with_iterations(0), None)
        .expect_err("expected failure");
    assert!(matches!(err, EncryptError::InvalidIterations { iterations: 0 }));
    assert!(out.is_empty());
}

#[test]
fn excessive_iterations_are_rejected() {
    let encryptor = Encryptor::new("validation");
    let mut out = Vec::new();
    let err = encryptor
        .encrypt(
            "pw",
            &mut &b"data"[..],
            &mut out,
            &options_with_iterations(MAX_KDF_ITERATIONS + 1),
            None,
        )
        .expect_err("expected failure");
    assert!(matches!(err, EncryptError::InvalidIterations { .. }));
}

#[test]
fn extension_identifier_with_nul_is_rejected_before_any_output() {
    let encryptor = Encryptor::new("validation");
    let mut out = Vec::new();
    let options = EncryptOptions {
        iterations: 10,
        extensions: vec![("BAD\0ID".to_string(), "value".to_string())],
        ..Default::default()
    };
    let err = encryptor
        .encrypt("pw", &mut &b"data"[..], &mut out, &options, None)
        .expect_err("expected failure");
    assert!(matches!(err, EncryptError::InvalidExtension));
    assert!(out.is_empty(), "a bad extension must not leave a partial header");
}

#[test]
fn oversized_extension_pair_is_rejected() {
    let encryptor = Encryptor::new("validation");
    let mut out = Vec::new();
    let options = EncryptOptions {
        iterations: 10,
        extensions: vec![("ID".to_string(), "v".repeat(70_000))],
        ..Default::default()
    };
    let err = encryptor
        .encrypt("pw", &mut &b"data"[..], &mut out, &options, None)
        .expect_err("expected failure");
    assert!(matches!(err, EncryptError::InvalidExtension));
}

#[test]
fn minimum_iterations_are_accepted() {
    let encryptor = Encryptor::new("validation");
    let mut stream = Vec::new();
    encryptor
        .encrypt("pw", &mut &b"data"[..], &mut stream, &options_with_iterations(1), None)
        .expect("encrypt with 1 iteration");

    let decryptor = Decryptor::new("validation");
    let mut plain = Vec::new();
    decryptor
        .decrypt("pw", &mut &stream[..], &mut plain, None, 0)
        .expect("decrypt");
    assert_eq!(plain, b"data");
}

#[test]
fn panicking_progress_callback_aborts_with_internal_error() {
    let callback = |_: &str, _: u64| panic!("observer bug");
    let encryptor = Encryptor::new("validation");
    let mut out = Vec::new();
    let options = EncryptOptions {
        iterations: 10,
        progress_interval: 1,
        ..Default::default()
    };
    let err = encryptor
        .encrypt("pw", &mut &b"data"[..], &mut out, &options, Some(&callback))
        .expect_err("expected failure");
    assert!(matches!(err, EncryptError::Internal));
}
