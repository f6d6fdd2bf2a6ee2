//! Feed arbitrary bytes to the decryptor: it must always return a structured
//! error (or succeed), never panic. Inputs that reach key derivation can
//! demand up to the format's 5M-iteration cap, so expect slow executions on
//! such paths.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let decryptor = aescrypt_engine::Decryptor::new("fuzz");
    let mut plaintext = Vec::new();
    let mut source = data;
    let _ = decryptor.decrypt("fuzz password", &mut source, &mut plaintext, None, 0);
});
