use rustls::{
    crypto::{aws_lc_rs, CryptoProvider},
    SupportedCipherSuite,
};

// OpenSSL cipher names and their rustls counterparts
const CIPHER_NAMES: &[(&str, &str)] = &[
    // TLS 1.3 Suites
    ("TLS_AES_256_GCM_SHA384", "TLS13_AES_256_GCM_SHA384"),
    ("TLS_AES_128_GCM_SHA256", "TLS13_AES_128_GCM_SHA256"),
    ("TLS_CHACHA20_POLY1305_SHA256", "TLS13_CHACHA20_POLY1305_SHA256"),
    // TLS 1.2 Suites
    ("ECDHE-ECDSA-AES256-GCM-SHA384", "TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384"),
    ("ECDHE-ECDSA-AES128-GCM-SHA256", "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256"),
    ("ECDHE-ECDSA-CHACHA20-POLY1305", "TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256"),
    ("ECDHE-ECDSA-CHACHA20-POLY1305-SHA256", "TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256"),
    ("ECDHE-RSA-AES256-GCM-SHA384", "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384"),
    ("ECDHE-RSA-AES128-GCM-SHA256", "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256"),
    ("ECDHE-RSA-CHACHA20-POLY1305", "TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256"),
    ("ECDHE-RSA-CHACHA20-POLY1305-SHA256", "TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256"),
];

fn lookup_cipher(cipher: &str) -> Option<SupportedCipherSuite> {
    let rustls_name = CIPHER_NAMES
        .iter()
        .find(|(openssl, _)| *openssl == cipher)
        .map(|(_, rustls_name)| *rustls_name)?;

    // Only suites the provider actually implements
    aws_lc_rs::ALL_CIPHER_SUITES
        .iter()
        .find(|suite| suite.suite().as_str() == Some(rustls_name))
        .copied()
}

fn filter_cipher_suites(ciphers: &str) -> Vec<SupportedCipherSuite> {
    let mut suites: Vec<SupportedCipherSuite> = Vec::new();
    for cipher in ciphers.split(':').map(str::trim).filter(|c| !c.is_empty()) {
        match lookup_cipher(cipher) {
            Some(suite) if !suites.iter().any(|s| s.suite() == suite.suite()) => suites.push(suite),
            Some(_) => (),
            None => log::debug!("Ignoring unsupported cipher {}", cipher),
        }
    }
    suites
}

/// Crypto provider limited to `list_of_ciphers` (OpenSSL names, `:` separated).
///
/// Unknown names are skipped. If nothing usable is left, the provider default
/// suites are used.
pub fn provider(list_of_ciphers: &str) -> CryptoProvider {
    let mut ciphers = filter_cipher_suites(list_of_ciphers);
    if ciphers.is_empty() {
        if !list_of_ciphers.trim().is_empty() {
            log::warn!(
                "No valid cipher suites found in {}, using default",
                list_of_ciphers
            );
        }
        ciphers = aws_lc_rs::DEFAULT_CIPHER_SUITES.to_vec();
    }
    log::debug!("cipher_suites: {:?}", ciphers);

    CryptoProvider {
        cipher_suites: ciphers,
        ..aws_lc_rs::default_provider()
    }
}
