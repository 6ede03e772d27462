//! Envelope-encrypts a Strategy for audit attachment
//! to execution receipts, using an ephemeral X25519 key pair on the
//! caller side and AES-256-GCM as the authenticated cipher.
//!
//! AES-256-GCM's standard nonce is 12 bytes, but the sealed envelope's
//! wire format carries a 16-byte nonce for forward compatibility with
//! other ciphers; this implementation generates that 16-byte wire nonce
//! and derives the actual 12-byte GCM nonce from it via HKDF-SHA256.

use aes_gcm::aead::{Aead, KeyInit, generic_array::GenericArray};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use x25519_dalek::{PublicKey, StaticSecret};

use crate::error::{EngineError, Result};
use crate::model::Strategy;

const WIRE_NONCE_LEN: usize = 16;
const GCM_NONCE_LEN: usize = 12;

/// Attached to execution receipts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealedStrategy {
    pub ciphertext_b64: String,
    pub nonce_b64: String,
    pub ephemeral_public_key_b64: String,
    pub cluster_id: String,
}

pub struct PrivacySealer {
    /// The compute environment's published static key pair. Only the
    /// public half is ever transmitted; the secret half never leaves
    /// this process.
    environment_secret: StaticSecret,
    environment_public: PublicKey,
    cluster_id: String,
}

impl PrivacySealer {
    pub fn new(environment_secret_bytes: [u8; 32], cluster_id: String) -> Self {
        let environment_secret = StaticSecret::from(environment_secret_bytes);
        let environment_public = PublicKey::from(&environment_secret);
        Self {
            environment_secret,
            environment_public,
            cluster_id,
        }
    }

    pub fn environment_public_key(&self) -> PublicKey {
        self.environment_public
    }

    /// Seal a Strategy: generate an ephemeral key pair, derive a shared
    /// secret via ECDH against the environment's public key, and encrypt
    /// under AES-256-GCM.
    pub fn seal(&self, strategy: &Strategy) -> Result<SealedStrategy> {
        let mut ephemeral_bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut ephemeral_bytes);
        let ephemeral_secret = StaticSecret::from(ephemeral_bytes);
        let ephemeral_public = PublicKey::from(&ephemeral_secret);
        let shared_secret = ephemeral_secret.diffie_hellman(&self.environment_public);

        let mut wire_nonce = [0u8; WIRE_NONCE_LEN];
        rand::rng().fill_bytes(&mut wire_nonce);
        let gcm_nonce = derive_gcm_nonce(&wire_nonce);

        let plaintext = serde_json::to_vec(strategy)
            .map_err(|e| EngineError::Internal(format!("encoding strategy: {e}")))?;

        let key = GenericArray::from_slice(shared_secret.as_bytes());
        let cipher = Aes256Gcm::new(key);
        let nonce = Nonce::from_slice(&gcm_nonce);
        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_slice())
            .map_err(|e| EngineError::Internal(format!("sealing strategy: {e}")))?;

        Ok(SealedStrategy {
            ciphertext_b64: BASE64.encode(ciphertext),
            nonce_b64: BASE64.encode(wire_nonce),
            ephemeral_public_key_b64: BASE64.encode(ephemeral_public.as_bytes()),
            cluster_id: self.cluster_id.clone(),
        })
    }

    /// Decrypt a sealed strategy using the environment's static secret;
    /// only used by the round-trip self-test below and, in a real
    /// deployment, by the compute environment itself.
    fn unseal(&self, sealed: &SealedStrategy) -> Result<Strategy> {
        let ephemeral_public_bytes = BASE64
            .decode(&sealed.ephemeral_public_key_b64)
            .map_err(|e| EngineError::Internal(format!("decoding ephemeral key: {e}")))?;
        let ephemeral_public_bytes: [u8; 32] = ephemeral_public_bytes
            .try_into()
            .map_err(|_| EngineError::Internal("ephemeral key is not 32 bytes".into()))?;
        let ephemeral_public = PublicKey::from(ephemeral_public_bytes);

        let shared_secret = self.environment_secret.diffie_hellman(&ephemeral_public);

        let wire_nonce = BASE64
            .decode(&sealed.nonce_b64)
            .map_err(|e| EngineError::Internal(format!("decoding nonce: {e}")))?;
        let gcm_nonce = derive_gcm_nonce(&wire_nonce);

        let ciphertext = BASE64
            .decode(&sealed.ciphertext_b64)
            .map_err(|e| EngineError::Internal(format!("decoding ciphertext: {e}")))?;

        let key = GenericArray::from_slice(shared_secret.as_bytes());
        let cipher = Aes256Gcm::new(key);
        let nonce = Nonce::from_slice(&gcm_nonce);
        let plaintext = cipher
            .decrypt(nonce, ciphertext.as_slice())
            .map_err(|e| EngineError::Internal(format!("unsealing strategy: {e}")))?;

        serde_json::from_slice(&plaintext)
            .map_err(|e| EngineError::Internal(format!("decoding unsealed strategy: {e}")))
    }

    /// Startup self-test: seal and unseal a throwaway Strategy, asserting
    /// round-trip equality, to verify the payload is decryptable with the
    /// right shared secret before the engine accepts live traffic.
    pub fn self_test(&self) -> Result<()> {
        let probe = Strategy {
            venue: crate::model::VenueTag::Dlmm,
            pool: "self-test".to_string(),
            collateral_mint: "So11111111111111111111111111111111111111112".to_string(),
            collateral_amount: 1,
            range_shape: crate::model::RangeShape::Concentrated,
            distribution_shape: None,
            slippage_bps: 300,
            tip_urgency: crate::model::TipUrgency::Fast,
            custom_lower: None,
            custom_upper: None,
        };

        let sealed = self.seal(&probe)?;
        let unsealed = self.unseal(&sealed)?;

        if unsealed.pool != probe.pool || unsealed.collateral_amount != probe.collateral_amount {
            return Err(EngineError::Internal(
                "privacy sealer round-trip self-test failed".into(),
            ));
        }
        Ok(())
    }
}

/// HKDF-SHA256-expand the 16-byte wire nonce into a 12-byte GCM nonce.
fn derive_gcm_nonce(wire_nonce: &[u8]) -> [u8; GCM_NONCE_LEN] {
    let hk = hkdf::Hkdf::<Sha256>::new(None, wire_nonce);
    let mut out = [0u8; GCM_NONCE_LEN];
    hk.expand(b"lp-engine-gcm-nonce", &mut out)
        .expect("GCM_NONCE_LEN is a valid HKDF output length");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sealer() -> PrivacySealer {
        PrivacySealer::new([7u8; 32], "cluster-test".to_string())
    }

    #[test]
    fn self_test_passes() {
        sealer().self_test().unwrap();
    }

    #[test]
    fn seal_then_unseal_round_trips() {
        let sealer = sealer();
        let strategy = Strategy {
            venue: crate::model::VenueTag::Whirlpool,
            pool: "pool-123".to_string(),
            collateral_mint: "mint".to_string(),
            collateral_amount: 42,
            range_shape: crate::model::RangeShape::Wide,
            distribution_shape: None,
            slippage_bps: 500,
            tip_urgency: crate::model::TipUrgency::Turbo,
            custom_lower: None,
            custom_upper: None,
        };

        let sealed = sealer.seal(&strategy).unwrap();
        assert_eq!(BASE64.decode(&sealed.nonce_b64).unwrap().len(), WIRE_NONCE_LEN);

        let unsealed = sealer.unseal(&sealed).unwrap();
        assert_eq!(unsealed.pool, strategy.pool);
        assert_eq!(unsealed.collateral_amount, strategy.collateral_amount);
    }

    #[test]
    fn wrong_environment_key_fails_to_unseal() {
        let sealer_a = PrivacySealer::new([1u8; 32], "cluster-a".to_string());
        let sealer_b = PrivacySealer::new([2u8; 32], "cluster-b".to_string());

        let strategy = Strategy {
            venue: crate::model::VenueTag::Clmm,
            pool: "pool".to_string(),
            collateral_mint: "mint".to_string(),
            collateral_amount: 1,
            range_shape: crate::model::RangeShape::Concentrated,
            distribution_shape: None,
            slippage_bps: 300,
            tip_urgency: crate::model::TipUrgency::Skip,
            custom_lower: None,
            custom_upper: None,
        };

        // Seal under sealer_a's environment public key but attempt to
        // unseal with sealer_b's secret: the ECDH shared secrets differ
        // and decryption must fail the AEAD tag check.
        let sealed = sealer_a.seal(&strategy).unwrap();
        assert!(sealer_b.unseal(&sealed).is_err());
    }
}
