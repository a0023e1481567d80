//! Pre-signing transaction resolution.
//!
//! Resolution computes the auxiliary metadata a device needs to display
//! human-readable contract and token context for a transaction: ERC-20 token
//! descriptors, NFT collection info, plugin selection. It runs strictly after
//! the unsigned encoding is produced and its output is forwarded to the
//! device session untouched; this crate never interprets it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where the resolver loads its reference data from. All fields optional;
/// an empty config selects the resolver's defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoadConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nft_explorer_base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crypto_assets_base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin_base_url: Option<String>,
}

/// Which kinds of annotations the resolver should attempt.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolutionConfig {
    pub erc20: bool,
    pub nft: bool,
    pub external_plugins: bool,
}

/// A payload for an external-plugin selection, sent to the device verbatim.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExternalPluginPayload {
    /// Hex-encoded plugin descriptor.
    pub payload: String,
    /// Hex-encoded signature over the descriptor.
    pub signature: String,
}

/// Device-display annotations for one transaction.
///
/// Each entry is a hex-encoded, provider-signed payload replayed to the
/// device ahead of the signing exchange. The object is opaque to the signing
/// pipeline; only the device session consumes it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolutionObject {
    pub erc20_tokens: Vec<String>,
    pub nfts: Vec<String>,
    pub external_plugin: Vec<ExternalPluginPayload>,
    pub plugin: Vec<String>,
}

impl ResolutionObject {
    pub fn is_empty(&self) -> bool {
        self.erc20_tokens.is_empty() &&
            self.nfts.is_empty() &&
            self.external_plugin.is_empty() &&
            self.plugin.is_empty()
    }
}

/// Error raised by a resolver; carried through to the caller unchanged, and
/// always before any device interaction.
#[derive(Error, Debug)]
#[error("transaction resolution failed: {message}")]
pub struct ResolutionError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ResolutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), source: None }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self { message: message.into(), source: Some(Box::new(source)) }
    }
}

/// Capability interface of the external resolution service.
#[async_trait]
pub trait TransactionResolver: Send + Sync {
    /// Computes the annotations for the given unsigned canonical encoding
    /// (hex, unprefixed).
    async fn resolve_transaction(
        &self,
        raw_tx_hex: &str,
        load_config: &LoadConfig,
        resolution_config: &ResolutionConfig,
    ) -> Result<ResolutionObject, ResolutionError>;
}

/// A resolver that annotates nothing; the device falls back to blind signing
/// prompts.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopResolver;

#[async_trait]
impl TransactionResolver for NoopResolver {
    async fn resolve_transaction(
        &self,
        _raw_tx_hex: &str,
        _load_config: &LoadConfig,
        _resolution_config: &ResolutionConfig,
    ) -> Result<ResolutionObject, ResolutionError> {
        Ok(ResolutionObject::default())
    }
}
