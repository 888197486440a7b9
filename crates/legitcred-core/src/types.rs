use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Separator between the document and artifact content ids of an on-chain
/// metadata pointer.
pub const POINTER_DELIMITER: char = ',';

/// Sequential identifier of a minted credential token. Always >= 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(u64);

impl TokenId {
    /// Create a token id, rejecting zero.
    pub fn new(value: u64) -> Result<Self, CoreError> {
        if value == 0 {
            return Err(CoreError::Validation("token id must be >= 1".into()));
        }
        Ok(Self(value))
    }

    /// The raw integer value.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Every token id of a ledger whose total supply is `total_supply`,
    /// ascending: `1..=total_supply`.
    pub fn range(total_supply: u64) -> impl Iterator<Item = TokenId> {
        (1..=total_supply).map(TokenId)
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TokenId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u64 = s
            .trim()
            .parse()
            .map_err(|_| CoreError::Validation(format!("invalid token id: {}", s)))?;
        Self::new(value)
    }
}

/// Lowercase, whitespace-trimmed form used for every address comparison.
pub fn normalize_address(address: &str) -> String {
    address.trim().to_lowercase()
}

/// A 20-byte ledger account address.
///
/// Parsing follows the EIP-55 rules: all-lowercase and all-uppercase hex is
/// accepted as-is, mixed case must carry a valid checksum.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 20]);

impl Address {
    /// The zero address, used as the `from` side of a mint transfer.
    pub const ZERO: Address = Address([0u8; 20]);

    /// Build an address from raw bytes.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// The raw bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Parse and validate a textual address (`0x` prefix optional).
    pub fn parse(input: &str) -> Result<Self, CoreError> {
        let trimmed = input.trim();
        let body = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if body.len() != 40 || !body.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CoreError::Validation(format!(
                "invalid address: expected 40 hex characters, got {:?}",
                input
            )));
        }

        let mut bytes = [0u8; 20];
        hex::decode_to_slice(body, &mut bytes)
            .map_err(|e| CoreError::Validation(format!("invalid address {:?}: {}", input, e)))?;
        let address = Self(bytes);

        let has_lower = body.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = body.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper && address.checksum_body() != body {
            return Err(CoreError::Validation(format!(
                "bad address checksum: {}",
                input
            )));
        }

        Ok(address)
    }

    /// EIP-55 mixed-case checksum rendering, `0x`-prefixed.
    pub fn to_checksum(&self) -> String {
        format!("0x{}", self.checksum_body())
    }

    /// Lowercase rendering, `0x`-prefixed.
    pub fn to_lowercase_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    fn checksum_body(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = Keccak256::digest(lower.as_bytes());
        lower
            .chars()
            .enumerate()
            .map(|(i, c)| {
                let byte = hash[i / 2];
                let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
                if c.is_ascii_alphabetic() && nibble >= 8 {
                    c.to_ascii_uppercase()
                } else {
                    c
                }
            })
            .collect()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_checksum())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_checksum())
    }
}

impl FromStr for Address {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Address::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Opaque content-addressed storage identifier (e.g. an IPFS CID).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    /// Create a content id from a non-empty string. Surrounding whitespace is
    /// dropped.
    pub fn new(value: impl AsRef<str>) -> Result<Self, CoreError> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(CoreError::Validation("content id must not be empty".into()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The on-chain pointer of a credential: the metadata document id and the
/// artifact (rendered certificate) id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataPointer {
    pub content_id: ContentId,
    pub artifact_id: ContentId,
}

impl MetadataPointer {
    pub fn new(content_id: ContentId, artifact_id: ContentId) -> Self {
        Self {
            content_id,
            artifact_id,
        }
    }

    /// Split a raw pointer on its first delimiter.
    ///
    /// A pointer without a delimiter, or with an empty side, does not point
    /// at anything and yields [`CoreError::NotFound`].
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let (content, artifact) = raw.split_once(POINTER_DELIMITER).ok_or_else(|| {
            CoreError::NotFound(format!("metadata pointer has no delimiter: {:?}", raw))
        })?;
        let content_id = ContentId::new(content)
            .map_err(|_| CoreError::NotFound(format!("metadata pointer has no document id: {:?}", raw)))?;
        let artifact_id = ContentId::new(artifact)
            .map_err(|_| CoreError::NotFound(format!("metadata pointer has no artifact id: {:?}", raw)))?;
        Ok(Self {
            content_id,
            artifact_id,
        })
    }

    /// The wire form stored on-chain: `content_id,artifact_id`.
    pub fn encode(&self) -> String {
        format!("{}{}{}", self.content_id, POINTER_DELIMITER, self.artifact_id)
    }
}

impl fmt::Display for MetadataPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

/// A fully resolved credential: on-chain identity and owner plus the
/// off-chain metadata document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub token_id: TokenId,
    /// Current owner, lowercase-normalized.
    pub owner: String,
    pub content_id: ContentId,
    pub artifact_id: ContentId,
    pub metadata: serde_json::Value,
    /// Issuing organization taken from the metadata document, if present.
    pub organization: Option<String>,
}

impl CredentialRecord {
    /// Assemble a record from its resolved parts.
    pub fn assemble(
        token_id: TokenId,
        pointer: MetadataPointer,
        metadata: serde_json::Value,
        owner: &Address,
    ) -> Self {
        let organization = Self::organization_of(&metadata);
        Self {
            token_id,
            owner: owner.to_lowercase_hex(),
            content_id: pointer.content_id,
            artifact_id: pointer.artifact_id,
            metadata,
            organization,
        }
    }

    /// The trimmed, non-empty `organization` field of a metadata document.
    pub fn organization_of(metadata: &serde_json::Value) -> Option<String> {
        metadata
            .get("organization")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    }

    /// Case-insensitive owner check.
    pub fn is_owned_by(&self, address: &str) -> bool {
        normalize_address(&self.owner) == normalize_address(address)
    }
}

/// A request to issue one credential. The recipient is raw user input and is
/// validated by the issuance pipeline before anything touches the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintRequest {
    pub recipient: String,
    pub metadata_content_id: String,
    pub artifact_content_id: String,
}

impl MintRequest {
    pub fn new(
        recipient: impl Into<String>,
        metadata_content_id: impl Into<String>,
        artifact_content_id: impl Into<String>,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            metadata_content_id: metadata_content_id.into(),
            artifact_content_id: artifact_content_id.into(),
        }
    }

    /// Validate the content ids and build the pointer to commit on-chain.
    pub fn pointer(&self) -> Result<MetadataPointer, CoreError> {
        let content_id = ContentId::new(&self.metadata_content_id)?;
        if content_id.as_str().contains(POINTER_DELIMITER) {
            return Err(CoreError::Validation(format!(
                "metadata content id must not contain {:?}: {}",
                POINTER_DELIMITER, content_id
            )));
        }
        let artifact_id = ContentId::new(&self.artifact_content_id)?;
        Ok(MetadataPointer::new(content_id, artifact_id))
    }
}

/// Viewer role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Issuing staff; sees every credential.
    Admin,
    /// Credential holder; sees only credentials owned by their linked address.
    Holder,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Holder => write!(f, "holder"),
        }
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "holder" | "user" => Ok(Self::Holder),
            other => Err(CoreError::Validation(format!("unknown role: {}", other))),
        }
    }
}

/// The authenticated viewer of the index, as supplied by the session provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub role: Role,
    /// Ledger address linked to the login, if the provider exposed one.
    pub address: Option<String>,
}

impl Principal {
    pub fn admin() -> Self {
        Self {
            role: Role::Admin,
            address: None,
        }
    }

    pub fn holder(address: Option<&str>) -> Self {
        Self {
            role: Role::Holder,
            address: address.map(String::from),
        }
    }
}
