//! JSON-RPC message types and the daemon methods this crate calls
//!
//! Each builder corresponds to one call against the wallet daemon.

use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::rpc::RpcError;

/// Request ids are drawn from `0..MAX_REQUEST_ID`
const MAX_REQUEST_ID: u32 = 10_000;

/// JSON-RPC 2.0 Request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Vec<serde_json::Value>,
    pub id: u32,
}

impl RpcRequest {
    /// Build a request stamped with the protocol version and a random id
    pub fn new(method: impl Into<String>, params: Vec<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.into(),
            params,
            id: rand::thread_rng().gen_range(0..MAX_REQUEST_ID),
        }
    }

    /// `getblockhash [height]` - hash of the block at `height`, if any
    pub fn get_block_hash(height: u64) -> Self {
        Self::new("getblockhash", vec![serde_json::json!(height)])
    }

    /// `getblock [hash]` - block header data
    pub fn get_block(hash: &BlockHash) -> Self {
        Self::new("getblock", vec![serde_json::json!(hash.to_hex())])
    }

    /// `getinfo` - general daemon and chain information
    pub fn get_info() -> Self {
        Self::new("getinfo", vec![])
    }
}

/// JSON-RPC error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i32,
    pub message: String,
}

/// JSON-RPC 2.0 Response
///
/// A missing or null `result` means the daemon had nothing to return.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
}

impl RpcResponse {
    pub fn success(id: u32, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: Some("2.0".to_string()),
            result: Some(result),
            error: None,
            id: Some(serde_json::json!(id)),
        }
    }

    pub fn error(id: u32, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: Some("2.0".to_string()),
            result: None,
            error: Some(RpcErrorObject { code, message: message.into() }),
            id: Some(serde_json::json!(id)),
        }
    }

    pub fn has_result(&self) -> bool {
        self.result.is_some()
    }

    /// Decode `result` into `T`; `Ok(None)` when the daemon returned no result
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Option<T>, RpcError> {
        match &self.result {
            Some(value) => Ok(Some(T::deserialize(value)?)),
            None => Ok(None),
        }
    }
}

/// `getblock` result - only the fields this crate reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockInfo {
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub height: Option<u64>,
    /// Block timestamp (Unix seconds)
    pub time: i64,
}

/// `getinfo` result
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChainInfo {
    /// Current chain height
    pub blocks: u64,
    #[serde(default)]
    pub connections: Option<u32>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub testnet: Option<bool>,
}

/// 32-byte block hash as returned by `getblockhash`
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockHash(pub [u8; 32]);

impl BlockHash {
    /// Parse a hex-encoded hash
    pub fn from_hex(hex: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(hex)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(BlockHash(arr))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash({})", self.to_hex())
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "000000004a4f1c3ba6c2cbc3e96ab3b6ee58b82e3fbd5a9ae3dbd5ab87ed05c1";

    #[test]
    fn test_request_is_stamped() {
        let request = RpcRequest::get_block_hash(1000);
        assert_eq!(request.jsonrpc, "2.0");
        assert_eq!(request.method, "getblockhash");
        assert_eq!(request.params, vec![serde_json::json!(1000)]);
        assert!(request.id < MAX_REQUEST_ID);
    }

    #[test]
    fn test_get_block_passes_hex_hash() {
        let hash = BlockHash::from_hex(HASH).unwrap();
        let request = RpcRequest::get_block(&hash);
        assert_eq!(request.method, "getblock");
        assert_eq!(request.params, vec![serde_json::json!(HASH)]);
    }

    #[test]
    fn test_missing_result_decodes_to_none() {
        let response: RpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","error":{"code":-8,"message":"Block number out of range."},"id":7}"#,
        )
        .unwrap();
        assert!(!response.has_result());
        assert_eq!(response.decode::<String>().unwrap(), None);
        assert_eq!(response.error.unwrap().code, -8);
    }

    #[test]
    fn test_null_result_counts_as_missing() {
        let response: RpcResponse =
            serde_json::from_str(r#"{"result":null,"error":null,"id":1}"#).unwrap();
        assert!(!response.has_result());
    }

    #[test]
    fn test_decode_block_info() {
        let response = RpcResponse::success(
            3,
            serde_json::json!({ "hash": HASH, "height": 12, "time": 1_500_000_000, "size": 250 }),
        );
        let block: BlockInfo = response.decode().unwrap().unwrap();
        assert_eq!(block.time, 1_500_000_000);
        assert_eq!(block.height, Some(12));
    }

    #[test]
    fn test_decode_wrong_shape_is_error() {
        let response = RpcResponse::success(3, serde_json::json!(42));
        assert!(matches!(response.decode::<BlockInfo>(), Err(RpcError::Decode(_))));
    }

    #[test]
    fn test_block_hash_rejects_short_input() {
        assert!(BlockHash::from_hex("abcd").is_err());
        assert!(BlockHash::from_hex("zz").is_err());
        assert_eq!(BlockHash::from_hex(HASH).unwrap().to_string(), HASH);
    }
}
