//! Tests for RpcLedgerClient and RpcSigner against a mocked JSON-RPC node.
//!
//! The mock matches on the JSON-RPC method and, for `eth_call`, on the
//! function selector in the calldata.

use std::time::Duration;

use legitcred_core::{Address, ContentId, MetadataPointer, TokenId};
use legitcred_ledger::abi;
use legitcred_ledger::{LedgerClient, LedgerError, RpcLedgerClient, RpcLedgerConfig, RpcSigner, Signer, SignerError};
use serde_json::{json, Value};
use wiremock::matchers::method;
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

const CONTRACT: &str = "0x23cb9cc6125dd5b83e5b8d94d7c45d0b123e0a0a";
const ACCOUNT: &str = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";

/// Matches a JSON-RPC request by method name.
struct RpcMethod(&'static str);

impl Match for RpcMethod {
    fn matches(&self, request: &Request) -> bool {
        serde_json::from_slice::<Value>(&request.body)
            .ok()
            .and_then(|body| body.get("method").and_then(|m| m.as_str()).map(String::from))
            .is_some_and(|m| m == self.0)
    }
}

/// Matches an `eth_call` whose calldata starts with the selector of `signature`.
struct CallSelector(&'static str);

impl Match for CallSelector {
    fn matches(&self, request: &Request) -> bool {
        let prefix = abi::to_hex(&abi::selector(self.0));
        serde_json::from_slice::<Value>(&request.body)
            .ok()
            .and_then(|body| {
                body.pointer("/params/0/data")
                    .and_then(|d| d.as_str())
                    .map(String::from)
            })
            .is_some_and(|data| data.starts_with(&prefix))
    }
}

fn rpc_result(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": result }))
}

fn rpc_error(code: i64, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "error": { "code": code, "message": message }
    }))
}

fn client_for(url: &str) -> RpcLedgerClient {
    let mut config = RpcLedgerConfig::new(url, Address::parse(CONTRACT).unwrap());
    config.request_timeout = Duration::from_secs(5);
    config.poll_interval = Duration::from_millis(10);
    RpcLedgerClient::new(config).unwrap()
}

fn encoded_string(s: &str) -> String {
    let mut data = Vec::new();
    data.extend_from_slice(&abi::encode_u64(32));
    data.extend_from_slice(&abi::encode_u64(s.len() as u64));
    data.extend_from_slice(s.as_bytes());
    data.resize(64 + s.len().div_ceil(32) * 32, 0);
    abi::to_hex(&data)
}

fn tx_hash() -> String {
    format!("0x{}", "ab".repeat(32))
}

fn receipt_json(status: &str, token_id: u64) -> Value {
    json!({
        "transactionHash": tx_hash(),
        "blockNumber": "0x2a",
        "status": status,
        "logs": [{
            "address": CONTRACT,
            "topics": [
                abi::to_hex(&abi::event_topic(abi::TRANSFER_EVENT)),
                abi::to_hex(&abi::encode_address(&Address::ZERO)),
                abi::to_hex(&abi::encode_address(&Address::parse(ACCOUNT).unwrap())),
                abi::to_hex(&abi::encode_u64(token_id)),
            ],
            "data": "0x"
        }]
    })
}

#[tokio::test]
async fn total_supply_decodes_uint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(RpcMethod("eth_call"))
        .and(CallSelector(abi::TOTAL_SUPPLY))
        .respond_with(rpc_result(json!(abi::to_hex(&abi::encode_u64(5)))))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    assert_eq!(client.total_supply().await.unwrap(), 5);
}

#[tokio::test]
async fn metadata_pointer_decodes_string() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(RpcMethod("eth_call"))
        .and(CallSelector(abi::GET_META_DATA))
        .respond_with(rpc_result(json!(encoded_string("bafydoc,bafyart"))))
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    let pointer = client.metadata_pointer(TokenId::new(3).unwrap()).await.unwrap();
    assert_eq!(pointer, "bafydoc,bafyart");
}

#[tokio::test]
async fn owner_of_decodes_address() {
    let server = MockServer::start().await;
    let owner = Address::parse(ACCOUNT).unwrap();
    Mock::given(method("POST"))
        .and(CallSelector(abi::OWNER_OF))
        .respond_with(rpc_result(json!(abi::to_hex(&abi::encode_address(&owner)))))
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    assert_eq!(client.owner_of(TokenId::new(1).unwrap()).await.unwrap(), owner);
}

#[tokio::test]
async fn reverted_call_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(CallSelector(abi::OWNER_OF))
        .respond_with(rpc_error(3, "execution reverted: ERC721: invalid token ID"))
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    let err = client.owner_of(TokenId::new(99).unwrap()).await.unwrap_err();
    assert!(err.is_not_found(), "expected NotFound, got {:?}", err);
}

#[tokio::test]
async fn empty_return_data_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(RpcMethod("eth_call"))
        .respond_with(rpc_result(json!("0x")))
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    assert!(client
        .metadata_pointer(TokenId::new(1).unwrap())
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn other_rpc_errors_are_preserved() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(rpc_error(-32005, "rate limited"))
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    let err = client.total_supply().await.unwrap_err();
    assert!(matches!(err, LedgerError::Rpc { code: -32005, .. }));
}

#[tokio::test]
async fn http_failure_is_connectivity() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    let err = client.total_supply().await.unwrap_err();
    assert!(err.is_retryable(), "expected Connectivity, got {:?}", err);
}

#[tokio::test]
async fn unreachable_endpoint_is_connectivity() {
    let client = client_for("http://127.0.0.1:1");
    let err = client.total_supply().await.unwrap_err();
    assert!(matches!(err, LedgerError::Connectivity(_)));
}

#[tokio::test]
async fn mint_is_signed_and_confirmed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(RpcMethod("eth_accounts"))
        .respond_with(rpc_result(json!([ACCOUNT])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(RpcMethod("eth_sendTransaction"))
        .respond_with(rpc_result(json!(tx_hash())))
        .expect(1)
        .mount(&server)
        .await;
    // first poll sees a pending transaction
    Mock::given(method("POST"))
        .and(RpcMethod("eth_getTransactionReceipt"))
        .respond_with(rpc_result(Value::Null))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(RpcMethod("eth_getTransactionReceipt"))
        .respond_with(rpc_result(receipt_json("0x1", 6)))
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    let signer = RpcSigner::new(server.uri(), Duration::from_secs(5)).unwrap();
    let pointer = MetadataPointer::new(
        ContentId::new("bafydoc").unwrap(),
        ContentId::new("bafyart").unwrap(),
    );
    let recipient = Address::parse(ACCOUNT).unwrap();

    let pending = client.submit_mint(&signer, &recipient, &pointer).await.unwrap();
    assert_eq!(pending.hash.as_str(), tx_hash());
    assert_eq!(pending.from, recipient);

    let receipt = client.wait_for_confirmation(&pending).await.unwrap();
    assert_eq!(receipt.block_number, 42);
    assert_eq!(
        receipt.minted_token_id(&client.contract_address()).map(|t| t.value()),
        Some(6)
    );
}

#[tokio::test]
async fn reverted_mint_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(RpcMethod("eth_getTransactionReceipt"))
        .respond_with(rpc_result(receipt_json("0x0", 6)))
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    let pending = legitcred_ledger::PendingTx {
        hash: legitcred_ledger::TxHash::parse(&tx_hash()).unwrap(),
        from: Address::parse(ACCOUNT).unwrap(),
        submitted_at: chrono::Utc::now(),
    };
    let err = client.wait_for_confirmation(&pending).await.unwrap_err();
    assert!(matches!(err, LedgerError::Reverted(_)));
}

fn pending_tx() -> legitcred_ledger::PendingTx {
    legitcred_ledger::PendingTx {
        hash: legitcred_ledger::TxHash::parse(&tx_hash()).unwrap(),
        from: Address::parse(ACCOUNT).unwrap(),
        submitted_at: chrono::Utc::now(),
    }
}

#[tokio::test]
async fn receipt_poll_absorbs_transient_outage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(RpcMethod("eth_getTransactionReceipt"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(3)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(RpcMethod("eth_getTransactionReceipt"))
        .respond_with(rpc_result(receipt_json("0x1", 7)))
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    let receipt = client.wait_for_confirmation(&pending_tx()).await.unwrap();
    assert_eq!(
        receipt.minted_token_id(&client.contract_address()).map(|t| t.value()),
        Some(7)
    );
}

#[tokio::test]
async fn receipt_poll_gives_up_after_repeated_outage() {
    let server = MockServer::start().await;
    // one initial poll plus five tolerated failures
    Mock::given(method("POST"))
        .and(RpcMethod("eth_getTransactionReceipt"))
        .respond_with(ResponseTemplate::new(503))
        .expect(6)
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    let err = client.wait_for_confirmation(&pending_tx()).await.unwrap_err();
    assert!(matches!(err, LedgerError::Connectivity(_)));
}

#[tokio::test]
async fn contract_reads_do_not_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    assert!(client.total_supply().await.unwrap_err().is_retryable());
}

#[tokio::test]
async fn signer_maps_wallet_error_codes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(RpcMethod("wallet_switchEthereumChain"))
        .respond_with(rpc_error(4902, "Unrecognized chain ID"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(RpcMethod("eth_chainId"))
        .respond_with(rpc_result(json!("0x1")))
        .mount(&server)
        .await;

    let signer = RpcSigner::new(server.uri(), Duration::from_secs(5)).unwrap();
    assert_eq!(signer.chain_id().await.unwrap(), "0x1");
    let err = signer.switch_chain("0xaa36a7").await.unwrap_err();
    assert!(matches!(err, SignerError::UnrecognizedChain(_)));
}
