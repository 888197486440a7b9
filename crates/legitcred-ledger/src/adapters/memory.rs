use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::{DashMap, DashSet};
use serde_json::Value;

use legitcred_core::{parse_chain_id, Address, MetadataPointer, TokenId};

use crate::abi;
use crate::error::{LedgerError, SignerError};
use crate::traits::{LedgerClient, Signer};
use crate::types::{LogEntry, PendingTx, TransactionRequest, TxHash, TxReceipt};

#[derive(Debug, Clone)]
struct StoredToken {
    pointer: String,
    owner: Address,
}

/// In-memory credential contract.
///
/// Token ids are assigned sequentially from 1 like the deployed contract.
/// Faults, latency and unreachability can be injected per token, and every
/// read is counted so tests can observe fan-out behavior.
pub struct MemoryLedger {
    contract: Address,
    tokens: DashMap<u64, StoredToken>,
    supply: AtomicU64,
    receipts: DashMap<TxHash, TxReceipt>,
    block: AtomicU64,

    failing_metadata: DashSet<u64>,
    failing_owner: DashSet<u64>,
    unreachable: AtomicBool,
    suppress_transfer_events: AtomicBool,
    latency_ms: AtomicU64,

    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    metadata_attempts: DashMap<u64, usize>,
}

/// Tracks one read in flight for the concurrency high-water mark.
struct InFlight<'a> {
    ledger: &'a MemoryLedger,
}

impl<'a> InFlight<'a> {
    fn enter(ledger: &'a MemoryLedger) -> Self {
        let now = ledger.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        ledger.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        Self { ledger }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.ledger.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MemoryLedger {
    pub fn new(contract: Address) -> Self {
        Self {
            contract,
            tokens: DashMap::new(),
            supply: AtomicU64::new(0),
            receipts: DashMap::new(),
            block: AtomicU64::new(1),
            failing_metadata: DashSet::new(),
            failing_owner: DashSet::new(),
            unreachable: AtomicBool::new(false),
            suppress_transfer_events: AtomicBool::new(false),
            latency_ms: AtomicU64::new(0),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            metadata_attempts: DashMap::new(),
        }
    }

    /// Mint directly, bypassing any signer. `pointer` is stored verbatim so
    /// malformed pointers can be seeded.
    pub fn seed(&self, owner: Address, pointer: impl Into<String>) -> TokenId {
        let id = self.supply.fetch_add(1, Ordering::SeqCst) + 1;
        self.tokens.insert(
            id,
            StoredToken {
                pointer: pointer.into(),
                owner,
            },
        );
        TokenId::new(id).unwrap_or_else(|_| unreachable!("ids start at 1"))
    }

    /// Move `token_id` to a new owner.
    pub fn transfer(&self, token_id: TokenId, to: Address) -> Result<(), LedgerError> {
        let mut entry = self
            .tokens
            .get_mut(&token_id.value())
            .ok_or_else(|| LedgerError::NotFound(format!("token {}", token_id)))?;
        entry.owner = to;
        Ok(())
    }

    /// Make metadata reads for `token_id` fail with a connectivity error.
    pub fn fail_metadata(&self, token_id: TokenId) {
        self.failing_metadata.insert(token_id.value());
    }

    /// Make owner reads for `token_id` fail with a connectivity error.
    pub fn fail_owner(&self, token_id: TokenId) {
        self.failing_owner.insert(token_id.value());
    }

    pub fn clear_faults(&self) {
        self.failing_metadata.clear();
        self.failing_owner.clear();
        self.unreachable.store(false, Ordering::SeqCst);
    }

    /// Fail every call with a connectivity error.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Delay applied to every read.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Confirm mints without emitting a `Transfer` log.
    pub fn suppress_transfer_events(&self, suppress: bool) {
        self.suppress_transfer_events
            .store(suppress, Ordering::SeqCst);
    }

    /// Total calls made against the ledger.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of reads observed in flight at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// How many times the metadata of `token_id` was requested.
    pub fn metadata_attempts(&self, token_id: TokenId) -> usize {
        self.metadata_attempts
            .get(&token_id.value())
            .map(|v| *v)
            .unwrap_or(0)
    }

    /// Ids whose metadata was requested at least once, ascending.
    pub fn attempted_tokens(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.metadata_attempts.iter().map(|e| *e.key()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn token_count(&self) -> u64 {
        self.supply.load(Ordering::SeqCst)
    }

    /// Current owner without counting a call.
    pub fn owner_snapshot(&self, token_id: TokenId) -> Option<Address> {
        self.tokens.get(&token_id.value()).map(|t| t.owner)
    }

    async fn enter(&self, what: &str) -> Result<InFlight<'_>, LedgerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(LedgerError::Connectivity(format!("{}: ledger unreachable", what)));
        }
        let guard = InFlight::enter(self);
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        Ok(guard)
    }

    fn mint_log(&self, to: &Address, id: u64) -> LogEntry {
        LogEntry {
            address: self.contract,
            topics: vec![
                abi::event_topic(abi::TRANSFER_EVENT),
                abi::encode_address(&Address::ZERO),
                abi::encode_address(to),
                abi::encode_u64(id),
            ],
            data: Vec::new(),
        }
    }
}

#[async_trait]
impl LedgerClient for MemoryLedger {
    async fn total_supply(&self) -> Result<u64, LedgerError> {
        let _guard = self.enter("totalSupply").await?;
        Ok(self.supply.load(Ordering::SeqCst))
    }

    async fn metadata_pointer(&self, token_id: TokenId) -> Result<String, LedgerError> {
        *self
            .metadata_attempts
            .entry(token_id.value())
            .or_insert(0) += 1;
        let _guard = self.enter("getMetaData").await?;
        if self.failing_metadata.contains(&token_id.value()) {
            return Err(LedgerError::Connectivity(format!(
                "getMetaData({}) failed",
                token_id
            )));
        }
        self.tokens
            .get(&token_id.value())
            .map(|t| t.pointer.clone())
            .ok_or_else(|| LedgerError::NotFound(format!("token {}", token_id)))
    }

    async fn owner_of(&self, token_id: TokenId) -> Result<Address, LedgerError> {
        let _guard = self.enter("ownerOf").await?;
        if self.failing_owner.contains(&token_id.value()) {
            return Err(LedgerError::Connectivity(format!(
                "ownerOf({}) failed",
                token_id
            )));
        }
        self.tokens
            .get(&token_id.value())
            .map(|t| t.owner)
            .ok_or_else(|| LedgerError::NotFound(format!("token {}", token_id)))
    }

    async fn submit_mint(
        &self,
        signer: &dyn Signer,
        recipient: &Address,
        pointer: &MetadataPointer,
    ) -> Result<PendingTx, LedgerError> {
        let from = signer.address().await?;
        let tx = TransactionRequest {
            from,
            to: self.contract,
            data: abi::encode_mint(recipient, &pointer.encode()),
        };
        let hash = signer.send_transaction(&tx).await?;
        drop(self.enter("mint").await?);

        let token_id = self.seed(*recipient, pointer.encode());
        let logs = if self.suppress_transfer_events.load(Ordering::SeqCst) {
            Vec::new()
        } else {
            vec![self.mint_log(recipient, token_id.value())]
        };
        let receipt = TxReceipt {
            hash: hash.clone(),
            block_number: self.block.fetch_add(1, Ordering::SeqCst),
            success: true,
            logs,
        };
        self.receipts.insert(hash.clone(), receipt);

        tracing::debug!(tx = %hash, token_id = %token_id, "memory ledger minted");

        Ok(PendingTx {
            hash,
            from,
            submitted_at: Utc::now(),
        })
    }

    async fn wait_for_confirmation(&self, pending: &PendingTx) -> Result<TxReceipt, LedgerError> {
        let _guard = self.enter("getTransactionReceipt").await?;
        self.receipts
            .get(&pending.hash)
            .map(|r| r.clone())
            .ok_or_else(|| LedgerError::NotFound(format!("transaction {}", pending.hash)))
    }

    fn contract_address(&self) -> Address {
        self.contract
    }
}

/// In-memory wallet speaking the wallet request methods.
///
/// Starts connected to `chain_id`, which is the only chain it knows about.
pub struct MemorySigner {
    account: Address,
    chain_id: Mutex<String>,
    known_chains: Mutex<HashSet<u64>>,
    connected: AtomicBool,
    refuse_switch: AtomicBool,
    ignore_switch: AtomicBool,
    reject_transactions: AtomicBool,
    nonce: AtomicU64,
    requests: Mutex<Vec<String>>,
}

impl MemorySigner {
    pub fn new(account: Address, chain_id: &str) -> Self {
        let known: HashSet<u64> = parse_chain_id(chain_id).into_iter().collect();
        Self {
            account,
            chain_id: Mutex::new(chain_id.to_lowercase()),
            known_chains: Mutex::new(known),
            connected: AtomicBool::new(true),
            refuse_switch: AtomicBool::new(false),
            ignore_switch: AtomicBool::new(false),
            reject_transactions: AtomicBool::new(false),
            nonce: AtomicU64::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Expose no account until `eth_requestAccounts` is called.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Reject chain switches as the account holder would.
    pub fn refuse_switch(&self, refuse: bool) {
        self.refuse_switch.store(refuse, Ordering::SeqCst);
    }

    /// Accept chain switches without actually moving.
    pub fn ignore_switch(&self, ignore: bool) {
        self.ignore_switch.store(ignore, Ordering::SeqCst);
    }

    pub fn reject_transactions(&self, reject: bool) {
        self.reject_transactions.store(reject, Ordering::SeqCst);
    }

    pub fn current_chain(&self) -> String {
        self.chain_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Wallet methods received so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn request_count(&self, method: &str) -> usize {
        self.requests().iter().filter(|m| m.as_str() == method).count()
    }

    fn account_list(&self) -> Value {
        Value::Array(vec![Value::String(self.account.to_lowercase_hex())])
    }

    fn first_param<'a>(params: &'a Value, method: &str) -> Result<&'a Value, SignerError> {
        params
            .get(0)
            .ok_or_else(|| SignerError::Malformed(format!("{} requires a parameter", method)))
    }

    fn switch(&self, params: &Value) -> Result<Value, SignerError> {
        let raw = Self::first_param(params, "wallet_switchEthereumChain")?
            .get("chainId")
            .and_then(|c| c.as_str())
            .ok_or_else(|| SignerError::Malformed("chainId missing".into()))?;
        let target = parse_chain_id(raw).map_err(|e| SignerError::Malformed(e.to_string()))?;

        if self.refuse_switch.load(Ordering::SeqCst) {
            return Err(SignerError::from_rpc(
                SignerError::USER_REJECTED_CODE,
                "User rejected the request.".into(),
            ));
        }
        let known = self
            .known_chains
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&target);
        if !known {
            return Err(SignerError::from_rpc(
                SignerError::UNRECOGNIZED_CHAIN_CODE,
                format!("Unrecognized chain ID \"{}\".", raw),
            ));
        }
        if !self.ignore_switch.load(Ordering::SeqCst) {
            *self.chain_id.lock().unwrap_or_else(PoisonError::into_inner) = raw.to_lowercase();
        }
        Ok(Value::Null)
    }

    fn add(&self, params: &Value) -> Result<Value, SignerError> {
        let raw = Self::first_param(params, "wallet_addEthereumChain")?
            .get("chainId")
            .and_then(|c| c.as_str())
            .ok_or_else(|| SignerError::Malformed("chainId missing".into()))?;
        let id = parse_chain_id(raw).map_err(|e| SignerError::Malformed(e.to_string()))?;
        self.known_chains
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);
        Ok(Value::Null)
    }

    fn send(&self, params: &Value) -> Result<Value, SignerError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(SignerError::Rpc {
                code: 4100,
                message: "account not authorized".into(),
            });
        }
        if self.reject_transactions.load(Ordering::SeqCst) {
            return Err(SignerError::from_rpc(
                SignerError::USER_REJECTED_CODE,
                "User denied transaction signature.".into(),
            ));
        }
        let tx = Self::first_param(params, "eth_sendTransaction")?;
        let from = tx
            .get("from")
            .and_then(|f| f.as_str())
            .and_then(|f| Address::parse(f).ok())
            .ok_or_else(|| SignerError::Malformed("transaction has no valid from".into()))?;
        if from != self.account {
            return Err(SignerError::Rpc {
                code: 4100,
                message: format!("unknown account {}", from),
            });
        }
        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        let mut preimage = tx.to_string().into_bytes();
        preimage.extend_from_slice(&nonce.to_be_bytes());
        Ok(Value::String(TxHash::from_bytes(abi::keccak256(&preimage)).to_string()))
    }
}

#[async_trait]
impl Signer for MemorySigner {
    async fn request(&self, method: &str, params: Value) -> Result<Value, SignerError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(method.to_string());

        match method {
            "eth_chainId" => Ok(Value::String(self.current_chain())),
            "eth_accounts" => {
                if self.connected.load(Ordering::SeqCst) {
                    Ok(self.account_list())
                } else {
                    Ok(Value::Array(vec![]))
                }
            }
            "eth_requestAccounts" | "wallet_requestPermissions" => {
                self.connected.store(true, Ordering::SeqCst);
                if method == "eth_requestAccounts" {
                    Ok(self.account_list())
                } else {
                    Ok(serde_json::json!([{ "parentCapability": "eth_accounts" }]))
                }
            }
            "wallet_switchEthereumChain" => self.switch(&params),
            "wallet_addEthereumChain" => self.add(&params),
            "eth_sendTransaction" => self.send(&params),
            other => Err(SignerError::Rpc {
                code: 4200,
                message: format!("unsupported method {}", other),
            }),
        }
    }
}
