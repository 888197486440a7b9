//! The LegitCred node orchestrator.
//!
//! Wires the ledger client, content resolver, synchronizer, index and
//! (optionally) the issuance pipeline together, serves the HTTP API and runs
//! the command loop that executes syncs and mints.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval};

use legitcred_content::{ContentResolver, GatewayConfig, GatewayResolver};
use legitcred_core::{Address, MintRequest};
use legitcred_index::{CredentialIndex, FanoutSynchronizer, IssuancePipeline};
use legitcred_ledger::{LedgerClient, RpcLedgerClient, RpcLedgerConfig, RpcSigner, Signer};

use crate::commands::{CommandError, MintResponse, NodeCommand, SyncSummary};
use crate::config::LegitcredConfig;
use crate::state::NodeState;

/// The components commands run against. Cheap to clone into tasks.
#[derive(Clone)]
pub struct NodeServices {
    pub index: Arc<CredentialIndex>,
    pub synchronizer: Arc<FanoutSynchronizer>,
    pub issuance: Option<Arc<IssuancePipeline>>,
    pub ledger: Arc<dyn LedgerClient>,
}

impl NodeServices {
    /// Assemble services from already-built ledger, resolver and signer.
    pub fn assemble(
        config: &LegitcredConfig,
        ledger: Arc<dyn LedgerClient>,
        resolver: Arc<dyn ContentResolver>,
        signer: Option<Arc<dyn Signer>>,
    ) -> Self {
        let synchronizer = Arc::new(FanoutSynchronizer::new(
            ledger.clone(),
            resolver,
            &config.sync.settings(),
        ));
        let issuance = signer.map(|signer| {
            Arc::new(
                IssuancePipeline::new(ledger.clone(), signer, config.network.clone())
                    .with_owner_verification(config.signer.verify_owner),
            )
        });
        Self {
            index: Arc::new(CredentialIndex::new()),
            synchronizer,
            issuance,
            ledger,
        }
    }

    /// Run one full pass into the index.
    pub async fn sync(&self) -> Result<SyncSummary, CommandError> {
        let report = self.synchronizer.sync_into(&self.index).await?;
        Ok(SyncSummary {
            total_supply: report.total_supply,
            records: report.records.len(),
            organizations: report.organizations.len(),
            skipped: report.skipped,
        })
    }

    /// Mint a credential; with `index` set, resolve the new token and insert it.
    pub async fn mint(&self, request: MintRequest, index: bool) -> Result<MintResponse, CommandError> {
        let pipeline = self.issuance.as_ref().ok_or_else(|| {
            CommandError::Unavailable("issuance is disabled: no signer configured".into())
        })?;
        let outcome = pipeline.mint_credential(&request).await?;

        let (indexed, index_error) = if index {
            match self.synchronizer.resolve_token(outcome.token_id).await {
                Ok(record) => {
                    self.index.insert_or_refresh(record);
                    (true, None)
                }
                Err(e) => {
                    tracing::warn!(token_id = %outcome.token_id, error = %e, "minted token could not be indexed");
                    (false, Some(e.to_string()))
                }
            }
        } else {
            (false, None)
        };

        Ok(MintResponse {
            outcome,
            indexed,
            index_error,
        })
    }

    /// Execute one command and send its reply.
    pub async fn handle_command(&self, cmd: NodeCommand) {
        match cmd {
            NodeCommand::Sync { reply } => {
                let _ = reply.send(self.sync().await);
            }
            NodeCommand::Mint {
                request,
                index,
                reply,
            } => {
                let _ = reply.send(self.mint(request, index).await);
            }
        }
    }
}

/// The LegitCred node.
pub struct LegitcredNode {
    config: LegitcredConfig,
    services: NodeServices,
    /// Shared state accessible from HTTP handlers.
    node_state: Option<Arc<NodeState>>,
    /// Receives commands from the HTTP API.
    command_rx: Option<mpsc::Receiver<NodeCommand>>,
}

impl LegitcredNode {
    /// Create a node talking to the configured RPC endpoint and gateway.
    pub fn new(config: LegitcredConfig) -> Result<Self> {
        let contract = Address::parse(&config.ledger.contract_address)
            .context("invalid ledger.contract_address")?;

        let mut ledger_config = RpcLedgerConfig::new(config.ledger.rpc_url.clone(), contract);
        ledger_config.request_timeout = config.ledger.request_timeout();
        ledger_config.poll_interval = config.ledger.poll_interval();
        let ledger: Arc<dyn LedgerClient> = Arc::new(RpcLedgerClient::new(ledger_config)?);

        let mut gateway = GatewayConfig::new(config.content.gateway_url.clone());
        gateway.timeout = Duration::from_secs(config.content.timeout_secs);
        let resolver: Arc<dyn ContentResolver> = Arc::new(GatewayResolver::new(gateway)?);

        let signer: Option<Arc<dyn Signer>> = match &config.signer.rpc_url {
            Some(url) => {
                let signer = RpcSigner::new(url.clone(), config.ledger.request_timeout())?;
                Some(Arc::new(signer) as Arc<dyn Signer>)
            }
            None => {
                tracing::warn!("no signer configured; issuance is disabled");
                None
            }
        };

        let services = NodeServices::assemble(&config, ledger, resolver, signer);

        tracing::info!(
            contract = %contract,
            chain_id = %config.network.chain_id,
            issuance = services.issuance.is_some(),
            "LegitCred node created"
        );

        Ok(Self {
            config,
            services,
            node_state: None,
            command_rx: None,
        })
    }

    /// Start the HTTP API and open the command channel.
    pub async fn start(&mut self) -> Result<()> {
        let (command_tx, command_rx) = mpsc::channel::<NodeCommand>(256);

        let node_state = Arc::new(NodeState::new(
            self.services.index.clone(),
            self.services.ledger.contract_address().to_checksum(),
            self.config.network.chain_id.clone(),
            self.services.issuance.is_some(),
            command_tx,
        ));

        let api_addr: SocketAddr = self.config.api_addr().parse()?;
        let api_state = node_state.clone();
        tokio::spawn(async move {
            if let Err(e) = crate::api::start_api_server(api_addr, api_state).await {
                tracing::error!(error = %e, "HTTP API server error");
            }
        });

        self.node_state = Some(node_state);
        self.command_rx = Some(command_rx);
        Ok(())
    }

    /// Run the main event loop: API commands and periodic refreshes.
    pub async fn run(&mut self) -> Result<()> {
        let mut command_rx = self
            .command_rx
            .take()
            .ok_or_else(|| anyhow::anyhow!("node not started"))?;

        if self.config.sync.sync_on_start {
            self.spawn_sync("startup");
        }

        let mut refresh = self
            .config
            .sync
            .refresh_interval()
            .map(|period| tokio::time::interval_at(Instant::now() + period, period));

        tracing::info!("entering main event loop");

        loop {
            tokio::select! {
                cmd = command_rx.recv() => {
                    match cmd {
                        Some(cmd) => {
                            let services = self.services.clone();
                            tokio::spawn(async move { services.handle_command(cmd).await });
                        }
                        None => {
                            tracing::info!("command channel closed");
                            break;
                        }
                    }
                }
                _ = next_tick(&mut refresh) => {
                    self.spawn_sync("refresh");
                }
            }
        }

        Ok(())
    }

    fn spawn_sync(&self, trigger: &'static str) {
        let services = self.services.clone();
        tokio::spawn(async move {
            tracing::info!(trigger, "starting sync pass");
            if let Err(e) = services.sync().await {
                tracing::warn!(trigger, error = %e, "sync pass did not complete");
            }
        });
    }

    /// Release the command channel so in-flight API calls fail fast.
    pub async fn shutdown(&mut self) -> Result<()> {
        tracing::info!("shutting down LegitCred node");
        self.node_state = None;
        self.command_rx = None;
        Ok(())
    }
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
