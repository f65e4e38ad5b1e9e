//! A test rig for driving a running beacon node over its HTTP API.
//!
//! The rig resolves the network's spec and genesis parameters off the node
//! itself, normalizes fork-versioned payloads through the `types` crate, and
//! offers slot-paced wait routines a test driver can block on. It manages no
//! processes: the node is expected to be reachable at the given URL, and the
//! caller owns the cancellation token bounding every wait.

pub mod poll;

use eth2::types::{
    BlockHeaderData, BlockId, ProposerData, StateId, ValidatorBalanceData, ValidatorData,
    ValidatorId, ValidatorStatus,
};
use eth2::{BeaconNodeHttpClient, Timeouts, Url};
use poll::PollError;
use slog::{debug, info, Logger};
use state_processing::{get_expected_withdrawals, BlockProcessingError};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;
use types::{
    BeaconState, ChainSpec, Domain, Epoch, EthSpec, ForkVersion, Hash256, SignedBeaconBlock,
    SignedBlsToExecutionChange, SignedVoluntaryExit, Slot, Withdrawal, Withdrawals,
};

/// Standard TCP port for the beacon node HTTP API.
pub const PORT_BEACON_API: u16 = 4000;

/// Default bound on any single API request.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(5);

/// Tick used while resolving spec and genesis during `init`.
const INIT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub enum Error {
    /// The API call backing an operation failed terminally.
    Api(eth2::Error),
    /// A local withdrawal computation failed.
    StateProcessing(BlockProcessingError),
    /// The caller's cancellation token fired before the awaited condition
    /// held.
    Cancelled,
    /// An operation requiring the resolved spec or genesis data ran before
    /// `init` completed.
    SpecNotInitialized,
    /// The node reported a preset base this build carries no parameters for.
    UnsupportedPresetBase(String),
    /// The node answered, but not with anything usable.
    UnexpectedResponse(String),
}

impl From<eth2::Error> for Error {
    fn from(e: eth2::Error) -> Self {
        Error::Api(e)
    }
}

impl From<BlockProcessingError> for Error {
    fn from(e: BlockProcessingError) -> Self {
        Error::StateProcessing(e)
    }
}

impl From<PollError<Error>> for Error {
    fn from(e: PollError<Error>) -> Self {
        match e {
            PollError::Cancelled => Error::Cancelled,
            PollError::Query(e) => e,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Configuration for a `BeaconNode` under test.
///
/// `spec`, `genesis_time` and `genesis_validators_root` may be seeded up
/// front when the driver already knows them; fields left empty are resolved
/// from the node during `init` and never change afterwards.
#[derive(Debug, Clone)]
pub struct BeaconNodeConfig {
    /// Index of this node in the driver's roster, only used for logging.
    pub client_index: usize,
    pub spec: Option<Arc<ChainSpec>>,
    pub genesis_time: Option<u64>,
    pub genesis_validators_root: Option<Hash256>,
    /// Bound on any single API request issued by this rig.
    pub rpc_timeout: Duration,
}

impl Default for BeaconNodeConfig {
    fn default() -> Self {
        Self {
            client_index: 0,
            spec: None,
            genesis_time: None,
            genesis_validators_root: None,
            rpc_timeout: DEFAULT_RPC_TIMEOUT,
        }
    }
}

/// A remote beacon node the test driver talks to over HTTP.
pub struct BeaconNode<E: EthSpec> {
    pub config: BeaconNodeConfig,
    http: BeaconNodeHttpClient,
    log: Logger,
    _phantom: PhantomData<E>,
}

impl<E: EthSpec> BeaconNode<E> {
    pub fn new(server: Url, config: BeaconNodeConfig, log: Logger) -> Self {
        let http =
            BeaconNodeHttpClient::new(server, Timeouts::set_all(config.rpc_timeout));
        Self {
            config,
            http,
            log,
            _phantom: PhantomData,
        }
    }

    /// Direct access to the underlying API client.
    pub fn http(&self) -> &BeaconNodeHttpClient {
        &self.http
    }

    pub fn beacon_api_url(&self) -> &Url {
        self.http.server_url()
    }

    /// The resolved network spec. Fails before `init` has run (unless the
    /// spec was seeded in the config).
    pub fn spec(&self) -> Result<Arc<ChainSpec>, Error> {
        self.config.spec.clone().ok_or(Error::SpecNotInitialized)
    }

    fn genesis_time(&self) -> Result<u64, Error> {
        self.config.genesis_time.ok_or(Error::SpecNotInitialized)
    }

    /// Resolve the network spec and genesis data off the running node.
    ///
    /// Both resolutions poll independently on a one-second tick until the
    /// node serves them, and are joined before this method returns; config
    /// fields are written exactly once, after the join. The first failure
    /// (in field order) is surfaced. Already-seeded fields are left alone
    /// and their resolution skipped.
    pub async fn init(&mut self, token: &CancellationToken) -> Result<(), Error> {
        let http = &self.http;
        let log = &self.log;
        let need_spec = self.config.spec.is_none();
        let need_genesis =
            self.config.genesis_time.is_none() || self.config.genesis_validators_root.is_none();

        let spec_task = async {
            if !need_spec {
                return Ok(None);
            }
            poll::poll_until(INIT_RETRY_INTERVAL, token, || async move {
                match http.get_config_spec().await {
                    Ok(response) => match ChainSpec::from_config(&response.data) {
                        Some(spec) => Ok(Some(spec)),
                        None => Err(Error::UnsupportedPresetBase(response.data.preset_base)),
                    },
                    Err(e) => {
                        debug!(log, "Config spec not served yet"; "error" => %e);
                        Ok(None)
                    }
                }
            })
            .await
            .map(Some)
            .map_err(Error::from)
        };

        let genesis_task = async {
            if !need_genesis {
                return Ok(None);
            }
            poll::poll_until(INIT_RETRY_INTERVAL, token, || async move {
                match http.get_beacon_genesis().await {
                    Ok(response) => Ok(Some(response.data)),
                    Err(e) => {
                        debug!(log, "Genesis not served yet"; "error" => %e);
                        Ok(None)
                    }
                }
            })
            .await
            .map(Some)
            .map_err(Error::from)
        };

        let (spec_result, genesis_result) = tokio::join!(spec_task, genesis_task);

        if let Some(spec) = spec_result? {
            self.config.spec = Some(Arc::new(spec));
        }
        if let Some(genesis) = genesis_result? {
            self.config.genesis_time = Some(genesis.genesis_time);
            self.config.genesis_validators_root = Some(genesis.genesis_validators_root);
        }

        info!(
            self.log, "Beacon node initialized";
            "client_index" => self.config.client_index,
            "genesis_time" => self.config.genesis_time,
        );
        Ok(())
    }

    /// Wait until the canonical head carries a non-empty execution payload,
    /// returning its execution block hash.
    ///
    /// Polls once per slot. A head header that cannot be fetched is terminal
    /// (the node should always have a head); a head block that cannot be
    /// fetched yet is not, the poll just runs again next slot.
    pub async fn wait_for_execution_payload(
        &self,
        token: &CancellationToken,
    ) -> Result<Hash256, Error> {
        let spec = self.spec()?;
        let genesis_time = self.genesis_time()?;
        let seconds_per_slot = spec.seconds_per_slot;
        info!(
            self.log, "Waiting for execution payload";
            "client_index" => self.config.client_index,
        );

        poll::poll_until(spec.slot_duration(), token, || async move {
            let head = match self.http.get_beacon_headers_block_id(BlockId::Head).await? {
                Some(head) => head,
                None => {
                    return Err(Error::UnexpectedResponse(
                        "no head header on beacon node".to_string(),
                    ))
                }
            };
            if !head.data.canonical {
                return Ok(None);
            }

            let block = match self
                .http
                .get_beacon_blocks::<E>(BlockId::Root(head.data.root))
                .await
            {
                Ok(Some(block)) => block.data,
                // A version tag outside the known forks poisons every
                // computation downstream; never retry past it.
                Err(e @ eth2::Error::UnknownConsensusVersion(_)) => return Err(e.into()),
                // The head moved or the block is not retrievable yet.
                Ok(None) | Err(_) => return Ok(None),
            };

            let execution = block
                .execution_payload_block_hash()
                .unwrap_or(Hash256::ZERO);
            debug!(
                self.log, "Polled head for execution payload";
                "client_index" => self.config.client_index,
                "slot" => %head.data.header.message.slot,
                "wall_slot" => %slot_at_time(genesis_time, seconds_per_slot),
                "head" => %head.data.root,
                "exec" => %execution,
            );

            if execution.is_zero() {
                Ok(None)
            } else {
                Ok(Some(execution))
            }
        })
        .await
        .map_err(Error::from)
    }

    /// Wait until the node reports the given block with the wanted
    /// optimistic-sync status, returning the block's header info.
    ///
    /// Resolves on the first slot tick where the reported flag equals
    /// `optimistic`. While the node does not know the block at all the poll
    /// keeps retrying, so this must be bounded by the cancellation token.
    pub async fn wait_for_optimistic_state(
        &self,
        token: &CancellationToken,
        block_id: BlockId,
        optimistic: bool,
    ) -> Result<BlockHeaderData, Error> {
        let spec = self.spec()?;
        info!(
            self.log, "Waiting for optimistic sync status";
            "client_index" => self.config.client_index,
            "block_id" => %block_id,
            "optimistic" => optimistic,
        );

        poll::poll_until(spec.slot_duration(), token, || async move {
            match self.http.get_beacon_headers_block_id(block_id).await {
                Ok(Some(header)) if header.execution_optimistic == Some(optimistic) => {
                    Ok(Some(header.data))
                }
                // Block unknown, still syncing, or flag not yet at the
                // wanted value.
                Ok(_) | Err(_) => Ok(None),
            }
        })
        .await
        .map_err(Error::from)
    }

    /// Fetch the full state for `state_id`.
    pub async fn beacon_state(&self, state_id: StateId) -> Result<BeaconState<E>, Error> {
        let response = self
            .http
            .get_debug_beacon_states::<E>(state_id)
            .await?
            .ok_or_else(|| Error::UnexpectedResponse(format!("state {state_id} not found")))?;
        Ok(response.data)
    }

    /// Fetch the state a block committed to, via the block's header.
    pub async fn beacon_state_by_block_id(
        &self,
        block_id: BlockId,
    ) -> Result<BeaconState<E>, Error> {
        let header = self.block_header(block_id).await?;
        self.beacon_state(StateId::Root(header.header.message.state_root))
            .await
    }

    /// Fetch the header for `block_id`, failing if the node does not have
    /// the block.
    pub async fn block_header(&self, block_id: BlockId) -> Result<BlockHeaderData, Error> {
        let response = self
            .http
            .get_beacon_headers_block_id(block_id)
            .await?
            .ok_or_else(|| Error::UnexpectedResponse(format!("block {block_id} not found")))?;
        Ok(response.data)
    }

    /// Fetch the block for `block_id`, failing if the node does not have it.
    pub async fn block(&self, block_id: BlockId) -> Result<SignedBeaconBlock<E>, Error> {
        let response = self
            .http
            .get_beacon_blocks::<E>(block_id)
            .await?
            .ok_or_else(|| Error::UnexpectedResponse(format!("block {block_id} not found")))?;
        Ok(response.data)
    }

    /// Compute, locally, the withdrawals the protocol will include in the
    /// block built on `state_id` at `proposal_slot`.
    pub async fn compute_next_withdrawals(
        &self,
        state_id: StateId,
        proposal_slot: Slot,
    ) -> Result<Withdrawals<E>, Error> {
        let spec = self.spec()?;
        let state = self.beacon_state(state_id).await?;
        get_expected_withdrawals(&state, proposal_slot, &spec).map_err(Error::from)
    }

    /// Ask the node for its own expected withdrawals, to cross-check the
    /// local computation.
    pub async fn expected_withdrawals(&self, state_id: StateId) -> Result<Vec<Withdrawal>, Error> {
        let response = self
            .http
            .get_expected_withdrawals(state_id)
            .await?
            .ok_or_else(|| {
                Error::UnexpectedResponse(format!("no expected withdrawals for {state_id}"))
            })?;
        Ok(response.data)
    }

    /// The proposer index for `slot`, from the node's proposer duties.
    pub async fn proposer_index(&self, slot: Slot) -> Result<u64, Error> {
        let epoch = slot.epoch(E::slots_per_epoch());
        let duties = self.http.get_validator_duties_proposer(epoch).await?;
        duties
            .data
            .iter()
            .find(|duty| duty.slot == slot)
            .map(|duty| duty.validator_index)
            .ok_or_else(|| {
                Error::UnexpectedResponse(format!("no proposer duty found for slot {slot}"))
            })
    }

    /// All proposer duties for an epoch.
    pub async fn proposer_duties(&self, epoch: Epoch) -> Result<Vec<ProposerData>, Error> {
        Ok(self.http.get_validator_duties_proposer(epoch).await?.data)
    }

    /// Compute the BLS signing domain for this network.
    ///
    /// When no fork version is given, the current version is read from the
    /// head state.
    pub async fn compute_domain(
        &self,
        domain: Domain,
        fork_version: Option<ForkVersion>,
    ) -> Result<Hash256, Error> {
        let spec = self.spec()?;
        let genesis_validators_root = self
            .config
            .genesis_validators_root
            .ok_or(Error::SpecNotInitialized)?;
        let version = match fork_version {
            Some(version) => version,
            None => {
                let state = self.beacon_state_by_block_id(BlockId::Head).await?;
                state.fork().current_version
            }
        };
        Ok(spec.compute_domain(domain, version, genesis_validators_root))
    }

    /// Walk the chain backwards from the head, returning the newest block
    /// carrying a non-empty execution payload.
    pub async fn get_latest_execution_beacon_block(
        &self,
    ) -> Result<Option<SignedBeaconBlock<E>>, Error> {
        let head = self.block_header(BlockId::Head).await?;
        let mut slot = head.header.message.slot;
        while slot > 0u64 {
            if let Some(response) = self.http.get_beacon_blocks::<E>(BlockId::Slot(slot)).await? {
                let block = response.data;
                if block
                    .execution_payload_block_hash()
                    .is_some_and(|hash| !hash.is_zero())
                {
                    return Ok(Some(block));
                }
            }
            slot = slot - 1;
        }
        Ok(None)
    }

    /// Walk the chain forwards from genesis, returning the first block
    /// carrying a non-empty execution payload.
    pub async fn get_first_execution_beacon_block(
        &self,
    ) -> Result<Option<SignedBeaconBlock<E>>, Error> {
        let spec = self.spec()?;
        let genesis_time = self.genesis_time()?;
        let last_slot = slot_at_time(genesis_time, spec.seconds_per_slot);

        let mut slot = Slot::new(0);
        while slot <= last_slot {
            if let Ok(Some(response)) =
                self.http.get_beacon_blocks::<E>(BlockId::Slot(slot)).await
            {
                let block = response.data;
                if block
                    .execution_payload_block_hash()
                    .is_some_and(|hash| !hash.is_zero())
                {
                    return Ok(Some(block));
                }
            }
            slot += 1;
        }
        Ok(None)
    }

    /// Walk the chain backwards from the head, returning the block whose
    /// execution payload carries `hash`.
    pub async fn get_beacon_block_by_execution_hash(
        &self,
        hash: Hash256,
    ) -> Result<Option<SignedBeaconBlock<E>>, Error> {
        let head = self.block_header(BlockId::Head).await?;
        let mut slot = head.header.message.slot;
        while slot > 0u64 {
            if let Ok(Some(response)) =
                self.http.get_beacon_blocks::<E>(BlockId::Slot(slot)).await
            {
                let block = response.data;
                if block.execution_payload_block_hash() == Some(hash) {
                    return Ok(Some(block));
                }
            }
            slot = slot - 1;
        }
        Ok(None)
    }

    /// Count, per epoch, the slots that actually contain a block, walking
    /// header-by-header from the head back to genesis.
    pub async fn get_filled_slots_count_per_epoch(&self) -> Result<HashMap<Epoch, u64>, Error> {
        let mut epoch_map = HashMap::new();
        let mut header = self.block_header(BlockId::Head).await?;
        loop {
            let epoch = header
                .header
                .message
                .slot
                .epoch(E::slots_per_epoch());
            *epoch_map.entry(epoch).or_insert(0) += 1;
            let parent_root = header.header.message.parent_root;
            if parent_root.is_zero() {
                break;
            }
            header = self.block_header(BlockId::Root(parent_root)).await?;
        }
        Ok(epoch_map)
    }

    /// Validator records for `state_id`, optionally filtered by id or
    /// status.
    pub async fn state_validators(
        &self,
        state_id: StateId,
        ids: Option<&[ValidatorId]>,
        statuses: Option<&[ValidatorStatus]>,
    ) -> Result<Vec<ValidatorData>, Error> {
        let response = self
            .http
            .get_beacon_states_validators(state_id, ids, statuses)
            .await?
            .ok_or_else(|| Error::UnexpectedResponse(format!("state {state_id} not found")))?;
        Ok(response.data)
    }

    /// Balances for `state_id`, optionally filtered by validator id.
    pub async fn state_validator_balances(
        &self,
        state_id: StateId,
        ids: Option<&[ValidatorId]>,
    ) -> Result<Vec<ValidatorBalanceData>, Error> {
        let response = self
            .http
            .get_beacon_states_validator_balances(state_id, ids)
            .await?
            .ok_or_else(|| Error::UnexpectedResponse(format!("state {state_id} not found")))?;
        Ok(response.data)
    }

    pub async fn submit_voluntary_exit(&self, exit: &SignedVoluntaryExit) -> Result<(), Error> {
        self.http
            .post_beacon_pool_voluntary_exits(exit)
            .await
            .map_err(Error::from)
    }

    pub async fn submit_bls_to_execution_changes(
        &self,
        changes: &[SignedBlsToExecutionChange],
    ) -> Result<(), Error> {
        self.http
            .post_beacon_pool_bls_to_execution_changes(changes)
            .await
            .map_err(Error::from)
    }

    /// Log a one-line summary of the node's chain status.
    pub async fn log_status(&self) {
        let mut slot = Slot::new(0);
        let mut head = String::from("-");
        let mut justified = String::from("-");
        let mut finalized = String::from("-");
        let mut version = String::from("-");
        let mut execution = String::from("-");

        if let Ok(header) = self.block_header(BlockId::Head).await {
            slot = header.header.message.slot;
            head = format!("{:?}", header.root);
        }
        if let Ok(Some(checkpoints)) = self
            .http
            .get_beacon_states_finality_checkpoints(StateId::Head)
            .await
        {
            justified = format!("{:?}", checkpoints.data.current_justified.root);
            finalized = format!("{:?}", checkpoints.data.finalized.root);
        }
        if let Ok(block) = self.block(BlockId::Head).await {
            version = block.fork_name_unchecked().to_string();
            if let Some(hash) = block.execution_payload_block_hash() {
                execution = format!("{:?}", hash);
            }
        }

        info!(
            self.log, "Beacon node status";
            "client_index" => self.config.client_index,
            "fork" => version,
            "slot" => %slot,
            "head" => head,
            "exec_payload" => execution,
            "justified" => justified,
            "finalized" => finalized,
        );
    }
}

/// The wall-clock slot for a chain started at `genesis_time`.
fn slot_at_time(genesis_time: u64, seconds_per_slot: u64) -> Slot {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    Slot::new(now.saturating_sub(genesis_time) / seconds_per_slot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use slog::o;
    use types::MinimalEthSpec;

    fn test_logger() -> Logger {
        Logger::root(slog::Discard, o!())
    }

    fn test_node() -> BeaconNode<MinimalEthSpec> {
        BeaconNode::new(
            Url::parse("http://127.0.0.1:4000").unwrap(),
            BeaconNodeConfig::default(),
            test_logger(),
        )
    }

    #[test]
    fn poll_errors_map_into_rig_errors() {
        assert!(matches!(
            Error::from(PollError::<Error>::Cancelled),
            Error::Cancelled
        ));
        assert!(matches!(
            Error::from(PollError::Query(Error::SpecNotInitialized)),
            Error::SpecNotInitialized
        ));
    }

    #[test]
    fn spec_dependent_operations_require_init() {
        let node = test_node();
        assert!(matches!(node.spec(), Err(Error::SpecNotInitialized)));
        assert!(matches!(
            node.genesis_time(),
            Err(Error::SpecNotInitialized)
        ));
    }

    #[test]
    fn seeded_config_skips_resolution() {
        let mut config = BeaconNodeConfig::default();
        config.spec = Some(Arc::new(ChainSpec::minimal()));
        config.genesis_time = Some(1_606_824_023);
        let node: BeaconNode<MinimalEthSpec> = BeaconNode::new(
            Url::parse("http://127.0.0.1:4000").unwrap(),
            config,
            test_logger(),
        );
        assert_eq!(node.spec().unwrap().seconds_per_slot, 6);
        assert_eq!(node.genesis_time().unwrap(), 1_606_824_023);
    }

    #[test]
    fn slot_at_time_saturates_before_genesis() {
        assert_eq!(slot_at_time(u64::MAX, 12), Slot::new(0));
    }
}
