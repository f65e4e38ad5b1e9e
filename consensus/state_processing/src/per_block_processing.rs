use safe_arith::{ArithError, SafeArith};
use types::{BeaconState, BeaconStateError, ChainSpec, EthSpec, Slot, Withdrawal, Withdrawals};

#[derive(Debug, PartialEq, Clone)]
pub enum BlockProcessingError {
    BeaconStateError(BeaconStateError),
    ArithError(ArithError),
    /// A validator passed the withdrawability checks but its credential does
    /// not carry an execution address.
    WithdrawalCredentialsInvalid,
}

impl From<BeaconStateError> for BlockProcessingError {
    fn from(e: BeaconStateError) -> Self {
        BlockProcessingError::BeaconStateError(e)
    }
}

impl From<ArithError> for BlockProcessingError {
    fn from(e: ArithError) -> Self {
        BlockProcessingError::ArithError(e)
    }
}

/// Compute the withdrawals the protocol will include in the block built on
/// `state` at `proposal_slot`.
///
/// This is the registry sweep from the Capella spec: walk the registry as a
/// ring starting at the persisted validator cursor, paying out fully
/// withdrawable validators in full and skimming balances above the effective
/// maximum, until either sweep bound is hit. The sweep only reads the state,
/// so re-running it with the same inputs yields the same list.
///
/// Pre-execution states have no withdrawals to predict and fail with
/// `IncorrectStateVariant`. Cursors or registries that do not line up fail
/// loudly rather than clamp: a partial list must never masquerade as a
/// result.
pub fn get_expected_withdrawals<E: EthSpec>(
    state: &BeaconState<E>,
    proposal_slot: Slot,
    spec: &ChainSpec,
) -> Result<Withdrawals<E>, BlockProcessingError> {
    let epoch = proposal_slot.epoch(E::slots_per_epoch());

    let (mut withdrawal_index, mut validator_index) = match state {
        BeaconState::Base(_) | BeaconState::Altair(_) => {
            return Err(BeaconStateError::IncorrectStateVariant.into())
        }
        // The first execution fork has no persisted sweep cursors; both
        // start at zero.
        BeaconState::Bellatrix(_) => (0, 0),
        _ => (
            state.next_withdrawal_index()?,
            state.next_withdrawal_validator_index()?,
        ),
    };

    let validator_count = state.validators().len() as u64;
    let bound = std::cmp::min(validator_count, spec.max_validators_per_withdrawals_sweep);
    let mut withdrawals = Vec::with_capacity(E::max_withdrawals_per_payload());

    for _ in 0..bound {
        let validator = state.get_validator(validator_index as usize)?;
        let balance = state.get_balance(validator_index as usize)?;
        if validator.is_fully_withdrawable_at(balance, epoch, spec) {
            withdrawals.push(Withdrawal {
                index: withdrawal_index,
                validator_index,
                address: validator
                    .get_eth1_withdrawal_address(spec)
                    .ok_or(BlockProcessingError::WithdrawalCredentialsInvalid)?,
                amount: balance,
            });
            withdrawal_index.safe_add_assign(1)?;
        } else if validator.is_partially_withdrawable_validator(balance, spec) {
            withdrawals.push(Withdrawal {
                index: withdrawal_index,
                validator_index,
                address: validator
                    .get_eth1_withdrawal_address(spec)
                    .ok_or(BlockProcessingError::WithdrawalCredentialsInvalid)?,
                amount: balance.safe_sub(spec.max_effective_balance)?,
            });
            withdrawal_index.safe_add_assign(1)?;
        }
        if withdrawals.len() == E::max_withdrawals_per_payload() {
            break;
        }
        validator_index = validator_index.safe_add(1)?.safe_rem(validator_count)?;
    }

    Ok(withdrawals.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{
        Address, BeaconStateAltair, BeaconStateBellatrix, BeaconStateCapella, Epoch, Hash256,
        MinimalEthSpec, Validator,
    };

    type E = MinimalEthSpec;

    const MAX_EFFECTIVE: u64 = 32_000_000_000;

    fn eth1_credentials(address_byte: u8) -> Hash256 {
        let mut credentials = [0u8; 32];
        credentials[0] = 0x01;
        credentials[12..].copy_from_slice(&[address_byte; 20]);
        Hash256::from(credentials)
    }

    /// An active validator at max effective balance with an execution
    /// withdrawal credential, not yet withdrawable.
    fn active_validator(address_byte: u8) -> Validator {
        Validator {
            withdrawal_credentials: eth1_credentials(address_byte),
            effective_balance: MAX_EFFECTIVE,
            withdrawable_epoch: Epoch::max_value(),
            ..Validator::default()
        }
    }

    fn exited_validator(address_byte: u8, withdrawable_epoch: u64) -> Validator {
        Validator {
            withdrawal_credentials: eth1_credentials(address_byte),
            effective_balance: MAX_EFFECTIVE,
            withdrawable_epoch: Epoch::new(withdrawable_epoch),
            ..Validator::default()
        }
    }

    fn capella_state(
        validators: Vec<Validator>,
        balances: Vec<u64>,
        next_withdrawal_index: u64,
        next_withdrawal_validator_index: u64,
    ) -> BeaconState<E> {
        BeaconState::Capella(BeaconStateCapella {
            validators: validators.into(),
            balances: balances.into(),
            next_withdrawal_index,
            next_withdrawal_validator_index,
            ..BeaconStateCapella::default()
        })
    }

    fn spec() -> ChainSpec {
        ChainSpec::minimal()
    }

    #[test]
    fn fully_withdrawable_validator_is_paid_its_balance() {
        // Withdrawable at epoch 10 with a 32 gwei balance, evaluated at
        // epoch 10.
        let state = capella_state(vec![exited_validator(0xaa, 10)], vec![32], 0, 0);
        let slot = Epoch::new(10).start_slot(E::slots_per_epoch());

        let withdrawals = get_expected_withdrawals(&state, slot, &spec()).unwrap();
        assert_eq!(withdrawals.len(), 1);
        assert_eq!(withdrawals[0].validator_index, 0);
        assert_eq!(withdrawals[0].amount, 32);
        assert_eq!(withdrawals[0].address, Address::repeat_byte(0xaa));
    }

    #[test]
    fn not_yet_withdrawable_validator_is_skipped() {
        let state = capella_state(vec![exited_validator(0xaa, 11)], vec![32], 0, 0);
        let slot = Epoch::new(10).start_slot(E::slots_per_epoch());

        let withdrawals = get_expected_withdrawals(&state, slot, &spec()).unwrap();
        assert!(withdrawals.is_empty());
    }

    #[test]
    fn partially_withdrawable_validator_is_skimmed() {
        let state = capella_state(vec![active_validator(0xbb)], vec![MAX_EFFECTIVE + 1_000_000_000], 0, 0);

        let withdrawals = get_expected_withdrawals(&state, Slot::new(0), &spec()).unwrap();
        assert_eq!(withdrawals.len(), 1);
        assert_eq!(withdrawals[0].amount, 1_000_000_000);
        assert_eq!(withdrawals[0].address, Address::repeat_byte(0xbb));
    }

    #[test]
    fn bls_credential_never_withdraws() {
        let validator = Validator {
            // 0x00 BLS credential, otherwise eligible both ways.
            withdrawal_credentials: Hash256::ZERO,
            effective_balance: MAX_EFFECTIVE,
            withdrawable_epoch: Epoch::new(0),
            ..Validator::default()
        };
        let state = capella_state(vec![validator], vec![MAX_EFFECTIVE * 2], 0, 0);

        let withdrawals = get_expected_withdrawals(&state, Slot::new(0), &spec()).unwrap();
        assert!(withdrawals.is_empty());
    }

    #[test]
    fn withdrawal_indices_are_consecutive_from_the_cursor() {
        let validators = vec![
            exited_validator(0x01, 0),
            exited_validator(0x02, 0),
            exited_validator(0x03, 0),
        ];
        let state = capella_state(validators, vec![32; 3], 40, 0);

        let withdrawals = get_expected_withdrawals(&state, Slot::new(0), &spec()).unwrap();
        assert_eq!(withdrawals.len(), 3);
        assert_eq!(
            withdrawals.iter().map(|w| w.index).collect::<Vec<_>>(),
            vec![40, 41, 42]
        );
        assert_eq!(
            withdrawals.iter().map(|w| w.validator_index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn sweep_wraps_around_the_registry() {
        let validators = vec![
            exited_validator(0x01, 0),
            active_validator(0x02),
            exited_validator(0x03, 0),
        ];
        // Start the sweep at the last validator; it must wrap to index 0.
        let state = capella_state(validators, vec![32, MAX_EFFECTIVE, 32], 0, 2);

        let withdrawals = get_expected_withdrawals(&state, Slot::new(0), &spec()).unwrap();
        assert_eq!(
            withdrawals.iter().map(|w| w.validator_index).collect::<Vec<_>>(),
            vec![2, 0]
        );
    }

    #[test]
    fn output_is_capped_by_max_withdrawals_per_payload() {
        // More eligible validators than the minimal preset's payload cap (4).
        let count = 10;
        let validators = (0..count).map(|_| exited_validator(0x0f, 0)).collect();
        let state = capella_state(validators, vec![32; count], 0, 0);

        let withdrawals = get_expected_withdrawals(&state, Slot::new(0), &spec()).unwrap();
        assert_eq!(withdrawals.len(), E::max_withdrawals_per_payload());
    }

    #[test]
    fn sweep_visits_at_most_the_sweep_bound() {
        // 32 validators, none withdrawable, sweep bound of 16: the sweep
        // must stop with an empty result rather than scan the whole
        // registry. Place an eligible validator past the bound to prove it
        // is never visited.
        let mut validators: Vec<Validator> = (0..32).map(|_| active_validator(0x0f)).collect();
        validators[20] = exited_validator(0x0f, 0);
        let mut balances = vec![MAX_EFFECTIVE; 32];
        balances[20] = 32;
        let state = capella_state(validators, balances, 0, 0);

        let spec = spec();
        assert_eq!(spec.max_validators_per_withdrawals_sweep, 16);
        let withdrawals = get_expected_withdrawals(&state, Slot::new(0), &spec).unwrap();
        assert!(withdrawals.is_empty());
    }

    #[test]
    fn empty_registry_produces_no_withdrawals() {
        let state = capella_state(vec![], vec![], 0, 0);
        let withdrawals = get_expected_withdrawals(&state, Slot::new(0), &spec()).unwrap();
        assert!(withdrawals.is_empty());
    }

    #[test]
    fn cursor_outside_the_registry_fails_before_any_withdrawal() {
        let state = capella_state(vec![exited_validator(0xaa, 0)], vec![32], 0, 1);
        assert_eq!(
            get_expected_withdrawals(&state, Slot::new(0), &spec()).unwrap_err(),
            BlockProcessingError::BeaconStateError(BeaconStateError::UnknownValidator(1))
        );
    }

    #[test]
    fn registry_and_balances_length_mismatch_is_fatal() {
        let validators = vec![exited_validator(0xaa, 0), exited_validator(0xbb, 0)];
        let state = capella_state(validators, vec![32], 0, 0);
        assert_eq!(
            get_expected_withdrawals(&state, Slot::new(1), &spec()).unwrap_err(),
            BlockProcessingError::BeaconStateError(BeaconStateError::BalancesOutOfBounds(1))
        );
    }

    #[test]
    fn sweep_is_idempotent() {
        let validators = vec![
            exited_validator(0x01, 0),
            active_validator(0x02),
            exited_validator(0x03, 0),
        ];
        let balances = vec![32, MAX_EFFECTIVE + 5, 7];
        let state = capella_state(validators, balances, 17, 1);

        let first = get_expected_withdrawals(&state, Slot::new(8), &spec()).unwrap();
        let second = get_expected_withdrawals(&state, Slot::new(8), &spec()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn bellatrix_state_sweeps_from_zero_cursors() {
        let state = BeaconState::<E>::Bellatrix(BeaconStateBellatrix {
            validators: vec![exited_validator(0xaa, 0)].into(),
            balances: vec![32].into(),
            ..BeaconStateBellatrix::default()
        });

        let withdrawals = get_expected_withdrawals(&state, Slot::new(0), &spec()).unwrap();
        assert_eq!(withdrawals.len(), 1);
        assert_eq!(withdrawals[0].index, 0);
        assert_eq!(withdrawals[0].validator_index, 0);
    }

    #[test]
    fn pre_execution_states_are_rejected() {
        let state = BeaconState::<E>::Altair(BeaconStateAltair::default());
        assert_eq!(
            get_expected_withdrawals(&state, Slot::new(0), &spec()).unwrap_err(),
            BlockProcessingError::BeaconStateError(BeaconStateError::IncorrectStateVariant)
        );
    }
}
