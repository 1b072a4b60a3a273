use super::super::OracleServiceError;
use crate::committee::Committee;
use crate::filter::filter_json;
use crate::https::FetchOutcome;
use crate::io::Serializable;
use crate::payloads::{
    OracleResponse, Signer, Transaction, Witness, WitnessScope, MAX_RESULT_SIZE,
    ORACLE_CONTRACT_HASH,
};
use crate::request::OracleRequest;
use crate::script::{create_invocation_script, multi_signature_contract_cost};
use crate::settings::FeePolicy;
use neo_primitives::OracleResponseCode;
use tracing::debug;

/// Placeholder signature used to size the committee witness before any
/// member has signed.
const PLACEHOLDER_SIGNATURE: [u8; 64] = [0u8; 64];

/// The response and the unsigned transaction carrying it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltResponse {
    pub response: OracleResponse,
    pub transaction: Transaction,
}

/// Derives the canonical response and response transaction for a request.
///
/// Building is a pure function of its inputs: every committee member that
/// observed the same fetch outcome produces byte-identical output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseBuilder {
    fee: FeePolicy,
}

impl ResponseBuilder {
    pub fn new(fee: FeePolicy) -> Self {
        Self { fee }
    }

    pub fn fee_policy(&self) -> &FeePolicy {
        &self.fee
    }

    pub fn build(
        &self,
        request: &OracleRequest,
        outcome: &FetchOutcome,
        committee: &Committee,
        valid_until_block: u32,
    ) -> Result<BuiltResponse, OracleServiceError> {
        let response = derive_response(request, outcome);
        self.create_response_tx(request, response, committee, valid_until_block)
    }

    /// Builds the transaction for `response`, downgrading it to
    /// `InsufficientFunds` when the fees exceed the request's budget.
    pub fn create_response_tx(
        &self,
        request: &OracleRequest,
        response: OracleResponse,
        committee: &Committee,
        valid_until_block: u32,
    ) -> Result<BuiltResponse, OracleServiceError> {
        if committee.is_empty() {
            return Err(OracleServiceError::InvalidCommittee(
                "oracle nodes not designated".to_string(),
            ));
        }

        let mut tx = Transaction::new();
        tx.set_version(0);
        tx.set_nonce(response.id as u32);
        tx.set_valid_until_block(valid_until_block);
        tx.set_signers(vec![
            Signer::new(ORACLE_CONTRACT_HASH, WitnessScope::NONE),
            Signer::new(committee.script_hash(), WitnessScope::NONE),
        ]);
        tx.set_script(OracleResponse::fixed_script().to_vec());

        let mut response = response;
        let mut network_fee = self.network_fee(&mut tx, &response, committee);
        if network_fee > request.gas_for_response {
            debug!(
                target: "neo::oracle",
                request_id = response.id,
                network_fee,
                gas_for_response = request.gas_for_response,
                "insufficient gas for oracle response"
            );
            response = OracleResponse::failure(response.id, OracleResponseCode::InsufficientFunds);
            network_fee = self
                .network_fee(&mut tx, &response, committee)
                .min(request.gas_for_response);
        }

        tx.set_network_fee(network_fee);
        tx.set_system_fee(request.gas_for_response - network_fee);
        tx.set_witnesses(vec![
            Witness::empty(),
            Witness::new_with_scripts(Vec::new(), committee.contract().script.clone()),
        ]);

        Ok(BuiltResponse {
            response,
            transaction: tx,
        })
    }

    /// Network fee of `tx` carrying `response`, sized with a complete
    /// committee witness.
    fn network_fee(&self, tx: &mut Transaction, response: &OracleResponse, committee: &Committee) -> i64 {
        tx.set_attributes(vec![response.clone()]);
        let invocation = create_invocation_script(
            std::iter::repeat(&PLACEHOLDER_SIGNATURE[..]).take(committee.threshold()),
        );
        tx.set_witnesses(vec![
            Witness::empty(),
            Witness::new_with_scripts(invocation, committee.contract().script.clone()),
        ]);
        let size = tx.size() as i64;

        self.fee.oracle_verification_fee
            + self.fee.exec_fee_factor
                * multi_signature_contract_cost(committee.threshold(), committee.len())
            + size * self.fee.fee_per_byte
    }
}

/// Normalizes a fetch outcome into the `(id, code, result)` triple.
pub fn derive_response(request: &OracleRequest, outcome: &FetchOutcome) -> OracleResponse {
    if outcome.code != OracleResponseCode::Success {
        return OracleResponse::failure(request.id, outcome.code);
    }

    let result = match filter_json(&outcome.body, request.filter()) {
        Ok(result) => result,
        Err(err) => {
            debug!(target: "neo::oracle", request_id = request.id, error = %err, "oracle filter failed");
            return OracleResponse::failure(request.id, OracleResponseCode::Error);
        }
    };
    if result.len() > MAX_RESULT_SIZE {
        return OracleResponse::failure(request.id, OracleResponseCode::ResponseTooLarge);
    }
    OracleResponse::new(request.id, OracleResponseCode::Success, result)
}
