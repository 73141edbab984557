//! User operation preparation.
//!
//! Fields are resolved in a fixed order because later steps depend on earlier
//! ones: gas estimation simulates the operation with its final call data,
//! deployment arguments, nonce and paymaster. Fee estimation is advisory and
//! falls back to zero fees; gas estimation and paymaster failures abort.

use alloy_primitives::U256;
use mw_core::{UserOperation, UserOperationV07};
use mw_rpc::{FeesPerGas, PaymasterClient, PaymasterContext, UserOperationGasEstimate};
use tracing::{debug, warn};

use crate::{
    client::{SmartAccountClient, UserOperationRequest},
    error::{Result, UserOperationError, UserOperationExecutionError},
};

/// Paymaster resolution carried from the stub step to the final step.
struct PaymasterStep {
    client: PaymasterClient,
    context: Option<PaymasterContext>,
    is_final: bool,
}

/// Whether the draft takes a nonce from the account or only looks at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NonceMode {
    Reserve,
    Peek,
}

/// An operation with call data, deployment, fees, nonce and a placeholder
/// signature resolved.
struct Draft {
    user_operation: UserOperationV07,
    gas_floor: Option<U256>,
    /// Set when the nonce was reserved for this operation.
    reserved_nonce: Option<U256>,
}

impl SmartAccountClient {
    /// Resolves every missing field of `request` except the final signature,
    /// which is left as the account's placeholder.
    ///
    /// A nonce reserved for the operation is released again if a later step fails.
    pub async fn prepare_user_operation(
        &self,
        request: UserOperationRequest,
    ) -> Result<UserOperation> {
        let nonce_key = request.nonce_key;
        let Draft { user_operation, gas_floor, reserved_nonce } =
            self.draft(request, NonceMode::Reserve).await?;

        let prepared = self.complete(user_operation, gas_floor).await;
        if let (Err(err), Some(nonce)) = (&prepared, reserved_nonce) {
            debug!(
                message = "preparation failed, releasing nonce",
                nonce = %nonce,
                error = %err
            );
            self.account.release_nonce(nonce_key, nonce).await;
        }
        prepared
    }

    /// Runs `eth_estimateUserOperationGas` for `request` regardless of any gas
    /// limits the caller pinned. The account nonce is read but not reserved.
    pub async fn estimate_user_operation_gas(
        &self,
        request: UserOperationRequest,
    ) -> Result<UserOperationGasEstimate> {
        let Draft { mut user_operation, .. } = self.draft(request, NonceMode::Peek).await?;
        let paymaster = self.sponsor(&mut user_operation).await?;
        self.estimate_gas(&user_operation, paymaster.is_some()).await
    }

    /// Paymaster stub, gas limits, the verification floor and final paymaster data.
    async fn complete(
        &self,
        mut user_operation: UserOperationV07,
        gas_floor: Option<U256>,
    ) -> Result<UserOperation> {
        let paymaster = self.sponsor(&mut user_operation).await?;

        if user_operation.needs_gas_estimate() {
            let estimate = self.estimate_gas(&user_operation, paymaster.is_some()).await?;
            user_operation.call_gas_limit.get_or_insert(estimate.call_gas_limit);
            user_operation.verification_gas_limit.get_or_insert(estimate.verification_gas_limit);
            user_operation.pre_verification_gas.get_or_insert(estimate.pre_verification_gas);
            if paymaster.is_some() {
                if user_operation.paymaster_verification_gas_limit.is_none() {
                    user_operation.paymaster_verification_gas_limit =
                        estimate.paymaster_verification_gas_limit;
                }
                if user_operation.paymaster_post_op_gas_limit.is_none() {
                    user_operation.paymaster_post_op_gas_limit = estimate.paymaster_post_op_gas_limit;
                }
            }
        }

        if let Some(floor) = gas_floor {
            let limit = user_operation.verification_gas_limit.unwrap_or_default().max(floor);
            user_operation.verification_gas_limit = Some(limit);
        }

        if let Some(step) = paymaster.filter(|step| !step.is_final) {
            let data = step
                .client
                .get_paymaster_data(
                    &user_operation,
                    self.account.entry_point(),
                    self.account.chain_id(),
                    step.context.as_ref(),
                )
                .await
                .map_err(UserOperationError::Paymaster)?;
            debug!(message = "final paymaster data received", paymaster = ?data.paymaster);
            user_operation.paymaster = data.paymaster.or(user_operation.paymaster);
            user_operation.paymaster_data = data.paymaster_data.or(user_operation.paymaster_data);
            if data.paymaster_verification_gas_limit.is_some() {
                user_operation.paymaster_verification_gas_limit =
                    data.paymaster_verification_gas_limit;
            }
            if data.paymaster_post_op_gas_limit.is_some() {
                user_operation.paymaster_post_op_gas_limit = data.paymaster_post_op_gas_limit;
            }
        }

        Ok(user_operation.try_into_resolved()?)
    }

    async fn draft(&self, request: UserOperationRequest, mode: NonceMode) -> Result<Draft> {
        let account = &self.account;
        let UserOperationRequest { calls, overrides: mut op, nonce_key } = request;

        if op.sender.is_none() {
            op.sender = Some(account.address().await?);
        }

        let gas_floor = account.user_operation_gas_floor().await?;

        if op.call_data.is_none() {
            op.call_data = Some(account.encode_calls(&calls)?);
        }

        if op.factory.is_none() {
            if let Some((factory, factory_data)) = account.factory_args().await? {
                debug!(message = "account not deployed, attaching factory", factory = %factory);
                op.factory = Some(factory);
                op.factory_data = Some(factory_data);
            }
        }

        if op.max_fee_per_gas.is_none() || op.max_priority_fee_per_gas.is_none() {
            let fees = self.estimate_fees().await;
            op.max_fee_per_gas.get_or_insert(fees.max_fee_per_gas);
            op.max_priority_fee_per_gas.get_or_insert(fees.max_priority_fee_per_gas);
        }

        // last fallible step, so a reservation never outlives a failed draft
        let mut reserved_nonce = None;
        if op.nonce.is_none() {
            let nonce = match mode {
                NonceMode::Reserve => {
                    let nonce = account.nonce(nonce_key).await?;
                    reserved_nonce = Some(nonce);
                    nonce
                }
                NonceMode::Peek => account.peek_nonce(nonce_key).await?,
            };
            op.nonce = Some(nonce);
        }

        if op.signature.is_none() {
            op.signature = Some(account.stub_signature());
        }

        Ok(Draft { user_operation: op, gas_floor, reserved_nonce })
    }

    /// Applies the paymaster stub data when sponsorship is configured.
    async fn sponsor(&self, op: &mut UserOperationV07) -> Result<Option<PaymasterStep>> {
        let Some(paymaster) = &self.config.paymaster else {
            return Ok(None);
        };
        let client = paymaster.client(self.bundler.transport());
        let context = paymaster.context().cloned();
        let stub = client
            .get_paymaster_stub_data(
                op,
                self.account.entry_point(),
                self.account.chain_id(),
                context.as_ref(),
            )
            .await
            .map_err(UserOperationError::Paymaster)?;
        debug!(
            message = "paymaster stub data received",
            paymaster = ?stub.paymaster,
            is_final = stub.is_final
        );
        op.paymaster = stub.paymaster;
        op.paymaster_data = stub.paymaster_data;
        op.paymaster_verification_gas_limit =
            stub.paymaster_verification_gas_limit.or(op.paymaster_verification_gas_limit);
        op.paymaster_post_op_gas_limit =
            stub.paymaster_post_op_gas_limit.or(op.paymaster_post_op_gas_limit);
        Ok(Some(PaymasterStep { client, context, is_final: stub.is_final }))
    }

    /// Fee estimation never fails the pipeline; zero fees are used instead.
    async fn estimate_fees(&self) -> FeesPerGas {
        let estimated = match &self.config.fee_estimator {
            Some(estimator) => estimator.estimate_fees_per_gas(&self.public).await,
            None => self.public.estimate_fees_per_gas(&self.config.fee_estimation).await,
        };
        estimated.unwrap_or_else(|err| {
            warn!(message = "fee estimation failed, using zero fees", error = %err);
            FeesPerGas {
                base_fee_per_gas: U256::ZERO,
                max_fee_per_gas: U256::ZERO,
                max_priority_fee_per_gas: U256::ZERO,
            }
        })
    }

    /// Simulates with unresolved gas fields zeroed, since bundlers reject nulls.
    async fn estimate_gas(
        &self,
        user_operation: &UserOperationV07,
        sponsored: bool,
    ) -> Result<UserOperationGasEstimate> {
        let mut request = user_operation.clone();
        request.call_gas_limit.get_or_insert(U256::ZERO);
        request.verification_gas_limit.get_or_insert(U256::ZERO);
        request.pre_verification_gas.get_or_insert(U256::ZERO);
        if sponsored {
            request.paymaster_verification_gas_limit.get_or_insert(U256::ZERO);
            request.paymaster_post_op_gas_limit.get_or_insert(U256::ZERO);
        }

        match self.bundler.estimate_user_operation_gas(&request).await {
            Ok(estimate) => {
                debug!(
                    message = "gas estimated",
                    call_gas_limit = %estimate.call_gas_limit,
                    verification_gas_limit = %estimate.verification_gas_limit,
                    pre_verification_gas = %estimate.pre_verification_gas
                );
                Ok(estimate)
            }
            Err(cause) => Err(UserOperationExecutionError::new(cause, request).into()),
        }
    }
}
