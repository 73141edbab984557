use alloy_primitives::Bytes;
use mw_abi::{AbiValue, Result};
use mw_core::{Call, constants::EMPTY_BATCH_CALL_DATA};

use crate::contracts::{EXECUTE, EXECUTE_BATCH, function};

/// Account call data for `calls`: `execute` for one call, `executeBatch` for
/// several, and the pre-encoded empty batch for none.
pub fn encode_calls(calls: &[Call]) -> Result<Bytes> {
    let data = match calls {
        [] => return Ok(Bytes::from_static(&EMPTY_BATCH_CALL_DATA)),
        [call] => function(EXECUTE)?.encode_input(&call_args(call))?,
        calls => {
            let batch = calls.iter().map(|call| AbiValue::Tuple(call_args(call))).collect();
            function(EXECUTE_BATCH)?.encode_input(&[AbiValue::Array(batch)])?
        }
    };
    Ok(data.into())
}

fn call_args(call: &Call) -> Vec<AbiValue> {
    vec![AbiValue::from(call.to), AbiValue::from(call.value), AbiValue::from(call.data.clone())]
}
