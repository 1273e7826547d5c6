//! Contract Reader (§4.C `readContract`): a cache-through point read.
//!
//! Encoding call data and decoding the return value are entirely the ABI
//! registry's concern (§1 "out of scope"); this component only sequences
//! the cache lookup, the RPC fallback, and the cache write.

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, Bytes};

use crate::error::IndexerError;
use crate::ports::cache::CallResultKey;
use crate::ports::logger::Level;
use crate::ports::rpc::ContractCall;
use crate::ports::{AbiRegistry, Cache, Logger, RpcClient};
use crate::types::{BlockNumber, ChainId};

/// Arguments to a single cache-through contract read (§4.C, §6.4
/// `readContract`).
#[derive(Debug, Clone)]
pub struct ReadContractArgs {
    /// Key into the ABI registry.
    pub contract_name: String,
    /// Function to call.
    pub function_name: String,
    /// Contract address to call.
    pub address: Address,
    /// Height to call at.
    pub block_number: BlockNumber,
    /// Arguments to encode for the call.
    pub args: Vec<DynSolValue>,
}

/// Cache-through point read over the engine's RPC, cache, and ABI ports.
///
/// Cheap to copy: every field is a borrowed reference, so a fresh
/// [`EngineHandle`](super::emitter::EngineHandle) can carry its own copy
/// per dispatched event without re-threading lifetimes.
pub struct ContractReader<'a, R, C, A, L> {
    chain_id: ChainId,
    rpc: &'a R,
    cache: Option<&'a C>,
    abi: &'a A,
    logger: &'a L,
}

impl<'a, R, C, A, L> Clone for ContractReader<'a, R, C, A, L> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, R, C, A, L> Copy for ContractReader<'a, R, C, A, L> {}

impl<'a, R, C, A, L> ContractReader<'a, R, C, A, L>
where
    R: RpcClient,
    C: Cache,
    A: AbiRegistry,
    L: Logger,
{
    /// Build a reader over the given collaborators.
    pub const fn new(
        chain_id: ChainId,
        rpc: &'a R,
        cache: Option<&'a C>,
        abi: &'a A,
        logger: &'a L,
    ) -> Self {
        Self {
            chain_id,
            rpc,
            cache,
            abi,
            logger,
        }
    }

    /// Perform the cache-through read (§4.C steps 1-3).
    ///
    /// # Errors
    /// Propagates ABI encode/decode, cache, and RPC errors as-is. The
    /// cache is never written after a failed RPC call (§4.C: "the cache
    /// is never written on failure").
    pub async fn read_contract(
        &self,
        args: &ReadContractArgs,
    ) -> Result<Vec<DynSolValue>, IndexerError> {
        let data = self
            .abi
            .encode_call(&args.contract_name, &args.function_name, &args.args)
            .map_err(IndexerError::from)?;

        let Some(cache) = self.cache else {
            let raw = self.call_rpc(args, data).await?;
            return self.decode(args, &raw);
        };

        let key = CallResultKey {
            chain_id: self.chain_id,
            address: args.address,
            function_name: args.function_name.clone(),
            block_number: args.block_number,
            data: data.clone(),
        };

        if let Some(raw) = cache
            .get_call_result(&key)
            .await
            .map_err(IndexerError::from)?
        {
            self.logger.log(
                Level::Trace,
                "read_contract cache hit",
                &[("function", args.function_name.as_str())],
            );
            return self.decode(args, &raw);
        }

        let raw = self.call_rpc(args, data).await?;
        cache
            .put_call_result(&key, &raw)
            .await
            .map_err(IndexerError::from)?;
        self.decode(args, &raw)
    }

    async fn call_rpc(&self, args: &ReadContractArgs, data: Bytes) -> Result<Bytes, IndexerError> {
        let call = ContractCall {
            function_name: args.function_name.clone(),
            address: args.address,
            data,
            block_number: args.block_number,
        };
        self.rpc.read_contract(&call).await.map_err(Into::into)
    }

    fn decode(
        &self,
        args: &ReadContractArgs,
        raw: &Bytes,
    ) -> Result<Vec<DynSolValue>, IndexerError> {
        self.abi
            .decode_call_result(&args.contract_name, &args.function_name, raw)
            .map_err(Into::into)
    }
}
