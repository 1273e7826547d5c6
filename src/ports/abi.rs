//! ABI registry port: the engine's abstract view of the ABI codec (§1
//! "external collaborators", §3, §4.F, §4.P). Encoding call data and
//! decoding event topics/data/return values is entirely the registry's
//! concern; the engine only needs topic-0 hashes (to build `getLogs`
//! filters) and a decode entry point.

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::Bytes;
use async_trait::async_trait;

use crate::error::AbiError;
use crate::types::{DecodedEvent, Log};

/// A registry of contract ABIs, keyed by contract name.
#[async_trait]
pub trait AbiRegistry: Send + Sync {
    /// Whether `contract_name` is a known entry (used to validate
    /// `subscribe_to_contract`, §4.I: "unknown name is fatal").
    fn has_contract(&self, contract_name: &str) -> bool;

    /// All event signature (topic-0) hashes declared for `contract_name`,
    /// used to build the topic-0 disjunction filter (§4.F step 2).
    fn topic0_hashes(&self, contract_name: &str) -> Result<Vec<alloy::primitives::B256>, AbiError>;

    /// Decode `log` against `contract_name`'s ABI. A decode failure is
    /// non-fatal at the call site (§4.P step 3: "logs at `warn` and skips
    /// the event, never aborts the drain"); this method only reports it.
    fn decode_event(&self, contract_name: &str, log: &Log) -> Result<DecodedEvent, AbiError>;

    /// Encode a call to `function_name` on `contract_name`'s ABI, producing
    /// the call data `readContract` sends over RPC (§4.C step 1).
    fn encode_call(
        &self,
        contract_name: &str,
        function_name: &str,
        args: &[DynSolValue],
    ) -> Result<Bytes, AbiError>;

    /// Decode `raw` as `function_name`'s return type on `contract_name`'s
    /// ABI (§4.C step 5).
    fn decode_call_result(
        &self,
        contract_name: &str,
        function_name: &str,
        raw: &Bytes,
    ) -> Result<Vec<DynSolValue>, AbiError>;
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks {
    //! A minimal in-memory ABI registry for tests: each contract declares
    //! a fixed list of `(event_name, topic0)` pairs and decodes every log
    //! whose `topic0` matches one of them into an event with no arguments.
    //! Good enough to exercise fetch planning, queueing, and dispatch
    //! without pulling in a real Solidity ABI.

    use std::collections::HashMap;

    use alloy::dyn_abi::DynSolValue;
    use alloy::primitives::{B256, Bytes};

    use super::{AbiError, AbiRegistry, DecodedEvent, Log};

    /// One declared event: its name and topic-0 signature hash.
    #[derive(Debug, Clone)]
    pub struct MockEventDef {
        /// Event name, e.g. `"Transfer"`.
        pub name: String,
        /// keccak256 of the canonical event signature.
        pub topic0: B256,
    }

    /// A scripted ABI registry.
    ///
    /// Calls are not really ABI-encoded: `encode_call` just serializes the
    /// function name and arguments with `bincode`-free `Debug` formatting
    /// into bytes, and `decode_call_result` looks up a value scripted
    /// ahead of time by function name. Good enough to exercise the
    /// cache-through `readContract` path without a real Solidity ABI.
    #[derive(Debug, Default)]
    pub struct MockAbiRegistry {
        contracts: HashMap<String, Vec<MockEventDef>>,
        call_results: HashMap<String, Vec<DynSolValue>>,
    }

    impl MockAbiRegistry {
        /// Create an empty registry.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Register a contract and its declared events.
        #[must_use]
        pub fn with_contract(mut self, name: impl Into<String>, events: Vec<MockEventDef>) -> Self {
            self.contracts.insert(name.into(), events);
            self
        }

        /// Script the decoded return value for a function name.
        #[must_use]
        pub fn with_call_result(
            mut self,
            function_name: impl Into<String>,
            result: Vec<DynSolValue>,
        ) -> Self {
            self.call_results.insert(function_name.into(), result);
            self
        }
    }

    impl AbiRegistry for MockAbiRegistry {
        fn has_contract(&self, contract_name: &str) -> bool {
            self.contracts.contains_key(contract_name)
        }

        fn topic0_hashes(&self, contract_name: &str) -> Result<Vec<B256>, AbiError> {
            self.contracts
                .get(contract_name)
                .map(|defs| defs.iter().map(|d| d.topic0).collect())
                .ok_or_else(|| AbiError::UnknownContract(contract_name.to_string()))
        }

        fn decode_event(&self, contract_name: &str, log: &Log) -> Result<DecodedEvent, AbiError> {
            let defs = self
                .contracts
                .get(contract_name)
                .ok_or_else(|| AbiError::UnknownContract(contract_name.to_string()))?;
            let topic0 = log
                .topic0()
                .ok_or_else(|| AbiError::DecodeFailed("log has no topics".into()))?;
            defs.iter()
                .find(|d| d.topic0 == topic0)
                .map(|d| DecodedEvent {
                    event_name: d.name.clone(),
                    args: vec![],
                })
                .ok_or_else(|| {
                    AbiError::DecodeFailed(format!("no event on {contract_name} matches topic0"))
                })
        }

        fn encode_call(
            &self,
            contract_name: &str,
            function_name: &str,
            args: &[DynSolValue],
        ) -> Result<Bytes, AbiError> {
            if !self.contracts.contains_key(contract_name) {
                return Err(AbiError::UnknownContract(contract_name.to_string()));
            }
            Ok(Bytes::from(format!("{function_name}({args:?})").into_bytes()))
        }

        fn decode_call_result(
            &self,
            contract_name: &str,
            function_name: &str,
            _raw: &Bytes,
        ) -> Result<Vec<DynSolValue>, AbiError> {
            if !self.contracts.contains_key(contract_name) {
                return Err(AbiError::UnknownContract(contract_name.to_string()));
            }
            self.call_results
                .get(function_name)
                .cloned()
                .ok_or_else(|| AbiError::DecodeFailed(format!("no scripted result for {function_name}")))
        }
    }
}
