//! Scripted executor for adapter tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use chainlens_core::error::{DomainError, DomainResult, QueryResult};
use chainlens_core::models::PublicKey;
use chainlens_core::ports::{AddressCodec, BackendId, QueryDocument, QueryExecutor, QueryResponse};

/// A call seen by [`ScriptedExecutor`].
#[derive(Debug, Clone)]
pub struct Call {
    pub backend: BackendId,
    pub document: String,
    pub variables: Value,
}

/// Replays queued `data` payloads in order and records every call.
#[derive(Default)]
pub struct ScriptedExecutor {
    responses: Mutex<VecDeque<Value>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedExecutor {
    pub fn new(responses: impl IntoIterator<Item = Value>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            calls: Mutex::default(),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl QueryExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        backend: BackendId,
        document: &QueryDocument,
        variables: Value,
    ) -> QueryResult<QueryResponse> {
        self.calls.lock().unwrap().push(Call {
            backend,
            document: document.as_str().to_string(),
            variables,
        });
        let data = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted response left");
        Ok(QueryResponse::new(data))
    }
}

pub const ALICE: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";
pub const ALICE_HEX: &str = "0xd43593c715fdd31c61141abd04a99fd6822c8558854ccde39a5684e7a56da27d";

/// Knows only Alice; everything else is invalid.
pub struct AliceCodec;

impl AddressCodec for AliceCodec {
    fn decode_address(&self, address: &str) -> DomainResult<PublicKey> {
        if address == ALICE || address == ALICE_HEX {
            PublicKey::from_hex(ALICE_HEX).map_err(|e| DomainError::InvalidAddress(e.to_string()))
        } else {
            Err(DomainError::InvalidAddress(address.to_string()))
        }
    }
}
