//! Scripted RPC transport for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::RpcTransport;
use crate::error::ChainError;

pub(crate) enum Reply {
    Value(Value),
    RpcError { code: i64, message: String },
    NetworkError { reason: String },
}

/// Replies are queued per method and consumed in order; asking for a method
/// with no reply left panics, so tests fail loudly on unexpected calls.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
}

impl ScriptedTransport {
    pub(crate) fn push(&self, method: &str, value: Value) {
        self.queue(method, Reply::Value(value));
    }

    pub(crate) fn push_rpc_error(&self, method: &str, code: i64, message: &str) {
        self.queue(
            method,
            Reply::RpcError {
                code,
                message: message.to_string(),
            },
        );
    }

    pub(crate) fn push_network_error(&self, method: &str, reason: &str) {
        self.queue(
            method,
            Reply::NetworkError {
                reason: reason.to_string(),
            },
        );
    }

    /// Count of replies not yet consumed, across all methods.
    pub(crate) fn remaining(&self) -> usize {
        self.replies
            .lock()
            .unwrap()
            .values()
            .map(VecDeque::len)
            .sum()
    }

    fn queue(&self, method: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(reply);
    }
}

#[async_trait]
impl RpcTransport for ScriptedTransport {
    async fn request(&self, method: &str, _params: Value) -> Result<Value, ChainError> {
        let mut replies = self.replies.lock().unwrap();
        let reply = replies
            .get_mut(method)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| panic!("no scripted reply for {method}"));
        match reply {
            Reply::Value(value) => Ok(value),
            Reply::RpcError { code, message } => Err(ChainError::Rpc { code, message }),
            Reply::NetworkError { reason } => Err(ChainError::Network { reason }),
        }
    }
}
