use solana_client::rpc_response::{Response, RpcLogsResponse};
use solana_sdk::signature::Signature;
use std::str::FromStr;

/// One `logsSubscribe` notification for the watched account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedEvent {
    pub signature: Signature,
    pub slot: u64,
    /// The transaction executed but returned an error.
    pub failed: bool,
    pub log_lines: Vec<String>,
}

impl ObservedEvent {
    pub fn new(signature: Signature, log_lines: Vec<String>) -> Self {
        Self {
            signature,
            slot: 0,
            failed: false,
            log_lines,
        }
    }

    /// Converts a raw pubsub message. Returns `None` when the node reports a
    /// signature that cannot be parsed.
    pub fn from_notification(msg: Response<RpcLogsResponse>) -> Option<Self> {
        let Response { context, value } = msg;
        match Signature::from_str(&value.signature) {
            Ok(signature) => Some(Self {
                signature,
                slot: context.slot,
                failed: value.err.is_some(),
                log_lines: value.logs,
            }),
            Err(e) => {
                tracing::warn!(
                    signature = %value.signature,
                    "Dropping log notification with unparsable signature: {}",
                    e
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn notification(signature: &str, err: Value) -> Response<RpcLogsResponse> {
        serde_json::from_value(json!({
            "context": { "slot": 42 },
            "value": {
                "signature": signature,
                "err": err,
                "logs": [
                    "Program 11111111111111111111111111111111 invoke [1]",
                    "Program 11111111111111111111111111111111 success",
                ],
            },
        }))
        .unwrap()
    }

    #[test]
    fn converts_a_successful_notification() {
        let signature = Signature::from([7u8; 64]);
        let event =
            ObservedEvent::from_notification(notification(&signature.to_string(), Value::Null))
                .unwrap();

        assert_eq!(event.signature, signature);
        assert_eq!(event.slot, 42);
        assert!(!event.failed);
        assert_eq!(event.log_lines.len(), 2);
    }

    #[test]
    fn marks_errored_transactions_as_failed() {
        let signature = Signature::from([7u8; 64]);
        let event = ObservedEvent::from_notification(notification(
            &signature.to_string(),
            json!("AccountInUse"),
        ))
        .unwrap();

        assert!(event.failed);
    }

    #[test]
    fn drops_unparsable_signatures() {
        assert!(ObservedEvent::from_notification(notification("not-a-signature", Value::Null))
            .is_none());
    }
}
