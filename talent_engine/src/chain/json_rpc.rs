use std::time::Duration;

use log::*;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::{
    chain::{ChainReader, ChainReaderError, ChainTransfer},
    db_types::{TxRef, Wei},
};

const RECEIPT_SUCCESS: &str = "0x1";

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'static str,
    params: [&'a str; 1],
    id: u64,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcTransaction {
    #[serde(default)]
    to: Option<String>,
    value: String,
}

#[derive(Debug, Deserialize)]
struct RpcReceipt {
    #[serde(default)]
    status: Option<String>,
}

/// A [`ChainReader`] for Ethereum-compatible JSON-RPC 2.0 endpoints.
#[derive(Debug, Clone)]
pub struct JsonRpcChainReader {
    client: reqwest::Client,
}

impl JsonRpcChainReader {
    /// Creates a reader whose HTTP calls are each bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, ChainReaderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChainReaderError::RpcUnavailable(format!("Could not build HTTP client. {e}")))?;
        Ok(Self { client })
    }

    /// Calls `method` with the transaction hash as its only parameter and returns the `result` field, which is `None`
    /// when the node reports `null`.
    async fn call<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        method: &'static str,
        tx_ref: &TxRef,
    ) -> Result<Option<T>, ChainReaderError> {
        let request = RpcRequest { jsonrpc: "2.0", method, params: [tx_ref.as_str()], id: 1 };
        trace!("🔗️ {method}({tx_ref})");
        let response = self.client.post(endpoint).json(&request).send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ChainReaderError::RpcUnavailable(format!("{method} returned HTTP {status}")));
        }
        let body = response.json::<RpcResponse>().await.map_err(map_reqwest_error)?;
        if let Some(err) = body.error {
            warn!("🔗️ {method}({tx_ref}) failed with RPC error {}: {}", err.code, err.message);
            return Err(ChainReaderError::RpcError { code: err.code, message: err.message });
        }
        match body.result {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| ChainReaderError::MalformedResponse(format!("{method}: {e}"))),
        }
    }
}

impl ChainReader for JsonRpcChainReader {
    async fn fetch_transfer(&self, rpc_endpoint: &str, tx_ref: &TxRef) -> Result<ChainTransfer, ChainReaderError> {
        let tx = self
            .call::<RpcTransaction>(rpc_endpoint, "eth_getTransactionByHash", tx_ref)
            .await?
            .ok_or_else(|| ChainReaderError::TransactionNotFound(tx_ref.clone()))?;
        let amount = Wei::from_hex_quantity(&tx.value)
            .map_err(|e| ChainReaderError::MalformedResponse(format!("transaction value: {e}")))?;
        let receipt = self.call::<RpcReceipt>(rpc_endpoint, "eth_getTransactionReceipt", tx_ref).await?;
        // A missing receipt means the transaction is still pending.
        let confirmed = receipt.and_then(|r| r.status).map(|s| s.eq_ignore_ascii_case(RECEIPT_SUCCESS)).unwrap_or(false);
        debug!("🔗️ Transaction {tx_ref}: {amount} to {:?}. Confirmed: {confirmed}", tx.to);
        Ok(ChainTransfer { tx_ref: tx_ref.clone(), recipient: tx.to, amount, confirmed })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ChainReaderError {
    if err.is_timeout() {
        return ChainReaderError::Timeout;
    }
    if err.is_decode() || err.is_body() {
        return ChainReaderError::MalformedResponse(err.to_string());
    }
    ChainReaderError::RpcUnavailable(err.to_string())
}

#[cfg(test)]
mod test {
    use std::str::FromStr;

    use serde_json::json;
    use wiremock::{
        matchers::{body_partial_json, method, path},
        Mock,
        MockServer,
        ResponseTemplate,
    };

    use super::*;

    const HASH: &str = "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060";
    const ADMIN: &str = "0x9f3ac5e4b1f1aa8e5e8e0c2a2b4cbbc1e5e13b8f";

    fn tx_ref() -> TxRef {
        TxRef::from_str(HASH).unwrap()
    }

    async fn mount(server: &MockServer, rpc_method: &str, response: Value) {
        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_partial_json(json!({ "method": rpc_method, "params": [HASH] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(response))
            .expect(1)
            .mount(server)
            .await;
    }

    fn reader() -> JsonRpcChainReader {
        JsonRpcChainReader::new(Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn confirmed_transfer() {
        let server = MockServer::start().await;
        let tx = json!({"jsonrpc": "2.0", "id": 1, "result": {"hash": HASH, "to": ADMIN, "value": "0x16345785d8a0000"}});
        mount(&server, "eth_getTransactionByHash", tx).await;
        mount(&server, "eth_getTransactionReceipt", json!({"jsonrpc": "2.0", "id": 1, "result": {"status": "0x1"}}))
            .await;
        let transfer = reader().fetch_transfer(&server.uri(), &tx_ref()).await.unwrap();
        assert_eq!(transfer.recipient.as_deref(), Some(ADMIN));
        assert_eq!(transfer.amount, Wei::from_ether_str("0.1").unwrap());
        assert!(transfer.confirmed);
    }

    #[tokio::test]
    async fn failed_or_pending_receipts_are_unconfirmed() {
        for receipt in [json!({"status": "0x0"}), Value::Null] {
            let server = MockServer::start().await;
            let tx = json!({"jsonrpc": "2.0", "id": 1, "result": {"to": ADMIN, "value": "0x1"}});
            mount(&server, "eth_getTransactionByHash", tx).await;
            mount(&server, "eth_getTransactionReceipt", json!({"jsonrpc": "2.0", "id": 1, "result": receipt})).await;
            let transfer = reader().fetch_transfer(&server.uri(), &tx_ref()).await.unwrap();
            assert!(!transfer.confirmed);
        }
    }

    #[tokio::test]
    async fn unknown_transaction() {
        let server = MockServer::start().await;
        mount(&server, "eth_getTransactionByHash", json!({"jsonrpc": "2.0", "id": 1, "result": null})).await;
        let err = reader().fetch_transfer(&server.uri(), &tx_ref()).await.unwrap_err();
        assert!(matches!(err, ChainReaderError::TransactionNotFound(_)));
    }

    #[tokio::test]
    async fn rpc_error_objects_fail_hard() {
        let server = MockServer::start().await;
        let body = json!({"jsonrpc": "2.0", "id": 1, "error": {"code": -32602, "message": "invalid argument"}});
        mount(&server, "eth_getTransactionByHash", body).await;
        let err = reader().fetch_transfer(&server.uri(), &tx_ref()).await.unwrap_err();
        assert!(matches!(err, ChainReaderError::RpcError { code: -32602, .. }));
        assert_eq!(err.kind(), crate::errors::ErrorKind::UpstreamUnavailable);
    }

    #[tokio::test]
    async fn malformed_value() {
        let server = MockServer::start().await;
        let tx = json!({"jsonrpc": "2.0", "id": 1, "result": {"to": ADMIN, "value": "one hundred"}});
        mount(&server, "eth_getTransactionByHash", tx).await;
        let err = reader().fetch_transfer(&server.uri(), &tx_ref()).await.unwrap_err();
        assert!(matches!(err, ChainReaderError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn http_failure_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).respond_with(ResponseTemplate::new(503)).mount(&server).await;
        let err = reader().fetch_transfer(&server.uri(), &tx_ref()).await.unwrap_err();
        assert!(matches!(err, ChainReaderError::RpcUnavailable(_)));
    }
}
