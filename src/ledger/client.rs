use failsafe::futures::CircuitBreaker;
use failsafe::{backoff, failure_policy, Config, Error as FailsafeError, StateMachine};
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use super::{
    drops_to_xrp, validate_address, validate_seed, xrp_to_drops, LedgerError, LedgerGateway,
    LedgerPayment, TransactionProof, TransferOutcome,
};
use crate::secrets::SigningSecret;
use async_trait::async_trait;

/// XRPL Testnet JSON-RPC endpoint.
pub const TESTNET_URL: &str = "https://s.altnet.rippletest.net:51234";

/// XRPL Mainnet JSON-RPC endpoint.
pub const MAINNET_URL: &str = "https://s1.ripple.com:51234";

const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// JSON-RPC client for the XRP Ledger.
///
/// Read paths (balance, history) run behind a circuit breaker; submission
/// does not, because retry policy for transfers belongs to the
/// coordinator, never to the transport.
pub struct XrplClient {
    client: Client,
    base_url: String,
    circuit_breaker: StateMachine<failure_policy::ConsecutiveFailures<backoff::Exponential>, ()>,
}

impl XrplClient {
    pub fn new(base_url: String) -> Self {
        Self::with_circuit_breaker_config(base_url, 5, Duration::from_secs(60))
    }

    pub fn with_circuit_breaker_config(
        base_url: String,
        failure_threshold: u32,
        reset_timeout: Duration,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        let backoff = backoff::exponential(Duration::from_secs(10), reset_timeout);
        let policy = failure_policy::consecutive_failures(failure_threshold, backoff);
        let circuit_breaker = Config::new().failure_policy(policy).build();

        XrplClient {
            client,
            base_url,
            circuit_breaker,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Testnet explorer link for a transaction, surfaced to operators.
    pub fn explorer_url(&self, tx_hash: &str) -> String {
        format!("https://testnet.xrpl.org/transactions/{}", tx_hash)
    }

    async fn rpc(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        rpc_once(&self.client, &self.base_url, method, params).await
    }

    /// Read-only RPC guarded by the circuit breaker.
    async fn guarded_rpc(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        let client = self.client.clone();
        let base_url = self.base_url.clone();
        let method = method.to_string();

        let result = self
            .circuit_breaker
            .call(async move { rpc_once(&client, &base_url, &method, params).await })
            .await;

        match result {
            Ok(value) => Ok(value),
            Err(FailsafeError::Rejected) => Err(LedgerError::CircuitBreakerOpen),
            Err(FailsafeError::Inner(e)) => Err(e),
        }
    }

    /// XRP balance of an account on the validated ledger.
    pub async fn get_balance(&self, address: &str) -> Result<Decimal, LedgerError> {
        if !validate_address(address) {
            return Err(LedgerError::InvalidAddress(address.to_string()));
        }
        let result = self
            .guarded_rpc(
                "account_info",
                json!({ "account": address, "ledger_index": "validated" }),
            )
            .await?;

        if result.get("error").and_then(Value::as_str) == Some("actNotFound") {
            return Err(LedgerError::NotFound(address.to_string()));
        }

        let drops: u64 = result
            .pointer("/account_data/Balance")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| {
                LedgerError::InvalidResponse("account_info missing Balance".to_string())
            })?;
        Ok(drops_to_xrp(drops))
    }

    /// Polls `tx` until the transaction validates or the deadline passes.
    /// Poll failures are swallowed: once submitted, the outcome stays
    /// unknown until the deadline, never assumed failed.
    async fn await_validation(
        &self,
        tx_hash: &str,
        deadline: Instant,
        timeout: Duration,
    ) -> Result<TransferOutcome, LedgerError> {
        loop {
            if Instant::now() >= deadline {
                warn!(tx_hash, "validation wait expired; outcome unknown");
                return Err(LedgerError::Timeout(timeout));
            }

            match self.rpc("tx", json!({ "transaction": tx_hash, "binary": false })).await {
                Ok(result) => {
                    if result.get("error").and_then(Value::as_str) == Some("txnNotFound") {
                        debug!(tx_hash, "transaction not yet in a ledger");
                    } else if result.get("validated").and_then(Value::as_bool) == Some(true) {
                        let result_code = result
                            .pointer("/meta/TransactionResult")
                            .and_then(Value::as_str)
                            .ok_or_else(|| {
                                LedgerError::InvalidResponse(
                                    "validated tx missing TransactionResult".to_string(),
                                )
                            })?
                            .to_string();
                        let ledger_index = result.get("ledger_index").and_then(Value::as_u64);

                        if result_code == "tesSUCCESS" {
                            return Ok(TransferOutcome {
                                tx_hash: tx_hash.to_string(),
                                validated: true,
                                result_code,
                                ledger_index,
                            });
                        }
                        return Err(LedgerError::TransferRejected(result_code));
                    }
                }
                Err(e) => debug!(tx_hash, error = %e, "poll failed, retrying until deadline"),
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            sleep(POLL_INTERVAL.min(remaining)).await;
        }
    }
}

/// Single JSON-RPC round trip. A transport failure here means the request
/// was never accepted, so it maps to `LedgerUnreachable`.
async fn rpc_once(
    client: &Client,
    base_url: &str,
    method: &str,
    params: Value,
) -> Result<Value, LedgerError> {
    let body = json!({ "method": method, "params": [params] });
    let response = client
        .post(base_url)
        .json(&body)
        .send()
        .await
        .map_err(|e| LedgerError::LedgerUnreachable(e.to_string()))?;

    if !response.status().is_success() {
        return Err(LedgerError::LedgerUnreachable(format!(
            "HTTP {} from ledger RPC",
            response.status()
        )));
    }

    let envelope: Value = response
        .json()
        .await
        .map_err(|e| LedgerError::InvalidResponse(e.to_string()))?;
    envelope
        .get("result")
        .cloned()
        .ok_or_else(|| LedgerError::InvalidResponse("missing result envelope".to_string()))
}

#[async_trait]
impl LedgerGateway for XrplClient {
    fn derive_identity(&self, secret: &SigningSecret) -> Result<String, LedgerError> {
        derive_address(secret)
    }

    async fn submit_transfer(
        &self,
        secret: &SigningSecret,
        destination: &str,
        amount_xrp: Decimal,
        memo: &str,
        timeout: Duration,
    ) -> Result<TransferOutcome, LedgerError> {
        if !validate_address(destination) {
            return Err(LedgerError::InvalidAddress(destination.to_string()));
        }
        let account = derive_address(secret)?;
        let drops = xrp_to_drops(amount_xrp)?;

        let mut tx_json = json!({
            "TransactionType": "Payment",
            "Account": account,
            "Destination": destination,
            "Amount": drops.to_string(),
        });
        if !memo.is_empty() {
            tx_json["Memos"] = json!([
                { "Memo": { "MemoData": hex::encode_upper(memo.as_bytes()) } }
            ]);
        }

        let deadline = Instant::now() + timeout;
        // Sign-and-submit mode: the seed travels only inside this request.
        let result = self
            .rpc(
                "submit",
                json!({ "secret": secret.expose(), "tx_json": tx_json }),
            )
            .await?;

        let engine_result = result
            .get("engine_result")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                LedgerError::InvalidResponse("submit missing engine_result".to_string())
            })?;

        // tes = applied, ter = queued for a later ledger; everything else
        // (tem/tef/tec) is a definitive rejection at submission.
        if engine_result != "tesSUCCESS" && !engine_result.starts_with("ter") {
            return Err(LedgerError::TransferRejected(engine_result.to_string()));
        }

        let tx_hash = result
            .pointer("/tx_json/hash")
            .and_then(Value::as_str)
            .ok_or_else(|| LedgerError::InvalidResponse("submit missing tx hash".to_string()))?
            .to_string();

        debug!(tx_hash, engine_result, "transfer submitted, awaiting validation");
        self.await_validation(&tx_hash, deadline, timeout).await
    }

    async fn verify_transaction(&self, tx_hash: &str) -> Result<TransactionProof, LedgerError> {
        let result = self
            .rpc("tx", json!({ "transaction": tx_hash, "binary": false }))
            .await?;

        if result.get("error").and_then(Value::as_str) == Some("txnNotFound") {
            return Err(LedgerError::NotFound(tx_hash.to_string()));
        }

        Ok(TransactionProof {
            validated: result
                .get("validated")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            result_code: result
                .pointer("/meta/TransactionResult")
                .and_then(Value::as_str)
                .map(str::to_string),
            ledger_index: result.get("ledger_index").and_then(Value::as_u64),
        })
    }

    async fn account_transactions(
        &self,
        address: &str,
    ) -> Result<Vec<LedgerPayment>, LedgerError> {
        if !validate_address(address) {
            return Err(LedgerError::InvalidAddress(address.to_string()));
        }
        let result = self
            .guarded_rpc(
                "account_tx",
                json!({ "account": address, "binary": false, "limit": 100 }),
            )
            .await?;

        let entries = result
            .get("transactions")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                LedgerError::InvalidResponse("account_tx missing transactions".to_string())
            })?;

        Ok(entries
            .iter()
            .filter_map(|entry| {
                let tx = entry.get("tx")?;
                Some(LedgerPayment {
                    tx_hash: tx.get("hash")?.as_str()?.to_string(),
                    destination: tx
                        .get("Destination")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    memo: decode_first_memo(tx),
                    validated: entry
                        .get("validated")
                        .and_then(Value::as_bool)
                        .unwrap_or(false),
                })
            })
            .collect())
    }
}

/// Deterministic address derivation: the seed material is hashed into an
/// ed25519 signing key, and the address is rendered from the hashed
/// verifying key. Full base58check custody derivation is out of scope.
fn derive_address(secret: &SigningSecret) -> Result<String, LedgerError> {
    let seed = secret.expose();
    if !validate_seed(seed) {
        return Err(LedgerError::InvalidSecret);
    }
    let key_bytes: [u8; 32] = Sha256::digest(seed.as_bytes()).into();
    let signing_key = ed25519_dalek::SigningKey::from_bytes(&key_bytes);
    let address_digest = Sha256::digest(signing_key.verifying_key().as_bytes());
    Ok(format!("r{}", hex::encode(&address_digest[..16])))
}

fn decode_first_memo(tx: &Value) -> Option<String> {
    let data = tx.pointer("/Memos/0/Memo/MemoData")?.as_str()?;
    let bytes = hex::decode(data).ok()?;
    String::from_utf8(bytes).ok()
}

impl Clone for XrplClient {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            circuit_breaker: self.circuit_breaker.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::str::FromStr;

    fn secret() -> SigningSecret {
        SigningSecret::new("sEdTM1uX8pu2do5XvTnutH6HsouMaM2")
    }

    const DESTINATION: &str = "rN7n7otQDd6FczFgLdlqtyMVrn3e5PcjXd";
    const TX_HASH: &str = "E08D6E9754025BA2534A78707605E0601F03ACE063687A0CA1BDDACFCD1698C7";

    #[test]
    fn test_derive_identity_deterministic() {
        let client = XrplClient::new(TESTNET_URL.to_string());
        let a = client.derive_identity(&secret()).unwrap();
        let b = client.derive_identity(&secret()).unwrap();
        assert_eq!(a, b);
        assert!(validate_address(&a));
    }

    #[test]
    fn test_derive_identity_rejects_malformed_seed() {
        let client = XrplClient::new(TESTNET_URL.to_string());
        let err = client
            .derive_identity(&SigningSecret::new("not-a-seed"))
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidSecret));
    }

    #[tokio::test]
    async fn test_submit_transfer_validated() {
        let mut server = mockito::Server::new_async().await;

        let _submit = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(serde_json::json!({"method": "submit"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "result": {
                        "engine_result": "tesSUCCESS",
                        "tx_json": { "hash": TX_HASH }
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let _tx = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(serde_json::json!({"method": "tx"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "result": {
                        "validated": true,
                        "ledger_index": 81_076_412,
                        "meta": { "TransactionResult": "tesSUCCESS" }
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = XrplClient::new(server.url());
        let outcome = client
            .submit_transfer(
                &secret(),
                DESTINATION,
                Decimal::from_str("25").unwrap(),
                "Coffee settlement test",
                Duration::from_secs(5),
            )
            .await
            .unwrap();

        assert!(outcome.validated);
        assert_eq!(outcome.tx_hash, TX_HASH);
        assert_eq!(outcome.result_code, "tesSUCCESS");
        assert_eq!(outcome.ledger_index, Some(81_076_412));
    }

    #[tokio::test]
    async fn test_submit_transfer_rejected_at_submission() {
        let mut server = mockito::Server::new_async().await;

        let _submit = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(serde_json::json!({"method": "submit"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "result": {
                        "engine_result": "tecUNFUNDED_PAYMENT",
                        "tx_json": { "hash": TX_HASH }
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = XrplClient::new(server.url());
        let err = client
            .submit_transfer(
                &secret(),
                DESTINATION,
                Decimal::from_str("25").unwrap(),
                "",
                Duration::from_secs(5),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LedgerError::TransferRejected(code) if code == "tecUNFUNDED_PAYMENT"
        ));
    }

    #[tokio::test]
    async fn test_submit_transfer_times_out_while_unvalidated() {
        let mut server = mockito::Server::new_async().await;

        let _submit = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(serde_json::json!({"method": "submit"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "result": {
                        "engine_result": "tesSUCCESS",
                        "tx_json": { "hash": TX_HASH }
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let _tx = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(serde_json::json!({"method": "tx"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(serde_json::json!({ "result": { "validated": false } }).to_string())
            .expect_at_least(1)
            .create_async()
            .await;

        let client = XrplClient::new(server.url());
        let err = client
            .submit_transfer(
                &secret(),
                DESTINATION,
                Decimal::from_str("25").unwrap(),
                "",
                Duration::from_millis(50),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_submit_transfer_unreachable() {
        // Nothing listens here; the request is never accepted.
        let client = XrplClient::new("http://127.0.0.1:1".to_string());
        let err = client
            .submit_transfer(
                &secret(),
                DESTINATION,
                Decimal::from_str("25").unwrap(),
                "",
                Duration::from_secs(1),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::LedgerUnreachable(_)));
    }

    #[tokio::test]
    async fn test_submit_rejects_invalid_destination() {
        let client = XrplClient::new(TESTNET_URL.to_string());
        let err = client
            .submit_transfer(
                &secret(),
                "not-an-address",
                Decimal::from_str("25").unwrap(),
                "",
                Duration::from_secs(1),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAddress(_)));
    }

    #[tokio::test]
    async fn test_verify_transaction_not_found() {
        let mut server = mockito::Server::new_async().await;

        let _tx = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(serde_json::json!({"method": "tx"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(serde_json::json!({ "result": { "error": "txnNotFound" } }).to_string())
            .create_async()
            .await;

        let client = XrplClient::new(server.url());
        let err = client.verify_transaction(TX_HASH).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_account_transactions_decodes_memo() {
        let mut server = mockito::Server::new_async().await;

        let memo_hex = hex::encode_upper("Coffee settlement 4bd68c2f".as_bytes());
        let _account_tx = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(
                serde_json::json!({"method": "account_tx"}),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "result": {
                        "transactions": [
                            {
                                "validated": true,
                                "tx": {
                                    "hash": TX_HASH,
                                    "Destination": DESTINATION,
                                    "Memos": [
                                        { "Memo": { "MemoData": memo_hex } }
                                    ]
                                }
                            }
                        ]
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = XrplClient::new(server.url());
        let payments = client.account_transactions(DESTINATION).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].tx_hash, TX_HASH);
        assert_eq!(
            payments[0].memo.as_deref(),
            Some("Coffee settlement 4bd68c2f")
        );
        assert!(payments[0].validated);
    }

    #[tokio::test]
    async fn test_get_balance() {
        let mut server = mockito::Server::new_async().await;

        let _account_info = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(
                serde_json::json!({"method": "account_info"}),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "result": { "account_data": { "Balance": "28571429" } }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = XrplClient::new(server.url());
        let balance = client.get_balance(DESTINATION).await.unwrap();
        assert_eq!(balance, Decimal::from_str("28.571429").unwrap());
    }
}
