//! Ethereum JSON-RPC client for fetching blocks with full transaction objects, with retry logic.

use std::time::Duration;

use alloy_primitives::{B256, U64};
use base64::{engine::general_purpose, Engine as _};
use eth_tx_proof::{BlockWithTransactions, RawTransaction};
use jsonrpsee::core::client::ClientT;
use jsonrpsee::core::params::ArrayParams;
use jsonrpsee::http_client::{HeaderMap, HeaderValue, HttpClient};
use jsonrpsee::rpc_params;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info};

/// Error types for Ethereum RPC client operations
#[derive(Error, Debug)]
pub enum EthClientError {
    /// RPC client errors
    #[error("RPC client error: {0}")]
    RpcClient(#[from] jsonrpsee::core::client::Error),
    /// Invalid HTTP header value
    #[error("Invalid HTTP header value")]
    InvalidHeader,
    /// The node does not know the block
    #[error("Block {0} not found")]
    BlockNotFound(u64),
    /// The node does not know the transaction
    #[error("Transaction {0} not found")]
    TransactionNotFound(B256),
    /// The transaction is not mined yet
    #[error("Transaction {0} is still pending")]
    PendingTransaction(B256),
}

/// Default HTTP request timeout
pub const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Default interval between chain head polls
pub const BLOCK_NUMBER_UPDATE_INTERVAL: Duration = Duration::from_secs(12);

/// Ethereum JSON-RPC client
pub struct EthClient {
    client: HttpClient,
    backoff: backoff::ExponentialBackoff,
}

impl EthClient {
    /// Create a new Ethereum RPC client with default retry settings (exponential backoff)
    pub fn new(url: String, userpwd: Option<String>) -> Result<Self, EthClientError> {
        let mut headers = HeaderMap::new();
        if let Some(userpwd) = userpwd {
            let creds = general_purpose::STANDARD.encode(userpwd);
            headers.insert(
                "Authorization",
                HeaderValue::from_str(&format!("Basic {creds}"))
                    .map_err(|_| EthClientError::InvalidHeader)?,
            );
        };

        let client = HttpClient::builder()
            .set_headers(headers)
            .request_timeout(HTTP_REQUEST_TIMEOUT)
            .build(url)?;

        Ok(Self {
            client,
            backoff: backoff::ExponentialBackoff::default(),
        })
    }

    /// Replace the retry policy
    pub fn with_backoff(mut self, backoff: backoff::ExponentialBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: ArrayParams,
    ) -> Result<T, EthClientError> {
        request_with_retry(self.backoff.clone(), || async {
            self.client
                .request(method, params.clone())
                .await
                .map_err(Into::into)
        })
        .await
    }

    /// Get the chain id the node is serving
    pub async fn get_chain_id(&self) -> Result<u64, EthClientError> {
        let result: U64 = self.request("eth_chainId", rpc_params![]).await?;
        Ok(result.to::<u64>())
    }

    /// Get current chain height
    pub async fn get_block_number(&self) -> Result<u64, EthClientError> {
        let result: U64 = self.request("eth_blockNumber", rpc_params![]).await?;
        Ok(result.to::<u64>())
    }

    /// Get block by number with full transaction objects
    pub async fn get_block_with_transactions(
        &self,
        number: u64,
    ) -> Result<BlockWithTransactions, EthClientError> {
        let block: Option<BlockWithTransactions> = self
            .request("eth_getBlockByNumber", rpc_params![format!("{number:#x}"), true])
            .await?;
        let block = block.ok_or(EthClientError::BlockNotFound(number))?;
        debug!(
            "Fetched block {} with {} transactions",
            number,
            block.transactions.len()
        );
        Ok(block)
    }

    /// Get a mined transaction by hash
    pub async fn get_transaction_by_hash(
        &self,
        hash: &B256,
    ) -> Result<RawTransaction, EthClientError> {
        let tx: Option<RawTransaction> = self
            .request("eth_getTransactionByHash", rpc_params![hash.to_string()])
            .await?;
        let tx = tx.ok_or(EthClientError::TransactionNotFound(*hash))?;
        if tx.block_number.is_none() || tx.transaction_index.is_none() {
            return Err(EthClientError::PendingTransaction(*hash));
        }
        Ok(tx)
    }

    /// Wait until the block at `number` has `confirmations` blocks built on top of it
    pub async fn wait_for_block(
        &self,
        number: u64,
        confirmations: u64,
    ) -> Result<(), EthClientError> {
        loop {
            let head = self.get_block_number().await?;
            if head.saturating_sub(confirmations) >= number {
                debug!("Chain head {} confirms block {}", head, number);
                return Ok(());
            }
            info!(
                "Waiting for block {} ({} confirmations), chain head is {}",
                number, confirmations, head
            );
            tokio::time::sleep(BLOCK_NUMBER_UPDATE_INTERVAL).await;
        }
    }
}

/// Execute a request with retry logic using exponential backoff
/// Only retries on unexpected HTTP errors (not 200 OK or 400 Bad Request)
async fn request_with_retry<F, Fut, T>(
    backoff: backoff::ExponentialBackoff,
    operation: F,
) -> Result<T, EthClientError>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, EthClientError>>,
{
    use backoff::{future::retry_notify, Error};

    retry_notify(
        backoff,
        || async {
            match operation().await {
                Ok(result) => Ok(result),
                Err(err) if is_retryable_error(&err) => Err(Error::transient(err)),
                Err(err) => Err(Error::permanent(err)),
            }
        },
        |err, duration| {
            info!("Request failed, retrying in {:?}: {}", duration, err);
        },
    )
    .await
}

/// Only transport-level failures are retried; JSON-RPC errors and missing data are final
fn is_retryable_error(err: &EthClientError) -> bool {
    match err {
        EthClientError::RpcClient(rpc_err) => {
            use jsonrpsee::core::client::Error as RpcError;
            matches!(
                rpc_err,
                RpcError::Transport(_)
                    | RpcError::RequestTimeout
                    | RpcError::RestartNeeded(_)
                    | RpcError::ServiceDisconnect
            )
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_data_is_not_retried() {
        assert!(!is_retryable_error(&EthClientError::BlockNotFound(1)));
        assert!(!is_retryable_error(&EthClientError::PendingTransaction(B256::ZERO)));
        assert!(is_retryable_error(&EthClientError::RpcClient(
            jsonrpsee::core::client::Error::RequestTimeout
        )));
    }

    #[test]
    fn test_invalid_url() {
        assert!(EthClient::new("not a url".to_string(), None).is_err());
    }
}
