use tonic::codec::CompressionEncoding;
use tonic::transport::Endpoint;
use tonic::{Code, Streaming};
use tracing::debug;

use crate::proto::kvs::kvs_client::KvsClient;
use crate::proto::kvs::{DeleteRequest, Entry, GetRequest, PutRequest, RangeRequest, WatchRequest};

use super::{ClientApiError, ClientConfig};

/// Key/value store client.
///
/// # Example
///
/// ```ignore
/// let mut client = KvClient::connect("http://127.0.0.1:50051", ClientConfig::default()).await?;
/// client.put("greeting", "hello").await?;
/// assert_eq!(client.get("greeting").await?, Some("hello".to_string()));
/// ```
#[derive(Debug, Clone)]
pub struct KvClient {
    inner: KvsClient<tonic::transport::Channel>,
}

impl KvClient {
    /// Connect to a server endpoint such as `http://127.0.0.1:50051`.
    pub async fn connect(
        endpoint: impl Into<String>,
        config: ClientConfig,
    ) -> std::result::Result<Self, ClientApiError> {
        let endpoint = endpoint.into();
        let endpoint = Endpoint::from_shared(endpoint.clone())
            .map_err(|e| ClientApiError::InvalidEndpoint(format!("{endpoint}: {e}")))?
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout);

        let channel = endpoint.connect().await?;
        let inner = KvsClient::new(channel)
            .accept_compressed(CompressionEncoding::Gzip)
            .send_compressed(CompressionEncoding::Gzip);

        Ok(Self { inner })
    }

    /// Look up a key. `Ok(None)` when the key does not exist.
    pub async fn get(
        &mut self,
        key: impl Into<String>,
    ) -> std::result::Result<Option<String>, ClientApiError> {
        let request = GetRequest { key: key.into() };
        match self.inner.get(request).await {
            Ok(response) => Ok(Some(response.into_inner().value)),
            Err(status) if status.code() == Code::NotFound => Ok(None),
            Err(status) => Err(status.into()),
        }
    }

    /// Store a value under a key, overwriting any previous value.
    pub async fn put(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> std::result::Result<(), ClientApiError> {
        let request = PutRequest {
            key: key.into(),
            value: value.into(),
        };
        self.inner.put(request).await?;
        Ok(())
    }

    /// Delete a key. Succeeds whether or not the key existed.
    pub async fn delete(
        &mut self,
        key: impl Into<String>,
    ) -> std::result::Result<(), ClientApiError> {
        let request = DeleteRequest { key: key.into() };
        self.inner.delete(request).await?;
        Ok(())
    }

    /// Collect the server's snapshot of entries with key >= `start_key`,
    /// in ascending key order.
    pub async fn range(
        &mut self,
        start_key: impl Into<String>,
    ) -> std::result::Result<Vec<(String, String)>, ClientApiError> {
        let request = RangeRequest {
            start_key: start_key.into(),
        };
        let mut stream = self.inner.range(request).await?.into_inner();

        let mut entries = Vec::new();
        while let Some(entry) = stream.message().await? {
            entries.push((entry.key, entry.value.unwrap_or_default()));
        }
        debug!(entries = entries.len(), "range scan complete");
        Ok(entries)
    }

    /// Open a change-event stream for keys starting with `prefix` (empty
    /// watches everything).
    ///
    /// Entries with `value: None` are deletes. The stream yields events in
    /// commit order until the call is dropped or the server disconnects
    /// this watcher.
    pub async fn watch(
        &mut self,
        prefix: impl Into<String>,
    ) -> std::result::Result<Streaming<Entry>, ClientApiError> {
        let request = WatchRequest {
            prefix: prefix.into(),
        };
        Ok(self.inner.watch(request).await?.into_inner())
    }
}
