use crate::jsonrpc::error::SignetError;
use crate::jsonrpc::request::Request;
use crate::jsonrpc::response::Response;
use awc::http::header;
use awc::Client;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

/// Responses larger than this are cut off rather than buffered, raise it
/// with `set_response_size_limit` when querying contracts with very large
/// return data.
const DEFAULT_RESPONSE_SIZE_LIMIT: usize = 16 * 1024 * 1024;

lazy_static! {
    static ref RESPONSE_SIZE_LIMIT: RwLock<usize> = RwLock::new(DEFAULT_RESPONSE_SIZE_LIMIT);
}

pub fn get_response_size_limit() -> usize {
    *RESPONSE_SIZE_LIMIT.read().unwrap()
}

pub fn set_response_size_limit(limit: usize) {
    *RESPONSE_SIZE_LIMIT.write().unwrap() = limit;
}

#[derive(Clone)]
pub struct HttpClient {
    id_counter: Arc<Mutex<u64>>,
    url: String,
    client: Client,
}

impl HttpClient {
    pub fn new(url: &str) -> Self {
        Self {
            id_counter: Arc::new(Mutex::new(0u64)),
            url: url.to_string(),
            client: Client::default(),
        }
    }

    fn next_id(&self) -> u64 {
        let mut counter = self.id_counter.lock().expect("id error");
        *counter += 1;
        *counter
    }

    pub async fn request_method<T, R>(
        &self,
        method: &str,
        params: T,
        timeout: Duration,
    ) -> Result<R, SignetError>
    where
        R: 'static,
        for<'de> R: Deserialize<'de>,
        T: Serialize,
        T: std::fmt::Debug,
        R: std::fmt::Debug,
    {
        trace!("Making request {} {:?}", method, params);
        let payload = Request::new(self.next_id(), method, params);
        let res = self
            .client
            .post(&self.url)
            .append_header((header::CONTENT_TYPE, "application/json"))
            .timeout(timeout)
            .send_json(&payload)
            .await;
        let mut res = match res {
            Ok(val) => val,
            Err(e) => return Err(SignetError::FailedToSend(e)),
        };

        trace!("response headers {:?}", res.headers());

        let size_limit = get_response_size_limit();
        let body_bytes = match res.body().limit(size_limit).await {
            Ok(val) => val,
            Err(e) => {
                return Err(SignetError::BadResponse(format!(
                    "Size limit {size_limit} exceeded or read failed: {e}"
                )))
            }
        };

        // parse as generic JSON first so a shape mismatch produces an error
        // message containing the offending document
        let json_value: serde_json::Value = match serde_json::from_slice(&body_bytes) {
            Ok(val) => val,
            Err(e) => {
                let body_str = String::from_utf8_lossy(&body_bytes);
                return Err(SignetError::BadResponse(format!(
                    "Failed to parse response as JSON: {e}\nRaw response: {body_str}"
                )));
            }
        };

        let decoded: Response<R> = match serde_json::from_value(json_value.clone()) {
            Ok(val) => val,
            Err(e) => {
                return Err(SignetError::BadResponse(format!(
                    "Failed to deserialize response into expected type: {e}\nJSON response: {json_value}"
                )))
            }
        };
        trace!("got jsonrpc response {:#?}", decoded);
        match decoded.data.into_result() {
            Ok(r) => Ok(r),
            Err(e) => Err(SignetError::JsonRpcError {
                code: e.code,
                message: e.message,
                data: format!("{:?}", e.data),
            }),
        }
    }
}

#[test]
fn response_size_limit_is_adjustable() {
    assert_eq!(get_response_size_limit(), DEFAULT_RESPONSE_SIZE_LIMIT);
    set_response_size_limit(1024);
    assert_eq!(get_response_size_limit(), 1024);
    set_response_size_limit(DEFAULT_RESPONSE_SIZE_LIMIT);
}
