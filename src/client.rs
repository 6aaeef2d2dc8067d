use reqwest::{Method, Url};
use serde_json::Value;

use crate::query::{self, GetOptions, ReadPlan};
use crate::response;
use crate::{ClientConfig, ClientError};

/// Async WAPI client.
///
/// This is the async counterpart of [`crate::BlockingWapiClient`]. Clones share
/// one connection pool.
#[derive(Clone, Debug)]
pub struct WapiClient {
    base_url: Url,
    config: ClientConfig,
    http: reqwest::Client,
}

impl WapiClient {
    /// Creates a client for the grid described by `config`.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let base_url = config.base_url()?;
        let mut builder =
            reqwest::Client::builder().danger_accept_invalid_certs(!config.tls_verify());
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            base_url,
            config,
            http: builder.build()?,
        })
    }

    /// Returns `https://<host>/wapi/v<version>/`.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn tls_verify(&self) -> bool {
        self.config.tls_verify()
    }

    /// Reads objects of a type, or one object by reference, with paging enabled.
    ///
    /// `filters` are WAPI search arguments such as `("name~", "web")`.
    pub async fn get(
        &self,
        object: &str,
        filters: &[(&str, &str)],
        return_fields: &[&str],
    ) -> Result<Vec<Value>, ClientError> {
        let options = GetOptions::default().with_return_fields(return_fields.iter().copied());
        self.get_with_options(object, filters, &options).await
    }

    /// Reads objects with explicit paging and result-size options.
    pub async fn get_with_options(
        &self,
        object: &str,
        filters: &[(&str, &str)],
        options: &GetOptions,
    ) -> Result<Vec<Value>, ClientError> {
        let plan = ReadPlan::new(filters, options)?;
        let first = self.send(Method::GET, object, plan.query(), None).await?;

        let Some(mut pages) = plan.into_pages() else {
            return Ok(response::into_object_list(first));
        };

        let mut next = pages.absorb(first)?;
        while let Some(page_id) = next {
            let page = self
                .send(Method::GET, object, &query::page_query(&page_id), None)
                .await?;
            next = pages.absorb(page)?;
        }
        pages.finish()
    }

    /// Creates an object and returns its reference.
    pub async fn create(&self, object_type: &str, payload: Value) -> Result<String, ClientError> {
        response::into_reference(self.send(Method::POST, object_type, &[], Some(payload)).await?)
    }

    /// Creates an object and returns the fields WAPI sends back for it.
    pub async fn create_with_return_fields(
        &self,
        object_type: &str,
        payload: Value,
        return_fields: &[&str],
    ) -> Result<Value, ClientError> {
        let query = query::return_field_pairs(return_fields);
        self.send(Method::POST, object_type, &query, Some(payload)).await
    }

    /// Updates the object behind `reference` and returns its (possibly new) reference.
    pub async fn update(&self, reference: &str, payload: Value) -> Result<String, ClientError> {
        response::into_reference(self.send(Method::PUT, reference, &[], Some(payload)).await?)
    }

    /// Updates an object and returns the fields WAPI sends back for it.
    pub async fn update_with_return_fields(
        &self,
        reference: &str,
        payload: Value,
        return_fields: &[&str],
    ) -> Result<Value, ClientError> {
        let query = query::return_field_pairs(return_fields);
        self.send(Method::PUT, reference, &query, Some(payload)).await
    }

    /// Deletes the object behind `reference` and returns that reference.
    pub async fn delete(&self, reference: &str) -> Result<String, ClientError> {
        self.delete_with_args(reference, &[]).await
    }

    /// Deletes an object, passing WAPI delete arguments such as `remove_associated_ptr`.
    pub async fn delete_with_args(
        &self,
        reference: &str,
        args: &[(&str, &str)],
    ) -> Result<String, ClientError> {
        let query = query::filter_pairs(args);
        response::into_reference(self.send(Method::DELETE, reference, &query, None).await?)
    }

    /// Posts a single or multiple request body to the WAPI `request` object.
    pub async fn request(&self, payload: Value) -> Result<Value, ClientError> {
        self.send(Method::POST, "request", &[], Some(payload)).await
    }

    async fn send(
        &self,
        method: Method,
        resource: &str,
        query: &[(String, String)],
        body: Option<Value>,
    ) -> Result<Value, ClientError> {
        let url = self.build_url(resource)?;
        let body = query::request_body(&method, body);
        query::log_call(
            self.config.log_api_calls(),
            &method,
            &url,
            query,
            body.as_ref(),
        );

        let credentials = self.config.credentials();
        let mut request = self
            .http
            .request(method, url)
            .header(reqwest::header::ACCEPT, "application/json")
            .basic_auth(credentials.username(), Some(credentials.password()));

        if !query.is_empty() {
            request = request.query(query);
        }

        if let Some(json_body) = body {
            request = request.json(&json_body);
        }

        let response = request.send().await?;
        let status = response.status();
        let payload = response.text().await?;
        tracing::debug!(%status, "WAPI response");

        if !status.is_success() {
            return Err(response::api_error(status, &payload));
        }

        response::decode_body(&payload)
    }

    // `Url::join` would read an object type like `record:host` as a URL scheme.
    fn build_url(&self, resource: &str) -> Result<Url, ClientError> {
        let relative = resource.trim_start_matches('/');
        Url::parse(&format!("{}{relative}", self.base_url))
            .map_err(|_| ClientError::InvalidPath(resource.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::WapiClient;
    use crate::{ClientConfig, Credentials};

    #[test]
    fn joins_resources_under_versioned_prefix() {
        let config = ClientConfig::new("http://127.0.0.1:8080", Credentials::new("admin", "x"))
            .with_version("v2.10");
        let client = WapiClient::new(config).expect("valid config");
        let resolved = client.build_url("grid").expect("valid path");
        assert_eq!(resolved.as_str(), "http://127.0.0.1:8080/wapi/v2.10/grid");
        assert!(client.tls_verify());
    }
}
