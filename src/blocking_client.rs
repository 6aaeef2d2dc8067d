use reqwest::{Method, Url};
use serde_json::Value;

use crate::query::{self, GetOptions, ReadPlan};
use crate::response;
use crate::{ClientConfig, ClientError};

/// Blocking WAPI client.
///
/// One client is built per grid and reused for every call; requests share
/// the underlying connection pool.
#[derive(Debug)]
pub struct BlockingWapiClient {
    base_url: Url,
    config: ClientConfig,
    http: reqwest::blocking::Client,
}

impl BlockingWapiClient {
    /// Creates a client for the grid described by `config`.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let base_url = config.base_url()?;
        let mut builder =
            reqwest::blocking::Client::builder().danger_accept_invalid_certs(!config.tls_verify());
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
    pub fn get(
        &self,
        object: &str,
        filters: &[(&str, &str)],
        return_fields: &[&str],
    ) -> Result<Vec<Value>, ClientError> {
        let options = GetOptions::default().with_return_fields(return_fields.iter().copied());
        self.get_with_options(object, filters, &options)
    }

    /// Reads objects with explicit paging and result-size options.
    pub fn get_with_options(
        &self,
        object: &str,
        filters: &[(&str, &str)],
        options: &GetOptions,
    ) -> Result<Vec<Value>, ClientError> {
        let plan = ReadPlan::new(filters, options)?;
        let first = self.send(Method::GET, object, plan.query(), None)?;

        let Some(mut pages) = plan.into_pages() else {
            return Ok(response::into_object_list(first));
        };

        let mut next = pages.absorb(first)?;
        while let Some(page_id) = next {
            let page = self.send(Method::GET, object, &query::page_query(&page_id), None)?;
            next = pages.absorb(page)?;
        }
        pages.finish()
    }

    /// Creates an object and returns its reference.
    pub fn create(&self, object_type: &str, payload: Value) -> Result<String, ClientError> {
        response::into_reference(self.send(Method::POST, object_type, &[], Some(payload))?)
    }

    /// Creates an object and returns the fields WAPI sends back for it.
    pub fn create_with_return_fields(
        &self,
        object_type: &str,
        payload: Value,
        return_fields: &[&str],
    ) -> Result<Value, ClientError> {
        let query = query::return_field_pairs(return_fields);
        self.send(Method::POST, object_type, &query, Some(payload))
    }

    /// Updates the object behind `reference` and returns its (possibly new) reference.
    pub fn update(&self, reference: &str, payload: Value) -> Result<String, ClientError> {
        response::into_reference(self.send(Method::PUT, reference, &[], Some(payload))?)
    }

    /// Updates an object and returns the fields WAPI sends back for it.
    pub fn update_with_return_fields(
        &self,
        reference: &str,
        payload: Value,
        return_fields: &[&str],
    ) -> Result<Value, ClientError> {
        let query = query::return_field_pairs(return_fields);
        self.send(Method::PUT, reference, &query, Some(payload))
    }

    /// Deletes the object behind `reference` and returns that reference.
    pub fn delete(&self, reference: &str) -> Result<String, ClientError> {
        self.delete_with_args(reference, &[])
    }

    /// Deletes an object, passing WAPI delete arguments such as `remove_associated_ptr`.
    pub fn delete_with_args(
        &self,
        reference: &str,
        args: &[(&str, &str)],
    ) -> Result<String, ClientError> {
        let query = query::filter_pairs(args);
        response::into_reference(self.send(Method::DELETE, reference, &query, None)?)
    }

    /// Posts a single or multiple request body to the WAPI `request` object.
    pub fn request(&self, payload: Value) -> Result<Value, ClientError> {
        self.send(Method::POST, "request", &[], Some(payload))
    }

    fn send(
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

        let response = request.send()?;
        let status = response.status();
        let payload = response.text()?;
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
    use super::BlockingWapiClient;
    use crate::{ClientConfig, Credentials};

    fn client() -> BlockingWapiClient {
        let config = ClientConfig::new("gm.example.com", Credentials::new("admin", "infoblox"));
        BlockingWapiClient::new(config).expect("valid config")
    }

    #[test]
    fn object_types_are_appended_verbatim() {
        let resolved = client().build_url("record:host").expect("valid path");
        assert_eq!(
            resolved.as_str(),
            "https://gm.example.com/wapi/v2.12/record:host"
        );
    }

    #[test]
    fn references_keep_their_slashes() {
        let resolved = client()
            .build_url("/network/ZG5zLm5ldHdvcmskMTAuMC4wLjAvMjQvMA:10.0.0.0/24/default")
            .expect("valid path");
        assert_eq!(
            resolved.as_str(),
            "https://gm.example.com/wapi/v2.12/network/ZG5zLm5ldHdvcmskMTAuMC4wLjAvMjQvMA:10.0.0.0/24/default"
        );
    }
}
