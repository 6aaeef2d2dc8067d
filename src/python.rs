use std::sync::Mutex;
use std::time::Duration;

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use serde_json::Value;

use crate::query;
use crate::{BlockingWapiClient, ClientConfig, ClientError, Credentials, GetOptions};

#[pyclass(name = "Client")]
pub struct PyClient {
    inner: Mutex<BlockingWapiClient>,
}

#[pymethods]
impl PyClient {
    #[new]
    #[pyo3(signature = (
        host,
        username,
        password,
        wapi_version=crate::DEFAULT_WAPI_VERSION.to_owned(),
        tls_verify=true,
        timeout_secs=None,
        log_api_calls=false
    ))]
    fn new(
        host: String,
        username: String,
        password: String,
        wapi_version: String,
        tls_verify: bool,
        timeout_secs: Option<f64>,
        log_api_calls: bool,
    ) -> PyResult<Self> {
        let mut config = ClientConfig::new(host, Credentials::new(username, password))
            .with_version(wapi_version)
            .with_tls_verify(tls_verify)
            .with_log_api_calls(log_api_calls);
        if let Some(seconds) = timeout_secs {
            let timeout = Duration::try_from_secs_f64(seconds).map_err(to_py_value_error)?;
            config = config.with_timeout(timeout);
        }

        let client = BlockingWapiClient::new(config).map_err(to_py_value_error)?;
        Ok(Self {
            inner: Mutex::new(client),
        })
    }

    #[getter]
    fn base_url(&self) -> PyResult<String> {
        Ok(self.client()?.base_url().to_string())
    }

    #[getter]
    fn tls_verify(&self) -> PyResult<bool> {
        Ok(self.client()?.tls_verify())
    }

    /// Returns the matching objects as a JSON array string.
    #[pyo3(signature = (obj, filters_json=None, return_fields=None, paging=true, page_size=1000, max_results=None))]
    fn get(
        &self,
        py: Python<'_>,
        obj: String,
        filters_json: Option<String>,
        return_fields: Option<Vec<String>>,
        paging: bool,
        page_size: i64,
        max_results: Option<i64>,
    ) -> PyResult<String> {
        let filter_pairs = parse_map_arg(filters_json)?;
        let borrowed_filters: Vec<(&str, &str)> = filter_pairs
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();

        let page_size = query::page_size_from_signed(page_size, paging).map_err(to_py_error)?;
        let mut options = GetOptions::default()
            .with_return_fields(return_fields.unwrap_or_default())
            .with_page_size(page_size);
        if !paging {
            options = options.without_paging();
        }
        if let Some(max_results) = max_results {
            options = options.with_max_results(max_results);
        }

        self.call(py, |client| {
            client
                .get_with_options(&obj, &borrowed_filters, &options)
                .map(|objects| Value::Array(objects).to_string())
        })
    }

    /// Creates an object. Returns its reference, or the object JSON when fields are requested.
    #[pyo3(signature = (obj, data_json, return_fields=None))]
    fn create(
        &self,
        py: Python<'_>,
        obj: String,
        data_json: String,
        return_fields: Option<Vec<String>>,
    ) -> PyResult<String> {
        let body = parse_body(&data_json)?;
        let fields = return_fields.unwrap_or_default();
        self.call(py, |client| {
            if fields.is_empty() {
                return client.create(&obj, body);
            }
            let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
            client
                .create_with_return_fields(&obj, body, &fields)
                .map(|value| value.to_string())
        })
    }

    /// Updates an object. Returns its reference, or the object JSON when fields are requested.
    #[pyo3(signature = (reference, data_json, return_fields=None))]
    fn update(
        &self,
        py: Python<'_>,
        reference: String,
        data_json: String,
        return_fields: Option<Vec<String>>,
    ) -> PyResult<String> {
        let body = parse_body(&data_json)?;
        let fields = return_fields.unwrap_or_default();
        self.call(py, |client| {
            if fields.is_empty() {
                return client.update(&reference, body);
            }
            let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
            client
                .update_with_return_fields(&reference, body, &fields)
                .map(|value| value.to_string())
        })
    }

    #[pyo3(signature = (reference, delete_args_json=None))]
    fn delete(
        &self,
        py: Python<'_>,
        reference: String,
        delete_args_json: Option<String>,
    ) -> PyResult<String> {
        let arg_pairs = parse_map_arg(delete_args_json)?;
        let borrowed_args: Vec<(&str, &str)> = arg_pairs
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();

        self.call(py, |client| client.delete_with_args(&reference, &borrowed_args))
    }

    fn request(&self, py: Python<'_>, payload_json: String) -> PyResult<String> {
        let body = parse_body(&payload_json)?;
        self.call(py, |client| {
            client.request(body).map(|value| value.to_string())
        })
    }
}

impl PyClient {
    fn client(&self) -> PyResult<std::sync::MutexGuard<'_, BlockingWapiClient>> {
        self.inner
            .lock()
            .map_err(|e| PyRuntimeError::new_err(e.to_string()))
    }

    /// Runs a blocking WAPI call with the GIL released.
    fn call<T, F>(&self, py: Python<'_>, f: F) -> PyResult<T>
    where
        T: Send,
        F: FnOnce(&BlockingWapiClient) -> Result<T, ClientError> + Send,
    {
        py.detach(|| {
            let client = self.client()?;
            f(&client).map_err(to_py_error)
        })
    }
}

#[pymodule]
fn ibwapi(_py: Python<'_>, module: &Bound<'_, PyModule>) -> PyResult<()> {
    module.add_class::<PyClient>()?;
    Ok(())
}

fn to_py_value_error(error: impl std::fmt::Display) -> PyErr {
    PyValueError::new_err(error.to_string())
}

fn to_py_error(error: ClientError) -> PyErr {
    match error {
        ClientError::InvalidArgument(_) | ClientError::InvalidPath(_) => {
            to_py_value_error(error)
        }
        other => PyRuntimeError::new_err(other.to_string()),
    }
}

fn parse_body(raw_json: &str) -> PyResult<Value> {
    serde_json::from_str(raw_json).map_err(to_py_value_error)
}

fn parse_map_arg(raw_json: Option<String>) -> PyResult<Vec<(String, String)>> {
    let Some(raw_json) = raw_json else {
        return Ok(Vec::new());
    };

    let value: Value = serde_json::from_str(&raw_json).map_err(to_py_value_error)?;
    let object = value
        .as_object()
        .ok_or_else(|| PyValueError::new_err("expected a JSON object"))?;

    Ok(object
        .iter()
        .map(|(key, value)| {
            let rendered = match value.as_str() {
                Some(as_str) => as_str.to_owned(),
                None => value.to_string(),
            };
            (key.to_owned(), rendered)
        })
        .collect())
}
