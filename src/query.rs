//! Query-string marshaling for WAPI reads and the paging loop state.
//!
//! Both clients share this module so the blocking and async variants build
//! byte-identical requests.

use reqwest::{Method, Url};
use serde::Deserialize;
use serde_json::Value;

use crate::ClientError;

/// Page size used for paged reads when none is configured.
pub const DEFAULT_PAGE_SIZE: u32 = 1000;

/// Owned query pairs in the order they are sent.
pub(crate) type QueryPairs = Vec<(String, String)>;

/// Options for [`crate::BlockingWapiClient::get_with_options`] and its async twin.
///
/// `max_results` follows the WAPI convention: a positive value truncates the
/// result set, a negative value turns an oversized result set into
/// [`ClientError::LimitExceeded`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GetOptions {
    pub return_fields: Vec<String>,
    pub paging: bool,
    pub page_size: u32,
    pub max_results: Option<i64>,
}

impl Default for GetOptions {
    fn default() -> Self {
        Self {
            return_fields: Vec::new(),
            paging: true,
            page_size: DEFAULT_PAGE_SIZE,
            max_results: None,
        }
    }
}

impl GetOptions {
    /// Requests specific fields. Include `"default"` to extend the default field set.
    #[must_use]
    pub fn with_return_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.return_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Fetches the result set in a single request.
    #[must_use]
    pub fn without_paging(mut self) -> Self {
        self.paging = false;
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    #[must_use]
    pub fn with_max_results(mut self, max_results: i64) -> Self {
        self.max_results = Some(max_results);
        self
    }
}

/// Checks a signed page size coming from a dynamically typed caller.
///
/// Non-positive values are only an error while paging is on.
#[cfg_attr(not(feature = "python"), allow(dead_code))]
pub(crate) fn page_size_from_signed(page_size: i64, paging: bool) -> Result<u32, ClientError> {
    if page_size > 0 {
        return Ok(u32::try_from(page_size).unwrap_or(u32::MAX));
    }
    if paging {
        Err(ClientError::InvalidArgument(
            "page_size must be a positive integer when paging is enabled".to_owned(),
        ))
    } else {
        Ok(DEFAULT_PAGE_SIZE)
    }
}

/// Converts borrowed filter pairs to owned query pairs.
pub(crate) fn filter_pairs(filters: &[(&str, &str)]) -> QueryPairs {
    filters
        .iter()
        .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
        .collect()
}

/// Builds `_return_fields` or, when `"default"` is listed, `_return_fields+`.
pub(crate) fn return_field_pairs<S: AsRef<str>>(fields: &[S]) -> QueryPairs {
    if fields.is_empty() {
        return Vec::new();
    }

    let extend_defaults = fields.iter().any(|field| field.as_ref() == "default");
    let joined = fields
        .iter()
        .map(AsRef::as_ref)
        .filter(|field| *field != "default")
        .collect::<Vec<_>>()
        .join(",");

    let key = if extend_defaults {
        "_return_fields+"
    } else {
        "_return_fields"
    };
    vec![(key.to_owned(), joined)]
}

/// Query for every page after the first.
pub(crate) fn page_query(page_id: &str) -> QueryPairs {
    vec![("_page_id".to_owned(), page_id.to_owned())]
}

/// First request of a read, plus the page accumulator when paging is on.
#[derive(Debug)]
pub(crate) struct ReadPlan {
    query: QueryPairs,
    pages: Option<PageCollector>,
}

impl ReadPlan {
    pub(crate) fn new(filters: &[(&str, &str)], options: &GetOptions) -> Result<Self, ClientError> {
        if options.paging && options.page_size == 0 {
            return Err(ClientError::InvalidArgument(
                "page_size must be a positive integer when paging is enabled".to_owned(),
            ));
        }
        if options.max_results == Some(0) {
            return Err(ClientError::InvalidArgument(
                "max_results cannot be zero".to_owned(),
            ));
        }

        let mut query = filter_pairs(filters);
        query.extend(return_field_pairs(options.return_fields.as_slice()));

        if !options.paging {
            if let Some(max_results) = options.max_results {
                query.push(("_max_results".to_owned(), max_results.to_string()));
            }
            return Ok(Self { query, pages: None });
        }

        let page_size = effective_page_size(options.page_size, options.max_results);
        query.push(("_paging".to_owned(), "1".to_owned()));
        query.push(("_return_as_object".to_owned(), "1".to_owned()));
        query.push(("_max_results".to_owned(), page_size.to_string()));

        Ok(Self {
            query,
            pages: Some(PageCollector::new(options.max_results)),
        })
    }

    pub(crate) fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Returns the accumulator, or `None` for a single unpaged request.
    pub(crate) fn into_pages(self) -> Option<PageCollector> {
        self.pages
    }
}

/// Shrinks the page so a bounded read does not fetch more than it needs.
///
/// A negative limit asks for one extra row so an oversized set is detectable.
fn effective_page_size(page_size: u32, max_results: Option<i64>) -> u64 {
    let page_size = u64::from(page_size);
    match max_results {
        Some(max) if max > 0 && max.unsigned_abs() < page_size => max.unsigned_abs(),
        Some(max) if max < 0 && max.unsigned_abs() <= page_size => max.unsigned_abs() + 1,
        _ => page_size,
    }
}

#[derive(Debug, Deserialize)]
struct ResultPage {
    #[serde(default)]
    result: Vec<Value>,
    next_page_id: Option<String>,
}

/// Accumulates `_return_as_object` pages and applies `max_results`.
#[derive(Debug)]
pub(crate) struct PageCollector {
    results: Vec<Value>,
    max_results: Option<i64>,
}

impl PageCollector {
    fn new(max_results: Option<i64>) -> Self {
        Self {
            results: Vec::new(),
            max_results,
        }
    }

    /// Adds one page and returns the id of the next page to fetch, if any.
    pub(crate) fn absorb(&mut self, page: Value) -> Result<Option<String>, ClientError> {
        let page: ResultPage = serde_json::from_value(page)?;
        self.results.extend(page.result);
        Ok(page.next_page_id.filter(|_| self.wants_more()))
    }

    fn wants_more(&self) -> bool {
        self.limit().is_none_or(|limit| self.results.len() < limit)
    }

    fn limit(&self) -> Option<usize> {
        self.max_results
            .map(|max| usize::try_from(max.unsigned_abs()).unwrap_or(usize::MAX))
    }

    pub(crate) fn finish(mut self) -> Result<Vec<Value>, ClientError> {
        match (self.max_results, self.limit()) {
            (Some(max), Some(limit)) if max < 0 && self.results.len() > limit => {
                Err(ClientError::LimitExceeded {
                    max_results: max.unsigned_abs(),
                    actual: self.results.len(),
                })
            }
            (Some(_), Some(limit)) => {
                self.results.truncate(limit);
                Ok(self.results)
            }
            _ => Ok(self.results),
        }
    }
}

/// Only non-GET requests with a non-empty payload carry a body.
pub(crate) fn request_body(method: &Method, body: Option<Value>) -> Option<Value> {
    if *method == Method::GET {
        return None;
    }
    body.filter(|value| match value {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    })
}

pub(crate) fn log_call(
    log_api_calls: bool,
    method: &Method,
    url: &Url,
    query: &[(String, String)],
    body: Option<&Value>,
) {
    if log_api_calls {
        tracing::info!(%method, %url, ?query, ?body, "WAPI call");
    } else {
        tracing::debug!(%method, %url, ?query, ?body, "WAPI call");
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Method;
    use serde_json::json;

    use super::{
        DEFAULT_PAGE_SIZE, GetOptions, ReadPlan, page_size_from_signed, request_body,
        return_field_pairs,
    };
    use crate::ClientError;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect()
    }

    #[test]
    fn return_fields_replace_defaults() {
        assert_eq!(
            return_field_pairs(&["name", "ipv4addrs"]),
            pairs(&[("_return_fields", "name,ipv4addrs")])
        );
    }

    #[test]
    fn default_marker_extends_defaults() {
        assert_eq!(
            return_field_pairs(&["default", "extattrs"]),
            pairs(&[("_return_fields+", "extattrs")])
        );
        assert!(return_field_pairs::<&str>(&[]).is_empty());
    }

    #[test]
    fn paged_read_appends_paging_parameters_after_filters() {
        let options = GetOptions::default().with_return_fields(["name"]);
        let plan = ReadPlan::new(&[("name~", "web")], &options).expect("valid options");
        assert_eq!(
            plan.query(),
            pairs(&[
                ("name~", "web"),
                ("_return_fields", "name"),
                ("_paging", "1"),
                ("_return_as_object", "1"),
                ("_max_results", "1000"),
            ])
        );
    }

    #[test]
    fn max_results_shrinks_page_size() {
        let plan = ReadPlan::new(&[], &GetOptions::default().with_max_results(25))
            .expect("valid options");
        assert!(plan.query().contains(&("_max_results".to_owned(), "25".to_owned())));

        let plan = ReadPlan::new(&[], &GetOptions::default().with_max_results(-25))
            .expect("valid options");
        assert!(plan.query().contains(&("_max_results".to_owned(), "26".to_owned())));

        let plan = ReadPlan::new(
            &[],
            &GetOptions::default()
                .with_page_size(10)
                .with_max_results(-25),
        )
        .expect("valid options");
        assert!(plan.query().contains(&("_max_results".to_owned(), "10".to_owned())));
    }

    #[test]
    fn unpaged_read_passes_signed_max_results() {
        let options = GetOptions::default().without_paging().with_max_results(-5);
        let plan = ReadPlan::new(&[], &options).expect("valid options");
        assert_eq!(plan.query(), pairs(&[("_max_results", "-5")]));
        assert!(plan.into_pages().is_none());
    }

    #[test]
    fn invalid_paging_arguments_are_rejected() {
        let zero_page = GetOptions::default().with_page_size(0);
        assert!(matches!(
            ReadPlan::new(&[], &zero_page),
            Err(ClientError::InvalidArgument(_))
        ));

        let zero_page_unpaged = GetOptions::default().with_page_size(0).without_paging();
        assert!(ReadPlan::new(&[], &zero_page_unpaged).is_ok());

        let zero_max = GetOptions::default().with_max_results(0);
        assert!(matches!(
            ReadPlan::new(&[], &zero_max),
            Err(ClientError::InvalidArgument(_))
        ));
    }

    #[test]
    fn signed_page_size_is_checked_only_when_paging() {
        assert_eq!(page_size_from_signed(250, true).expect("valid size"), 250);
        assert_eq!(page_size_from_signed(i64::MAX, true).expect("clamped"), u32::MAX);
        assert!(matches!(
            page_size_from_signed(-5, true),
            Err(ClientError::InvalidArgument(_))
        ));
        assert!(matches!(
            page_size_from_signed(0, true),
            Err(ClientError::InvalidArgument(_))
        ));
        assert_eq!(
            page_size_from_signed(-5, false).expect("ignored"),
            DEFAULT_PAGE_SIZE
        );
    }

    #[test]
    fn collector_stops_once_limit_is_reached() {
        let plan = ReadPlan::new(&[], &GetOptions::default().with_max_results(2))
            .expect("valid options");
        let mut pages = plan.into_pages().expect("paging enabled");

        let next = pages
            .absorb(json!({"result": [{"_ref": "a"}, {"_ref": "b"}, {"_ref": "c"}], "next_page_id": "p2"}))
            .expect("valid page");
        assert_eq!(next, None);

        let results = pages.finish().expect("truncated");
        assert_eq!(results, vec![json!({"_ref": "a"}), json!({"_ref": "b"})]);
    }

    #[test]
    fn collector_reports_oversized_strict_result_set() {
        let plan = ReadPlan::new(&[], &GetOptions::default().with_max_results(-1))
            .expect("valid options");
        let mut pages = plan.into_pages().expect("paging enabled");
        pages
            .absorb(json!({"result": [{"_ref": "a"}, {"_ref": "b"}]}))
            .expect("valid page");

        match pages.finish() {
            Err(ClientError::LimitExceeded {
                max_results,
                actual,
            }) => {
                assert_eq!(max_results, 1);
                assert_eq!(actual, 2);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn collector_follows_next_page_without_limit() {
        let plan = ReadPlan::new(&[], &GetOptions::default()).expect("valid options");
        let mut pages = plan.into_pages().expect("paging enabled");
        let next = pages
            .absorb(json!({"result": [{"_ref": "a"}], "next_page_id": "p2"}))
            .expect("valid page");
        assert_eq!(next.as_deref(), Some("p2"));
    }

    #[test]
    fn body_is_dropped_for_get_and_empty_payloads() {
        assert_eq!(request_body(&Method::GET, Some(json!({"a": 1}))), None);
        assert_eq!(request_body(&Method::DELETE, Some(json!({}))), None);
        assert_eq!(
            request_body(&Method::POST, Some(json!({"name": "h"}))),
            Some(json!({"name": "h"}))
        );
    }
}
