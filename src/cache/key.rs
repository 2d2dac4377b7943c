//! Cache key derivation.

use std::fmt;
use std::sync::Arc;

use url::form_urlencoded;

use crate::market::MarketRequest;

/// Canonical key for one upstream request.
///
/// Layout is `{operation}:{path}?{query}` where the query is the
/// form-urlencoded rendering of the name-sorted parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(Arc<str>);

impl CacheKey {
    pub fn build(request: &MarketRequest) -> Self {
        let mut query = form_urlencoded::Serializer::new(String::new());
        for (name, value) in request.params.iter() {
            query.append_pair(name, &value.to_string());
        }

        Self(Arc::from(format!(
            "{}:{}?{}",
            request.operation.as_str(),
            request.path,
            query.finish()
        )))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
