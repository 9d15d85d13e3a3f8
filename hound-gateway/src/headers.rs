use axum::http::HeaderValue;
use http::header::{CACHE_CONTROL, PRAGMA};

/// Cache-Control directives
#[derive(Debug, Clone, Default)]
pub struct CacheControl {
    pub no_cache: bool,
    pub no_store: bool,
    pub max_age: Option<u32>,
}

impl CacheControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set no-cache directive
    #[allow(dead_code)]
    pub fn no_cache(mut self) -> Self {
        self.no_cache = true;
        self
    }

    /// Set no-store directive
    pub fn no_store(mut self) -> Self {
        self.no_store = true;
        self
    }

    /// Set max-age directive
    pub fn max_age(mut self, seconds: u32) -> Self {
        self.max_age = Some(seconds);
        self
    }

    pub fn to_header_value(&self) -> HeaderValue {
        let mut parts = Vec::new();

        if self.no_cache {
            parts.push("no-cache".to_string());
        }
        if self.no_store {
            parts.push("no-store".to_string());
        }
        if let Some(max_age) = self.max_age {
            parts.push(format!("max-age={max_age}"));
        }

        HeaderValue::from_str(&parts.join(", ")).unwrap_or(HeaderValue::from_static(""))
    }
}

/// Cache headers applied to a finished response
#[derive(Debug, Clone, Default)]
pub struct CacheHeaders {
    cache_control: CacheControl,
}

impl CacheHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache_control(mut self, cache_control: CacheControl) -> Self {
        self.cache_control = cache_control;
        self
    }

    /// Apply headers to a response
    pub fn apply<B>(&self, response: &mut axum::response::Response<B>) {
        let headers = response.headers_mut();
        headers.insert(CACHE_CONTROL, self.cache_control.to_header_value());

        // HTTP/1.0 caches only understand Pragma
        if self.cache_control.no_cache || self.cache_control.no_store {
            headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        }
    }
}

pub mod presets {
    use super::*;

    /// Token endpoint responses (RFC 6749 section 5.1)
    pub fn no_store() -> CacheHeaders {
        CacheHeaders::new().cache_control(CacheControl::new().no_store())
    }

    /// Discovery documents change only on redeploy
    pub fn discovery(max_age_seconds: u32) -> CacheHeaders {
        CacheHeaders::new().cache_control(CacheControl::new().max_age(max_age_seconds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::Response;

    #[test]
    fn test_no_store_sets_pragma() {
        let mut response = Response::new(());
        presets::no_store().apply(&mut response);
        assert_eq!(response.headers()[CACHE_CONTROL], "no-store");
        assert_eq!(response.headers()[PRAGMA], "no-cache");
    }

    #[test]
    fn test_max_age_has_no_pragma() {
        let mut response = Response::new(());
        presets::discovery(300).apply(&mut response);
        assert_eq!(response.headers()[CACHE_CONTROL], "max-age=300");
        assert!(response.headers().get(PRAGMA).is_none());
    }

    #[test]
    fn test_directives_join() {
        let value = CacheControl::new().no_cache().no_store().to_header_value();
        assert_eq!(value, "no-cache, no-store");
    }
}
