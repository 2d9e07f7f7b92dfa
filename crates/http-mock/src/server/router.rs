//! Classification of inbound paths into ordinary and reserved routes.

use super::log::LogQuery;
use hyper::Method;

pub const REQUEST_PREFIX: &str = "/_request";
pub const EXPECTATIONS_PATH: &str = "/_expectations";
pub const HEALTH_PATH: &str = "/_health";

/// Where an inbound request goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Matched against expectations and recorded
    Ordinary,
    /// GET /_health
    Health,
    /// PUT/DELETE/GET /_expectations
    Expectations,
    /// GET /_request/count
    Count,
    /// GET|DELETE /_request/first, GET|DELETE /_request/last, GET /_request/latest, GET /_request/:index
    Log(LogQuery),
    /// Inside the reserved namespace but not a known endpoint
    Unsupported,
}

impl Route {
    pub fn classify(method: &Method, path: &str) -> Self {
        if path == HEALTH_PATH {
            return if *method == Method::GET {
                Route::Health
            } else {
                Route::Unsupported
            };
        }
        if path == EXPECTATIONS_PATH {
            return Route::Expectations;
        }
        if path == REQUEST_PREFIX {
            return Route::Unsupported;
        }
        match path.strip_prefix(REQUEST_PREFIX).and_then(|r| r.strip_prefix('/')) {
            Some(rest) => Self::log_route(method, rest),
            None => Route::Ordinary,
        }
    }

    fn log_route(method: &Method, rest: &str) -> Self {
        match (method, rest) {
            (&Method::GET, "first") => Route::Log(LogQuery::First),
            (&Method::GET, "last" | "latest") => Route::Log(LogQuery::Last),
            (&Method::GET, "count") => Route::Count,
            (&Method::DELETE, "first") => Route::Log(LogQuery::Shift),
            (&Method::DELETE, "last") => Route::Log(LogQuery::Pop),
            (&Method::GET, index) => index
                .parse()
                .map(|i| Route::Log(LogQuery::At(i)))
                .unwrap_or(Route::Unsupported),
            _ => Route::Unsupported,
        }
    }

    pub fn is_reserved(&self) -> bool {
        !matches!(self, Route::Ordinary)
    }
}

/// Path used to run `query` against a server.
pub fn log_path(query: LogQuery) -> String {
    match query {
        LogQuery::First | LogQuery::Shift => format!("{REQUEST_PREFIX}/first"),
        LogQuery::Last | LogQuery::Pop => format!("{REQUEST_PREFIX}/last"),
        LogQuery::At(index) => format!("{REQUEST_PREFIX}/{index}"),
    }
}

/// HTTP method used to run `query` against a server.
pub fn log_method(query: LogQuery) -> Method {
    if query.mutates() {
        Method::DELETE
    } else {
        Method::GET
    }
}
