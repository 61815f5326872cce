#![forbid(unsafe_code)]

mod client;
mod error;
mod estimate;
mod jar;
mod types;
mod util;

pub use client::HttpClient;
pub use error::{Error, HttpTransportErrorKind, Result};
pub use estimate::estimate_http_request_bytes;
pub use jar::{CookieJar, attribute_summary, is_same_site_restricted, parse_set_cookie};
pub use types::{HttpRequest, HttpResponse};

pub use cookie::{Cookie, SameSite};
