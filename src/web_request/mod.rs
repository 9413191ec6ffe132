//! Web-request correlation: tag generation for outbound requests and manual
//! request timing.

mod api;

#[doc(inline)]
pub use api::{
    request_tag_value_for_url, WebRequestRecord, WebRequestTiming, REQUEST_TAG_HEADER,
};
pub(crate) use api::{format_tag, parse_tag};
