//! Conversion between `tiny_http` and the transport-neutral request types.

use crate::route::{Method, Request, Response};
use anyhow::Result;
use tiny_http::{Header, StatusCode};

pub fn to_request(request: &tiny_http::Request) -> Request {
    let mut req = Request::new(Method::parse(request.method().as_str()), request.url());
    req.headers = request
        .headers()
        .iter()
        .map(|h| (h.field.as_str().as_str().to_string(), h.value.as_str().to_string()))
        .collect();
    req
}

pub fn respond(request: tiny_http::Request, response: Response) -> Result<()> {
    let mut out = tiny_http::Response::from_data(response.body)
        .with_status_code(StatusCode(response.status));
    for (name, value) in &response.headers {
        // Invalid header bytes cannot be sent; drop them
        if let Ok(header) = Header::from_bytes(name.as_bytes(), value.as_bytes()) {
            out.add_header(header);
        }
    }
    request.respond(out)?;
    Ok(())
}
