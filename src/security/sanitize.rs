//! Input sanitization for JSON request bodies.
//!
//! # Responsibilities
//! - Remove `<script>` blocks (tag and content)
//! - Strip `javascript:` scheme prefixes
//! - Strip inline event-handler assignments (`onclick=`, `onload =`, ...)
//!
//! # Design Decisions
//! - Structural recursion over `serde_json::Value`; keys are never touched
//! - One left-to-right pass over each string. Output is kept on a stack and
//!   only its tail is re-checked after every push or removal, so fragments
//!   that join up once something between them is removed are caught in the
//!   same pass. Cost is linear in the input
//! - The output never contains a removable construct, so sanitizing twice
//!   equals sanitizing once
//! - Bodies that are not valid JSON pass through; the handler's extractor
//!   rejects them as malformed

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::ApiError;
use crate::http::RequestContext;

/// Loose superset of every construct that can start a removal. Strings
/// without a match are returned as they are.
static CANDIDATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<script|javascript:|on[^\s=]*\s*=").expect("valid candidate regex")
});

const SCRIPT_OPEN: &str = "<script";
const SCRIPT_CLOSE: &str = "</script";
const JAVASCRIPT_SCHEME: &str = "javascript:";

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Class {
    Word,
    Space,
    Other,
}

impl Class {
    fn of(c: char) -> Self {
        if is_word(c) {
            Class::Word
        } else if c.is_whitespace() {
            Class::Space
        } else {
            Class::Other
        }
    }
}

/// Output built so far, with enough bookkeeping to check its tail in
/// constant time.
struct Cleaner {
    out: Vec<char>,
    /// For each output char, where its run of word or space chars starts.
    run_start: Vec<usize>,
    /// Positions of `<script` openers still in the output, ascending.
    openers: Vec<usize>,
}

impl Cleaner {
    fn with_capacity(n: usize) -> Self {
        Self {
            out: Vec::with_capacity(n),
            run_start: Vec::with_capacity(n),
            openers: Vec::new(),
        }
    }

    fn ends_with_ignore_case(&self, end: usize, needle: &str) -> bool {
        let len = needle.chars().count();
        end >= len
            && self.out[end - len..end]
                .iter()
                .zip(needle.chars())
                .all(|(a, b)| a.eq_ignore_ascii_case(&b))
    }

    fn start_of_run(&self, end: usize, class: Class) -> usize {
        match end.checked_sub(1) {
            Some(last) if Class::of(self.out[last]) == class => self.run_start[last],
            _ => end,
        }
    }

    fn truncate(&mut self, len: usize) {
        self.out.truncate(len);
        self.run_start.truncate(len);
        // An opener survives only while the char after it is still there.
        while matches!(self.openers.last(), Some(&p) if p + SCRIPT_OPEN.len() >= len) {
            self.openers.pop();
        }
    }

    fn push(&mut self, c: char) {
        let len = self.out.len();
        let class = Class::of(c);
        let start = match class {
            Class::Other => len,
            _ => self.start_of_run(len, class),
        };

        if !is_word(c) && self.ends_with_ignore_case(len, SCRIPT_OPEN) {
            self.openers.push(len - SCRIPT_OPEN.len());
        }
        self.out.push(c);
        self.run_start.push(start);

        match c {
            ':' if self.ends_with_ignore_case(len + 1, JAVASCRIPT_SCHEME) => {
                self.truncate(len + 1 - JAVASCRIPT_SCHEME.len());
            }
            '=' => {
                let word_end = self.start_of_run(len, Class::Space);
                let word_start = self.start_of_run(word_end, Class::Word);
                if word_end - word_start >= 3
                    && self.out[word_start].eq_ignore_ascii_case(&'o')
                    && self.out[word_start + 1].eq_ignore_ascii_case(&'n')
                {
                    self.truncate(word_start);
                }
            }
            '>' if !self.openers.is_empty() => {
                let close_end = self.start_of_run(len, Class::Space);
                if self.ends_with_ignore_case(close_end, SCRIPT_CLOSE) {
                    // The earliest open tag wins, like a lazy match from the left.
                    let first = self.openers[0];
                    self.truncate(first);
                }
            }
            _ => {}
        }
    }

    fn finish(self) -> String {
        self.out.into_iter().collect()
    }
}

/// Clean a single string.
pub fn sanitize_str(input: &str) -> String {
    if !CANDIDATE.is_match(input) {
        return input.to_string();
    }
    let mut cleaner = Cleaner::with_capacity(input.len());
    for c in input.chars() {
        cleaner.push(c);
    }
    cleaner.finish()
}

/// Clean every string inside a JSON value, preserving its shape.
pub fn sanitize(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_str(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key, sanitize(value)))
                .collect(),
        ),
        other => other,
    }
}

fn is_json(request: &Request<Body>) -> bool {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| {
            let mime = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

/// Middleware state: the largest body this stage will buffer.
#[derive(Debug, Clone, Copy)]
pub struct SanitizerState {
    pub max_body_bytes: usize,
}

/// Rewrite JSON bodies in place and record both versions on the
/// [`RequestContext`].
pub async fn sanitize_middleware(
    State(state): State<SanitizerState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !is_json(&request) {
        return next.run(request).await;
    }

    let (mut parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(error = %e, "Failed to buffer request body");
            return ApiError::BodyTooLarge.into_response();
        }
    };

    let original: Value = match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(_) => {
            let request = Request::from_parts(parts, Body::from(bytes));
            return next.run(request).await;
        }
    };

    let sanitized = sanitize(original.clone());
    let body = if sanitized == original {
        bytes
    } else {
        tracing::debug!(path = %parts.uri.path(), "Request body sanitized");
        match serde_json::to_vec(&sanitized) {
            Ok(encoded) => Bytes::from(encoded),
            Err(_) => bytes,
        }
    };

    parts
        .headers
        .insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));

    if let Some(ctx) = parts.extensions.get_mut::<RequestContext>() {
        ctx.original_body = Some(original);
        ctx.sanitized_body = Some(sanitized);
    } else {
        parts.extensions.insert(RequestContext {
            original_body: Some(original),
            sanitized_body: Some(sanitized),
            ..RequestContext::default()
        });
    }

    next.run(Request::from_parts(parts, Body::from(body))).await
}
