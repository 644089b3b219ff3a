//! Failures of the serving layer itself.
//!
//! Device failures never get here: they are answered in-band with `null`.
//! What remains (template or asset I/O, a panicking handler) renders as a
//! 500 with a diagnostic JSON body.

use std::any::Any;
use std::error::Error as StdError;
use std::path::PathBuf;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::error;
use serde_json::json;
use thiserror::Error;

/// Maximum number of nested causes reported in a 500 body.
pub const MAX_CAUSES: usize = 5;

/// Error raised while answering a request.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("could not read dashboard template {}", path.display())]
    Template {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not read asset {}", path.display())]
    Asset {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ApiError {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Template { .. } => "template_io",
            Self::Asset { .. } => "asset_io",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("{self}");
        let body = json!({
            "error": self.to_string(),
            "type": self.type_name(),
            "causes": cause_chain(&self),
        });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// Messages of up to [`MAX_CAUSES`] nested sources, outermost first.
pub fn cause_chain(err: &dyn StdError) -> Vec<String> {
    let mut causes = Vec::new();
    let mut next = err.source();
    while let Some(cause) = next {
        if causes.len() == MAX_CAUSES {
            break;
        }
        causes.push(cause.to_string());
        next = cause.source();
    }
    causes
}

/// Last-line handler for `CatchPanicLayer`.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic".to_string()
    };
    error!("handler panicked: {message}");

    let body = json!({
        "error": message,
        "type": "panic",
        "causes": Vec::<String>::new(),
    });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

/// Failure to start or keep running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("could not build device HTTP client")]
    HttpClient(#[from] reqwest::Error),

    #[error("could not bind {addr}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server stopped unexpectedly")]
    Serve(#[source] std::io::Error),

    #[error("could not start the async runtime")]
    Runtime(#[source] std::io::Error),
}
