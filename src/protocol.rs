//! Request/response line protocol spoken by the LED controller.
//!
//! Each exchange is one ASCII request line answered by one response line:
//!
//! ```text
//! GET COLOR          ->  R, G, B
//! SET COLOR r, g, b  ->  OK
//! GET ENCENDIDO      ->  true | false
//! SET ENCENDIDO b    ->  OK
//! ```

use crate::error::{LinkError, Result};
use crate::types::Rgb;

/// The literal acknowledgement every `SET` must receive
pub(crate) const OK: &str = "OK";

/// Keys understood by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Current strip color, value format `R, G, B`
    Color,
    /// Power state, value format `true`/`false`
    Power,
}

impl Key {
    pub fn as_str(self) -> &'static str {
        match self {
            Key::Color => "COLOR",
            Key::Power => "ENCENDIDO",
        }
    }
}

/// A single protocol request
#[derive(Debug, Clone)]
pub struct Request {
    verb: &'static str,
    key: Key,
    value: Option<String>,
}

impl Request {
    /// Create a `GET <KEY>` request
    pub fn get(key: Key) -> Self {
        Self {
            verb: "GET",
            key,
            value: None,
        }
    }

    /// Create a `SET <KEY> <VALUE>` request
    pub fn set(key: Key, value: impl Into<String>) -> Self {
        Self {
            verb: "SET",
            key,
            value: Some(value.into()),
        }
    }

    /// Render the request line, without the trailing newline
    pub fn to_line(&self) -> String {
        match &self.value {
            Some(value) => format!("{} {} {}", self.verb, self.key.as_str(), value),
            None => format!("{} {}", self.verb, self.key.as_str()),
        }
    }
}

/// Parse a `GET COLOR` response of the form `R, G, B`.
///
/// Components are parsed as decimal integers; extra components are ignored.
/// The controller performs no range validation, so out-of-range components
/// are accepted and clamped to the 0-255 channel range.
pub(crate) fn parse_color(line: &str) -> Result<Rgb> {
    let mut components = line.split(", ").map(|part| {
        part.trim().parse::<i64>().map_err(|_| {
            LinkError::InvalidResponse(format!("bad color component in {line:?}"))
        })
    });

    let mut next = || match components.next() {
        Some(component) => component,
        None => Err(LinkError::InvalidResponse(format!("bad color value {line:?}"))),
    };

    let r = next()?;
    let g = next()?;
    let b = next()?;

    let clamp = |v: i64| v.clamp(0, 255) as u8;
    Ok(Rgb::new(clamp(r), clamp(g), clamp(b)))
}

/// Parse a `GET ENCENDIDO` response.
///
/// Anything other than case-insensitive `true` parses as false, the
/// standard string-to-boolean conversion.
pub(crate) fn parse_bool(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("true")
}

/// Validate a `SET` acknowledgement: only the exact literal `OK` succeeds.
pub(crate) fn expect_ok(line: &str) -> Result<()> {
    if line == OK {
        Ok(())
    } else {
        Err(LinkError::InvalidResponse(format!(
            "expected OK, got {line:?}"
        )))
    }
}
