//! Provisioning intake: the `POST /wifi` handler logic.
//!
//! Transport-independent.  The HTTP adapter feeds request chunks into a
//! [`BodyAccumulator`], hands the complete body to
//! [`ProvisioningIntake::submit`], writes the returned [`IntakeReply`], and
//! calls [`ProvisioningIntake::hand_over`] once the reply is on the wire.
//!
//! Two encodings are accepted, tried in this order:
//!
//! ```text
//!   {"ssid":"Home","password":"secret12"}      compact JSON
//!   ssid=Home&password=secret12                URL form, percent-decoded
//! ```

use core::fmt::Write as _;
use std::sync::mpsc::Sender;

use log::{error, info, warn};
use serde::Deserialize;

use super::credentials::CredentialStore;
use super::events::ControllerInput;
use super::mode::{DeviceMode, ModeWatch};
use super::ports::{IndicatorLine, IndicatorPort, StoragePort};
use crate::error::ValidationError;

/// Longest accepted ssid, in bytes.
pub const SSID_MAX: usize = 31;
/// Longest accepted password, in bytes.
pub const PASSWORD_MAX: usize = 63;
/// Larger bodies are rejected before any byte is read.
pub const MAX_BODY: usize = 512;

pub const PAGE_CAP: usize = 2048;

// ───────────────────────────────────────────────────────────────
// Body accumulation
// ───────────────────────────────────────────────────────────────

/// Collects request chunks until the declared length has arrived.
#[derive(Debug)]
pub struct BodyAccumulator {
    expected: usize,
    buf: heapless::Vec<u8, MAX_BODY>,
}

impl BodyAccumulator {
    /// `content_len` is the request's declared Content-Length.
    pub fn new(content_len: Option<usize>) -> Result<Self, ValidationError> {
        let expected = content_len.ok_or(ValidationError::LengthRequired)?;
        if expected > MAX_BODY {
            return Err(ValidationError::BodyTooLarge);
        }
        Ok(Self {
            expected,
            buf: heapless::Vec::new(),
        })
    }

    /// Append a chunk.  Bytes beyond the declared length are an error.
    pub fn push(&mut self, chunk: &[u8]) -> Result<(), ValidationError> {
        if chunk.len() > self.remaining() {
            return Err(ValidationError::BodyTooLarge);
        }
        self.buf
            .extend_from_slice(chunk)
            .map_err(|_| ValidationError::BodyTooLarge)
    }

    pub fn remaining(&self) -> usize {
        self.expected - self.buf.len()
    }

    pub fn is_complete(&self) -> bool {
        self.buf.len() == self.expected
    }

    /// The complete body.  `Truncated` if the declared length never arrived.
    pub fn finish(self) -> Result<heapless::Vec<u8, MAX_BODY>, ValidationError> {
        if !self.is_complete() {
            return Err(ValidationError::Truncated);
        }
        Ok(self.buf)
    }
}

// ───────────────────────────────────────────────────────────────
// Parsing
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Json,
    Form,
}

/// A validated submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub ssid: String,
    pub password: String,
    pub encoding: Encoding,
}

#[derive(Deserialize)]
struct JsonSubmission {
    ssid: Option<String>,
    password: Option<String>,
}

/// Parse and validate a complete request body.
pub fn parse_submission(body: &[u8]) -> Result<Submission, ValidationError> {
    let (ssid, password, encoding) = match serde_json::from_slice::<JsonSubmission>(body) {
        Ok(json) => (json.ssid, json.password, Encoding::Json),
        Err(_) => {
            let (ssid, password) = parse_form(body)?;
            (ssid, password, Encoding::Form)
        }
    };

    let ssid = require("ssid", ssid, SSID_MAX)?;
    let password = require("password", password, PASSWORD_MAX)?;
    Ok(Submission {
        ssid,
        password,
        encoding,
    })
}

fn require(field: &'static str, value: Option<String>, max: usize) -> Result<String, ValidationError> {
    let value = value.ok_or(ValidationError::MissingField(field))?;
    if value.is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    if value.len() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(value)
}

/// `key=value` pairs joined by `&`.  The first occurrence of a key wins.
fn parse_form(body: &[u8]) -> Result<(Option<String>, Option<String>), ValidationError> {
    let mut ssid = None;
    let mut password = None;
    for pair in body.split(|&b| b == b'&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = match pair.iter().position(|&b| b == b'=') {
            Some(i) => (&pair[..i], &pair[i + 1..]),
            None => (pair, &[][..]),
        };
        let slot = match percent_decode(key)?.as_str() {
            "ssid" => &mut ssid,
            "password" => &mut password,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(percent_decode(value)?);
        }
    }
    Ok((ssid, password))
}

/// Decode `application/x-www-form-urlencoded` bytes.
pub fn percent_decode(input: &[u8]) -> Result<String, ValidationError> {
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        match input[i] {
            b'+' => out.push(b' '),
            b'%' => {
                let hi = input.get(i + 1).copied().and_then(hex_value);
                let lo = input.get(i + 2).copied().and_then(hex_value);
                let (Some(hi), Some(lo)) = (hi, lo) else {
                    return Err(ValidationError::Malformed);
                };
                out.push((hi << 4) | lo);
                i += 2;
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8(out).map_err(|_| ValidationError::Malformed)
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

// ───────────────────────────────────────────────────────────────
// Intake
// ───────────────────────────────────────────────────────────────

pub const REPLY_SAVED: &str = "OK, WiFi saved. Restarting...";
pub const REPLY_SAVE_FAILED: &str = "Failed to save credentials";
pub const REPLY_NOT_IN_SETUP: &str = "Not in setup mode";

/// Status line and plain-text body for the HTTP adapter to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeReply {
    pub status: u16,
    pub body: String,
    /// Credentials were persisted; call [`ProvisioningIntake::hand_over`].
    pub accepted: bool,
}

impl IntakeReply {
    /// `400` for a submission that never reached the store.
    pub fn rejected(e: ValidationError) -> Self {
        Self {
            status: 400,
            body: format!("Bad request: {e}"),
            accepted: false,
        }
    }

    pub fn status_text(&self) -> &'static str {
        match self.status {
            200 => "OK",
            400 => "Bad Request",
            409 => "Conflict",
            _ => "Internal Server Error",
        }
    }
}

pub struct ProvisioningIntake<S: StoragePort, I: IndicatorPort> {
    store: CredentialStore<S>,
    mode: ModeWatch,
    controller: Sender<ControllerInput>,
    indicator: I,
}

impl<S: StoragePort, I: IndicatorPort> ProvisioningIntake<S, I> {
    pub fn new(
        store: CredentialStore<S>,
        mode: ModeWatch,
        controller: Sender<ControllerInput>,
        indicator: I,
    ) -> Self {
        Self {
            store,
            mode,
            controller,
            indicator,
        }
    }

    /// Validate and persist one complete body.
    pub fn submit(&mut self, body: &[u8]) -> IntakeReply {
        if !self.mode.is(DeviceMode::AccessPointFallback) {
            warn!("Intake: submission outside setup mode ({})", self.mode.get());
            return IntakeReply {
                status: 409,
                body: REPLY_NOT_IN_SETUP.into(),
                accepted: false,
            };
        }

        let submission = match parse_submission(body) {
            Ok(s) => s,
            Err(e) => {
                warn!("Intake: rejected submission: {}", e);
                return IntakeReply::rejected(e);
            }
        };

        match self.store.save(&submission.ssid, &submission.password) {
            Ok(()) => {
                info!(
                    "Intake: credentials for '{}' accepted ({:?})",
                    submission.ssid, submission.encoding
                );
                IntakeReply {
                    status: 200,
                    body: REPLY_SAVED.into(),
                    accepted: true,
                }
            }
            Err(e) => {
                error!("Intake: save failed: {}", e);
                self.indicator.pulse(IndicatorLine::Error);
                IntakeReply {
                    status: 500,
                    body: REPLY_SAVE_FAILED.into(),
                    accepted: false,
                }
            }
        }
    }

    /// Tell the controller the credentials are on flash.
    pub fn hand_over(&self) {
        if self.controller.send(ControllerInput::ProvisioningAccepted).is_err() {
            error!("Intake: controller channel closed, restart not scheduled");
        }
    }

    pub fn store(&self) -> &CredentialStore<S> {
        &self.store
    }
}

// ───────────────────────────────────────────────────────────────
// Portal page
// ───────────────────────────────────────────────────────────────

const PAGE_HEAD: &str = "<!DOCTYPE html><html lang='en'><head>\
<meta charset='UTF-8'>\
<meta name='viewport' content='width=device-width, initial-scale=1.0'>\
<title>HygroNode WiFi setup</title>\
<style>\
body{font-family:Arial;padding:20px;background:#f0f0f0}\
.card{max-width:400px;margin:auto;background:#fff;padding:20px;border-radius:10px;box-shadow:0 2px 6px rgba(0,0,0,.2)}\
input{width:100%;padding:12px;margin:8px 0;border-radius:5px;border:1px solid #ccc}\
button{width:100%;padding:12px;background:#007bff;color:#fff;border:none;border-radius:5px;font-size:16px;cursor:pointer}\
button:hover{background:#0056b3}\
small{color:#666}\
</style></head><body><div class='card'><h2>Configure WiFi</h2>";

const PAGE_FORM: &str = "<form action='/wifi' method='POST'>\
<label>SSID</label>\
<input type='text' name='ssid' placeholder='Network name' maxlength='31' required>\
<label>Password</label>\
<input type='password' name='password' placeholder='Password' maxlength='63' required>\
<button type='submit'>Save and connect</button>\
</form></div></body></html>";

/// Render the `GET /` page for this device.
pub fn render_portal_page(device_id: &str) -> Result<heapless::String<PAGE_CAP>, core::fmt::Error> {
    let mut page = heapless::String::new();
    page.push_str(PAGE_HEAD).map_err(|_| core::fmt::Error)?;
    write!(page, "<small>Device {}</small>", HtmlEscaped(device_id))?;
    page.push_str(PAGE_FORM).map_err(|_| core::fmt::Error)?;
    Ok(page)
}

struct HtmlEscaped<'a>(&'a str);

impl core::fmt::Display for HtmlEscaped<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for c in self.0.chars() {
            match c {
                '<' => f.write_str("&lt;")?,
                '>' => f.write_str("&gt;")?,
                '&' => f.write_str("&amp;")?,
                '\'' => f.write_str("&#39;")?,
                '"' => f.write_str("&quot;")?,
                c => f.write_char(c)?,
            }
        }
        Ok(())
    }
}
