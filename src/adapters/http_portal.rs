//! Captive provisioning portal.
//!
//! | Route       | Reply                                             |
//! |-------------|---------------------------------------------------|
//! | `GET /`     | setup page with the device id                     |
//! | `POST /wifi`| 200 saved, 400 invalid, 409 not in setup, 500 I/O |
//!
//! Bodies are read chunk by chunk into a [`BodyAccumulator`] bounded by
//! the declared `Content-Length`.  Only a complete body reaches the
//! intake, and the controller is told only after the reply is written.

use log::warn;

use crate::app::ports::{IndicatorPort, StoragePort};
use crate::app::provisioning::{
    BodyAccumulator, IntakeReply, MAX_BODY, ProvisioningIntake,
};
use crate::error::ValidationError;

/// Read chunk size; one httpd receive call.
pub const READ_CHUNK: usize = 128;

/// Pull a whole body through `read`.  A read that ends (or fails) before
/// `Content-Length` bytes arrived is [`ValidationError::Truncated`].
pub fn read_body<E>(
    content_len: Option<usize>,
    mut read: impl FnMut(&mut [u8]) -> Result<usize, E>,
) -> Result<heapless::Vec<u8, MAX_BODY>, ValidationError> {
    let mut acc = BodyAccumulator::new(content_len)?;
    let mut chunk = [0u8; READ_CHUNK];
    while !acc.is_complete() {
        let want = acc.remaining().min(READ_CHUNK);
        let n = match read(&mut chunk[..want]) {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        acc.push(&chunk[..n])?;
    }
    acc.finish()
}

/// Read, validate and persist one `POST /wifi` request.
pub fn serve_submission<S, I, E>(
    intake: &mut ProvisioningIntake<S, I>,
    content_len: Option<usize>,
    read: impl FnMut(&mut [u8]) -> Result<usize, E>,
) -> IntakeReply
where
    S: StoragePort,
    I: IndicatorPort,
{
    match read_body(content_len, read) {
        Ok(body) => intake.submit(&body),
        Err(e) => {
            warn!("Portal: unusable request body: {}", e);
            IntakeReply::rejected(e)
        }
    }
}

#[cfg(target_os = "espidf")]
pub use device::{SharedIntake, start_portal};

#[cfg(target_os = "espidf")]
mod device {
    use std::sync::{Arc, Mutex};

    use embedded_svc::http::{Headers, Method};
    use embedded_svc::io::{Read, Write};
    use esp_idf_svc::http::server::{Configuration, EspHttpServer};
    use esp_idf_svc::io::EspIOError;
    use log::{error, info};

    use super::serve_submission;
    use crate::adapters::nvs::NvsAdapter;
    use crate::app::provisioning::{IntakeReply, ProvisioningIntake, REPLY_SAVE_FAILED, render_portal_page};
    use crate::drivers::status_led::PulseQueue;
    use crate::error::{Error, Result};

    pub type SharedIntake = Arc<Mutex<ProvisioningIntake<NvsAdapter, PulseQueue>>>;

    /// Start the HTTP server.  The returned server must be kept alive.
    pub fn start_portal(intake: SharedIntake, device_id: &str) -> Result<EspHttpServer<'static>> {
        let page = render_portal_page(device_id).map_err(|_| Error::Launch("portal page"))?;

        let conf = Configuration {
            stack_size: 8 * 1024,
            ..Default::default()
        };
        let mut server = EspHttpServer::new(&conf).map_err(|_| Error::Launch("http server"))?;

        server
            .fn_handler::<EspIOError, _>("/", Method::Get, move |req| {
                req.into_response(200, Some("OK"), &[("Content-Type", "text/html; charset=utf-8")])?
                    .write_all(page.as_bytes())?;
                Ok(())
            })
            .map_err(|_| Error::Launch("GET / handler"))?;

        server
            .fn_handler::<EspIOError, _>("/wifi", Method::Post, move |mut req| {
                let content_len = req.content_len().map(|n| n as usize);
                let reply = match intake.lock() {
                    Ok(mut guard) => serve_submission(&mut guard, content_len, |buf| req.read(buf)),
                    Err(_) => {
                        error!("Portal: intake lock poisoned");
                        IntakeReply {
                            status: 500,
                            body: REPLY_SAVE_FAILED.into(),
                            accepted: false,
                        }
                    }
                };

                req.into_response(
                    reply.status,
                    Some(reply.status_text()),
                    &[("Content-Type", "text/plain; charset=utf-8")],
                )?
                .write_all(reply.body.as_bytes())?;

                if reply.accepted {
                    if let Ok(guard) = intake.lock() {
                        guard.hand_over();
                    }
                }
                Ok(())
            })
            .map_err(|_| Error::Launch("POST /wifi handler"))?;

        info!("Portal: listening on port 80");
        Ok(server)
    }
}
