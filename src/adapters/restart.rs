//! Process restart adapter.
//!
//! On ESP-IDF `restart_now` calls `esp_restart()` and never returns;
//! `restart_after` hands the wait to a short-lived thread so an HTTP
//! reply can still be flushed.  On the host every request is recorded.

use core::time::Duration;

use log::warn;

use crate::app::ports::RestartPort;

/// A restart the simulation backend was asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartRequest {
    Now,
    After(Duration),
}

#[derive(Default)]
pub struct SystemRestart {
    #[cfg(not(target_os = "espidf"))]
    requests: Vec<RestartRequest>,
}

impl SystemRestart {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn requests(&self) -> &[RestartRequest] {
        &self.requests
    }
}

#[cfg(target_os = "espidf")]
impl RestartPort for SystemRestart {
    fn restart_now(&mut self) {
        warn!("Restart: now");
        // SAFETY: esp_restart has no preconditions and does not return.
        unsafe { esp_idf_svc::sys::esp_restart() };
    }

    fn restart_after(&mut self, grace: Duration) {
        warn!("Restart: in {} ms", grace.as_millis());
        let spawned = std::thread::Builder::new()
            .name("restart".into())
            .stack_size(2048)
            .spawn(move || {
                std::thread::sleep(grace);
                unsafe { esp_idf_svc::sys::esp_restart() };
            });
        if spawned.is_err() {
            log::error!("Restart: could not spawn delay thread, restarting now");
            self.restart_now();
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl RestartPort for SystemRestart {
    fn restart_now(&mut self) {
        warn!("Restart(sim): now");
        self.requests.push(RestartRequest::Now);
    }

    fn restart_after(&mut self, grace: Duration) {
        warn!("Restart(sim): in {} ms", grace.as_millis());
        self.requests.push(RestartRequest::After(grace));
    }
}
