//! Port allocation and availability checking.

use crate::backend::config::LOOPBACK_HOST;
use crate::backend::{SupervisorError, SupervisorResult};

use std::net::TcpListener;

pub struct PortAllocator;

impl PortAllocator {
    /// Find the first bindable port in `start..=end`.
    ///
    /// Ports are probed in ascending order. The probe listener is dropped
    /// before returning, so nothing stays bound on success or failure.
    /// Another process may still grab the port before the backend binds
    /// it; that conflict shows up later as a health timeout.
    #[track_caller]
    pub fn find_available(start: u16, end: u16) -> SupervisorResult<u16> {
        for port in start..=end {
            if Self::is_available(port) {
                return Ok(port);
            }
        }

        Err(SupervisorError::no_available_port(start, end))
    }

    /// Check if a port can be bound on the loopback interface.
    ///
    /// The listener is released as soon as it goes out of scope.
    pub fn is_available(port: u16) -> bool {
        TcpListener::bind((LOOPBACK_HOST, port)).is_ok()
    }
}
