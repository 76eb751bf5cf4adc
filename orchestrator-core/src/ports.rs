use std::collections::HashSet;
use std::sync::Mutex;

use crate::error::OrchestratorError;

/// Reserves public ports for server bundles for as long as the bundle lives.
///
/// The original wake-on-connect prototypes picked a port by binding to `:0`,
/// reading back the assigned port, and releasing the socket before handing
/// the number to the container runtime — a bind-then-release race that lets
/// a second deploy grab the same port before the first container starts.
/// This allocator instead keeps its own in-process reservation table, so a
/// port stays reserved for a bundle's entire lifetime and is only returned to
/// the pool on delete.
pub struct PortAllocator {
    range: std::ops::RangeInclusive<u16>,
    reserved: Mutex<HashSet<u16>>,
}

impl PortAllocator {
    pub fn new(range: std::ops::RangeInclusive<u16>) -> Self {
        PortAllocator {
            range,
            reserved: Mutex::new(HashSet::new()),
        }
    }

    /// Reserves and returns the lowest free port in range.
    pub fn reserve(&self) -> Result<u16, OrchestratorError> {
        let mut reserved = self.reserved.lock().expect("port allocator poisoned");
        for port in self.range.clone() {
            if reserved.insert(port) {
                return Ok(port);
            }
        }
        Err(OrchestratorError::NoFreePort)
    }

    /// Marks a previously-reserved port as free again. A no-op if it was not
    /// reserved, so callers can call this unconditionally on delete.
    pub fn release(&self, port: u16) {
        self.reserved.lock().expect("port allocator poisoned").remove(&port);
    }

    /// Reserves a specific port, for restoring allocator state on startup
    /// from bundles already recorded in the database.
    pub fn reserve_exact(&self, port: u16) -> bool {
        self.reserved.lock().expect("port allocator poisoned").insert(port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_never_hands_out_the_same_port_twice() {
        let allocator = PortAllocator::new(30000..=30001);
        let a = allocator.reserve().unwrap();
        let b = allocator.reserve().unwrap();
        assert_ne!(a, b);
        assert!(allocator.reserve().is_err());
    }

    #[test]
    fn release_makes_a_port_available_again() {
        let allocator = PortAllocator::new(30000..=30000);
        let a = allocator.reserve().unwrap();
        allocator.release(a);
        let b = allocator.reserve().unwrap();
        assert_eq!(a, b);
    }
}
