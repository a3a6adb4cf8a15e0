//! Authentication state trait.

use super::gate::AuthGate;

/// Trait for router state types that can authenticate requests.
pub trait HasAuthGate {
    fn gate(&self) -> &AuthGate;
}
