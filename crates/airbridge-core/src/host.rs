// ── Host bridge collaborator ──
//
// The accessory host (whatever exposes sensors to a smart-home ecosystem)
// is reached only through this trait. The reconciler tells it what to
// register and unregister; the host calls binding getters when a value
// is requested.

use uuid::Uuid;

use crate::model::{AccessoryRegistration, MacAddress};

/// Namespace for accessory ids. Changing it re-keys every accessory.
pub const ACCESSORY_NAMESPACE: Uuid = Uuid::from_u128(0x6a3f_2c1e_8b7d_4e90_a5c4_1d2e_3f40_5b61);

/// Deterministic accessory id for a device.
///
/// The id depends on the normalized mac only, so it survives restarts and
/// mac formatting differences (`58:2d:..` vs `582D..`).
pub fn stable_id(mac: &MacAddress) -> Uuid {
    Uuid::new_v5(&ACCESSORY_NAMESPACE, mac.as_str().as_bytes())
}

pub trait AccessoryHost: Send + Sync {
    fn stable_id(&self, mac: &MacAddress) -> Uuid {
        stable_id(mac)
    }

    /// Newly observed accessories, with their capability bindings.
    fn register_accessories(&self, accessories: &[AccessoryRegistration]);

    /// Accessories whose device no longer appears in the listing.
    fn unregister_accessories(&self, ids: &[Uuid]);
}
