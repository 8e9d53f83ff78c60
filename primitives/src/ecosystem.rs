//! Ecosystem Constants for the DCA Protocol
//!
//! This module centralizes system-level constants: shared type aliases, pallet IDs for
//! deriving pallet-owned accounts, and the economic parameters of the scheduling engine.
//!
//! These constants are the single source of truth for system architecture and are re-used
//! across all runtime configurations via the primitives crate.

/// Balance type alias for consistency across the ecosystem
pub type Balance = u128;

/// Asset identifier as understood by `pallet-assets`
pub type AssetId = u32;

/// Sequential identifier of a registered trading pair.
///
/// Pair IDs are assigned starting at 1; the value 0 is never a valid pair.
pub type PairId = u32;

/// Logical purchase-slot index.
///
/// Slot 0 is the pre-launch state; the first slot that can ever settle is slot 1.
/// Wall-clock time maps onto slots through the host runtime's slot duration.
pub type Slot = u32;

/// Pallet identifiers for deriving pallet-owned accounts.
///
/// These IDs are used by Polkadot SDK's `PalletId::into_account_truncating()`
/// to deterministically generate accounts for pallet-specific operations.
pub mod pallet_ids {
  /// DCA Manager pallet ID (custody of deposits, treasury and settled proceeds)
  pub const DCA_MANAGER_PALLET_ID: &[u8; 8] = b"dcamgr00";
}

/// Ecosystem parameters defining mathematical constants and thresholds.
///
/// These parameters are global across all pallets and coordinate the
/// economic properties of the system.
pub mod params {
  use super::Slot;
  use sp_arithmetic::Permill;

  /// Purchase intervals a strategy may be scheduled on, in slots.
  ///
  /// The set is closed: initiation with any other interval is rejected.
  /// With one slot per day these correspond to daily, weekly, bi-weekly,
  /// tri-weekly and monthly purchasing.
  pub const SUPPORTED_INTERVALS: [Slot; 5] = [1, 7, 14, 21, 30];

  /// Upper bound (exclusive) for the protocol fee rate (5%).
  ///
  /// Governance may move the fee anywhere in `[0%, 5%)`; a fee at or above
  /// this bound is rejected as misconfiguration.
  pub const DCA_MAX_FEE_RATE: Permill = Permill::from_percent(5);

  /// Default slot duration in blocks (~1 day at 6s/block).
  ///
  /// Runtimes wire this into the DCA manager's `SlotDuration`; test
  /// environments use much shorter slots.
  pub const DCA_SLOT_DURATION_BLOCKS: u32 = 14_400;

  /// Default ceiling on the number of scheduled purchases a single strategy
  /// may hold (one year of daily purchases).
  ///
  /// Bounds the storage writes a single deposit can cause.
  pub const DCA_MAX_PURCHASES_PER_STRATEGY: u32 = 366;
}
