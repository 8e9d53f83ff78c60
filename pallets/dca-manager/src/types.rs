//! Shared types and collaborator interfaces of the DCA manager.

use polkadot_sdk::frame_support::pallet_prelude::*;

use primitives::{AssetId, AssetPair, Balance, PairId, Slot};

/// A live DCA position. At most one exists per (account, pair).
///
/// `purchases_remaining` counts the order-book entries still scheduled at
/// `next_slot`, `next_slot + interval` and so on. The record survives the
/// last purchase and is only deleted once the accumulated target balance
/// has been withdrawn in full.
#[derive(Clone, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo, MaxEncodedLen)]
pub struct Strategy {
  /// Slot of the next scheduled purchase
  pub next_slot: Slot,
  /// Distance between consecutive purchases, in slots
  pub interval: Slot,
  /// Source amount spent per purchase (the final purchase may be smaller)
  pub purchase_amount: Balance,
  /// Purchases still sitting in the order book
  pub purchases_remaining: u32,
  /// Settled target proceeds not yet withdrawn
  pub target_balance: Balance,
}

/// One scheduled purchase inside a (slot, pair) order-book bucket.
#[derive(Clone, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo, MaxEncodedLen)]
pub struct PurchaseOrder<AccountId> {
  /// Owner of the strategy the order belongs to
  pub who: AccountId,
  /// Source amount to spend in this slot
  pub amount: Balance,
}

/// Read-only view of the pair registry.
pub trait PairInspector {
  /// Resolve a pair id to its asset pair. `None` only for ids that were
  /// never assigned.
  fn pair(pair_id: PairId) -> Option<AssetPair>;

  /// Highest assigned pair id. Ids are dense, so `1..=pair_count()`
  /// enumerates every registered pair.
  fn pair_count() -> PairId;
}

/// Black-box execution of one aggregated trade.
///
/// An implementation debits `amount_in` of `source` from `who`, performs
/// the swap and credits the proceeds of `target` back to `who`, returning
/// the credited amount. A failing implementation must leave all balances
/// untouched. Zero proceeds are legal and callers have to tolerate them.
pub trait TradeExecutor<AccountId> {
  fn execute_trade(
    who: &AccountId,
    source: AssetId,
    target: AssetId,
    amount_in: Balance,
  ) -> Result<Balance, DispatchError>;
}

/// Helper for benchmarking
#[cfg(feature = "runtime-benchmarks")]
pub trait BenchmarkHelper<AccountId> {
  fn create_asset(asset: AssetId) -> DispatchResult;
  fn register_pair(source: AssetId, target: AssetId) -> DispatchResult;
  fn fund_account(who: &AccountId, asset: AssetId, amount: Balance) -> DispatchResult;
}
