use codec::{Decode, DecodeWithMemTracking, Encode, MaxEncodedLen};
use scale_info::TypeInfo;
use serde::{Deserialize, Serialize};

use crate::ecosystem::AssetId;

/// An ordered trading pair: spend `source`, accumulate `target`.
///
/// Pairs are direction-sensitive; `(A, B)` and `(B, A)` are distinct pairs
/// with distinct IDs. This struct is the single source of truth for pair
/// resolution across the pair registry and the DCA manager.
#[derive(
  Clone,
  Copy,
  Debug,
  Decode,
  DecodeWithMemTracking,
  Default,
  Encode,
  Eq,
  MaxEncodedLen,
  Ord,
  PartialEq,
  PartialOrd,
  TypeInfo,
  Serialize,
  Deserialize,
)]
pub struct AssetPair {
  /// Asset deposited by strategy holders and spent at settlement
  pub source: AssetId,
  /// Asset purchased at settlement and accumulated for withdrawal
  pub target: AssetId,
}

impl AssetPair {
  pub const fn new(source: AssetId, target: AssetId) -> Self {
    Self { source, target }
  }

  /// A pair that trades an asset against itself can never be registered.
  pub fn is_degenerate(&self) -> bool {
    self.source == self.target
  }
}
