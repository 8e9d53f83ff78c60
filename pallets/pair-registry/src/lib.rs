//! Pair Registry Pallet
//!
//! Append-only registry of the trading pairs DCA strategies may be scheduled on.

#![cfg_attr(not(feature = "std"), no_std)]

pub use pallet::*;

pub mod weights;
pub use weights::WeightInfo;

/// Helper for benchmarking
#[cfg(feature = "runtime-benchmarks")]
pub trait BenchmarkHelper {
  fn create_asset(asset: primitives::AssetId) -> frame::deps::sp_runtime::DispatchResult;
}


#[cfg(feature = "runtime-benchmarks")]
mod benchmarking;

#[frame::pallet]
pub mod pallet {
  use super::WeightInfo;
  use frame::deps::{
    frame_support::traits::{EnsureOrigin, fungibles::Inspect},
    sp_runtime::DispatchResult,
  };
  use frame::prelude::*;
  use primitives::{AssetId, AssetPair, Balance, PairId};

  #[pallet::config]
  pub trait Config: frame_system::Config {
    /// Origin that can register trading pairs (e.g. Governance or Root)
    type RegistryOrigin: EnsureOrigin<Self::RuntimeOrigin>;

    /// Asset inspection, used to refuse pairs over assets that do not exist
    type Assets: Inspect<Self::AccountId, AssetId = AssetId, Balance = Balance>;

    type WeightInfo: WeightInfo;

    /// Benchmark-only setup for asset creation
    #[cfg(feature = "runtime-benchmarks")]
    type BenchmarkHelper: crate::BenchmarkHelper;
  }

  #[pallet::pallet]
  pub struct Pallet<T>(_);

  /// Registered pairs by sequential id.
  ///
  /// Append-only: entries are never mutated or removed, so a pair id that a
  /// strategy has once observed resolves for the lifetime of the chain.
  #[pallet::storage]
  #[pallet::getter(fn pair)]
  pub type Pairs<T: Config> = StorageMap<_, Twox64Concat, PairId, AssetPair, OptionQuery>;

  /// Reverse index from (source, target) to the assigned pair id.
  ///
  /// Direction-sensitive: (A, B) and (B, A) are distinct entries with
  /// distinct ids.
  #[pallet::storage]
  #[pallet::getter(fn pair_id)]
  pub type PairLookup<T: Config> =
    StorageDoubleMap<_, Blake2_128Concat, AssetId, Blake2_128Concat, AssetId, PairId, OptionQuery>;

  /// Number of pairs registered so far; equally the highest assigned id.
  /// Ids are 1-based, so `1..=pair_count()` enumerates every pair.
  #[pallet::storage]
  #[pallet::getter(fn pair_count)]
  pub type PairCount<T: Config> = StorageValue<_, PairId, ValueQuery>;

  #[pallet::event]
  #[pallet::generate_deposit(pub(super) fn deposit_event)]
  pub enum Event<T: Config> {
    /// A trading pair has been registered.
    PairRegistered {
      pair_id: PairId,
      source: AssetId,
      target: AssetId,
    },
  }

  #[pallet::error]
  pub enum Error<T> {
    /// A pair must trade two different assets.
    IdenticalAssets,
    /// One of the assets is not known to the asset system.
    UnknownAsset,
    /// The pair id space is exhausted.
    ArithmeticOverflow,
  }

  #[pallet::call]
  impl<T: Config> Pallet<T> {
    /// Register the ordered pair (`source`, `target`).
    ///
    /// Assigns the next sequential id and persists the pair. Registering a
    /// direction that already exists is a successful no-op keeping the
    /// original id; the opposite direction is a separate pair.
    ///
    /// - `origin`: Must match `RegistryOrigin`.
    /// - `source`: Asset strategy holders deposit and spend.
    /// - `target`: Asset purchased at settlement.
    #[pallet::call_index(0)]
    #[pallet::weight(T::WeightInfo::register_pair())]
    pub fn register_pair(origin: OriginFor<T>, source: AssetId, target: AssetId) -> DispatchResult {
      T::RegistryOrigin::ensure_origin(origin)?;
      // 1. Reject a pair of an asset against itself
      ensure!(source != target, Error::<T>::IdenticalAssets);
      // 2. Both sides must exist before purchases can be scheduled on them
      ensure!(T::Assets::asset_exists(source), Error::<T>::UnknownAsset);
      ensure!(T::Assets::asset_exists(target), Error::<T>::UnknownAsset);
      // 3. Idempotent: a known direction keeps its id, no event
      if PairLookup::<T>::contains_key(source, target) {
        return Ok(());
      }
      // 4. Assign the next sequential id (1-based; 0 is never valid)
      let pair_id = PairCount::<T>::get()
        .checked_add(1)
        .ok_or(Error::<T>::ArithmeticOverflow)?;
      // 5. Persist pair and reverse index
      Pairs::<T>::insert(pair_id, AssetPair::new(source, target));
      PairLookup::<T>::insert(source, target, pair_id);
      PairCount::<T>::put(pair_id);
      // 6. Emit Event
      Self::deposit_event(Event::PairRegistered {
        pair_id,
        source,
        target,
      });
      Ok(())
    }
  }
}
