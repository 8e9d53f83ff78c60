//! DCA Manager Pallet
//!
//! Slot-scheduled dollar-cost-averaging engine. Deposits against a registered
//! trading pair are split into fixed-size purchase orders filed into future
//! slots. At settlement all orders of a (slot, pair) bucket are batched into a
//! single trade through the configured executor and every participant is
//! credited its pro-rata share of the proceeds.
//!
//! Settlement is driven externally: anyone may call `perform_upkeep`, which
//! advances the slot counter once a slot boundary has passed and then works
//! through the open slot pair by pair, bounded by the caller's budget. A trade
//! failure is contained to its pair and leaves the orders queued for retry.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub use pallet::*;

pub mod types;

#[cfg(test)]
pub mod mock;

#[cfg(feature = "runtime-benchmarks")]
mod benchmarking;

pub mod weights;
pub use weights::WeightInfo;

#[frame::pallet]
pub mod pallet {
  use super::WeightInfo;
  use crate::types::{PairInspector, PurchaseOrder, Strategy, TradeExecutor};
  use alloc::collections::BTreeMap;
  use alloc::vec::Vec;
  use frame::deps::{
    frame_support::{
      PalletId,
      storage::with_storage_layer,
      traits::{
        EnsureOrigin,
        fungibles::{Inspect as FungiblesInspect, Mutate as FungiblesMutate},
        tokens::Preservation,
      },
    },
    sp_runtime::{
      DispatchError, Permill,
      traits::{AccountIdConversion, One, SaturatedConversion, Zero},
    },
  };
  use frame::prelude::*;
  use polkadot_sdk::sp_core::U256;
  use primitives::{AssetId, Balance, PairId, Slot, params::SUPPORTED_INTERVALS};

  /// Configuration trait for the DCA manager pallet
  #[pallet::config]
  pub trait Config: frame_system::Config<RuntimeEvent: From<Event<Self>>> {
    /// The assets pallet holding source and target tokens
    type Assets: FungiblesInspect<Self::AccountId, AssetId = AssetId, Balance = Balance>
      + FungiblesMutate<Self::AccountId, AssetId = AssetId, Balance = Balance>;

    /// Read-only access to the pair registry
    type Pairs: PairInspector;

    /// Executes one aggregated trade per (slot, pair) bucket
    type Trader: TradeExecutor<Self::AccountId>;

    /// Origin allowed to change the fee rate and drain the treasury
    type AdminOrigin: EnsureOrigin<Self::RuntimeOrigin>;

    /// Pallet identifier, source of the custodial account
    #[pallet::constant]
    type PalletId: Get<PalletId>;

    /// Account receiving treasury withdrawals
    #[pallet::constant]
    type TreasuryAccount: Get<Self::AccountId>;

    /// Number of blocks that make up one purchase slot
    #[pallet::constant]
    type SlotDuration: Get<BlockNumberFor<Self>>;

    /// Exclusive upper bound for the protocol fee rate
    #[pallet::constant]
    type MaxFeeRate: Get<Permill>;

    /// Ceiling on scheduled purchases per strategy, top-ups included
    #[pallet::constant]
    type MaxPurchasesPerStrategy: Get<u32>;

    /// Capacity of one (slot, pair) order-book bucket
    #[pallet::constant]
    type MaxOrdersPerBucket: Get<u32>;

    /// Hard cap on work units a single `perform_upkeep` call may spend
    #[pallet::constant]
    type MaxUpkeepBudget: Get<u32>;

    /// Weight information for extrinsics in this pallet
    type WeightInfo: WeightInfo;

    /// Benchmark helper for creating assets, pairs and funded accounts
    #[cfg(feature = "runtime-benchmarks")]
    type BenchmarkHelper: crate::types::BenchmarkHelper<Self::AccountId>;
  }

  #[pallet::pallet]
  pub struct Pallet<T>(_);

  /// Live strategies, at most one per (account, pair)
  #[pallet::storage]
  #[pallet::getter(fn strategy)]
  pub type Strategies<T: Config> = StorageDoubleMap<
    _,
    Blake2_128Concat,
    T::AccountId,
    Twox64Concat,
    PairId,
    Strategy,
    OptionQuery,
  >;

  /// Slot-bucketed order book. Orders within a bucket keep insertion order,
  /// which fixes the payout order of any rounding remainder.
  #[pallet::storage]
  #[pallet::getter(fn purchase_orders)]
  pub type PurchaseOrders<T: Config> = StorageDoubleMap<
    _,
    Twox64Concat,
    Slot,
    Twox64Concat,
    PairId,
    BoundedVec<PurchaseOrder<T::AccountId>, T::MaxOrdersPerBucket>,
    ValueQuery,
  >;

  /// Latest slot opened for settlement. Slot 0 is the pre-launch state.
  #[pallet::storage]
  #[pallet::getter(fn purchase_slot)]
  pub type PurchaseSlot<T: Config> = StorageValue<_, Slot, ValueQuery>;

  /// Settlement in progress: the open slot and the next pair id to process
  #[pallet::storage]
  #[pallet::getter(fn pending_settlement)]
  pub type PendingSettlement<T: Config> = StorageValue<_, (Slot, PairId), OptionQuery>;

  /// Protocol fee taken from every deposit
  #[pallet::storage]
  #[pallet::getter(fn fee_rate)]
  pub type FeeRate<T: Config> = StorageValue<_, Permill, ValueQuery>;

  /// Accrued protocol fees per source asset, held by the pallet account
  #[pallet::storage]
  #[pallet::getter(fn treasury)]
  pub type Treasury<T: Config> = StorageMap<_, Blake2_128Concat, AssetId, Balance, ValueQuery>;

  /// Rounding remainders of pro-rata distributions per target asset. Kept
  /// for auditability, never redistributed.
  #[pallet::storage]
  #[pallet::getter(fn settlement_dust)]
  pub type SettlementDust<T: Config> =
    StorageMap<_, Blake2_128Concat, AssetId, Balance, ValueQuery>;

  #[pallet::event]
  #[pallet::generate_deposit(pub(super) fn deposit_event)]
  pub enum Event<T: Config> {
    /// A new strategy was created and its purchases filed
    StrategyInitiated { who: T::AccountId, next_slot: Slot },
    /// An existing strategy received additional funds
    StrategyToppedUp { who: T::AccountId, amount: Balance },
    /// Accumulated target proceeds were paid out
    Withdrawal { who: T::AccountId, amount: Balance },
    /// One pair's orders for one slot were traded
    TradeExecuted { slot: Slot, pair_id: PairId, amount_in: Balance, proceeds: Balance },
    /// A pair's trade failed, its orders stay queued for retry
    TradeFailed { slot: Slot, pair_id: PairId },
    /// Every pair of the slot has been settled
    SlotSettled { slot: Slot },
    /// The protocol fee rate was changed
    FeeUpdated { old_fee: Permill, new_fee: Permill },
    /// Accrued fees were paid out to the treasury account
    TreasuryWithdrawn { asset: AssetId, amount: Balance },
  }

  #[pallet::error]
  pub enum Error<T> {
    /// The pair id is not registered
    PairNotFound,
    /// The purchase interval is not one of the supported values
    UnsupportedInterval,
    /// The caller already runs a strategy on this pair
    StrategyAlreadyExists,
    /// The caller has no strategy on this pair
    NoSuchStrategy,
    /// The per-purchase amount must be greater than zero
    InvalidPurchaseAmount,
    /// The deposit is too small to schedule anything once the fee is taken
    AmountTooSmall,
    /// The schedule would exceed the per-strategy purchase ceiling
    TooManyPurchases,
    /// A (slot, pair) bucket is at capacity
    TooManyOrdersInBucket,
    /// The withdrawal exceeds the accumulated target balance
    InsufficientBalance,
    /// The withdrawal exceeds the accrued treasury for this asset
    InsufficientTreasury,
    /// The fee rate is not below the configured maximum
    FeeTooHigh,
    /// Arithmetic overflow
    ArithmeticOverflow,
  }

  #[pallet::call]
  impl<T: Config> Pallet<T> {
    /// Create a strategy on `pair_id`, funded with `deposit` of the source
    /// asset, buying `purchase_amount` per slot every `interval` slots.
    ///
    /// The fee is taken from the deposit up front. The net amount is split
    /// into `ceil(net / purchase_amount)` orders, the last one absorbing the
    /// remainder, starting one interval after the current purchase slot.
    #[pallet::call_index(0)]
    #[pallet::weight(T::WeightInfo::initiate_strategy())]
    pub fn initiate_strategy(
      origin: OriginFor<T>,
      pair_id: PairId,
      deposit: Balance,
      interval: Slot,
      purchase_amount: Balance,
    ) -> DispatchResult {
      let who = ensure_signed(origin)?;

      let pair = T::Pairs::pair(pair_id).ok_or(Error::<T>::PairNotFound)?;
      ensure!(SUPPORTED_INTERVALS.contains(&interval), Error::<T>::UnsupportedInterval);
      ensure!(!Strategies::<T>::contains_key(&who, pair_id), Error::<T>::StrategyAlreadyExists);
      ensure!(!purchase_amount.is_zero(), Error::<T>::InvalidPurchaseAmount);

      let (net, fee) = Self::split_fee(deposit);
      ensure!(!net.is_zero(), Error::<T>::AmountTooSmall);
      let purchases = Self::purchase_count(net, purchase_amount)?;

      let first_slot = PurchaseSlot::<T>::get()
        .checked_add(interval)
        .ok_or(Error::<T>::ArithmeticOverflow)?;

      // Custody first, then the schedule. A failed transfer must not leave
      // orders behind.
      T::Assets::transfer(
        pair.source,
        &who,
        &Self::account_id(),
        deposit,
        Preservation::Expendable,
      )?;
      Self::file_orders(&who, pair_id, first_slot, interval, net, purchase_amount, purchases)?;
      if !fee.is_zero() {
        Treasury::<T>::mutate(pair.source, |accrued| *accrued = accrued.saturating_add(fee));
      }

      Strategies::<T>::insert(
        &who,
        pair_id,
        Strategy {
          next_slot: first_slot,
          interval,
          purchase_amount,
          purchases_remaining: purchases,
          target_balance: 0,
        },
      );

      Self::deposit_event(Event::StrategyInitiated { who, next_slot: first_slot });
      Ok(())
    }

    /// Add funds to an existing strategy.
    ///
    /// The net amount is split at the strategy's purchase size and the new
    /// orders are appended strictly after every live order. A strategy whose
    /// purchases have all settled restarts one interval past the current
    /// purchase slot.
    #[pallet::call_index(1)]
    #[pallet::weight(T::WeightInfo::top_up_strategy())]
    pub fn top_up_strategy(origin: OriginFor<T>, pair_id: PairId, amount: Balance) -> DispatchResult {
      let who = ensure_signed(origin)?;

      let pair = T::Pairs::pair(pair_id).ok_or(Error::<T>::PairNotFound)?;
      let mut strategy =
        Strategies::<T>::get(&who, pair_id).ok_or(Error::<T>::NoSuchStrategy)?;

      let (net, fee) = Self::split_fee(amount);
      ensure!(!net.is_zero(), Error::<T>::AmountTooSmall);
      let extra = Self::purchase_count(net, strategy.purchase_amount)?;
      let combined = strategy
        .purchases_remaining
        .checked_add(extra)
        .ok_or(Error::<T>::ArithmeticOverflow)?;
      ensure!(combined <= T::MaxPurchasesPerStrategy::get(), Error::<T>::TooManyPurchases);

      let tail_offset = strategy
        .interval
        .checked_mul(strategy.purchases_remaining)
        .ok_or(Error::<T>::ArithmeticOverflow)?;
      let tail = strategy
        .next_slot
        .checked_add(tail_offset)
        .ok_or(Error::<T>::ArithmeticOverflow)?;
      let first_new = if strategy.purchases_remaining.is_zero() {
        let restart = PurchaseSlot::<T>::get()
          .checked_add(strategy.interval)
          .ok_or(Error::<T>::ArithmeticOverflow)?;
        let first = tail.max(restart);
        strategy.next_slot = first;
        first
      } else {
        tail
      };

      T::Assets::transfer(
        pair.source,
        &who,
        &Self::account_id(),
        amount,
        Preservation::Expendable,
      )?;
      Self::file_orders(
        &who,
        pair_id,
        first_new,
        strategy.interval,
        net,
        strategy.purchase_amount,
        extra,
      )?;
      if !fee.is_zero() {
        Treasury::<T>::mutate(pair.source, |accrued| *accrued = accrued.saturating_add(fee));
      }

      strategy.purchases_remaining = combined;
      Strategies::<T>::insert(&who, pair_id, strategy);

      Self::deposit_event(Event::StrategyToppedUp { who, amount });
      Ok(())
    }

    /// Advance settlement by at most `max_pairs` work units.
    ///
    /// Opening a due slot costs one unit, settling one non-empty pair costs
    /// one unit. The call is a harmless no-op when no slot boundary has
    /// passed and no settlement is pending. Anyone may call this.
    #[pallet::call_index(2)]
    #[pallet::weight(T::WeightInfo::perform_upkeep())]
    pub fn perform_upkeep(origin: OriginFor<T>, max_pairs: u32) -> DispatchResult {
      ensure_signed(origin)?;
      Self::do_upkeep(max_pairs.min(T::MaxUpkeepBudget::get()));
      Ok(())
    }

    /// Withdraw `amount` of the accumulated target balance on `pair_id`.
    ///
    /// The strategy record is deleted once both its target balance and its
    /// remaining purchases reach zero.
    #[pallet::call_index(3)]
    #[pallet::weight(T::WeightInfo::withdraw_target())]
    pub fn withdraw_target(origin: OriginFor<T>, pair_id: PairId, amount: Balance) -> DispatchResult {
      let who = ensure_signed(origin)?;

      let pair = T::Pairs::pair(pair_id).ok_or(Error::<T>::PairNotFound)?;
      let mut strategy =
        Strategies::<T>::get(&who, pair_id).ok_or(Error::<T>::NoSuchStrategy)?;
      ensure!(!amount.is_zero(), Error::<T>::AmountTooSmall);
      ensure!(amount <= strategy.target_balance, Error::<T>::InsufficientBalance);

      T::Assets::transfer(
        pair.target,
        &Self::account_id(),
        &who,
        amount,
        Preservation::Expendable,
      )?;

      strategy.target_balance = strategy.target_balance.saturating_sub(amount);
      if strategy.target_balance.is_zero() && strategy.purchases_remaining.is_zero() {
        Strategies::<T>::remove(&who, pair_id);
      } else {
        Strategies::<T>::insert(&who, pair_id, strategy);
      }

      Self::deposit_event(Event::Withdrawal { who, amount });
      Ok(())
    }

    /// Pay out accrued protocol fees to the treasury account. Admin only.
    #[pallet::call_index(4)]
    #[pallet::weight(T::WeightInfo::withdraw_treasury())]
    pub fn withdraw_treasury(origin: OriginFor<T>, asset: AssetId, amount: Balance) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;

      let accrued = Treasury::<T>::get(asset);
      ensure!(!amount.is_zero(), Error::<T>::AmountTooSmall);
      ensure!(amount <= accrued, Error::<T>::InsufficientTreasury);

      T::Assets::transfer(
        asset,
        &Self::account_id(),
        &T::TreasuryAccount::get(),
        amount,
        Preservation::Expendable,
      )?;
      Treasury::<T>::insert(asset, accrued.saturating_sub(amount));

      Self::deposit_event(Event::TreasuryWithdrawn { asset, amount });
      Ok(())
    }

    /// Set the protocol fee rate. Admin only. Applies to future deposits,
    /// already filed orders are unaffected.
    #[pallet::call_index(5)]
    #[pallet::weight(T::WeightInfo::set_fee())]
    pub fn set_fee(origin: OriginFor<T>, new_fee: Permill) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;

      ensure!(new_fee < T::MaxFeeRate::get(), Error::<T>::FeeTooHigh);

      let old_fee = FeeRate::<T>::get();
      FeeRate::<T>::put(new_fee);

      Self::deposit_event(Event::FeeUpdated { old_fee, new_fee });
      Ok(())
    }
  }

  impl<T: Config> Pallet<T> {
    /// Custodial account holding deposits, accrued fees and settled proceeds
    pub fn account_id() -> T::AccountId {
      T::PalletId::get().into_account_truncating()
    }

    /// True when `perform_upkeep` has work to do
    pub fn upkeep_due() -> bool {
      PendingSettlement::<T>::exists() || Self::slot_boundary_passed()
    }

    /// Remaining schedule of one strategy as (slot, amount) entries.
    ///
    /// Amounts are read from the order book itself, so the projection cannot
    /// diverge from what settlement will execute.
    pub fn purchase_schedule(who: &T::AccountId, pair_id: PairId) -> Vec<(Slot, Balance)> {
      let strategy = match Strategies::<T>::get(who, pair_id) {
        Some(strategy) => strategy,
        None => return Vec::new(),
      };
      let mut schedule = Vec::with_capacity(strategy.purchases_remaining as usize);
      for index in 0..strategy.purchases_remaining {
        let slot = strategy
          .next_slot
          .saturating_add(strategy.interval.saturating_mul(index));
        let amount = PurchaseOrders::<T>::get(slot, pair_id)
          .iter()
          .find(|order| &order.who == who)
          .map(|order| order.amount)
          .unwrap_or_default();
        schedule.push((slot, amount));
      }
      schedule
    }

    /// Aggregate order amounts of one slot per pair, ascending by pair id.
    /// Plain summation over the buckets, no scaling involved.
    pub fn accumulate_purchase_orders(slot: Slot) -> Vec<(PairId, Balance)> {
      let mut totals: BTreeMap<PairId, Balance> = BTreeMap::new();
      for (pair_id, orders) in PurchaseOrders::<T>::iter_prefix(slot) {
        let sum = orders
          .iter()
          .fold(Balance::zero(), |acc, order| acc.saturating_add(order.amount));
        totals.insert(pair_id, sum);
      }
      totals.into_iter().collect()
    }

    fn split_fee(gross: Balance) -> (Balance, Balance) {
      let fee = FeeRate::<T>::get().mul_floor(gross);
      (gross.saturating_sub(fee), fee)
    }

    /// Number of orders `net` splits into at `purchase_amount` stride.
    /// Callers guarantee a non-zero `purchase_amount`.
    fn purchase_count(net: Balance, purchase_amount: Balance) -> Result<u32, DispatchError> {
      let count: u32 = net
        .div_ceil(purchase_amount)
        .try_into()
        .map_err(|_| Error::<T>::TooManyPurchases)?;
      ensure!(count <= T::MaxPurchasesPerStrategy::get(), Error::<T>::TooManyPurchases);
      Ok(count)
    }

    /// Append `purchases` orders for `who` starting at `first_slot`, one
    /// per interval. The final order carries the division remainder.
    fn file_orders(
      who: &T::AccountId,
      pair_id: PairId,
      first_slot: Slot,
      interval: Slot,
      net: Balance,
      purchase_amount: Balance,
      purchases: u32,
    ) -> DispatchResult {
      let full_orders = purchases.saturating_sub(1);
      let last_amount =
        net.saturating_sub(Balance::from(full_orders).saturating_mul(purchase_amount));
      for index in 0..purchases {
        let offset = interval.checked_mul(index).ok_or(Error::<T>::ArithmeticOverflow)?;
        let slot = first_slot.checked_add(offset).ok_or(Error::<T>::ArithmeticOverflow)?;
        let amount = if index < full_orders { purchase_amount } else { last_amount };
        PurchaseOrders::<T>::try_mutate(slot, pair_id, |bucket| {
          bucket
            .try_push(PurchaseOrder { who: who.clone(), amount })
            .map_err(|_| Error::<T>::TooManyOrdersInBucket)
        })?;
      }
      Ok(())
    }

    fn elapsed_slots() -> Slot {
      let now = frame_system::Pallet::<T>::block_number();
      let duration = T::SlotDuration::get().max(One::one());
      (now / duration).saturated_into()
    }

    fn slot_boundary_passed() -> bool {
      Self::elapsed_slots() > PurchaseSlot::<T>::get()
    }

    /// Settlement driver. Spends at most `budget` work units: one to open a
    /// due slot, one per settled non-empty pair. Stops early on budget
    /// exhaustion or a failed trade, leaving the cursor on the unfinished
    /// pair.
    fn do_upkeep(mut budget: u32) {
      while budget > 0 {
        let (slot, cursor) = match PendingSettlement::<T>::get() {
          Some(open) => open,
          None => {
            if !Self::slot_boundary_passed() {
              return;
            }
            let slot = PurchaseSlot::<T>::get().saturating_add(1);
            PurchaseSlot::<T>::put(slot);
            budget -= 1;
            (slot, 1)
          }
        };

        let pair_count = T::Pairs::pair_count();
        let mut pair_id = cursor;
        while pair_id <= pair_count {
          if PurchaseOrders::<T>::contains_key(slot, pair_id) {
            if budget.is_zero() {
              PendingSettlement::<T>::put((slot, pair_id));
              return;
            }
            if !Self::settle_pair(slot, pair_id) {
              PendingSettlement::<T>::put((slot, pair_id));
              return;
            }
            budget -= 1;
          }
          pair_id = pair_id.saturating_add(1);
        }

        PendingSettlement::<T>::kill();
        Self::deposit_event(Event::SlotSettled { slot });
      }
    }

    /// Settle one (slot, pair) bucket inside its own storage layer. Returns
    /// whether the bucket was committed. On failure everything the layer
    /// touched rolls back and only the failure event survives.
    fn settle_pair(slot: Slot, pair_id: PairId) -> bool {
      let result = with_storage_layer::<(), DispatchError, _>(|| {
        let orders = PurchaseOrders::<T>::take(slot, pair_id);
        let total = orders
          .iter()
          .fold(Balance::zero(), |acc, order| acc.saturating_add(order.amount));
        if total.is_zero() {
          return Ok(());
        }

        let pair = T::Pairs::pair(pair_id).ok_or(Error::<T>::PairNotFound)?;
        let custodian = Self::account_id();
        let proceeds = T::Trader::execute_trade(&custodian, pair.source, pair.target, total)?;

        let mut distributed = Balance::zero();
        for order in &orders {
          let share = Self::pro_rata_share(proceeds, order.amount, total)?;
          distributed = distributed.saturating_add(share);
          Strategies::<T>::mutate(&order.who, pair_id, |maybe| {
            if let Some(strategy) = maybe {
              strategy.target_balance = strategy.target_balance.saturating_add(share);
              strategy.purchases_remaining = strategy.purchases_remaining.saturating_sub(1);
              strategy.next_slot = slot.saturating_add(strategy.interval);
            }
          });
        }

        let dust = proceeds.saturating_sub(distributed);
        if !dust.is_zero() {
          SettlementDust::<T>::mutate(pair.target, |kept| *kept = kept.saturating_add(dust));
        }

        Self::deposit_event(Event::TradeExecuted { slot, pair_id, amount_in: total, proceeds });
        Ok(())
      });

      match result {
        Ok(()) => true,
        Err(error) => {
          log::warn!(
            target: "runtime::dca-manager",
            "trade for pair {:?} in slot {:?} failed with {:?}, orders kept for retry",
            pair_id,
            slot,
            error,
          );
          Self::deposit_event(Event::TradeFailed { slot, pair_id });
          false
        }
      }
    }

    /// Truncating `proceeds * amount / total`. Widened through U256 so the
    /// intermediate product cannot overflow.
    fn pro_rata_share(
      proceeds: Balance,
      amount: Balance,
      total: Balance,
    ) -> Result<Balance, DispatchError> {
      let share = U256::from(proceeds)
        .saturating_mul(U256::from(amount))
        .checked_div(U256::from(total))
        .unwrap_or(U256::zero());
      if share > U256::from(Balance::MAX) {
        return Err(Error::<T>::ArithmeticOverflow.into());
      }
      Ok(share.as_u128())
    }
  }

  #[pallet::genesis_config]
  #[derive(frame::prelude::DefaultNoBound)]
  pub struct GenesisConfig<T: Config> {
    #[serde(skip)]
    pub _marker: core::marker::PhantomData<T>,
  }

  #[pallet::genesis_build]
  impl<T: Config> BuildGenesisConfig for GenesisConfig<T> {
    fn build(&self) {
      // Provider reference keeps the custodial account alive at zero native balance
      frame_system::Pallet::<T>::inc_providers(&Pallet::<T>::account_id());
    }
  }
}
