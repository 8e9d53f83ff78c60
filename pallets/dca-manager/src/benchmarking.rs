use crate::*;
use polkadot_sdk::frame_benchmarking::v2::*;
use polkadot_sdk::frame_system::RawOrigin;
use primitives::{AssetId, Balance};

const SOURCE: AssetId = 10;
const TARGET: AssetId = 20;
const FUNDS: Balance = 1_000_000;

fn setup_funded_pair<T: Config>(caller: &T::AccountId) {
  T::BenchmarkHelper::create_asset(SOURCE).expect("Failed to create source asset");
  T::BenchmarkHelper::create_asset(TARGET).expect("Failed to create target asset");
  T::BenchmarkHelper::register_pair(SOURCE, TARGET).expect("Failed to register pair");
  T::BenchmarkHelper::fund_account(caller, SOURCE, FUNDS).expect("Failed to fund caller");
}

#[benchmarks]
mod benches {
  use super::*;

  #[benchmark]
  fn initiate_strategy() {
    let caller: T::AccountId = whitelisted_caller();
    setup_funded_pair::<T>(&caller);

    #[extrinsic_call]
    initiate_strategy(RawOrigin::Signed(caller.clone()), 1, 100_000, 7, 10_000);

    assert_eq!(Strategies::<T>::get(&caller, 1).map(|s| s.purchases_remaining), Some(10));
  }

  #[benchmark]
  fn top_up_strategy() {
    let caller: T::AccountId = whitelisted_caller();
    setup_funded_pair::<T>(&caller);
    Pallet::<T>::initiate_strategy(
      RawOrigin::Signed(caller.clone()).into(),
      1,
      100_000,
      7,
      10_000,
    )
    .expect("Failed to initiate strategy");

    #[extrinsic_call]
    top_up_strategy(RawOrigin::Signed(caller.clone()), 1, 50_000);

    assert_eq!(Strategies::<T>::get(&caller, 1).map(|s| s.purchases_remaining), Some(15));
  }

  #[benchmark]
  fn perform_upkeep() {
    let caller: T::AccountId = whitelisted_caller();
    setup_funded_pair::<T>(&caller);
    Pallet::<T>::initiate_strategy(RawOrigin::Signed(caller.clone()).into(), 1, 100_000, 1, 10_000)
      .expect("Failed to initiate strategy");

    let duration = T::SlotDuration::get();
    polkadot_sdk::frame_system::Pallet::<T>::set_block_number(duration + duration);

    #[extrinsic_call]
    perform_upkeep(RawOrigin::Signed(caller), 16);

    // The slot counter moves even when the trade itself is retried later
    assert!(PurchaseSlot::<T>::get() > 0);
  }

  #[benchmark]
  fn withdraw_target() {
    let caller: T::AccountId = whitelisted_caller();
    setup_funded_pair::<T>(&caller);
    Pallet::<T>::initiate_strategy(
      RawOrigin::Signed(caller.clone()).into(),
      1,
      100_000,
      7,
      10_000,
    )
    .expect("Failed to initiate strategy");

    // Credit settled proceeds directly so the payout path is exercised alone
    Strategies::<T>::mutate(&caller, 1, |maybe| {
      if let Some(strategy) = maybe {
        strategy.target_balance = 5_000;
      }
    });
    T::BenchmarkHelper::fund_account(&Pallet::<T>::account_id(), TARGET, 5_000)
      .expect("Failed to fund custody");

    #[extrinsic_call]
    withdraw_target(RawOrigin::Signed(caller.clone()), 1, 5_000);

    assert_eq!(Strategies::<T>::get(&caller, 1).map(|s| s.target_balance), Some(0));
  }

  #[benchmark]
  fn withdraw_treasury() {
    let caller: T::AccountId = whitelisted_caller();
    setup_funded_pair::<T>(&caller);
    Treasury::<T>::insert(SOURCE, 1_000);
    T::BenchmarkHelper::fund_account(&Pallet::<T>::account_id(), SOURCE, 1_000)
      .expect("Failed to fund custody");

    #[extrinsic_call]
    withdraw_treasury(RawOrigin::Root, SOURCE, 1_000);

    assert_eq!(Treasury::<T>::get(SOURCE), 0);
  }

  #[benchmark]
  fn set_fee() {
    let new_fee = polkadot_sdk::sp_runtime::Permill::from_parts(3_500);

    #[extrinsic_call]
    set_fee(RawOrigin::Root, new_fee);

    assert_eq!(FeeRate::<T>::get(), new_fee);
  }

  #[cfg(test)]
  use crate::mock::{Test, new_test_ext};
  #[cfg(test)]
  impl_benchmark_test_suite!(Pallet, new_test_ext(), Test);
}
