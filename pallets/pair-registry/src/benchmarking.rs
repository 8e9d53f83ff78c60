use crate::*;
use polkadot_sdk::frame_benchmarking::v2::*;
use polkadot_sdk::frame_system::RawOrigin;

#[benchmarks]
mod benches {
  use super::*;

  #[benchmark]
  fn register_pair() {
    T::BenchmarkHelper::create_asset(10).expect("asset setup failed");
    T::BenchmarkHelper::create_asset(20).expect("asset setup failed");

    #[extrinsic_call]
    register_pair(RawOrigin::Root, 10, 20);

    assert_eq!(PairCount::<T>::get(), 1);
  }

  #[cfg(test)]
  use crate::mock::{Test, new_test_ext};
  #[cfg(test)]
  impl_benchmark_test_suite!(Pallet, new_test_ext(), Test);
}
