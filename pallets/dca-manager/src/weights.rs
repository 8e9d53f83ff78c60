#![cfg_attr(rustfmt, rustfmt_skip)]
#![allow(unused_parens)]
#![allow(unused_imports)]
#![allow(missing_docs)]

use polkadot_sdk::frame_support::{traits::Get, weights::{Weight, constants::RocksDbWeight}};
use core::marker::PhantomData;

pub trait WeightInfo {
	fn initiate_strategy() -> Weight;
	fn top_up_strategy() -> Weight;
	fn perform_upkeep() -> Weight;
	fn withdraw_target() -> Weight;
	fn withdraw_treasury() -> Weight;
	fn set_fee() -> Weight;
}

pub struct SubstrateWeight<T>(PhantomData<T>);
impl<T: polkadot_sdk::frame_system::Config> WeightInfo for SubstrateWeight<T> {
	fn initiate_strategy() -> Weight {
		Weight::from_parts(80_000_000, 6000)
			.saturating_add(T::DbWeight::get().reads(6))
			.saturating_add(T::DbWeight::get().writes(8))
	}
	fn top_up_strategy() -> Weight {
		Weight::from_parts(80_000_000, 6000)
			.saturating_add(T::DbWeight::get().reads(6))
			.saturating_add(T::DbWeight::get().writes(8))
	}
	fn perform_upkeep() -> Weight {
		Weight::from_parts(250_000_000, 12000)
			.saturating_add(T::DbWeight::get().reads(16))
			.saturating_add(T::DbWeight::get().writes(16))
	}
	fn withdraw_target() -> Weight {
		Weight::from_parts(60_000_000, 4000)
			.saturating_add(T::DbWeight::get().reads(4))
			.saturating_add(T::DbWeight::get().writes(4))
	}
	fn withdraw_treasury() -> Weight {
		Weight::from_parts(50_000_000, 4000)
			.saturating_add(T::DbWeight::get().reads(3))
			.saturating_add(T::DbWeight::get().writes(3))
	}
	fn set_fee() -> Weight {
		Weight::from_parts(15_000_000, 1000)
			.saturating_add(T::DbWeight::get().reads(1))
			.saturating_add(T::DbWeight::get().writes(1))
	}
}

impl WeightInfo for () {
	fn initiate_strategy() -> Weight {
		Weight::from_parts(80_000_000, 6000)
	}
	fn top_up_strategy() -> Weight {
		Weight::from_parts(80_000_000, 6000)
	}
	fn perform_upkeep() -> Weight {
		Weight::from_parts(250_000_000, 12000)
	}
	fn withdraw_target() -> Weight {
		Weight::from_parts(60_000_000, 4000)
	}
	fn withdraw_treasury() -> Weight {
		Weight::from_parts(50_000_000, 4000)
	}
	fn set_fee() -> Weight {
		Weight::from_parts(15_000_000, 1000)
	}
}
