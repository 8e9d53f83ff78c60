use crate as pallet_dca_manager;

use crate::types::{PairInspector, TradeExecutor};
use polkadot_sdk::frame_support::traits::fungibles::Mutate;
use polkadot_sdk::frame_support::traits::tokens::{Fortitude, Precision, Preservation};
use polkadot_sdk::frame_support::{
  PalletId, construct_runtime, derive_impl,
  traits::{AsEnsureOriginWithArg, ConstU32, ConstU64, ConstU128, Get},
};
use polkadot_sdk::frame_system::{self, EnsureRoot, EnsureSigned};
use polkadot_sdk::sp_runtime::{
  BuildStorage, DispatchError, Permill,
  testing::H256,
  traits::{BlakeTwo256, IdentityLookup},
};
use primitives::{AssetId, AssetPair, Balance as DcaBalance, PairId};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

type Block = frame_system::mocking::MockBlock<Test>;
type Balance = u128;
type AccountId = u64;

// State containers for the stateful trade mock
thread_local! {
    // Exchange rates: (source, target) -> (numerator, denominator).
    // Unset pairs trade 1:1.
    pub static TRADE_RATES: RefCell<BTreeMap<(AssetId, AssetId), (u128, u128)>> =
      const { RefCell::new(BTreeMap::new()) };

    // Asset pairs whose trades currently fail
    pub static FAILING_PAIRS: RefCell<BTreeSet<(AssetId, AssetId)>> =
      const { RefCell::new(BTreeSet::new()) };

    // Log of executed trades: (source, target, amount_in, proceeds)
    pub static EXECUTED_TRADES: RefCell<Vec<(AssetId, AssetId, u128, u128)>> =
      const { RefCell::new(Vec::new()) };
}

// Helper methods to set up mock state
pub fn set_trade_rate(source: AssetId, target: AssetId, numerator: u128, denominator: u128) {
  TRADE_RATES.with(|rates| rates.borrow_mut().insert((source, target), (numerator, denominator)));
}

pub fn fail_trades_for(source: AssetId, target: AssetId) {
  FAILING_PAIRS.with(|failing| failing.borrow_mut().insert((source, target)));
}

pub fn clear_trade_failure(source: AssetId, target: AssetId) {
  FAILING_PAIRS.with(|failing| failing.borrow_mut().remove(&(source, target)));
}

pub fn executed_trades() -> Vec<(AssetId, AssetId, u128, u128)> {
  EXECUTED_TRADES.with(|trades| trades.borrow().clone())
}

construct_runtime!(
  pub struct Test {
    System: frame_system,
    Balances: polkadot_sdk::pallet_balances,
    Assets: polkadot_sdk::pallet_assets,
    PairRegistry: pallet_pair_registry,
    DcaManager: pallet_dca_manager,
  }
);

#[derive_impl(frame_system::config_preludes::TestDefaultConfig)]
impl frame_system::Config for Test {
  type Block = Block;
  type AccountId = AccountId;
  type Lookup = IdentityLookup<Self::AccountId>;
  type Hash = H256;
  type Hashing = BlakeTwo256;
  type AccountData = polkadot_sdk::pallet_balances::AccountData<Balance>;
}

impl polkadot_sdk::pallet_balances::Config for Test {
  type MaxLocks = ();
  type MaxReserves = ();
  type ReserveIdentifier = [u8; 8];
  type Balance = Balance;
  type DustRemoval = ();
  type RuntimeEvent = RuntimeEvent;
  type ExistentialDeposit = ConstU128<1>;
  type AccountStore = System;
  type WeightInfo = ();
  type FreezeIdentifier = ();
  type MaxFreezes = ();
  type RuntimeHoldReason = ();
  type RuntimeFreezeReason = ();
  type DoneSlashHandler = ();
}

impl polkadot_sdk::pallet_assets::Config for Test {
  type RuntimeEvent = RuntimeEvent;
  type Balance = Balance;
  type AssetId = u32;
  type AssetIdParameter = u32;
  type Currency = Balances;
  type CreateOrigin = AsEnsureOriginWithArg<EnsureSigned<AccountId>>;
  type ForceOrigin = EnsureRoot<AccountId>;
  type AssetDeposit = ConstU128<1>;
  type AssetAccountDeposit = ConstU128<1>;
  type MetadataDepositBase = ConstU128<1>;
  type MetadataDepositPerByte = ConstU128<1>;
  type ApprovalDeposit = ConstU128<1>;
  type StringLimit = ConstU32<50>;
  type Freezer = ();
  type Extra = ();
  type ReserveData = ();
  type CallbackHandle = ();
  type WeightInfo = ();
  type RemoveItemsLimit = ConstU32<5>;
  type Holder = ();
  #[cfg(feature = "runtime-benchmarks")]
  type BenchmarkHelper = ();
}

impl pallet_pair_registry::Config for Test {
  type RegistryOrigin = EnsureRoot<AccountId>;
  type Assets = Assets;
  type WeightInfo = ();
  #[cfg(feature = "runtime-benchmarks")]
  type BenchmarkHelper = RegistryBenchmarkHelper;
}

#[cfg(feature = "runtime-benchmarks")]
pub struct RegistryBenchmarkHelper;

#[cfg(feature = "runtime-benchmarks")]
impl pallet_pair_registry::BenchmarkHelper for RegistryBenchmarkHelper {
  fn create_asset(asset: AssetId) -> polkadot_sdk::sp_runtime::DispatchResult {
    let _ = Assets::force_create(RuntimeOrigin::root(), asset, 1, true, 1);
    Ok(())
  }
}

/// Glue between the DCA manager and the pair registry pallet
pub struct RegistryAdapter;
impl PairInspector for RegistryAdapter {
  fn pair(pair_id: PairId) -> Option<AssetPair> {
    PairRegistry::pair(pair_id)
  }

  fn pair_count() -> PairId {
    PairRegistry::pair_count()
  }
}

/// Rate-table trader operating on the custodial account's asset balances
pub struct MockTrader;
impl TradeExecutor<AccountId> for MockTrader {
  fn execute_trade(
    who: &AccountId,
    source: AssetId,
    target: AssetId,
    amount_in: DcaBalance,
  ) -> Result<DcaBalance, DispatchError> {
    if FAILING_PAIRS.with(|failing| failing.borrow().contains(&(source, target))) {
      return Err(DispatchError::Other("trade venue unavailable"));
    }
    let (numerator, denominator) = TRADE_RATES
      .with(|rates| rates.borrow().get(&(source, target)).copied())
      .unwrap_or((1, 1));
    let proceeds = amount_in.saturating_mul(numerator) / denominator.max(1);

    <Assets as Mutate<AccountId>>::burn_from(
      source,
      who,
      amount_in,
      Preservation::Expendable,
      Precision::Exact,
      Fortitude::Polite,
    )?;
    if proceeds > 0 {
      <Assets as Mutate<AccountId>>::mint_into(target, who, proceeds)?;
    }

    EXECUTED_TRADES.with(|trades| trades.borrow_mut().push((source, target, amount_in, proceeds)));
    Ok(proceeds)
  }
}

pub struct DcaPalletIdStub;
impl Get<PalletId> for DcaPalletIdStub {
  fn get() -> PalletId {
    PalletId(*primitives::pallet_ids::DCA_MANAGER_PALLET_ID)
  }
}

pub struct MaxFeeRateStub;
impl Get<Permill> for MaxFeeRateStub {
  fn get() -> Permill {
    primitives::params::DCA_MAX_FEE_RATE
  }
}

impl pallet_dca_manager::Config for Test {
  type Assets = Assets;
  type Pairs = RegistryAdapter;
  type Trader = MockTrader;
  type AdminOrigin = EnsureRoot<AccountId>;
  type PalletId = DcaPalletIdStub;
  type TreasuryAccount = ConstU64<777>;
  type SlotDuration = ConstU64<10>;
  type MaxFeeRate = MaxFeeRateStub;
  type MaxPurchasesPerStrategy = ConstU32<50>;
  type MaxOrdersPerBucket = ConstU32<16>;
  type MaxUpkeepBudget = ConstU32<64>;
  type WeightInfo = ();
  #[cfg(feature = "runtime-benchmarks")]
  type BenchmarkHelper = DcaBenchmarkHelper;
}

#[cfg(feature = "runtime-benchmarks")]
pub struct DcaBenchmarkHelper;

#[cfg(feature = "runtime-benchmarks")]
impl crate::types::BenchmarkHelper<AccountId> for DcaBenchmarkHelper {
  fn create_asset(asset: AssetId) -> polkadot_sdk::sp_runtime::DispatchResult {
    let _ = Assets::force_create(RuntimeOrigin::root(), asset, 1, true, 1);
    Ok(())
  }

  fn register_pair(source: AssetId, target: AssetId) -> polkadot_sdk::sp_runtime::DispatchResult {
    PairRegistry::register_pair(RuntimeOrigin::root(), source, target)
  }

  fn fund_account(
    who: &AccountId,
    asset: AssetId,
    amount: DcaBalance,
  ) -> polkadot_sdk::sp_runtime::DispatchResult {
    Assets::mint_into(asset, who, amount)?;
    Ok(())
  }
}

/// Asset ids pre-created by `new_test_ext`
pub const USDC: u32 = 10;
pub const WETH: u32 = 20;
pub const WBTC: u32 = 30;

/// Test accounts. 1 to 5 hold 1_000_000 of every asset, 777 is the treasury.
pub const ALICE: u64 = 1;
pub const BOB: u64 = 2;
pub const CHARLIE: u64 = 3;
pub const DAVE: u64 = 4;
pub const EVE: u64 = 5;
pub const TREASURY: u64 = 777;
pub const KEEPER: u64 = 9;

pub const INITIAL_FUNDS: u128 = 1_000_000;

/// Register (source, target) through the registry and return its pair id
pub fn register_pair(source: AssetId, target: AssetId) -> PairId {
  PairRegistry::register_pair(RuntimeOrigin::root(), source, target)
    .expect("pair registration succeeds");
  PairRegistry::pair_id(source, target).expect("registered pair has an id")
}

/// Advance the chain far enough that `count` more slots are due
pub fn enter_slot(count: u64) {
  let duration: u64 = <Test as pallet_dca_manager::Config>::SlotDuration::get();
  let target = u64::from(DcaManager::purchase_slot())
    .saturating_add(count)
    .saturating_mul(duration);
  System::set_block_number(target);
}

pub fn new_test_ext() -> polkadot_sdk::sp_io::TestExternalities {
  let mut t = frame_system::GenesisConfig::<Test>::default()
    .build_storage()
    .unwrap();

  polkadot_sdk::pallet_balances::GenesisConfig::<Test> {
    balances: vec![(ALICE, 1_000), (BOB, 1_000), (KEEPER, 1_000)],
    dev_accounts: None,
  }
  .assimilate_storage(&mut t)
  .unwrap();

  // Pallet account gets its provider reference
  pallet_dca_manager::GenesisConfig::<Test>::default()
    .assimilate_storage(&mut t)
    .unwrap();

  // Reset trade mock state
  TRADE_RATES.with(|rates| rates.borrow_mut().clear());
  FAILING_PAIRS.with(|failing| failing.borrow_mut().clear());
  EXECUTED_TRADES.with(|trades| trades.borrow_mut().clear());

  let mut ext: polkadot_sdk::sp_io::TestExternalities = t.into();
  ext.execute_with(|| {
    System::set_block_number(1);
    for asset in [USDC, WETH, WBTC] {
      let _ = Assets::force_create(RuntimeOrigin::root(), asset, 1, true, 1);
      for account in [ALICE, BOB, CHARLIE, DAVE, EVE] {
        let _ = Assets::mint_into(asset, &account, INITIAL_FUNDS);
      }
    }
  });
  ext
}
