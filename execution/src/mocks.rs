//! Fixtures for tests: a default environment, a genesis builder and a small
//! pre-populated market.

use crate::{
    config::ExecutionConfig,
    context::Environment,
    external::{DerivedRegistry, ItemRow, ItemSheet},
    state::{Delta, Snapshot, State},
};
use anyhow::Result;
use bytes::Bytes;
use chronicle_types::{
    model::{AgentState, AvatarState, Item, ShopItem, ShopState},
    Action, Address, Buy, Currency,
};
use rand::{rngs::StdRng, RngCore, SeedableRng};
use std::cell::Cell;
use uuid::Uuid;

/// Sheet id of a tradable equipment row.
pub const TRADABLE_SHEET_ID: u32 = 10_100_000;

/// Sheet id of an untradable material row.
pub const UNTRADABLE_SHEET_ID: u32 = 40_100_000;

/// Price of the listing created by [`Market::new`], in whole gold units.
pub const LISTING_PRICE: u128 = 500;

/// Gold currency used across fixtures.
pub fn gold() -> Currency {
    Currency::new("NCG", 2)
}

/// Creates an agent address from a deterministic seed.
pub fn create_agent(seed: u64) -> Address {
    Address::from_material(&seed.to_be_bytes())
}

pub fn random_item(rng: &mut StdRng, sheet_id: u32) -> Item {
    let mut bytes = [0u8; 16];
    rng.fill_bytes(&mut bytes);
    Item {
        id: uuid::Builder::from_random_bytes(bytes).into_uuid(),
        sheet_id,
        level: 0,
    }
}

/// Configuration, tables and registry shared by a test.
pub struct Fixture {
    pub config: ExecutionConfig,
    pub items: ItemSheet,
    pub accounts: DerivedRegistry,
    pub gold: Currency,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new(ExecutionConfig::default())
    }
}

impl Fixture {
    pub fn new(config: ExecutionConfig) -> Self {
        let items = ItemSheet::new([
            ItemRow {
                id: TRADABLE_SHEET_ID,
                tradable: true,
            },
            ItemRow {
                id: UNTRADABLE_SHEET_ID,
                tradable: false,
            },
        ])
        .expect("fixture item rows have distinct ids");
        Self {
            accounts: DerivedRegistry::new(config.avatar_slots),
            config,
            items,
            gold: gold(),
        }
    }

    pub fn env(&self) -> Environment<'_> {
        Environment {
            config: &self.config,
            items: &self.items,
            accounts: &self.accounts,
        }
    }

    /// Builds a snapshot with the gold currency defined and an empty shop,
    /// then applies `build`.
    pub fn genesis(&self, build: impl FnOnce(&mut Delta<'_, Snapshot>)) -> Snapshot {
        let empty = Snapshot::default();
        let mut delta = Delta::new(&empty);
        delta
            .declare(&self.gold)
            .expect("empty snapshot accepts any declaration");
        delta.set_as(Address::GOLD_CURRENCY, &self.gold);
        delta.set_as(Address::SHOP, &ShopState::default());
        build(&mut delta);
        delta.commit()
    }

    /// Creates an agent with one avatar in slot 0 and returns the avatar address.
    pub fn create_avatar<S: State>(
        &self,
        delta: &mut Delta<'_, S>,
        agent: Address,
        cleared_stage: u32,
        items: impl IntoIterator<Item = Item>,
    ) -> Address {
        let mut agent_state = AgentState::new(agent);
        let address = agent_state.claim_slot(0);
        let mut avatar = AvatarState::new(address, agent, format!("avatar-{agent}"), 0);
        avatar.name.truncate(16);
        avatar.cleared_stage = cleared_stage;
        for item in items {
            avatar
                .inventory
                .add(item)
                .expect("fixture inventory exceeds capacity");
        }
        delta.set_as(agent, &agent_state);
        delta.set_as(address, &avatar);
        address
    }

    /// Credits `major` whole gold units to `address`.
    pub fn fund<S: State>(&self, delta: &mut Delta<'_, S>, address: &Address, major: u128) {
        if major > 0 {
            delta
                .mint(address, &self.gold.units(major))
                .expect("failed to mint fixture gold");
        }
    }
}

/// A buyer and a seller around one listing.
pub struct Market {
    pub snapshot: Snapshot,
    pub buyer: Address,
    pub buyer_avatar: Address,
    pub seller: Address,
    pub seller_avatar: Address,
    pub listing: ShopItem,
}

impl Market {
    /// Funds the buyer with `buyer_balance` whole gold units; the seller lists
    /// one tradable item for [`LISTING_PRICE`].
    pub fn new(fixture: &Fixture, buyer_balance: u128) -> Self {
        let mut rng = StdRng::seed_from_u64(buyer_balance as u64);
        let buyer = create_agent(1);
        let seller = create_agent(2);
        let stage = fixture.config.shop_required_stage;
        let item = random_item(&mut rng, TRADABLE_SHEET_ID);
        let listing = ShopItem {
            seller_agent: seller,
            seller_avatar: AgentState::avatar_address(&seller, 0),
            product_id: Uuid::from_u128(0x5eed),
            price: fixture.gold.units(LISTING_PRICE),
            item,
            registered_at: 0,
        };

        let mut buyer_avatar = Address::default();
        let mut seller_avatar = Address::default();
        let snapshot = fixture.genesis(|delta| {
            buyer_avatar = fixture.create_avatar(delta, buyer, stage, []);
            seller_avatar = fixture.create_avatar(delta, seller, stage, []);
            fixture.fund(delta, &buyer, buyer_balance);
            let mut shop = ShopState::default();
            shop.register(listing.clone())
                .expect("empty shop accepts the listing");
            delta.set_as(Address::SHOP, &shop);
        });

        Self {
            snapshot,
            buyer,
            buyer_avatar,
            seller,
            seller_avatar,
            listing,
        }
    }

    fn buy(&self) -> Buy {
        Buy {
            buyer_avatar: self.buyer_avatar,
            seller_agent: self.seller,
            seller_avatar: self.seller_avatar,
            product_id: self.listing.product_id,
        }
    }

    pub fn buy_action(&self) -> Action {
        Action::Buy(self.buy())
    }

    pub fn buy3_action(&self) -> Action {
        Action::Buy3(self.buy())
    }
}

/// Wraps a [`State`] and counts every read that reaches it.
pub struct CountingState<'a, S: State> {
    inner: &'a S,
    reads: Cell<usize>,
}

impl<'a, S: State> CountingState<'a, S> {
    pub fn new(inner: &'a S) -> Self {
        Self {
            inner,
            reads: Cell::new(0),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.get()
    }

    fn count(&self) {
        self.reads.set(self.reads.get() + 1);
    }
}

impl<'a, S: State> State for CountingState<'a, S> {
    fn get(&self, address: &Address) -> Result<Option<Bytes>> {
        self.count();
        self.inner.get(address)
    }

    fn balance(&self, address: &Address, currency: &Currency) -> Result<u128> {
        self.count();
        self.inner.balance(address, currency)
    }

    fn total_supply(&self, currency: &Currency) -> Result<u128> {
        self.count();
        self.inner.total_supply(currency)
    }

    fn precision(&self, ticker: &str) -> Result<Option<u8>> {
        self.count();
        self.inner.precision(ticker)
    }
}

/// A [`State`] whose every read fails, for exercising backend errors.
pub struct FailingState;

impl State for FailingState {
    fn get(&self, address: &Address) -> Result<Option<Bytes>> {
        anyhow::bail!("backend unavailable reading {address}")
    }

    fn balance(&self, address: &Address, _: &Currency) -> Result<u128> {
        anyhow::bail!("backend unavailable reading balance of {address}")
    }

    fn total_supply(&self, currency: &Currency) -> Result<u128> {
        anyhow::bail!("backend unavailable reading supply of {}", currency.ticker)
    }

    fn precision(&self, ticker: &str) -> Result<Option<u8>> {
        anyhow::bail!("backend unavailable reading declaration of {ticker}")
    }
}
