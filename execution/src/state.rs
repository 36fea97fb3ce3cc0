use anyhow::Result;
use bytes::{Buf, BufMut, Bytes};
use chronicle_types::{
    constants::MAX_VALUE_LENGTH, ActionError, Address, Currency, FungibleAssetValue,
};
use commonware_codec::{
    DecodeExt as _, Encode, EncodeSize, Error, FixedSize, Read, ReadExt, Write,
};
use commonware_cryptography::{
    sha256::{Digest, Sha256},
    Hasher,
};
use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet},
};
use thiserror::Error as ThisError;

/// Read access to address-keyed state and the fungible asset ledger.
///
/// Implemented by committed [`Snapshot`]s and by [`Delta`]s, so overlays can be
/// stacked on either. Errors are infrastructure failures of the backend, not
/// domain failures.
pub trait State {
    fn get(&self, address: &Address) -> Result<Option<Bytes>>;
    fn balance(&self, address: &Address, currency: &Currency) -> Result<u128>;
    fn total_supply(&self, currency: &Currency) -> Result<u128>;
    /// Declared decimal places of the currency with `ticker`, if any.
    fn precision(&self, ticker: &str) -> Result<Option<u8>>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Status {
    Update(Bytes),
    Delete,
}

impl Write for Status {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Status::Update(value) => {
                0u8.write(writer);
                (value.len() as u32).write(writer);
                writer.put_slice(value);
            }
            Status::Delete => 1u8.write(writer),
        }
    }
}

impl Read for Status {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let kind = u8::read(reader)?;
        match kind {
            0 => {
                let len = u32::read(reader)? as usize;
                if len > MAX_VALUE_LENGTH {
                    return Err(Error::Invalid("Status", "value too long"));
                }
                if reader.remaining() < len {
                    return Err(Error::EndOfBuffer);
                }
                Ok(Status::Update(reader.copy_to_bytes(len)))
            }
            1 => Ok(Status::Delete),
            _ => Err(Error::InvalidEnum(kind)),
        }
    }
}

impl EncodeSize for Status {
    fn encode_size(&self) -> usize {
        1 + match self {
            Status::Update(value) => u32::SIZE + value.len(),
            Status::Delete => 0,
        }
    }
}

/// Two change sets wrote the same key.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum MergeConflict {
    #[error("both change sets write state at {0}")]
    State(Address),
    #[error("both change sets write the {1} balance of {0}")]
    Balance(Address, Currency),
    #[error("both change sets write the {0} supply")]
    Supply(Currency),
    #[error("both change sets declare {0}")]
    Declaration(String),
}

/// Pending writes of a [`Delta`].
///
/// Balances and supplies hold the resulting absolute amounts, not
/// differences, so applying a change set is idempotent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Changes {
    pub states: BTreeMap<Address, Status>,
    pub balances: BTreeMap<(Address, Currency), u128>,
    pub supplies: BTreeMap<Currency, u128>,
    /// Newly declared currencies, by ticker.
    pub declarations: BTreeMap<String, u8>,
}

impl Changes {
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
            && self.balances.is_empty()
            && self.supplies.is_empty()
            && self.declarations.is_empty()
    }

    /// Every address with a state or balance write.
    pub fn addresses(&self) -> BTreeSet<Address> {
        self.states
            .keys()
            .copied()
            .chain(self.balances.keys().map(|(address, _)| *address))
            .collect()
    }

    /// Folds `other` into `self`. Fails without modifying `self` if any key is
    /// written by both.
    pub fn merge(&mut self, other: Changes) -> Result<(), MergeConflict> {
        if let Some(address) = other.states.keys().find(|a| self.states.contains_key(a)) {
            return Err(MergeConflict::State(*address));
        }
        if let Some((address, currency)) =
            other.balances.keys().find(|k| self.balances.contains_key(k))
        {
            return Err(MergeConflict::Balance(*address, currency.clone()));
        }
        if let Some(currency) = other.supplies.keys().find(|c| self.supplies.contains_key(c)) {
            return Err(MergeConflict::Supply(currency.clone()));
        }
        if let Some(ticker) = other
            .declarations
            .keys()
            .find(|t| self.declarations.contains_key(*t))
        {
            return Err(MergeConflict::Declaration(ticker.clone()));
        }
        self.states.extend(other.states);
        self.balances.extend(other.balances);
        self.supplies.extend(other.supplies);
        self.declarations.extend(other.declarations);
        Ok(())
    }

    /// Overwrites `self` with every write in `later`.
    fn absorb(&mut self, later: Changes) {
        self.states.extend(later.states);
        self.balances.extend(later.balances);
        self.supplies.extend(later.supplies);
        self.declarations.extend(later.declarations);
    }
}

impl Write for Changes {
    fn write(&self, writer: &mut impl BufMut) {
        (self.states.len() as u32).write(writer);
        for (address, status) in &self.states {
            address.write(writer);
            status.write(writer);
        }
        (self.balances.len() as u32).write(writer);
        for ((address, currency), amount) in &self.balances {
            address.write(writer);
            currency.write(writer);
            amount.write(writer);
        }
        (self.supplies.len() as u32).write(writer);
        for (currency, amount) in &self.supplies {
            currency.write(writer);
            amount.write(writer);
        }
        (self.declarations.len() as u32).write(writer);
        for (ticker, decimal_places) in &self.declarations {
            Currency::new(ticker.as_str(), *decimal_places).write(writer);
        }
    }
}

impl Read for Changes {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let mut changes = Changes::default();
        for _ in 0..u32::read(reader)? {
            let address = Address::read(reader)?;
            let status = Status::read(reader)?;
            if changes.states.keys().next_back() >= Some(&address) {
                return Err(Error::Invalid("Changes", "states not sorted"));
            }
            changes.states.insert(address, status);
        }
        for _ in 0..u32::read(reader)? {
            let key = (Address::read(reader)?, Currency::read(reader)?);
            let amount = u128::read(reader)?;
            if changes.balances.keys().next_back() >= Some(&key) {
                return Err(Error::Invalid("Changes", "balances not sorted"));
            }
            changes.balances.insert(key, amount);
        }
        for _ in 0..u32::read(reader)? {
            let currency = Currency::read(reader)?;
            let amount = u128::read(reader)?;
            if changes.supplies.keys().next_back() >= Some(&currency) {
                return Err(Error::Invalid("Changes", "supplies not sorted"));
            }
            changes.supplies.insert(currency, amount);
        }
        for _ in 0..u32::read(reader)? {
            let Currency {
                ticker,
                decimal_places,
            } = Currency::read(reader)?;
            if changes.declarations.keys().next_back() >= Some(&ticker) {
                return Err(Error::Invalid("Changes", "declarations not sorted"));
            }
            changes.declarations.insert(ticker, decimal_places);
        }
        Ok(changes)
    }
}

impl EncodeSize for Changes {
    fn encode_size(&self) -> usize {
        u32::SIZE * 4
            + self
                .states
                .values()
                .map(|status| Address::SIZE + status.encode_size())
                .sum::<usize>()
            + self
                .balances
                .keys()
                .map(|(_, currency)| Address::SIZE + currency.encode_size() + u128::SIZE)
                .sum::<usize>()
            + self
                .supplies
                .keys()
                .map(|currency| currency.encode_size() + u128::SIZE)
                .sum::<usize>()
            + self
                .declarations
                .iter()
                .map(|(ticker, decimal_places)| {
                    Currency::new(ticker.as_str(), *decimal_places).encode_size()
                })
                .sum::<usize>()
    }
}

/// An immutable committed state.
///
/// Absent keys and empty values are distinct. Zero balances and supplies are
/// not stored, so two snapshots with the same observable contents compare
/// equal and share a [`Snapshot::root`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    states: BTreeMap<Address, Bytes>,
    balances: BTreeMap<(Address, Currency), u128>,
    supplies: BTreeMap<Currency, u128>,
    currencies: BTreeMap<String, u8>,
}

impl Snapshot {
    /// Returns a new snapshot with `changes` folded in. `self` is untouched.
    pub fn apply(&self, changes: &Changes) -> Snapshot {
        let mut next = self.clone();
        for (address, status) in &changes.states {
            match status {
                Status::Update(value) => {
                    next.states.insert(*address, value.clone());
                }
                Status::Delete => {
                    next.states.remove(address);
                }
            }
        }
        for (key, amount) in &changes.balances {
            if *amount == 0 {
                next.balances.remove(key);
            } else {
                next.balances.insert(key.clone(), *amount);
            }
        }
        for (currency, amount) in &changes.supplies {
            if *amount == 0 {
                next.supplies.remove(currency);
            } else {
                next.supplies.insert(currency.clone(), *amount);
            }
        }
        next.currencies.extend(
            changes
                .declarations
                .iter()
                .map(|(ticker, places)| (ticker.clone(), *places)),
        );
        next
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Commitment over every entry in key order.
    pub fn root(&self) -> Digest {
        let mut hasher = Sha256::new();
        for (address, value) in &self.states {
            hasher.update(&[0]);
            hasher.update(address.as_ref());
            hasher.update(&(value.len() as u64).to_be_bytes());
            hasher.update(value);
        }
        for ((address, currency), amount) in &self.balances {
            hasher.update(&[1]);
            hasher.update(address.as_ref());
            hasher.update(&currency.encode());
            hasher.update(&amount.to_be_bytes());
        }
        for (currency, amount) in &self.supplies {
            hasher.update(&[2]);
            hasher.update(&currency.encode());
            hasher.update(&amount.to_be_bytes());
        }
        for (ticker, decimal_places) in &self.currencies {
            hasher.update(&[3]);
            hasher.update(&Currency::new(ticker.as_str(), *decimal_places).encode());
        }
        hasher.finalize()
    }
}

impl State for Snapshot {
    fn get(&self, address: &Address) -> Result<Option<Bytes>> {
        Ok(self.states.get(address).cloned())
    }

    fn balance(&self, address: &Address, currency: &Currency) -> Result<u128> {
        Ok(self
            .balances
            .get(&(*address, currency.clone()))
            .copied()
            .unwrap_or_default())
    }

    fn total_supply(&self, currency: &Currency) -> Result<u128> {
        Ok(self.supplies.get(currency).copied().unwrap_or_default())
    }

    fn precision(&self, ticker: &str) -> Result<Option<u8>> {
        Ok(self.currencies.get(ticker).copied())
    }
}

fn load_failure(err: anyhow::Error) -> ActionError {
    ActionError::StateLoadFailure(format!("{err:#}"))
}

/// A copy-on-write overlay over any [`State`].
///
/// Reads consult the overlay first and fall through to the base. Writes only
/// ever land in the overlay. Every address read, written or explicitly
/// [marked](Delta::mark) is recorded in [`Delta::accessed`].
pub struct Delta<'a, S: State> {
    base: &'a S,
    changes: Changes,
    accessed: RefCell<BTreeSet<Address>>,
}

impl<'a, S: State> Delta<'a, S> {
    pub fn new(base: &'a S) -> Self {
        Self {
            base,
            changes: Changes::default(),
            accessed: RefCell::new(BTreeSet::new()),
        }
    }

    pub fn base(&self) -> &'a S {
        self.base
    }

    /// Registers `address` as accessed without reading it.
    pub fn mark(&self, address: &Address) {
        self.accessed.borrow_mut().insert(*address);
    }

    pub fn accessed(&self) -> BTreeSet<Address> {
        self.accessed.borrow().clone()
    }

    pub fn changes(&self) -> &Changes {
        &self.changes
    }

    pub fn into_changes(self) -> Changes {
        self.changes
    }

    /// Layers the writes of an inner delta (or merged wave) on top of this one.
    pub fn apply(&mut self, changes: Changes) {
        {
            let mut accessed = self.accessed.borrow_mut();
            accessed.extend(changes.addresses());
        }
        self.changes.absorb(changes);
    }

    pub fn set(&mut self, address: Address, value: impl Into<Bytes>) {
        self.mark(&address);
        self.changes
            .states
            .insert(address, Status::Update(value.into()));
    }

    pub fn delete(&mut self, address: Address) {
        self.mark(&address);
        self.changes.states.insert(address, Status::Delete);
    }

    /// Loads and decodes the value at `address`.
    pub fn get_as<T: Read<Cfg = ()>>(&self, address: &Address) -> Result<Option<T>, ActionError> {
        let Some(bytes) = State::get(self, address).map_err(load_failure)? else {
            return Ok(None);
        };
        T::decode(bytes.as_ref()).map(Some).map_err(|err| {
            ActionError::StateLoadFailure(format!("malformed value at {address}: {err}"))
        })
    }

    pub fn set_as<T: Encode>(&mut self, address: Address, value: &T) {
        self.set(address, value.encode().freeze());
    }

    pub fn get_balance(
        &self,
        address: &Address,
        currency: &Currency,
    ) -> Result<FungibleAssetValue, ActionError> {
        let raw = State::balance(self, address, currency).map_err(load_failure)?;
        Ok(FungibleAssetValue::new(currency.clone(), raw))
    }

    /// Declares `currency`. Declaring a ticker again at the same precision is
    /// a no-op; at a different precision it fails with
    /// [`ActionError::CurrencyMismatch`].
    pub fn declare(&mut self, currency: &Currency) -> Result<(), ActionError> {
        if self.ensure_declared(currency)? {
            return Ok(());
        }
        self.changes
            .declarations
            .insert(currency.ticker.clone(), currency.decimal_places);
        Ok(())
    }

    /// Fails if `currency`'s ticker is declared at another precision. Returns
    /// whether the ticker is declared at all.
    fn ensure_declared(&self, currency: &Currency) -> Result<bool, ActionError> {
        match State::precision(self, &currency.ticker).map_err(load_failure)? {
            Some(places) if places != currency.decimal_places => {
                Err(ActionError::CurrencyMismatch {
                    expected: Currency::new(currency.ticker.as_str(), places),
                    got: currency.clone(),
                })
            }
            Some(_) => Ok(true),
            None => Ok(false),
        }
    }

    /// Moves `value` from `from` to `to`. Nothing is written unless both sides
    /// succeed.
    pub fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        value: &FungibleAssetValue,
    ) -> Result<(), ActionError> {
        self.ensure_declared(&value.currency)?;
        let available = self.get_balance(from, &value.currency)?;
        if available.raw < value.raw {
            return Err(ActionError::InsufficientBalance {
                address: *from,
                required: value.clone(),
                available,
            });
        }
        if from == to {
            return Ok(());
        }
        let credited = self.get_balance(to, &value.currency)?.checked_add(value)?;
        let debited = available.checked_sub(value)?;
        self.write_balance(from, debited);
        self.write_balance(to, credited);
        Ok(())
    }

    /// Creates `value` at `to`, growing the total supply. An undeclared
    /// currency is declared at the value's precision.
    pub fn mint(&mut self, to: &Address, value: &FungibleAssetValue) -> Result<(), ActionError> {
        self.declare(&value.currency)?;
        let supply = self.supply(&value.currency)?.checked_add(value)?;
        let credited = self.get_balance(to, &value.currency)?.checked_add(value)?;
        self.write_balance(to, credited);
        self.changes.supplies.insert(value.currency.clone(), supply.raw);
        Ok(())
    }

    /// Destroys `value` held by `from`, shrinking the total supply.
    pub fn burn(&mut self, from: &Address, value: &FungibleAssetValue) -> Result<(), ActionError> {
        self.ensure_declared(&value.currency)?;
        let available = self.get_balance(from, &value.currency)?;
        if available.raw < value.raw {
            return Err(ActionError::InsufficientBalance {
                address: *from,
                required: value.clone(),
                available,
            });
        }
        let supply = self.supply(&value.currency)?.checked_sub(value)?;
        self.write_balance(from, available.checked_sub(value)?);
        self.changes.supplies.insert(value.currency.clone(), supply.raw);
        Ok(())
    }

    fn supply(&self, currency: &Currency) -> Result<FungibleAssetValue, ActionError> {
        let raw = State::total_supply(self, currency).map_err(load_failure)?;
        Ok(FungibleAssetValue::new(currency.clone(), raw))
    }

    fn write_balance(&mut self, address: &Address, value: FungibleAssetValue) {
        self.mark(address);
        self.changes
            .balances
            .insert((*address, value.currency), value.raw);
    }
}

impl<'a> Delta<'a, Snapshot> {
    /// Folds the overlay into a new snapshot. The base is left untouched.
    pub fn commit(self) -> Snapshot {
        self.base.apply(&self.changes)
    }
}

impl<'a, S: State> State for Delta<'a, S> {
    fn get(&self, address: &Address) -> Result<Option<Bytes>> {
        self.mark(address);
        Ok(match self.changes.states.get(address) {
            Some(Status::Update(value)) => Some(value.clone()),
            Some(Status::Delete) => None,
            None => self.base.get(address)?,
        })
    }

    fn balance(&self, address: &Address, currency: &Currency) -> Result<u128> {
        self.mark(address);
        match self.changes.balances.get(&(*address, currency.clone())) {
            Some(amount) => Ok(*amount),
            None => self.base.balance(address, currency),
        }
    }

    fn total_supply(&self, currency: &Currency) -> Result<u128> {
        match self.changes.supplies.get(currency) {
            Some(amount) => Ok(*amount),
            None => self.base.total_supply(currency),
        }
    }

    fn precision(&self, ticker: &str) -> Result<Option<u8>> {
        match self.changes.declarations.get(ticker) {
            Some(places) => Ok(Some(*places)),
            None => self.base.precision(ticker),
        }
    }
}
