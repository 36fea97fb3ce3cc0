use anyhow::Result;
use bytes::Bytes;
use chronicle_types::{
    constants::{MAX_BATCH_TRANSACTIONS, MAX_ERROR_MESSAGE_LENGTH},
    Action, ActionError, Address, Currency, Event, Output, Transaction,
};
use tracing::{debug, info, warn};

use crate::{
    context::{ActionContext, Environment, Footprint, Outcome},
    state::{Changes, Delta, Snapshot, State},
    Random,
};

mod handlers;

/// Returns every address `action` could touch when signed by `signer`.
///
/// Computed from the action's fields only, without reading state. Footprints
/// are a superset of what execution accesses: the shop and the gold currency
/// address are always included for trades, so any two trades conflict.
pub fn rehearse(signer: &Address, action: &Action) -> Footprint {
    handlers::footprint(signer, action)
}

/// Runs `action` on a fresh overlay over `ctx.previous`.
///
/// On failure the overlay is dropped, so nothing reaches the caller. In
/// rehearsal mode the overlay only has the footprint marked as accessed.
pub fn execute<'a, S: State>(
    mut ctx: ActionContext<'a, S>,
    env: &Environment<'_>,
    action: &Action,
) -> Result<Outcome<'a, S>, ActionError> {
    let mut delta = Delta::new(ctx.previous);
    if ctx.rehearsal {
        for address in rehearse(&ctx.signer, action).iter() {
            delta.mark(address);
        }
        return Ok(Outcome {
            delta,
            events: Vec::new(),
        });
    }

    let events = match action {
        Action::TransferAsset(transfer) => handlers::transfer_asset(&mut ctx, &mut delta, transfer)?,
        Action::Sell(sell) => handlers::sell(&mut ctx, env, &mut delta, sell)?,
        Action::Buy3(buy) => {
            handlers::buy(&mut ctx, env, &mut delta, buy, handlers::BuyRevision::Legacy)?
        }
        Action::Buy(buy) => {
            handlers::buy(&mut ctx, env, &mut delta, buy, handlers::BuyRevision::Current)?
        }
    };
    Ok(Outcome { delta, events })
}

/// Executes `transaction` at `position` in block `block_index`.
///
/// Returns the changes to keep (none on failure) and the events to emit.
pub(crate) fn apply_transaction<S: State>(
    state: &S,
    env: &Environment<'_>,
    block_index: u64,
    position: u32,
    transaction: &Transaction,
) -> (Option<Changes>, Vec<Event>) {
    let signer = transaction.signer;
    let action = &transaction.action;
    debug!(
        %signer,
        action = action.name(),
        block_index,
        position,
        "executing action"
    );

    let random = Random::for_action(block_index, position, &signer, action);
    let ctx = ActionContext::new(state, signer, block_index, random);
    match execute(ctx, env, action) {
        Ok(Outcome { delta, events }) => (Some(delta.into_changes()), events),
        Err(err) => {
            warn!(
                %signer,
                action = action.name(),
                block_index,
                code = err.code(),
                error = %err,
                "action failed"
            );
            (
                None,
                vec![Event::ActionFailed {
                    signer,
                    error_code: err.code(),
                    message: failure_message(&err),
                }],
            )
        }
    }
}

fn failure_message(err: &ActionError) -> String {
    let mut message = err.to_string();
    if message.len() > MAX_ERROR_MESSAGE_LENGTH {
        let mut end = MAX_ERROR_MESSAGE_LENGTH;
        while !message.is_char_boundary(end) {
            end -= 1;
        }
        message.truncate(end);
    }
    message
}

/// Executes a block of transactions one after another over a shared overlay.
///
/// A failed transaction leaves no writes behind and is recorded as an
/// [`Event::ActionFailed`]; the following transactions still run.
pub struct Layer<'a, S: State> {
    delta: Delta<'a, S>,
    env: Environment<'a>,
    block_index: u64,
    position: u32,
}

impl<'a, S: State> Layer<'a, S> {
    pub fn new(state: &'a S, env: Environment<'a>, block_index: u64) -> Self {
        Self {
            delta: Delta::new(state),
            env,
            block_index,
            position: 0,
        }
    }

    pub fn block_index(&self) -> u64 {
        self.block_index
    }

    pub fn execute(&mut self, transactions: Vec<Transaction>) -> Result<Vec<Output>> {
        let total = self.position as usize + transactions.len();
        if total > MAX_BATCH_TRANSACTIONS {
            anyhow::bail!(
                "block {} exceeds {MAX_BATCH_TRANSACTIONS} transactions (got {total})",
                self.block_index
            );
        }

        let mut outputs = Vec::new();
        let mut failed = 0usize;
        for tx in transactions {
            let (changes, events) =
                apply_transaction(&self.delta, &self.env, self.block_index, self.position, &tx);
            match changes {
                Some(changes) => self.delta.apply(changes),
                None => failed += 1,
            }
            self.position += 1;
            outputs.extend(events.into_iter().map(Output::Event));
            outputs.push(Output::Transaction(tx));
        }
        info!(
            block_index = self.block_index,
            executed = self.position,
            failed,
            "batch executed"
        );

        Ok(outputs)
    }

    pub fn changes(&self) -> &Changes {
        self.delta.changes()
    }

    pub fn into_changes(self) -> Changes {
        self.delta.into_changes()
    }
}

impl<'a> Layer<'a, Snapshot> {
    pub fn commit(self) -> Snapshot {
        self.delta.commit()
    }
}

impl<'a, S: State> State for Layer<'a, S> {
    fn get(&self, address: &Address) -> Result<Option<Bytes>> {
        self.delta.get(address)
    }

    fn balance(&self, address: &Address, currency: &Currency) -> Result<u128> {
        self.delta.balance(address, currency)
    }

    fn total_supply(&self, currency: &Currency) -> Result<u128> {
        self.delta.total_supply(currency)
    }

    fn precision(&self, ticker: &str) -> Result<Option<u8>> {
        self.delta.precision(ticker)
    }
}
