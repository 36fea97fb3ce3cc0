//! Wave scheduling of a block over rehearsed footprints.
//!
//! Every transaction is rehearsed first. A transaction is placed one wave
//! after the latest earlier transaction whose footprint it intersects, so
//! transactions sharing a wave touch disjoint addresses and may run against
//! the same snapshot. The result is identical to executing the block in
//! order with a [`crate::Layer`].

use crate::{
    context::{Environment, Footprint},
    layer::{apply_transaction, rehearse},
    state::{Changes, Snapshot},
};
use anyhow::{Context as _, Result};
use chronicle_types::{constants::MAX_BATCH_TRANSACTIONS, Event, Output, Transaction};
use commonware_cryptography::sha256::Digest;
#[cfg(feature = "parallel")]
use rayon::{prelude::*, ThreadPool};
use tracing::{debug, info};

/// Groups transaction indices into waves. Indices inside a wave are ascending
/// and their footprints are pairwise disjoint.
pub fn plan(footprints: &[Footprint]) -> Vec<Vec<usize>> {
    let mut assigned: Vec<usize> = Vec::with_capacity(footprints.len());
    let mut waves: Vec<Vec<usize>> = Vec::new();
    for (index, footprint) in footprints.iter().enumerate() {
        let wave = footprints[..index]
            .iter()
            .zip(&assigned)
            .filter(|(earlier, _)| earlier.intersects(footprint))
            .map(|(_, wave)| wave + 1)
            .max()
            .unwrap_or(0);
        if wave == waves.len() {
            waves.push(Vec::new());
        }
        waves[wave].push(index);
        assigned.push(wave);
    }
    waves
}

/// Result of executing a block with [`execute_block`].
#[derive(Clone, Debug)]
pub struct BlockOutcome {
    pub snapshot: Snapshot,
    pub outputs: Vec<Output>,
    pub state_root: Digest,
    pub waves: usize,
}

type Executed = (Option<Changes>, Vec<Event>);

fn run_wave(
    state: &Snapshot,
    env: &Environment<'_>,
    block_index: u64,
    transactions: &[Transaction],
    wave: &[usize],
    #[cfg(feature = "parallel")] pool: &ThreadPool,
) -> Vec<(usize, Executed)> {
    let run = |index: usize| {
        let executed = apply_transaction(
            state,
            env,
            block_index,
            index as u32,
            &transactions[index],
        );
        (index, executed)
    };

    #[cfg(feature = "parallel")]
    {
        pool.install(|| wave.par_iter().map(|index| run(*index)).collect())
    }
    #[cfg(not(feature = "parallel"))]
    {
        wave.iter().map(|index| run(*index)).collect()
    }
}

/// Executes `transactions` at `block_index` on top of `snapshot`, running
/// non-conflicting transactions of a wave together.
///
/// Outputs are returned in transaction order. An error means the block could
/// not be executed at all; failed actions are reported as events instead.
pub fn execute_block(
    snapshot: &Snapshot,
    env: &Environment<'_>,
    block_index: u64,
    transactions: Vec<Transaction>,
    #[cfg(feature = "parallel")] pool: &ThreadPool,
) -> Result<BlockOutcome> {
    if transactions.len() > MAX_BATCH_TRANSACTIONS {
        anyhow::bail!(
            "block {block_index} exceeds {MAX_BATCH_TRANSACTIONS} transactions (got {})",
            transactions.len()
        );
    }

    let footprints: Vec<Footprint> = transactions
        .iter()
        .map(|tx| rehearse(&tx.signer, &tx.action))
        .collect();
    let waves = plan(&footprints);

    let mut current = snapshot.clone();
    let mut events: Vec<Vec<Event>> = vec![Vec::new(); transactions.len()];
    let mut failed = 0usize;
    for (number, wave) in waves.iter().enumerate() {
        let executed = run_wave(
            &current,
            env,
            block_index,
            &transactions,
            wave,
            #[cfg(feature = "parallel")]
            pool,
        );

        let mut merged = Changes::default();
        for (index, (changes, emitted)) in executed {
            match changes {
                Some(changes) => merged
                    .merge(changes)
                    .with_context(|| format!("transaction {index} in wave {number}"))?,
                None => failed += 1,
            }
            events[index] = emitted;
        }
        debug!(block_index, wave = number, size = wave.len(), "wave executed");
        current = current.apply(&merged);
    }

    let mut outputs = Vec::new();
    for (tx, emitted) in transactions.into_iter().zip(events) {
        outputs.extend(emitted.into_iter().map(Output::Event));
        outputs.push(Output::Transaction(tx));
    }
    let state_root = current.root();
    info!(
        block_index,
        transactions = footprints.len(),
        waves = waves.len(),
        failed,
        root = %commonware_utils::hex(state_root.as_ref()),
        "block executed"
    );

    Ok(BlockOutcome {
        snapshot: current,
        outputs,
        state_root,
        waves: waves.len(),
    })
}
