use super::*;
use chronicle_types::{
    model::{AvatarState, ShopState},
    Currency, Precondition,
};

mod asset;
mod shop;

pub(in crate::layer) use asset::transfer_asset;
pub(in crate::layer) use shop::{buy, sell, BuyRevision};

/// Every address `action` may touch, computed from its fields alone.
pub(in crate::layer) fn footprint(signer: &Address, action: &Action) -> Footprint {
    match action {
        Action::TransferAsset(transfer) => [transfer.sender, transfer.recipient]
            .into_iter()
            .collect(),
        Action::Sell(sell) => [sell.seller_avatar, Address::SHOP, Address::GOLD_CURRENCY]
            .into_iter()
            .collect(),
        Action::Buy3(buy) | Action::Buy(buy) => [
            *signer,
            buy.buyer_avatar,
            buy.seller_agent,
            buy.seller_avatar,
            Address::SHOP,
            Address::GOLD_CURRENCY,
        ]
        .into_iter()
        .collect(),
    }
}

fn unauthorized(message: impl Into<String>) -> ActionError {
    ActionError::Unauthorized(message.into())
}

fn ensure_controls(
    env: &Environment<'_>,
    signer: &Address,
    address: &Address,
    role: &str,
) -> Result<(), ActionError> {
    if !env.accounts.controls(signer, address) {
        return Err(unauthorized(format!(
            "{signer} does not control {role} {address}"
        )));
    }
    Ok(())
}

fn load_avatar<S: State>(
    delta: &Delta<'_, S>,
    address: &Address,
    role: &str,
) -> Result<AvatarState, ActionError> {
    delta
        .get_as::<AvatarState>(address)?
        .ok_or_else(|| ActionError::StateLoadFailure(format!("{role} avatar {address} not found")))
}

fn load_shop<S: State>(delta: &Delta<'_, S>) -> Result<ShopState, ActionError> {
    delta
        .get_as::<ShopState>(&Address::SHOP)?
        .ok_or_else(|| ActionError::StateLoadFailure("shop state not found".to_string()))
}

fn load_gold_currency<S: State>(delta: &Delta<'_, S>) -> Result<Currency, ActionError> {
    delta
        .get_as::<Currency>(&Address::GOLD_CURRENCY)?
        .ok_or_else(|| ActionError::StateLoadFailure("gold currency not defined".to_string()))
}

fn ensure_stage(avatar: &AvatarState, required: u32) -> Result<(), ActionError> {
    if !avatar.is_stage_cleared(required) {
        return Err(Precondition::StageNotCleared {
            required,
            cleared: avatar.cleared_stage,
        }
        .into());
    }
    Ok(())
}
