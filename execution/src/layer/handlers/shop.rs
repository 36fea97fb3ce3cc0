use super::*;
use chronicle_types::{
    constants::{BUY3_OBSOLETE_INDEX, LEGACY_SHOP_FEE_PERCENT},
    model::{Mail, MailKind, ShopItem},
    Buy, Sell,
};
use crate::external::TableSheet;

/// Revisions of the buy action that are still registered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::layer) enum BuyRevision {
    /// Fixed fee.
    Legacy,
    Current,
}

impl BuyRevision {
    fn name(self) -> &'static str {
        match self {
            Self::Legacy => "buy3",
            Self::Current => "buy",
        }
    }

    fn obsolete_index(self) -> Option<u64> {
        match self {
            Self::Legacy => Some(BUY3_OBSOLETE_INDEX),
            Self::Current => None,
        }
    }

    fn fee_percent(self, env: &Environment<'_>) -> u8 {
        match self {
            Self::Legacy => LEGACY_SHOP_FEE_PERCENT,
            Self::Current => env.config.shop_fee_percent,
        }
    }
}

pub(in crate::layer) fn sell<S: State>(
    ctx: &mut ActionContext<'_, S>,
    env: &Environment<'_>,
    delta: &mut Delta<'_, S>,
    action: &Sell,
) -> Result<Vec<Event>, ActionError> {
    ensure_controls(env, &ctx.signer, &action.seller_avatar, "seller avatar")?;
    if action.price.is_zero() {
        return Err(Precondition::NonPositiveAmount.into());
    }

    let mut avatar = load_avatar(delta, &action.seller_avatar, "seller")?;
    ensure_stage(&avatar, env.config.shop_required_stage)?;
    let gold = load_gold_currency(delta)?;
    action.price.ensure_currency(&gold)?;

    let item = avatar
        .inventory
        .get(&action.item_id)
        .cloned()
        .ok_or(Precondition::ItemNotFound {
            item_id: action.item_id,
        })?;
    let row = env
        .items
        .row(item.sheet_id)
        .map_err(|err| ActionError::StateLoadFailure(err.to_string()))?;
    if !row.tradable {
        return Err(Precondition::ItemNotTradable {
            sheet_id: item.sheet_id,
        }
        .into());
    }

    let mut shop = load_shop(delta)?;
    let product_id = ctx.random.next_guid();
    let listing = ShopItem {
        seller_agent: ctx.signer,
        seller_avatar: action.seller_avatar,
        product_id,
        price: action.price.clone(),
        item,
        registered_at: ctx.block_index,
    };
    shop.register(listing)?;
    avatar.inventory.remove(&action.item_id);
    avatar.updated_at = ctx.block_index;

    delta.set_as(action.seller_avatar, &avatar);
    delta.set_as(Address::SHOP, &shop);
    info!(
        seller = %action.seller_avatar,
        %product_id,
        price = %action.price,
        "product registered"
    );

    Ok(vec![Event::ProductRegistered {
        seller_avatar: action.seller_avatar,
        product_id,
        price: action.price.clone(),
    }])
}

pub(in crate::layer) fn buy<S: State>(
    ctx: &mut ActionContext<'_, S>,
    env: &Environment<'_>,
    delta: &mut Delta<'_, S>,
    action: &Buy,
    revision: BuyRevision,
) -> Result<Vec<Event>, ActionError> {
    // Authorization uses the registry only; no state has been read yet.
    if ctx.signer == action.seller_agent {
        return Err(unauthorized(format!(
            "{} cannot buy its own listing",
            ctx.signer
        )));
    }
    if action.buyer_avatar == action.seller_avatar {
        return Err(unauthorized(format!(
            "avatar {} cannot trade with itself",
            action.buyer_avatar
        )));
    }
    ensure_controls(env, &ctx.signer, &action.buyer_avatar, "buyer avatar")?;
    if let Some(obsolete_index) = revision.obsolete_index() {
        if ctx.block_index > obsolete_index {
            return Err(ActionError::Obsoleted {
                action: revision.name(),
                obsolete_index,
                block_index: ctx.block_index,
            });
        }
    }

    let mut buyer = load_avatar(delta, &action.buyer_avatar, "buyer")?;
    ensure_stage(&buyer, env.config.shop_required_stage)?;
    let mut shop = load_shop(delta)?;
    let listing = shop
        .try_get(&action.seller_agent, &action.product_id)
        .filter(|listing| listing.seller_avatar == action.seller_avatar)
        .cloned()
        .ok_or(Precondition::ProductNotFound {
            seller_agent: action.seller_agent,
            product_id: action.product_id,
        })?;
    let mut seller = load_avatar(delta, &action.seller_avatar, "seller")?;
    let gold = load_gold_currency(delta)?;
    listing.price.ensure_currency(&gold)?;

    let available = delta.get_balance(&ctx.signer, &gold)?;
    if available.raw < listing.price.raw {
        return Err(ActionError::InsufficientBalance {
            address: ctx.signer,
            required: listing.price.clone(),
            available,
        });
    }

    buyer.inventory.add(listing.item.clone())?;

    let buyer_mail_id = ctx.random.next_guid();
    let seller_mail_id = ctx.random.next_guid();

    let (hundredth, _) = listing.price.div_rem(100);
    let fee = hundredth.checked_mul(u128::from(revision.fee_percent(env)))?;
    let proceeds = listing.price.checked_sub(&fee)?;
    delta.transfer(&ctx.signer, &Address::GOLD_CURRENCY, &fee)?;
    delta.transfer(&ctx.signer, &action.seller_agent, &proceeds)?;

    shop.unregister(&action.product_id);
    buyer.deliver(
        Mail {
            id: buyer_mail_id,
            block_index: ctx.block_index,
            kind: MailKind::Buyer {
                product_id: action.product_id,
                item: listing.item.clone(),
            },
        },
        env.config.mailbox_capacity,
    );
    seller.deliver(
        Mail {
            id: seller_mail_id,
            block_index: ctx.block_index,
            kind: MailKind::Seller {
                product_id: action.product_id,
                gold: proceeds.clone(),
            },
        },
        env.config.mailbox_capacity,
    );
    buyer.trade_quest.record_buy(&listing.price);
    seller.trade_quest.record_sell(&listing.price);
    buyer.updated_at = ctx.block_index;
    seller.updated_at = ctx.block_index;

    delta.set_as(action.buyer_avatar, &buyer);
    delta.set_as(action.seller_avatar, &seller);
    delta.set_as(Address::SHOP, &shop);
    info!(
        revision = revision.name(),
        buyer = %action.buyer_avatar,
        seller = %action.seller_agent,
        product_id = %action.product_id,
        price = %listing.price,
        %fee,
        "product sold"
    );

    Ok(vec![Event::ProductSold {
        buyer_avatar: action.buyer_avatar,
        seller_agent: action.seller_agent,
        product_id: action.product_id,
        price: listing.price,
        fee,
    }])
}
