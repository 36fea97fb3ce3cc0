use super::*;
use chronicle_types::TransferAsset;

pub(in crate::layer) fn transfer_asset<S: State>(
    ctx: &mut ActionContext<'_, S>,
    delta: &mut Delta<'_, S>,
    action: &TransferAsset,
) -> Result<Vec<Event>, ActionError> {
    if ctx.signer != action.sender {
        return Err(unauthorized(format!(
            "{} cannot transfer on behalf of {}",
            ctx.signer, action.sender
        )));
    }
    if action.sender == action.recipient {
        return Err(Precondition::SelfTransfer(action.sender).into());
    }
    if action.amount.is_zero() {
        return Err(Precondition::NonPositiveAmount.into());
    }
    action.check_memo()?;

    delta.transfer(&action.sender, &action.recipient, &action.amount)?;
    debug!(
        sender = %action.sender,
        recipient = %action.recipient,
        amount = %action.amount,
        "asset transferred"
    );

    Ok(vec![Event::AssetTransferred {
        sender: action.sender,
        recipient: action.recipient,
        amount: action.amount.clone(),
    }])
}
