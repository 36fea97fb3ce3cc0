//! Domain state stored at addresses: agents, avatars, items, mails and the shop.
//!
//! Every model encodes canonically. Collections are kept sorted in memory and
//! rejected on decode if they are not, so equal values always share one
//! encoding.

mod agent;
mod avatar;
mod item;
mod mail;
mod shop;

pub use agent::*;
pub use avatar::*;
pub use item::*;
pub use mail::*;
pub use shop::*;
