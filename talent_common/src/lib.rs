mod wei;

pub mod helpers;
mod secret;

pub use secret::Secret;
pub use wei::{Wei, WeiConversionError, ETHER_DECIMALS, WEI_PER_ETHER};
