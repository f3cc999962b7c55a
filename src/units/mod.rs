mod wei;

pub use wei::ParseWeiError;
pub use wei::WeiNewtype;

/// The native token (SHM) has 18 decimals.
pub const WEI_PER_ETH: i128 = 1_000_000_000_000_000_000;
