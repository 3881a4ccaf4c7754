// Smallest unit: 1 LTO = 10^8 units
pub const COIN_DECIMALS: u8 = 8;
pub const COIN_VALUE: u64 = 10u64.pow(COIN_DECIMALS as u32);

// Chain identifiers (stamped into addresses and v3 transaction bodies)
pub const MAINNET_CHAIN_ID: u8 = b'L';
pub const TESTNET_CHAIN_ID: u8 = b'T';

// Address layout: version + chain id + 20 bytes of key hash + 4 bytes checksum
pub const ADDRESS_VERSION: u8 = 1;
pub const ADDRESS_HASH_SIZE: usize = 20;
pub const ADDRESS_CHECKSUM_SIZE: usize = 4;
pub const ADDRESS_SIZE: usize = 2 + ADDRESS_HASH_SIZE + ADDRESS_CHECKSUM_SIZE;

// ===== Default transaction fees =====

pub const TRANSFER_FEE: u64 = COIN_VALUE;
pub const LEASE_FEE: u64 = COIN_VALUE;
pub const CANCEL_LEASE_FEE: u64 = COIN_VALUE;
// Mass transfer pays a base fee plus a fee for every recipient
pub const MASS_TRANSFER_BASE_FEE: u64 = COIN_VALUE;
pub const MASS_TRANSFER_FEE_PER_TRANSFER: u64 = COIN_VALUE / 10;
pub const ANCHOR_FEE: u64 = 35_000_000;
pub const ASSOCIATION_FEE: u64 = COIN_VALUE;
pub const REVOKE_ASSOCIATION_FEE: u64 = COIN_VALUE;
pub const SPONSORSHIP_FEE: u64 = 5 * COIN_VALUE;
pub const CANCEL_SPONSORSHIP_FEE: u64 = 5 * COIN_VALUE;
pub const REGISTER_FEE: u64 = 35_000_000;

// Default lease amount used when a scenario does not name one
pub const DEFAULT_LEASE_AMOUNT: u64 = COIN_VALUE;

// ===== Limits =====

pub const MAX_TRANSFERS_PER_MASS_TRANSFER: usize = 100;
pub const MAX_ANCHORS_PER_TRANSACTION: usize = 100;
pub const MAX_ANCHOR_SIZE: usize = 64;
pub const MAX_ATTACHMENT_SIZE: usize = 140;
pub const MAX_REGISTERED_KEYS: usize = 100;
