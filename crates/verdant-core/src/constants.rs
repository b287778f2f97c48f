/// ─── Verdant Protocol Constants ─────────────────────────────────────────────
///
/// Token:     VERD, 18 decimals
/// Fees:      per-mille (parts per thousand) split between company rewards,
///            the ESG fund and a burn on every non-feeless transfer.

// ── Units ─────────────────────────────────────────────────────────────────────

/// Number of decimal places of the token.
pub const DECIMALS: u32 = 18;

/// 1 VERD expressed in base units (10^18).
pub const UNITS_PER_TOKEN: u128 = 1_000_000_000_000_000_000;

/// Denominator of every fee rate.
pub const PER_MILLE: u128 = 1_000;

// ── Genesis supply split ──────────────────────────────────────────────────────

/// Default initial supply in whole tokens.
pub const DEFAULT_INITIAL_SUPPLY_TOKENS: u128 = 300_000_000;

/// Share of the initial supply minted to the company liquidity wallet (percent).
pub const COMPANY_LIQUIDITY_PERCENT: u128 = 40;

/// Share of the initial supply minted to the allocations wallet (percent).
pub const ALLOCATIONS_PERCENT: u128 = 25;

/// Share of the initial supply minted to the crowdsales wallet (percent).
/// Receives any rounding remainder so the split is exact.
pub const CROWDSALES_PERCENT: u128 = 35;

// ── Default fee rates (per-mille) ─────────────────────────────────────────────

pub const DEFAULT_COMPANY_RATE: u16 = 10;
pub const DEFAULT_ESG_FUND_RATE: u16 = 10;
pub const DEFAULT_BURN_RATE: u16 = 5;

// ── Minting cadence ───────────────────────────────────────────────────────────

/// Minimum delay between two mints (seconds). 180 days.
pub const MINT_INTERVAL_SECS: i64 = 180 * 24 * 3600;

/// A single mint may not exceed `total_supply / MINT_LIMIT_DIVISOR` (10%).
pub const MINT_LIMIT_DIVISOR: u128 = 10;

// ── Strategic wallet throttle ─────────────────────────────────────────────────

/// Default maximum cumulative outflow of a strategic wallet before the
/// cooldown starts (whole tokens).
pub const DEFAULT_MAX_STRATEGIC_TRANSFER_TOKENS: u128 = 1_000_000;

/// Default cooldown after a strategic wallet reached its cap (seconds). 30 days.
pub const DEFAULT_STRATEGIC_COOLDOWN_SECS: i64 = 30 * 24 * 3600;

// ── Crowdsales ────────────────────────────────────────────────────────────────

/// How far in the past a crowdsale opening time may lie at deployment (seconds).
pub const OPENING_TIME_TOLERANCE_SECS: i64 = 300;

// ── Snapshots ─────────────────────────────────────────────────────────────────

/// Identifier handed out by the first snapshot.
pub const FIRST_SNAPSHOT_ID: u64 = 1;
