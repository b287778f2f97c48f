use thiserror::Error;

use crate::types::{Address, Balance, Role, Timestamp};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerdantError {
    // ── Authorization ────────────────────────────────────────────────────────
    #[error("account {account} is missing role {role}")]
    MissingRole { role: Role, account: Address },

    #[error("caller is not the purchaser")]
    OnlyPurchaser,

    #[error("caller is not the whitelister")]
    OnlyWhitelister,

    #[error("Invalid sender")]
    InvalidSender,

    #[error("{0} is a contract account and cannot originate calls")]
    ContractCaller(Address),

    // ── State guards ─────────────────────────────────────────────────────────
    #[error("token is paused")]
    Paused,

    #[error("{what} is already set for {account}")]
    AlreadyInState { what: &'static str, account: Address },

    #[error("{what} is not set for {account}")]
    NotInState { what: &'static str, account: Address },

    #[error("blacklisted party: {0}")]
    BlacklistedParty(Address),

    #[error("sale is not open")]
    NotOpen,

    #[error("beneficiary {0} is already whitelisted")]
    AlreadyWhitelisted(Address),

    #[error("beneficiary {0} is not whitelisted")]
    NotWhitelisted(Address),

    #[error("beneficiary {0} is not whitelisted")]
    BeneficiaryNotWhitelisted(Address),

    #[error("Vesting wallet exists")]
    VestingWalletExists(Address),

    #[error("no vesting wallet for beneficiary {0}")]
    NoVestingWallet(Address),

    #[error("{0} is not a strategic wallet")]
    NotStrategicWallet(Address),

    #[error("approved receiver link of {0} cannot be changed")]
    ReceiverLinkLocked(Address),

    // ── Bounds ───────────────────────────────────────────────────────────────
    #[error("Last mint too close")]
    MintTooSoon { next_mint_at: Timestamp },

    #[error("mint of {amount} exceeds the limit of {max}")]
    MintExceedsLimit { amount: Balance, max: Balance },

    #[error("Last max transfer too close")]
    TransferLimitCooldownActive { wallet: Address, until: Timestamp },

    #[error("contribution {value} is below the investor tariff {tariff}")]
    BelowTariff { value: Balance, tariff: Balance },

    #[error("contribution would reach {total}, above the investor cap {cap}")]
    AboveCap { total: Balance, cap: Balance },

    #[error("requested {requested} tokens but only {remaining} remain")]
    AllowanceExceeded { requested: Balance, remaining: Balance },

    #[error("Amount too large")]
    AmountTooLarge { amount: Balance, remaining: Balance },

    #[error("fee rates out of bounds: company {company}, esg {esg}, burn {burn} (per-mille)")]
    FeeRatesOutOfBounds { company: u16, esg: u16, burn: u16 },

    #[error("arithmetic overflow")]
    ArithmeticOverflow,

    // ── Input validity ───────────────────────────────────────────────────────
    #[error("zero address")]
    ZeroAddress,

    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("beneficiary is the zero address")]
    ZeroBeneficiary,

    #[error("rate is zero")]
    ZeroRate,

    #[error("final rate exceeds initial rate")]
    FinalRateAboveInitial,

    #[error("wallet is the zero address")]
    ZeroWallet,

    #[error("purchaser is the zero address")]
    ZeroPurchaser,

    #[error("token is the zero address")]
    ZeroToken,

    #[error("whitelister is the zero address")]
    ZeroWhitelister,

    #[error("investor tariff is zero")]
    ZeroTariff,

    #[error("investor cap is below the investor tariff")]
    CapBelowTariff,

    #[error("opening time {opening} is before the current time {now}")]
    OpeningTimeInPast { opening: Timestamp, now: Timestamp },

    #[error("opening time is not before closing time")]
    OpeningNotBeforeClosing,

    #[error("vesting duration is zero")]
    ZeroDuration,

    #[error("a wallet cannot be its own approved receiver")]
    SelfApprovedReceiver,

    #[error("snapshot id 0 is invalid")]
    InvalidSnapshotId,

    #[error("snapshot {0} does not exist yet")]
    NonexistentSnapshot(u64),

    // ── Resources ────────────────────────────────────────────────────────────
    #[error("insufficient balance: need {need}, have {have}")]
    InsufficientBalance { need: Balance, have: Balance },

    #[error("insufficient allowance: need {need}, have {have}")]
    InsufficientAllowance { need: Balance, have: Balance },

    #[error("insufficient native balance: need {need}, have {have}")]
    InsufficientNativeBalance { need: Balance, have: Balance },

    #[error("native transfer rejected by {0}")]
    NativeTransferRejected(Address),

    // ── Chain host ───────────────────────────────────────────────────────────
    #[error("unknown contract: {0}")]
    UnknownContract(Address),

    #[error("contract {address} is not a {expected}")]
    WrongContractKind { address: Address, expected: &'static str },

    #[error("clock went backwards: last {last}, now {now}")]
    ClockWentBackwards { last: Timestamp, now: Timestamp },

    #[error("genesis supply mismatch: expected {expected}, got {got}")]
    GenesisSupplyMismatch { expected: Balance, got: Balance },

    #[error("genesis already applied")]
    GenesisAlreadyApplied,

    #[error("state not initialised; apply genesis first")]
    NotInitialised,

    // ── Serialization / storage ──────────────────────────────────────────────
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl VerdantError {
    pub fn already(what: &'static str, account: Address) -> Self {
        VerdantError::AlreadyInState { what, account }
    }

    pub fn not_in(what: &'static str, account: Address) -> Self {
        VerdantError::NotInState { what, account }
    }
}
