//! Fixed values shared across the client.

use alloy::primitives::U256;

// =============================================================================
// Transaction Thresholds
// =============================================================================

/// Smallest amount accepted for a deposit, in the contract's base unit
pub const MIN_DEPOSIT: U256 = U256::from_limbs([25, 0, 0, 0]);

/// Smallest amount accepted for a withdrawal, in the contract's base unit
pub const MIN_WITHDRAW: U256 = U256::from_limbs([20, 0, 0, 0]);

// =============================================================================
// Wallet Protocol
// =============================================================================

/// EIP-1193 error code a provider returns when the user declines a request
pub const USER_REJECTED_CODE: i64 = 4001;

/// Default number of confirmations a transaction needs
pub const DEFAULT_CONFIRMATIONS: u64 = 1;

// =============================================================================
// FAQ
// =============================================================================

pub const DEFAULT_FAQS: [(&str, &str); 6] = [
    (
        "What are Interbank transaction charges?",
        "Fees applied when using a different bank's ATM.",
    ),
    (
        "If money is not dispensed at ATM but my account is debited?",
        "Contact your bank immediately for a refund.",
    ),
    (
        "What happens if I enter a wrong PIN or forget my ATM PIN?",
        "Temporary block for security reasons. Contact bank for new PIN.",
    ),
    (
        "What are the possible reasons for my card not working at ATMs?",
        "Insufficient funds, expired card, or network issues.",
    ),
    ("What is the minimum amount to deposit?", "25 ETH."),
    ("What is the minimum amount to withdraw?", "20 ETH."),
];
