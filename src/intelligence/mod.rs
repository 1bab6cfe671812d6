pub mod classifier;

pub use classifier::{
    classify_exposure, dominant_side, exposure_usd, positions_for, profile_wallet, WalletProfile,
};
