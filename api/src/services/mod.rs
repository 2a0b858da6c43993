pub mod alert;
pub mod rates;

pub use self::alert::AlertMonitor;
pub use self::rates::FrankfurterRateProvider;
