pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod marketplace;
pub mod notify;
pub mod orchestration;

pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    Decimal, EffectiveSettings, GlobalSettings, PriceSnapshot, Product, ProductId,
    ProductSettings, TimeMs,
};
pub use engine::{FeeBasis, PricingEngine};
pub use error::AppError;
pub use marketplace::{MarketplacePriceClient, MockMarketplaceClient, TrendyolClient};
pub use notify::NotificationChannel;
