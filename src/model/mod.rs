pub mod pricing;
pub mod quote;
pub mod settings;
