pub mod calculator;
pub mod labor;
pub mod material;
pub mod markup;
pub mod tier;
