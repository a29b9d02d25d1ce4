pub mod proposal_handler;
pub mod quote_handler;
