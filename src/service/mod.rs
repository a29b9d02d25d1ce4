pub mod proposal_service;
pub mod quote_service;
