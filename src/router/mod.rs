pub mod proposal_router;
pub mod quote_router;
