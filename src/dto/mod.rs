pub mod proposal_dto;
pub mod quote_dto;
