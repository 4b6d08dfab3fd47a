pub mod auth_dto;
pub mod list_dto;
pub mod payment_dto;
pub mod stats_dto;
